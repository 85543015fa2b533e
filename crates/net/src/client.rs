//! TCP client for the booking service

use std::net::SocketAddr;

use chrono::NaiveDate;
use counselbook_core::{Booking, TimeSlot};
use tokio::net::TcpStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Request, Response};

/// One connection; calls are answered in order
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");
        let stream = TcpStream::connect(addr).await?;
        Ok(Client { stream })
    }

    /// Send one request and wait for its response.
    ///
    /// A refused call comes back as [`Error::Remote`].
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        write_frame(&mut self.stream, request).await?;
        match read_frame(&mut self.stream).await? {
            Response::Error { kind, message } => {
                debug!(?kind, message = %message, "Call refused");
                Err(Error::Remote { kind, message })
            }
            response => Ok(response),
        }
    }

    pub async fn available_slots(
        &mut self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        match self
            .call(&Request::AvailableSlots { counselor_id, date })
            .await?
        {
            Response::Slots(slots) => Ok(slots),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create_booking(
        &mut self,
        student_id: Uuid,
        time_slot_id: Uuid,
        notes: Option<String>,
    ) -> Result<Booking> {
        self.booking_call(Request::CreateBooking {
            student_id,
            time_slot_id,
            notes,
        })
        .await
    }

    pub async fn approve(&mut self, booking_id: Uuid) -> Result<Booking> {
        self.booking_call(Request::Approve { booking_id }).await
    }

    pub async fn reject(&mut self, booking_id: Uuid, reason: &str) -> Result<Booking> {
        self.booking_call(Request::Reject {
            booking_id,
            reason: reason.to_string(),
        })
        .await
    }

    pub async fn cancel(&mut self, booking_id: Uuid) -> Result<Booking> {
        self.booking_call(Request::Cancel { booking_id }).await
    }

    async fn booking_call(&mut self, request: Request) -> Result<Booking> {
        match self.call(&request).await? {
            Response::Booking(booking) => Ok(booking),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> Error {
    Error::Protocol(format!("Unexpected response: {:?}", response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::server::Server;
    use chrono::NaiveTime;
    use counselbook_core::{BookingStatus, ErrorKind};
    use std::time::Duration;

    #[tokio::test]
    async fn test_reject_then_rebook() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Handler::new(dir.path().join("client.db"), Duration::from_secs(5), 60);
        let server = Server::start(SocketAddr::from(([127, 0, 0, 1], 0)), handler)
            .await
            .unwrap();
        let mut client = Client::connect(server.addr()).await.unwrap();

        let counselor = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        client
            .call(&Request::AddTemplate {
                counselor_id: counselor,
                day_of_week: 1,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        let slot = client.available_slots(counselor, monday).await.unwrap()[0].clone();

        let first = client.create_booking(Uuid::new_v4(), slot.id, None).await.unwrap();
        let err = client.reject(first.id, "").await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::Validation));

        let rejected = client.reject(first.id, "schedule conflict").await.unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert_eq!(client.available_slots(counselor, monday).await.unwrap().len(), 1);

        let second = client
            .create_booking(Uuid::new_v4(), slot.id, Some("second try".to_string()))
            .await
            .unwrap();
        let cancelled = client.cancel(second.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let err = client.approve(second.id).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::InvalidTransition));
        server.shutdown();
    }
}
