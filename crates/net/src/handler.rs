//! Blocking request dispatch
//!
//! Each request opens its own database connection, so concurrent handlers
//! share nothing but the database file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use counselbook_core::analytics::AnalyticsAggregator;
use counselbook_core::{screening, BookingService, Database, ErrorKind, SlotGenerator};
use tracing::{debug, error, warn};

use crate::protocol::{Request, Response};

/// Everything a worker needs to serve one request
#[derive(Debug, Clone)]
pub struct Handler {
    db_path: Arc<PathBuf>,
    busy_timeout: Duration,
    session_minutes: u32,
}

impl Handler {
    pub fn new(db_path: PathBuf, busy_timeout: Duration, session_minutes: u32) -> Self {
        Self {
            db_path: Arc::new(db_path),
            busy_timeout,
            session_minutes,
        }
    }

    /// Create or migrate the database before serving
    pub fn prepare(&self) -> counselbook_core::Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::open_with_timeout(self.db_path.as_path(), self.busy_timeout)?;
        debug!(version = db.schema_version()?, "Database ready");
        Ok(())
    }

    /// Serve one request. Failures become [`Response::Error`].
    pub fn handle(&self, request: Request) -> Response {
        let result = Database::attach(self.db_path.as_path(), self.busy_timeout)
            .and_then(|db| self.dispatch(&db, request));

        match result {
            Ok(response) => response,
            Err(e) => {
                match e.kind() {
                    ErrorKind::Storage => error!(error = %e, "Request failed"),
                    _ => warn!(error = %e, "Request refused"),
                }
                Response::error(&e)
            }
        }
    }

    fn dispatch(&self, db: &Database, request: Request) -> counselbook_core::Result<Response> {
        let bookings = BookingService::new(db);

        let response = match request {
            Request::Ping => Response::Pong,

            Request::AddTemplate {
                counselor_id,
                day_of_week,
                start_time,
                end_time,
            } => Response::Template(self.generator(db)?.add_template(
                counselor_id,
                day_of_week,
                start_time,
                end_time,
            )?),
            Request::ListTemplates { counselor_id } => {
                Response::Templates(self.generator(db)?.templates(counselor_id)?)
            }
            Request::SetTemplateActive {
                template_id,
                is_active,
            } => {
                self.generator(db)?
                    .set_template_active(template_id, is_active)?;
                Response::Done
            }
            Request::UpdateTemplate {
                template_id,
                day_of_week,
                start_time,
                end_time,
            } => Response::Template(self.generator(db)?.update_template(
                template_id,
                day_of_week,
                start_time,
                end_time,
            )?),

            Request::EnsureSlots { counselor_id, date } => {
                Response::SlotsCreated(self.generator(db)?.ensure_slots(counselor_id, date)?)
            }
            Request::AvailableSlots { counselor_id, date } => {
                Response::Slots(self.generator(db)?.available_slots(counselor_id, date)?)
            }
            Request::BlockSlot { slot_id } => Response::Slot(self.generator(db)?.block_slot(slot_id)?),
            Request::UnblockSlot { slot_id } => {
                Response::Slot(self.generator(db)?.unblock_slot(slot_id)?)
            }

            Request::CreateBooking {
                student_id,
                time_slot_id,
                notes,
            } => Response::Booking(bookings.create(student_id, time_slot_id, notes)?),
            Request::Approve { booking_id } => Response::Booking(bookings.approve(booking_id)?),
            Request::Reject { booking_id, reason } => {
                Response::Booking(bookings.reject(booking_id, &reason)?)
            }
            Request::Complete {
                booking_id,
                summary,
            } => Response::Booking(bookings.complete(booking_id, summary)?),
            Request::Cancel { booking_id } => Response::Booking(bookings.cancel(booking_id)?),
            Request::Annotate { booking_id, notes } => {
                Response::Booking(bookings.annotate(booking_id, &notes)?)
            }
            Request::GetBooking { booking_id } => Response::Booking(bookings.booking(booking_id)?),
            Request::CounselorBookings { counselor_id, date } => Response::Bookings(match date {
                Some(date) => bookings.bookings_for_counselor_on(counselor_id, date)?,
                None => bookings.bookings_for_counselor(counselor_id)?,
            }),
            Request::StudentBookings { student_id } => {
                Response::Bookings(bookings.bookings_for_student(student_id)?)
            }
            Request::PendingRequests { counselor_id } => {
                Response::Bookings(bookings.pending_for_counselor(counselor_id)?)
            }
            Request::SessionsOn { counselor_id, date } => {
                Response::Bookings(bookings.sessions_on(counselor_id, date)?)
            }
            Request::SessionRecord { booking_id } => {
                Response::SessionRecord(bookings.session_record(booking_id)?)
            }

            Request::SubmitScreening {
                student_id,
                answers,
            } => Response::Screening(screening::submit(db, student_id, &answers)?),
            Request::StudentScreenings { student_id } => {
                Response::Screenings(db.screenings().list_for_student(student_id)?)
            }

            Request::Rollup {
                population,
                from,
                to,
            } => Response::Rollup(AnalyticsAggregator::new(db).rollup(&population, from, to)?),
        };
        Ok(response)
    }

    fn generator<'a>(&self, db: &'a Database) -> counselbook_core::Result<SlotGenerator<'a>> {
        SlotGenerator::new(db, self.session_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use counselbook_core::{BookingStatus, SlotStatus};
    use uuid::Uuid;

    fn handler(dir: &tempfile::TempDir) -> Handler {
        let handler = Handler::new(
            dir.path().join("data").join("counselbook.db"),
            Duration::from_millis(2000),
            60,
        );
        handler.prepare().unwrap();
        handler
    }

    #[test]
    fn test_booking_flow_through_handler() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir);
        let counselor = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let added = handler.handle(Request::AddTemplate {
            counselor_id: counselor,
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        });
        assert!(matches!(added, Response::Template(_)));

        let slot = match handler.handle(Request::AvailableSlots {
            counselor_id: counselor,
            date: monday,
        }) {
            Response::Slots(mut slots) => {
                assert_eq!(slots.len(), 1);
                slots.remove(0)
            }
            other => panic!("unexpected response: {:?}", other),
        };
        assert_eq!(slot.status, SlotStatus::Available);

        let booking = match handler.handle(Request::CreateBooking {
            student_id: Uuid::new_v4(),
            time_slot_id: slot.id,
            notes: None,
        }) {
            Response::Booking(booking) => booking,
            other => panic!("unexpected response: {:?}", other),
        };
        assert_eq!(booking.status, BookingStatus::Pending);

        let again = handler.handle(Request::CreateBooking {
            student_id: Uuid::new_v4(),
            time_slot_id: slot.id,
            notes: None,
        });
        assert!(matches!(
            again,
            Response::Error { kind: ErrorKind::SlotUnavailable, .. }
        ));

        let rejected = handler.handle(Request::Reject {
            booking_id: booking.id,
            reason: " ".to_string(),
        });
        assert!(matches!(
            rejected,
            Response::Error { kind: ErrorKind::Validation, .. }
        ));
    }

    #[test]
    fn test_screening_and_rollup() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir);
        let student = Uuid::new_v4();

        let scored = handler.handle(Request::SubmitScreening {
            student_id: student,
            answers: vec![1, 1, 1, 1, 1, 0, 0, 0, 0],
        });
        assert!(matches!(scored, Response::Screening(ref r) if r.score == 5));

        let invalid = handler.handle(Request::SubmitScreening {
            student_id: student,
            answers: vec![1, 1],
        });
        assert!(matches!(
            invalid,
            Response::Error { kind: ErrorKind::Validation, .. }
        ));

        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        match handler.handle(Request::Rollup {
            population: vec![student, Uuid::new_v4()],
            from: day,
            to: day,
        }) {
            Response::Rollup(rollup) => {
                assert_eq!(rollup.participation_rate, 50);
                assert_eq!(rollup.total_screenings, 1);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_booking_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir);
        assert!(matches!(
            handler.handle(Request::Approve {
                booking_id: Uuid::new_v4()
            }),
            Response::Error { kind: ErrorKind::NotFound, .. }
        ));
    }
}
