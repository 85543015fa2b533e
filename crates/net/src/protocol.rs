//! Request/response message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. Each
//! request frame is answered by exactly one response frame, in order.

use chrono::{NaiveDate, NaiveTime};
use counselbook_core::analytics::InstituteRollup;
use counselbook_core::{
    AvailabilityTemplate, Booking, ErrorKind, ScreeningResult, SessionRecord, SessionSummary,
    TimeSlot,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calls a client can make
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Liveness check
    Ping,

    AddTemplate {
        counselor_id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    ListTemplates {
        counselor_id: Uuid,
    },
    SetTemplateActive {
        template_id: Uuid,
        is_active: bool,
    },
    UpdateTemplate {
        template_id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    },

    EnsureSlots {
        counselor_id: Uuid,
        date: NaiveDate,
    },
    /// Ensure, then list claimable slots
    AvailableSlots {
        counselor_id: Uuid,
        date: NaiveDate,
    },
    BlockSlot {
        slot_id: Uuid,
    },
    UnblockSlot {
        slot_id: Uuid,
    },

    CreateBooking {
        student_id: Uuid,
        time_slot_id: Uuid,
        #[serde(default)]
        notes: Option<String>,
    },
    Approve {
        booking_id: Uuid,
    },
    Reject {
        booking_id: Uuid,
        reason: String,
    },
    Complete {
        booking_id: Uuid,
        #[serde(default)]
        summary: SessionSummary,
    },
    Cancel {
        booking_id: Uuid,
    },
    Annotate {
        booking_id: Uuid,
        notes: String,
    },
    GetBooking {
        booking_id: Uuid,
    },
    /// All of a counselor's bookings, or one date's when given
    CounselorBookings {
        counselor_id: Uuid,
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    StudentBookings {
        student_id: Uuid,
    },
    PendingRequests {
        counselor_id: Uuid,
    },
    /// Confirmed sessions on one date
    SessionsOn {
        counselor_id: Uuid,
        date: NaiveDate,
    },
    SessionRecord {
        booking_id: Uuid,
    },

    SubmitScreening {
        student_id: Uuid,
        answers: Vec<i32>,
    },
    StudentScreenings {
        student_id: Uuid,
    },

    Rollup {
        population: Vec<Uuid>,
        from: NaiveDate,
        to: NaiveDate,
    },
}

/// Answers to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Response {
    Pong,
    /// Mutation applied, nothing to return
    Done,
    Template(AvailabilityTemplate),
    Templates(Vec<AvailabilityTemplate>),
    SlotsCreated(usize),
    Slot(TimeSlot),
    Slots(Vec<TimeSlot>),
    Booking(Booking),
    Bookings(Vec<Booking>),
    SessionRecord(Option<SessionRecord>),
    Screening(ScreeningResult),
    Screenings(Vec<ScreeningResult>),
    Rollup(InstituteRollup),
    /// The call failed; `kind` tells expected outcomes from faults
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn error(err: &counselbook_core::Error) -> Self {
        Response::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
