//! Booking model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TimeSlot;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting counselor review
    Pending,
    /// Approved by the counselor
    Confirmed,
    /// Declined by the counselor (terminal)
    Rejected,
    /// Session held (terminal)
    Completed,
    /// Withdrawn before the session (terminal)
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "rejected" => Some(BookingStatus::Rejected),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled
        )
    }

    /// Pending or confirmed bookings hold their slot
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's request for one time slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub counselor_id: Uuid,
    pub time_slot_id: Uuid,
    /// Copied from the slot at creation so the record stays stable
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    /// Required when status is rejected
    pub rejection_reason: Option<String>,
    pub student_notes: Option<String>,
    pub counselor_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh pending booking against a claimed slot
    pub fn pending(student_id: Uuid, slot: &TimeSlot, student_notes: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            counselor_id: slot.counselor_id,
            time_slot_id: slot.id,
            booking_date: slot.slot_date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: BookingStatus::Pending,
            rejection_reason: None,
            student_notes: student_notes.filter(|n| !n.trim().is_empty()),
            counselor_notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
