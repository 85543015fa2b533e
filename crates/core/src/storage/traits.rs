//! Storage repository traits
//!
//! Read-side interface over the scheduling tables. Mutations that must move
//! several rows together go through the services, which own transactions.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AvailabilityTemplate, Booking, ScreeningResult, TimeSlot};

/// Availability template operations
pub trait AvailabilityRepository {
    /// Create a new template
    fn create_template(&self, template: &AvailabilityTemplate) -> Result<()>;

    /// Find template by ID
    fn find_template(&self, id: Uuid) -> Result<Option<AvailabilityTemplate>>;

    /// List every template for a counselor
    fn list_templates(&self, counselor_id: Uuid) -> Result<Vec<AvailabilityTemplate>>;

    /// Active templates for one day of the week
    fn active_templates_for_day(
        &self,
        counselor_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<AvailabilityTemplate>>;
}

/// Time slot reads
pub trait SlotRepository {
    /// Find slot by ID
    fn find_slot(&self, id: Uuid) -> Result<Option<TimeSlot>>;

    /// All slots for a counselor on a date, by start time
    fn list_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>>;

    /// Claimable slots for a counselor on a date, by start time
    fn list_available_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>>;
}

/// Booking reads
pub trait BookingRepository {
    /// Find booking by ID
    fn find_booking(&self, id: Uuid) -> Result<Option<Booking>>;

    /// All bookings for a counselor, newest date first
    fn list_bookings_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>>;

    /// Bookings for a counselor on one date
    fn list_bookings_for_counselor_on(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>>;

    /// All bookings made by a student
    fn list_bookings_for_student(&self, student_id: Uuid) -> Result<Vec<Booking>>;

    /// Requests awaiting the counselor's decision
    fn list_pending_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>>;

    /// Bookings dated within `from..=to`
    fn list_bookings_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Booking>>;
}

/// Screening result operations
pub trait ScreeningRepository {
    /// Store a new result
    fn create_screening(&self, result: &ScreeningResult) -> Result<()>;

    /// A student's results, newest first
    fn list_screenings_for_student(&self, student_id: Uuid) -> Result<Vec<ScreeningResult>>;

    /// A student's most recent result
    fn latest_screening_for_student(&self, student_id: Uuid) -> Result<Option<ScreeningResult>>;

    /// Every stored result
    fn list_all_screenings(&self) -> Result<Vec<ScreeningResult>>;
}

/// Combined storage interface
pub trait Storage:
    AvailabilityRepository + SlotRepository + BookingRepository + ScreeningRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: AvailabilityRepository + SlotRepository + BookingRepository + ScreeningRepository
{
}
