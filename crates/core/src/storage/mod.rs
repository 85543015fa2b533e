//! SQLite storage layer for Counselbook

mod availability;
mod bookings;
mod migrations;
mod parse;
mod screenings;
mod sessions;
mod slots;
mod traits;

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AvailabilityTemplate, Booking, ScreeningResult, TimeSlot};

pub use availability::AvailabilityStore;
pub use bookings::BookingStore;
pub use screenings::ScreeningStore;
pub use sessions::SessionStore;
pub use slots::SlotStore;
pub use traits::{
    AvailabilityRepository, BookingRepository, ScreeningRepository, SlotRepository, Storage,
};

/// How long a writer waits on a locked database before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Main database handle
///
/// One handle wraps one SQLite connection. Concurrent request handlers each
/// open their own handle on the same file; the file is the only shared state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create database, waiting up to `busy_timeout` on locks
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let db = Self::attach(path, busy_timeout)?;
        db.init()?;
        Ok(db)
    }

    /// Open another connection to an already migrated database file
    pub fn attach<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::get_current_version(&self.conn)
    }

    /// Run `f` inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken up front, so two transactions on the same file
    /// are serialized. Returning an error from `f` rolls everything back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Get availability template store
    pub fn availability(&self) -> AvailabilityStore<'_> {
        AvailabilityStore::new(&self.conn)
    }

    /// Get time slot store
    pub fn slots(&self) -> SlotStore<'_> {
        SlotStore::new(&self.conn)
    }

    /// Get booking store
    pub fn bookings(&self) -> BookingStore<'_> {
        BookingStore::new(&self.conn)
    }

    /// Get screening result store
    pub fn screenings(&self) -> ScreeningStore<'_> {
        ScreeningStore::new(&self.conn)
    }

    /// Get session record store
    pub fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl AvailabilityRepository for Database {
    fn create_template(&self, template: &AvailabilityTemplate) -> Result<()> {
        self.availability().create(template)
    }

    fn find_template(&self, id: Uuid) -> Result<Option<AvailabilityTemplate>> {
        self.availability().find_by_id(id)
    }

    fn list_templates(&self, counselor_id: Uuid) -> Result<Vec<AvailabilityTemplate>> {
        self.availability().list_for_counselor(counselor_id)
    }

    fn active_templates_for_day(
        &self,
        counselor_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<AvailabilityTemplate>> {
        self.availability().active_for_day(counselor_id, day_of_week)
    }
}

impl SlotRepository for Database {
    fn find_slot(&self, id: Uuid) -> Result<Option<TimeSlot>> {
        self.slots().find_by_id(id)
    }

    fn list_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.slots().list_for_date(counselor_id, date)
    }

    fn list_available_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.slots().list_available(counselor_id, date)
    }
}

impl BookingRepository for Database {
    fn find_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        self.bookings().find_by_id(id)
    }

    fn list_bookings_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_for_counselor(counselor_id)
    }

    fn list_bookings_for_counselor_on(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>> {
        self.bookings().list_for_counselor_on(counselor_id, date)
    }

    fn list_bookings_for_student(&self, student_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_for_student(student_id)
    }

    fn list_pending_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.bookings().list_pending_for_counselor(counselor_id)
    }

    fn list_bookings_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Booking>> {
        self.bookings().list_between(from, to)
    }
}

impl ScreeningRepository for Database {
    fn create_screening(&self, result: &ScreeningResult) -> Result<()> {
        self.screenings().create(result)
    }

    fn list_screenings_for_student(&self, student_id: Uuid) -> Result<Vec<ScreeningResult>> {
        self.screenings().list_for_student(student_id)
    }

    fn latest_screening_for_student(&self, student_id: Uuid) -> Result<Option<ScreeningResult>> {
        self.screenings().latest_for_student(student_id)
    }

    fn list_all_screenings(&self) -> Result<Vec<ScreeningResult>> {
        self.screenings().list_all()
    }
}
