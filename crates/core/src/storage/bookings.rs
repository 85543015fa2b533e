//! Booking storage operations

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    fmt_date, fmt_time, parse_booking_status, parse_date, parse_datetime, parse_time, parse_uuid,
    OptionalExt,
};
use crate::error::Result;
use crate::models::{Booking, BookingStatus};

const BOOKING_COLUMNS: &str = "id, student_id, counselor_id, time_slot_id, booking_date, start_time, end_time, status, rejection_reason, student_notes, counselor_notes, created_at, updated_at";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        student_id: parse_uuid(&row.get::<_, String>(1)?)?,
        counselor_id: parse_uuid(&row.get::<_, String>(2)?)?,
        time_slot_id: parse_uuid(&row.get::<_, String>(3)?)?,
        booking_date: parse_date(&row.get::<_, String>(4)?)?,
        start_time: parse_time(&row.get::<_, String>(5)?)?,
        end_time: parse_time(&row.get::<_, String>(6)?)?,
        status: parse_booking_status(&row.get::<_, String>(7)?)?,
        rejection_reason: row.get(8)?,
        student_notes: row.get(9)?,
        counselor_notes: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(12)?)?,
    })
}

pub struct BookingStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new booking
    #[instrument(skip(self, booking), fields(booking_id = %booking.id, slot_id = %booking.time_slot_id))]
    pub fn create(&self, booking: &Booking) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bookings (id, student_id, counselor_id, time_slot_id, booking_date, start_time, end_time, status, rejection_reason, student_notes, counselor_notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                booking.id.to_string(),
                booking.student_id.to_string(),
                booking.counselor_id.to_string(),
                booking.time_slot_id.to_string(),
                fmt_date(booking.booking_date),
                fmt_time(booking.start_time),
                fmt_time(booking.end_time),
                booking.status.as_str(),
                booking.rejection_reason,
                booking.student_notes,
                booking.counselor_notes,
                booking.created_at.to_rfc3339(),
                booking.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find booking by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS);
        let booking = self
            .conn
            .query_row(&sql, params![id.to_string()], booking_from_row)
            .optional()?;
        Ok(booking)
    }

    /// Move a booking from `from` to `to` if it is still in `from`.
    ///
    /// A rejection reason, when given, is stored with the new status.
    /// Returns whether the booking was updated.
    #[instrument(skip(self, rejection_reason))]
    pub fn update_status(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        rejection_reason: Option<&str>,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE bookings SET status = ?1, rejection_reason = COALESCE(?2, rejection_reason), updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                to.as_str(),
                rejection_reason,
                Utc::now().to_rfc3339(),
                id.to_string(),
                from.as_str(),
            ],
        )?;
        Ok(updated == 1)
    }

    /// Replace counselor notes on a live (pending or confirmed) booking.
    ///
    /// Returns whether the booking was updated.
    #[instrument(skip(self, notes))]
    pub fn set_counselor_notes(&self, id: Uuid, notes: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE bookings SET counselor_notes = ?1, updated_at = ?2
             WHERE id = ?3 AND status IN ('pending', 'confirmed')",
            params![notes, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(updated == 1)
    }

    /// All bookings for a counselor, newest date first
    #[instrument(skip(self))]
    pub fn list_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE counselor_id = ?1 ORDER BY booking_date DESC, start_time DESC",
            params![counselor_id.to_string()],
        )
    }

    /// Bookings for a counselor on one date, by start time
    #[instrument(skip(self))]
    pub fn list_for_counselor_on(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE counselor_id = ?1 AND booking_date = ?2 ORDER BY start_time, created_at",
            params![counselor_id.to_string(), fmt_date(date)],
        )
    }

    /// Confirmed sessions for a counselor on one date
    #[instrument(skip(self))]
    pub fn list_confirmed_for_counselor_on(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE counselor_id = ?1 AND booking_date = ?2 AND status = ?3 ORDER BY start_time",
            params![
                counselor_id.to_string(),
                fmt_date(date),
                BookingStatus::Confirmed.as_str()
            ],
        )
    }

    /// All bookings made by a student, newest date first
    #[instrument(skip(self))]
    pub fn list_for_student(&self, student_id: Uuid) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE student_id = ?1 ORDER BY booking_date DESC, start_time DESC",
            params![student_id.to_string()],
        )
    }

    /// Pending requests for a counselor, soonest first
    #[instrument(skip(self))]
    pub fn list_pending_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE counselor_id = ?1 AND status = ?2 ORDER BY booking_date, start_time",
            params![counselor_id.to_string(), BookingStatus::Pending.as_str()],
        )
    }

    /// Bookings dated within `from..=to`
    #[instrument(skip(self))]
    pub fn list_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE booking_date BETWEEN ?1 AND ?2 ORDER BY booking_date, start_time",
            params![fmt_date(from), fmt_date(to)],
        )
    }

    /// Every booking that has ever referenced a slot, oldest first
    #[instrument(skip(self))]
    pub fn list_for_slot(&self, slot_id: Uuid) -> Result<Vec<Booking>> {
        self.query_list(
            "WHERE time_slot_id = ?1 ORDER BY created_at",
            params![slot_id.to_string()],
        )
    }

    fn query_list(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings {}", BOOKING_COLUMNS, clause);
        let mut stmt = self.conn.prepare(&sql)?;
        let bookings = stmt
            .query_map(params, booking_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlot;
    use crate::storage::Database;
    use chrono::NaiveTime;

    fn insert_slot(db: &Database, counselor: Uuid, date: NaiveDate, hour: u32) -> TimeSlot {
        let slot = TimeSlot::new(
            counselor,
            date,
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
        );
        db.slots().insert_if_absent(&slot).unwrap();
        slot
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let slot = insert_slot(&db, Uuid::new_v4(), date, 9);
        let booking = Booking::pending(Uuid::new_v4(), &slot, Some("first visit".to_string()));

        db.bookings().create(&booking).unwrap();
        assert_eq!(db.bookings().find_by_id(booking.id).unwrap(), Some(booking));
    }

    #[test]
    fn test_second_active_booking_for_slot_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let slot = insert_slot(&db, Uuid::new_v4(), date, 9);

        db.bookings()
            .create(&Booking::pending(Uuid::new_v4(), &slot, None))
            .unwrap();
        let second = db
            .bookings()
            .create(&Booking::pending(Uuid::new_v4(), &slot, None));
        assert!(second.is_err());
    }

    #[test]
    fn test_update_status_is_conditional() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let slot = insert_slot(&db, Uuid::new_v4(), date, 9);
        let booking = Booking::pending(Uuid::new_v4(), &slot, None);
        let store = db.bookings();
        store.create(&booking).unwrap();

        assert!(store
            .update_status(booking.id, BookingStatus::Pending, BookingStatus::Confirmed, None)
            .unwrap());
        // Already confirmed, so the pending guard no longer matches
        assert!(!store
            .update_status(booking.id, BookingStatus::Pending, BookingStatus::Rejected, Some("late"))
            .unwrap());

        let stored = store.find_by_id(booking.id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.rejection_reason, None);
    }

    #[test]
    fn test_rejected_requires_reason_in_schema() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let slot = insert_slot(&db, Uuid::new_v4(), date, 9);
        let booking = Booking::pending(Uuid::new_v4(), &slot, None);
        db.bookings().create(&booking).unwrap();

        let result = db.bookings().update_status(
            booking.id,
            BookingStatus::Pending,
            BookingStatus::Rejected,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_queries_filter_and_order() {
        let db = Database::open_in_memory().unwrap();
        let counselor = Uuid::new_v4();
        let student = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        let a = Booking::pending(student, &insert_slot(&db, counselor, monday, 14), None);
        let b = Booking::pending(student, &insert_slot(&db, counselor, monday, 9), None);
        let c = Booking::pending(Uuid::new_v4(), &insert_slot(&db, counselor, tuesday, 9), None);
        for booking in [&a, &b, &c] {
            db.bookings().create(booking).unwrap();
        }
        db.bookings()
            .update_status(c.id, BookingStatus::Pending, BookingStatus::Confirmed, None)
            .unwrap();

        let ids = |list: Vec<Booking>| list.into_iter().map(|b| b.id).collect::<Vec<_>>();

        assert_eq!(
            ids(db.bookings().list_for_counselor_on(counselor, monday).unwrap()),
            vec![b.id, a.id]
        );
        assert_eq!(
            ids(db.bookings().list_for_counselor(counselor).unwrap()),
            vec![c.id, a.id, b.id]
        );
        assert_eq!(
            ids(db.bookings().list_pending_for_counselor(counselor).unwrap()),
            vec![b.id, a.id]
        );
        assert_eq!(
            ids(db.bookings().list_for_student(student).unwrap()),
            vec![a.id, b.id]
        );
        assert_eq!(
            ids(db.bookings().list_confirmed_for_counselor_on(counselor, tuesday).unwrap()),
            vec![c.id]
        );
        assert_eq!(db.bookings().list_between(tuesday, tuesday).unwrap().len(), 1);
    }

    #[test]
    fn test_counselor_notes_only_on_live_bookings() {
        let db = Database::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let slot = insert_slot(&db, Uuid::new_v4(), date, 9);
        let booking = Booking::pending(Uuid::new_v4(), &slot, None);
        let store = db.bookings();
        store.create(&booking).unwrap();

        assert!(store.set_counselor_notes(booking.id, "bring intake form").unwrap());
        store
            .update_status(booking.id, BookingStatus::Pending, BookingStatus::Cancelled, None)
            .unwrap();
        assert!(!store.set_counselor_notes(booking.id, "too late").unwrap());

        let stored = store.find_by_id(booking.id).unwrap().unwrap();
        assert_eq!(stored.counselor_notes.as_deref(), Some("bring intake form"));
    }
}
