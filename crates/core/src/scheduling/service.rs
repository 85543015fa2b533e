//! Booking lifecycle
//!
//! Every mutation runs in one IMMEDIATE transaction that moves the booking
//! and its slot together through conditional writes. Any failure drops the
//! transaction, so a half-applied transition is never visible.

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{Booking, SessionRecord, SessionSummary};
use crate::storage::{BookingStore, Database, SessionStore, SlotStore};
use crate::transitions::{BookingAction, TransitionTable};

/// Creates, transitions and queries bookings
pub struct BookingService<'a> {
    db: &'a Database,
}

impl<'a> BookingService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Claim an available slot for a student.
    ///
    /// Fails with `SlotUnavailable` when the slot is not available at the
    /// moment of the claim. A losing caller leaves no trace.
    #[instrument(skip(self, student_notes))]
    pub fn create(
        &self,
        student_id: Uuid,
        time_slot_id: Uuid,
        student_notes: Option<String>,
    ) -> Result<Booking> {
        let result = self.db.transaction(|conn| {
            let slot = SlotStore::new(conn).claim(time_slot_id)?;
            let booking = Booking::pending(student_id, &slot, student_notes);
            let bookings = BookingStore::new(conn);
            bookings.create(&booking)?;
            invariants::assert_booking_matches_slot(&booking, &slot);
            if cfg!(debug_assertions) {
                let held = bookings.list_for_slot(slot.id)?;
                invariants::assert_single_active_booking(slot.id, &held);
            }
            Ok(booking)
        });

        match &result {
            Ok(booking) => info!(
                booking_id = %booking.id,
                slot_id = %time_slot_id,
                %student_id,
                "Booking requested"
            ),
            Err(Error::SlotUnavailable(_)) => {
                warn!(slot_id = %time_slot_id, %student_id, "Slot claim refused")
            }
            Err(_) => {}
        }
        result
    }

    /// Counselor accepts a pending request
    #[instrument(skip(self))]
    pub fn approve(&self, booking_id: Uuid) -> Result<Booking> {
        self.apply(booking_id, BookingAction::Approve, None, |_, _| Ok(()))
    }

    /// Counselor declines a pending request, releasing the slot.
    ///
    /// The reason is trimmed and must not be blank.
    #[instrument(skip(self, reason))]
    pub fn reject(&self, booking_id: Uuid, reason: &str) -> Result<Booking> {
        self.apply(
            booking_id,
            BookingAction::Reject,
            Some(reason.trim()),
            |_, _| Ok(()),
        )
    }

    /// Close out a confirmed session and record its outcome
    #[instrument(skip(self, summary))]
    pub fn complete(&self, booking_id: Uuid, summary: SessionSummary) -> Result<Booking> {
        self.apply(booking_id, BookingAction::Complete, None, move |conn, booking| {
            summary.validate()?;
            let record = SessionRecord::new(booking.id, summary);
            SessionStore::new(conn).create(&record)
        })
    }

    /// Withdraw a pending or confirmed booking, releasing the slot
    #[instrument(skip(self))]
    pub fn cancel(&self, booking_id: Uuid) -> Result<Booking> {
        self.apply(booking_id, BookingAction::Cancel, None, |_, _| Ok(()))
    }

    /// Replace the counselor's notes on a pending or confirmed booking
    #[instrument(skip(self, notes))]
    pub fn annotate(&self, booking_id: Uuid, notes: &str) -> Result<Booking> {
        self.db.transaction(|conn| {
            let bookings = BookingStore::new(conn);
            if !bookings.set_counselor_notes(booking_id, notes)? {
                let booking = find_booking(&bookings, booking_id)?;
                return Err(Error::InvalidState(format!(
                    "booking {} is {}, notes can no longer change",
                    booking_id, booking.status
                )));
            }
            find_booking(&bookings, booking_id)
        })
    }

    fn apply<F>(
        &self,
        booking_id: Uuid,
        action: BookingAction,
        rejection_reason: Option<&str>,
        side_effect: F,
    ) -> Result<Booking>
    where
        F: FnOnce(&Connection, &Booking) -> Result<()>,
    {
        let booking = self.db.transaction(|conn| {
            let bookings = BookingStore::new(conn);
            let slots = SlotStore::new(conn);

            let current = find_booking(&bookings, booking_id)?;
            // State errors take precedence over bad input
            let plan = TransitionTable::plan(current.status, action)?;
            let needs_reason = action == BookingAction::Reject;
            if needs_reason && rejection_reason.map_or(true, str::is_empty) {
                return Err(Error::Validation(
                    "a reason is required to reject a booking".to_string(),
                ));
            }

            if !bookings.update_status(
                booking_id,
                plan.booking_from,
                plan.booking_to,
                rejection_reason,
            )? {
                return Err(Error::InvalidState(format!(
                    "booking {} changed while being updated",
                    booking_id
                )));
            }

            let slot_moved = if plan.slot_from == plan.slot_to {
                slots
                    .find_by_id(current.time_slot_id)?
                    .is_some_and(|slot| slot.status == plan.slot_from)
            } else {
                slots.transition(current.time_slot_id, plan.slot_from, plan.slot_to)?
            };
            if !slot_moved {
                return Err(Error::InvalidState(format!(
                    "slot {} is not {}",
                    current.time_slot_id, plan.slot_from
                )));
            }

            let updated = find_booking(&bookings, booking_id)?;
            side_effect(conn, &updated)?;

            if let Some(slot) = slots.find_by_id(updated.time_slot_id)? {
                invariants::assert_booking_matches_slot(&updated, &slot);
            }
            Ok(updated)
        })?;

        info!(
            booking_id = %booking.id,
            slot_id = %booking.time_slot_id,
            %action,
            status = %booking.status,
            "Booking transitioned"
        );
        Ok(booking)
    }

    /// Fetch one booking
    pub fn booking(&self, booking_id: Uuid) -> Result<Booking> {
        find_booking(&self.db.bookings(), booking_id)
    }

    /// All bookings for a counselor, newest date first
    pub fn bookings_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.db.bookings().list_for_counselor(counselor_id)
    }

    /// A counselor's bookings on one date, by start time
    pub fn bookings_for_counselor_on(
        &self,
        counselor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>> {
        self.db.bookings().list_for_counselor_on(counselor_id, date)
    }

    /// Confirmed sessions a counselor holds on one date
    pub fn sessions_on(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<Booking>> {
        self.db
            .bookings()
            .list_confirmed_for_counselor_on(counselor_id, date)
    }

    pub fn bookings_for_student(&self, student_id: Uuid) -> Result<Vec<Booking>> {
        self.db.bookings().list_for_student(student_id)
    }

    /// Requests awaiting the counselor, soonest first
    pub fn pending_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<Booking>> {
        self.db.bookings().list_pending_for_counselor(counselor_id)
    }

    /// Outcome recorded when a booking was completed
    pub fn session_record(&self, booking_id: Uuid) -> Result<Option<SessionRecord>> {
        self.db.sessions().find_for_booking(booking_id)
    }
}

fn find_booking(bookings: &BookingStore<'_>, booking_id: Uuid) -> Result<Booking> {
    bookings
        .find_by_id(booking_id)?
        .ok_or_else(|| Error::NotFound(format!("booking {}", booking_id)))
}
