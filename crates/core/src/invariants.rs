//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{AvailabilityTemplate, Booking, BookingStatus, ScreeningResult, TimeSlot};
use crate::screening::MAX_SCORE;
use crate::transitions::TransitionTable;

/// Validate that a template's window is well formed
pub fn assert_template_invariants(template: &AvailabilityTemplate) {
    debug_assert!(
        template.day_of_week <= 6,
        "Template {} has day of week {}",
        template.id,
        template.day_of_week
    );

    debug_assert!(
        template.start_time < template.end_time,
        "Template {} starts at {} but ends at {}",
        template.id,
        template.start_time,
        template.end_time
    );
}

/// Validate that a booking and the slot it references agree
pub fn assert_booking_matches_slot(booking: &Booking, slot: &TimeSlot) {
    debug_assert!(
        booking.time_slot_id == slot.id,
        "Booking {} references slot {} but was checked against {}",
        booking.id,
        booking.time_slot_id,
        slot.id
    );

    debug_assert!(
        booking.counselor_id == slot.counselor_id,
        "Booking {} counselor {} differs from slot owner {}",
        booking.id,
        booking.counselor_id,
        slot.counselor_id
    );

    if let Some(expected) = TransitionTable::expected_slot_status(booking.status) {
        debug_assert!(
            slot.status == expected,
            "Booking {} is {} but slot {} is {}, expected {}",
            booking.id,
            booking.status,
            slot.id,
            slot.status,
            expected
        );
    }

    // A rejection always carries its reason
    debug_assert!(
        booking.status != BookingStatus::Rejected
            || booking
                .rejection_reason
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty()),
        "Booking {} is rejected without a reason",
        booking.id
    );
}

/// Validate that at most one booking holds a slot
pub fn assert_single_active_booking(slot_id: Uuid, bookings: &[Booking]) {
    let active = bookings
        .iter()
        .filter(|b| b.time_slot_id == slot_id && b.status.is_active())
        .count();
    debug_assert!(
        active <= 1,
        "Slot {} has {} active bookings",
        slot_id,
        active
    );
}

/// Validate that a stored score is the sum of its answers
pub fn assert_screening_invariants(result: &ScreeningResult) {
    let sum: u32 = result.answers.iter().map(|a| u32::from(*a)).sum();
    debug_assert!(
        sum == u32::from(result.score) && result.score <= MAX_SCORE,
        "Screening {} has score {} but answers sum to {}",
        result.id,
        result.score,
        sum
    );
}
