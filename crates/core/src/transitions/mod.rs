//! Booking state machine
//!
//! Every booking transition names the slot status it expects and the slot
//! status it leaves behind, so booking and slot are always moved together.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{BookingStatus, SlotStatus};

/// Actions that move a booking between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingAction {
    Approve,
    Reject,
    Complete,
    Cancel,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Approve => "approve",
            BookingAction::Reject => "reject",
            BookingAction::Complete => "complete",
            BookingAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for BookingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planned lock-step change of a booking and its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub booking_from: BookingStatus,
    pub booking_to: BookingStatus,
    pub slot_from: SlotStatus,
    pub slot_to: SlotStatus,
}

/// Transition table for bookings
pub struct TransitionTable;

impl TransitionTable {
    /// Plan `action` from `from`.
    ///
    /// Terminal bookings refuse everything with `InvalidTransition`; a live
    /// booking in the wrong state gets `InvalidState`.
    pub fn plan(from: BookingStatus, action: BookingAction) -> Result<Transition> {
        if from.is_terminal() {
            return Err(Error::InvalidTransition { from, action });
        }

        let (booking_to, slot_from, slot_to) = match (from, action) {
            (BookingStatus::Pending, BookingAction::Approve) => {
                (BookingStatus::Confirmed, SlotStatus::Pending, SlotStatus::Booked)
            }
            (BookingStatus::Pending, BookingAction::Reject) => {
                (BookingStatus::Rejected, SlotStatus::Pending, SlotStatus::Available)
            }
            (BookingStatus::Confirmed, BookingAction::Complete) => {
                (BookingStatus::Completed, SlotStatus::Booked, SlotStatus::Booked)
            }
            (BookingStatus::Pending, BookingAction::Cancel) => {
                (BookingStatus::Cancelled, SlotStatus::Pending, SlotStatus::Available)
            }
            (BookingStatus::Confirmed, BookingAction::Cancel) => {
                (BookingStatus::Cancelled, SlotStatus::Booked, SlotStatus::Available)
            }
            (from, action) => {
                return Err(Error::InvalidState(format!(
                    "cannot {} a booking that is {}",
                    action, from
                )))
            }
        };

        Ok(Transition {
            booking_from: from,
            booking_to,
            slot_from,
            slot_to,
        })
    }

    /// Slot status a booking in `status` must see on its slot.
    ///
    /// Rejected and cancelled bookings released their slot, which may since
    /// have been claimed again, so they constrain nothing.
    pub fn expected_slot_status(status: BookingStatus) -> Option<SlotStatus> {
        match status {
            BookingStatus::Pending => Some(SlotStatus::Pending),
            BookingStatus::Confirmed | BookingStatus::Completed => Some(SlotStatus::Booked),
            BookingStatus::Rejected | BookingStatus::Cancelled => None,
        }
    }

    /// Actions currently permitted from `status`
    pub fn allowed_actions(status: BookingStatus) -> &'static [BookingAction] {
        match status {
            BookingStatus::Pending => &[
                BookingAction::Approve,
                BookingAction::Reject,
                BookingAction::Cancel,
            ],
            BookingStatus::Confirmed => &[BookingAction::Complete, BookingAction::Cancel],
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Rejected,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    const ALL_ACTIONS: [BookingAction; 4] = [
        BookingAction::Approve,
        BookingAction::Reject,
        BookingAction::Complete,
        BookingAction::Cancel,
    ];

    #[test]
    fn test_approve_moves_slot_to_booked() {
        let t = TransitionTable::plan(BookingStatus::Pending, BookingAction::Approve).unwrap();
        assert_eq!(t.booking_to, BookingStatus::Confirmed);
        assert_eq!(t.slot_from, SlotStatus::Pending);
        assert_eq!(t.slot_to, SlotStatus::Booked);
    }

    #[test]
    fn test_reject_and_cancel_release_slot() {
        let t = TransitionTable::plan(BookingStatus::Pending, BookingAction::Reject).unwrap();
        assert_eq!(t.slot_to, SlotStatus::Available);

        let t = TransitionTable::plan(BookingStatus::Confirmed, BookingAction::Cancel).unwrap();
        assert_eq!(t.slot_from, SlotStatus::Booked);
        assert_eq!(t.slot_to, SlotStatus::Available);
    }

    #[test]
    fn test_complete_keeps_slot_booked() {
        let t = TransitionTable::plan(BookingStatus::Confirmed, BookingAction::Complete).unwrap();
        assert_eq!(t.booking_to, BookingStatus::Completed);
        assert_eq!(t.slot_from, SlotStatus::Booked);
        assert_eq!(t.slot_to, SlotStatus::Booked);
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        for from in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for action in ALL_ACTIONS {
                assert!(matches!(
                    TransitionTable::plan(*from, action),
                    Err(Error::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_wrong_live_state_is_invalid_state() {
        assert!(matches!(
            TransitionTable::plan(BookingStatus::Confirmed, BookingAction::Approve),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            TransitionTable::plan(BookingStatus::Pending, BookingAction::Complete),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            TransitionTable::plan(BookingStatus::Confirmed, BookingAction::Reject),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_allowed_actions_agree_with_plan() {
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let allowed = TransitionTable::allowed_actions(from).contains(&action);
                assert_eq!(allowed, TransitionTable::plan(from, action).is_ok());
            }
        }
    }

    #[test]
    fn test_plan_lands_on_expected_slot_status() {
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                if let Ok(t) = TransitionTable::plan(from, action) {
                    assert_eq!(TransitionTable::expected_slot_status(from), Some(t.slot_from));
                    if let Some(expected) = TransitionTable::expected_slot_status(t.booking_to) {
                        assert_eq!(expected, t.slot_to);
                    }
                }
            }
        }
    }
}
