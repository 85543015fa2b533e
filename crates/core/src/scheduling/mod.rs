//! Scheduling services
//!
//! [`SlotGenerator`] turns weekly availability into dated slots and
//! [`BookingService`] moves bookings through their lifecycle, keeping each
//! booking and its slot in lock-step.

mod generator;
mod service;

pub use generator::{SlotGenerator, DEFAULT_SESSION_MINUTES};
pub use service::BookingService;
