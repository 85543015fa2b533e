//! Counselbook Core Library
//!
//! Availability, slot generation, the booking state machine, PHQ-9
//! screening and institute analytics, backed by SQLite.

pub mod analytics;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod scheduling;
pub mod screening;
pub mod storage;
pub mod transitions;

pub use analytics::{AnalyticsAggregator, InstituteRollup};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use scheduling::{BookingService, SlotGenerator};
pub use screening::Phq9Score;
pub use storage::{
    AvailabilityRepository, BookingRepository, Database, ScreeningRepository, SlotRepository,
    Storage,
};
pub use transitions::{BookingAction, Transition, TransitionTable};
