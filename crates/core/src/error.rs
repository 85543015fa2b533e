//! Error types for Counselbook Core

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::BookingStatus;
use crate::transitions::BookingAction;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: answers, rejection reason, time range, config
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lost a claim race or the slot was never open
    #[error("Slot {0} is no longer available, please choose another")]
    SlotUnavailable(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cannot {action} a {from} booking")]
    InvalidTransition {
        from: BookingStatus,
        action: BookingAction,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Coarse error classification for callers across a process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    SlotUnavailable,
    InvalidState,
    InvalidTransition,
    NotFound,
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::Config(_) => ErrorKind::Validation,
            Error::SlotUnavailable(_) => ErrorKind::SlotUnavailable,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Storage(_) | Error::Io(_) | Error::Serialization(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
