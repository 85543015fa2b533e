//! Session records written when a booking completes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Counselor input when closing out a confirmed booking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub session_notes: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub next_steps: Option<String>,
    /// Satisfaction rating, 1-5
    #[serde(default)]
    pub rating: Option<u8>,
}

impl SessionSummary {
    pub fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(Error::Validation(format!(
                    "session rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }
        Ok(())
    }
}

/// Persisted outcome of a completed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub session_notes: Option<String>,
    pub summary: Option<String>,
    pub next_steps: Option<String>,
    pub rating: Option<u8>,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(booking_id: Uuid, summary: SessionSummary) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            session_notes: summary.session_notes,
            summary: summary.summary,
            next_steps: summary.next_steps,
            rating: summary.rating,
            completed_at: Utc::now(),
        }
    }
}
