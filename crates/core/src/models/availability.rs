//! Recurring weekly availability

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Day-of-week index for a calendar date (0 = Sunday .. 6 = Saturday)
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A counselor's recurring weekly availability window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub id: Uuid,
    pub counselor_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Soft-disable flag; templates are never hard-deleted
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityTemplate {
    pub fn new(
        counselor_id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self> {
        let now = Utc::now();
        let template = Self {
            id: Uuid::new_v4(),
            counselor_id,
            day_of_week,
            start_time,
            end_time,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<()> {
        validate_window(self.day_of_week, self.start_time, self.end_time)
    }

    /// Does this template produce slots on the given date?
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.is_active && self.day_of_week == day_of_week(date)
    }

    /// Split the window into consecutive sessions of `length`.
    ///
    /// A trailing remainder shorter than one session is not offered.
    pub fn session_ranges(&self, length: Duration) -> Vec<(NaiveTime, NaiveTime)> {
        let mut ranges = Vec::new();
        if length <= Duration::zero() {
            return ranges;
        }

        let mut start = self.start_time;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(length);
            if wrapped != 0 || end > self.end_time {
                break;
            }
            ranges.push((start, end));
            start = end;
        }
        ranges
    }
}

/// Validate a day-of-week and time range pair
pub fn validate_window(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Result<()> {
    if day_of_week > 6 {
        return Err(Error::Validation(format!(
            "day of week must be 0-6, got {}",
            day_of_week
        )));
    }
    // Stored at whole-second precision
    for time in [start_time, end_time] {
        if time.nanosecond() != 0 {
            return Err(Error::Validation(format!(
                "time {} must be a whole second",
                time
            )));
        }
    }
    if start_time >= end_time {
        return Err(Error::Validation(format!(
            "start time {} must be before end time {}",
            start_time, end_time
        )));
    }
    Ok(())
}
