//! Time slot storage operations
//!
//! Status changes are conditional writes keyed on the expected prior status,
//! never a read followed by a write.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::parse::{
    fmt_date, fmt_time, parse_date, parse_datetime, parse_slot_status, parse_time, parse_uuid,
    OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{SlotStatus, TimeSlot};

const SLOT_COLUMNS: &str =
    "id, counselor_id, slot_date, start_time, end_time, status, created_at, updated_at";

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<TimeSlot> {
    Ok(TimeSlot {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        counselor_id: parse_uuid(&row.get::<_, String>(1)?)?,
        slot_date: parse_date(&row.get::<_, String>(2)?)?,
        start_time: parse_time(&row.get::<_, String>(3)?)?,
        end_time: parse_time(&row.get::<_, String>(4)?)?,
        status: parse_slot_status(&row.get::<_, String>(5)?)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

pub struct SlotStore<'a> {
    conn: &'a Connection,
}

impl<'a> SlotStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a slot unless one already exists for (counselor, date, start).
    ///
    /// Returns whether a row was inserted. An existing slot is left untouched
    /// whatever its status.
    #[instrument(skip(self, slot), fields(counselor_id = %slot.counselor_id, date = %slot.slot_date, start = %slot.start_time))]
    pub fn insert_if_absent(&self, slot: &TimeSlot) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO time_slots (id, counselor_id, slot_date, start_time, end_time, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(counselor_id, slot_date, start_time) DO NOTHING",
            params![
                slot.id.to_string(),
                slot.counselor_id.to_string(),
                fmt_date(slot.slot_date),
                fmt_time(slot.start_time),
                fmt_time(slot.end_time),
                slot.status.as_str(),
                slot.created_at.to_rfc3339(),
                slot.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Find slot by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<TimeSlot>> {
        let sql = format!("SELECT {} FROM time_slots WHERE id = ?1", SLOT_COLUMNS);
        let slot = self
            .conn
            .query_row(&sql, params![id.to_string()], slot_from_row)
            .optional()?;
        Ok(slot)
    }

    /// All slots for a counselor on a date
    #[instrument(skip(self))]
    pub fn list_for_date(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let sql = format!(
            "SELECT {} FROM time_slots WHERE counselor_id = ?1 AND slot_date = ?2
             ORDER BY start_time",
            SLOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let slots = stmt
            .query_map(
                params![counselor_id.to_string(), fmt_date(date)],
                slot_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    /// Available slots for a counselor on a date
    #[instrument(skip(self))]
    pub fn list_available(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let sql = format!(
            "SELECT {} FROM time_slots WHERE counselor_id = ?1 AND slot_date = ?2 AND status = ?3
             ORDER BY start_time",
            SLOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let slots = stmt
            .query_map(
                params![
                    counselor_id.to_string(),
                    fmt_date(date),
                    SlotStatus::Available.as_str()
                ],
                slot_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    /// Atomically move an available slot to pending.
    ///
    /// The guard and the write are one statement, so of two racing claims
    /// exactly one sees `available`.
    #[instrument(skip(self))]
    pub fn claim(&self, id: Uuid) -> Result<TimeSlot> {
        let sql = format!(
            "UPDATE time_slots SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND status = ?4
             RETURNING {}",
            SLOT_COLUMNS
        );
        let claimed = self
            .conn
            .query_row(
                &sql,
                params![
                    SlotStatus::Pending.as_str(),
                    Utc::now().to_rfc3339(),
                    id.to_string(),
                    SlotStatus::Available.as_str(),
                ],
                slot_from_row,
            )
            .optional()?;

        match claimed {
            Some(slot) => Ok(slot),
            None if self.find_by_id(id)?.is_some() => {
                debug!(slot_id = %id, "Slot claim lost");
                Err(Error::SlotUnavailable(id))
            }
            None => Err(Error::NotFound(format!("time slot {}", id))),
        }
    }

    /// Move a slot from `from` to `to` if it is still in `from`.
    ///
    /// Returns whether the slot was updated.
    #[instrument(skip(self))]
    pub fn transition(&self, id: Uuid, from: SlotStatus, to: SlotStatus) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE time_slots SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![
                to.as_str(),
                Utc::now().to_rfc3339(),
                id.to_string(),
                from.as_str()
            ],
        )?;
        Ok(updated == 1)
    }

    /// Counselor closes an available slot
    pub fn block(&self, id: Uuid) -> Result<()> {
        self.guarded_transition(id, SlotStatus::Available, SlotStatus::Blocked)
    }

    /// Counselor reopens a blocked slot
    pub fn unblock(&self, id: Uuid) -> Result<()> {
        self.guarded_transition(id, SlotStatus::Blocked, SlotStatus::Available)
    }

    fn guarded_transition(&self, id: Uuid, from: SlotStatus, to: SlotStatus) -> Result<()> {
        if self.transition(id, from, to)? {
            return Ok(());
        }
        match self.find_by_id(id)? {
            Some(slot) => Err(Error::InvalidState(format!(
                "time slot {} is {}, expected {}",
                id, slot.status, from
            ))),
            None => Err(Error::NotFound(format!("time slot {}", id))),
        }
    }
}
