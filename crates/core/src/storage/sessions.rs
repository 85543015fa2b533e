//! Session record storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::SessionRecord;

const SESSION_COLUMNS: &str =
    "id, booking_id, session_notes, summary, next_steps, rating, completed_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        booking_id: parse_uuid(&row.get::<_, String>(1)?)?,
        session_notes: row.get(2)?,
        summary: row.get(3)?,
        next_steps: row.get(4)?,
        rating: row.get(5)?,
        completed_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert the record for a completed booking. At most one per booking.
    #[instrument(skip(self, record), fields(booking_id = %record.booking_id))]
    pub fn create(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO session_records (id, booking_id, session_notes, summary, next_steps, rating, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.booking_id.to_string(),
                record.session_notes,
                record.summary,
                record.next_steps,
                record.rating,
                record.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_for_booking(&self, booking_id: Uuid) -> Result<Option<SessionRecord>> {
        let sql = format!(
            "SELECT {} FROM session_records WHERE booking_id = ?1",
            SESSION_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![booking_id.to_string()], session_from_row)
            .optional()?;
        Ok(record)
    }
}
