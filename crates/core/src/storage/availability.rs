//! Availability template storage operations

use chrono::{NaiveTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{fmt_time, parse_datetime, parse_time, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{validate_window, AvailabilityTemplate};

const TEMPLATE_COLUMNS: &str =
    "id, counselor_id, day_of_week, start_time, end_time, is_active, created_at, updated_at";

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<AvailabilityTemplate> {
    Ok(AvailabilityTemplate {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        counselor_id: parse_uuid(&row.get::<_, String>(1)?)?,
        day_of_week: row.get(2)?,
        start_time: parse_time(&row.get::<_, String>(3)?)?,
        end_time: parse_time(&row.get::<_, String>(4)?)?,
        is_active: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

pub struct AvailabilityStore<'a> {
    conn: &'a Connection,
}

impl<'a> AvailabilityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new template
    #[instrument(skip(self, template), fields(counselor_id = %template.counselor_id, day = template.day_of_week))]
    pub fn create(&self, template: &AvailabilityTemplate) -> Result<()> {
        template.validate()?;
        self.conn.execute(
            "INSERT INTO availability_templates (id, counselor_id, day_of_week, start_time, end_time, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                template.id.to_string(),
                template.counselor_id.to_string(),
                template.day_of_week,
                fmt_time(template.start_time),
                fmt_time(template.end_time),
                template.is_active as i32,
                template.created_at.to_rfc3339(),
                template.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find template by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<AvailabilityTemplate>> {
        let sql = format!(
            "SELECT {} FROM availability_templates WHERE id = ?1",
            TEMPLATE_COLUMNS
        );
        let template = self
            .conn
            .query_row(&sql, params![id.to_string()], template_from_row)
            .optional()?;
        Ok(template)
    }

    /// List all templates for a counselor, active or not
    #[instrument(skip(self))]
    pub fn list_for_counselor(&self, counselor_id: Uuid) -> Result<Vec<AvailabilityTemplate>> {
        let sql = format!(
            "SELECT {} FROM availability_templates WHERE counselor_id = ?1
             ORDER BY day_of_week, start_time",
            TEMPLATE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let templates = stmt
            .query_map(params![counselor_id.to_string()], template_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Active templates matching a day of the week
    #[instrument(skip(self))]
    pub fn active_for_day(
        &self,
        counselor_id: Uuid,
        day_of_week: u8,
    ) -> Result<Vec<AvailabilityTemplate>> {
        let sql = format!(
            "SELECT {} FROM availability_templates
             WHERE counselor_id = ?1 AND day_of_week = ?2 AND is_active = 1
             ORDER BY start_time",
            TEMPLATE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let templates = stmt
            .query_map(
                params![counselor_id.to_string(), day_of_week],
                template_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Soft-enable or soft-disable a template
    #[instrument(skip(self))]
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE availability_templates SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_active as i32, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("availability template {}", id)));
        }
        Ok(())
    }

    /// Change a template's day and time range
    ///
    /// Slots already generated from the old window are left as they are.
    #[instrument(skip(self))]
    pub fn update_window(
        &self,
        id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<()> {
        validate_window(day_of_week, start_time, end_time)?;
        let updated = self.conn.execute(
            "UPDATE availability_templates SET day_of_week = ?1, start_time = ?2, end_time = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                day_of_week,
                fmt_time(start_time),
                fmt_time(end_time),
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("availability template {}", id)));
        }
        Ok(())
    }
}
