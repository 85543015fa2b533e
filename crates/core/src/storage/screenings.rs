//! Screening result storage operations
//!
//! Results are append-only; re-screening adds a row.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_answers, parse_datetime, parse_severity, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::ScreeningResult;

const SCREENING_COLUMNS: &str =
    "id, student_id, answers_json, score, severity, recommendation, created_at";

fn screening_from_row(row: &Row<'_>) -> rusqlite::Result<ScreeningResult> {
    Ok(ScreeningResult {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        student_id: parse_uuid(&row.get::<_, String>(1)?)?,
        answers: parse_answers(&row.get::<_, String>(2)?)?,
        score: row.get(3)?,
        severity: parse_severity(&row.get::<_, String>(4)?)?,
        recommendation: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

pub struct ScreeningStore<'a> {
    conn: &'a Connection,
}

impl<'a> ScreeningStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a scored questionnaire
    #[instrument(skip(self, result), fields(student_id = %result.student_id, score = result.score))]
    pub fn create(&self, result: &ScreeningResult) -> Result<()> {
        let answers_json = serde_json::to_string(&result.answers)?;
        self.conn.execute(
            "INSERT INTO screening_results (id, student_id, answers_json, score, severity, recommendation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.id.to_string(),
                result.student_id.to_string(),
                answers_json,
                result.score,
                result.severity.label(),
                result.recommendation,
                result.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ScreeningResult>> {
        let sql = format!(
            "SELECT {} FROM screening_results WHERE id = ?1",
            SCREENING_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![id.to_string()], screening_from_row)
            .optional()?;
        Ok(result)
    }

    /// A student's results, newest first
    #[instrument(skip(self))]
    pub fn list_for_student(&self, student_id: Uuid) -> Result<Vec<ScreeningResult>> {
        let sql = format!(
            "SELECT {} FROM screening_results WHERE student_id = ?1
             ORDER BY created_at DESC, rowid DESC",
            SCREENING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let results = stmt
            .query_map(params![student_id.to_string()], screening_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    #[instrument(skip(self))]
    pub fn latest_for_student(&self, student_id: Uuid) -> Result<Option<ScreeningResult>> {
        let sql = format!(
            "SELECT {} FROM screening_results WHERE student_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            SCREENING_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![student_id.to_string()], screening_from_row)
            .optional()?;
        Ok(result)
    }

    /// Every stored result, oldest first
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<ScreeningResult>> {
        let sql = format!(
            "SELECT {} FROM screening_results ORDER BY created_at, rowid",
            SCREENING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let results = stmt
            .query_map([], screening_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::screening::evaluate;
    use crate::storage::Database;

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let result = evaluate(Uuid::new_v4(), &[2, 2, 2, 2, 2, 2, 2, 2, 2]).unwrap();

        db.screenings().create(&result).unwrap();
        let stored = db.screenings().find_by_id(result.id).unwrap().unwrap();
        assert_eq!(stored, result);
        assert_eq!(stored.severity, Severity::ModeratelySevere);
    }

    #[test]
    fn test_rescreening_keeps_history() {
        let db = Database::open_in_memory().unwrap();
        let student = Uuid::new_v4();

        let first = evaluate(student, &[0; 9]).unwrap();
        let second = evaluate(student, &[3; 9]).unwrap();
        db.screenings().create(&first).unwrap();
        db.screenings().create(&second).unwrap();
        db.screenings()
            .create(&evaluate(Uuid::new_v4(), &[1; 9]).unwrap())
            .unwrap();

        let history = db.screenings().list_for_student(student).unwrap();
        assert_eq!(
            history.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(
            db.screenings().latest_for_student(student).unwrap(),
            Some(second)
        );
        assert_eq!(db.screenings().list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_no_results_for_new_student() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .screenings()
            .latest_for_student(Uuid::new_v4())
            .unwrap()
            .is_none());
    }
}
