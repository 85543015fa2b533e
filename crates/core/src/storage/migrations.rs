//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial scheduling schema",
        sql: r#"
            -- Recurring weekly availability per counselor
            CREATE TABLE IF NOT EXISTS availability_templates (
                id TEXT PRIMARY KEY,
                counselor_id TEXT NOT NULL,
                day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (start_time < end_time)
            );

            -- Concrete dated slots, one per (counselor, date, start)
            CREATE TABLE IF NOT EXISTS time_slots (
                id TEXT PRIMARY KEY,
                counselor_id TEXT NOT NULL,
                slot_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'available'
                    CHECK (status IN ('available', 'pending', 'booked', 'blocked')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(counselor_id, slot_date, start_time)
            );

            -- Bookings keep a copy of the slot range
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                student_id TEXT NOT NULL,
                counselor_id TEXT NOT NULL,
                time_slot_id TEXT NOT NULL,
                booking_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'confirmed', 'rejected', 'completed', 'cancelled')),
                rejection_reason TEXT,
                student_notes TEXT,
                counselor_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (time_slot_id) REFERENCES time_slots(id) ON DELETE RESTRICT,
                CHECK (status <> 'rejected' OR COALESCE(length(trim(rejection_reason)), 0) > 0)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Enforce one active booking per slot",
        sql: r#"
            -- At most one pending/confirmed booking may reference a slot
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_slot
                ON bookings(time_slot_id)
                WHERE status IN ('pending', 'confirmed');
        "#,
    },
    Migration {
        version: 3,
        description: "Add screening results and session records",
        sql: r#"
            -- PHQ-9 results, immutable once written
            CREATE TABLE IF NOT EXISTS screening_results (
                id TEXT PRIMARY KEY,
                student_id TEXT NOT NULL,
                answers_json TEXT NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 27),
                severity TEXT NOT NULL,
                recommendation TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Outcome of a completed booking
            CREATE TABLE IF NOT EXISTS session_records (
                id TEXT PRIMARY KEY,
                booking_id TEXT NOT NULL UNIQUE,
                session_notes TEXT,
                summary TEXT,
                next_steps TEXT,
                rating INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
                completed_at TEXT NOT NULL,
                FOREIGN KEY (booking_id) REFERENCES bookings(id) ON DELETE RESTRICT
            );
        "#,
    },
    Migration {
        version: 4,
        description: "Add indexes for scheduling queries",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_templates_counselor_day
                ON availability_templates(counselor_id, day_of_week);
            CREATE INDEX IF NOT EXISTS idx_slots_counselor_date
                ON time_slots(counselor_id, slot_date);
            CREATE INDEX IF NOT EXISTS idx_bookings_counselor_date
                ON bookings(counselor_id, booking_date);
            CREATE INDEX IF NOT EXISTS idx_bookings_student ON bookings(student_id);
            CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
            CREATE INDEX IF NOT EXISTS idx_screening_student
                ON screening_results(student_id, created_at);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
pub(crate) fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
///
/// Each migration runs in its own transaction together with its version row,
/// so two processes opening the same file never apply one twice.
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        let tx = rusqlite::Transaction::new_unchecked(
            conn,
            rusqlite::TransactionBehavior::Immediate,
        )?;
        if migration.version > get_current_version(&tx)? {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            tx.execute_batch(migration.sql)?;
            record_migration(&tx, migration)?;
            tx.commit()?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Get the latest migration version (test helper)
    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run twice
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_slot_uniqueness_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = "INSERT INTO time_slots (id, counselor_id, slot_date, start_time, end_time, status, created_at, updated_at)
                      VALUES (?1, 'c1', '2024-06-03', '09:00:00', '10:00:00', 'available', 'now', 'now')";
        conn.execute(insert, ["s1"]).unwrap();
        assert!(conn.execute(insert, ["s2"]).is_err());
    }
}
