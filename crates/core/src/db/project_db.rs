use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::{RunEntry, RunRecord, RunStatus};

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for project database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    /// A stored status string is not a known `RunStatus`.
    #[error("Invalid run status '{0}' in ledger")]
    InvalidStatus(String),
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed run ledger.
///
/// This is a thin wrapper around `rusqlite::Connection` that is responsible for:
/// - Opening/creating the DB file.
/// - Applying schema migrations.
/// - Recording runs and their reports.
#[derive(Debug)]
pub struct ProjectDb {
    conn: Connection,
}

const RUN_COLUMNS: &str =
    "id, kind, name, input_hash, status, started_at, finished_at, output_dir";

fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, RunRecord, String)> {
    let status: String = row.get(4)?;
    Ok((
        row.get(0)?,
        RunRecord {
            kind: row.get(1)?,
            name: row.get(2)?,
            input_hash: row.get(3)?,
            status: RunStatus::Pending,
            started_at: row.get(5)?,
            finished_at: row.get(6)?,
            output_dir: row.get(7)?,
        },
        status,
    ))
}

fn into_entry((id, mut record, status): (i64, RunRecord, String)) -> DbResult<RunEntry> {
    record.status = status.parse().map_err(|_| DbError::InvalidStatus(status))?;
    Ok(RunEntry { id, record })
}

impl ProjectDb {
    /// Open (or create) a project database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> DbResult<i32> {
        current_schema_version(&self.conn)
    }

    /// Insert a run record and return its id.
    pub fn insert_run(&self, record: &RunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO runs (kind, name, input_hash, status, started_at, finished_at, output_dir)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.kind,
                record.name,
                record.input_hash,
                record.status.as_str(),
                record.started_at,
                record.finished_at,
                record.output_dir,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update status (and optionally finished_at) for a run.
    ///
    /// Returns the number of rows affected.
    pub fn update_run_status(
        &self,
        id: i64,
        status: RunStatus,
        finished_at: Option<&str>,
    ) -> DbResult<usize> {
        let affected = match finished_at {
            Some(finish) => self.conn.execute(
                "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
                params![status.as_str(), finish, id],
            )?,
            None => self.conn.execute(
                "UPDATE runs SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?,
        };
        Ok(affected)
    }

    pub fn set_run_output_dir(&self, id: i64, output_dir: &str) -> DbResult<usize> {
        Ok(self
            .conn
            .execute("UPDATE runs SET output_dir = ?1 WHERE id = ?2", params![output_dir, id])?)
    }

    /// List runs in insertion order, optionally filtered by kind.
    pub fn list_runs(&self, kind: Option<&str>) -> DbResult<Vec<RunEntry>> {
        let rows = match kind {
            Some(kind) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {RUN_COLUMNS} FROM runs WHERE kind = ?1 ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![kind], map_run)?.collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    self.conn.prepare(&format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY id"))?;
                let rows = stmt.query_map([], map_run)?.collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(into_entry).collect()
    }

    pub fn get_run(&self, id: i64) -> DbResult<Option<RunEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![id],
                map_run,
            )
            .optional()?;
        row.map(into_entry).transpose()
    }

    /// Most recent run id for a kind/name pair.
    pub fn latest_run_id(&self, kind: &str, name: &str) -> DbResult<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM runs WHERE kind = ?1 AND name = ?2 ORDER BY id DESC LIMIT 1",
                params![kind, name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Store (or replace) the JSON report for a run.
    pub fn insert_run_report(
        &self,
        run_id: i64,
        report_json: &str,
        created_at: &str,
    ) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO run_reports (run_id, report_json, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![run_id, report_json, created_at],
        )?;
        Ok(())
    }

    pub fn load_run_report(&self, run_id: i64) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT report_json FROM run_reports WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: runs table
/// - 2: run_reports table
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS runs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                kind        TEXT NOT NULL,
                name        TEXT NOT NULL,
                input_hash  TEXT NOT NULL,
                status      TEXT NOT NULL,
                started_at  TEXT NOT NULL,
                finished_at TEXT,
                output_dir  TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_runs_kind ON runs(kind);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS run_reports (
                run_id      INTEGER PRIMARY KEY,
                report_json TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
