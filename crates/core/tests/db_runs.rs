use rusqlite::Connection;
use tempfile::tempdir;
use weave_core::db::{DbError, ProjectDb, RunRecord, RunStatus, CURRENT_SCHEMA_VERSION};

fn record(kind: &str, name: &str) -> RunRecord {
    RunRecord::new(kind, name, "abc123", "2026-01-01T00:00:00+00:00")
}

#[test]
fn fresh_database_is_migrated_to_current_schema() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.db");
    let db = ProjectDb::open(&path).expect("open");
    assert_eq!(db.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
    drop(db);

    // Reopening is a no-op.
    let db = ProjectDb::open(&path).expect("reopen");
    assert_eq!(db.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
}

#[test]
fn version_one_database_gains_report_table() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.db");
    {
        let conn = Connection::open(&path).expect("raw open");
        conn.execute_batch(
            "CREATE TABLE runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT, kind TEXT NOT NULL, name TEXT NOT NULL,
                input_hash TEXT NOT NULL, status TEXT NOT NULL, started_at TEXT NOT NULL,
                finished_at TEXT, output_dir TEXT
            );
            PRAGMA user_version = 1;",
        )
        .expect("v1 schema");
    }
    let db = ProjectDb::open(&path).expect("open");
    assert_eq!(db.schema_version().expect("version"), 2);
    let id = db.insert_run(&record("score", "s")).expect("insert");
    db.insert_run_report(id, "{}", "now").expect("report");
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("project.db");
    {
        let conn = Connection::open(&path).expect("raw open");
        conn.pragma_update(None, "user_version", 99).expect("bump version");
    }
    let err = ProjectDb::open(&path).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { found: 99, .. }));
    assert!(err.to_string().contains("Unsupported schema version 99"));
}

#[test]
fn runs_are_recorded_listed_and_updated() {
    let dir = tempdir().expect("tempdir");
    let db = ProjectDb::open(&dir.path().join("project.db")).expect("open");

    let first = db.insert_run(&record("plan", "programs")).expect("insert");
    let second = db.insert_run(&record("score", "preds.jsonl")).expect("insert");
    let third = db.insert_run(&record("plan", "programs")).expect("insert");
    assert_eq!((first, second, third), (1, 2, 3));

    assert_eq!(db.list_runs(None).expect("list").len(), 3);
    let plans = db.list_runs(Some("plan")).expect("list plans");
    assert_eq!(plans.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(db.latest_run_id("plan", "programs").expect("latest"), Some(3));
    assert_eq!(db.latest_run_id("plan", "other").expect("latest"), None);

    assert_eq!(db.update_run_status(second, RunStatus::Failed, Some("later")).expect("update"), 1);
    assert_eq!(db.set_run_output_dir(second, "outputs/runs/score-2").expect("dir"), 1);
    let run = db.get_run(second).expect("get").expect("exists");
    assert_eq!(run.record.status, RunStatus::Failed);
    assert_eq!(run.record.finished_at.as_deref(), Some("later"));
    assert_eq!(run.record.output_dir.as_deref(), Some("outputs/runs/score-2"));
    assert!(run.record.status.is_terminal());

    assert!(db.get_run(99).expect("get").is_none());
    assert_eq!(db.update_run_status(99, RunStatus::Succeeded, None).expect("update"), 0);
}

#[test]
fn reports_are_stored_and_replaced() {
    let dir = tempdir().expect("tempdir");
    let db = ProjectDb::open(&dir.path().join("project.db")).expect("open");
    let id = db.insert_run(&record("evaluate", "baseline")).expect("insert");

    assert_eq!(db.load_run_report(id).expect("load"), None);
    db.insert_run_report(id, r#"{"entries":1}"#, "t1").expect("store");
    db.insert_run_report(id, r#"{"entries":2}"#, "t2").expect("replace");
    assert_eq!(db.load_run_report(id).expect("load").as_deref(), Some(r#"{"entries":2}"#));
}

#[test]
fn unknown_status_in_ledger_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let db = ProjectDb::open(&dir.path().join("project.db")).expect("open");
    let id = db.insert_run(&record("plan", "p")).expect("insert");
    db.connection()
        .execute("UPDATE runs SET status = 'exploded' WHERE id = ?1", [id])
        .expect("corrupt status");

    assert!(matches!(db.get_run(id), Err(DbError::InvalidStatus(s)) if s == "exploded"));
}

#[test]
fn run_status_parses_case_insensitively() {
    assert_eq!("Succeeded".parse::<RunStatus>().unwrap(), RunStatus::Succeeded);
    assert!("done".parse::<RunStatus>().is_err());
    assert!(!RunStatus::Running.is_terminal());
}
