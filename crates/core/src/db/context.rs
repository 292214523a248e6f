use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::db::{open_project_db, ProjectConfig, ProjectDb, ProjectLayout, RunRecord, RunStatus};

/// Convenience wrapper bundling layout, config, db path, and an open ProjectDb.
#[derive(Debug)]
pub struct ProjectContext {
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
    pub db_path: PathBuf,
    pub db: ProjectDb,
}

/// A run that has been recorded as `running` and owns an output directory.
#[derive(Debug, Clone)]
pub struct ActiveRun {
    pub id: i64,
    pub kind: String,
    pub output_dir: PathBuf,
}

impl ProjectContext {
    /// Load project config and open the database for a given root.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = ProjectLayout::new(root);
        let (config, db_path, db) = open_project_db(&layout)?;
        Ok(Self { layout, config, db_path, db })
    }

    /// Record a new `running` run and create its output directory.
    pub fn begin_run(&self, kind: &str, name: &str, input_hash: &str) -> Result<ActiveRun> {
        let record = RunRecord::new(kind, name, input_hash, Utc::now().to_rfc3339());
        let id = self.db.insert_run(&record).context("Failed to record run")?;
        let output_dir = self.layout.run_output_dir(kind, id);
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create run output directory {}", output_dir.display())
        })?;
        let relative = output_dir
            .strip_prefix(&self.layout.root)
            .unwrap_or(&output_dir)
            .to_string_lossy()
            .to_string();
        self.db.set_run_output_dir(id, &relative).context("Failed to record run output dir")?;
        info!(run_id = id, kind, name, "run started");
        Ok(ActiveRun { id, kind: kind.to_string(), output_dir })
    }

    /// Mark a run finished with the given terminal status.
    pub fn finish_run(&self, run: &ActiveRun, status: RunStatus) -> Result<()> {
        let finished_at = Utc::now().to_rfc3339();
        self.db
            .update_run_status(run.id, status, Some(&finished_at))
            .with_context(|| format!("Failed to update status of run {}", run.id))?;
        info!(run_id = run.id, kind = %run.kind, %status, "run finished");
        Ok(())
    }

    /// Store a JSON report for a run.
    pub fn attach_report(&self, run: &ActiveRun, report_json: &str) -> Result<()> {
        self.db
            .insert_run_report(run.id, report_json, &Utc::now().to_rfc3339())
            .with_context(|| format!("Failed to store report for run {}", run.id))
    }
}
