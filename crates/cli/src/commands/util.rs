use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::warn;
use weave_core::corpus::{self, ProgramSet};
use weave_core::db::{ActiveRun, ProjectContext, ProjectLayout, RunStatus};
use weave_core::model::PredictionEntry;

use crate::canonicalize_or_current;

/// Resolve the root, make sure a project lives there, and open it.
pub fn open_context(root: &str) -> Result<ProjectContext> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);
    if !layout.is_initialized() {
        return Err(anyhow!(
            "No project found at {} (run `name-weaver init-project` first)",
            layout.root.display()
        ));
    }
    ProjectContext::from_root(&root_path)
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

/// Run `stage` inside a ledger run: the run is recorded as `running`, then
/// marked `succeeded` or `failed` depending on the outcome.
pub fn run_stage<T>(
    ctx: &ProjectContext,
    kind: &str,
    name: &str,
    input_hash: &str,
    stage: impl FnOnce(&ActiveRun) -> Result<T>,
) -> Result<T> {
    let run = ctx.begin_run(kind, name, input_hash)?;
    match stage(&run) {
        Ok(value) => {
            ctx.finish_run(&run, RunStatus::Succeeded)?;
            Ok(value)
        }
        Err(err) => {
            warn!(run_id = run.id, kind, error = %err, "stage failed");
            // Keep the stage error; a ledger failure here would only hide it.
            let _ = ctx.finish_run(&run, RunStatus::Failed);
            Err(err)
        }
    }
}

/// Label for a run derived from its primary input.
pub fn run_name_for(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Inputs that were skipped while loading, reported in command summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkippedInputs {
    pub missing_files: usize,
    pub malformed_records: usize,
    pub parse_errors: usize,
}

impl SkippedInputs {
    pub fn from_program_set(set: &ProgramSet) -> Self {
        Self {
            missing_files: set.missing_files,
            malformed_records: set.malformed_records,
            parse_errors: set.parse_errors,
        }
    }

    /// Count undecodable lines from another input file.
    pub fn with_parse_errors(mut self, lines: usize) -> Self {
        self.parse_errors += lines;
        self
    }

    pub fn total(&self) -> usize {
        self.missing_files + self.malformed_records + self.parse_errors
    }

    pub fn print(&self) {
        if self.total() > 0 {
            println!(
                "  Skipped: {} missing files, {} malformed records, {} undecodable lines",
                self.missing_files, self.malformed_records, self.parse_errors
            );
        }
    }
}

/// Load every program reachable from `input` (directory, `.jsonl`, or list file).
pub fn load_program_set(input: &Path) -> Result<(Vec<PathBuf>, ProgramSet)> {
    let paths = corpus::program_paths(input)
        .with_context(|| format!("Failed to resolve program files from {}", input.display()))?;
    if paths.is_empty() {
        return Err(anyhow!("No program files found at {}", input.display()));
    }
    let set = corpus::load_programs(&paths).context("Failed to load programs")?;
    Ok((paths, set))
}

/// Read a prediction corpus; undecodable lines are skipped, logged, and
/// counted in the second element.
pub fn load_predictions(path: &Path) -> Result<(Vec<PredictionEntry>, usize)> {
    let read = corpus::read_jsonl::<PredictionEntry>(path)
        .with_context(|| format!("Failed to read predictions from {}", path.display()))?;
    let skipped = read.parse_error_count();
    Ok((read.records, skipped))
}

/// Read a list of strings stored either as a JSON array or one per line.
pub fn load_string_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON list in {}", path.display()));
    }
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

/// Write `value` as pretty JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Print a command summary either as JSON or via the given text renderer.
pub fn emit<T: Serialize>(summary: &T, json: bool, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        text(summary);
    }
    Ok(())
}
