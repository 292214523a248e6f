use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Allowed status values for recorded runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    /// Whether the run can still change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// One pipeline invocation (gen-hints, plan, score, ...) for bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    /// Pipeline stage, e.g. `gen-hints` or `evaluate`.
    pub kind: String,
    /// User-facing label; defaults to the primary input's file name.
    pub name: String,
    /// SHA-256 over the run's inputs.
    pub input_hash: String,
    pub status: RunStatus,
    pub started_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
    /// Output directory relative to the project root.
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl RunRecord {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        input_hash: impl Into<String>,
        started_at: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            input_hash: input_hash.into(),
            status: RunStatus::Running,
            started_at: started_at.into(),
            finished_at: None,
            output_dir: None,
        }
    }
}

/// A run as stored, with its ledger id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunEntry {
    pub id: i64,
    #[serde(flatten)]
    pub record: RunRecord,
}
