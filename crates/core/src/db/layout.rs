use std::path::{Path, PathBuf};

/// Name of the metadata directory under a project root.
pub const META_DIR_NAME: &str = ".weave";

/// Logical layout of a project on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for actually creating directories
/// and files based on this layout.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Root directory of the project.
    pub root: PathBuf,
    /// Directory for internal metadata (.weave).
    pub meta_dir: PathBuf,
    /// Path to the project config file (JSON).
    pub project_config_path: PathBuf,
    /// Path to the run ledger database.
    pub db_path: PathBuf,
    /// Directory for evaluation specs (YAML/JSON).
    pub evals_dir: PathBuf,
    /// Directory for text/JSON reports.
    pub reports_dir: PathBuf,
    /// Directory for pipeline outputs.
    pub outputs_dir: PathBuf,
    /// Directory holding one subdirectory per recorded run.
    pub runs_dir: PathBuf,
}

impl ProjectLayout {
    /// Compute the default layout for a project rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(META_DIR_NAME);
        let project_config_path = meta_dir.join("project.json");
        let db_path = meta_dir.join("project.db");
        let evals_dir = root.join("evals");
        let reports_dir = root.join("reports");
        let outputs_dir = root.join("outputs");
        let runs_dir = outputs_dir.join("runs");

        Self {
            root,
            meta_dir,
            project_config_path,
            db_path,
            evals_dir,
            reports_dir,
            outputs_dir,
            runs_dir,
        }
    }

    /// Directories `init-project` creates.
    pub fn directories(&self) -> [&Path; 5] {
        [
            self.meta_dir.as_path(),
            self.evals_dir.as_path(),
            self.reports_dir.as_path(),
            self.outputs_dir.as_path(),
            self.runs_dir.as_path(),
        ]
    }

    /// Compute a database path string suitable for storing in `ProjectConfig`,
    /// typically as a path relative to `root`.
    pub fn db_path_relative_string(&self) -> String {
        match self.db_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.db_path.to_string_lossy().to_string(),
        }
    }

    /// Output directory for one run, e.g. `outputs/runs/score-<id>`.
    pub fn run_output_dir(&self, kind: &str, run_id: i64) -> PathBuf {
        self.runs_dir.join(format!("{kind}-{run_id}"))
    }

    /// Whether `init-project` has been run here.
    pub fn is_initialized(&self) -> bool {
        self.project_config_path.is_file()
    }
}
