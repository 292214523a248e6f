//! Project layout, configuration, and the SQLite run ledger.
//!
//! - `ProjectLayout`: computed paths for project directories/files (no IO).
//! - `ProjectConfig` / `PipelineSettings`: serializable project metadata and
//!   per-stage defaults.
//! - `ProjectDb`: a small SQLite wrapper recording runs and their reports.
//! - `ProjectContext`: layout + config + open DB, with run bookkeeping.

mod config;
mod context;
mod layout;
mod models;
mod project_db;
mod util;

pub use config::{DbConfig, PipelineSettings, ProjectConfig};
pub use context::{ActiveRun, ProjectContext};
pub use layout::{ProjectLayout, META_DIR_NAME};
pub use models::{RunEntry, RunRecord, RunStatus};
pub use project_db::{DbError, DbResult, ProjectDb, CURRENT_SCHEMA_VERSION};
pub use util::{load_project_config, open_project_db, save_project_config};
