use serde::{Deserialize, Serialize};

use crate::analysis::{
    HintCollector, HintSource, TraversalOptions, DEFAULT_MAX_BODY_CHARS, DEFAULT_MAX_HINTS,
    DEFAULT_MAX_IDS,
};
use crate::services::{
    ExtractOptions, NameScorer, ScoreMode, ShardStrategy, TokenizeOptions, DEFAULT_TOPK,
};

/// Location of the run ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the project database file (typically relative to project root).
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Defaults for every pipeline stage. CLI flags override these per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_hints: usize,
    pub hint_source: HintSource,
    pub max_ids: usize,
    pub max_body_chars: usize,
    pub propagate: bool,
    pub topk: usize,
    pub score_mode: ScoreMode,
    pub tokenize: TokenizeOptions,
    pub workers: usize,
    pub shard_strategy: ShardStrategy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_hints: DEFAULT_MAX_HINTS,
            hint_source: HintSource::Predicted,
            max_ids: DEFAULT_MAX_IDS,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            propagate: true,
            topk: DEFAULT_TOPK,
            score_mode: ScoreMode::Token,
            tokenize: TokenizeOptions::default(),
            workers: 4,
            shard_strategy: ShardStrategy::RoundRobin,
        }
    }
}

impl PipelineSettings {
    pub fn hint_collector(&self) -> HintCollector {
        HintCollector::new(self.max_hints, self.hint_source)
    }

    pub fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions {
            propagate: self.propagate,
            max_ids: self.max_ids,
            max_body_chars: self.max_body_chars,
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions { topk: self.topk, ..ExtractOptions::default() }
    }

    pub fn scorer(&self) -> NameScorer {
        NameScorer::new(self.score_mode, self.tokenize)
    }
}

/// Serializable configuration describing a project.
///
/// This lives at `.weave/project.json` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Human-friendly project name.
    pub name: String,
    /// Optional description / notes.
    pub description: Option<String>,
    /// Schema/config version. This is about the config format.
    pub config_version: String,
    /// Database configuration (path is typically relative to project root).
    pub db: DbConfig,
    #[serde(default)]
    pub settings: PipelineSettings,
}

impl ProjectConfig {
    /// Create a new project configuration using the given name and db path.
    pub fn new(name: impl Into<String>, db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            config_version: "0.1.0".to_string(),
            db: DbConfig::new(db_path),
            settings: PipelineSettings::default(),
        }
    }
}
