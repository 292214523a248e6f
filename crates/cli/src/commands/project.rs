use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use weave_core::db::{PipelineSettings, ProjectConfig, ProjectDb, ProjectLayout};

use crate::commands::{emit, open_context, print_dir_status};
use crate::{canonicalize_or_current, infer_project_name};

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub db_path: String,
    pub schema_version: i32,
    pub settings: PipelineSettings,
    pub layout: ProjectInfoLayout,
    pub run_count: usize,
}

#[derive(Serialize)]
pub struct ProjectInfoLayout {
    pub meta_dir: String,
    pub evals_dir: String,
    pub reports_dir: String,
    pub outputs_dir: String,
    pub runs_dir: String,
}

/// Initialize a new project at `root`.
pub fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);

    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    for dir in layout.directories() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let config = ProjectConfig::new(&project_name, layout.db_path_relative_string());
    weave_core::db::save_project_config(&layout, &config)?;

    // Create the ledger immediately so follow-on commands can rely on it.
    ProjectDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize project database at {}", layout.db_path.display())
    })?;

    println!("Initialized name-weaver project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Evals dir: {}", layout.evals_dir.display());
    println!("  Reports dir: {}", layout.reports_dir.display());
    println!("  Runs dir: {}", layout.runs_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let layout = &ctx.layout;
    let runs = ctx.db.list_runs(None).context("Failed to list runs")?;

    let snapshot = ProjectInfoSnapshot {
        name: ctx.config.name.clone(),
        description: ctx.config.description.clone(),
        root: layout.root.display().to_string(),
        config_file: layout.project_config_path.display().to_string(),
        config_version: ctx.config.config_version.clone(),
        db_path: ctx.db_path.display().to_string(),
        schema_version: ctx.db.schema_version()?,
        settings: ctx.config.settings.clone(),
        layout: ProjectInfoLayout {
            meta_dir: layout.meta_dir.display().to_string(),
            evals_dir: layout.evals_dir.display().to_string(),
            reports_dir: layout.reports_dir.display().to_string(),
            outputs_dir: layout.outputs_dir.display().to_string(),
            runs_dir: layout.runs_dir.display().to_string(),
        },
        run_count: runs.len(),
    };

    emit(&snapshot, json, |s| {
        println!("name-weaver Project Info");
        println!("========================");
        println!("Name: {}", s.name);
        if let Some(desc) = &s.description {
            println!("Description: {desc}");
        }
        println!("Root: {}", s.root);
        println!("Config file: {}", s.config_file);
        println!("Config version: {}", s.config_version);
        println!("DB path: {} (schema v{})", s.db_path, s.schema_version);
        println!("Recorded runs: {}", s.run_count);
        println!();
        println!("Settings:");
        println!("  max_hints: {}", s.settings.max_hints);
        println!("  hint_source: {}", s.settings.hint_source);
        println!("  max_ids: {}", s.settings.max_ids);
        println!("  propagate: {}", s.settings.propagate);
        println!("  topk: {}", s.settings.topk);
        println!("  score_mode: {}", s.settings.score_mode);
        println!("  workers: {} ({})", s.settings.workers, s.settings.shard_strategy);
        println!();
        println!("Directories:");
        print_dir_status("Meta dir (.weave)", &layout.meta_dir);
        print_dir_status("Evals dir", &layout.evals_dir);
        print_dir_status("Reports dir", &layout.reports_dir);
        print_dir_status("Outputs dir", &layout.outputs_dir);
        print_dir_status("Runs dir", &layout.runs_dir);
    })
}
