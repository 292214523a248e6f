use std::fs;

use tempfile::tempdir;
use weave_core::db::{
    load_project_config, save_project_config, ProjectConfig, ProjectContext, ProjectLayout,
    RunStatus, META_DIR_NAME,
};

fn init(layout: &ProjectLayout) -> ProjectConfig {
    for dir in layout.directories() {
        fs::create_dir_all(dir).expect("create dir");
    }
    let config = ProjectConfig::new("Ctx", layout.db_path_relative_string());
    save_project_config(layout, &config).expect("save config");
    config
}

#[test]
fn layout_places_metadata_under_meta_dir() {
    let layout = ProjectLayout::new("/tmp/proj");
    assert_eq!(layout.meta_dir, std::path::Path::new("/tmp/proj").join(META_DIR_NAME));
    assert_eq!(layout.db_path_relative_string(), format!("{META_DIR_NAME}/project.db"));
    assert!(layout.run_output_dir("plan", 7).ends_with("outputs/runs/plan-7"));
}

#[test]
fn config_round_trips_and_defaults_settings() {
    let dir = tempdir().expect("tempdir");
    let layout = ProjectLayout::new(dir.path());
    assert!(!layout.is_initialized());
    let config = init(&layout);
    assert!(layout.is_initialized());

    let loaded = load_project_config(&layout).expect("load");
    assert_eq!(loaded.name, config.name);
    assert_eq!(loaded.settings, config.settings);

    // Configs written before pipeline settings existed still load.
    fs::write(
        &layout.project_config_path,
        r#"{"name":"Old","description":null,"config_version":"0.1.0","db":{"path":".weave/project.db"}}"#,
    )
    .unwrap();
    let old = load_project_config(&layout).expect("load old");
    assert_eq!(old.settings.max_hints, 20);
    assert!(old.settings.propagate);
}

#[test]
fn missing_config_points_at_init_project() {
    let dir = tempdir().expect("tempdir");
    let err = ProjectContext::from_root(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("init-project"));
}

#[test]
fn runs_begin_and_finish_through_the_context() {
    let dir = tempdir().expect("tempdir");
    let layout = ProjectLayout::new(dir.path());
    init(&layout);

    let ctx = ProjectContext::from_root(dir.path()).expect("context");
    assert_eq!(ctx.db_path, layout.db_path);

    let run = ctx.begin_run("score", "preds.jsonl", "hash").expect("begin");
    assert_eq!(run.id, 1);
    assert!(run.output_dir.is_dir());
    let stored = ctx.db.get_run(run.id).expect("get").expect("exists");
    assert_eq!(stored.record.status, RunStatus::Running);
    assert_eq!(stored.record.output_dir.as_deref(), Some("outputs/runs/score-1"));
    assert!(stored.record.finished_at.is_none());

    ctx.attach_report(&run, r#"{"ok":true}"#).expect("report");
    ctx.finish_run(&run, RunStatus::Succeeded).expect("finish");
    let stored = ctx.db.get_run(run.id).expect("get").expect("exists");
    assert_eq!(stored.record.status, RunStatus::Succeeded);
    assert!(stored.record.finished_at.is_some());
    assert_eq!(ctx.db.load_run_report(run.id).expect("load").as_deref(), Some(r#"{"ok":true}"#));

    let next = ctx.begin_run("score", "preds.jsonl", "hash").expect("begin again");
    assert_eq!(next.id, 2);
    assert_ne!(next.output_dir, run.output_dir);
}
