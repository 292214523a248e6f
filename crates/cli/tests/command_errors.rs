use name_weaver::commands::{
    evaluate_command, extract_command, init_project_command, list_runs_command, plan_command,
    project_info_command, score_command, EvaluateArgs, PlanArgs,
};
use tempfile::tempdir;
use weave_core::db::{ProjectConfig, ProjectDb, ProjectLayout, RunStatus};

#[test]
fn commands_require_an_initialized_project() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let err = list_runs_command(&root, None, false).unwrap_err();
    assert!(err.to_string().contains("No project found"), "unexpected error: {err}");
}

#[test]
fn project_info_errors_when_config_corrupt() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, Some("CorruptProj".into())).unwrap();
    let layout = ProjectLayout::new(&root);
    std::fs::write(&layout.project_config_path, "not-json").unwrap();
    let err = project_info_command(&root, true).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse project config JSON"));
}

#[test]
fn commands_error_when_db_path_unusable() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, Some("BadDb".into())).unwrap();
    let layout = ProjectLayout::new(&root);
    let mut cfg: ProjectConfig =
        serde_json::from_str(&std::fs::read_to_string(&layout.project_config_path).unwrap())
            .unwrap();
    cfg.db.path = ".weave/project.json/bad.db".into();
    std::fs::write(&layout.project_config_path, serde_json::to_string_pretty(&cfg).unwrap())
        .unwrap();
    let err = list_runs_command(&root, None, false).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to open project database"), "unexpected: {err:#}");
}

#[test]
fn plan_errors_when_no_program_files_found() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, None).unwrap();
    let empty = temp.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    let args = PlanArgs { programs: empty.to_string_lossy().to_string(), ..PlanArgs::default() };
    let err = plan_command(&root, &args, false).unwrap_err();
    assert!(err.to_string().contains("No program files found"));
}

#[test]
fn evaluate_requires_spec_or_predictions() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, None).unwrap();
    let err = evaluate_command(&root, &EvaluateArgs::default(), false).unwrap_err();
    assert!(err.to_string().contains("--spec or --predictions"));
}

#[test]
fn evaluate_rejects_invalid_spec() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, None).unwrap();
    let layout = ProjectLayout::new(&root);
    std::fs::write(layout.evals_dir.join("bad.yaml"), "name: ''\npredictions: p.jsonl\n").unwrap();

    let args = EvaluateArgs { spec: Some("evals/bad.yaml".into()), ..EvaluateArgs::default() };
    let err = evaluate_command(&root, &args, false).unwrap_err();
    assert!(err.to_string().contains("'name' is required"));
}

/// A stage whose input cannot be read leaves a failed run in the ledger.
#[test]
fn missing_input_records_failed_run() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_project_command(&root, None).unwrap();

    let missing = temp.path().join("nope.jsonl");
    let err = score_command(&root, missing.to_str().unwrap(), None, false, false).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read predictions"));

    let err = extract_command(&root, missing.to_str().unwrap(), None, false, false).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read answers"));

    let layout = ProjectLayout::new(&root);
    let db = ProjectDb::open(&layout.db_path).unwrap();
    let runs = db.list_runs(None).unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.record.status == RunStatus::Failed));
}
