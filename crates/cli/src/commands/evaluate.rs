use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use weave_core::corpus::{read_json, read_jsonl};
use weave_core::services::{
    Evaluator, EvaluationReport, MembershipRecord, ReferenceRecord, ReferenceSet, ScoreMode,
    TrainMembership,
};

use crate::commands::{
    emit, load_predictions, load_string_list, open_context, run_stage, write_json,
};
use crate::{hash_inputs, resolve_against, sha256_bytes};

/// Inputs for one evaluation, stored under `evals/` as YAML or JSON.
///
/// Relative paths are resolved against the project root.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EvalSpec {
    pub name: String,
    /// Prediction corpus (JSONL).
    pub predictions: String,
    /// Membership records from `mark-in-train` (JSON array).
    #[serde(default)]
    pub membership: Option<String>,
    /// Names seen in training (JSON array or one per line).
    #[serde(default)]
    pub train_names: Option<String>,
    /// Reference triples for the missing-as-wrong figures (JSONL).
    #[serde(default)]
    pub reference: Option<String>,
    /// Forcing a mode re-scores every entry, stored scores included.
    #[serde(default)]
    pub score_mode: Option<ScoreMode>,
    #[serde(default)]
    pub rescore_all: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl EvalSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("Eval spec 'name' is required"));
        }
        if self.predictions.trim().is_empty() {
            return Err(anyhow!("Eval spec 'predictions' is required"));
        }
        Ok(())
    }

    /// Parse a spec from bytes; JSON when the extension says so, YAML otherwise.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let spec: EvalSpec = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_slice(bytes).context("Failed to parse eval spec JSON")?
        } else {
            serde_yaml::from_slice(bytes).context("Failed to parse eval spec YAML")?
        };
        spec.validate()?;
        Ok(spec)
    }

    fn input_paths(&self, root: &Path) -> Vec<PathBuf> {
        std::iter::once(&self.predictions)
            .chain(self.membership.iter())
            .chain(self.train_names.iter())
            .chain(self.reference.iter())
            .map(|p| resolve_against(root, p))
            .collect()
    }
}

/// Flags for `evaluate` when no spec file is given.
#[derive(Debug, Clone, Default)]
pub struct EvaluateArgs {
    pub spec: Option<String>,
    pub predictions: Option<String>,
    pub membership: Option<String>,
    pub train_names: Option<String>,
    pub reference: Option<String>,
    pub score_mode: Option<ScoreMode>,
    pub rescore_all: bool,
}

#[derive(Debug, Serialize)]
pub struct EvaluateSummary {
    pub run_id: i64,
    pub name: String,
    pub spec_hash: Option<String>,
    pub skipped_lines: usize,
    pub train_names: usize,
    pub report: EvaluationReport,
    pub output: String,
}

fn resolve_spec(root: &Path, args: &EvaluateArgs) -> Result<(EvalSpec, Option<String>)> {
    if let Some(spec_file) = &args.spec {
        let path = resolve_against(root, spec_file);
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read eval spec at {}", path.display()))?;
        let mut spec = EvalSpec::from_bytes(&path, &bytes)?;
        if args.score_mode.is_some() {
            spec.score_mode = args.score_mode;
        }
        spec.rescore_all |= args.rescore_all;
        return Ok((spec, Some(sha256_bytes(&bytes))));
    }

    let predictions = args
        .predictions
        .clone()
        .ok_or_else(|| anyhow!("Either --spec or --predictions is required"))?;
    let name = Path::new(&predictions)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("evaluation")
        .to_string();
    let spec = EvalSpec {
        name,
        predictions,
        membership: args.membership.clone(),
        train_names: args.train_names.clone(),
        reference: args.reference.clone(),
        score_mode: args.score_mode,
        rescore_all: args.rescore_all,
        description: None,
    };
    spec.validate()?;
    Ok((spec, None))
}

/// Compute the aggregate report for a prediction corpus.
pub fn evaluate_command(root: &str, args: &EvaluateArgs, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let root_path = ctx.layout.root.clone();
    let (spec, spec_hash) = resolve_spec(&root_path, args)?;

    let mut settings = ctx.config.settings.clone();
    if let Some(mode) = spec.score_mode {
        settings.score_mode = mode;
    }
    let input_hash = match &spec_hash {
        Some(hash) => hash.clone(),
        None => hash_inputs(&spec.input_paths(&root_path))?,
    };

    let summary = run_stage(&ctx, "evaluate", &spec.name, &input_hash, |run| {
        let (entries, mut skipped_lines) =
            load_predictions(&resolve_against(&root_path, &spec.predictions))?;

        let mut membership = match &spec.membership {
            Some(file) => {
                let path = resolve_against(&root_path, file);
                let records: Vec<MembershipRecord> = read_json(&path).with_context(|| {
                    format!("Failed to read membership from {}", path.display())
                })?;
                TrainMembership::from_records(records)
            }
            None => TrainMembership::new(),
        };
        if let Some(file) = &spec.train_names {
            let names = load_string_list(&resolve_against(&root_path, file))?;
            membership = membership.with_names(names);
        }
        let reference = match &spec.reference {
            Some(file) => {
                let path = resolve_against(&root_path, file);
                let read = read_jsonl::<ReferenceRecord>(&path)
                    .with_context(|| format!("Failed to read reference from {}", path.display()))?;
                skipped_lines += read.parse_error_count();
                Some(ReferenceSet::from_records(read.records))
            }
            None => None,
        };

        let rescore_all = spec.rescore_all || spec.score_mode.is_some();
        let mut evaluator = Evaluator::new(&membership, settings.scorer()).rescore_all(rescore_all);
        if let Some(reference) = &reference {
            evaluator = evaluator.with_reference(reference);
        }
        let report = evaluator.evaluate(entries);

        let report_json =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        let output = run.output_dir.join("report.json");
        fs::write(&output, &report_json)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        let text_path = run.output_dir.join("report.txt");
        fs::write(&text_path, report.to_string())
            .with_context(|| format!("Failed to write report to {}", text_path.display()))?;
        write_json(&run.output_dir.join("spec.json"), &spec)?;
        ctx.attach_report(run, &report_json)?;

        Ok(EvaluateSummary {
            run_id: run.id,
            name: spec.name.clone(),
            spec_hash: spec_hash.clone(),
            skipped_lines,
            train_names: membership.name_count(),
            report,
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Evaluation '{}' (run {}):", s.name, s.run_id);
        print!("{}", s.report);
        if s.train_names > 0 {
            println!("Training names: {}", s.train_names);
        }
        if s.skipped_lines > 0 {
            println!("Lines skipped: {}", s.skipped_lines);
        }
        println!("Report: {}", s.output);
    })
}
