use anyhow::{Context, Result};
use serde::Serialize;
use weave_core::analysis::AnsweredFunction;
use weave_core::corpus::{read_jsonl, write_jsonl};
use weave_core::services::extract_predictions;

use crate::commands::{emit, open_context, run_name_for, run_stage};
use crate::{hash_inputs, resolve_against};

#[derive(Debug, Serialize)]
pub struct ExtractSummary {
    pub run_id: i64,
    pub answered_functions: usize,
    pub skipped_lines: usize,
    pub entries: usize,
    pub empty_predictions: usize,
    pub topk: usize,
    pub output: String,
}

/// Turn traversal answers into a prediction corpus.
pub fn extract_command(
    root: &str,
    answers: &str,
    topk: Option<usize>,
    all_functions: bool,
    json: bool,
) -> Result<()> {
    let ctx = open_context(root)?;
    let mut options = ctx.config.settings.extract_options();
    if let Some(k) = topk {
        options.topk = k;
    }
    if all_functions {
        options.placeholder_functions_only = false;
    }

    let answers_path = resolve_against(&ctx.layout.root, answers);
    let input_hash = hash_inputs(&[&answers_path])?;

    let summary = run_stage(&ctx, "extract", &run_name_for(&answers_path), &input_hash, |run| {
        let read = read_jsonl::<AnsweredFunction>(&answers_path)
            .with_context(|| format!("Failed to read answers from {}", answers_path.display()))?;
        let entries = extract_predictions(&read.records, &options);

        let output = run.output_dir.join("predictions.jsonl");
        let written = write_jsonl(&output, &entries)
            .with_context(|| format!("Failed to write predictions to {}", output.display()))?;

        Ok(ExtractSummary {
            run_id: run.id,
            answered_functions: read.records.len(),
            skipped_lines: read.parse_error_count(),
            entries: written,
            empty_predictions: entries.iter().filter(|e| e.is_empty_prediction()).count(),
            topk: options.topk,
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Extracted predictions (run {}):", s.run_id);
        println!(
            "  Answered functions: {} ({} lines skipped)",
            s.answered_functions, s.skipped_lines
        );
        println!("  Entries: {} ({} empty, top-{})", s.entries, s.empty_predictions, s.topk);
        println!("  Output: {}", s.output);
    })
}
