use anyhow::{Context, Result};
use serde::Serialize;
use weave_core::analysis::{HintIndex, HintSource};
use weave_core::corpus::write_jsonl;
use weave_core::model::{HintBundle, HintRecord};
use weave_core::services::run_sharded;

use crate::commands::{
    emit, load_predictions, load_program_set, open_context, run_name_for, run_stage, SkippedInputs,
};
use crate::{hash_inputs, resolve_against};

#[derive(Debug, Serialize)]
pub struct GenHintsSummary {
    pub run_id: i64,
    pub programs: usize,
    pub functions: usize,
    pub predictions: usize,
    pub records: usize,
    pub non_empty: usize,
    pub max_hints: usize,
    pub source: HintSource,
    pub skipped: SkippedInputs,
    pub output: String,
}

/// Build the hint corpus for every function of the given programs from a
/// prior prediction corpus.
pub fn gen_hints_command(
    root: &str,
    programs: &str,
    predictions: &str,
    max_hints: Option<usize>,
    source: Option<HintSource>,
    json: bool,
) -> Result<()> {
    let ctx = open_context(root)?;
    let mut settings = ctx.config.settings.clone();
    if let Some(max) = max_hints {
        settings.max_hints = max;
    }
    if let Some(source) = source {
        settings.hint_source = source;
    }

    let programs_path = resolve_against(&ctx.layout.root, programs);
    let predictions_path = resolve_against(&ctx.layout.root, predictions);
    let (mut inputs, set) = load_program_set(&programs_path)?;
    inputs.push(predictions_path.clone());
    let input_hash = hash_inputs(&inputs)?;

    let run_name = run_name_for(&predictions_path);
    let summary = run_stage(&ctx, "gen-hints", &run_name, &input_hash, |run| {
        let (entries, skipped_lines) = load_predictions(&predictions_path)?;
        let index = HintIndex::build(&entries);
        let collector = settings.hint_collector();

        let bundles: Vec<HintBundle> =
            run_sharded(&set.programs, settings.workers, settings.shard_strategy, |program| {
                collector.collect_program(&index, program)
            })?
            .into_iter()
            .flatten()
            .collect();
        let non_empty = bundles.iter().filter(|b| !b.is_empty()).count();
        let records: Vec<HintRecord> = bundles.iter().map(HintBundle::to_record).collect();

        let output = run.output_dir.join("hints.jsonl");
        let written = write_jsonl(&output, &records)
            .with_context(|| format!("Failed to write hints to {}", output.display()))?;

        Ok(GenHintsSummary {
            run_id: run.id,
            programs: set.programs.len(),
            functions: set.function_count(),
            predictions: entries.len(),
            records: written,
            non_empty,
            max_hints: settings.max_hints,
            source: settings.hint_source,
            skipped: SkippedInputs::from_program_set(&set).with_parse_errors(skipped_lines),
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Generated hints (run {}):", s.run_id);
        println!("  Programs: {} ({} functions)", s.programs, s.functions);
        println!("  Prediction entries: {}", s.predictions);
        println!("  Hint records: {} ({} non-empty)", s.records, s.non_empty);
        println!("  Source: {} (max {} per list)", s.source, s.max_hints);
        s.skipped.print();
        println!("  Output: {}", s.output);
    })
}
