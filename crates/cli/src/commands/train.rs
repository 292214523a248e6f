use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use serde::Serialize;
use weave_core::services::{fingerprint_function, mark_program, run_sharded, MembershipRecord};

use crate::commands::{
    emit, load_program_set, load_string_list, open_context, run_name_for, run_stage, write_json,
    SkippedInputs,
};
use crate::{hash_inputs, resolve_against};

#[derive(Debug, Serialize)]
pub struct FingerprintSummary {
    pub run_id: i64,
    pub programs: usize,
    pub functions: usize,
    pub unique_hashes: usize,
    pub skipped: SkippedInputs,
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct MarkSummary {
    pub run_id: i64,
    pub programs: usize,
    pub functions: usize,
    pub training_hashes: usize,
    pub in_train: usize,
    pub skipped: SkippedInputs,
    pub output: String,
}

/// Hash every function body of a (training) corpus; writes a sorted JSON
/// array of unique hashes.
pub fn fingerprint_command(root: &str, programs: &str, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let settings = ctx.config.settings.clone();
    let programs_path = resolve_against(&ctx.layout.root, programs);
    let (inputs, set) = load_program_set(&programs_path)?;
    let input_hash = hash_inputs(&inputs)?;

    let run_name = run_name_for(&programs_path);
    let summary = run_stage(&ctx, "fingerprint", &run_name, &input_hash, |run| {
        let per_program: Vec<Vec<String>> =
            run_sharded(&set.programs, settings.workers, settings.shard_strategy, |program| {
                program.functions().map(fingerprint_function).collect()
            })?;
        let hashes: BTreeSet<String> = per_program.into_iter().flatten().collect();

        let output = run.output_dir.join("hashes.json");
        write_json(&output, &hashes)?;

        Ok(FingerprintSummary {
            run_id: run.id,
            programs: set.programs.len(),
            functions: set.function_count(),
            unique_hashes: hashes.len(),
            skipped: SkippedInputs::from_program_set(&set),
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Fingerprinted functions (run {}):", s.run_id);
        println!("  Programs: {} ({} functions)", s.programs, s.functions);
        println!("  Unique hashes: {}", s.unique_hashes);
        s.skipped.print();
        println!("  Output: {}", s.output);
    })
}

/// Label every function of an evaluation corpus as in-train or not, by
/// looking its fingerprint up in a training hash list.
pub fn mark_in_train_command(
    root: &str,
    programs: &str,
    training_hashes: &str,
    json: bool,
) -> Result<()> {
    let ctx = open_context(root)?;
    let settings = ctx.config.settings.clone();
    let programs_path = resolve_against(&ctx.layout.root, programs);
    let hashes_path = resolve_against(&ctx.layout.root, training_hashes);
    let (mut inputs, set) = load_program_set(&programs_path)?;
    inputs.push(hashes_path.clone());
    let input_hash = hash_inputs(&inputs)?;

    let run_name = run_name_for(&programs_path);
    let summary = run_stage(&ctx, "mark-in-train", &run_name, &input_hash, |run| {
        let known: HashSet<String> = load_string_list(&hashes_path)?.into_iter().collect();
        let records: Vec<MembershipRecord> =
            run_sharded(&set.programs, settings.workers, settings.shard_strategy, |program| {
                mark_program(program, &known)
            })?
            .into_iter()
            .flatten()
            .collect();

        let output = run.output_dir.join("membership.json");
        write_json(&output, &records)?;

        Ok(MarkSummary {
            run_id: run.id,
            programs: set.programs.len(),
            functions: records.len(),
            training_hashes: known.len(),
            in_train: records.iter().filter(|r| r.in_train()).count(),
            skipped: SkippedInputs::from_program_set(&set),
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Marked training membership (run {}):", s.run_id);
        println!("  Programs: {}  Functions: {}", s.programs, s.functions);
        println!("  In-train: {} (against {} training hashes)", s.in_train, s.training_hashes);
        s.skipped.print();
        println!("  Output: {}", s.output);
    })
}
