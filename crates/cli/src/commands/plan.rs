use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use weave_core::analysis::{
    run_traversal, AnsweredFunction, HintTable, Namer, OracleNamer, ReplayNamer, TraversalOutcome,
};
use weave_core::corpus::{read_jsonl, write_jsonl};
use weave_core::model::HintRecord;
use weave_core::services::run_sharded;

use crate::commands::{emit, load_program_set, open_context, run_name_for, run_stage, SkippedInputs};
use crate::{hash_inputs, resolve_against};

/// Which naming collaborator answers traversal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamerChoice {
    /// Ground truth from the program records.
    Oracle,
    /// Answers recorded by an earlier traversal.
    Replay,
}

impl NamerChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamerChoice::Oracle => "oracle",
            NamerChoice::Replay => "replay",
        }
    }
}

impl fmt::Display for NamerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamerChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oracle" => Ok(NamerChoice::Oracle),
            "replay" => Ok(NamerChoice::Replay),
            other => Err(format!("unknown namer '{other}' (expected oracle or replay)")),
        }
    }
}

/// Flags for `plan`; `None` falls back to the project settings.
#[derive(Debug, Clone, Default)]
pub struct PlanArgs {
    pub programs: String,
    pub namer: Option<NamerChoice>,
    pub answers: Option<String>,
    pub hints: Option<String>,
    pub max_ids: Option<usize>,
    pub no_propagate: bool,
    pub workers: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub run_id: i64,
    pub namer: NamerChoice,
    pub programs: usize,
    pub functions: usize,
    pub answered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub learned_names: usize,
    pub propagate: bool,
    pub skipped_inputs: SkippedInputs,
    pub output: String,
}

/// Walk every program's call graph bottom-up, asking the chosen namer about
/// each function, and write the answered functions as JSONL.
pub fn plan_command(root: &str, args: &PlanArgs, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let mut settings = ctx.config.settings.clone();
    if let Some(max_ids) = args.max_ids {
        settings.max_ids = max_ids;
    }
    if args.no_propagate {
        settings.propagate = false;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    let options = settings.traversal_options();
    let choice = args.namer.unwrap_or(NamerChoice::Oracle);

    let programs_path = resolve_against(&ctx.layout.root, &args.programs);
    let answers_path = args.answers.as_deref().map(|a| resolve_against(&ctx.layout.root, a));
    let hints_path = args.hints.as_deref().map(|h| resolve_against(&ctx.layout.root, h));
    if choice == NamerChoice::Replay && answers_path.is_none() {
        return Err(anyhow!("--answers is required with --namer replay"));
    }

    let (mut inputs, set) = load_program_set(&programs_path)?;
    inputs.extend(answers_path.iter().cloned());
    inputs.extend(hints_path.iter().cloned());
    let input_hash = hash_inputs(&inputs)?;

    let summary = run_stage(&ctx, "plan", &run_name_for(&programs_path), &input_hash, |run| {
        let mut skipped_inputs = SkippedInputs::from_program_set(&set);
        let namer: Box<dyn Namer> = match (choice, &answers_path) {
            (NamerChoice::Replay, Some(path)) => {
                let read = read_jsonl::<AnsweredFunction>(path)
                    .with_context(|| format!("Failed to read answers from {}", path.display()))?;
                skipped_inputs = skipped_inputs.with_parse_errors(read.parse_error_count());
                Box::new(ReplayNamer::from_answers(read.records))
            }
            _ => Box::new(OracleNamer::from_programs(&set.programs)),
        };
        let hint_table = match &hints_path {
            Some(path) => {
                let read = read_jsonl::<HintRecord>(path)
                    .with_context(|| format!("Failed to read hints from {}", path.display()))?;
                skipped_inputs = skipped_inputs.with_parse_errors(read.parse_error_count());
                Some(HintTable::from_records(read.records))
            }
            None => None,
        };

        let outcomes: Vec<TraversalOutcome> =
            run_sharded(&set.programs, settings.workers, settings.shard_strategy, |program| {
                run_traversal(program, namer.as_ref(), hint_table.as_ref(), &options)
            })?;

        let answered: Vec<&AnsweredFunction> = outcomes.iter().flat_map(|o| &o.answered).collect();
        let output = run.output_dir.join("answers.jsonl");
        let written = write_jsonl(&output, answered)
            .with_context(|| format!("Failed to write answers to {}", output.display()))?;

        Ok(PlanSummary {
            run_id: run.id,
            namer: choice,
            programs: set.programs.len(),
            functions: set.function_count(),
            answered: written,
            skipped: outcomes.iter().map(|o| o.skipped).sum(),
            failed: outcomes.iter().map(|o| o.failures.len()).sum(),
            learned_names: outcomes.iter().map(|o| o.learned_names).sum(),
            propagate: options.propagate,
            skipped_inputs,
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Traversal plan (run {}, namer {}):", s.run_id, s.namer);
        println!("  Programs: {} ({} functions)", s.programs, s.functions);
        println!("  Answered: {}  Skipped: {}  Failed: {}", s.answered, s.skipped, s.failed);
        println!("  Learned callee names: {} (propagation {})", s.learned_names, s.propagate);
        s.skipped_inputs.print();
        println!("  Output: {}", s.output);
    })
}
