use anyhow::Result;
use clap::{Parser, Subcommand};
use name_weaver::commands::{
    combine_command, evaluate_command, extract_command, fingerprint_command, gen_hints_command,
    init_project_command, list_runs_command, mark_in_train_command, plan_command,
    project_info_command, score_command, show_run_command, EvaluateArgs, NamerChoice, PlanArgs,
};
use tracing_subscriber::EnvFilter;
use weave_core::analysis::HintSource;
use weave_core::services::ScoreMode;

/// Structure-aware identifier renaming pipeline.
///
/// This CLI is a thin wrapper around `weave-core` (exposed in code as `weave_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "name-weaver",
    version,
    about = "Call-graph aware renaming of stripped identifiers",
    long_about = None
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new project at the given root.
    ///
    /// This will:
    /// - Create a `.weave` metadata directory and the run ledger.
    /// - Create `evals`, `reports`, and `outputs/runs` directories.
    /// - Write a `.weave/project.json` config file with default settings.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show basic information about an existing project.
    ProjectInfo {
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Build caller/callee/call-site hints from a prior prediction corpus.
    GenHints {
        #[arg(long, default_value = ".")]
        root: String,

        /// Program records: a directory of `.jsonl` files, one `.jsonl` file, or a list file.
        #[arg(long)]
        programs: String,

        /// Prediction corpus (JSONL) the hints are drawn from.
        #[arg(long)]
        predictions: String,

        #[arg(long)]
        max_hints: Option<usize>,

        /// Which field supplies hint text: `predicted` or `ground_truth`.
        #[arg(long)]
        source: Option<HintSource>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Traverse call graphs bottom-up and record a naming answer per function.
    Plan {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        programs: String,

        /// Naming collaborator: `oracle` (ground truth) or `replay` (recorded answers).
        #[arg(long)]
        namer: Option<NamerChoice>,

        /// Recorded answers (JSONL) for the replay namer.
        #[arg(long)]
        answers: Option<String>,

        /// Hint corpus (JSONL) attached to each query.
        #[arg(long)]
        hints: Option<String>,

        #[arg(long)]
        max_ids: Option<usize>,

        /// Do not substitute resolved callee names into later bodies.
        #[arg(long, default_value_t = false)]
        no_propagate: bool,

        #[arg(long)]
        workers: Option<usize>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Turn traversal answers into a prediction corpus.
    Extract {
        #[arg(long, default_value = ".")]
        root: String,

        /// Answers (JSONL) written by `plan`.
        #[arg(long)]
        answers: String,

        #[arg(long)]
        topk: Option<usize>,

        /// Also extract from functions that already carry a real name.
        #[arg(long, default_value_t = false)]
        all_functions: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Score every entry of a prediction corpus.
    Score {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        predictions: String,

        /// `token` or `exact`.
        #[arg(long)]
        mode: Option<ScoreMode>,

        /// Re-score entries that already carry scores.
        #[arg(long, default_value_t = false)]
        rescore_all: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compute the aggregate report for a prediction corpus.
    ///
    /// Inputs come from an eval spec (`--spec`, YAML or JSON) or from flags.
    Evaluate {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        spec: Option<String>,

        #[arg(long)]
        predictions: Option<String>,

        /// Membership records (JSON) written by `mark-in-train`.
        #[arg(long)]
        membership: Option<String>,

        /// Names seen in training (JSON array or one per line).
        #[arg(long)]
        train_names: Option<String>,

        /// Reference triples (JSONL) for missing-as-wrong figures.
        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        mode: Option<ScoreMode>,

        #[arg(long, default_value_t = false)]
        rescore_all: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Fill sentinel predictions of one corpus from another.
    Combine {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        major: String,

        #[arg(long)]
        default: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Hash every function body of a corpus (typically the training set).
    Fingerprint {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        programs: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Label functions as in-train by fingerprint lookup.
    MarkInTrain {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        programs: String,

        /// Training hashes: JSON array (as written by `fingerprint`) or one per line.
        #[arg(long)]
        training_hashes: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List recorded runs.
    ListRuns {
        #[arg(long, default_value = ".")]
        root: String,

        /// Only runs of this kind (e.g. `evaluate`).
        #[arg(long)]
        kind: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show one recorded run and its report.
    ShowRun {
        #[arg(long, default_value = ".")]
        root: String,

        #[arg(long)]
        id: i64,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "weave_core=debug,name_weaver=debug"
    } else {
        "weave_core=info,name_weaver=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::InitProject { root, name } => init_project_command(&root, name)?,
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::GenHints { root, programs, predictions, max_hints, source, json } => {
            gen_hints_command(&root, &programs, &predictions, max_hints, source, json)?
        }
        Command::Plan {
            root,
            programs,
            namer,
            answers,
            hints,
            max_ids,
            no_propagate,
            workers,
            json,
        } => {
            let args =
                PlanArgs { programs, namer, answers, hints, max_ids, no_propagate, workers };
            plan_command(&root, &args, json)?
        }
        Command::Extract { root, answers, topk, all_functions, json } => {
            extract_command(&root, &answers, topk, all_functions, json)?
        }
        Command::Score { root, predictions, mode, rescore_all, json } => {
            score_command(&root, &predictions, mode, rescore_all, json)?
        }
        Command::Evaluate {
            root,
            spec,
            predictions,
            membership,
            train_names,
            reference,
            mode,
            rescore_all,
            json,
        } => {
            let args = EvaluateArgs {
                spec,
                predictions,
                membership,
                train_names,
                reference,
                score_mode: mode,
                rescore_all,
            };
            evaluate_command(&root, &args, json)?
        }
        Command::Combine { root, major, default, json } => {
            combine_command(&root, &major, &default, json)?
        }
        Command::Fingerprint { root, programs, json } => {
            fingerprint_command(&root, &programs, json)?
        }
        Command::MarkInTrain { root, programs, training_hashes, json } => {
            mark_in_train_command(&root, &programs, &training_hashes, json)?
        }
        Command::ListRuns { root, kind, json } => list_runs_command(&root, kind.as_deref(), json)?,
        Command::ShowRun { root, id, json } => show_run_command(&root, id, json)?,
    }

    Ok(())
}
