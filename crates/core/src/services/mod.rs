//! Scoring, aggregation, and the batch services around them.

pub mod aggregate;
pub mod extract;
pub mod fingerprint;
pub mod scoring;
pub mod shards;

pub use aggregate::{
    adjust_for_missing, combine, dedup, program_id, CombineOutcome, DedupOutcome, EntryFlags,
    EvaluationReport, Evaluator, FunctionNameStats, MissingAsWrong, PartitionFilter,
    PartitionStats, ReferenceRecord, ReferenceSet, TrainMembership, VariableStats,
};
pub use extract::{extract_predictions, ExtractOptions, DEFAULT_TOPK};
pub use fingerprint::{
    fingerprint_function, mark_program, normalize_body, sha256_hex, MembershipRecord,
};
pub use scoring::{tokenize, NameScorer, ScoreMode, TokenizeOptions};
pub use shards::{assign, run_sharded, ShardError, ShardStrategy};
