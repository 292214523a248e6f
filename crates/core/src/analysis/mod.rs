//! Structure-aware analysis over a program's call graph.
//!
//! - `hints`: caller / callee / call-site hint lists built from prior
//!   predictions.
//! - `traversal`: leaf-first visiting order, callee-name propagation, and the
//!   `Namer` seam to whatever proposes names.

pub mod hints;
pub mod traversal;

pub use hints::{HintCollector, HintIndex, HintSource, HintTable, DEFAULT_MAX_HINTS};
pub use traversal::{
    build_query, propagate_callee_names, run_traversal, substitute_identifier, visit_order,
    AnsweredFunction, Namer, NamerError, NamingAnswer, NamingQuery, OracleNamer, ReplayNamer,
    Traversal, TraversalOptions, TraversalOutcome, DEFAULT_MAX_BODY_CHARS, DEFAULT_MAX_IDS,
};
