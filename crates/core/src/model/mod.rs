//! Core data model for binaries, functions, call graphs, and predictions.
//!
//! - `Program` / `Function`: one binary and its decompiled routines.
//! - `CallGraph`: caller→callee edges over stripped identifiers.
//! - `PredictionEntry`: one model output for one identifier.
//! - `HintBundle` / `HintRecord`: contextual hints per function.

mod call_graph;
mod program;
mod records;

pub use call_graph::CallGraph;
pub use program::{
    build_program, build_program_lenient, Function, ModelError, Program, ProgramLoad,
    RawFunctionRecord,
};
pub use records::{Candidate, EntryKey, HintBundle, HintRecord, PredictionEntry};
