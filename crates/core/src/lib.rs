//! weave-core
//!
//! Core library for structure-aware renaming of stripped identifiers in
//! decompiled binaries.
//!
//! This crate defines the program model (functions, identifier maps, call
//! graphs), hint collection and call-graph traversal, name scoring and result
//! aggregation, corpus I/O, and the project layer (layout, config, run
//! ledger).
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends. Model inference is not part of this
//! crate; it plugs in through `analysis::Namer`.

pub mod analysis;
pub mod corpus;
pub mod db;
pub mod model;
pub mod names;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
