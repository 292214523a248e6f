use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::CallGraph;

/// Errors raised while turning raw per-function records into a `Program`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A record is missing a required field (body, identifier maps, name).
    #[error("Malformed function record #{index} in {prog_name}: missing {field}")]
    MalformedRecord { prog_name: String, index: usize, field: &'static str },

    /// Two records share the same stripped function identifier.
    #[error("Malformed function record #{index} in {prog_name}: duplicate function {func_name}")]
    DuplicateFunction { prog_name: String, index: usize, func_name: String },
}

/// One raw per-function record as produced by the decompiler export.
///
/// Every field is optional at the serde level so that a missing field becomes
/// a `ModelError::MalformedRecord` instead of an opaque decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFunctionRecord {
    #[serde(default, alias = "name", alias = "address")]
    pub func_name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub var_id_maps: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub func_id_maps: Option<BTreeMap<String, String>>,
    /// Explicit callee list. When absent, edges are derived from `func_id_maps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callees: Option<Vec<String>>,
}

/// One decompiled routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub func_name: String,
    pub body: String,
    pub var_id_maps: BTreeMap<String, String>,
    pub func_id_maps: BTreeMap<String, String>,
    /// Substituted name → identifier it replaced. Only populated on
    /// propagated copies.
    #[serde(default)]
    pub rename_map: BTreeMap<String, String>,
}

impl Function {
    pub fn new(func_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            func_name: func_name.into(),
            body: body.into(),
            var_id_maps: BTreeMap::new(),
            func_id_maps: BTreeMap::new(),
            rename_map: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, stripped: impl Into<String>, truth: impl Into<String>) -> Self {
        self.var_id_maps.insert(stripped.into(), truth.into());
        self
    }

    pub fn with_func(mut self, stripped: impl Into<String>, truth: impl Into<String>) -> Self {
        self.func_id_maps.insert(stripped.into(), truth.into());
        self
    }

    /// Identifiers still to be named: sorted variable ids, then sorted
    /// function ids.
    pub fn identifiers_to_ask(&self) -> Vec<String> {
        self.var_id_maps.keys().chain(self.func_id_maps.keys()).cloned().collect()
    }

    pub fn identifier_count(&self) -> usize {
        self.var_id_maps.len() + self.func_id_maps.len()
    }
}

/// One compiled binary: its functions and call graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub prog_name: String,
    functions: Vec<Function>,
    index: HashMap<String, usize>,
    pub call_graph: CallGraph,
}

impl Program {
    pub fn new(prog_name: impl Into<String>) -> Self {
        Self { prog_name: prog_name.into(), ..Self::default() }
    }

    /// Add a function and its node. Returns false (and keeps the existing
    /// entry) if the identifier is already present.
    pub fn insert_function(&mut self, function: Function) -> bool {
        if self.index.contains_key(&function.func_name) {
            return false;
        }
        self.call_graph.add_node(&function.func_name);
        self.index.insert(function.func_name.clone(), self.functions.len());
        self.functions.push(function);
        true
    }

    pub fn function(&self, func_name: &str) -> Option<&Function> {
        self.index.get(func_name).map(|&idx| &self.functions[idx])
    }

    /// Functions in load order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn contains_function(&self, func_name: &str) -> bool {
        self.index.contains_key(func_name)
    }
}

/// A program plus the records that had to be skipped while loading it.
#[derive(Debug, Clone, Default)]
pub struct ProgramLoad {
    pub program: Program,
    pub skipped: Vec<ModelError>,
}

/// Build a program from raw records, failing on the first malformed record.
pub fn build_program(
    prog_name: &str,
    records: impl IntoIterator<Item = RawFunctionRecord>,
) -> Result<Program, ModelError> {
    let mut program = Program::new(prog_name);
    let mut edges = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        let (function, callees) = validate_record(prog_name, index, record)?;
        let func_name = function.func_name.clone();
        if !program.insert_function(function) {
            return Err(ModelError::DuplicateFunction {
                prog_name: prog_name.to_string(),
                index,
                func_name,
            });
        }
        edges.extend(callees.into_iter().map(|callee| (func_name.clone(), callee)));
    }
    add_edges(&mut program, edges);
    Ok(program)
}

/// Build a program from raw records, skipping malformed ones and reporting
/// them alongside the result.
pub fn build_program_lenient(
    prog_name: &str,
    records: impl IntoIterator<Item = RawFunctionRecord>,
) -> ProgramLoad {
    let mut program = Program::new(prog_name);
    let mut skipped = Vec::new();
    let mut edges = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match validate_record(prog_name, index, record) {
            Ok((function, callees)) => {
                let func_name = function.func_name.clone();
                if program.insert_function(function) {
                    edges.extend(callees.into_iter().map(|callee| (func_name.clone(), callee)));
                } else {
                    skipped.push(ModelError::DuplicateFunction {
                        prog_name: prog_name.to_string(),
                        index,
                        func_name,
                    });
                }
            }
            Err(err) => {
                warn!(%err, "skipping function record");
                skipped.push(err);
            }
        }
    }
    add_edges(&mut program, edges);
    debug!(
        prog_name,
        functions = program.function_count(),
        edges = program.call_graph.edge_count(),
        skipped = skipped.len(),
        "program loaded"
    );
    ProgramLoad { program, skipped }
}

fn validate_record(
    prog_name: &str,
    index: usize,
    record: RawFunctionRecord,
) -> Result<(Function, Vec<String>), ModelError> {
    let missing = |field: &'static str| ModelError::MalformedRecord {
        prog_name: prog_name.to_string(),
        index,
        field,
    };
    let func_name = record
        .func_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| missing("func_name"))?;
    let body = record.body.ok_or_else(|| missing("body"))?;
    let var_id_maps = record.var_id_maps.ok_or_else(|| missing("var_id_maps"))?;
    let func_id_maps = record.func_id_maps.ok_or_else(|| missing("func_id_maps"))?;

    let callees = match record.callees {
        Some(callees) => callees,
        None => func_id_maps.keys().filter(|id| **id != func_name).cloned().collect(),
    };

    let function =
        Function { func_name, body, var_id_maps, func_id_maps, rename_map: BTreeMap::new() };
    Ok((function, callees))
}

// Edges are added after every function node so node discovery order follows
// record order.
fn add_edges(program: &mut Program, edges: Vec<(String, String)>) {
    for (caller, callee) in edges {
        program.call_graph.add_edge(&caller, &callee);
    }
}
