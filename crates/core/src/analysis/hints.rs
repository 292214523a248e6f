use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{HintBundle, HintRecord, PredictionEntry, Program};

/// Default cap on each of the three hint lists.
pub const DEFAULT_MAX_HINTS: usize = 20;

/// Which field of a prior prediction entry is surfaced as hint text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSource {
    /// Use `gt_varname` (upper-bound experiments).
    GroundTruth,
    /// Use `pred_name` (what a real run would have).
    #[default]
    Predicted,
}

impl HintSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HintSource::GroundTruth => "ground_truth",
            HintSource::Predicted => "predicted",
        }
    }

    /// The hint text this source selects from `entry`.
    pub fn field<'e>(&self, entry: &'e PredictionEntry) -> &'e str {
        match self {
            HintSource::GroundTruth => &entry.gt_varname,
            HintSource::Predicted => &entry.pred_name,
        }
    }
}

impl fmt::Display for HintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HintSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ground_truth" | "gt" => Ok(HintSource::GroundTruth),
            "predicted" | "pred" => Ok(HintSource::Predicted),
            other => Err(format!(
                "unknown hint source '{other}' (expected ground_truth or predicted)"
            )),
        }
    }
}

type PairKey = (String, String);

/// Read-only lookup over a prediction corpus.
///
/// `by_function` groups entries by the function they were asked in;
/// `by_occurrence` groups them by the stripped identifier that was asked
/// about, which for function identifiers means "this function as seen from a
/// call site elsewhere".
#[derive(Debug, Clone, Default)]
pub struct HintIndex<'a> {
    entries: &'a [PredictionEntry],
    by_function: HashMap<PairKey, Vec<usize>>,
    by_occurrence: HashMap<PairKey, Vec<usize>>,
}

impl<'a> HintIndex<'a> {
    pub fn build(entries: &'a [PredictionEntry]) -> Self {
        let mut by_function: HashMap<PairKey, Vec<usize>> = HashMap::new();
        let mut by_occurrence: HashMap<PairKey, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_function
                .entry((entry.prog_name.clone(), entry.func_name.clone()))
                .or_default()
                .push(idx);
            by_occurrence
                .entry((entry.prog_name.clone(), entry.varname.clone()))
                .or_default()
                .push(idx);
        }
        debug!(
            entries = entries.len(),
            functions = by_function.len(),
            occurrences = by_occurrence.len(),
            "hint index built"
        );
        Self { entries, by_function, by_occurrence }
    }

    /// Entries asked inside `func_name`.
    pub fn function_entries(
        &self,
        prog_name: &str,
        func_name: &str,
    ) -> impl Iterator<Item = &'a PredictionEntry> + '_ {
        self.lookup(&self.by_function, prog_name, func_name)
    }

    /// Entries whose asked identifier is `name`.
    pub fn occurrence_entries(
        &self,
        prog_name: &str,
        name: &str,
    ) -> impl Iterator<Item = &'a PredictionEntry> + '_ {
        self.lookup(&self.by_occurrence, prog_name, name)
    }

    fn lookup<'s>(
        &'s self,
        map: &'s HashMap<PairKey, Vec<usize>>,
        prog_name: &str,
        name: &str,
    ) -> impl Iterator<Item = &'a PredictionEntry> + 's {
        let entries = self.entries;
        map.get(&(prog_name.to_string(), name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&idx| &entries[idx])
    }
}

/// Builds `HintBundle`s from a `HintIndex` and a program's call graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintCollector {
    pub max_hints: usize,
    pub source: HintSource,
}

impl Default for HintCollector {
    fn default() -> Self {
        Self { max_hints: DEFAULT_MAX_HINTS, source: HintSource::default() }
    }
}

impl HintCollector {
    pub fn new(max_hints: usize, source: HintSource) -> Self {
        Self { max_hints, source }
    }

    /// Hints for one function. Absent functions and functions nobody calls
    /// simply get empty lists.
    pub fn collect(&self, index: &HintIndex<'_>, program: &Program, func_name: &str) -> HintBundle {
        let prog_name = program.prog_name.as_str();
        let graph = &program.call_graph;

        let caller_hints = self.hint_texts(
            graph.callers(func_name).flat_map(|caller| index.function_entries(prog_name, caller)),
        );
        let callee_hints = self.hint_texts(
            graph.callees(func_name).flat_map(|callee| index.function_entries(prog_name, callee)),
        );
        let call_site_hints = self.hint_texts(index.occurrence_entries(prog_name, func_name));

        HintBundle {
            prog_name: prog_name.to_string(),
            func_name: func_name.to_string(),
            caller_hints,
            callee_hints,
            call_site_hints,
        }
    }

    /// Hints for every function of `program`, in load order.
    pub fn collect_program(&self, index: &HintIndex<'_>, program: &Program) -> Vec<HintBundle> {
        program.functions().map(|f| self.collect(index, program, &f.func_name)).collect()
    }

    fn hint_texts<'e>(&self, entries: impl Iterator<Item = &'e PredictionEntry>) -> Vec<String> {
        entries.take(self.max_hints).map(|e| self.source.field(e).to_string()).collect()
    }
}

/// Rendered hint text keyed by `(prog_name, func_name)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintTable {
    hints: HashMap<PairKey, String>,
}

impl HintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later records for the same function replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = HintRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: HintRecord) {
        self.hints.insert((record.prog_name, record.func_name), record.hints);
    }

    pub fn get(&self, prog_name: &str, func_name: &str) -> Option<&str> {
        self.hints.get(&(prog_name.to_string(), func_name.to_string())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}
