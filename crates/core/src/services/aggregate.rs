//! Summary statistics over scored prediction corpora.
//!
//! Everything here works on already-loaded entries; reading files is the
//! caller's job. Means over an empty partition are reported as `None`
//! ("no data"), never as 0 or NaN.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{EntryKey, PredictionEntry};
use crate::names;
use crate::services::fingerprint::MembershipRecord;
use crate::services::scoring::NameScorer;

/// Result of first-occurrence deduplication.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub entries: Vec<PredictionEntry>,
    pub raw: usize,
    pub duplicates: usize,
}

impl DedupOutcome {
    /// `duplicates / raw`; no data for an empty corpus.
    pub fn duplicate_ratio(&self) -> Option<f64> {
        (self.raw > 0).then(|| self.duplicates as f64 / self.raw as f64)
    }
}

/// Keep the first entry per `(prog_name, func_name, varname)`.
pub fn dedup(entries: impl IntoIterator<Item = PredictionEntry>) -> DedupOutcome {
    let mut seen = HashSet::new();
    let mut outcome = DedupOutcome::default();
    for entry in entries {
        outcome.raw += 1;
        if seen.insert(entry.key()) {
            outcome.entries.push(entry);
        } else {
            outcome.duplicates += 1;
        }
    }
    outcome
}

/// Program id used by membership files: the program name up to the first `_`.
pub fn program_id(prog_name: &str) -> &str {
    prog_name.split('_').next().unwrap_or(prog_name)
}

/// External in-train knowledge: which functions were seen in training (keyed
/// by program id and stripped function name) and which ground-truth names
/// occur in the training set.
#[derive(Debug, Clone, Default)]
pub struct TrainMembership {
    in_train: HashSet<(String, String)>,
    not_in_train: HashSet<(String, String)>,
    names: HashSet<String>,
}

impl TrainMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = MembershipRecord>) -> Self {
        let mut membership = Self::new();
        for record in records {
            membership.insert_function(record.prog_id(), record.func_name(), record.in_train());
        }
        membership
    }

    pub fn insert_function(&mut self, prog_id: &str, func_name: &str, in_train: bool) {
        let key = (prog_id.to_string(), func_name.to_string());
        if in_train {
            self.in_train.insert(key);
        } else {
            self.not_in_train.insert(key);
        }
    }

    pub fn with_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.names.extend(names);
        self
    }

    /// `Some(true)` / `Some(false)` when the function is listed, `None` when
    /// it appears in neither set.
    pub fn function_status(&self, prog_name: &str, func_name: &str) -> Option<bool> {
        let key = (program_id(prog_name).to_string(), func_name.to_string());
        if self.in_train.contains(&key) {
            Some(true)
        } else if self.not_in_train.contains(&key) {
            Some(false)
        } else {
            None
        }
    }

    pub fn is_function_in_train(&self, prog_name: &str, func_name: &str) -> bool {
        self.function_status(prog_name, func_name) == Some(true)
    }

    pub fn is_name_in_train(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn function_count(&self) -> usize {
        self.in_train.len() + self.not_in_train.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }
}

/// One line of a reference ("dirty") corpus. Either keyed like predictions or
/// in the dataset's native `{binary, funcname, ori_name}` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceRecord {
    Keyed { prog_name: String, func_name: String, varname: String },
    Dirty { binary: String, funcname: String, ori_name: String },
}

impl ReferenceRecord {
    pub fn key(&self) -> EntryKey {
        match self {
            ReferenceRecord::Keyed { prog_name, func_name, varname } => {
                EntryKey::new(prog_name, func_name, varname)
            }
            ReferenceRecord::Dirty { binary, funcname, ori_name } => {
                EntryKey::new(format!("{binary}_{binary}.jsonl.gz"), funcname, ori_name)
            }
        }
    }
}

/// Deduplicated reference triples, in first-occurrence order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    keys: Vec<EntryKey>,
    index: HashSet<EntryKey>,
}

impl ReferenceSet {
    pub fn from_records(records: impl IntoIterator<Item = ReferenceRecord>) -> Self {
        let mut set = Self::default();
        for record in records {
            let key = record.key();
            if set.index.insert(key.clone()) {
                set.keys.push(key);
            }
        }
        set
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.index.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntryKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Boolean partition flags for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    pub is_variable: bool,
    pub is_function: bool,
    pub non_empty: bool,
    pub func_in_train: bool,
    /// Function appears in neither membership set.
    pub unclassified: bool,
    pub name_in_train: bool,
}

impl EntryFlags {
    pub fn compute(
        entry: &PredictionEntry,
        membership: &TrainMembership,
        reference: Option<&ReferenceSet>,
    ) -> Self {
        let in_reference = reference.map_or(true, |r| r.contains(&entry.key()));
        let status = membership.function_status(&entry.prog_name, &entry.func_name);
        Self {
            is_variable: !names::is_placeholder(&entry.varname) && in_reference,
            is_function: names::is_placeholder(&entry.varname) && entry.varname == entry.func_name,
            non_empty: !entry.is_empty_prediction(),
            func_in_train: status == Some(true),
            unclassified: status.is_none(),
            name_in_train: membership.is_name_in_train(&entry.gt_varname),
        }
    }
}

/// Composable partition selector. `None` fields do not constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionFilter {
    pub variable: Option<bool>,
    pub function: Option<bool>,
    pub non_empty: Option<bool>,
    pub func_in_train: Option<bool>,
    pub name_in_train: Option<bool>,
}

impl PartitionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn variables() -> Self {
        Self { variable: Some(true), ..Self::default() }
    }

    pub fn functions() -> Self {
        Self { function: Some(true), ..Self::default() }
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = Some(true);
        self
    }

    pub fn in_train(mut self, in_train: bool) -> Self {
        self.func_in_train = Some(in_train);
        self
    }

    pub fn name_in_train(mut self, in_train: bool) -> Self {
        self.name_in_train = Some(in_train);
        self
    }

    pub fn matches(&self, flags: &EntryFlags) -> bool {
        fn check(want: Option<bool>, have: bool) -> bool {
            want.map_or(true, |w| w == have)
        }
        check(self.variable, flags.is_variable)
            && check(self.function, flags.is_function)
            && check(self.non_empty, flags.non_empty)
            && check(self.func_in_train, flags.func_in_train)
            && check(self.name_in_train, flags.name_in_train)
    }
}

/// Count and unweighted means of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartitionStats {
    pub count: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

impl PartitionStats {
    pub fn from_samples(samples: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (mut count, mut p_sum, mut r_sum) = (0usize, 0.0f64, 0.0f64);
        for (p, r) in samples {
            count += 1;
            p_sum += p;
            r_sum += r;
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            precision: Some(p_sum / count as f64),
            recall: Some(r_sum / count as f64),
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Re-weight a partition as if `missing` extra samples scored `(0, 0)`:
/// `new_mean = old_mean * old_count / (old_count + missing)`.
pub fn adjust_for_missing(stats: &PartitionStats, missing: usize) -> PartitionStats {
    let total = stats.count + missing;
    if total == 0 {
        return PartitionStats::default();
    }
    let reweight =
        |mean: Option<f64>| Some(mean.unwrap_or(0.0) * stats.count as f64 / total as f64);
    PartitionStats {
        count: total,
        precision: reweight(stats.precision),
        recall: reweight(stats.recall),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableStats {
    pub all: PartitionStats,
    pub in_train: PartitionStats,
    pub not_in_train: PartitionStats,
    pub name_in_train: PartitionStats,
    pub name_not_in_train: PartitionStats,
    pub non_empty: PartitionStats,
    pub non_empty_in_train: PartitionStats,
    pub non_empty_not_in_train: PartitionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionNameStats {
    pub all: PartitionStats,
    pub in_train: PartitionStats,
    pub not_in_train: PartitionStats,
    pub non_empty: PartitionStats,
}

/// Variable means with reference triples absent from the results counted as
/// wrong answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingAsWrong {
    pub missing: usize,
    pub missing_in_train: usize,
    pub missing_not_in_train: usize,
    pub in_train: PartitionStats,
    pub not_in_train: PartitionStats,
    pub overall: PartitionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub raw_entries: usize,
    pub entries: usize,
    pub duplicates: usize,
    pub duplicate_ratio: Option<f64>,
    pub programs: usize,
    pub functions: usize,
    pub rescored: usize,
    pub function_in_train: usize,
    /// Entries not known to be in-train; includes the unclassified ones.
    pub function_not_in_train: usize,
    /// Entries whose function is in neither membership set.
    pub unclassified: usize,
    pub overall: PartitionStats,
    pub overall_non_empty: PartitionStats,
    pub variables: VariableStats,
    pub function_names: FunctionNameStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_as_wrong: Option<MissingAsWrong>,
}

impl EvaluationReport {
    /// Labelled partitions in display order.
    pub fn partitions(&self) -> Vec<(&'static str, &PartitionStats)> {
        let mut rows = vec![
            ("overall", &self.overall),
            ("overall non-empty", &self.overall_non_empty),
            ("variables", &self.variables.all),
            ("variables in-train", &self.variables.in_train),
            ("variables not-in-train", &self.variables.not_in_train),
            ("variables gt-name in-train", &self.variables.name_in_train),
            ("variables gt-name not-in-train", &self.variables.name_not_in_train),
            ("variables non-empty", &self.variables.non_empty),
            ("variables non-empty in-train", &self.variables.non_empty_in_train),
            ("variables non-empty not-in-train", &self.variables.non_empty_not_in_train),
            ("functions", &self.function_names.all),
            ("functions in-train", &self.function_names.in_train),
            ("functions not-in-train", &self.function_names.not_in_train),
            ("functions non-empty", &self.function_names.non_empty),
        ];
        if let Some(missing) = &self.missing_as_wrong {
            rows.push(("missing-as-wrong in-train", &missing.in_train));
            rows.push(("missing-as-wrong not-in-train", &missing.not_in_train));
            rows.push(("missing-as-wrong overall", &missing.overall));
        }
        rows
    }
}

fn fmt_mean(mean: Option<f64>) -> String {
    mean.map_or_else(|| "n/a".to_string(), |m| format!("{m:.4}"))
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Entries: {} ({} raw, {} duplicates, ratio {})",
            self.entries,
            self.raw_entries,
            self.duplicates,
            fmt_mean(self.duplicate_ratio)
        )?;
        writeln!(f, "Programs: {}  Functions: {}", self.programs, self.functions)?;
        writeln!(
            f,
            "Function membership: {} in-train, {} not-in-train, {} unclassified",
            self.function_in_train, self.function_not_in_train, self.unclassified
        )?;
        if let Some(missing) = &self.missing_as_wrong {
            writeln!(
                f,
                "Missing reference triples: {} ({} in-train, {} not-in-train)",
                missing.missing, missing.missing_in_train, missing.missing_not_in_train
            )?;
        }
        writeln!(f, "{:<34} {:>8} {:>10} {:>10}", "partition", "count", "precision", "recall")?;
        for (label, stats) in self.partitions() {
            writeln!(
                f,
                "{:<34} {:>8} {:>10} {:>10}",
                label,
                stats.count,
                fmt_mean(stats.precision),
                fmt_mean(stats.recall)
            )?;
        }
        Ok(())
    }
}

/// Computes an `EvaluationReport` from a prediction corpus.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    membership: &'a TrainMembership,
    reference: Option<&'a ReferenceSet>,
    scorer: NameScorer,
    rescore: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(membership: &'a TrainMembership, scorer: NameScorer) -> Self {
        Self { membership, reference: None, scorer, rescore: false }
    }

    pub fn with_reference(mut self, reference: &'a ReferenceSet) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Re-score every entry instead of only those without scores.
    pub fn rescore_all(mut self, rescore: bool) -> Self {
        self.rescore = rescore;
        self
    }

    pub fn evaluate(&self, entries: Vec<PredictionEntry>) -> EvaluationReport {
        let DedupOutcome { mut entries, raw, duplicates } = dedup(entries);
        let rescored = self.scorer.score_entries(&mut entries, self.rescore);

        let rows: Vec<(EntryFlags, f64, f64)> = entries
            .iter()
            .map(|e| {
                let flags = EntryFlags::compute(e, self.membership, self.reference);
                (flags, e.precision.unwrap_or(0.0), e.recall.unwrap_or(0.0))
            })
            .collect();
        let stats = |filter: PartitionFilter| {
            PartitionStats::from_samples(
                rows.iter().filter(|(flags, _, _)| filter.matches(flags)).map(|&(_, p, r)| (p, r)),
            )
        };

        let programs: HashSet<&str> = entries.iter().map(|e| e.prog_name.as_str()).collect();
        let functions: HashSet<(&str, &str)> =
            entries.iter().map(|e| (e.prog_name.as_str(), e.func_name.as_str())).collect();

        let variables = VariableStats {
            all: stats(PartitionFilter::variables()),
            in_train: stats(PartitionFilter::variables().in_train(true)),
            not_in_train: stats(PartitionFilter::variables().in_train(false)),
            name_in_train: stats(PartitionFilter::variables().name_in_train(true)),
            name_not_in_train: stats(PartitionFilter::variables().name_in_train(false)),
            non_empty: stats(PartitionFilter::variables().non_empty()),
            non_empty_in_train: stats(PartitionFilter::variables().non_empty().in_train(true)),
            non_empty_not_in_train: stats(PartitionFilter::variables().non_empty().in_train(false)),
        };
        let function_names = FunctionNameStats {
            all: stats(PartitionFilter::functions()),
            in_train: stats(PartitionFilter::functions().in_train(true)),
            not_in_train: stats(PartitionFilter::functions().in_train(false)),
            non_empty: stats(PartitionFilter::functions().non_empty()),
        };

        let missing_as_wrong = self.reference.map(|reference| {
            let present: HashSet<EntryKey> = entries.iter().map(PredictionEntry::key).collect();
            let (mut missing_in_train, mut missing_not_in_train) = (0, 0);
            for key in reference.keys().filter(|k| !present.contains(*k)) {
                if self.membership.is_function_in_train(&key.prog_name, &key.func_name) {
                    missing_in_train += 1;
                } else {
                    missing_not_in_train += 1;
                }
            }
            let missing = missing_in_train + missing_not_in_train;
            debug!(missing, missing_in_train, missing_not_in_train, "reference triples missing");
            MissingAsWrong {
                missing,
                missing_in_train,
                missing_not_in_train,
                in_train: adjust_for_missing(&variables.in_train, missing_in_train),
                not_in_train: adjust_for_missing(&variables.not_in_train, missing_not_in_train),
                overall: adjust_for_missing(&variables.all, missing),
            }
        });

        let report = EvaluationReport {
            raw_entries: raw,
            entries: entries.len(),
            duplicates,
            duplicate_ratio: (raw > 0).then(|| duplicates as f64 / raw as f64),
            programs: programs.len(),
            functions: functions.len(),
            rescored,
            function_in_train: rows.iter().filter(|(f, _, _)| f.func_in_train).count(),
            function_not_in_train: rows.iter().filter(|(f, _, _)| !f.func_in_train).count(),
            unclassified: rows.iter().filter(|(f, _, _)| f.unclassified).count(),
            overall: stats(PartitionFilter::all()),
            overall_non_empty: stats(PartitionFilter::all().non_empty()),
            variables,
            function_names,
            missing_as_wrong,
        };
        info!(
            entries = report.entries,
            duplicates = report.duplicates,
            unclassified = report.unclassified,
            "evaluation finished"
        );
        report
    }
}

/// Result of combining two prediction sources.
#[derive(Debug, Clone, Default)]
pub struct CombineOutcome {
    pub entries: Vec<PredictionEntry>,
    /// Major entries replaced by their default counterpart.
    pub substituted: usize,
}

/// Combine `major` with a fallback `default` source.
///
/// Every major entry is kept, in order, unless its prediction is a sentinel
/// and `default` has an entry with the same key; then the first such default
/// entry is used instead. Keys only present in `default` are not added.
pub fn combine(major: Vec<PredictionEntry>, default: Vec<PredictionEntry>) -> CombineOutcome {
    let mut fallback: HashMap<EntryKey, PredictionEntry> = HashMap::new();
    for entry in default {
        fallback.entry(entry.key()).or_insert(entry);
    }

    let mut outcome = CombineOutcome::default();
    for entry in major {
        if entry.is_empty_prediction() {
            if let Some(replacement) = fallback.get(&entry.key()) {
                outcome.entries.push(replacement.clone());
                outcome.substituted += 1;
                continue;
            }
        }
        outcome.entries.push(entry);
    }
    outcome
}
