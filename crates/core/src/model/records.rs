use serde::{Deserialize, Serialize};

use crate::names;

/// Ranked `(name, score)` candidate, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate(pub String, pub f64);

impl Candidate {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self(name.into(), score)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn score(&self) -> f64 {
        self.1
    }
}

/// Natural dedup key of a prediction: `(prog_name, func_name, varname)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub prog_name: String,
    pub func_name: String,
    pub varname: String,
}

impl EntryKey {
    pub fn new(
        prog_name: impl Into<String>,
        func_name: impl Into<String>,
        varname: impl Into<String>,
    ) -> Self {
        Self { prog_name: prog_name.into(), func_name: func_name.into(), varname: varname.into() }
    }
}

/// One (program, function, variable) model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    pub prog_name: String,
    pub func_name: String,
    pub varname: String,
    pub gt_varname: String,
    pub pred_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranked_candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    /// Any other fields on the line, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PredictionEntry {
    pub fn new(
        prog_name: impl Into<String>,
        func_name: impl Into<String>,
        varname: impl Into<String>,
        gt_varname: impl Into<String>,
        pred_name: impl Into<String>,
    ) -> Self {
        Self {
            prog_name: prog_name.into(),
            func_name: func_name.into(),
            varname: varname.into(),
            gt_varname: gt_varname.into(),
            pred_name: pred_name.into(),
            ranked_candidates: Vec::new(),
            precision: None,
            recall: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.prog_name, &self.func_name, &self.varname)
    }

    /// True when `pred_name` is a sentinel rather than a real name.
    pub fn is_empty_prediction(&self) -> bool {
        names::is_sentinel(&self.pred_name)
    }

    pub fn with_scores(mut self, precision: f64, recall: f64) -> Self {
        self.precision = Some(precision);
        self.recall = Some(recall);
        self
    }
}

/// Contextual hints for one function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintBundle {
    pub prog_name: String,
    pub func_name: String,
    pub caller_hints: Vec<String>,
    pub callee_hints: Vec<String>,
    pub call_site_hints: Vec<String>,
}

impl HintBundle {
    pub fn is_empty(&self) -> bool {
        self.caller_hints.is_empty()
            && self.callee_hints.is_empty()
            && self.call_site_hints.is_empty()
    }

    /// Render the three lists in the fixed presentation format consumed by
    /// the prompting side.
    pub fn render(&self) -> String {
        format!(
            "Hints from callers: [{}]\nHints from callees: [{}]\nHints from callsites: [{}]\n",
            self.caller_hints.join(", "),
            self.callee_hints.join(", "),
            self.call_site_hints.join(", "),
        )
    }

    pub fn to_record(&self) -> HintRecord {
        HintRecord {
            prog_name: self.prog_name.clone(),
            func_name: self.func_name.clone(),
            hints: self.render(),
        }
    }
}

/// One line of the hint corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRecord {
    pub prog_name: String,
    pub func_name: String,
    pub hints: String,
}
