use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::PredictionEntry;
use crate::names::{self, EMPTY_NAME};

/// How predicted and ground-truth names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Token-set precision/recall.
    #[default]
    Token,
    /// All-or-nothing comparison after normalization.
    Exact,
}

impl ScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Token => "token",
            ScoreMode::Exact => "exact",
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(ScoreMode::Token),
            "exact" => Ok(ScoreMode::Exact),
            other => Err(format!("unknown score mode '{other}' (expected token or exact)")),
        }
    }
}

/// Sub-word splitting rules. Non-alphanumeric characters (including `_`)
/// always separate tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeOptions {
    /// Split `fooBar` and `HTTPServer` at case transitions.
    pub split_camel_case: bool,
    /// Split `buf2` into `buf`, `2`.
    pub split_digits: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self { split_camel_case: true, split_digits: false }
    }
}

/// Lowercased sub-word set of `name`.
pub fn tokenize(name: &str, options: &TokenizeOptions) -> BTreeSet<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = BTreeSet::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let camel = options.split_camel_case
                && c.is_uppercase()
                && (prev.is_lowercase()
                    || prev.is_numeric()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
            let digit = options.split_digits && prev.is_numeric() != c.is_numeric();
            if camel || digit {
                flush(&mut current, &mut tokens);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut BTreeSet<String>) {
    if !current.is_empty() {
        tokens.insert(std::mem::take(current));
    }
}

/// Lowercase, alphanumeric-only form used by exact mode.
fn canonical(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// Scores predicted names against ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameScorer {
    pub mode: ScoreMode,
    #[serde(default)]
    pub tokenize: TokenizeOptions,
}

impl NameScorer {
    pub fn new(mode: ScoreMode, tokenize: TokenizeOptions) -> Self {
        Self { mode, tokenize }
    }

    /// `(precision, recall)` of `pred` against `gt`, both in `[0, 1]`.
    /// Sentinel predictions always score `(0, 0)`.
    pub fn score(&self, gt: &str, pred: &str) -> (f64, f64) {
        if names::is_sentinel(pred) {
            return (0.0, 0.0);
        }
        let gt = names::normalize_name(gt);
        let pred = names::normalize_name(pred);
        match self.mode {
            ScoreMode::Exact => {
                let (g, p) = (canonical(&gt), canonical(&pred));
                if !g.is_empty() && g == p {
                    (1.0, 1.0)
                } else {
                    (0.0, 0.0)
                }
            }
            ScoreMode::Token => {
                let gt_tokens = tokenize(&gt, &self.tokenize);
                let pred_tokens = tokenize(&pred, &self.tokenize);
                let shared = pred_tokens.intersection(&gt_tokens).count() as f64;
                let precision =
                    if pred_tokens.is_empty() { 0.0 } else { shared / pred_tokens.len() as f64 };
                let recall =
                    if gt_tokens.is_empty() { 0.0 } else { shared / gt_tokens.len() as f64 };
                (precision, recall)
            }
        }
    }

    /// Score one entry in place. A legacy `UNK` prediction is rewritten to
    /// the empty-name sentinel first.
    pub fn score_entry(&self, entry: &mut PredictionEntry) {
        if entry.pred_name.trim() == "UNK" {
            entry.pred_name = EMPTY_NAME.to_string();
        }
        let (precision, recall) = self.score(&entry.gt_varname, &entry.pred_name);
        entry.precision = Some(precision);
        entry.recall = Some(recall);
    }

    /// Score entries lacking scores, or every entry when `rescore_all` is set.
    /// Returns how many entries were (re)scored.
    pub fn score_entries(&self, entries: &mut [PredictionEntry], rescore_all: bool) -> usize {
        let mut scored = 0;
        for entry in entries.iter_mut() {
            if rescore_all || entry.precision.is_none() || entry.recall.is_none() {
                self.score_entry(entry);
                scored += 1;
            }
        }
        scored
    }
}
