use serde::{Deserialize, Serialize};

use crate::analysis::AnsweredFunction;
use crate::model::PredictionEntry;
use crate::names::{self, EMPTY_NAME, UNKNOWN_NAME};

pub const DEFAULT_TOPK: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Emit up to this many ranked candidates per identifier.
    pub topk: usize,
    /// Only extract from functions that still carry a placeholder name.
    pub placeholder_functions_only: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { topk: DEFAULT_TOPK, placeholder_functions_only: true }
    }
}

/// Turn answered functions into prediction entries.
///
/// Identifiers are visited function ids first, then variable ids. Ground
/// truth is demangled; uninteresting names and names identical to their
/// stripped id are skipped. An identifier without a usable top answer yields
/// one `<emptyname>` entry, otherwise one entry per top-k candidate (minus
/// `<unk>`), each carrying the full ranked list.
pub fn extract_predictions(
    answered: &[AnsweredFunction],
    options: &ExtractOptions,
) -> Vec<PredictionEntry> {
    let mut out = Vec::new();
    for function in answered {
        if options.placeholder_functions_only && !names::is_placeholder(&function.func_name) {
            continue;
        }
        let identifiers = function.func_id_maps.iter().chain(function.var_id_maps.iter());
        for (varname, gt) in identifiers {
            let gt_varname = names::try_demangle(gt);
            if !names::is_interesting_name(&gt_varname) || gt_varname == *varname {
                continue;
            }
            let entry = |pred: &str| {
                PredictionEntry::new(
                    &function.prog_name,
                    &function.func_name,
                    varname,
                    &gt_varname,
                    pred,
                )
            };

            let candidates = function.proposals.get(varname).map(Vec::as_slice).unwrap_or(&[]);
            match candidates.first() {
                None => out.push(entry(EMPTY_NAME)),
                Some(first) if first.name() == UNKNOWN_NAME => out.push(entry(EMPTY_NAME)),
                Some(_) => {
                    for candidate in candidates.iter().take(options.topk) {
                        if candidate.name() == UNKNOWN_NAME {
                            continue;
                        }
                        let mut predicted = entry(candidate.name());
                        predicted.ranked_candidates = candidates.to_vec();
                        out.push(predicted);
                    }
                }
            }
        }
    }
    out
}
