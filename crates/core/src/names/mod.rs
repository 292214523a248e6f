//! Identifier normalization.
//!
//! Ground-truth names come out of debug info and may be mangled; predicted
//! names come out of a model and may be sentinels. Everything that compares
//! names goes through the helpers here so both sides are treated alike:
//! - Sentinel detection (`<emptyname>`, `<unk>`, legacy `UNK`).
//! - Function placeholder detection (`sub_401a2f`).
//! - Demangling of Itanium C++ and Rust symbols down to a bare name.
//! - Filtering of "uninteresting" ground truth (auto-names, blanks).

use std::sync::OnceLock;

use regex::Regex;

/// Sentinel emitted when the model produced no usable name.
pub const EMPTY_NAME: &str = "<emptyname>";

/// Sentinel emitted by classifiers for an out-of-vocabulary name.
pub const UNKNOWN_NAME: &str = "<unk>";

/// Legacy marker used by older result files.
const LEGACY_UNKNOWN: &str = "UNK";

static PLACEHOLDER_PATTERN: OnceLock<Regex> = OnceLock::new();
static AUTO_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Returns true when `pred` carries no usable prediction.
pub fn is_sentinel(pred: &str) -> bool {
    let trimmed = pred.trim();
    trimmed.is_empty()
        || trimmed.starts_with("<emp")
        || trimmed.starts_with("<unk")
        || trimmed == LEGACY_UNKNOWN
}

/// Returns true for decompiler-generated function names such as `sub_401a2f`.
pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDER_PATTERN
        .get_or_init(|| Regex::new(r"^sub_[0-9A-Fa-f_]+$").unwrap())
        .is_match(name)
}

/// Returns true for decompiler auto-named locals/arguments (`v12`, `a3`).
pub fn is_auto_name(name: &str) -> bool {
    AUTO_NAME_PATTERN.get_or_init(|| Regex::new(r"^[va][0-9]+$").unwrap()).is_match(name)
}

/// Attempt to demangle `name`, returning the bare (unqualified, parameterless)
/// identifier. Names that are not mangled, or fail to demangle, are returned
/// unchanged.
pub fn try_demangle(name: &str) -> String {
    if name.starts_with("_R") || looks_like_legacy_rust(name) {
        if let Ok(demangled) = rustc_demangle::try_demangle(name) {
            // `{:#}` drops the trailing hash segment.
            return last_path_segment(&format!("{demangled:#}"));
        }
    }

    if name.starts_with("_Z") {
        if let Ok(symbol) = cpp_demangle::Symbol::new(name.as_bytes()) {
            let options = cpp_demangle::DemangleOptions::new().no_params().no_return_type();
            if let Ok(demangled) = symbol.demangle(&options) {
                return last_path_segment(&demangled);
            }
        }
    }

    name.to_string()
}

/// Demangle and trim a ground-truth or predicted name.
pub fn normalize_name(name: &str) -> String {
    try_demangle(name.trim()).trim().to_string()
}

/// Whether a ground-truth name is worth asking about and scoring.
pub fn is_interesting_name(gt: &str) -> bool {
    let gt = gt.trim();
    if gt.is_empty() || is_sentinel(gt) || is_placeholder(gt) || is_auto_name(gt) {
        return false;
    }
    gt.chars().any(|c| c.is_alphabetic())
}

/// Itanium-style Rust legacy symbols end in a `17h<16 hex>E` hash segment.
fn looks_like_legacy_rust(name: &str) -> bool {
    name.starts_with("_ZN") && name.ends_with('E') && name.contains("17h")
}

/// Take the last `::` component at template/parameter depth 0 and strip a
/// trailing template argument list.
fn last_path_segment(qualified: &str) -> String {
    let mut depth: i32 = 0;
    let mut start = 0;
    let bytes = qualified.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth = (depth - 1).max(0),
            b':' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    let segment = &qualified[start..];

    let mut depth: i32 = 0;
    let mut cut = segment.len();
    for (idx, ch) in segment.char_indices() {
        match ch {
            '<' => {
                if depth == 0 && idx > 0 {
                    cut = idx;
                    break;
                }
                depth += 1;
            }
            '>' => depth = (depth - 1).max(0),
            _ => {}
        }
    }
    segment[..cut].trim().to_string()
}
