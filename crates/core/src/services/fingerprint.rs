use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::substitute_identifier;
use crate::model::{Function, Program};
use crate::names;

static ADDRESS_PATTERN: OnceLock<Regex> = OnceLock::new();

fn address_pattern() -> &'static Regex {
    ADDRESS_PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:0x[0-9A-Fa-f]+|(?:off|unk|byte|word|dword|qword|loc|asc|stru)_[0-9A-Fa-f]+)\b",
        )
        .unwrap()
    })
}

/// `[prog_id, func_name, hash, in_train, normalized_body]`, serialized as a
/// five-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord(pub String, pub String, pub String, pub bool, pub String);

impl MembershipRecord {
    pub fn prog_id(&self) -> &str {
        &self.0
    }

    pub fn func_name(&self) -> &str {
        &self.1
    }

    pub fn hash(&self) -> &str {
        &self.2
    }

    pub fn in_train(&self) -> bool {
        self.3
    }

    pub fn body(&self) -> &str {
        &self.4
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Body text with placeholder callees replaced by their demangled ground
/// truth and every address-like token replaced by `ADDR`, so that the same
/// source compiled at different addresses yields the same text.
pub fn normalize_body(function: &Function) -> String {
    let mut body = function.body.trim().to_string();
    for (id, gt) in &function.func_id_maps {
        if names::is_placeholder(id) {
            body = substitute_identifier(&body, id, &names::try_demangle(gt));
        }
    }
    address_pattern().replace_all(&body, "ADDR").into_owned()
}

/// SHA-256 hex digest of the normalized body.
pub fn fingerprint_function(function: &Function) -> String {
    sha256_hex(normalize_body(function).as_bytes())
}

/// One membership record per function of `program`, in load order.
pub fn mark_program(program: &Program, training_hashes: &HashSet<String>) -> Vec<MembershipRecord> {
    let prog_id = crate::services::aggregate::program_id(&program.prog_name).to_string();
    program
        .functions()
        .map(|function| {
            let body = normalize_body(function);
            let hash = sha256_hex(body.as_bytes());
            let in_train = training_hashes.contains(&hash);
            MembershipRecord(prog_id.clone(), function.func_name.clone(), hash, in_train, body)
        })
        .collect()
}
