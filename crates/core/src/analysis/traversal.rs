use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::HintTable;
use crate::model::{Candidate, Function, Program};
use crate::names;

/// Default cap on identifiers listed in one naming query.
pub const DEFAULT_MAX_IDS: usize = 32;

/// Default cap (in characters) on the body text sent with a query.
pub const DEFAULT_MAX_BODY_CHARS: usize = 5120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalOptions {
    /// Substitute already-resolved callee names before asking.
    pub propagate: bool,
    pub max_ids: usize,
    pub max_body_chars: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self { propagate: true, max_ids: DEFAULT_MAX_IDS, max_body_chars: DEFAULT_MAX_BODY_CHARS }
    }
}

/// What the naming collaborator is shown for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingQuery {
    pub prog_name: String,
    pub func_name: String,
    pub body: String,
    /// Sorted variable ids then sorted function ids, capped at `max_ids`.
    pub identifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<String>,
}

/// Ranked proposals per identifier, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamingAnswer {
    pub proposals: BTreeMap<String, Vec<Candidate>>,
}

impl NamingAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proposal(
        mut self,
        identifier: impl Into<String>,
        candidates: Vec<Candidate>,
    ) -> Self {
        self.proposals.insert(identifier.into(), candidates);
        self
    }

    /// Top-ranked name for `identifier`, if any.
    pub fn top(&self, identifier: &str) -> Option<&str> {
        self.proposals.get(identifier).and_then(|c| c.first()).map(Candidate::name)
    }
}

/// One visited function together with what the collaborator said about it.
///
/// This is the line format of traversal output and of replayed answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnsweredFunction {
    pub prog_name: String,
    pub func_name: String,
    pub func_body: String,
    #[serde(default)]
    pub rename_map: BTreeMap<String, String>,
    #[serde(default)]
    pub var_id_maps: BTreeMap<String, String>,
    #[serde(default)]
    pub func_id_maps: BTreeMap<String, String>,
    #[serde(default)]
    pub proposals: BTreeMap<String, Vec<Candidate>>,
}

impl AnsweredFunction {
    pub fn new(prog_name: &str, function: &Function, answer: NamingAnswer) -> Self {
        Self {
            prog_name: prog_name.to_string(),
            func_name: function.func_name.clone(),
            func_body: function.body.clone(),
            rename_map: function.rename_map.clone(),
            var_id_maps: function.var_id_maps.clone(),
            func_id_maps: function.func_id_maps.clone(),
            proposals: answer.proposals,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamerError {
    #[error("No recorded answer for {func_name} in {prog_name}")]
    NoAnswer { prog_name: String, func_name: String },
    #[error("Naming collaborator error: {0}")]
    Collaborator(String),
}

/// Seam for whatever proposes names for a query (a model, a recording, an
/// oracle). Implementations must be shareable across worker threads.
pub trait Namer: Send + Sync {
    fn propose(&self, query: &NamingQuery) -> Result<NamingAnswer, NamerError>;
    fn name(&self) -> &'static str;
}

/// Answers every query with the ground truth. Useful for dry runs and as an
/// upper bound on what propagation can achieve.
#[derive(Debug, Clone, Default)]
pub struct OracleNamer {
    truth: HashMap<(String, String), BTreeMap<String, String>>,
}

impl OracleNamer {
    pub fn from_programs<'p>(programs: impl IntoIterator<Item = &'p Program>) -> Self {
        let mut truth = HashMap::new();
        for program in programs {
            for function in program.functions() {
                let mut ids = function.var_id_maps.clone();
                ids.extend(function.func_id_maps.iter().map(|(k, v)| (k.clone(), v.clone())));
                truth.insert((program.prog_name.clone(), function.func_name.clone()), ids);
            }
        }
        Self { truth }
    }
}

impl Namer for OracleNamer {
    fn propose(&self, query: &NamingQuery) -> Result<NamingAnswer, NamerError> {
        let ids = self
            .truth
            .get(&(query.prog_name.clone(), query.func_name.clone()))
            .ok_or_else(|| NamerError::NoAnswer {
                prog_name: query.prog_name.clone(),
                func_name: query.func_name.clone(),
            })?;
        let mut answer = NamingAnswer::new();
        for id in &query.identifiers {
            if let Some(gt) = ids.get(id) {
                let candidate = Candidate::new(names::normalize_name(gt), 1.0);
                answer = answer.with_proposal(id, vec![candidate]);
            }
        }
        Ok(answer)
    }

    fn name(&self) -> &'static str {
        "oracle"
    }
}

/// Answers from a previously recorded traversal output.
#[derive(Debug, Clone, Default)]
pub struct ReplayNamer {
    answers: HashMap<(String, String), BTreeMap<String, Vec<Candidate>>>,
}

impl ReplayNamer {
    /// The first recording for a function wins.
    pub fn from_answers(answers: impl IntoIterator<Item = AnsweredFunction>) -> Self {
        let mut map = HashMap::new();
        for answered in answers {
            map.entry((answered.prog_name, answered.func_name)).or_insert(answered.proposals);
        }
        Self { answers: map }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl Namer for ReplayNamer {
    fn propose(&self, query: &NamingQuery) -> Result<NamingAnswer, NamerError> {
        let recorded = self
            .answers
            .get(&(query.prog_name.clone(), query.func_name.clone()))
            .ok_or_else(|| NamerError::NoAnswer {
                prog_name: query.prog_name.clone(),
                func_name: query.func_name.clone(),
            })?;
        let proposals = query
            .identifiers
            .iter()
            .filter_map(|id| recorded.get(id).map(|c| (id.clone(), c.clone())))
            .collect();
        Ok(NamingAnswer { proposals })
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}

/// Functions of `program` in visiting order: ascending out-degree, ties in
/// node discovery order. Cycles are fine; this is a one-shot sort.
pub fn visit_order(program: &Program) -> Vec<(&str, usize)> {
    let graph = &program.call_graph;
    let mut order: Vec<(&str, usize)> = graph
        .nodes()
        .filter(|node| program.contains_function(node))
        .map(|node| (node, graph.out_degree(node)))
        .collect();
    order.sort_by_key(|&(_, degree)| degree);
    order
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace whole-token occurrences of `identifier` in `body`.
///
/// A match must not be preceded or followed by an alphanumeric or `_`
/// character, so `a1` never touches `a10`.
pub fn substitute_identifier(body: &str, identifier: &str, replacement: &str) -> String {
    if identifier.is_empty() {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut copied = 0;
    let mut search = 0;
    while let Some(rel) = body[search..].find(identifier) {
        let start = search + rel;
        let end = start + identifier.len();
        let bounded_before =
            body[..start].chars().next_back().map_or(true, |c| !is_identifier_char(c));
        let bounded_after = body[end..].chars().next().map_or(true, |c| !is_identifier_char(c));
        if bounded_before && bounded_after {
            out.push_str(&body[copied..start]);
            out.push_str(replacement);
            copied = end;
            search = end;
        } else {
            search = start + body[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    out.push_str(&body[copied..]);
    out
}

/// Copy of `function` with every known callee name substituted into the body.
///
/// Substituted ids are removed from the copy's `func_id_maps` and recorded in
/// its `rename_map`. Self references are never substituted.
pub fn propagate_callee_names(
    function: &Function,
    known_names: &HashMap<String, String>,
) -> Function {
    let mut propagated = function.clone();
    for func_id in function.func_id_maps.keys() {
        if *func_id == function.func_name {
            continue;
        }
        if let Some(new_name) = known_names.get(func_id) {
            propagated.body = substitute_identifier(&propagated.body, func_id, new_name);
            propagated.rename_map.insert(new_name.clone(), func_id.clone());
            propagated.func_id_maps.remove(func_id);
        }
    }
    propagated
}

/// Build the query for a (possibly propagated) function.
pub fn build_query(
    prog_name: &str,
    function: &Function,
    hints: Option<&str>,
    options: &TraversalOptions,
) -> NamingQuery {
    let mut identifiers = function.identifiers_to_ask();
    identifiers.truncate(options.max_ids);
    NamingQuery {
        prog_name: prog_name.to_string(),
        func_name: function.func_name.clone(),
        body: function.body.chars().take(options.max_body_chars).collect(),
        identifiers,
        hints: hints.map(str::to_string),
    }
}

/// Step-by-step traversal of one program, for callers that drive the naming
/// collaborator themselves.
#[derive(Debug)]
pub struct Traversal<'p> {
    program: &'p Program,
    order: Vec<(&'p str, usize)>,
    cursor: usize,
    known_names: HashMap<String, String>,
    options: TraversalOptions,
}

impl<'p> Traversal<'p> {
    pub fn new(program: &'p Program, options: TraversalOptions) -> Self {
        Self {
            program,
            order: visit_order(program),
            cursor: 0,
            known_names: HashMap::new(),
            options,
        }
    }

    pub fn order(&self) -> impl Iterator<Item = &'p str> + '_ {
        self.order.iter().map(|&(name, _)| name)
    }

    pub fn known_names(&self) -> &HashMap<String, String> {
        &self.known_names
    }

    /// Next function to present, propagated when it has callees and
    /// propagation is on. Returns `None` once every function was visited.
    pub fn next_function(&mut self) -> Option<Function> {
        let &(func_name, out_degree) = self.order.get(self.cursor)?;
        self.cursor += 1;
        let function = self.program.function(func_name)?;
        if out_degree > 0 && self.options.propagate {
            Some(propagate_callee_names(function, &self.known_names))
        } else {
            Some(function.clone())
        }
    }

    /// Record the collaborator's answer for `func_name`. Only the function's
    /// own identifier is learned, first writer wins, and sentinel answers are
    /// ignored. Returns whether a new name was learned.
    pub fn record_answer(&mut self, func_name: &str, answer: &NamingAnswer) -> bool {
        if self.known_names.contains_key(func_name) {
            return false;
        }
        match answer.top(func_name) {
            Some(name) if !names::is_sentinel(name) => {
                self.known_names.insert(func_name.to_string(), name.to_string());
                true
            }
            _ => false,
        }
    }
}

/// Summary of a full traversal of one program.
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    pub answered: Vec<AnsweredFunction>,
    /// Functions with nothing left to ask.
    pub skipped: usize,
    /// Per-function collaborator failures; the traversal carried on.
    pub failures: Vec<NamerError>,
    pub learned_names: usize,
}

/// Visit every function of `program`, asking `namer` about each one that
/// still has identifiers to name.
pub fn run_traversal(
    program: &Program,
    namer: &dyn Namer,
    hints: Option<&HintTable>,
    options: &TraversalOptions,
) -> TraversalOutcome {
    let mut traversal = Traversal::new(program, *options);
    let mut outcome = TraversalOutcome::default();

    while let Some(function) = traversal.next_function() {
        if function.identifier_count() == 0 {
            debug!(func = %function.func_name, "nothing to ask; skipping");
            outcome.skipped += 1;
            continue;
        }

        let hint_text = hints.and_then(|table| {
            let found = table.get(&program.prog_name, &function.func_name);
            if found.is_none() {
                warn!(prog = %program.prog_name, func = %function.func_name, "hint not found");
            }
            found
        });
        let query = build_query(&program.prog_name, &function, hint_text, options);

        match namer.propose(&query) {
            Ok(answer) => {
                if traversal.record_answer(&function.func_name, &answer) {
                    outcome.learned_names += 1;
                }
                debug!(
                    func = %function.func_name,
                    asked = query.identifiers.len(),
                    substituted = function.rename_map.len(),
                    "function answered"
                );
                outcome.answered.push(AnsweredFunction::new(&program.prog_name, &function, answer));
            }
            Err(err) => {
                warn!(namer = namer.name(), %err, "naming failed; continuing");
                outcome.failures.push(err);
            }
        }
    }

    info!(
        prog = %program.prog_name,
        answered = outcome.answered.len(),
        skipped = outcome.skipped,
        failed = outcome.failures.len(),
        learned = outcome.learned_names,
        "traversal finished"
    );
    outcome
}
