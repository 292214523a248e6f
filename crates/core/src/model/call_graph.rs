use std::collections::{HashMap, HashSet};

/// Directed caller→callee graph over stripped function identifiers.
///
/// Nodes keep their discovery order and edges have set semantics: adding the
/// same edge twice stores it once. Nodes may be externs with no `Function`
/// behind them, so every lookup by name tolerates absence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    callees: Vec<Vec<usize>>,
    callers: Vec<Vec<usize>>,
    edge_set: HashSet<(usize, usize)>,
    edges: Vec<(usize, usize)>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name` if absent and return its node index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        self.callees.push(Vec::new());
        self.callers.push(Vec::new());
        idx
    }

    /// Add a caller→callee edge. Returns false when the edge already existed.
    pub fn add_edge(&mut self, caller: &str, callee: &str) -> bool {
        let from = self.add_node(caller);
        let to = self.add_node(callee);
        if !self.edge_set.insert((from, to)) {
            return false;
        }
        self.edges.push((from, to));
        self.callees[from].push(to);
        self.callers[to].push(from);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of distinct callees; 0 for nodes absent from the graph.
    pub fn out_degree(&self, name: &str) -> usize {
        self.index.get(name).map(|&idx| self.callees[idx].len()).unwrap_or(0)
    }

    /// Number of distinct callers; 0 for nodes absent from the graph.
    pub fn in_degree(&self, name: &str) -> usize {
        self.index.get(name).map(|&idx| self.callers[idx].len()).unwrap_or(0)
    }

    /// Callees of `name` in edge discovery order.
    pub fn callees<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let targets = self.index.get(name).map(|&idx| self.callees[idx].as_slice()).unwrap_or(&[]);
        targets.iter().map(move |&t| self.nodes[t].as_str())
    }

    /// Callers of `name` in edge discovery order.
    pub fn callers<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let sources = self.index.get(name).map(|&idx| self.callers[idx].as_slice()).unwrap_or(&[]);
        sources.iter().map(move |&s| self.nodes[s].as_str())
    }

    /// All nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// All edges in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|&(from, to)| (self.nodes[from].as_str(), self.nodes[to].as_str()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
