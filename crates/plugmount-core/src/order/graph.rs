use std::collections::HashMap;

use crate::plugin::Bean;

/// Mapping from plugin id to the ids it declares as dependencies.
///
/// Built fresh from a bean set for each sort; ids keep the order in which
/// the beans were supplied so that traversal is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    order: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records each bean's declared dependencies under its id.
    ///
    /// Beans without a loaded module contribute an empty list. Referenced
    /// ids are not checked here.
    pub fn from_beans(beans: &[Bean]) -> Self {
        let mut graph = Self::new();
        for bean in beans {
            graph.insert(bean.id.clone(), bean.dependencies().to_vec());
        }
        graph
    }

    /// Sets the dependencies of `id`.
    ///
    /// A repeated id keeps its original position and takes the new list.
    pub fn insert(&mut self, id: impl Into<String>, dependencies: Vec<String>) {
        let id = id.into();
        if !self.edges.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.edges.insert(id, dependencies);
    }

    /// Declared dependencies of `id`; empty for unknown ids.
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `id` is a node of the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Builds the dependency graph of `beans`.
pub fn build_graph(beans: &[Bean]) -> DependencyGraph {
    DependencyGraph::from_beans(beans)
}
