//! Dependency weight resolution.
//!
//! Plugins that others depend on must be mounted first, so being *depended
//! upon* is what earns weight. Every time an id is reached as somebody's
//! dependency, directly or through a chain, its weight grows by one:
//!
//! ```text
//! authentication -> [logger, persistence]     logger:      5
//! persistence    -> [logger]                  persistence: 1
//! pubsub         -> [logger]                  others:      0
//! repl           -> [logger]
//! ```
//!
//! `logger` is reached twice from `authentication` (directly and through
//! `persistence`) and once from each of `persistence`, `pubsub` and `repl`.

use std::collections::{HashMap, HashSet};

use super::cycle::find_cycle;
use super::graph::DependencyGraph;
use crate::error::{SortError, SortResult};

/// Accumulated weight of one id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Weight {
    /// Number of dependency paths, direct or transitive, ending at this id.
    pub priority: i64,
}

/// Placeholder for a dependency that no supplied plugin provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitDependency {
    /// The missing dependency id.
    pub id: String,
    /// The first plugin found declaring it.
    pub required_by: String,
    /// Always `false`: implicits are expected to come from outside the batch.
    pub is_local: bool,
    /// Declared priority of the placeholder record, always `1`.
    ///
    /// Informational only: ordering uses the accumulated weight from
    /// [`WeightStack::priority`], which starts at `0` for implicits like
    /// any other id.
    pub priority: i64,
    /// Always empty.
    pub dependencies: Vec<String>,
}

impl ImplicitDependency {
    fn new(id: &str, required_by: &str) -> Self {
        Self {
            id: id.to_string(),
            required_by: required_by.to_string(),
            is_local: false,
            priority: 1,
            dependencies: Vec::new(),
        }
    }
}

/// Per-id weights produced by [`compute_weights`].
#[derive(Debug, Clone, Default)]
pub struct WeightStack {
    weights: HashMap<String, Weight>,
    implicits: Vec<ImplicitDependency>,
}

impl WeightStack {
    /// Weight of `id`, if it is known.
    pub fn get(&self, id: &str) -> Option<Weight> {
        self.weights.get(id).copied()
    }

    /// Shorthand for `get(id).map(|w| w.priority)`.
    pub fn priority(&self, id: &str) -> Option<i64> {
        self.get(id).map(|w| w.priority)
    }

    /// Returns `true` if `id` is a plugin or a synthesized implicit.
    pub fn contains(&self, id: &str) -> bool {
        self.weights.contains_key(id)
    }

    /// Placeholders synthesized for missing dependencies, in discovery order.
    pub fn implicits(&self) -> &[ImplicitDependency] {
        &self.implicits
    }

    /// Number of ids carrying a weight (plugins and implicits).
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns `true` if no ids are known.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn add_implicit(&mut self, id: &str, required_by: &str) {
        self.weights.insert(id.to_string(), Weight::default());
        self.implicits.push(ImplicitDependency::new(id, required_by));
    }

    fn add(&mut self, id: &str, amount: i64) {
        if let Some(weight) = self.weights.get_mut(id) {
            weight.priority = weight.priority.saturating_add(amount);
        }
    }
}

/// Computes the dependency weight of every id in `graph`.
///
/// A weight counts the dependency paths ending at an id, so it is computed
/// in topological order, dependents first:
///
/// ```text
/// weight(d) = sum over each declaration u -> d of (1 + weight(u))
/// ```
///
/// Weights saturate at `i64::MAX`.
///
/// With `allow_implicits`, a dependency that is not a node of the graph gets
/// a placeholder entry and traversal continues; without it, such a
/// dependency fails with [`SortError::UnknownDependency`]. A dependency that
/// is already on the current traversal path fails with
/// [`SortError::CyclicDependency`].
pub fn compute_weights(graph: &DependencyGraph, allow_implicits: bool) -> SortResult<WeightStack> {
    let mut stack = WeightStack::default();
    for id in graph.ids() {
        stack.weights.insert(id.to_string(), Weight::default());
    }

    let mut walker = Walker {
        graph,
        stack,
        allow_implicits,
        path: Vec::new(),
        on_path: HashSet::new(),
        done: HashSet::new(),
        finished: Vec::new(),
    };
    for id in graph.ids() {
        walker.visit(id)?;
    }

    let Walker {
        mut stack,
        finished,
        ..
    } = walker;

    // Post-order lists dependencies before their dependents.
    for id in finished.iter().rev() {
        let reach = stack.priority(id).unwrap_or_default().saturating_add(1);
        for dependency in graph.dependencies(id) {
            stack.add(dependency, reach);
        }
    }

    Ok(stack)
}

/// Depth-first ordering pass: validates every edge and records ids in
/// post-order. Each id is expanded once.
struct Walker<'a> {
    graph: &'a DependencyGraph,
    stack: WeightStack,
    allow_implicits: bool,
    path: Vec<String>,
    on_path: HashSet<String>,
    done: HashSet<String>,
    finished: Vec<String>,
}

impl Walker<'_> {
    fn visit(&mut self, id: &str) -> SortResult<()> {
        if self.done.contains(id) {
            return Ok(());
        }

        let graph = self.graph;
        self.enter(id);
        for dependency in graph.dependencies(id) {
            if !self.stack.contains(dependency) {
                if !self.allow_implicits {
                    return Err(SortError::UnknownDependency {
                        plugin: id.to_string(),
                        dependency: dependency.clone(),
                    });
                }
                self.stack.add_implicit(dependency, id);
            }

            if self.on_path.contains(dependency) {
                let cycle =
                    find_cycle(graph, dependency).unwrap_or_else(|| self.path_from(dependency));
                return Err(SortError::CyclicDependency { cycle });
            }

            self.visit(dependency)?;
        }
        self.leave();

        self.done.insert(id.to_string());
        self.finished.push(id.to_string());
        Ok(())
    }

    fn enter(&mut self, id: &str) {
        self.path.push(id.to_string());
        self.on_path.insert(id.to_string());
    }

    fn leave(&mut self) {
        if let Some(id) = self.path.pop() {
            self.on_path.remove(&id);
        }
    }

    fn path_from(&self, id: &str) -> Vec<String> {
        let start = self.path.iter().position(|p| p == id).unwrap_or(0);
        let mut cycle = self.path[start..].to_vec();
        cycle.push(id.to_string());
        cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (id, deps) in edges {
            graph.insert(*id, deps.iter().map(|d| d.to_string()).collect());
        }
        graph
    }

    fn plugin_graph() -> DependencyGraph {
        graph(&[
            ("authentication", &["logger", "persistence"]),
            ("logger", &[]),
            ("pubsub", &["logger"]),
            ("persistence", &["logger"]),
            ("repl", &["logger"]),
        ])
    }

    #[test]
    fn test_transitive_references_accumulate() {
        let stack = compute_weights(&plugin_graph(), true).unwrap();

        assert_eq!(stack.priority("logger"), Some(5));
        assert_eq!(stack.priority("persistence"), Some(1));
        assert_eq!(stack.priority("authentication"), Some(0));
        assert_eq!(stack.priority("pubsub"), Some(0));
        assert_eq!(stack.priority("repl"), Some(0));
        assert!(stack.implicits().is_empty());
    }

    #[test]
    fn test_no_dependencies_all_zero() {
        let g = graph(&[("a", &[]), ("b", &[]), ("c", &[])]);
        let stack = compute_weights(&g, true).unwrap();

        assert_eq!(stack.len(), 3);
        assert!(["a", "b", "c"].iter().all(|id| stack.priority(id) == Some(0)));
    }

    #[test]
    fn test_cycle_is_reported_not_looped() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        let err = compute_weights(&g, true).unwrap_err();

        assert_eq!(
            err,
            SortError::CyclicDependency {
                cycle: vec!["a".into(), "b".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_deep_chain_is_not_a_cycle() {
        // Longer than any fixed depth bound; only a real revisit is a cycle.
        let ids: Vec<String> = (0..32).map(|i| format!("p{i}")).collect();
        let mut g = DependencyGraph::new();
        for (i, id) in ids.iter().enumerate() {
            let deps = ids.get(i + 1).cloned().into_iter().collect();
            g.insert(id.clone(), deps);
        }

        let stack = compute_weights(&g, false).unwrap();
        assert_eq!(stack.priority("p0"), Some(0));
        assert_eq!(stack.priority("p1"), Some(1));
        assert_eq!(stack.priority("p31"), Some(31));
    }

    /// `p{i}` depends on `p{i+1}` and `p{i+2}`.
    fn ladder(n: usize) -> DependencyGraph {
        let ids: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
        let mut g = DependencyGraph::new();
        for (i, id) in ids.iter().enumerate() {
            g.insert(id.clone(), ids.iter().skip(i + 1).take(2).cloned().collect());
        }
        g
    }

    #[test]
    fn test_shared_dependencies_are_expanded_once() {
        let stack = compute_weights(&ladder(60), false).unwrap();

        let mut expected = vec![0i64, 1];
        for k in 2..60 {
            expected.push(expected[k - 1] + expected[k - 2] + 2);
        }
        for (k, weight) in expected.iter().enumerate() {
            assert_eq!(stack.priority(&format!("p{k}")), Some(*weight));
        }
        assert_eq!(stack.priority("p31"), Some(5_702_885));
    }

    #[test]
    fn test_weights_saturate() {
        let stack = compute_weights(&ladder(120), false).unwrap();

        assert_eq!(stack.priority("p119"), Some(i64::MAX));
        assert_eq!(stack.priority("p0"), Some(0));
    }

    #[test]
    fn test_repeated_declaration_counts_twice() {
        let g = graph(&[("pubsub", &["logger", "logger"]), ("logger", &[])]);
        let stack = compute_weights(&g, false).unwrap();

        assert_eq!(stack.priority("logger"), Some(2));
    }

    #[test]
    fn test_implicit_dependency_is_synthesized() {
        let g = graph(&[("pubsub", &["redis"]), ("cache", &["redis"])]);
        let stack = compute_weights(&g, true).unwrap();

        assert_eq!(stack.priority("redis"), Some(2));
        let implicits = stack.implicits();
        assert_eq!(implicits.len(), 1);
        assert_eq!(implicits[0].id, "redis");
        assert_eq!(implicits[0].required_by, "pubsub");
        assert!(!implicits[0].is_local);
        assert!(implicits[0].dependencies.is_empty());
        // The record keeps its placeholder priority; ordering uses the weight.
        assert_eq!(implicits[0].priority, 1);
        assert_ne!(stack.priority("redis"), Some(implicits[0].priority));
    }

    #[test]
    fn test_unknown_dependency_without_implicits() {
        let g = graph(&[("pubsub", &["redis"])]);
        let err = compute_weights(&g, false).unwrap_err();

        assert_eq!(
            err,
            SortError::UnknownDependency {
                plugin: "pubsub".into(),
                dependency: "redis".into(),
            }
        );
    }
}
