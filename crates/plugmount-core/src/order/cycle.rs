use std::collections::HashSet;

use super::graph::DependencyGraph;

/// Finds a dependency path from `start` back to itself.
///
/// Depth-first walk from `start`, expanding each id at most once. Reaching
/// `start` again closes the cycle and the current path is returned with
/// `start` appended, e.g. `["a", "b", "a"]`. Any other id already seen is a
/// dead end. Returns `None` when `start` is not part of a cycle.
pub fn find_cycle(graph: &DependencyGraph, start: &str) -> Option<Vec<String>> {
    let mut path = Vec::new();
    let mut seen = HashSet::new();

    if visit(graph, start, start, &mut path, &mut seen) {
        path.push(start.to_string());
        Some(path)
    } else {
        None
    }
}

fn visit(
    graph: &DependencyGraph,
    id: &str,
    start: &str,
    path: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> bool {
    if seen.contains(id) {
        return id == start;
    }

    seen.insert(id.to_string());
    path.push(id.to_string());

    let found = graph
        .dependencies(id)
        .iter()
        .any(|dependency| visit(graph, dependency, start, path, seen));

    if !found {
        path.pop();
    }
    found
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

    #[test]
    fn test_two_node_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(find_cycle(&g, "a"), Some(vec!["a".into(), "b".into(), "a".into()]));
    }

    #[test]
    fn test_self_dependency() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&g, "a"), Some(vec!["a".into(), "a".into()]));
    }

    #[test]
    fn test_cycle_behind_a_branch() {
        let g = graph(&[("a", &["x", "b"]), ("x", &[]), ("b", &["c"]), ("c", &["a"])]);
        assert_eq!(
            find_cycle(&g, "a"),
            Some(vec!["a".into(), "b".into(), "c".into(), "a".into()])
        );
    }

    #[test]
    fn test_shared_dependencies_are_walked_once() {
        // p{i} depends on p{i+1} and p{i+2}.
        let ids: Vec<String> = (0..60).map(|i| format!("p{i}")).collect();
        let mut g = DependencyGraph::new();
        for (i, id) in ids.iter().enumerate() {
            g.insert(id.clone(), ids.iter().skip(i + 1).take(2).cloned().collect());
        }
        assert_eq!(find_cycle(&g, "p0"), None);

        g.insert("p59", vec!["p0".to_string()]);
        let cycle = find_cycle(&g, "p0").unwrap();
        assert_eq!(cycle.len(), 61);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_no_cycle_through_start() {
        // b and c loop between themselves; a is only an entry point.
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        assert_eq!(find_cycle(&g, "a"), None);

        let acyclic = graph(&[("a", &["b"]), ("b", &[])]);
        assert_eq!(find_cycle(&acyclic, "a"), None);
    }
}
