//! Dependency-graph consistency analysis.
//!
//! The graph is a derived, read-only view over the summary map; analysis
//! never mutates a summary. Cycles are reported in closed form
//! (`[a, b, ..., a]`), rotated to start at their lexicographically smallest
//! member so the same loop is never reported twice.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

use crate::schema::SummaryMap;

/// One node of the derived dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// Names this node declares as dependencies.
    pub deps: Vec<String>,
    /// Names of nodes that depend on this one.
    pub references: Vec<String>,
}

/// Result of analyzing the full dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphAnalysis {
    /// Nodes with no dependencies and no referencing nodes.
    pub isolated: Vec<String>,
    /// `(node, missing_dep)` pairs where the dependency is not in the map.
    pub dangling: Vec<(String, String)>,
    /// Closed, rotation-normalized dependency cycles.
    pub cycles: Vec<Vec<String>>,
    /// The full derived graph, for reporting.
    pub graph: BTreeMap<String, GraphNode>,
}

/// Builds the entity dependency graph and checks its consistency.
#[must_use]
pub fn analyze_dependency_graph(summaries: &SummaryMap) -> GraphAnalysis {
    let mut graph: BTreeMap<String, GraphNode> = summaries
        .iter()
        .map(|(name, summary)| {
            (name.clone(), GraphNode { deps: summary.dependencies.clone(), references: Vec::new() })
        })
        .collect();

    let names: Vec<String> = graph.keys().cloned().collect();
    for name in &names {
        let deps = graph[name].deps.clone();
        for dep in deps {
            if let Some(target) = graph.get_mut(&dep) {
                target.references.push(name.clone());
            }
        }
    }

    let isolated = graph
        .iter()
        .filter(|(_, node)| node.deps.is_empty() && node.references.is_empty())
        .map(|(name, _)| name.clone())
        .collect();

    let mut dangling = Vec::new();
    for (name, node) in &graph {
        for dep in &node.deps {
            if !graph.contains_key(dep) {
                dangling.push((name.clone(), dep.clone()));
            }
        }
    }

    let cycles = find_cycles(&graph);

    GraphAnalysis { isolated, dangling, cycles, graph }
}

fn dfs(
    node: &str,
    graph: &BTreeMap<String, GraphNode>,
    visited: &mut BTreeSet<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    if let Some(pos) = path.iter().position(|n| n == node) {
        let mut cycle: Vec<String> = path[pos..].to_vec();
        cycle.push(node.to_string());
        cycles.push(cycle);
        return;
    }
    if !visited.insert(node.to_string()) {
        return;
    }

    path.push(node.to_string());
    if let Some(entry) = graph.get(node) {
        for dep in &entry.deps {
            // Unknown targets are dangling references, not cycle members.
            if graph.contains_key(dep) {
                dfs(dep, graph, visited, path, cycles);
            }
        }
    }
    path.pop();
}

/// Finds every dependency cycle in the graph.
///
/// Depth-first search from every node with an explicit recursion-path
/// stack; the visited set persists across starts so each cycle is walked
/// once. Cycles are rotated to start at their smallest member and
/// deduplicated.
#[must_use]
pub fn find_cycles(graph: &BTreeMap<String, GraphNode>) -> Vec<Vec<String>> {
    let mut raw_cycles = Vec::new();
    let mut visited = BTreeSet::new();

    for node in graph.keys() {
        let mut path = Vec::new();
        dfs(node, graph, &mut visited, &mut path, &mut raw_cycles);
    }

    let mut seen = BTreeSet::new();
    let mut unique = Vec::new();
    for closed in raw_cycles {
        // Drop the closing repeat, rotate, then close again.
        let open = &closed[..closed.len() - 1];
        let Some(min_pos) = open
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(pos, _)| pos)
        else {
            continue;
        };
        let mut normalized: Vec<String> = open[min_pos..].to_vec();
        normalized.extend_from_slice(&open[..min_pos]);
        normalized.push(normalized[0].clone());
        if seen.insert(normalized.clone()) {
            unique.push(normalized);
        }
    }
    unique
}

/// Renders an analysis as a human-readable report.
#[must_use]
pub fn format_report(analysis: &GraphAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dependency graph: {} entities", analysis.graph.len());

    if analysis.isolated.is_empty() {
        let _ = writeln!(out, "Isolated entities: none");
    } else {
        let _ = writeln!(out, "Isolated entities ({}):", analysis.isolated.len());
        for name in &analysis.isolated {
            let _ = writeln!(out, "  - {name}");
        }
    }

    if analysis.dangling.is_empty() {
        let _ = writeln!(out, "Dangling references: none");
    } else {
        let _ = writeln!(out, "Dangling references ({}):", analysis.dangling.len());
        for (name, dep) in &analysis.dangling {
            let _ = writeln!(out, "  - {name} -> {dep} (missing)");
        }
    }

    if analysis.cycles.is_empty() {
        let _ = writeln!(out, "Dependency cycles: none");
    } else {
        let _ = writeln!(out, "Dependency cycles ({}):", analysis.cycles.len());
        for cycle in &analysis.cycles {
            let _ = writeln!(out, "  - {}", cycle.join(" -> "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntitySummary;

    fn map_of(edges: &[(&str, &[&str])]) -> SummaryMap {
        edges
            .iter()
            .map(|(name, deps)| {
                let summary = EntitySummary {
                    dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
                    ..EntitySummary::default()
                };
                ((*name).to_string(), summary)
            })
            .collect()
    }

    #[test]
    fn references_mirror_dependencies() {
        let analysis = analyze_dependency_graph(&map_of(&[
            ("A", &["B"]),
            ("B", &[]),
        ]));
        assert_eq!(analysis.graph["B"].references, vec!["A"]);
        assert!(analysis.graph["A"].references.is_empty());
    }

    #[test]
    fn isolated_nodes_have_no_edges_either_way() {
        let analysis = analyze_dependency_graph(&map_of(&[
            ("A", &["B"]),
            ("B", &[]),
            ("Lonely", &[]),
        ]));
        assert_eq!(analysis.isolated, vec!["Lonely"]);
    }

    #[test]
    fn dangling_reference_is_reported_not_cycled() {
        let analysis = analyze_dependency_graph(&map_of(&[("A", &["Z"])]));
        assert_eq!(analysis.dangling, vec![("A".to_string(), "Z".to_string())]);
        assert!(analysis.cycles.iter().flatten().all(|n| n != "Z"));
        assert!(analysis.cycles.is_empty());
    }

    #[test]
    fn triangle_yields_exactly_one_normalized_cycle() {
        let analysis = analyze_dependency_graph(&map_of(&[
            ("B", &["C"]),
            ("C", &["A"]),
            ("A", &["B"]),
        ]));
        assert_eq!(analysis.cycles, vec![vec!["A", "B", "C", "A"]]);
    }

    #[test]
    fn self_loop_is_a_cycle_of_one() {
        let analysis = analyze_dependency_graph(&map_of(&[("A", &["A"])]));
        assert_eq!(analysis.cycles, vec![vec!["A", "A"]]);
    }

    #[test]
    fn two_disjoint_cycles_are_both_found() {
        let analysis = analyze_dependency_graph(&map_of(&[
            ("A", &["B"]),
            ("B", &["A"]),
            ("X", &["Y"]),
            ("Y", &["X"]),
        ]));
        assert_eq!(analysis.cycles.len(), 2);
        assert!(analysis.cycles.contains(&vec![
            "A".to_string(),
            "B".to_string(),
            "A".to_string()
        ]));
        assert!(analysis.cycles.contains(&vec![
            "X".to_string(),
            "Y".to_string(),
            "X".to_string()
        ]));
    }

    #[test]
    fn report_mentions_every_finding() {
        let analysis = analyze_dependency_graph(&map_of(&[
            ("A", &["B", "Z"]),
            ("B", &["A"]),
            ("Lonely", &[]),
        ]));
        let report = format_report(&analysis);
        assert!(report.contains("Lonely"));
        assert!(report.contains("A -> Z (missing)"));
        assert!(report.contains("A -> B -> A"));
    }
}
