//! Load order calculation.
//!
//! Modules are scheduled with Kahn's algorithm over the dependency graph, so
//! every module comes after everything it depends on. Among modules that are
//! ready at the same time, higher scores go first, then earlier discovery.
//!
//! A module's score is the number of distinct dependency paths reaching it
//! from any other module, so widely used modules rank early (a module reached
//! through both sides of a diamond counts twice). Modules declaring a numeric
//! priority take that number as their score instead; positive priorities are
//! negated while the declaration is read, so a priority only ever lowers a
//! module.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use modhost_core::{Error, Result};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{debug, info, warn};

use crate::descriptor::{Order, Registry};

/// Compute the load order of every module in `registry` and record it on
/// each descriptor.
pub fn compute(registry: &Registry) -> Result<Order> {
    let graph = build_graph(registry)?;

    let topo = toposort(&graph, None).map_err(|_| cycle_error(registry, &graph))?;
    let scores = scores(registry, &graph, &topo);

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<(i64, Reverse<usize>)> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| (scores[i], Reverse(i)))
        .collect();

    let mut sequence = Vec::with_capacity(registry.len());
    while let Some((_, Reverse(i))) = ready.pop() {
        sequence.push(i);
        for dependent in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            let d = dependent.index();
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push((scores[d], Reverse(d)));
            }
        }
    }

    if sequence.len() != registry.len() {
        return Err(cycle_error(registry, &graph));
    }

    validate(registry, &graph, &sequence)?;

    let discovered: Vec<_> = registry.iter().collect();
    let modules: Vec<_> = sequence.iter().map(|&i| discovered[i].clone()).collect();
    let sequence_scores: Vec<i64> = sequence.iter().map(|&i| scores[i]).collect();
    let order = Order::new(modules, sequence_scores);

    let names: Vec<String> = order.names().into_iter().map(String::from).collect();
    for descriptor in order.iter() {
        if !descriptor.set_order(names.clone()) {
            warn!(
                "Module '{}' already carries a load order; keeping the first one",
                descriptor.name()
            );
        }
    }

    info!("Module order: {}", names.join(", "));
    Ok(order)
}

/// One node per descriptor (index = discovery position), one edge from each
/// dependency to its dependent.
fn build_graph(registry: &Registry) -> Result<DiGraph<(), ()>> {
    let mut graph = DiGraph::with_capacity(registry.len(), 0);
    for _ in registry.iter() {
        graph.add_node(());
    }

    for (i, descriptor) in registry.iter().enumerate() {
        for dependency in descriptor.dependencies().names() {
            let d = registry.position(dependency).ok_or_else(|| {
                Error::config(
                    descriptor.name(),
                    format!("dependency '{}' was never resolved", dependency),
                )
            })?;
            graph.update_edge(NodeIndex::new(d), NodeIndex::new(i), ());
        }
    }
    Ok(graph)
}

/// Path-count scores, with numeric priorities taken literally.
///
/// `topo` lists dependencies before dependents, so walking it backwards sees
/// every dependent before the modules it depends on.
fn scores(registry: &Registry, graph: &DiGraph<(), ()>, topo: &[NodeIndex]) -> Vec<i64> {
    let mut paths = vec![0i64; graph.node_count()];
    for &node in topo.iter().rev() {
        paths[node.index()] = graph
            .neighbors_directed(node, Direction::Outgoing)
            .fold(0i64, |acc, dependent| {
                acc.saturating_add(1).saturating_add(paths[dependent.index()])
            });
    }

    registry
        .iter()
        .zip(paths)
        .map(|(descriptor, count)| {
            let score = descriptor.dependencies().priority().unwrap_or(count);
            debug!("Module '{}' scored {}", descriptor.name(), score);
            score
        })
        .collect()
}

/// Cycle error naming every module on a cycle, in discovery order.
fn cycle_error(registry: &Registry, graph: &DiGraph<(), ()>) -> Error {
    let mut members: Vec<usize> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(NodeIndex::index)
        .collect();
    members.sort_unstable();

    let names: Vec<&str> = registry.names();
    Error::Cycle {
        modules: members.into_iter().map(|i| names[i].to_string()).collect(),
    }
}

/// Every dependency must precede its dependent.
fn validate(registry: &Registry, graph: &DiGraph<(), ()>, sequence: &[usize]) -> Result<()> {
    let mut position = vec![0usize; sequence.len()];
    for (pos, &node) in sequence.iter().enumerate() {
        position[node] = pos;
    }

    let names = registry.names();
    for edge in graph.raw_edges() {
        let (dependency, dependent) = (edge.source().index(), edge.target().index());
        if position[dependency] >= position[dependent] {
            return Err(Error::Ordering {
                dependent: names[dependent].to_string(),
                dependency: names[dependency].to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Dependencies;
    use crate::testutil::{registry_of, registry_with_managers, TestManager};

    fn assert_precedence(registry: &Registry, order: &Order) {
        for descriptor in registry.iter() {
            let me = order.position(descriptor.name()).unwrap();
            for dep in descriptor.dependencies().names() {
                assert!(
                    order.position(dep).unwrap() < me,
                    "{} must precede {}",
                    dep,
                    descriptor.name()
                );
            }
        }
    }

    #[test]
    fn test_diamond_precedence_and_scores() {
        let registry = registry_of(&[
            ("a", Dependencies::modules(["b", "c"])),
            ("b", Dependencies::modules(["d"])),
            ("c", Dependencies::modules(["d"])),
            ("d", Dependencies::None),
        ]);
        let order = compute(&registry).unwrap();

        assert_precedence(&registry, &order);
        assert_eq!(order.names(), vec!["d", "b", "c", "a"]);
        // d is reached via b, c, a→b and a→c.
        assert_eq!(order.score("d"), Some(4));
        assert_eq!(order.score("b"), Some(1));
        assert_eq!(order.score("a"), Some(0));
    }

    #[test]
    fn test_explicit_priority_not_elevated() {
        let registry = registry_of(&[
            ("late", Dependencies::Priority(-5)),
            ("x1", Dependencies::modules(["late"])),
            ("x2", Dependencies::modules(["late"])),
            ("x3", Dependencies::modules(["late"])),
        ]);
        let order = compute(&registry).unwrap();

        assert_eq!(order.score("late"), Some(-5));
        assert_precedence(&registry, &order);
    }

    #[test]
    fn test_priority_ranks_after_computed_scores() {
        let registry = registry_of(&[
            ("late", Dependencies::Priority(-5)),
            ("plain", Dependencies::None),
        ]);
        let order = compute(&registry).unwrap();
        assert_eq!(order.names(), vec!["plain", "late"]);
    }

    #[test]
    fn test_positive_priority_ranks_behind_computed_scores() {
        let registry = registry_with_managers(vec![
            TestManager::new("core"),
            TestManager::new("tail").priority(5),
            TestManager::new("a").depends_on(["core"]),
            TestManager::new("b").depends_on(["core"]),
            TestManager::new("c").depends_on(["core"]),
        ]);
        let order = compute(&registry).unwrap();

        assert_eq!(order.score("tail"), Some(-5));
        assert_eq!(order.names(), vec!["core", "a", "b", "c", "tail"]);
    }

    #[test]
    fn test_widely_used_module_ranks_first() {
        let registry = registry_of(&[
            ("one", Dependencies::None),
            ("five", Dependencies::None),
            ("u1", Dependencies::modules(["one"])),
            ("v1", Dependencies::modules(["five"])),
            ("v2", Dependencies::modules(["five"])),
            ("v3", Dependencies::modules(["five"])),
            ("v4", Dependencies::modules(["five"])),
            ("v5", Dependencies::modules(["five"])),
        ]);
        let order = compute(&registry).unwrap();

        assert_eq!(order.score("five"), Some(5));
        assert_eq!(order.score("one"), Some(1));
        assert!(order.position("five").unwrap() < order.position("one").unwrap());
        assert_precedence(&registry, &order);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let registry = registry_of(&[
            ("zeta", Dependencies::None),
            ("alpha", Dependencies::None),
            ("mid", Dependencies::None),
        ]);
        let order = compute(&registry).unwrap();
        assert_eq!(order.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_score_never_breaks_precedence() {
        // "hub" has the highest score but depends on "base", which nobody
        // else uses much; base must still come first.
        let registry = registry_of(&[
            ("hub", Dependencies::modules(["base"])),
            ("base", Dependencies::Priority(-10)),
            ("a", Dependencies::modules(["hub"])),
            ("b", Dependencies::modules(["hub"])),
            ("c", Dependencies::modules(["hub"])),
        ]);
        let order = compute(&registry).unwrap();

        assert_eq!(order.names()[0], "base");
        assert_eq!(order.names()[1], "hub");
        assert_precedence(&registry, &order);
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let registry = registry_of(&[
            ("a", Dependencies::modules(["b"])),
            ("b", Dependencies::modules(["a"])),
            ("free", Dependencies::None),
        ]);
        match compute(&registry) {
            Err(Error::Cycle { modules }) => assert_eq!(modules, vec!["a", "b"]),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_rejected() {
        let registry = registry_of(&[("narcissus", Dependencies::modules(["narcissus"]))]);
        match compute(&registry) {
            Err(Error::Cycle { modules }) => assert_eq!(modules, vec!["narcissus"]),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_order_recorded_on_descriptors() {
        let registry = registry_of(&[
            ("blog", Dependencies::modules(["auth"])),
            ("auth", Dependencies::None),
        ]);
        compute(&registry).unwrap();
        let expected = vec!["auth".to_string(), "blog".to_string()];
        for descriptor in registry.iter() {
            assert_eq!(descriptor.order().unwrap(), expected.as_slice());
        }
    }

    #[test]
    fn test_second_compute_keeps_first_recorded_order() {
        let registry = registry_of(&[("auth", Dependencies::None)]);
        compute(&registry).unwrap();

        let descriptor = registry.get("auth").unwrap();
        assert!(!descriptor.set_order(vec!["other".into()]));
        compute(&registry).unwrap();
        assert_eq!(descriptor.order().unwrap(), ["auth".to_string()]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = registry_of(&[]);
        assert!(compute(&registry).unwrap().is_empty());
    }
}
