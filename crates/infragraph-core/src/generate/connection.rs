//! Chains from a real node through pass-through nodes to the nearest real
//! nodes.
//!
//! # Sign convention
//!
//! Each hop records whether its edge was traversed along its orientation
//! as seen from the chain root:
//!
//! ```text
//! root ──▶ E1 ◀── E2 ──▶ B
//!      +1     -1     +1        Σ direction = +1
//! ```
//!
//! A positive hop means the side closer to the root is the edge source.

use std::collections::HashSet;

use crate::error::GenerateError;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::provider::{ResourceKind, Resolver};

/// Orientation of one hop relative to the chain root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Root side is the edge source.
    Positive,
    /// Root side is the edge target.
    Negative,
}

impl Direction {
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

/// One hop of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub node: NodeId,
    pub direction: Direction,
}

/// Ordered hops from a root; every hop but the last is a pass-through node,
/// the last one is a real node.
pub type Chain = Vec<Connection>;

/// Σ direction of a chain.
#[must_use]
pub fn direction_sum(chain: &[Connection]) -> i64 {
    chain.iter().map(|c| c.direction.sign()).sum()
}

/// For each edge of `root` not yet in `visited`, the shortest chains reached
/// through it.
///
/// Every traversed edge is added to `visited`. Each pass-through neighbor is
/// searched with its own copy of the set so sibling branches do not hide
/// each other. External neighbors are stepped over without marking their
/// edge. Dead ends contribute nothing, so the result may hold fewer entries
/// than `root` has edges.
///
/// # Errors
///
/// Propagates lookup and classification failures.
pub fn find_edge_connections(
    graph: &Graph,
    root: &NodeId,
    visited: &mut HashSet<EdgeId>,
    resolver: &Resolver<'_>,
) -> Result<Vec<Vec<Chain>>, GenerateError> {
    let mut found = Vec::new();

    for edge in graph.edges_for_node(root) {
        if visited.contains(&edge.id) {
            continue;
        }

        let (neighbor, direction) = if &edge.source == root {
            (&edge.target, Direction::Positive)
        } else {
            (&edge.source, Direction::Negative)
        };
        let kind = resolver.kind(&graph.node(neighbor)?.canonical)?;
        if kind == ResourceKind::External {
            continue;
        }

        visited.insert(edge.id.clone());
        let hop = Connection {
            node: neighbor.clone(),
            direction,
        };

        if kind == ResourceKind::Node {
            found.push(vec![vec![hop]]);
            continue;
        }

        let mut branch = visited.clone();
        let tails = shortest_node_path(graph, neighbor, &mut branch, resolver)?;
        if tails.is_empty() {
            continue;
        }
        found.push(
            tails
                .into_iter()
                .map(|tail| {
                    let mut chain = Vec::with_capacity(tail.len() + 1);
                    chain.push(hop.clone());
                    chain.extend(tail);
                    chain
                })
                .collect(),
        );
    }

    Ok(found)
}

/// Every chain of minimal length from `from` to a real node.
///
/// # Errors
///
/// Same as [`find_edge_connections`].
pub fn shortest_node_path(
    graph: &Graph,
    from: &NodeId,
    visited: &mut HashSet<EdgeId>,
    resolver: &Resolver<'_>,
) -> Result<Vec<Chain>, GenerateError> {
    let per_edge = find_edge_connections(graph, from, visited, resolver)?;

    let mut shortest: Vec<Chain> = Vec::new();
    for chain in per_edge.into_iter().flatten() {
        match shortest.first().map(Vec::len) {
            Some(len) if chain.len() > len => {}
            Some(len) if chain.len() == len => shortest.push(chain),
            _ => shortest = vec![chain],
        }
    }
    Ok(shortest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::provider::{CatalogProvider, ProviderCatalog, Registry};

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register(
            "t",
            CatalogProvider::new(ProviderCatalog {
                name: "t".into(),
                nodes: vec!["t_node".into()],
                edges: vec!["t_edge".into()],
                ..ProviderCatalog::default()
            }),
        );
        r
    }

    /// Nodes named `n*` are real, `e*` pass-through, `x*` external.
    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for n in nodes {
            let canonical = match n.chars().next() {
                Some('n') => format!("t_node.{n}"),
                Some('x') => format!("im_out.{n}"),
                _ => format!("t_edge.{n}"),
            };
            g.add_node(Node::new(*n, canonical)).unwrap();
        }
        for (i, (s, t)) in edges.iter().enumerate() {
            g.add_edge(Edge::new(format!("edge{i}"), *s, *t)).unwrap();
        }
        g
    }

    fn render(chain: &Chain) -> Vec<(String, i64)> {
        chain
            .iter()
            .map(|c| (c.node.to_string(), c.direction.sign()))
            .collect()
    }

    #[test]
    fn direct_neighbor_is_single_hop() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let g = graph(&["n1", "n2"], &[("n2", "n1")]);

        let found =
            find_edge_connections(&g, &NodeId::from("n1"), &mut HashSet::new(), &res).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(render(&found[0][0]), vec![("n2".to_string(), -1)]);
    }

    #[test]
    fn chain_through_pass_through_nodes() {
        let r = registry();
        let res = Resolver::new(&r, false);
        // n1 -> e1 <- e2 -> n2
        let g = graph(
            &["n1", "e1", "e2", "n2"],
            &[("n1", "e1"), ("e2", "e1"), ("e2", "n2")],
        );

        let found =
            find_edge_connections(&g, &NodeId::from("n1"), &mut HashSet::new(), &res).unwrap();
        assert_eq!(found.len(), 1);
        let chain = &found[0][0];
        assert_eq!(
            render(chain),
            vec![
                ("e1".to_string(), 1),
                ("e2".to_string(), -1),
                ("n2".to_string(), 1)
            ]
        );
        assert_eq!(direction_sum(chain), 1);
    }

    #[test]
    fn dead_end_contributes_nothing() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let g = graph(&["n1", "e1", "e2"], &[("n1", "e1"), ("e1", "e2")]);

        let found =
            find_edge_connections(&g, &NodeId::from("n1"), &mut HashSet::new(), &res).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn external_neighbors_are_skipped() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let g = graph(&["n1", "x1", "e1", "n2"], &[("x1", "n1"), ("n1", "e1"), ("e1", "n2")]);

        let mut visited = HashSet::new();
        let found = find_edge_connections(&g, &NodeId::from("n1"), &mut visited, &res).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][0].len(), 2);
        assert!(!visited.contains(&EdgeId::from("edge0")));
        assert!(visited.contains(&EdgeId::from("edge1")));
    }

    #[test]
    fn shortest_keeps_ties_only() {
        let r = registry();
        let res = Resolver::new(&r, false);
        // From e0: n1 directly, n2 directly, n3 via e1.
        let g = graph(
            &["e0", "n1", "n2", "e1", "n3"],
            &[("e0", "n1"), ("n2", "e0"), ("e0", "e1"), ("e1", "n3")],
        );

        let chains =
            shortest_node_path(&g, &NodeId::from("e0"), &mut HashSet::new(), &res).unwrap();
        let rendered: Vec<_> = chains.iter().map(render).collect();
        assert_eq!(
            rendered,
            vec![vec![("n1".to_string(), 1)], vec![("n2".to_string(), -1)]]
        );
    }

    #[test]
    fn visited_edges_are_not_walked_again() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let g = graph(&["n1", "e1", "n2"], &[("n1", "e1"), ("e1", "n2")]);

        let mut visited: HashSet<EdgeId> = [EdgeId::from("edge0")].into_iter().collect();
        let found = find_edge_connections(&g, &NodeId::from("n1"), &mut visited, &res).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn cycle_of_pass_through_nodes_terminates() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let g = graph(
            &["n1", "e1", "e2", "e3"],
            &[("n1", "e1"), ("e1", "e2"), ("e2", "e3"), ("e3", "e1")],
        );
        let found =
            find_edge_connections(&g, &NodeId::from("n1"), &mut HashSet::new(), &res).unwrap();
        assert!(found.is_empty());
    }
}
