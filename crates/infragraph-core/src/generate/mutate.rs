//! Contraction engine.
//!
//! # Overview
//!
//! Repeatedly picks the best chain in the graph and collapses it into a
//! single edge between its two real ends, until no real node reaches
//! another one through pass-through nodes.
//!
//! ## Candidate ranking
//!
//! Per real node, among chains of two or more hops:
//!
//! 1. highest Σ direction;
//! 2. endpoint not already a direct neighbor of the root.
//!
//! Across nodes, lexicographically on (Σ direction, node weight, incident
//! edge count). Ties keep the earliest chain and the earliest node in
//! insertion order, so a run is deterministic for a given graph.
//!
//! ## Contraction walk
//!
//! ```text
//! for each hop but the last:
//!     next hop has the same direction  → replace(hop, root)
//!     otherwise                        → replace(hop, next hop)
//! last hop: orient the root ↔ destination edge with the accumulated sign
//! ```
//!
//! Every round removes at least one pass-through node, so the loop stops
//! after at most as many rounds as there are nodes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::connection::{Chain, Connection, direction_sum, find_edge_connections};
use crate::error::{GenerateError, GraphError};
use crate::graph::{Graph, NodeId};
use crate::provider::{ResourceKind, Resolver};

/// What a contraction run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutateReport {
    /// Chains collapsed.
    pub rounds: usize,
    /// Pass-through nodes merged away.
    pub contracted: usize,
}

#[derive(Debug)]
struct Candidate {
    root: NodeId,
    chain: Chain,
    score: (i64, i64, usize),
}

/// Contract pass-through chains until a fixpoint is reached.
///
/// # Errors
///
/// [`GraphError::NoMutualEdge`] or [`GraphError::MissingEdgeBetweenNodes`]
/// when the graph is inconsistent, [`GenerateError::DidNotConverge`] if the
/// round limit is hit.
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn mutate(graph: &mut Graph, resolver: &Resolver<'_>) -> Result<MutateReport, GenerateError> {
    let limit = graph.node_count() + 1;
    mutate_bounded(graph, resolver, limit)
}

fn mutate_bounded(
    graph: &mut Graph,
    resolver: &Resolver<'_>,
    limit: usize,
) -> Result<MutateReport, GenerateError> {
    let mut report = MutateReport::default();

    while let Some(candidate) = best_candidate(graph, resolver)? {
        if report.rounds >= limit {
            return Err(GenerateError::DidNotConverge {
                rounds: report.rounds,
            });
        }
        report.rounds += 1;
        report.contracted += contract(graph, &candidate.root, &candidate.chain)?;
    }

    debug!(
        rounds = report.rounds,
        contracted = report.contracted,
        "contraction reached fixpoint"
    );
    Ok(report)
}

/// Best chain of the whole graph, or `None` at the fixpoint.
fn best_candidate(graph: &Graph, resolver: &Resolver<'_>) -> Result<Option<Candidate>, GenerateError> {
    let mut best: Option<Candidate> = None;

    for node in graph.nodes() {
        if resolver.kind(&node.canonical)? != ResourceKind::Node {
            continue;
        }

        let per_edge = find_edge_connections(graph, &node.id, &mut HashSet::new(), resolver)?;
        let Some(chain) = pick_chain(graph, &node.id, per_edge.into_iter().flatten()) else {
            continue;
        };

        let score = (direction_sum(&chain), node.weight, graph.degree(&node.id));
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Candidate {
                root: node.id.clone(),
                chain,
                score,
            });
        }
    }

    Ok(best)
}

/// Best multi-hop chain of one root.
fn pick_chain(graph: &Graph, root: &NodeId, chains: impl Iterator<Item = Chain>) -> Option<Chain> {
    let mut best: Option<((i64, bool), Chain)> = None;

    for chain in chains.filter(|c| c.len() > 1) {
        let Some(last) = chain.last() else {
            continue;
        };
        let fresh = graph.edge_between(root, &last.node).is_none();
        let key = (direction_sum(&chain), fresh);
        if best.as_ref().is_none_or(|(k, _)| key > *k) {
            best = Some((key, chain));
        }
    }

    best.map(|(_, chain)| chain)
}

/// Collapse `chain` into one edge from `root`. Returns the number of
/// merged nodes.
fn contract(graph: &mut Graph, root: &NodeId, chain: &[Connection]) -> Result<usize, GenerateError> {
    let Some((last, hops)) = chain.split_last() else {
        return Ok(0);
    };

    let mut sign = 0_i64;
    for (i, hop) in hops.iter().enumerate() {
        sign += hop.direction.sign();
        let next = &chain[i + 1];
        let into = if next.direction == hop.direction {
            root
        } else {
            &next.node
        };
        debug!(src = %hop.node, rep = %into, "replace");
        graph.replace(&hop.node, into)?;
    }
    sign += last.direction.sign();

    let edge = graph
        .edge_between(root, &last.node)
        .map(|e| (e.id.clone(), &e.source == root));
    match edge {
        Some((id, root_is_source)) => {
            if (root_is_source && sign < 0) || (!root_is_source && sign > 0) {
                debug!(edge = %id, sign, "invert");
                graph.invert_edge(&id)?;
            }
        }
        None if &last.node == root => {
            warn!(node = %root, "chain closed on its own origin, no edge left to orient");
        }
        None => {
            let canonical = |id: &NodeId| {
                graph
                    .node(id)
                    .map_or_else(|_| id.to_string(), |n| n.canonical.clone())
            };
            return Err(GraphError::MissingEdgeBetweenNodes {
                from: canonical(root),
                to: canonical(&last.node),
            }
            .into());
        }
    }

    Ok(hops.len())
}
