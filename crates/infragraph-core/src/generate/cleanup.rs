//! Hanging-edge cleanup.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::GenerateError;
use crate::graph::{Graph, NodeId};
use crate::provider::Resolver;

/// What the cleanup pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Pass-through nodes merged into their single neighbor.
    pub merged: usize,
    /// Pass-through nodes removed by the final sweep.
    pub swept: usize,
}

/// Merge every pass-through node left with exactly one edge into its
/// neighbor, until none is left. With `sweep`, every remaining pass-through
/// node is then removed together with its edges.
///
/// External nodes are never touched.
///
/// # Errors
///
/// Lookup, classification and store failures.
#[instrument(skip_all)]
pub fn clean_hanging_edges(
    graph: &mut Graph,
    resolver: &Resolver<'_>,
    sweep: bool,
) -> Result<CleanupReport, GenerateError> {
    let mut report = CleanupReport::default();

    let mut work: VecDeque<NodeId> = VecDeque::new();
    for node in graph.nodes() {
        if resolver.kind(&node.canonical)?.is_pass_through() {
            work.push_back(node.id.clone());
        }
    }

    while let Some(id) = work.pop_front() {
        if !graph.contains_node(&id) || graph.degree(&id) != 1 {
            continue;
        }
        let Some(neighbor) = graph
            .edges_for_node(&id)
            .next()
            .and_then(|e| e.other_end(&id).cloned())
        else {
            continue;
        };

        debug!(node = %id, into = %neighbor, "merge hanging node");
        graph.replace(&id, &neighbor)?;
        report.merged += 1;

        // The neighbor lost an edge and may now hang itself.
        if resolver.kind(&graph.node(&neighbor)?.canonical)?.is_pass_through() {
            work.push_back(neighbor);
        }
    }

    if sweep {
        let mut leftover = Vec::new();
        for node in graph.nodes() {
            if resolver.kind(&node.canonical)?.is_pass_through() {
                leftover.push(node.id.clone());
            }
        }
        for id in &leftover {
            graph.remove_node(id)?;
        }
        report.swept = leftover.len();
    }

    debug!(merged = report.merged, swept = report.swept, "hanging nodes cleaned");
    Ok(report)
}
