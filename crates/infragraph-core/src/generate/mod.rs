//! Generation pipeline: resources in, connectivity graph and description out.
//!
//! # Overview
//!
//! ```text
//! resources ─▶ populate ─▶ dependency edges ─▶ pre_process ─▶ clean
//!                                                               │
//!      description ◀─ hanging-edge cleanup ◀─ mutate ◀─ fix directions
//! ```
//!
//! Stages after population are toggled by [`GenerateOptions`]. Any fatal
//! error aborts the run; there is no partial result.

mod cleanup;
mod connection;
mod description;
mod direction;
mod mutate;
mod options;
mod resource;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub use cleanup::{CleanupReport, clean_hanging_edges};
pub use connection::{
    Chain, Connection, Direction, direction_sum, find_edge_connections, shortest_node_path,
};
pub use description::build_description;
pub use direction::{DirectionReport, Reference, fix_directions};
pub use mutate::{MutateReport, mutate};
pub use options::GenerateOptions;
pub use resource::{Resource, ResourceList};

use crate::error::{GenerateError, GraphError};
use crate::graph::{Edge, EdgeId, Graph, Node, NodeId};
use crate::provider::{Configs, Registry, ResourceKind, Resolver};

/// Per-stage counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    /// Resources that became nodes.
    pub populated: usize,
    /// Resources skipped for lack of a provider or an unused type.
    pub skipped: usize,
    /// Unconnected nodes dropped by `clean`.
    pub cleaned: usize,
    pub directions: DirectionReport,
    pub contraction: MutateReport,
    pub cleanup: CleanupReport,
}

/// Outcome of [`generate`].
#[derive(Debug, Clone)]
pub struct Generated {
    pub graph: Graph,
    /// `{"resource": {type: {name: attributes}}}`.
    pub description: Value,
    /// Whether the run ended up in raw mode.
    pub raw: bool,
    pub report: GenerateReport,
}

/// Run the whole pipeline over `resources`.
///
/// # Errors
///
/// Any [`GenerateError`] raised by a stage. Unknown providers are not
/// errors: those resources are skipped.
#[instrument(skip_all, fields(resources = resources.len()))]
pub fn generate(
    resources: &[Resource],
    options: GenerateOptions,
    registry: &Registry,
) -> Result<Generated, GenerateError> {
    let raw = options.raw || !has_known_provider(resources, registry);
    if raw && !options.raw {
        info!("no resource has a known provider, falling back to raw mode");
    }
    let resolver = Resolver::new(registry, raw);

    let mut graph = Graph::new();
    let mut configs = Configs::new();
    let mut report = GenerateReport::default();

    let canonical_ids = populate(&mut graph, &mut configs, &mut report, resources, &resolver)?;
    info!(
        nodes = graph.node_count(),
        skipped = report.skipped,
        "populated"
    );

    add_dependency_edges(&mut graph, resources, &canonical_ids)?;
    pre_process(&mut graph, &configs, &resolver)?;
    info!(edges = graph.edge_count(), "dependency edges added");

    if options.clean {
        report.cleaned = graph.clean();
    }

    report.directions = fix_directions(&mut graph, &mut configs, &resolver, options.external_nodes)?;

    if options.connections {
        report.contraction = mutate(&mut graph, &resolver)?;
    }
    if options.clean {
        report.cleanup = clean_hanging_edges(&mut graph, &resolver, options.connections)?;
    }

    let description = build_description(&graph, &configs, &canonical_ids, &resolver)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "generated"
    );

    Ok(Generated {
        graph,
        description,
        raw,
        report,
    })
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn has_known_provider(resources: &[Resource], registry: &Registry) -> bool {
    let resolver = Resolver::new(registry, false);
    resources.iter().any(|r| {
        matches!(
            resolver.kind(&r.canonical),
            Ok(ResourceKind::Node | ResourceKind::Edge | ResourceKind::Ignored)
        )
    })
}

/// Create one node per distinct canonical; returns canonical → node id.
fn populate(
    graph: &mut Graph,
    configs: &mut Configs,
    report: &mut GenerateReport,
    resources: &[Resource],
    resolver: &Resolver<'_>,
) -> Result<HashMap<String, NodeId>, GenerateError> {
    let mut canonical_ids = HashMap::new();

    for resource in resources {
        let canonical = &resource.canonical;
        match resolver.kind(canonical) {
            Ok(ResourceKind::Node | ResourceKind::Edge) => {}
            Ok(kind) => {
                debug!(%canonical, ?kind, "resource type not used, skipped");
                report.skipped += 1;
                continue;
            }
            Err(err) => {
                debug!(%canonical, %err, "resource skipped");
                report.skipped += 1;
                continue;
            }
        }

        if canonical_ids.contains_key(canonical) {
            warn!(%canonical, "duplicate resource, keeping the first instance");
            continue;
        }

        let id = NodeId::generate();
        let mut node = Node::new(id.clone(), canonical.clone());
        if let Some(external_id) = resource.provider_id() {
            node = node.with_external_id(external_id);
        }
        graph.add_node(node)?;
        configs.insert(id.clone(), resource.attributes.clone());
        canonical_ids.insert(canonical.clone(), id);
        report.populated += 1;
    }

    Ok(canonical_ids)
}

fn add_dependency_edges(
    graph: &mut Graph,
    resources: &[Resource],
    canonical_ids: &HashMap<String, NodeId>,
) -> Result<(), GenerateError> {
    for resource in resources {
        let Some(source) = canonical_ids.get(&resource.canonical) else {
            continue;
        };
        for dependency in &resource.dependencies {
            let Some(target) = canonical_ids.get(dependency) else {
                continue;
            };
            add_edge_once(graph, source, target)?;
        }
    }
    Ok(())
}

/// Run each distinct provider's `pre_process` over the whole description.
fn pre_process(
    graph: &mut Graph,
    configs: &Configs,
    resolver: &Resolver<'_>,
) -> Result<(), GenerateError> {
    let mut seen = HashSet::new();
    let mut providers = Vec::new();
    for node in graph.nodes() {
        let (provider, _) = resolver.resolve(&node.canonical)?;
        if seen.insert(provider.kind()) {
            providers.push(provider);
        }
    }

    for provider in providers {
        for (source, target) in provider.pre_process(configs) {
            if !graph.contains_node(&source) || !graph.contains_node(&target) {
                continue;
            }
            add_edge_once(graph, &source, &target)?;
        }
    }
    Ok(())
}

/// Add `source → target` unless it is a self-loop or the pair is already
/// connected.
fn add_edge_once(graph: &mut Graph, source: &NodeId, target: &NodeId) -> Result<(), GraphError> {
    if source == target {
        return Ok(());
    }
    match graph.add_edge(Edge::new(EdgeId::generate(), source.clone(), target.clone())) {
        Ok(()) | Err(GraphError::EdgeExists { .. }) => Ok(()),
        Err(err) => Err(err),
    }
}
