//! Direction fixer.
//!
//! Dependency edges point from dependent to dependency, which says nothing
//! about traffic. Providers know better for pass-through resources: a
//! security group's ingress lists who may talk to it. This pass re-orients
//! the edges of every pass-through node accordingly and, when asked, wires
//! in synthetic external nodes.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{GenerateError, GraphError};
use crate::graph::{Edge, EdgeId, Graph, Node, NodeId};
use crate::provider::{Configs, ResourceKind, Resolver};

/// `${type.name.attr}`
const INTERPOLATION: &str =
    r"\$\{(?P<type>[^.][a-z0-9_-]+)\.(?P<name>[^.][a-z0-9_-]+)\.(?P<attr>[a-z0-9_-]+)\}";

static RE_INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INTERPOLATION).expect("interpolation pattern is valid"));

/// A provider reference to another resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `type.name` extracted from an interpolation.
    Canonical(String),
    /// Raw provider identifier, matched against [`Node::external_id`].
    ProviderId(String),
}

impl Reference {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        RE_INTERPOLATION
            .captures(raw)
            .and_then(|caps| Some(format!("{}.{}", caps.name("type")?.as_str(), caps.name("name")?.as_str())))
            .map_or_else(|| Self::ProviderId(raw.to_string()), Self::Canonical)
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Canonical(c) => &node.canonical == c,
            Self::ProviderId(id) => node.external_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// What the direction fixer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionReport {
    pub inverted: usize,
    pub external_nodes: usize,
    pub external_edges: usize,
}

/// Re-orient pass-through edges from provider hints and attach external
/// nodes.
///
/// For every pass-through node `p`:
///
/// - each inbound reference `r` inverts the edges `p → r`, making `r` the
///   source;
/// - each outbound reference `r` inverts the edges `r → p`, making `r` the
///   target.
///
/// References to `p` itself are ignored. With `external_nodes`, every
/// synthetic canonical the provider reports becomes a node (reused by
/// canonical) with an empty config and an edge `external → s` for every
/// `s → p` where `s` is a real node. Pass-through sources are skipped: they
/// reach `p` through their own rules, not the open one.
///
/// # Errors
///
/// Lookup, classification and store validation failures.
#[instrument(skip_all)]
pub fn fix_directions(
    graph: &mut Graph,
    configs: &mut Configs,
    resolver: &Resolver<'_>,
    external_nodes: bool,
) -> Result<DirectionReport, GenerateError> {
    let mut report = DirectionReport::default();

    let mut pass_through = Vec::new();
    for node in graph.nodes() {
        if resolver.kind(&node.canonical)? == ResourceKind::Edge {
            pass_through.push((node.id.clone(), node.canonical.clone()));
        }
    }

    let mut synthetic: Vec<(NodeId, Vec<String>)> = Vec::new();
    for (id, canonical) in &pass_through {
        let (provider, ty) = resolver.resolve(canonical)?;
        let io = provider.resource_in_out_nodes(id, ty, configs);

        for raw in &io.ins {
            report.inverted += invert_matching(graph, id, &Reference::parse(raw), Side::Target)?;
        }
        for raw in &io.outs {
            report.inverted += invert_matching(graph, id, &Reference::parse(raw), Side::Source)?;
        }
        if external_nodes && !io.nodes.is_empty() {
            synthetic.push((id.clone(), io.nodes));
        }
    }

    for (id, canonicals) in synthetic {
        attach_external(graph, configs, resolver, &id, &canonicals, &mut report)?;
    }

    debug!(
        inverted = report.inverted,
        external_nodes = report.external_nodes,
        external_edges = report.external_edges,
        "directions fixed"
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Source,
    Target,
}

/// Invert every edge of `pass_through` whose `side` endpoint matches
/// `reference`.
fn invert_matching(
    graph: &mut Graph,
    pass_through: &NodeId,
    reference: &Reference,
    side: Side,
) -> Result<usize, GenerateError> {
    let mut inverted = 0;
    for eid in graph.edge_ids_for_node(pass_through) {
        let edge = graph.edge(&eid)?;
        let endpoint = match side {
            Side::Source => &edge.source,
            Side::Target => &edge.target,
        };
        if endpoint == pass_through {
            continue;
        }
        if reference.matches(graph.node(endpoint)?) {
            graph.invert_edge(&eid)?;
            inverted += 1;
        }
    }
    Ok(inverted)
}

fn attach_external(
    graph: &mut Graph,
    configs: &mut Configs,
    resolver: &Resolver<'_>,
    pass_through: &NodeId,
    canonicals: &[String],
    report: &mut DirectionReport,
) -> Result<(), GenerateError> {
    let mut sources = Vec::new();
    for edge in graph.edges_for_node(pass_through) {
        if &edge.target != pass_through {
            continue;
        }
        let source = graph.node(&edge.source)?;
        if resolver.kind(&source.canonical)? == ResourceKind::Node {
            sources.push(edge.source.clone());
        }
    }

    for canonical in canonicals {
        let external = if let Ok(existing) = graph.node_by_canonical(canonical) {
            existing.id.clone()
        } else {
            let id = NodeId::generate();
            graph.add_node(Node::new(id.clone(), canonical.clone()))?;
            configs.insert(id.clone(), serde_json::Map::new());
            report.external_nodes += 1;
            id
        };

        for source in &sources {
            match graph.add_edge(Edge::new(EdgeId::generate(), external.clone(), source.clone())) {
                Ok(()) => report.external_edges += 1,
                Err(GraphError::EdgeExists { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CatalogProvider, ProviderCatalog, Registry};
    use serde_json::{Value, json};

    fn registry() -> Registry {
        let catalog: ProviderCatalog = toml::from_str(
            r#"
name = "aws"
nodes = ["aws_instance", "aws_lb"]
edges = ["aws_security_group"]

[[directions]]
type = "aws_security_group"
ingress = ["ingress.security_groups"]
egress = ["egress.security_groups"]

[[open_world]]
type = "aws_security_group"
rules = "ingress"
"#,
        )
        .unwrap();
        let mut r = Registry::new();
        r.register("aws", CatalogProvider::new(catalog));
        r
    }

    fn attrs(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        }
    }

    fn add(g: &mut Graph, configs: &mut Configs, id: &str, canonical: &str, cfg: Value) {
        let attributes = attrs(cfg);
        let mut node = Node::new(id, canonical);
        if let Some(ext) = attributes.get("id").and_then(Value::as_str) {
            node = node.with_external_id(ext);
        }
        g.add_node(node).unwrap();
        configs.insert(NodeId::from(id), attributes);
    }

    fn endpoints(g: &Graph, id: &str) -> (String, String) {
        let e = g.edge(&EdgeId::from(id)).unwrap();
        (e.source.to_string(), e.target.to_string())
    }

    #[test]
    fn interpolation_pattern_compiles() {
        assert!(Regex::new(INTERPOLATION).is_ok());
        assert_eq!(RE_INTERPOLATION.captures_len(), 4);
    }

    #[test]
    fn parses_interpolations_and_raw_ids() {
        assert_eq!(
            Reference::parse("${aws_security_group.front-lb.id}"),
            Reference::Canonical("aws_security_group.front-lb".into())
        );
        assert_eq!(
            Reference::parse("sg-0123"),
            Reference::ProviderId("sg-0123".into())
        );
        assert_eq!(
            Reference::parse("${aws_security_group.front}"),
            Reference::ProviderId("${aws_security_group.front}".into())
        );
    }

    #[test]
    fn inbound_reference_becomes_source() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "lbsg", "aws_security_group.lb", json!({"id": "sg-lb"}));
        add(
            &mut g,
            &mut configs,
            "websg",
            "aws_security_group.web",
            json!({"id": "sg-web", "ingress": [{"security_groups": ["sg-lb"]}]}),
        );
        // Dependency edge says web -> lb; traffic flows lb -> web.
        g.add_edge(Edge::new("e", "websg", "lbsg")).unwrap();

        let report = fix_directions(&mut g, &mut configs, &res, true).unwrap();

        assert_eq!(report.inverted, 1);
        assert_eq!(endpoints(&g, "e"), ("lbsg".into(), "websg".into()));
    }

    #[test]
    fn outbound_interpolation_becomes_target() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "db", "aws_security_group.db", json!({}));
        add(
            &mut g,
            &mut configs,
            "app",
            "aws_security_group.app",
            json!({"egress": [{"security_groups": ["${aws_security_group.db.id}"]}]}),
        );
        g.add_edge(Edge::new("e", "db", "app")).unwrap();

        fix_directions(&mut g, &mut configs, &res, true).unwrap();

        assert_eq!(endpoints(&g, "e"), ("app".into(), "db".into()));
    }

    #[test]
    fn self_reference_is_ignored() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "i", "aws_instance.a", json!({"id": "i-1"}));
        add(
            &mut g,
            &mut configs,
            "sg",
            "aws_security_group.sg",
            json!({"id": "sg-1", "ingress": [{"security_groups": ["sg-1"]}]}),
        );
        g.add_edge(Edge::new("e", "i", "sg")).unwrap();

        let report = fix_directions(&mut g, &mut configs, &res, true).unwrap();

        assert_eq!(report.inverted, 0);
        assert_eq!(endpoints(&g, "e"), ("i".into(), "sg".into()));
    }

    #[test]
    fn open_world_adds_external_node_once() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "a", "aws_instance.a", json!({"id": "i-a"}));
        add(&mut g, &mut configs, "b", "aws_instance.b", json!({"id": "i-b"}));
        let open = json!({"ingress": [
            {"protocol": "tcp", "from_port": 80, "to_port": 80, "cidr_blocks": ["0.0.0.0/0"]}
        ]});
        add(&mut g, &mut configs, "sg1", "aws_security_group.one", open.clone());
        add(&mut g, &mut configs, "sg2", "aws_security_group.two", open);
        g.add_edge(Edge::new("e1", "a", "sg1")).unwrap();
        g.add_edge(Edge::new("e2", "b", "sg2")).unwrap();
        g.add_edge(Edge::new("e3", "a", "sg2")).unwrap();

        let report = fix_directions(&mut g, &mut configs, &res, true).unwrap();

        assert_eq!(report.external_nodes, 1);
        assert_eq!(report.external_edges, 2);
        let ext = g.node_by_canonical("im_out.tcp/80->80").unwrap();
        assert!(configs.get(&ext.id).unwrap().is_empty());
        let targets: Vec<_> = g
            .edges_for_node(&ext.id)
            .map(|e| {
                assert_eq!(e.source, ext.id);
                e.target.to_string()
            })
            .collect();
        assert_eq!(targets, vec!["a", "b"]);
    }

    #[test]
    fn external_node_skips_pass_through_sources() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "lb", "aws_lb.front", json!({"id": "lb-1"}));
        add(&mut g, &mut configs, "web", "aws_instance.web", json!({"id": "i-web"}));
        add(&mut g, &mut configs, "lbsg", "aws_security_group.lb", json!({"id": "sg-lb"}));
        add(
            &mut g,
            &mut configs,
            "websg",
            "aws_security_group.web",
            json!({"id": "sg-web", "ingress": [
                {"security_groups": ["sg-lb"]},
                {"protocol": "tcp", "from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}
            ]}),
        );
        g.add_edge(Edge::new("e1", "lb", "lbsg")).unwrap();
        g.add_edge(Edge::new("e2", "web", "websg")).unwrap();
        g.add_edge(Edge::new("e3", "websg", "lbsg")).unwrap();

        let report = fix_directions(&mut g, &mut configs, &res, true).unwrap();

        assert_eq!(endpoints(&g, "e3"), ("lbsg".into(), "websg".into()));
        assert_eq!(report.external_edges, 1);
        let ext = g.node_by_canonical("im_out.tcp/22->22").unwrap();
        let targets: Vec<_> = g.edges_for_node(&ext.id).map(|e| e.target.to_string()).collect();
        assert_eq!(targets, vec!["web"]);
    }

    #[test]
    fn external_nodes_can_be_disabled() {
        let r = registry();
        let res = Resolver::new(&r, false);
        let mut g = Graph::new();
        let mut configs = Configs::new();
        add(&mut g, &mut configs, "a", "aws_instance.a", json!({}));
        add(
            &mut g,
            &mut configs,
            "sg",
            "aws_security_group.sg",
            json!({"ingress": [{"protocol": "tcp", "from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]}),
        );
        g.add_edge(Edge::new("e", "a", "sg")).unwrap();

        let report = fix_directions(&mut g, &mut configs, &res, false).unwrap();

        assert_eq!(report, DirectionReport::default());
        assert_eq!(g.node_count(), 2);
    }
}
