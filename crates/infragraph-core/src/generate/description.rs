//! Per-canonical configuration map handed to renderers next to the graph.
//!
//! ```json
//! {"resource": {"aws_instance": {"web": {...}}, "aws_security_group": {"sg": {...}}}}
//! ```
//!
//! Surviving nodes are written first, then every canonical absorbed into an
//! edge. Module path segments are kept in the name key
//! (`module.net.aws_lb.front` → `aws_lb` / `module.net.front`).

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::error::GenerateError;
use crate::graph::{Graph, NodeId};
use crate::provider::{Configs, ResourceKind, Resolver, resource_type};

/// Split a canonical into its `(type, name)` keys.
fn keys(canonical: &str) -> Result<(&str, String), GenerateError> {
    let ty = resource_type(canonical)?;
    let segments: Vec<&str> = canonical.split('.').collect();
    let type_at = segments.len().saturating_sub(2);
    let name = segments
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != type_at)
        .map(|(_, s)| *s)
        .collect::<Vec<_>>()
        .join(".");
    Ok((ty, name))
}

/// Build `{"resource": {type: {name: attributes}}}`.
///
/// `canonical_ids` maps every populated canonical to its first node id, so
/// canonicals of contracted nodes still find their attributes.
///
/// # Errors
///
/// [`GenerateError::InvalidDescription`] when a node has no config, when two
/// surviving nodes claim the same slot, or when an edge canonical is
/// unknown.
pub fn build_description(
    graph: &Graph,
    configs: &Configs,
    canonical_ids: &HashMap<String, NodeId>,
    resolver: &Resolver<'_>,
) -> Result<Value, GenerateError> {
    let mut resources: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for node in graph.nodes() {
        let config = configs.get(&node.id).ok_or_else(|| {
            GenerateError::InvalidDescription(format!(
                "could not find config of node {:?}",
                node.canonical
            ))
        })?;
        let (ty, name) = keys(&node.canonical)?;
        let by_name = resources.entry(ty.to_string()).or_default();
        if by_name.contains_key(&name) {
            return Err(GenerateError::InvalidDescription(format!(
                "repeated config node for {:?}",
                node.canonical
            )));
        }
        by_name.insert(name, Value::Object(config.clone()));
    }

    for edge in graph.edges() {
        for canonical in &edge.canonicals {
            if resolver.kind(canonical)? == ResourceKind::External {
                continue;
            }
            let config = canonical_ids
                .get(canonical)
                .and_then(|id| configs.get(id))
                .ok_or_else(|| {
                    GenerateError::InvalidDescription(format!(
                        "could not find config of {canonical:?}"
                    ))
                })?;
            let (ty, name) = keys(canonical)?;
            // Canonicals shared by several edges are written once.
            resources
                .entry(ty.to_string())
                .or_default()
                .entry(name)
                .or_insert_with(|| Value::Object(config.clone()));
        }
    }

    let resources = resources
        .into_iter()
        .map(|(ty, by_name)| (ty, Value::Object(by_name)))
        .collect();
    let mut out = Map::new();
    out.insert("resource".to_string(), Value::Object(resources));
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::provider::{CatalogProvider, ProviderCatalog, Registry};
    use serde_json::json;

    fn attrs(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn keys_keep_module_path() {
        assert_eq!(keys("aws_lb.front").unwrap(), ("aws_lb", "front".to_string()));
        assert_eq!(
            keys("module.net.aws_lb.front").unwrap(),
            ("aws_lb", "module.net.front".to_string())
        );
        assert_eq!(
            keys("im_out.tcp/80->80").unwrap(),
            ("im_out", "tcp/80->80".to_string())
        );
    }

    #[test]
    fn nodes_and_edge_canonicals_are_written() {
        let mut g = Graph::new();
        g.add_node(Node::new("a", "aws_instance.a")).unwrap();
        g.add_node(Node::new("b", "aws_instance.b")).unwrap();
        g.add_edge(
            Edge::new("e", "a", "b").with_canonicals(["aws_security_group.sg", "im_out.tcp/22->22"]),
        )
        .unwrap();

        let mut configs = Configs::new();
        configs.insert(NodeId::from("a"), attrs(json!({"id": "i-a"})));
        configs.insert(NodeId::from("b"), attrs(json!({"id": "i-b"})));
        configs.insert(NodeId::from("sg"), attrs(json!({"id": "sg-1"})));

        let ids: HashMap<String, NodeId> = [
            ("aws_instance.a".to_string(), NodeId::from("a")),
            ("aws_instance.b".to_string(), NodeId::from("b")),
            ("aws_security_group.sg".to_string(), NodeId::from("sg")),
        ]
        .into_iter()
        .collect();

        let mut registry = Registry::new();
        registry.register(
            "aws",
            CatalogProvider::new(ProviderCatalog {
                name: "aws".into(),
                nodes: vec!["aws_instance".into()],
                edges: vec!["aws_security_group".into()],
                ..ProviderCatalog::default()
            }),
        );
        let classify = Resolver::new(&registry, false);
        let d = build_description(&g, &configs, &ids, &classify).unwrap();

        assert_eq!(
            d,
            json!({"resource": {
                "aws_instance": {"a": {"id": "i-a"}, "b": {"id": "i-b"}},
                "aws_security_group": {"sg": {"id": "sg-1"}}
            }})
        );
    }

    #[test]
    fn missing_node_config_is_invalid() {
        let registry = Registry::new();
        let res = Resolver::new(&registry, true);
        let mut g = Graph::new();
        g.add_node(Node::new("a", "aws_instance.a")).unwrap();

        let err = build_description(&g, &Configs::new(), &HashMap::new(), &res).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidDescription(_)));
    }

    #[test]
    fn unknown_edge_canonical_is_invalid() {
        let registry = Registry::new();
        let res = Resolver::new(&registry, true);
        let mut g = Graph::new();
        g.add_node(Node::new("a", "aws_instance.a")).unwrap();
        g.add_node(Node::new("b", "aws_instance.b")).unwrap();
        g.add_edge(Edge::new("e", "a", "b").with_canonicals(["aws_security_group.gone"]))
            .unwrap();
        let mut configs = Configs::new();
        configs.insert(NodeId::from("a"), Map::new());
        configs.insert(NodeId::from("b"), Map::new());

        let err = build_description(&g, &configs, &HashMap::new(), &res).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidDescription(_)));
    }
}
