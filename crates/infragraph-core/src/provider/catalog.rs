//! Data-driven provider loaded from a catalog description.
//!
//! # Overview
//!
//! A [`ProviderCatalog`] lists a vendor's node and edge resource types and
//! the attributes that say which way traffic flows through each edge type.
//! It is normally read from the `[[providers]]` tables of `infragraph.toml`:
//!
//! ```toml
//! [[providers]]
//! name = "aws"
//! nodes = ["aws_instance", "aws_lb", "aws_db_instance"]
//! edges = ["aws_security_group", "aws_security_group_rule"]
//!
//! [[providers.directions]]
//! type = "aws_security_group"
//! ingress = ["ingress.security_groups"]
//! egress = ["egress.security_groups"]
//!
//! [[providers.open_world]]
//! type = "aws_security_group"
//! rules = "ingress"
//! ```
//!
//! # Attribute paths
//!
//! Paths are dot separated. Arrays met along the way are flattened, and
//! only string leaves are collected, so `ingress.security_groups` reads every
//! security group of every ingress block.
//!
//! # References by name
//!
//! Some resources point at their peers by name instead of id
//! (`virtual_network_name` on an Azure peering). Paths listed under
//! `ingress_by_name`/`egress_by_name` are looked up against the `name`
//! attribute of every other resource, and the first match contributes its
//! `id`. Names without a match are dropped.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attributes, Configs, InOut, Provider, ProviderKind};
use crate::graph::NodeId;

// ---------------------------------------------------------------------------
// Catalog description
// ---------------------------------------------------------------------------

/// Description of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCatalog {
    /// Canonical prefix owned by the provider (`aws` for `aws_lb.front`).
    pub name: String,
    /// Resource types kept as real nodes.
    pub nodes: Vec<String>,
    /// Resource types contracted into edges.
    pub edges: Vec<String>,
    /// Extra attribute names the provider needs besides those in rules.
    pub used_attributes: Vec<String>,
    pub directions: Vec<DirectionRule>,
    pub open_world: Vec<OpenWorldRule>,
    pub tags: Vec<TagRule>,
}

/// Which attributes of an edge resource reference its inbound and outbound
/// peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionRule {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Apply the rule only when this condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    #[serde(default)]
    pub ingress: Vec<String>,
    #[serde(default)]
    pub egress: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress_by_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress_by_name: Vec<String>,
}

/// String equality test on a top-level attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub equals: String,
}

impl Condition {
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        attributes.get(&self.attribute).and_then(Value::as_str) == Some(self.equals.as_str())
    }
}

/// Rule blocks open to the whole world produce an external node per
/// protocol/port signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWorldRule {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Path to the rule blocks; empty means the resource itself.
    #[serde(default)]
    pub rules: String,
    #[serde(default = "default_cidr")]
    pub cidr: String,
    #[serde(default = "default_world")]
    pub world: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_from_port")]
    pub from_port: String,
    #[serde(default = "default_to_port")]
    pub to_port: String,
    /// Resource type of the synthesized node.
    #[serde(default = "default_external_type")]
    pub external_type: String,
}

/// Firewalls that select their peers through network tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    /// Firewall resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default = "default_tags")]
    pub tags: String,
    #[serde(default = "default_source_tags")]
    pub source_tags: String,
    #[serde(default = "default_target_tags")]
    pub target_tags: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Value of `direction` marking an ingress firewall; anything else is
    /// egress.
    #[serde(default = "default_ingress_value")]
    pub ingress_value: String,
}

fn default_cidr() -> String {
    "cidr_blocks".to_string()
}

fn default_world() -> String {
    "0.0.0.0/0".to_string()
}

fn default_protocol() -> String {
    "protocol".to_string()
}

fn default_from_port() -> String {
    "from_port".to_string()
}

fn default_to_port() -> String {
    "to_port".to_string()
}

fn default_external_type() -> String {
    "im_out".to_string()
}

fn default_tags() -> String {
    "tags".to_string()
}

fn default_source_tags() -> String {
    "source_tags".to_string()
}

fn default_target_tags() -> String {
    "target_tags".to_string()
}

fn default_direction() -> String {
    "direction".to_string()
}

fn default_ingress_value() -> String {
    "INGRESS".to_string()
}

// ---------------------------------------------------------------------------
// Attribute paths
// ---------------------------------------------------------------------------

/// Visit every value at `path` below `value`, flattening arrays.
fn walk<'v>(value: &'v Value, path: &[&str], visit: &mut impl FnMut(&'v Value)) {
    if let Value::Array(items) = value {
        for item in items {
            walk(item, path, visit);
        }
        return;
    }
    match path.split_first() {
        None => visit(value),
        Some((head, rest)) => {
            if let Some(next) = value.get(*head) {
                walk(next, rest, visit);
            }
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// String leaves at `path` in `attributes`.
#[must_use]
pub(crate) fn strings_at(attributes: &Attributes, path: &str) -> Vec<String> {
    let segs = segments(path);
    let Some((head, rest)) = segs.split_first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if let Some(value) = attributes.get(*head) {
        walk(value, rest, &mut |v| {
            if let Some(s) = v.as_str() {
                out.push(s.to_string());
            }
        });
    }
    out
}

/// Objects at `path` in `attributes`; the attributes themselves for an
/// empty path.
fn objects_at<'a>(attributes: &'a Attributes, path: &str) -> Vec<&'a Attributes> {
    let segs = segments(path);
    let Some((head, rest)) = segs.split_first() else {
        return vec![attributes];
    };
    let mut out = Vec::new();
    if let Some(value) = attributes.get(*head) {
        walk(value, rest, &mut |v| {
            if let Some(obj) = v.as_object() {
                out.push(obj);
            }
        });
    }
    out
}

/// Provider id of the first resource other than `id` whose `name` is `name`.
fn id_by_name<'c>(configs: &'c Configs, id: &NodeId, name: &str) -> Option<&'c str> {
    configs
        .iter()
        .filter(|(other, _)| *other != id)
        .find(|(_, cfg)| cfg.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|(_, cfg)| cfg.get("id"))
        .and_then(Value::as_str)
}

fn top_level(path: &str) -> String {
    path.split('.').next().unwrap_or_default().to_string()
}

fn label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "*".to_string(),
    }
}

// ---------------------------------------------------------------------------
// CatalogProvider
// ---------------------------------------------------------------------------

/// [`Provider`] backed by a [`ProviderCatalog`].
#[derive(Debug, Clone)]
pub struct CatalogProvider {
    catalog: ProviderCatalog,
    nodes: HashSet<String>,
    edges: HashSet<String>,
}

impl CatalogProvider {
    #[must_use]
    pub fn new(catalog: ProviderCatalog) -> Self {
        let nodes = catalog.nodes.iter().cloned().collect();
        let edges = catalog.edges.iter().cloned().collect();
        Self {
            catalog,
            nodes,
            edges,
        }
    }

    fn open_world_nodes(&self, resource_type: &str, attributes: &Attributes, out: &mut Vec<String>) {
        for rule in self
            .catalog
            .open_world
            .iter()
            .filter(|r| r.resource_type == resource_type)
        {
            for block in objects_at(attributes, &rule.rules) {
                if !strings_at(block, &rule.cidr).contains(&rule.world) {
                    continue;
                }
                let canonical = format!(
                    "{}.{}/{}->{}",
                    rule.external_type,
                    label(block.get(&rule.protocol)),
                    label(block.get(&rule.from_port)),
                    label(block.get(&rule.to_port)),
                );
                if !out.contains(&canonical) {
                    out.push(canonical);
                }
            }
        }
    }

    fn tag_in_out(
        &self,
        id: &NodeId,
        rule: &TagRule,
        attributes: &Attributes,
        configs: &Configs,
        io: &mut InOut,
    ) {
        let Some(direction) = attributes.get(&rule.direction).and_then(Value::as_str) else {
            return;
        };
        let (tag_ins, tag_outs) = if direction == rule.ingress_value {
            (
                strings_at(attributes, &rule.source_tags),
                strings_at(attributes, &rule.target_tags),
            )
        } else {
            (strings_at(attributes, &rule.target_tags), Vec::new())
        };

        for (other, cfg) in configs.iter().filter(|(other, _)| *other != id) {
            let Some(provider_id) = cfg.get("id").and_then(Value::as_str) else {
                tracing::trace!(node = %other, "tagged resource without id skipped");
                continue;
            };
            let tags = strings_at(cfg, &rule.tags);
            if tag_ins.iter().any(|t| tags.contains(t)) {
                io.ins.push(provider_id.to_string());
            }
            if tag_outs.iter().any(|t| tags.contains(t)) {
                io.outs.push(provider_id.to_string());
            }
        }
    }
}

impl Provider for CatalogProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Catalog(self.catalog.name.clone())
    }

    fn is_node(&self, resource_type: &str) -> bool {
        self.nodes.contains(resource_type)
    }

    fn is_edge(&self, resource_type: &str) -> bool {
        self.edges.contains(resource_type)
    }

    fn resource_in_out_nodes(&self, id: &NodeId, resource_type: &str, configs: &Configs) -> InOut {
        let mut io = InOut::default();
        let Some(attributes) = configs.get(id) else {
            return io;
        };

        for rule in self
            .catalog
            .directions
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .filter(|r| r.when.as_ref().is_none_or(|c| c.matches(attributes)))
        {
            for path in &rule.ingress {
                io.ins.extend(strings_at(attributes, path));
            }
            for path in &rule.egress {
                io.outs.extend(strings_at(attributes, path));
            }
            for (paths, refs) in [(&rule.ingress_by_name, &mut io.ins), (&rule.egress_by_name, &mut io.outs)] {
                for name in paths.iter().flat_map(|p| strings_at(attributes, p)) {
                    match id_by_name(configs, id, &name) {
                        Some(provider_id) => refs.push(provider_id.to_string()),
                        None => tracing::debug!(node = %id, %name, "no resource with this name"),
                    }
                }
            }
        }

        for rule in self
            .catalog
            .tags
            .iter()
            .filter(|r| r.resource_type == resource_type)
        {
            self.tag_in_out(id, rule, attributes, configs, &mut io);
        }

        self.open_world_nodes(resource_type, attributes, &mut io.nodes);
        io
    }

    fn used_attributes(&self) -> Vec<String> {
        let mut out: BTreeSet<String> = self.catalog.used_attributes.iter().cloned().collect();
        out.insert("id".to_string());
        for rule in &self.catalog.directions {
            out.extend(rule.ingress.iter().chain(&rule.egress).map(|p| top_level(p)));
            if !rule.ingress_by_name.is_empty() || !rule.egress_by_name.is_empty() {
                out.insert("name".to_string());
                out.extend(
                    rule.ingress_by_name
                        .iter()
                        .chain(&rule.egress_by_name)
                        .map(|p| top_level(p)),
                );
            }
            if let Some(cond) = &rule.when {
                out.insert(cond.attribute.clone());
            }
        }
        for rule in &self.catalog.open_world {
            if rule.rules.is_empty() {
                out.extend([top_level(&rule.cidr), rule.protocol.clone(), rule.from_port.clone(), rule.to_port.clone()]);
            } else {
                out.insert(top_level(&rule.rules));
            }
        }
        for rule in &self.catalog.tags {
            out.extend([
                top_level(&rule.tags),
                top_level(&rule.source_tags),
                top_level(&rule.target_tags),
                rule.direction.clone(),
            ]);
        }
        out.into_iter().filter(|a| !a.is_empty()).collect()
    }

    /// Tagged resources get an edge towards every firewall selecting one of
    /// their tags.
    fn pre_process(&self, configs: &Configs) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for rule in &self.catalog.tags {
            let firewalls: Vec<(&NodeId, Vec<String>)> = configs
                .iter()
                .map(|(id, cfg)| {
                    let mut selected = strings_at(cfg, &rule.source_tags);
                    selected.extend(strings_at(cfg, &rule.target_tags));
                    (id, selected)
                })
                .filter(|(_, selected)| !selected.is_empty())
                .collect();

            for (id, cfg) in configs.iter() {
                let tags = strings_at(cfg, &rule.tags);
                if tags.is_empty() {
                    continue;
                }
                for (fw, selected) in &firewalls {
                    if *fw != id && selected.iter().any(|t| tags.contains(t)) {
                        edges.push((id.clone(), (*fw).clone()));
                    }
                }
            }
        }
        edges
    }
}
