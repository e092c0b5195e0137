//! Provider capability model.
//!
//! A provider knows, for the resource types it owns, which are real nodes,
//! which are connectivity edges, and how an edge resource's attributes
//! describe traffic direction. The core never hard-codes a vendor schema:
//! concrete knowledge arrives through [`CatalogProvider`] descriptions.
//!
//! ```text
//! canonical "module.net.aws_lb.front"
//!        ↓  resource_type()            "aws_lb"
//!        ↓  prefix()                   "aws"
//!        ↓  Registry::get("aws")       &dyn Provider
//!        ↓  Resolver::kind()           ResourceKind::Node
//! ```

mod catalog;
mod external;
mod raw;
mod registry;

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::graph::NodeId;

pub use catalog::{CatalogProvider, Condition, DirectionRule, OpenWorldRule, ProviderCatalog, TagRule};
pub use external::{EXTERNAL_PREFIX, ExternalProvider};
pub use raw::RawProvider;
pub use registry::{Registry, ResourceKind, Resolver, prefix, resource_type};

/// Attribute map of one resource, as found in the input description.
pub type Attributes = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Configs
// ---------------------------------------------------------------------------

/// Resource attributes keyed by node id, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Configs {
    order: Vec<NodeId>,
    by_id: HashMap<NodeId, Attributes>,
}

impl Configs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the attributes for `id`. Returns the previous
    /// value, if any.
    pub fn insert(&mut self, id: NodeId, attributes: Attributes) -> Option<Attributes> {
        let previous = self.by_id.insert(id.clone(), attributes);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&Attributes> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Attributes)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|attrs| (id, attrs)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Which family a provider belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Everything is a node; used when no vendor provider applies.
    Raw,
    /// Synthetic external endpoints such as the open internet.
    External,
    /// Data-driven provider loaded from a catalog description.
    Catalog(String),
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::External => f.write_str("im"),
            Self::Catalog(name) => f.write_str(name),
        }
    }
}

/// Direction hints for one pass-through resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InOut {
    /// References whose traffic flows into the resource.
    pub ins: Vec<String>,
    /// References the resource's traffic flows out to.
    pub outs: Vec<String>,
    /// Canonicals of synthetic external nodes to attach.
    pub nodes: Vec<String>,
}

/// Capability set of one provider.
///
/// Every method except [`Provider::kind`] has a no-op default, so a provider
/// only overrides what it actually knows.
pub trait Provider: Send + Sync + fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// True if resources of this type survive as graph vertices.
    fn is_node(&self, _resource_type: &str) -> bool {
        false
    }

    /// True if resources of this type are connectivity policy, contracted
    /// away into edges.
    fn is_edge(&self, _resource_type: &str) -> bool {
        false
    }

    /// Direction hints for the resource `id` of type `resource_type`.
    ///
    /// References in `ins`/`outs` are either raw provider identifiers or
    /// `${type.name.attr}` interpolations.
    fn resource_in_out_nodes(
        &self,
        _id: &NodeId,
        _resource_type: &str,
        _configs: &Configs,
    ) -> InOut {
        InOut::default()
    }

    /// Attribute names this provider reads.
    fn used_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Extra `(source, target)` edges derived from the whole description.
    fn pre_process(&self, _configs: &Configs) -> Vec<(NodeId, NodeId)> {
        Vec::new()
    }
}
