use serde::{Deserialize, Serialize};

use super::{EdgeId, NodeId};

/// A directed relationship between two nodes: `source` reaches `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,

    /// Canonicals of every node or edge absorbed to produce this edge,
    /// deduplicated in insertion order. Empty for never-contracted edges.
    #[serde(default)]
    pub canonicals: Vec<String>,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            canonicals: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_canonicals<I, S>(mut self, canonicals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_canonicals(canonicals);
        self
    }

    /// Append canonicals, ignoring ones already recorded.
    pub fn add_canonicals<I, S>(&mut self, canonicals: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for c in canonicals {
            let c = c.into();
            if !self.canonicals.contains(&c) {
                self.canonicals.push(c);
            }
        }
    }

    /// The endpoint opposite to `node`, or `None` if `node` is not an endpoint.
    #[must_use]
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source == node {
            Some(&self.target)
        } else if &self.target == node {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Swap the endpoint `from` for `to`. Returns false if `from` is not an
    /// endpoint.
    pub(crate) fn rewire(&mut self, from: &NodeId, to: &NodeId) -> bool {
        if &self.source == from {
            self.source = to.clone();
            true
        } else if &self.target == from {
            self.target = to.clone();
            true
        } else {
            false
        }
    }
}
