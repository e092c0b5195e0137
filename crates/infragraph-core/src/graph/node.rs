use serde::{Deserialize, Serialize};

use super::NodeId;

/// One infrastructure resource in the graph.
///
/// Real nodes survive contraction; pass-through nodes are merged away by it.
/// The store only hands out shared references, so `weight` and `group_ids`
/// change exclusively through [`super::Graph`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    /// `<resource_type>.<resource_name>`, unique within a graph.
    pub canonical: String,

    /// The provider's own identifier, absent for synthetic nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Sum of the directions of every contraction absorbed into this node.
    #[serde(default)]
    pub weight: i64,

    /// Cluster/group memberships, deduplicated in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_ids: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, canonical: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            canonical: canonical.into(),
            external_id: None,
            weight: 0,
            group_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Add group memberships, ignoring ones already present.
    pub fn add_group_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.group_ids.contains(&id) {
                self.group_ids.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ids_are_deduplicated_in_order() {
        let mut n = Node::new("1", "aws_instance.web");
        n.add_group_ids(["b", "a"]);
        n.add_group_ids(["a", "c", "b"]);
        assert_eq!(n.group_ids, vec!["b", "a", "c"]);
    }
}
