//! The authoritative node/edge store.
//!
//! # Indices
//!
//! Besides the insertion-ordered node and edge lists the store keeps four
//! lookup indices, all updated inside the mutating operation that touches
//! them:
//!
//! ```text
//! canonical      -> NodeId
//! NodeId         -> [EdgeId]     (incident edges, insertion order)
//! (source,target)-> EdgeId       (direction index)
//! EdgeId         -> Edge
//! ```
//!
//! # Invariants
//!
//! - Node canonicals and node ids are unique; edge ids are unique.
//! - Both endpoints of every edge exist and differ.
//! - At most one edge joins any unordered pair of nodes. Operations that
//!   would create a parallel edge merge its canonicals into the existing one.
//! - Removing a node removes every edge touching it.

use std::collections::HashMap;

use serde::Serialize;
use serde::ser::Serializer;

use super::{Edge, EdgeId, Node, NodeId};
use crate::error::GraphError;

/// Node/edge collection with denormalized lookup indices.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,
    canonicals: HashMap<String, NodeId>,

    edges: HashMap<EdgeId, Edge>,
    edge_order: Vec<EdgeId>,

    /// node id -> incident edge ids, as source or target.
    incident: HashMap<NodeId, Vec<EdgeId>>,
    /// (source, target) -> edge id.
    directed: HashMap<(NodeId, NodeId), EdgeId>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    /// Add a node.
    ///
    /// # Errors
    ///
    /// Fails if the canonical or id is empty or already used.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if node.canonical.is_empty() {
            return Err(GraphError::RequiredNodeCanonical);
        }
        if node.id.is_empty() {
            return Err(GraphError::RequiredNodeId);
        }
        if self.canonicals.contains_key(&node.canonical) {
            return Err(GraphError::NodeExists(node.canonical));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::NodeIdExists(node.id));
        }

        self.canonicals.insert(node.canonical.clone(), node.id.clone());
        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Add an edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Fails if a field is empty, an endpoint is unknown, both endpoints are
    /// the same node, the id is taken, or the two nodes are already joined
    /// (in either direction).
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if edge.id.is_empty() {
            return Err(GraphError::RequiredEdgeId);
        }
        if edge.target.is_empty() {
            return Err(GraphError::RequiredEdgeTarget);
        }
        if edge.source.is_empty() {
            return Err(GraphError::RequiredEdgeSource);
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::EdgeTargetNotFound(edge.target));
        }
        if !self.nodes.contains_key(&edge.source) {
            return Err(GraphError::EdgeSourceNotFound(edge.source));
        }
        if edge.source == edge.target {
            return Err(GraphError::SelfLoop(edge.id, edge.source));
        }
        if self.edge_between(&edge.source, &edge.target).is_some() {
            return Err(GraphError::EdgeExists {
                from: edge.source,
                to: edge.target,
            });
        }
        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::EdgeIdExists(edge.id));
        }

        self.directed
            .insert((edge.source.clone(), edge.target.clone()), edge.id.clone());
        self.incident
            .entry(edge.source.clone())
            .or_default()
            .push(edge.id.clone());
        self.incident
            .entry(edge.target.clone())
            .or_default()
            .push(edge.id.clone());
        self.edge_order.push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no node has this id.
    pub fn node(&self, id: &NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no node has this canonical.
    pub fn node_by_canonical(&self, canonical: &str) -> Result<&Node, GraphError> {
        self.canonicals
            .get(canonical)
            .and_then(|id| self.nodes.get(id))
            .ok_or_else(|| GraphError::NodeNotFound(canonical.to_string()))
    }

    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if no edge has this id.
    pub fn edge(&self, id: &EdgeId) -> Result<&Edge, GraphError> {
        self.edges
            .get(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// The edge joining `a` and `b`, whichever way it points.
    #[must_use]
    pub fn edge_between(&self, a: &NodeId, b: &NodeId) -> Option<&Edge> {
        self.directed
            .get(&(a.clone(), b.clone()))
            .or_else(|| self.directed.get(&(b.clone(), a.clone())))
            .and_then(|id| self.edges.get(id))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Edges touching `id` as source or target, in insertion order.
    pub fn edges_for_node<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.incident
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|eid| self.edges.get(eid))
    }

    /// Snapshot of the incident edge ids of `id`, safe to hold across
    /// mutations.
    #[must_use]
    pub fn edge_ids_for_node(&self, id: &NodeId) -> Vec<EdgeId> {
        self.incident.get(id).cloned().unwrap_or_default()
    }

    /// Number of edges incident to `id`.
    #[must_use]
    pub fn degree(&self, id: &NodeId) -> usize {
        self.incident.get(id).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Remove every node without incident edges. Returns how many were removed.
    pub fn clean(&mut self) -> usize {
        let lonely: Vec<NodeId> = self
            .node_order
            .iter()
            .filter(|id| self.degree(id) == 0)
            .cloned()
            .collect();

        for id in &lonely {
            self.detach_node(id);
        }
        lonely.len()
    }

    /// Remove a node and every edge touching it.
    ///
    /// When a removed edge's endpoints are still joined by another edge, its
    /// canonicals are merged into that edge.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no node has this id.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }
        let incident = self.incident.remove(id).unwrap_or_default();
        for eid in &incident {
            self.remove_edge(eid);
        }
        self.detach_node(id);
        Ok(())
    }

    /// Swap the source and target of an edge in place.
    ///
    /// # Errors
    ///
    /// [`GraphError::EdgeNotFound`] if no edge has this id.
    pub fn invert_edge(&mut self, id: &EdgeId) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get_mut(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))?;

        let old_key = (edge.source.clone(), edge.target.clone());
        std::mem::swap(&mut edge.source, &mut edge.target);
        let new_key = (edge.source.clone(), edge.target.clone());

        if self.directed.get(&old_key) == Some(id) {
            self.directed.remove(&old_key);
        }
        self.directed.insert(new_key, id.clone());
        Ok(())
    }

    /// Add group memberships to a node.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no node has this id.
    pub fn add_group_ids<I, S>(&mut self, id: &NodeId, group_ids: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.add_group_ids(group_ids);
        Ok(())
    }

    /// Merge node `src` into node `rep`.
    ///
    /// The two nodes must share exactly one edge (the mutual edge). `rep`'s
    /// weight moves by −1 when the mutual edge points `src → rep` and by +1
    /// when it points `rep → src`. Every other edge of `src` is rewired to
    /// `rep` and inherits the mutual edge's canonicals plus `src`'s own
    /// canonical; a rewired edge that would duplicate an existing `rep` edge
    /// is folded into it instead. Finally `src` and the mutual edge are
    /// removed.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if either node is missing,
    /// [`GraphError::NoMutualEdge`] if they are not directly connected.
    pub fn replace(&mut self, src: &NodeId, rep: &NodeId) -> Result<(), GraphError> {
        let src_canonical = self.node(src)?.canonical.clone();
        self.node(rep)?;

        let src_edges = self.edge_ids_for_node(src);
        let (mutual, delta) = src_edges
            .iter()
            .find_map(|eid| {
                let e = self.edges.get(eid)?;
                if &e.source == src && &e.target == rep {
                    Some((eid.clone(), -1))
                } else if &e.source == rep && &e.target == src {
                    Some((eid.clone(), 1))
                } else {
                    None
                }
            })
            .ok_or_else(|| GraphError::NoMutualEdge {
                src: src.clone(),
                rep: rep.clone(),
            })?;

        if let Some(node) = self.nodes.get_mut(rep) {
            node.weight += delta;
        }

        let mut inherited = self
            .edges
            .get(&mutual)
            .map(|e| e.canonicals.clone())
            .unwrap_or_default();
        inherited.push(src_canonical);

        for eid in src_edges.iter().filter(|eid| **eid != mutual) {
            let Some(edge) = self.edges.get_mut(eid) else {
                continue;
            };
            let old_key = (edge.source.clone(), edge.target.clone());
            edge.rewire(src, rep);
            edge.add_canonicals(inherited.iter().cloned());
            let (new_source, new_target) = (edge.source.clone(), edge.target.clone());

            if self.directed.get(&old_key) == Some(eid) {
                self.directed.remove(&old_key);
            }
            if let Some(list) = self.incident.get_mut(src) {
                list.retain(|e| e != eid);
            }

            if self.edge_between(&new_source, &new_target).is_some() {
                // Parallel edge: removal folds its canonicals into the survivor.
                self.remove_edge(eid);
            } else {
                self.directed.insert((new_source, new_target), eid.clone());
                self.incident.entry(rep.clone()).or_default().push(eid.clone());
            }
        }

        self.remove_node(src)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Drop a node from the node indices only. Edges must already be gone.
    fn detach_node(&mut self, id: &NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            self.canonicals.remove(&node.canonical);
        }
        self.incident.remove(id);
        self.node_order.retain(|n| n != id);
    }

    /// Remove one edge from every index, merging its canonicals into another
    /// edge between the same endpoints if one exists.
    fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        self.edge_order.retain(|e| e != id);

        let key = (edge.source.clone(), edge.target.clone());
        if self.directed.get(&key) == Some(id) {
            self.directed.remove(&key);
        }
        for endpoint in [&edge.source, &edge.target] {
            if let Some(list) = self.incident.get_mut(endpoint) {
                list.retain(|e| e != id);
            }
        }

        let survivor = self
            .directed
            .get(&key)
            .or_else(|| self.directed.get(&(key.1.clone(), key.0.clone())))
            .cloned();
        if let Some(survivor) = survivor.and_then(|sid| self.edges.get_mut(&sid)) {
            survivor.add_canonicals(edge.canonicals.iter().cloned());
        }
        Some(edge)
    }
}

/// Serializes as `{"nodes": [...], "edges": [...]}` in insertion order.
impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            nodes: Vec<&'a Node>,
            edges: Vec<&'a Edge>,
        }

        View {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        }
        .serialize(serializer)
    }
}
