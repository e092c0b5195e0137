//! Hand-off to `petgraph` for renderers and summary statistics.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};

use super::Graph;

impl Graph {
    /// Copy the graph into a [`DiGraph`].
    ///
    /// Node weights are canonicals, edge weights the canonicals absorbed into
    /// each edge. Node and edge order follow insertion order.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<String, Vec<String>> {
        let mut out = DiGraph::with_capacity(self.node_count(), self.edge_count());
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.node_count());

        for node in self.nodes() {
            let idx = out.add_node(node.canonical.clone());
            index.insert(node.id.as_str(), idx);
        }
        for edge in self.edges() {
            if let (Some(&s), Some(&t)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) {
                out.add_edge(s, t, edge.canonicals.clone());
            }
        }
        out
    }

    /// Number of weakly connected components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        connected_components(&self.to_petgraph())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{Edge, Graph, Node};

    #[test]
    fn export_keeps_labels_and_direction() {
        let mut g = Graph::new();
        g.add_node(Node::new("1", "aws_instance.a")).unwrap();
        g.add_node(Node::new("2", "aws_instance.b")).unwrap();
        g.add_node(Node::new("3", "aws_instance.c")).unwrap();
        g.add_edge(Edge::new("e", "2", "1").with_canonicals(["aws_security_group.sg"]))
            .unwrap();

        let pg = g.to_petgraph();
        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 1);

        let e = pg.edge_indices().next().unwrap();
        let (s, t) = pg.edge_endpoints(e).unwrap();
        assert_eq!(pg[s], "aws_instance.b");
        assert_eq!(pg[t], "aws_instance.a");
        assert_eq!(pg[e], vec!["aws_security_group.sg".to_string()]);

        assert_eq!(g.component_count(), 2);
    }

    #[test]
    fn empty_graph_has_no_components() {
        assert_eq!(Graph::new().component_count(), 0);
    }
}
