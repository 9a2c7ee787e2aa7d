//! In-memory directed multigraph of typed nodes and typed edges, backed by
//! `petgraph`, following the id-indexed lookup idiom of
//! `codegraph_prep::model::neighbors` (`id2idx: HashMap<String, NodeIndex>`
//! alongside a plain `petgraph::Graph`).

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use review_model::{EdgeType, GraphEdge, GraphNode};

/// Head-only snapshot of the repository graph. Built once per review and
/// discarded; read-only after `add_edge` calls stop.
#[derive(Default)]
pub struct GraphStore {
    graph: DiGraph<GraphNode, GraphEdge>,
    index_by_id: HashMap<String, NodeIndex>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node. If a node with this ID already exists it is left
    /// untouched (builders are expected to insert each node exactly once).
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.index_by_id.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index_by_id.insert(id, idx);
        idx
    }

    /// Inserts an edge only if both endpoints already exist as nodes;
    /// otherwise it is silently dropped (spec invariant: edge soundness).
    pub fn add_edge(&mut self, edge: GraphEdge) {
        let (Some(&src), Some(&dst)) = (
            self.index_by_id.get(&edge.src_id),
            self.index_by_id.get(&edge.dst_id),
        ) else {
            tracing::debug!(
                src = %edge.src_id,
                dst = %edge.dst_id,
                "repo-graph: dropping edge with missing endpoint"
            );
            return;
        };
        self.graph.add_edge(src, dst, edge);
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_by_id.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.id.as_str())
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Outgoing neighbours of `id` on edge type `edge_type`, in insertion
    /// (petgraph iteration) order.
    pub fn out_neighbors(&self, id: &str, edge_type: EdgeType) -> Vec<&GraphNode> {
        let Some(&idx) = self.index_by_id.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().edge_type == edge_type)
            .map(|e| &self.graph[e.target()])
            .collect()
    }

    /// Incoming neighbours of `id` on edge type `edge_type`.
    pub fn in_neighbors(&self, id: &str, edge_type: EdgeType) -> Vec<&GraphNode> {
        let Some(&idx) = self.index_by_id.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().edge_type == edge_type)
            .map(|e| &self.graph[e.source()])
            .collect()
    }

    /// Total incoming edge count regardless of type — used for the
    /// retrieval "hotspot" bonus.
    pub fn in_degree(&self, id: &str) -> usize {
        let Some(&idx) = self.index_by_id.get(id) else {
            return 0;
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_model::{NodeExtra, SymbolKind};

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind: SymbolKind::Function,
            file_path: "f.py".into(),
            symbol_name: id.to_string(),
            extra: NodeExtra::default(),
        }
    }

    #[test]
    fn edge_dropped_when_endpoint_missing() {
        let mut store = GraphStore::new();
        store.add_node(node("a"));
        store.add_edge(GraphEdge {
            src_id: "a".into(),
            dst_id: "missing".into(),
            edge_type: EdgeType::Calls,
            extra: None,
        });
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn out_and_in_neighbors_match() {
        let mut store = GraphStore::new();
        store.add_node(node("a"));
        store.add_node(node("b"));
        store.add_edge(GraphEdge {
            src_id: "a".into(),
            dst_id: "b".into(),
            edge_type: EdgeType::Calls,
            extra: None,
        });
        assert_eq!(store.out_neighbors("a", EdgeType::Calls)[0].id, "b");
        assert_eq!(store.in_neighbors("b", EdgeType::Calls)[0].id, "a");
        assert_eq!(store.in_degree("b"), 1);
    }
}
