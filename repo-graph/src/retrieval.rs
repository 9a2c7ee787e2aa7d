//! Graph-guided context retrieval: scored bounded BFS from seed nodes,
//! restating `retrieval.py::RelevantContextFinder.find`.

use std::collections::{HashMap, HashSet, VecDeque};

use review_model::{EdgeType, SymbolKind};

use crate::store::GraphStore;

const SEED_BONUS: f64 = 2.0;
const TEST_BONUS: f64 = 0.5;
const HOTSPOT_BONUS: f64 = 0.3;
const HOTSPOT_IN_DEGREE_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    pub depth_calls: usize,
    pub depth_imports: usize,
    pub depth_tests: usize,
    pub max_nodes_per_unit: usize,
    pub weight_calls: f64,
    pub weight_imports: f64,
    pub weight_inherits: f64,
    pub weight_tests: f64,
    pub weight_uses_config: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            depth_calls: 2,
            depth_imports: 1,
            depth_tests: 1,
            max_nodes_per_unit: 30,
            weight_calls: 1.0,
            weight_imports: 0.8,
            weight_inherits: 0.7,
            weight_tests: 1.5,
            weight_uses_config: 0.5,
        }
    }
}

impl RetrievalConfig {
    fn depth_limit(&self, edge_type: EdgeType) -> usize {
        match edge_type {
            EdgeType::Calls | EdgeType::Inherits => self.depth_calls,
            EdgeType::Imports | EdgeType::UsesConfig => self.depth_imports,
            EdgeType::Tests => self.depth_tests,
        }
    }

    fn weight(&self, edge_type: EdgeType) -> f64 {
        match edge_type {
            EdgeType::Calls => self.weight_calls,
            EdgeType::Imports => self.weight_imports,
            EdgeType::Inherits => self.weight_inherits,
            EdgeType::Tests => self.weight_tests,
            EdgeType::UsesConfig => self.weight_uses_config,
        }
    }
}

/// Runs the scored bounded BFS from `seeds` and returns node IDs sorted by
/// descending score, truncated to `max_nodes_per_unit`. Ties keep insertion
/// (first-discovery) order — stable sort.
pub fn find(store: &GraphStore, seeds: &[String], config: &RetrievalConfig) -> Vec<String> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for seed in seeds {
        if seen.insert(seed.clone()) {
            order.push(seed.clone());
            scores.insert(seed.clone(), SEED_BONUS);
            queue.push_back((seed.clone(), 0));
        }
    }

    while let Some((node_id, depth)) = queue.pop_front() {
        for edge_type in EdgeType::ALL {
            if depth >= config.depth_limit(edge_type) {
                continue;
            }
            let weight = config.weight(edge_type);
            let contribution = weight / (depth + 1) as f64;

            let mut neighbors = store.out_neighbors(&node_id, edge_type);
            neighbors.extend(store.in_neighbors(&node_id, edge_type));

            for neighbor in neighbors {
                let id = neighbor.id.clone();
                *scores.entry(id.clone()).or_insert(0.0) += contribution;
                if seen.insert(id.clone()) {
                    order.push(id.clone());
                    queue.push_back((id, depth + 1));
                }
            }
        }
    }

    let mut ranked: Vec<(String, f64)> = order
        .into_iter()
        .map(|id| {
            let mut score = *scores.get(&id).unwrap_or(&0.0);
            if let Some(node) = store.node(&id) {
                if node.kind == SymbolKind::Test || node.extra.is_test_file {
                    score += TEST_BONUS;
                }
                if store.in_degree(&id) > HOTSPOT_IN_DEGREE_THRESHOLD {
                    score += HOTSPOT_BONUS;
                }
            }
            (id, score)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
        .into_iter()
        .take(config.max_nodes_per_unit)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_model::{GraphEdge, GraphNode, NodeExtra};

    fn node(id: &str, kind: SymbolKind) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind,
            file_path: "f.py".into(),
            symbol_name: id.to_string(),
            extra: NodeExtra::default(),
        }
    }

    #[test]
    fn respects_max_nodes_budget() {
        let mut store = GraphStore::new();
        store.add_node(node("seed", SymbolKind::Function));
        for i in 0..50 {
            let id = format!("callee{i}");
            store.add_node(node(&id, SymbolKind::Function));
            store.add_edge(GraphEdge {
                src_id: "seed".into(),
                dst_id: id,
                edge_type: EdgeType::Calls,
                extra: None,
            });
        }
        let config = RetrievalConfig {
            max_nodes_per_unit: 10,
            ..Default::default()
        };
        let found = find(&store, &["seed".to_string()], &config);
        assert!(found.len() <= 10);
    }

    #[test]
    fn seed_is_included_and_ranks_highest_alone() {
        let mut store = GraphStore::new();
        store.add_node(node("seed", SymbolKind::Function));
        let found = find(&store, &["seed".to_string()], &RetrievalConfig::default());
        assert_eq!(found, vec!["seed".to_string()]);
    }

    #[test]
    fn unknown_seed_is_accepted_without_expansion() {
        let store = GraphStore::new();
        let found = find(&store, &["ghost".to_string()], &RetrievalConfig::default());
        assert_eq!(found, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_neighbor_outranks_plain_callee() {
        let mut store = GraphStore::new();
        store.add_node(node("seed", SymbolKind::Function));
        store.add_node(node("callee", SymbolKind::Function));
        store.add_node(node("test_mod", SymbolKind::Module));
        store.add_edge(GraphEdge {
            src_id: "seed".into(),
            dst_id: "callee".into(),
            edge_type: EdgeType::Calls,
            extra: None,
        });
        store.add_edge(GraphEdge {
            src_id: "test_mod".into(),
            dst_id: "seed".into(),
            edge_type: EdgeType::Tests,
            extra: None,
        });

        let found = find(&store, &["seed".to_string()], &RetrievalConfig::default());
        let test_pos = found.iter().position(|n| n == "test_mod").unwrap();
        let callee_pos = found.iter().position(|n| n == "callee").unwrap();
        assert!(test_pos < callee_pos);
    }
}
