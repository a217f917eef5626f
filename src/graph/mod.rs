//! Relationship graph: node/edge store, bounded BFS expansion and export.
//!
//! Nodes are keyed by canonical article title. That title is the only merge
//! key between traversals, so two sessions' graphs join exactly where their
//! titles coincide.

pub mod export;
mod traversal;

pub use traversal::{Growth, Scheduler, Step, TraversalOptions, TraversalStats};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entity::EntityType;
use crate::{Result, WikitreeError};

/// One article-backed vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical article title.
    pub id: String,
    pub entity_type: EntityType,
    /// Shortest distance from any seed seen so far.
    pub depth: usize,
    /// Article text has been mined for candidates.
    pub expanded: bool,
    /// Short description taken from the article's first sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `target_id` was selected while mining `source_id`'s article.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
}

/// What [`Graph::upsert_node`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChange {
    Inserted,
    DepthLowered { from: usize },
    Unchanged,
}

/// Plain `{nodes, edges}` view handed to exporters and the session store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Append-only node/edge store. Only `depth`, `expanded`, and the type and
/// label of unexpanded nodes change after insertion.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_index: HashSet<(String, String)>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from stored parts, rejecting duplicate ids and dangling edges.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = Graph::new();
        for node in snapshot.nodes {
            if graph.index.contains_key(&node.id) {
                return Err(WikitreeError::InvalidInput(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
            graph.index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }
        for edge in snapshot.edges {
            if !graph.add_edge(&edge.source_id, &edge.target_id) {
                return Err(WikitreeError::InvalidInput(format!(
                    "invalid edge: {} -> {}",
                    edge.source_id, edge.target_id
                )));
            }
        }
        Ok(graph)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a node, or lower the depth of an existing one.
    ///
    /// An existing node keeps its type; use [`Graph::refine_type`] to change it.
    pub fn upsert_node(&mut self, id: &str, entity_type: EntityType, depth: usize) -> NodeChange {
        if let Some(node) = self.node_mut(id) {
            if depth < node.depth {
                let from = node.depth;
                node.depth = depth;
                return NodeChange::DepthLowered { from };
            }
            return NodeChange::Unchanged;
        }

        self.index.insert(id.to_string(), self.nodes.len());
        self.nodes.push(Node {
            id: id.to_string(),
            entity_type,
            depth,
            expanded: false,
            label: None,
        });
        NodeChange::Inserted
    }

    /// Change the type of a node whose article has not been mined yet.
    pub fn refine_type(&mut self, id: &str, entity_type: EntityType) -> bool {
        match self.node_mut(id) {
            Some(node) if !node.expanded && node.entity_type != entity_type => {
                node.entity_type = entity_type;
                true
            }
            _ => false,
        }
    }

    /// Set the label once; later calls leave it alone.
    pub fn set_label(&mut self, id: &str, label: Option<String>) {
        if let Some(node) = self.node_mut(id) {
            if node.label.is_none() {
                node.label = label;
            }
        }
    }

    /// Add `source -> target`. Returns false for self-loops, unknown endpoints
    /// and pairs already present.
    pub fn add_edge(&mut self, source_id: &str, target_id: &str) -> bool {
        if source_id == target_id || !self.contains(source_id) || !self.contains(target_id) {
            return false;
        }
        let key = (source_id.to_string(), target_id.to_string());
        if !self.edge_index.insert(key) {
            return false;
        }
        self.edges.push(Edge {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        });
        true
    }

    pub fn mark_expanded(&mut self, id: &str) {
        if let Some(node) = self.node_mut(id) {
            node.expanded = true;
        }
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_inserts_once() {
        let mut graph = Graph::new();
        assert_eq!(graph.upsert_node("John Lennon", EntityType::Person, 1), NodeChange::Inserted);
        assert_eq!(graph.upsert_node("John Lennon", EntityType::Misc, 2), NodeChange::Unchanged);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("John Lennon").unwrap().entity_type, EntityType::Person);
    }

    #[test]
    fn test_upsert_lowers_depth() {
        let mut graph = Graph::new();
        graph.upsert_node("Linda McCartney", EntityType::Person, 2);
        graph.mark_expanded("Linda McCartney");
        assert_eq!(
            graph.upsert_node("Linda McCartney", EntityType::Person, 0),
            NodeChange::DepthLowered { from: 2 }
        );
        let node = graph.node("Linda McCartney").unwrap();
        assert_eq!(node.depth, 0);
        assert!(node.expanded);
    }

    #[test]
    fn test_edges_deduplicated_and_no_self_loops() {
        let mut graph = Graph::new();
        graph.upsert_node("A", EntityType::Person, 0);
        graph.upsert_node("B", EntityType::Person, 1);
        assert!(graph.add_edge("A", "B"));
        assert!(!graph.add_edge("A", "B"));
        assert!(graph.add_edge("B", "A"));
        assert!(!graph.add_edge("A", "A"));
        assert!(!graph.add_edge("A", "Missing"));
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.outgoing("A").count(), 1);
    }

    #[test]
    fn test_refine_type_only_unexpanded() {
        let mut graph = Graph::new();
        graph.upsert_node("Apple", EntityType::Organization, 1);
        assert!(graph.refine_type("Apple", EntityType::Person));
        graph.mark_expanded("Apple");
        assert!(!graph.refine_type("Apple", EntityType::Location));
        assert_eq!(graph.node("Apple").unwrap().entity_type, EntityType::Person);
    }

    #[test]
    fn test_label_set_once() {
        let mut graph = Graph::new();
        graph.upsert_node("Yoko Ono", EntityType::Person, 0);
        graph.set_label("Yoko Ono", Some("Japanese artist".into()));
        graph.set_label("Yoko Ono", Some("other".into()));
        assert_eq!(graph.node("Yoko Ono").unwrap().label.as_deref(), Some("Japanese artist"));
    }

    #[test]
    fn test_snapshot_round_trip_preserves_order() {
        let mut graph = Graph::new();
        for (i, id) in ["Seed", "Zed", "Alpha"].iter().enumerate() {
            graph.upsert_node(id, EntityType::Person, i);
        }
        graph.add_edge("Seed", "Zed");
        graph.add_edge("Seed", "Alpha");
        let rebuilt = Graph::from_snapshot(graph.snapshot()).unwrap();
        assert_eq!(rebuilt.snapshot(), graph.snapshot());
    }

    #[test]
    fn test_from_snapshot_rejects_duplicates() {
        let node = Node {
            id: "X Y".into(),
            entity_type: EntityType::Person,
            depth: 0,
            expanded: false,
            label: None,
        };
        let snapshot = GraphSnapshot {
            nodes: vec![node.clone(), node],
            edges: vec![],
        };
        assert!(Graph::from_snapshot(snapshot).is_err());
    }
}
