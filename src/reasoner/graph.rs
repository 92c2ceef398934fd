//! In-memory merchant/category knowledge graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;

/// The kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A merchant or transaction description.
    Merchant,
    /// A spending category.
    Category,
}

/// The kind of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Merchant to the category it is filed under.
    BelongsTo,
    /// Merchant to a merchant it resembles.
    SimilarTo,
}

/// A weighted directed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relation.
    pub kind: EdgeKind,
    /// Strength; larger is stronger.
    pub weight: f32,
}

/// A category found by traversal, with the node path that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInference {
    /// The inferred category.
    pub category: String,
    /// `[merchant, category]` or `[merchant, neighbour, category]`.
    pub path: Vec<String>,
}

/// Nodes keyed by id, edges kept per source in insertion order.
///
/// At most one edge exists per `(source, target, kind)`; adding it again
/// replaces its weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    nodes: BTreeMap<String, NodeKind>,
    outgoing: BTreeMap<String, Vec<Edge>>,
}

impl KnowledgeGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `merchant -> category` pairs as BELONGS_TO edges of weight 1.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidInput`] for empty names.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = Self::new();
        for (merchant, category) in pairs {
            graph.add_node(merchant, NodeKind::Merchant)?;
            graph.add_node(category, NodeKind::Category)?;
            graph.add_edge(merchant, category, EdgeKind::BelongsTo, 1.0)?;
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph built from pairs"
        );
        Ok(graph)
    }

    /// Add a node, or change the kind of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidInput`] for an empty id.
    pub fn add_node(&mut self, id: &str, kind: NodeKind) -> Result<(), GraphError> {
        if id.trim().is_empty() {
            return Err(GraphError::InvalidInput("empty node id".into()));
        }
        self.nodes.insert(id.to_string(), kind);
        Ok(())
    }

    /// Add or reweight a directed edge.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DanglingEdge`] when either endpoint is missing and
    /// [`GraphError::InvalidInput`] for a non-finite weight.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
        weight: f32,
    ) -> Result<(), GraphError> {
        if !weight.is_finite() {
            return Err(GraphError::InvalidInput(format!("edge weight {weight}")));
        }
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return Err(GraphError::DanglingEdge {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        let edges = self.outgoing.entry(source.to_string()).or_default();
        if let Some(edge) = edges.iter_mut().find(|e| e.target == target && e.kind == kind) {
            edge.weight = weight;
        } else {
            edges.push(Edge {
                source: source.to_string(),
                target: target.to_string(),
                kind,
                weight,
            });
        }
        Ok(())
    }

    /// The kind of a node, if present.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<NodeKind> {
        self.nodes.get(id).copied()
    }

    /// Whether the node exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }

    /// Node ids and kinds, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeKind)> {
        self.nodes.iter().map(|(id, kind)| (id.as_str(), *kind))
    }

    /// Every edge, grouped by source.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.outgoing.values().flatten()
    }

    /// Outgoing edges of one kind, strongest first. Equal weights keep
    /// insertion order.
    #[must_use]
    pub fn neighbors(&self, id: &str, kind: EdgeKind) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self
            .outgoing
            .get(id)
            .into_iter()
            .flatten()
            .filter(|e| e.kind == kind)
            .collect();
        edges.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        edges
    }

    /// Categories a node is filed under, strongest first.
    #[must_use]
    pub fn categories_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, EdgeKind::BelongsTo)
            .into_iter()
            .filter(|e| self.node(&e.target) == Some(NodeKind::Category))
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Infer a merchant's category: its own BELONGS_TO edge first, then the
    /// categories of its SIMILAR_TO neighbours, strongest neighbour first.
    #[must_use]
    pub fn infer_category(&self, merchant: &str) -> Option<GraphInference> {
        if let Some(category) = self.categories_of(merchant).first() {
            return Some(GraphInference {
                category: (*category).to_string(),
                path: vec![merchant.to_string(), (*category).to_string()],
            });
        }

        for neighbor in self.neighbors(merchant, EdgeKind::SimilarTo) {
            if let Some(category) = self.categories_of(&neighbor.target).first() {
                debug!(
                    source = merchant,
                    similar = %neighbor.target,
                    inferred = category,
                    "category inferred from neighbour"
                );
                return Some(GraphInference {
                    category: (*category).to_string(),
                    path: vec![
                        merchant.to_string(),
                        neighbor.target.clone(),
                        (*category).to_string(),
                    ],
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::from_pairs([("Starbucks", "Dining"), ("Shell", "Transport")])
            .unwrap();
        g.add_node("Peets", NodeKind::Merchant).unwrap();
        g.add_node("Costa", NodeKind::Merchant).unwrap();
        g.add_edge("Peets", "Shell", EdgeKind::SimilarTo, 0.2).unwrap();
        g.add_edge("Peets", "Starbucks", EdgeKind::SimilarTo, 0.9).unwrap();
        g
    }

    #[test]
    fn test_direct_lookup() {
        let inference = graph().infer_category("Starbucks").unwrap();
        assert_eq!(inference.category, "Dining");
        assert_eq!(inference.path, vec!["Starbucks", "Dining"]);
    }

    #[test]
    fn test_strongest_neighbour_wins() {
        let inference = graph().infer_category("Peets").unwrap();
        assert_eq!(inference.category, "Dining");
        assert_eq!(inference.path, vec!["Peets", "Starbucks", "Dining"]);
    }

    #[test]
    fn test_no_path() {
        let g = graph();
        assert_eq!(g.infer_category("Costa"), None);
        assert_eq!(g.infer_category("Unknown"), None);
    }

    #[test]
    fn test_reweight_and_ordering() {
        let mut g = graph();
        g.add_node("Cafes", NodeKind::Category).unwrap();
        g.add_edge("Starbucks", "Cafes", EdgeKind::BelongsTo, 10.0).unwrap();
        assert_eq!(g.categories_of("Starbucks"), vec!["Cafes", "Dining"]);
        g.add_edge("Starbucks", "Cafes", EdgeKind::BelongsTo, 0.5).unwrap();
        assert_eq!(g.categories_of("Starbucks"), vec!["Dining", "Cafes"]);
        assert_eq!(g.edge_count(), 5);
    }

    #[test]
    fn test_invalid_edges() {
        let mut g = graph();
        assert!(matches!(
            g.add_edge("Starbucks", "Nowhere", EdgeKind::BelongsTo, 1.0),
            Err(GraphError::DanglingEdge { .. })
        ));
        assert!(matches!(
            g.add_edge("Starbucks", "Dining", EdgeKind::BelongsTo, f32::NAN),
            Err(GraphError::InvalidInput(_))
        ));
        assert!(g.add_node("  ", NodeKind::Merchant).is_err());
    }
}
