//! Online learning from user corrections.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::GraphError;
use crate::reasoner::graph::{EdgeKind, KnowledgeGraph, NodeKind};

/// Weight given to a user-confirmed BELONGS_TO edge.
pub const FEEDBACK_WEIGHT: f32 = 10.0;

/// Writes user feedback into a shared knowledge graph.
#[derive(Debug, Clone)]
pub struct ContinualLearner {
    graph: Arc<RwLock<KnowledgeGraph>>,
}

impl ContinualLearner {
    /// Create a learner over a shared graph.
    #[must_use]
    pub fn new(graph: Arc<RwLock<KnowledgeGraph>>) -> Self {
        Self { graph }
    }

    /// Record that `description` belongs to `category`.
    ///
    /// Inputs are trimmed; blank inputs are ignored. Missing nodes are
    /// created and the edge is set to [`FEEDBACK_WEIGHT`].
    ///
    /// # Errors
    ///
    /// Propagates graph errors.
    pub async fn learn_feedback(
        &self,
        description: &str,
        category: &str,
    ) -> Result<(), GraphError> {
        let merchant = description.trim();
        let category = category.trim();
        if merchant.is_empty() || category.is_empty() {
            return Ok(());
        }
        info!(merchant, category, "processing feedback");

        let mut graph = self.graph.write().await;
        if !graph.contains(merchant) {
            graph.add_node(merchant, NodeKind::Merchant)?;
        }
        if !graph.contains(category) {
            graph.add_node(category, NodeKind::Category)?;
        }
        graph.add_edge(merchant, category, EdgeKind::BelongsTo, FEEDBACK_WEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feedback_overrides_existing_category() {
        let graph = Arc::new(RwLock::new(
            KnowledgeGraph::from_pairs([("Starbucks", "Dining")]).unwrap(),
        ));
        let learner = ContinualLearner::new(graph.clone());
        learner.learn_feedback("  Starbucks ", "Coffee").await.unwrap();

        let graph = graph.read().await;
        assert_eq!(graph.node("Coffee"), Some(NodeKind::Category));
        let inference = graph.infer_category("Starbucks").unwrap();
        assert_eq!(inference.category, "Coffee");
    }

    #[tokio::test]
    async fn test_blank_feedback_is_ignored() {
        let graph = Arc::new(RwLock::new(KnowledgeGraph::new()));
        let learner = ContinualLearner::new(graph.clone());
        learner.learn_feedback(" ", "Dining").await.unwrap();
        assert_eq!(graph.read().await.node_count(), 0);
    }

    #[tokio::test]
    async fn test_new_merchant_is_created() {
        let graph = Arc::new(RwLock::new(KnowledgeGraph::new()));
        let learner = ContinualLearner::new(graph.clone());
        learner.learn_feedback("Netflix", "Entertainment").await.unwrap();
        let graph = graph.read().await;
        assert_eq!(graph.node("Netflix"), Some(NodeKind::Merchant));
        assert_eq!(graph.categories_of("Netflix"), vec!["Entertainment"]);
    }
}
