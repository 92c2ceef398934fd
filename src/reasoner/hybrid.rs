//! Arbitration between the neural model, strict rules, and the knowledge graph.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ReasonerConfig;
use crate::embedding::EmbeddingService;
use crate::error::{GraphError, ReasonerError};
use crate::reasoner::gnn::GnnClassifier;
use crate::reasoner::graph::KnowledgeGraph;
use crate::reasoner::learner::ContinualLearner;
use crate::reasoner::model::{CategoryModel, Prediction};
use crate::reasoner::rules::RuleSet;
use crate::types::{Plausibility, ReasoningResult, ReasoningSource};

/// Neuro-symbolic category reasoner.
///
/// Precedence is strict: rule, confident model, graph, GNN, raw model.
pub struct HybridReasoner {
    model: Arc<dyn CategoryModel>,
    graph: Option<Arc<RwLock<KnowledgeGraph>>>,
    gnn: Arc<RwLock<GnnClassifier>>,
    embeddings: Option<EmbeddingService>,
    config: ReasonerConfig,
}

impl std::fmt::Debug for HybridReasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridReasoner")
            .field("model", &self.model.model_id())
            .field("graph", &self.graph.is_some())
            .field("embeddings", &self.embeddings.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HybridReasoner {
    /// Create a reasoner over `model` with default thresholds.
    #[must_use]
    pub fn new(model: Arc<dyn CategoryModel>) -> Self {
        let config = ReasonerConfig::default();
        Self {
            model,
            graph: None,
            gnn: Arc::new(RwLock::new(GnnClassifier::new(config.gnn_iterations))),
            embeddings: None,
            config,
        }
    }

    /// Attach a shared knowledge graph.
    #[must_use]
    pub fn with_graph(mut self, graph: Arc<RwLock<KnowledgeGraph>>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Attach an embedding service for plausibility scoring.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Override thresholds. Resets the GNN when the iteration count changes.
    #[must_use]
    pub fn with_config(mut self, config: ReasonerConfig) -> Self {
        if config.gnn_iterations != self.config.gnn_iterations {
            self.gnn = Arc::new(RwLock::new(GnnClassifier::new(config.gnn_iterations)));
        }
        self.config = config;
        self
    }

    /// The active thresholds.
    #[must_use]
    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// The shared graph, if attached.
    #[must_use]
    pub fn graph(&self) -> Option<&Arc<RwLock<KnowledgeGraph>>> {
        self.graph.as_ref()
    }

    /// A learner writing into the attached graph.
    #[must_use]
    pub fn learner(&self) -> Option<ContinualLearner> {
        self.graph.clone().map(ContinualLearner::new)
    }

    /// Retrain the GNN from the current graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidInput`] when no graph is attached.
    pub async fn train_gnn(&self) -> Result<(), GraphError> {
        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| GraphError::InvalidInput("no knowledge graph attached".into()))?;
        let graph = graph.read().await;
        self.gnn.write().await.train(&graph);
        Ok(())
    }

    /// Categorise `description`.
    ///
    /// # Errors
    ///
    /// Fails only when the neural model fails. Graph and GNN stages are
    /// best-effort.
    pub async fn refine_prediction(
        &self,
        description: &str,
        rules: &RuleSet,
    ) -> Result<ReasoningResult, ReasonerError> {
        let Prediction {
            category,
            confidence,
            ..
        } = self.model.predict_proba(description).await?;

        if let Some(rule_category) = rules.category_for(description) {
            if rule_category == category {
                return Ok(ReasoningResult {
                    category,
                    confidence: 1.0,
                    source: ReasoningSource::Neural,
                    is_verified: true,
                    graph_path: Vec::new(),
                });
            }
            info!(
                description,
                neural = %category,
                rule = rule_category,
                "symbolic override"
            );
            return Ok(ReasoningResult {
                category: rule_category.to_string(),
                confidence: 1.0,
                source: ReasoningSource::SymbolicOverride,
                is_verified: true,
                graph_path: Vec::new(),
            });
        }

        if confidence >= self.config.neural_threshold {
            return Ok(neural(category, confidence));
        }

        if let Some(graph) = &self.graph {
            let inference = graph.read().await.infer_category(description);
            if let Some(inference) = inference {
                info!(
                    description,
                    category = %inference.category,
                    "graph inference refinement"
                );
                return Ok(ReasoningResult {
                    category: inference.category,
                    confidence: confidence.max(self.config.graph_confidence_floor),
                    source: ReasoningSource::GraphInference,
                    is_verified: false,
                    graph_path: inference.path,
                });
            }
        }

        if let Some(predicted) = self.gnn.read().await.predict(description) {
            info!(description, category = predicted, "gnn inference refinement");
            return Ok(ReasoningResult {
                category: predicted.to_string(),
                confidence: self.config.gnn_confidence,
                source: ReasoningSource::GnnInference,
                is_verified: false,
                graph_path: Vec::new(),
            });
        }

        debug!(description, confidence, "no refinement available");
        Ok(neural(category, confidence))
    }

    /// Cosine similarity of `entity` to its context window. Never a gate.
    pub async fn validate_claim_plausibility(&self, entity: &str, context: &str) -> Plausibility {
        match &self.embeddings {
            Some(embeddings) => embeddings.plausibility(entity, context).await,
            None => Plausibility::Unknown,
        }
    }
}

fn neural(category: String, confidence: f32) -> ReasoningResult {
    ReasoningResult {
        category,
        confidence,
        source: ReasoningSource::Neural,
        is_verified: false,
        graph_path: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::reasoner::graph::{EdgeKind, NodeKind};
    use crate::reasoner::model::MockCategoryModel;

    fn model() -> Arc<dyn CategoryModel> {
        Arc::new(
            MockCategoryModel::new()
                .with_prediction("STARBUCKS #42", "Dining", 0.95)
                .with_prediction("Uber trip", "Dining", 0.9)
                .with_prediction("Peets", "Shopping", 0.4)
                .with_prediction("Blue Bottle", "Shopping", 0.3)
                .with_fallback("Misc", 0.2),
        )
    }

    fn graph() -> Arc<RwLock<KnowledgeGraph>> {
        let mut g = KnowledgeGraph::from_pairs([("Starbucks", "Dining")]).unwrap();
        g.add_node("Peets", NodeKind::Merchant).unwrap();
        g.add_edge("Peets", "Starbucks", EdgeKind::SimilarTo, 0.9).unwrap();
        g.add_node("Blue Bottle", NodeKind::Merchant).unwrap();
        g.add_edge("Blue Bottle", "Peets", EdgeKind::SimilarTo, 0.8)
            .unwrap();
        Arc::new(RwLock::new(g))
    }

    #[tokio::test]
    async fn test_rule_overrides_confident_model() {
        let reasoner = HybridReasoner::new(model());
        let rules = RuleSet::new().with_rule("uber", "Transport");
        let result = reasoner.refine_prediction("Uber trip", &rules).await.unwrap();
        assert_eq!(result.category, "Transport");
        assert_eq!(result.source, ReasoningSource::SymbolicOverride);
        assert!(result.is_verified);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_agreeing_rule_boosts_neural() {
        let reasoner = HybridReasoner::new(model());
        let rules = RuleSet::new().with_rule("starbucks", "Dining");
        let result = reasoner
            .refine_prediction("STARBUCKS #42", &rules)
            .await
            .unwrap();
        assert_eq!(result.source, ReasoningSource::Neural);
        assert!(result.is_verified);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_confident_model_accepted() {
        let reasoner = HybridReasoner::new(model()).with_graph(graph());
        let result = reasoner
            .refine_prediction("STARBUCKS #42", &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(result.source, ReasoningSource::Neural);
        assert!(!result.is_verified);
        assert!((result.confidence - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_graph_refines_low_confidence() {
        let reasoner = HybridReasoner::new(model()).with_graph(graph());
        let result = reasoner
            .refine_prediction("Peets", &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(result.category, "Dining");
        assert_eq!(result.source, ReasoningSource::GraphInference);
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert_eq!(result.graph_path, vec!["Peets", "Starbucks", "Dining"]);
    }

    #[tokio::test]
    async fn test_gnn_reaches_past_one_hop() {
        let reasoner = HybridReasoner::new(model()).with_graph(graph());
        reasoner.train_gnn().await.unwrap();
        let result = reasoner
            .refine_prediction("Blue Bottle", &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(result.category, "Dining");
        assert_eq!(result.source, ReasoningSource::GnnInference);
        assert!((result.confidence - 0.65).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_raw_neural_when_nothing_helps() {
        let reasoner = HybridReasoner::new(model()).with_graph(graph());
        let result = reasoner
            .refine_prediction("Corner shop", &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(result.category, "Misc");
        assert_eq!(result.source, ReasoningSource::Neural);
        assert!((result.confidence - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_feedback_flows_into_inference() {
        let reasoner = HybridReasoner::new(model()).with_graph(graph());
        let learner = reasoner.learner().unwrap();
        learner.learn_feedback("Corner shop", "Groceries").await.unwrap();
        let result = reasoner
            .refine_prediction("Corner shop", &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(result.category, "Groceries");
        assert_eq!(result.source, ReasoningSource::GraphInference);
    }

    #[tokio::test]
    async fn test_train_without_graph_fails() {
        let reasoner = HybridReasoner::new(model());
        assert!(reasoner.train_gnn().await.is_err());
    }

    #[tokio::test]
    async fn test_plausibility_unknown_without_embeddings() {
        let reasoner = HybridReasoner::new(model());
        assert_eq!(
            reasoner.validate_claim_plausibility("Dining", "on dining").await,
            Plausibility::Unknown
        );

        let reasoner =
            reasoner.with_embeddings(EmbeddingService::uncached(MockEmbeddingProvider::new(32)));
        assert!(
            reasoner
                .validate_claim_plausibility("Dining", "on dining")
                .await
                .score()
                .is_some()
        );
    }
}
