//! Neuro-symbolic category reasoning.
//!
//! [`HybridReasoner`] arbitrates between a [`CategoryModel`], strict
//! [`RuleSet`] patterns, an in-memory [`KnowledgeGraph`] and a
//! [`GnnClassifier`]. The verifier consults it for context plausibility.

mod gnn;
mod graph;
mod hybrid;
mod learner;
mod model;
mod proof;
mod rules;

pub use gnn::GnnClassifier;
pub use graph::{Edge, EdgeKind, GraphInference, KnowledgeGraph, NodeKind};
pub use hybrid::HybridReasoner;
pub use learner::{ContinualLearner, FEEDBACK_WEIGHT};
pub use model::{CategoryModel, MockCategoryModel, Prediction};
pub use proof::{ProofGenerator, ReasoningProof};
pub use rules::{Rule, RuleConflict, RuleSet};
