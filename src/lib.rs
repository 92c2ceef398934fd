//! `OxiVerify` - claim verification for LLM-generated financial narratives.
//!
//! Every number in a narrative is treated as a claim to be proven against
//! ground-truth budget figures:
//!
//! - **Extraction**: regex patterns plus an embedding-based sentence scan
//! - **Resolution**: total keywords, exact, fuzzy and semantic entity binding
//! - **Verification**: fixed-point linear checks refuted by the `OxiZ` SMT
//!   solver, with an arithmetic path that reaches the same verdict
//! - **Hallucination detection**: capitalised names in entity positions that
//!   match nothing known
//! - **Correction**: wrong values rewritten in place
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oxiverify::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), OxiVerifyError> {
//!     let orchestrator = VerificationOrchestrator::builder()
//!         .with_embeddings(EmbeddingService::cached(
//!             MockEmbeddingProvider::new(384),
//!             EmbeddingCacheConfig::default(),
//!         ))
//!         .build()?;
//!
//!     let context = BudgetContext::new()
//!         .with_total(450.0)
//!         .with_category("Dining", 50.0);
//!
//!     let text = "You spent $50.00 on Dining, a total of $500.00.";
//!     let result = orchestrator.verify_response(text, &context).await;
//!
//!     println!("{}", explain(text, &result));
//!     assert_eq!(result.corrected_text, "You spent $50.00 on Dining, a total of $450.00.");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `native` (default): load and save configuration files
//! - `smt`: prove relations with the `OxiZ` SMT solver
//!
//! # Architecture
//!
//! ```text
//! Text + BudgetContext
//!   │
//!   ▼
//! ┌──────────────────┐
//! │  ClaimExtractor  │  ← regex + semantic scan, binding per claim
//! │ (EntityResolver) │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────────┐
//! │  ConstraintVerifier  │  ← SMT refutation, arithmetic fallback
//! │  (+ plausibility)    │
//! └─────────┬────────────┘
//!           │
//!           ▼
//! ┌───────────────────────┐
//! │ HallucinationDetector │  ← unknown names in entity positions
//! │ + sum consistency     │
//! └─────────┬─────────────┘
//!           │
//!           ▼
//!   CorrectionApplier → VerificationResult
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod correction;
pub mod embedding;
pub mod error;
pub mod explanation;
pub mod extraction;
pub mod hallucination;
pub mod orchestrator;
pub mod reasoner;
pub mod resolution;
pub mod solver;
pub mod text;
pub mod types;
pub mod verifier;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::{
        ExtractionConfig, HallucinationConfig, PlausibilityConfig, ProofConfig, ReasonerConfig,
        ResolutionConfig, VerifierConfig,
    };
    pub use crate::correction::{Correction, CorrectionApplier, format_value};
    pub use crate::embedding::{
        CacheStats, CachedEmbeddingProvider, EmbeddingCacheConfig, EmbeddingProvider,
        EmbeddingService, MockEmbeddingProvider, cosine_similarity,
    };
    pub use crate::error::{
        ConfigError, EmbeddingError, GraphError, OxiVerifyError, ReasonerError, SolverError,
    };
    pub use crate::explanation::explain;
    pub use crate::extraction::ClaimExtractor;
    pub use crate::hallucination::HallucinationDetector;
    pub use crate::orchestrator::{VerificationOrchestrator, VerificationOrchestratorBuilder};
    pub use crate::reasoner::{
        CategoryModel, ContinualLearner, EdgeKind, GnnClassifier, HybridReasoner,
        KnowledgeGraph, MockCategoryModel, NodeKind, Prediction, ProofGenerator, ReasoningProof,
        Rule, RuleSet,
    };
    pub use crate::resolution::{Binding, EntityResolver};
    #[cfg(feature = "smt")]
    pub use crate::solver::OxizSolver;
    pub use crate::solver::{
        ConstraintSolver, LinearCheck, MockSolver, Proof, ProofEngine, Relation, SolverMode,
        SolverVerdict, TemporalProperty,
    };
    pub use crate::types::{
        BindingSource, BudgetContext, Claim, ConsistencyStatus, HallucinationFinding, Interval,
        MetricType, Plausibility, ProofMethod, ReasoningResult, ReasoningSource, Span, StepStatus,
        SumConsistency, TraceEntry, VerificationMetrics, VerificationResult, VerificationStep,
    };
    pub use crate::verifier::{ConstraintVerifier, Verdict};
}

pub use error::{OxiVerifyError, Result};
pub use orchestrator::VerificationOrchestrator;
pub use types::{BudgetContext, VerificationResult};
