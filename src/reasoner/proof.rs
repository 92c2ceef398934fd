//! Structured proofs for reasoning results.

use serde::{Deserialize, Serialize};

use crate::types::{ReasoningResult, ReasoningSource};

/// How a category decision was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningProof {
    /// The chosen category.
    pub conclusion: String,
    /// Confidence in the conclusion.
    pub confidence: f32,
    /// Which stage decided.
    pub method: ReasoningSource,
    /// Human-readable steps.
    pub steps: Vec<String>,
    /// Whether a strict rule backs the conclusion.
    pub verified: bool,
}

/// Turns [`ReasoningResult`]s into [`ReasoningProof`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofGenerator;

impl ProofGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Explain `result`.
    #[must_use]
    pub fn generate_proof(&self, result: &ReasoningResult) -> ReasoningProof {
        let steps = match result.source {
            ReasoningSource::SymbolicOverride => vec![
                "Found strict rule matching pattern in description.".to_string(),
                format!("Applied rule category: {}", result.category),
            ],
            ReasoningSource::GraphInference => {
                let mut steps = vec![
                    "Low confidence in neural model.".to_string(),
                    "Consulted knowledge graph.".to_string(),
                ];
                if !result.graph_path.is_empty() {
                    steps.push(format!("Found path: {}", result.graph_path.join(" -> ")));
                }
                steps
            }
            ReasoningSource::GnnInference => vec![
                "Low confidence in neural model.".to_string(),
                "No direct graph path.".to_string(),
                format!("Label propagation assigned: {}", result.category),
            ],
            ReasoningSource::Neural => {
                let mut steps = vec![format!(
                    "Neural model prediction with confidence {:.2}",
                    result.confidence
                )];
                if result.is_verified {
                    steps.push("Confirmed by a strict rule.".to_string());
                }
                steps
            }
        };

        ReasoningProof {
            conclusion: result.category.clone(),
            confidence: result.confidence,
            method: result.source,
            steps,
            verified: result.is_verified,
        }
    }
}
