//! Configuration management for `OxiVerify`.
//!
//! Every similarity threshold, window size and epsilon the verifier uses lives
//! here, so deployments can tune them without touching code.

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingCacheConfig;
use crate::error::ConfigError;

/// Global configuration for `OxiVerify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Claim extraction configuration.
    pub extraction: ExtractionConfig,
    /// Entity resolution configuration.
    pub resolution: ResolutionConfig,
    /// Constraint solver configuration.
    pub solver: ProofConfig,
    /// Hallucination detection configuration.
    pub hallucination: HallucinationConfig,
    /// Context plausibility nudging.
    pub plausibility: PlausibilityConfig,
    /// Hybrid reasoner configuration.
    pub reasoner: ReasonerConfig,
    /// Embedding cache configuration.
    pub cache: EmbeddingCacheConfig,
}

/// Configuration for claim extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum similarity between a sentence and a known entity to emit an
    /// implicit (`semantic_inference`) claim.
    pub semantic_threshold: f32,
    /// Sentences shorter than this many characters are not scanned semantically.
    pub min_sentence_len: usize,
    /// Whether the semantic pass runs at all.
    pub enable_semantic_pass: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.82,
            min_sentence_len: 15,
            enable_semantic_pass: true,
        }
    }
}

/// Configuration for entity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Characters before a claim scanned for total keywords.
    pub total_window: usize,
    /// Default lookback for Title-Case candidates.
    pub lookback: usize,
    /// Lookback used when "spent on", "category" or "merchant" is nearby.
    pub expanded_lookback: usize,
    /// Characters after a claim scanned when the lookback yields nothing.
    pub lookahead: usize,
    /// Characters before a claim scanned for month references.
    pub temporal_window: usize,
    /// Cutoff for the sequence-similarity ratio.
    pub fuzzy_cutoff: f64,
    /// Minimum cosine similarity for a semantic match.
    pub semantic_threshold: f32,
    /// Semantic threshold under strong contextual keywords.
    pub relaxed_semantic_threshold: f32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            total_window: 100,
            lookback: 100,
            expanded_lookback: 150,
            lookahead: 50,
            temporal_window: 40,
            fuzzy_cutoff: 0.8,
            semantic_threshold: 0.85,
            relaxed_semantic_threshold: 0.80,
        }
    }
}

/// Configuration for constraint proofs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Hard budget per solver call in milliseconds.
    pub timeout_ms: u64,
    /// Whether to try the symbolic backend before the arithmetic check.
    pub use_symbolic: bool,
    /// Tolerance for currency and monthly totals.
    pub currency_epsilon: f64,
    /// Tolerance for transaction counts.
    pub count_epsilon: f64,
    /// Base tolerance for averages, percentages, ratios and trends.
    pub derived_epsilon: f64,
    /// Tolerance for the sum-consistency check.
    pub sum_epsilon: f64,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            use_symbolic: true,
            currency_epsilon: 1.0,
            count_epsilon: 0.1,
            derived_epsilon: 0.1,
            sum_epsilon: 0.01,
        }
    }
}

/// Configuration for hallucination detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationConfig {
    /// Cutoff for the sequence-similarity ratio.
    pub fuzzy_cutoff: f64,
    /// Suspects more similar than this to a known entity are accepted.
    pub semantic_threshold: f32,
    /// Suspects starting within this many characters of a bound claim are ignored.
    pub bound_proximity: usize,
    /// Case-insensitive words never reported.
    pub stop_words: Vec<String>,
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: 0.8,
            semantic_threshold: 0.85,
            bound_proximity: 15,
            stop_words: [
                "total",
                "sum",
                "average",
                "spending",
                "cost",
                "amount",
                "budget",
                "summary",
                "addition",
                "contrast",
                "comparison",
                "year",
                "month",
                "date",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Configuration for the context-plausibility nudge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityConfig {
    /// Whether plausibility is consulted at all.
    pub enabled: bool,
    /// Characters on each side of a claim forming its context window.
    pub window: usize,
    /// Below this, confidence is penalized.
    pub low: f32,
    /// Above this, confidence is boosted.
    pub high: f32,
    /// Multiplier applied on low plausibility.
    pub penalty_factor: f32,
    /// Multiplier applied on high plausibility (result capped at 1.0).
    pub boost_factor: f32,
}

impl Default for PlausibilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 50,
            low: 0.3,
            high: 0.7,
            penalty_factor: 0.8,
            boost_factor: 1.1,
        }
    }
}

/// Configuration for the hybrid reasoner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Neural confidence at or above which a prediction is accepted as-is.
    pub neural_threshold: f32,
    /// Minimum confidence reported for a graph inference.
    pub graph_confidence_floor: f32,
    /// Fixed confidence reported for a GNN inference.
    pub gnn_confidence: f32,
    /// Diffusion steps used when training the GNN classifier.
    pub gnn_iterations: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            neural_threshold: 0.8,
            graph_confidence_floor: 0.7,
            gnn_confidence: 0.65,
            gnn_iterations: 3,
        }
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

fn check_epsilon(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidEpsilon { name, value })
    }
}

impl VerifierConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every threshold, epsilon and size for sanity.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit(
            "extraction.semantic_threshold",
            f64::from(self.extraction.semantic_threshold),
        )?;
        check_unit("resolution.fuzzy_cutoff", self.resolution.fuzzy_cutoff)?;
        check_unit(
            "resolution.semantic_threshold",
            f64::from(self.resolution.semantic_threshold),
        )?;
        check_unit(
            "resolution.relaxed_semantic_threshold",
            f64::from(self.resolution.relaxed_semantic_threshold),
        )?;
        check_unit("hallucination.fuzzy_cutoff", self.hallucination.fuzzy_cutoff)?;
        check_unit(
            "hallucination.semantic_threshold",
            f64::from(self.hallucination.semantic_threshold),
        )?;
        check_unit("plausibility.low", f64::from(self.plausibility.low))?;
        check_unit("plausibility.high", f64::from(self.plausibility.high))?;
        check_unit(
            "reasoner.neural_threshold",
            f64::from(self.reasoner.neural_threshold),
        )?;
        check_unit(
            "reasoner.graph_confidence_floor",
            f64::from(self.reasoner.graph_confidence_floor),
        )?;
        check_unit(
            "reasoner.gnn_confidence",
            f64::from(self.reasoner.gnn_confidence),
        )?;

        check_epsilon("solver.currency_epsilon", self.solver.currency_epsilon)?;
        check_epsilon("solver.count_epsilon", self.solver.count_epsilon)?;
        check_epsilon("solver.derived_epsilon", self.solver.derived_epsilon)?;
        check_epsilon("solver.sum_epsilon", self.solver.sum_epsilon)?;

        if self.solver.timeout_ms == 0 {
            return Err(ConfigError::Zero("solver.timeout_ms"));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Zero("cache.max_entries"));
        }
        if self.resolution.lookback == 0 {
            return Err(ConfigError::Zero("resolution.lookback"));
        }
        if self.reasoner.gnn_iterations == 0 {
            return Err(ConfigError::Zero("reasoner.gnn_iterations"));
        }
        Ok(())
    }

    /// Load configuration from a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[cfg(feature = "native")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    #[cfg(feature = "native")]
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON string. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the result is invalid.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        let content = serde_json::to_string_pretty(self)?;
        Ok(content)
    }

    /// Set extraction configuration.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Set resolution configuration.
    #[must_use]
    pub fn with_resolution(mut self, resolution: ResolutionConfig) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set solver configuration.
    #[must_use]
    pub fn with_solver(mut self, solver: ProofConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Set hallucination configuration.
    #[must_use]
    pub fn with_hallucination(mut self, hallucination: HallucinationConfig) -> Self {
        self.hallucination = hallucination;
        self
    }

    /// Set plausibility configuration.
    #[must_use]
    pub fn with_plausibility(mut self, plausibility: PlausibilityConfig) -> Self {
        self.plausibility = plausibility;
        self
    }

    /// Set reasoner configuration.
    #[must_use]
    pub fn with_reasoner(mut self, reasoner: ReasonerConfig) -> Self {
        self.reasoner = reasoner;
        self
    }

    /// Set embedding cache configuration.
    #[must_use]
    pub fn with_cache(mut self, cache: EmbeddingCacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
