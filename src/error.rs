//! Unified error types for `OxiVerify`.
//!
//! Verification itself never fails: collaborator errors are downgraded to
//! explicit "unknown" values at the component boundary. These types describe
//! what went wrong underneath, so the downgrade can be logged and traced.

use thiserror::Error;

/// The main error type for `OxiVerify` operations.
#[derive(Debug, Error)]
pub enum OxiVerifyError {
    /// Embedding-related errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Constraint solver errors
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Knowledge graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Hybrid reasoner errors
    #[error("Reasoner error: {0}")]
    Reasoner(#[from] ReasonerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Inference failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension received
        actual: usize,
    },

    /// Empty input
    #[error("Empty input provided")]
    EmptyInput,

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors raised by a constraint solver backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The solver did not answer within its budget.
    #[error("Solver timeout after {0}ms")]
    Timeout(u64),

    /// A fixed-point operand does not fit the backend's integer width.
    #[error("Operand overflow while encoding {0}")]
    Overflow(String),

    /// The backend reported an internal failure.
    #[error("Solver internal error: {0}")]
    Internal(String),
}

/// Errors related to knowledge graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Edge references a node that does not exist.
    #[error("Dangling edge {from} -> {to}")]
    DanglingEdge {
        /// Source node id
        from: String,
        /// Target node id
        to: String,
    },

    /// Invalid input (empty names, non-finite weights).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors related to the hybrid reasoner and its collaborators.
#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The neural category model failed.
    #[error("Model prediction failed: {0}")]
    Prediction(String),

    /// A graph collaborator failed.
    #[error("Graph collaborator failed: {0}")]
    Graph(#[from] GraphError),
}

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A similarity or confidence threshold lies outside `[0, 1]`.
    #[error("Threshold `{name}` must lie in [0, 1], got {value}")]
    ThresholdOutOfRange {
        /// Field name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// An epsilon tolerance is negative or not finite.
    #[error("Epsilon `{name}` must be finite and non-negative, got {value}")]
    InvalidEpsilon {
        /// Field name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// A size, window or timeout that must be positive is zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// A type alias for Results with [`OxiVerifyError`].
pub type Result<T> = std::result::Result<T, OxiVerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiVerifyError::Config(ConfigError::Zero("solver.timeout_ms"));
        assert_eq!(
            err.to_string(),
            "Configuration error: `solver.timeout_ms` must be greater than zero"
        );
    }

    #[test]
    fn test_embedding_error_conversion() {
        let emb_err = EmbeddingError::EmptyInput;
        let err: OxiVerifyError = emb_err.into();
        assert!(matches!(err, OxiVerifyError::Embedding(_)));
    }

    #[test]
    fn test_reasoner_wraps_graph_error() {
        let err: ReasonerError = GraphError::InvalidInput("empty node id".into()).into();
        assert_eq!(
            err.to_string(),
            "Graph collaborator failed: Invalid input: empty node id"
        );
    }

    #[test]
    fn test_solver_timeout_display() {
        assert_eq!(
            SolverError::Timeout(5000).to_string(),
            "Solver timeout after 5000ms"
        );
    }
}
