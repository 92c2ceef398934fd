//! Neural category model seam.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReasonerError;

/// A calibrated category prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The most likely category.
    pub category: String,
    /// Its calibrated probability.
    pub confidence: f32,
    /// Probability per category.
    pub distribution: BTreeMap<String, f32>,
}

impl Prediction {
    /// A prediction whose distribution holds only the winning category.
    #[must_use]
    pub fn single(category: impl Into<String>, confidence: f32) -> Self {
        let category = category.into();
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            distribution: BTreeMap::from([(category.clone(), confidence)]),
            category,
            confidence,
        }
    }
}

/// Predicts a spending category from a transaction description.
#[async_trait]
pub trait CategoryModel: Send + Sync {
    /// Predict the category of `text`.
    async fn predict_proba(&self, text: &str) -> Result<Prediction, ReasonerError>;

    /// Model identifier.
    fn model_id(&self) -> &str;
}

/// Table-driven model for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct MockCategoryModel {
    predictions: HashMap<String, Prediction>,
    fallback: Option<Prediction>,
}

impl MockCategoryModel {
    /// Create a model that knows nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` with `category` at `confidence`.
    #[must_use]
    pub fn with_prediction(
        mut self,
        text: impl Into<String>,
        category: impl Into<String>,
        confidence: f32,
    ) -> Self {
        self.predictions
            .insert(text.into(), Prediction::single(category, confidence));
        self
    }

    /// Answer every other text with `category` at `confidence`.
    #[must_use]
    pub fn with_fallback(mut self, category: impl Into<String>, confidence: f32) -> Self {
        self.fallback = Some(Prediction::single(category, confidence));
        self
    }
}

#[async_trait]
impl CategoryModel for MockCategoryModel {
    async fn predict_proba(&self, text: &str) -> Result<Prediction, ReasonerError> {
        self.predictions
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ReasonerError::Prediction(format!("no prediction for {text:?}")))
    }

    fn model_id(&self) -> &str {
        "mock-category-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_then_fallback() {
        let model = MockCategoryModel::new()
            .with_prediction("Starbucks", "Dining", 0.9)
            .with_fallback("Misc", 0.1);
        assert_eq!(model.predict_proba("Starbucks").await.unwrap().category, "Dining");
        let other = model.predict_proba("Unknown").await.unwrap();
        assert_eq!(other.category, "Misc");
        assert!((other.distribution["Misc"] - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_unknown_without_fallback_fails() {
        assert!(MockCategoryModel::new().predict_proba("x").await.is_err());
    }
}
