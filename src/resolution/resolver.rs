//! Entity binding: total keywords, then exact, fuzzy and semantic matching of
//! nearby capitalized names, with month references taking precedence for
//! dollar amounts.

use tracing::{debug, warn};

use crate::config::ResolutionConfig;
use crate::embedding::EmbeddingService;
use crate::resolution::fuzzy::{closest_match, sequence_ratio};
use crate::resolution::temporal::bind_temporal;
use crate::text::{TITLE_CASE_RUN, window_after, window_before};
use crate::types::{BindingSource, BudgetContext, MetricType, Span, TOTAL_ENTITY};

const TOTAL_KEYWORDS: [&str; 4] = ["total", "sum", "overall", "all spending"];

/// The entity a claim is attributed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// The entity name, `None` when nothing matched.
    pub entity: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// How the entity was found.
    pub source: BindingSource,
}

impl Binding {
    /// Nothing matched.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            entity: None,
            confidence: 0.0,
            source: BindingSource::Unbound,
        }
    }

    fn bound(entity: impl Into<String>, confidence: f32, source: BindingSource) -> Self {
        Self {
            entity: Some(entity.into()),
            confidence,
            source,
        }
    }
}

/// Resolves the entity a numeric claim talks about.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    config: ResolutionConfig,
    embeddings: Option<EmbeddingService>,
}

impl EntityResolver {
    /// Create a resolver without a semantic stage.
    #[must_use]
    pub fn new(config: ResolutionConfig) -> Self {
        Self {
            config,
            embeddings: None,
        }
    }

    /// Enable the semantic stage.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Bind a claim and return its final metric type.
    ///
    /// Currency claims preceded by a month reference become temporal claims
    /// bound to that month, whatever the generic binding would have found.
    pub async fn resolve(
        &self,
        text: &str,
        span: Span,
        metric_type: MetricType,
        context: &BudgetContext,
    ) -> (Binding, MetricType) {
        if metric_type == MetricType::Currency
            && let Some(month) = bind_temporal(text, span, self.config.temporal_window, context)
        {
            debug!(month = %month, "claim bound to month");
            return (
                Binding::bound(month, 1.0, BindingSource::TemporalRegex),
                MetricType::Temporal,
            );
        }
        (self.bind(text, span, context).await, metric_type)
    }

    /// Generic binding: total keywords, then nearby capitalized candidates.
    pub async fn bind(&self, text: &str, span: Span, context: &BudgetContext) -> Binding {
        let pre_text = window_before(text, span.start, self.config.total_window).to_lowercase();

        if TOTAL_KEYWORDS.iter().any(|k| pre_text.contains(k))
            && !pre_text.contains("category")
            && !pre_text.contains("merchant")
        {
            return Binding::bound(TOTAL_ENTITY, 1.0, BindingSource::KeywordProximity);
        }

        let strong_context = pre_text.contains("spent on") || pre_text.contains("category");
        let lookback = if strong_context || pre_text.contains("merchant") {
            self.config.expanded_lookback
        } else {
            self.config.lookback
        };

        let behind = window_before(text, span.start, lookback);
        let ahead = window_after(text, span.end, self.config.lookahead);
        let candidates = TITLE_CASE_RUN
            .find_iter(behind)
            .last()
            .into_iter()
            .chain(TITLE_CASE_RUN.find_iter(ahead));

        for candidate in candidates {
            if let Some(binding) = self
                .match_candidate(candidate.as_str(), context, strong_context)
                .await
            {
                return binding;
            }
        }
        Binding::unbound()
    }

    /// Match one candidate name: exact, fuzzy, then semantic.
    pub async fn match_candidate(
        &self,
        candidate: &str,
        context: &BudgetContext,
        relaxed: bool,
    ) -> Option<Binding> {
        if context.is_known(candidate) {
            return Some(Binding::bound(candidate, 1.0, BindingSource::ExactMatch));
        }

        if let Some((known, _)) =
            closest_match(candidate, context.known_entities(), self.config.fuzzy_cutoff)
        {
            #[allow(clippy::cast_possible_truncation)]
            let ratio = sequence_ratio(candidate, known) as f32;
            return Some(Binding::bound(known, ratio, BindingSource::FuzzyMatch));
        }

        let embeddings = self.embeddings.as_ref()?;
        let threshold = if relaxed {
            self.config.relaxed_semantic_threshold
        } else {
            self.config.semantic_threshold
        };

        match embeddings
            .best_match(candidate, context.semantic_targets())
            .await
        {
            Ok(Some(best)) if best.similarity > threshold => Some(Binding::bound(
                best.name,
                best.similarity,
                BindingSource::SemanticEmbedding,
            )),
            Ok(_) => None,
            Err(err) => {
                warn!(candidate, error = %err, "semantic entity match unavailable");
                None
            }
        }
    }
}
