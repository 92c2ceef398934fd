//! Core data structures for `OxiVerify`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The entity name reserved for overall spending.
pub const TOTAL_ENTITY: &str = "Total";

/// The kind of numeric assertion a claim makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// A dollar amount attributed to an entity.
    Currency,
    /// A share of total spending.
    Percentage,
    /// A number of transactions or entries.
    Count,
    /// An average amount per entry.
    Average,
    /// A multiple of another entity's amount.
    Ratio,
    /// A month-over-month percentage change.
    Trend,
    /// "more than" / "over" a dollar bound.
    InequalityGt,
    /// "less than" / "under" a dollar bound.
    InequalityLt,
    /// "between $A and $B".
    Range,
    /// A dollar amount attributed to a calendar month.
    Temporal,
    /// An implicit mention of a known entity with no extracted value.
    SemanticInference,
}

impl MetricType {
    /// The canonical snake-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Percentage => "percentage",
            Self::Count => "count",
            Self::Average => "average",
            Self::Ratio => "ratio",
            Self::Trend => "trend",
            Self::InequalityGt => "inequality_gt",
            Self::InequalityLt => "inequality_lt",
            Self::Range => "range",
            Self::Temporal => "temporal",
            Self::SemanticInference => "semantic_inference",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a claim's entity was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    /// Supplied explicitly by the caller.
    Direct,
    /// Exact name match against a known entity.
    ExactMatch,
    /// Sequence-similarity match above the fuzzy cutoff.
    FuzzyMatch,
    /// Cosine-similarity match above the semantic threshold.
    SemanticEmbedding,
    /// Month-name or "last month" reference.
    TemporalRegex,
    /// Found by the semantic sentence scan.
    NeuralExtraction,
    /// A total keyword close before the claim.
    KeywordProximity,
    /// Nothing matched.
    #[default]
    #[serde(rename = "none")]
    Unbound,
}

impl BindingSource {
    /// The canonical snake-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ExactMatch => "exact_match",
            Self::FuzzyMatch => "fuzzy_match",
            Self::SemanticEmbedding => "semantic_embedding",
            Self::TemporalRegex => "temporal_regex",
            Self::NeuralExtraction => "neural_extraction",
            Self::KeywordProximity => "keyword_proximity",
            Self::Unbound => "none",
        }
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A half-open byte range `[start, end)` into the verified text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the two spans share at least one byte.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An open interval of plausible values. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Exclusive lower bound, `None` for minus infinity.
    pub lower: Option<f64>,
    /// Exclusive upper bound, `None` for plus infinity.
    pub upper: Option<f64>,
}

impl Interval {
    /// `(lower, +inf)`
    #[must_use]
    pub fn above(lower: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
        }
    }

    /// `(-inf, upper)`
    #[must_use]
    pub fn below(upper: f64) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
        }
    }

    /// `(lower, upper)`
    #[must_use]
    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Whether `value` lies strictly inside the interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower.is_none_or(|lo| value > lo) && self.upper.is_none_or(|hi| value < hi)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => write!(f, "({lo:.2}, {hi:.2})"),
            (Some(lo), None) => write!(f, "({lo:.2}, +inf)"),
            (None, Some(hi)) => write!(f, "(-inf, {hi:.2})"),
            (None, None) => f.write_str("(-inf, +inf)"),
        }
    }
}

/// A discrete numeric assertion extracted from narrative text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The matched text (or a sentence snippet for semantic claims).
    pub original_text: String,
    /// The parsed value. For ranges this is the lower bound.
    pub value: f64,
    /// The upper bound of a range.
    pub secondary_value: Option<f64>,
    /// The relation the claim asserts.
    pub metric_type: MetricType,
    /// The entity the value is attributed to.
    pub entity: Option<String>,
    /// Where the claim sits in the text.
    pub span: Span,
    /// Binding confidence in `[0, 1]`.
    pub confidence: f32,
    /// How the entity was found.
    pub binding_source: BindingSource,
    /// Set while verifying inequalities and ranges.
    pub uncertainty_interval: Option<Interval>,
}

impl Claim {
    /// Create an unbound claim.
    #[must_use]
    pub fn new(
        original_text: impl Into<String>,
        value: f64,
        metric_type: MetricType,
        span: Span,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            value,
            secondary_value: None,
            metric_type,
            entity: None,
            span,
            confidence: 0.0,
            binding_source: BindingSource::Unbound,
            uncertainty_interval: None,
        }
    }

    /// Bind the claim to an entity.
    #[must_use]
    pub fn with_entity(
        mut self,
        entity: impl Into<String>,
        confidence: f32,
        source: BindingSource,
    ) -> Self {
        self.entity = Some(entity.into());
        self.confidence = confidence.clamp(0.0, 1.0);
        self.binding_source = source;
        self
    }

    /// Set the upper bound of a range claim.
    #[must_use]
    pub fn with_secondary_value(mut self, value: f64) -> Self {
        self.secondary_value = Some(value);
        self
    }

    /// Whether the claim is attributed to overall spending.
    #[must_use]
    pub fn is_total(&self) -> bool {
        self.entity.as_deref() == Some(TOTAL_ENTITY)
    }
}

/// Earliest and latest transaction dates (ISO-8601 strings).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest date.
    pub earliest: Option<String>,
    /// Latest date.
    pub latest: Option<String>,
}

/// The authoritative, read-only numeric summary claims are checked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetContext {
    /// Overall spending.
    pub total_expenses: f64,
    /// Number of ledger entries.
    pub entry_count: u64,
    /// Spending per category.
    pub categories: BTreeMap<String, f64>,
    /// Spending per project.
    pub projects: BTreeMap<String, f64>,
    /// Spending per top merchant.
    pub top_merchants: BTreeMap<String, f64>,
    /// Spending per month, keyed `YYYY-MM`.
    pub monthly_summary: BTreeMap<String, f64>,
    /// Every known category name.
    pub all_categories: BTreeSet<String>,
    /// Every known project name.
    pub all_projects: BTreeSet<String>,
    /// Every known merchant name.
    pub all_merchants: BTreeSet<String>,
    /// Date span of the ledger.
    pub date_range: Option<DateRange>,
}

impl BudgetContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total spending.
    #[must_use]
    pub fn with_total(mut self, total: f64) -> Self {
        self.total_expenses = total;
        self
    }

    /// Set the entry count.
    #[must_use]
    pub fn with_entry_count(mut self, count: u64) -> Self {
        self.entry_count = count;
        self
    }

    /// Add a category with its amount. The name is also registered as known.
    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>, amount: f64) -> Self {
        let name = name.into();
        self.all_categories.insert(name.clone());
        self.categories.insert(name, amount);
        self
    }

    /// Add a project with its amount. The name is also registered as known.
    #[must_use]
    pub fn with_project(mut self, name: impl Into<String>, amount: f64) -> Self {
        let name = name.into();
        self.all_projects.insert(name.clone());
        self.projects.insert(name, amount);
        self
    }

    /// Add a top merchant with its amount. The name is also registered as known.
    #[must_use]
    pub fn with_merchant(mut self, name: impl Into<String>, amount: f64) -> Self {
        let name = name.into();
        self.all_merchants.insert(name.clone());
        self.top_merchants.insert(name, amount);
        self
    }

    /// Register a known category without an amount.
    #[must_use]
    pub fn with_known_category(mut self, name: impl Into<String>) -> Self {
        self.all_categories.insert(name.into());
        self
    }

    /// Register a known merchant without an amount.
    #[must_use]
    pub fn with_known_merchant(mut self, name: impl Into<String>) -> Self {
        self.all_merchants.insert(name.into());
        self
    }

    /// Add a monthly aggregate, keyed `YYYY-MM`.
    #[must_use]
    pub fn with_month(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.monthly_summary.insert(key.into(), amount);
        self
    }

    /// Set the ledger's date span.
    #[must_use]
    pub fn with_date_range(mut self, earliest: Option<String>, latest: Option<String>) -> Self {
        self.date_range = Some(DateRange { earliest, latest });
        self
    }

    /// Whether `name` is a known category, project or merchant.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.all_categories.contains(name)
            || self.all_projects.contains(name)
            || self.all_merchants.contains(name)
    }

    /// Categories, then projects, then merchants.
    pub fn known_entities(&self) -> impl Iterator<Item = &str> {
        self.all_categories
            .iter()
            .chain(&self.all_projects)
            .chain(&self.all_merchants)
            .map(String::as_str)
    }

    /// Categories, then projects. The semantic matching targets.
    pub fn semantic_targets(&self) -> impl Iterator<Item = &str> {
        self.all_categories
            .iter()
            .chain(&self.all_projects)
            .map(String::as_str)
    }

    /// The amount recorded for an entity. `"Total"` maps to total spending.
    #[must_use]
    pub fn amount_for(&self, entity: &str) -> Option<f64> {
        if entity == TOTAL_ENTITY {
            return Some(self.total_expenses);
        }
        self.categories
            .get(entity)
            .or_else(|| self.projects.get(entity))
            .or_else(|| self.top_merchants.get(entity))
            .copied()
    }

    /// The latest month key in the summary.
    #[must_use]
    pub fn latest_month(&self) -> Option<&str> {
        self.monthly_summary.keys().next_back().map(String::as_str)
    }

    /// The total of the month before the latest one. Trends compare total
    /// spending against it.
    #[must_use]
    pub fn previous_month_total(&self) -> Option<f64> {
        self.monthly_summary.values().rev().nth(1).copied()
    }
}

/// Lifecycle of a per-claim trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet routed.
    #[default]
    Pending,
    /// The relation holds, or could not be formed and passes unpenalized.
    Verified,
    /// The relation failed and a corrected value is known.
    Corrected,
    /// The relation failed with no correction, or could not be checked.
    Unverified,
}

impl StepStatus {
    /// The canonical snake-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Corrected => "corrected",
            Self::Unverified => "unverified",
        }
    }
}

/// Which path decided a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofMethod {
    /// The solver proved the negation unsatisfiable, or found a model for it.
    Symbolic,
    /// Direct evaluation of the same fixed-point check.
    Fallback,
}

impl fmt::Display for ProofMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Symbolic => "symbolic",
            Self::Fallback => "fallback",
        })
    }
}

/// Result of the soft context-plausibility signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plausibility {
    /// Cosine similarity between entity and context window.
    Score(f32),
    /// The signal could not be computed.
    Unknown,
}

impl Plausibility {
    /// The score, if known.
    #[must_use]
    pub fn score(self) -> Option<f32> {
        match self {
            Self::Score(s) => Some(s),
            Self::Unknown => None,
        }
    }
}

/// Confidence adjustment applied from plausibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceAdjustment {
    /// Penalized for low context plausibility.
    Penalized,
    /// Boosted for high context plausibility.
    Boosted,
}

/// A per-claim trace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationStep {
    /// The claim after binding and verification.
    pub claim: Claim,
    /// Where the claim ended.
    pub status: StepStatus,
    /// The corrected value, for corrected claims.
    pub correction: Option<f64>,
    /// Plausibility of the entity in its context window.
    pub plausibility: Option<Plausibility>,
    /// Confidence nudge applied from plausibility.
    pub adjustment: Option<ConfidenceAdjustment>,
    /// Which path decided the relation, when one was evaluated.
    pub method: Option<ProofMethod>,
    /// Free-form note (skip reason, solver degradation).
    pub detail: Option<String>,
}

impl VerificationStep {
    /// Open a pending step for a claim.
    #[must_use]
    pub fn pending(claim: Claim) -> Self {
        Self {
            claim,
            status: StepStatus::Pending,
            correction: None,
            plausibility: None,
            adjustment: None,
            method: None,
            detail: None,
        }
    }

    /// The value parsed from the text.
    #[must_use]
    pub fn parsed_value(&self) -> f64 {
        self.claim.value
    }

    /// The entity the claim was bound to.
    #[must_use]
    pub fn inferred_entity(&self) -> Option<&str> {
        self.claim.entity.as_deref()
    }

    /// The uncertainty interval attached during verification.
    #[must_use]
    pub fn uncertainty_interval(&self) -> Option<Interval> {
        self.claim.uncertainty_interval
    }
}

/// The context pattern that surfaced a suspect entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionHint {
    /// Could be any kind of entity.
    Generic,
    /// Follows "spent $N on".
    MerchantOrCategory,
    /// Phrased as a category.
    Category,
}

impl MentionHint {
    /// The canonical snake-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::MerchantOrCategory => "merchant_or_category",
            Self::Category => "category",
        }
    }
}

/// A mentioned entity with no correspondence to any known entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationFinding {
    /// The suspect name as written.
    pub entity: String,
    /// Where the triggering pattern matched.
    pub position: usize,
    /// Which pattern family surfaced it.
    pub hint: MentionHint,
    /// `1 - best similarity`, in `[0, 1]`.
    pub score: f32,
    /// Best semantic similarity seen, `None` if unknown.
    pub best_similarity: Option<f32>,
}

/// Outcome of the sum-consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyStatus {
    /// Components add up to the stated total.
    Verified,
    /// They do not.
    Failed,
}

/// Trace entry for the sum-consistency check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumConsistency {
    /// The stated total.
    pub total: f64,
    /// Sum of the stated components.
    pub components_sum: f64,
    /// Number of components.
    pub component_count: usize,
    /// Verdict.
    pub status: ConsistencyStatus,
    /// Which path decided it.
    pub method: ProofMethod,
}

/// One entry in the verification trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    /// A checked claim.
    ClaimCheck(VerificationStep),
    /// A suspect entity.
    HallucinationDetected(HallucinationFinding),
    /// Sum of components versus stated total.
    SumConsistency(SumConsistency),
    /// The text contained no claims.
    NoClaimsFound,
}

/// Observability counters for one verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationMetrics {
    /// Share of text bytes covered by claim spans.
    pub coverage_ratio: f32,
    /// Claims found by the semantic scan.
    pub neural_claims_recovered: usize,
    /// Mean hallucination score.
    pub hallucination_avg_conf: f32,
    /// Claims extracted.
    pub claim_count: usize,
    /// Claims corrected.
    pub corrections: usize,
    /// Suspect entities reported.
    pub hallucinations: usize,
    /// Claims that ended unverified.
    pub failed_checks: usize,
}

/// The outcome of verifying one narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// No corrections and no hallucinations.
    pub is_valid: bool,
    /// Mean per-claim contribution, halved when any hallucination is found.
    pub score: f32,
    /// The text with corrections applied.
    pub corrected_text: String,
    /// Ordered trace.
    pub trace: Vec<TraceEntry>,
    /// Wall-clock latency.
    pub latency_ms: u64,
    /// Observability counters.
    pub metrics: VerificationMetrics,
}

impl VerificationResult {
    /// The per-claim steps, in order.
    pub fn steps(&self) -> impl Iterator<Item = &VerificationStep> {
        self.trace.iter().filter_map(|entry| match entry {
            TraceEntry::ClaimCheck(step) => Some(step),
            _ => None,
        })
    }

    /// The hallucination findings, in order.
    pub fn hallucinations(&self) -> impl Iterator<Item = &HallucinationFinding> {
        self.trace.iter().filter_map(|entry| match entry {
            TraceEntry::HallucinationDetected(finding) => Some(finding),
            _ => None,
        })
    }

    /// The sum-consistency entry, if the check ran.
    #[must_use]
    pub fn sum_consistency(&self) -> Option<&SumConsistency> {
        self.trace.iter().find_map(|entry| match entry {
            TraceEntry::SumConsistency(check) => Some(check),
            _ => None,
        })
    }
}

/// Which stage of the hybrid reasoner produced a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningSource {
    /// The neural model.
    Neural,
    /// A strict rule overrode the model.
    SymbolicOverride,
    /// Knowledge-graph traversal.
    GraphInference,
    /// GNN label propagation.
    GnnInference,
}

impl ReasoningSource {
    /// The canonical snake-case tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neural => "neural",
            Self::SymbolicOverride => "symbolic_override",
            Self::GraphInference => "graph_inference",
            Self::GnnInference => "gnn_inference",
        }
    }
}

/// A category decision from the hybrid reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// The chosen category.
    pub category: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Which stage decided.
    pub source: ReasoningSource,
    /// Whether a strict rule backs the decision.
    pub is_verified: bool,
    /// Node ids traversed, for graph inferences.
    pub graph_path: Vec<String>,
}
