//! Strict categorisation rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Any description containing `pattern` (case-insensitive) belongs to
/// `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Substring to look for.
    pub pattern: String,
    /// Category it implies.
    pub category: String,
}

impl Rule {
    /// Create a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
        }
    }

    /// Whether the rule applies to `description`. Empty patterns never apply.
    #[must_use]
    pub fn matches(&self, description: &str) -> bool {
        !self.pattern.is_empty()
            && description
                .to_lowercase()
                .contains(&self.pattern.to_lowercase())
    }
}

/// One pattern mapped to more than one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConflict {
    /// The shared pattern.
    pub pattern: String,
    /// The distinct categories it maps to, sorted.
    pub categories: Vec<String>,
}

/// An ordered list of rules. The first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, pattern: impl Into<String>, category: impl Into<String>) -> Self {
        self.rules.push(Rule::new(pattern, category));
        self
    }

    /// Append a rule in place.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// The rules, in priority order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The category of the first rule matching `description`.
    #[must_use]
    pub fn category_for(&self, description: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| !r.category.is_empty() && r.matches(description))
            .map(|r| r.category.as_str())
    }

    /// Patterns that map to more than one distinct category.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<RuleConflict> {
        let mut by_pattern: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rule in &self.rules {
            if rule.pattern.is_empty() || rule.category.is_empty() {
                continue;
            }
            let categories = by_pattern.entry(rule.pattern.as_str()).or_default();
            if !categories.contains(&rule.category.as_str()) {
                categories.push(rule.category.as_str());
            }
        }

        by_pattern
            .into_iter()
            .filter(|(_, categories)| categories.len() > 1)
            .map(|(pattern, mut categories)| {
                categories.sort_unstable();
                RuleConflict {
                    pattern: pattern.to_string(),
                    categories: categories.into_iter().map(String::from).collect(),
                }
            })
            .collect()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
