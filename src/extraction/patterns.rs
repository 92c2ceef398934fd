//! Regex library, one pattern per numeric relation.
//!
//! Amounts accept both grouped (`$1,234.56`) and plain (`$1234.56`) digits.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::MetricType;

const AMOUNT: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+(?:\.\d{2})?)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in claim pattern is valid")
}

static CURRENCY: LazyLock<Regex> = LazyLock::new(|| compile(&format!(r"\${AMOUNT}")));
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| compile(r"(\d+(?:\.\d+)?)%"));
static COUNT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(\d+)\s+(?:transactions|entries)"));
static AVERAGE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)(?:average|avg).*?\${AMOUNT}")));
static RATIO: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)(\d+(?:\.\d+)?)\s*(?:times|x)"));
static TREND: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:increased|decreased) by (\d+(?:\.\d+)?)%"));
static INEQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)(more than|less than|over|under)\s+\${AMOUNT}"
    ))
});
static RANGE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)between\s+\${AMOUNT}\s+and\s+\${AMOUNT}")));

/// A regex hit before entity binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    /// The relation the pattern encodes.
    pub metric_type: MetricType,
    /// The parsed value (lower bound for ranges).
    pub value: f64,
    /// Upper bound for ranges.
    pub secondary_value: Option<f64>,
    /// Byte offsets of the whole match.
    pub start: usize,
    /// Exclusive end.
    pub end: usize,
    /// The matched text.
    pub text: String,
}

/// Parse an amount like `1,234.56`.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn group(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index).and_then(|m| parse_amount(m.as_str()))
}

fn collect<F>(re: &Regex, text: &str, out: &mut Vec<RawMatch>, mut build: F)
where
    F: FnMut(&Captures<'_>) -> Option<(MetricType, f64, Option<f64>)>,
{
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some((metric_type, value, secondary_value)) = build(&caps) {
            out.push(RawMatch {
                metric_type,
                value,
                secondary_value,
                start: whole.start(),
                end: whole.end(),
                text: whole.as_str().to_string(),
            });
        }
    }
}

/// Run every pattern over `text`, in pattern order.
#[must_use]
pub fn scan(text: &str) -> Vec<RawMatch> {
    let mut out = Vec::new();

    collect(&CURRENCY, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Currency, v, None))
    });
    collect(&PERCENTAGE, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Percentage, v, None))
    });
    collect(&COUNT, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Count, v, None))
    });
    collect(&AVERAGE, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Average, v, None))
    });
    collect(&RATIO, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Ratio, v, None))
    });
    collect(&TREND, text, &mut out, |c| {
        group(c, 1).map(|v| (MetricType::Trend, v, None))
    });
    collect(&INEQUALITY, text, &mut out, |c| {
        let op = c.get(1)?.as_str().to_lowercase();
        let metric = if op == "more than" || op == "over" {
            MetricType::InequalityGt
        } else {
            MetricType::InequalityLt
        };
        group(c, 2).map(|v| (metric, v, None))
    });
    collect(&RANGE, text, &mut out, |c| {
        let lo = group(c, 1)?;
        let hi = group(c, 2)?;
        Some((MetricType::Range, lo, Some(hi)))
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(MetricType, f64)> {
        scan(text)
            .into_iter()
            .map(|m| (m.metric_type, m.value))
            .collect()
    }

    #[test]
    fn test_currency_grouped_and_plain() {
        assert_eq!(
            kinds("Paid $1,234.56 then $1500.00 and $7"),
            vec![
                (MetricType::Currency, 1234.56),
                (MetricType::Currency, 1500.0),
                (MetricType::Currency, 7.0)
            ]
        );
    }

    #[test]
    fn test_percentage_and_trend() {
        let found = kinds("Spending increased by 12.5% overall");
        assert!(found.contains(&(MetricType::Percentage, 12.5)));
        assert!(found.contains(&(MetricType::Trend, 12.5)));
    }

    #[test]
    fn test_count_is_case_insensitive() {
        assert_eq!(kinds("42 Transactions"), vec![(MetricType::Count, 42.0)]);
    }

    #[test]
    fn test_inequality_direction() {
        let found = scan("Dining was over $200 and Travel under $1,000.00");
        let ops: Vec<_> = found
            .iter()
            .filter(|m| m.metric_type != MetricType::Currency)
            .map(|m| (m.metric_type, m.value))
            .collect();
        assert_eq!(
            ops,
            vec![
                (MetricType::InequalityGt, 200.0),
                (MetricType::InequalityLt, 1000.0)
            ]
        );
    }

    #[test]
    fn test_range_carries_both_bounds() {
        let range = scan("between $100 and $250.50")
            .into_iter()
            .find(|m| m.metric_type == MetricType::Range)
            .unwrap();
        assert!((range.value - 100.0).abs() < f64::EPSILON);
        assert_eq!(range.secondary_value, Some(250.5));
        assert_eq!(range.start, 0);
    }

    #[test]
    fn test_ratio_and_average() {
        let found = kinds("Dining was 3x Travel; avg spend was $25.00");
        assert!(found.contains(&(MetricType::Ratio, 3.0)));
        assert!(found.contains(&(MetricType::Average, 25.0)));
    }

    #[test]
    fn test_no_match_on_plain_prose() {
        assert!(scan("Nothing numeric here.").is_empty());
        assert!(scan("").is_empty());
    }
}
