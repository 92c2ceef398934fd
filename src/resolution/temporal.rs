//! Month references: "March 2024", "in Sep 2023", "last month".

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::text::window_before;
use crate::types::{BudgetContext, Span};

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+(\d{4})")
        .expect("month pattern is valid")
});

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Format a calendar month as `YYYY-MM`, rejecting impossible dates.
#[must_use]
pub fn month_key(year: i32, month: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%Y-%m").to_string())
}

fn parse_month_year(window: &str) -> Option<String> {
    let caps = MONTH_YEAR.captures(window)?;
    let abbrev = caps.get(1)?.as_str().to_lowercase();
    let month = MONTHS.iter().position(|m| *m == abbrev)?;
    let year: i32 = caps.get(2)?.as_str().parse().ok()?;
    month_key(year, u32::try_from(month).ok()? + 1)
}

fn last_month(context: &BudgetContext) -> Option<String> {
    let from_range = context
        .date_range
        .as_ref()
        .and_then(|range| range.latest.as_deref())
        .and_then(|latest| latest.get(..7));
    from_range
        .or_else(|| context.latest_month())
        .map(str::to_string)
}

/// The `YYYY-MM` key a claim refers to, from the `window` characters before it.
#[must_use]
pub fn bind_temporal(
    text: &str,
    span: Span,
    window: usize,
    context: &BudgetContext,
) -> Option<String> {
    let before = window_before(text, span.start, window);
    if let Some(key) = parse_month_year(before) {
        return Some(key);
    }
    if before.to_lowercase().contains("last month") {
        return last_month(context);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_of(text: &str, needle: &str) -> Span {
        let start = text.find(needle).unwrap();
        Span::new(start, start + needle.len())
    }

    #[test]
    fn test_month_name_and_year() {
        let text = "In March 2024, you spent $1,200.00.";
        let key = bind_temporal(text, span_of(text, "$1,200.00"), 40, &BudgetContext::new());
        assert_eq!(key.as_deref(), Some("2024-03"));
    }

    #[test]
    fn test_abbreviated_month() {
        let text = "Sept 2023 came to $80";
        let key = bind_temporal(text, span_of(text, "$80"), 40, &BudgetContext::new());
        assert_eq!(key.as_deref(), Some("2023-09"));
    }

    #[test]
    fn test_last_month_prefers_date_range() {
        let ctx = BudgetContext::new()
            .with_month("2024-01", 10.0)
            .with_date_range(None, Some("2024-02-17".into()));
        let text = "Last month you spent $90";
        let key = bind_temporal(text, span_of(text, "$90"), 40, &ctx);
        assert_eq!(key.as_deref(), Some("2024-02"));
    }

    #[test]
    fn test_last_month_falls_back_to_latest_key() {
        let ctx = BudgetContext::new()
            .with_month("2024-01", 10.0)
            .with_month("2024-04", 10.0);
        let text = "Last month you spent $90";
        let key = bind_temporal(text, span_of(text, "$90"), 40, &ctx);
        assert_eq!(key.as_deref(), Some("2024-04"));
    }

    #[test]
    fn test_out_of_window_is_ignored() {
        let text = "In March 2024 there was a long story about many things, then $5";
        assert_eq!(
            bind_temporal(text, span_of(text, "$5"), 40, &BudgetContext::new()),
            None
        );
    }

    #[test]
    fn test_month_key_validation() {
        assert_eq!(month_key(2024, 12).as_deref(), Some("2024-12"));
        assert_eq!(month_key(2024, 13), None);
    }
}
