//! Parsing of numbers as they appear in rendered reports.

use serde::Deserialize;

/// A number parsed from report text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedValue {
    /// Parsed value; percentages are converted to fractions
    pub value: f64,
    /// The raw text carried a `%` sign
    pub is_percent: bool,
    /// The raw text had no fractional part
    pub is_integral: bool,
}

/// Parse a formatted number such as `"1,234"`, `" 12.5 "` or `"94.1%"`.
///
/// Thousands separators and surrounding whitespace are dropped. A trailing
/// `%` marks a percentage, which is returned as a fraction (`"94.1%"` -> 0.941).
/// Returns `None` for anything that is not a finite number.
#[must_use]
pub fn parse_formatted(raw: &str) -> Option<ParsedValue> {
    let trimmed = raw.trim();
    let (number, is_percent) = match trimmed.strip_suffix('%') {
        Some(n) => (n.trim_end(), true),
        None => (trimmed, false),
    };

    let cleaned: String = number.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(ParsedValue {
        value: if is_percent { value / 100.0 } else { value },
        is_percent,
        is_integral: !cleaned.contains(['.', 'e', 'E']),
    })
}

/// Parse a percentage string (`"50%"` or `"50"`) into a fraction
#[must_use]
pub fn parse_percent_fraction(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some(value / 100.0)
}

/// Value cell of a report table row, as found in the embedded JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RowValue {
    #[must_use]
    pub fn parse(&self) -> Option<ParsedValue> {
        match self {
            Self::Number(v) if v.is_finite() => Some(ParsedValue {
                value: *v,
                is_percent: false,
                is_integral: v.fract() == 0.0,
            }),
            Self::Text(s) => parse_formatted(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thousands() {
        let v = parse_formatted("1,234,567").unwrap();
        assert!((v.value - 1_234_567.0).abs() < f64::EPSILON);
        assert!(!v.is_percent);
        assert!(v.is_integral);
    }

    #[test]
    fn test_parse_percent() {
        let v = parse_formatted(" 94.1% ").unwrap();
        assert!((v.value - 0.941).abs() < 1e-12);
        assert!(v.is_percent);
        assert!(!v.is_integral);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_formatted("n/a").is_none());
        assert!(parse_formatted("").is_none());
        assert!(parse_formatted("%").is_none());
        assert!(parse_formatted("inf").is_none());
    }

    #[test]
    fn test_parse_percent_fraction() {
        assert_eq!(parse_percent_fraction("50%"), Some(0.5));
        assert_eq!(parse_percent_fraction("60"), Some(0.6));
        assert_eq!(parse_percent_fraction("abc%"), None);
    }

    #[test]
    fn test_row_value_variants() {
        let number: RowValue = serde_json::from_str("42").unwrap();
        assert_eq!(number.parse().unwrap().value, 42.0);

        let text: RowValue = serde_json::from_str("\"12.5%\"").unwrap();
        assert!(text.parse().unwrap().is_percent);

        let null: RowValue = serde_json::from_str("null").unwrap();
        assert!(null.parse().is_none());
    }
}
