// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use std::collections::BTreeSet;

/// Separator for the distinct reporting dates / titles columns.
pub const LIST_SEPARATOR: &str = ", ";

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Dates are `YYYY-MM-DD`; the provider sometimes appends a time part.
    let s = s?.trim();
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Trimmed text, or `fallback` when missing or blank.
pub fn text_or(s: Option<String>, fallback: &str) -> String {
    match s.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

/// Yes/no style flags: `yes`, `true`, `y`, `1`.
pub fn parse_flag(s: Option<&str>) -> bool {
    matches!(
        s.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "true" | "y" | "1")
    )
}

/// Does `text` carry the indicator `code`? The code may sit anywhere in
/// the text but must not run on into a longer code (`F2.1` vs `F2.1b`).
pub fn matches_code(text: &str, code: &str) -> bool {
    text.match_indices(code).any(|(at, _)| {
        let rest = &text[at + code.len()..];
        match rest.chars().next() {
            Some(c) => !(c.is_alphanumeric() || c == '.'),
            None => true,
        }
    })
}

/// Sorted distinct values joined into a single cell.
pub fn join_distinct<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set: BTreeSet<String> = values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect();
    set.into_iter().collect::<Vec<_>>().join(LIST_SEPARATOR)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.50`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in log messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_thousands_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn dates_ignore_trailing_time() {
        let d = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        assert_eq!(parse_date_safe(Some("2023-06-30")), Some(d));
        assert_eq!(parse_date_safe(Some("2023-06-30T12:00:00Z")), Some(d));
        assert_eq!(parse_date_safe(Some("30/06/2023")), None);
    }

    #[test]
    fn code_matching_respects_boundaries() {
        assert!(matches_code("F2.1b Area of MPAs with sustainable financing", "F2.1b"));
        assert!(matches_code("Sub-indicator F6.1", "F6.1"));
        assert!(!matches_code("F2.1b Area", "F2.1"));
        assert!(!matches_code("F6.10 Other", "F6.1"));
        assert!(!matches_code("F2.2a Area", "F2.2b"));
    }

    #[test]
    fn distinct_join_sorts_and_dedups() {
        assert_eq!(
            join_distinct(["2023-06-30", "2022-12-31", "2023-06-30"]),
            "2022-12-31, 2023-06-30"
        );
        assert_eq!(join_distinct(Vec::<String>::new()), "");
    }

    #[test]
    fn flags_and_formatting() {
        assert!(parse_flag(Some("Yes")));
        assert!(!parse_flag(Some("No")));
        assert!(!parse_flag(None));
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-5.0, 1), "-5.0");
        assert_eq!(format_int(9855), "9,855");
    }
}
