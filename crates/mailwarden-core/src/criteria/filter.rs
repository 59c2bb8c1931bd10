//! Compiled mail-server filter expressions.
//!
//! A [`FilterExpr`] is the opaque output of the criteria compiler. It can be
//! rendered into an IMAP-style query string for the mail session, and it can
//! be evaluated locally against a subject/date pair, which is what mock
//! sessions and the test suite use.

use chrono::NaiveDate;

/// A server-side filter over message subject and internal date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// Subject contains the given text (case-insensitive substring).
    Subject(String),
    /// Internal date is on or after the given date.
    Since(NaiveDate),
    /// All sub-filters must match.
    And(Vec<FilterExpr>),
    /// Either sub-filter matches.
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    /// Render the filter as an IMAP SEARCH query string.
    ///
    /// AND groups with more than one member are parenthesized so they nest
    /// correctly under `OR`. Subject literals are quoted with `"` and `\`
    /// escaped; the since date uses the protocol's `%d-%b-%Y` format.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut out = String::new();
        self.write_query(&mut out);
        out
    }

    fn write_query(&self, out: &mut String) {
        match self {
            Self::Subject(text) => {
                out.push_str("SUBJECT \"");
                for ch in text.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
            Self::Since(date) => {
                out.push_str("SINCE \"");
                out.push_str(&date.format("%d-%b-%Y").to_string());
                out.push('"');
            }
            Self::And(parts) => {
                if parts.len() == 1 {
                    parts[0].write_query(out);
                    return;
                }
                out.push('(');
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    part.write_query(out);
                }
                out.push(')');
            }
            Self::Or(left, right) => {
                out.push_str("OR ");
                left.write_query(out);
                out.push(' ');
                right.write_query(out);
            }
        }
    }

    /// Evaluate the filter against a message subject and internal date.
    ///
    /// This mirrors server semantics for the subset of criteria the compiler
    /// emits: subject containment is case-insensitive, `SINCE` is inclusive.
    #[must_use]
    pub fn matches(&self, subject: &str, date: NaiveDate) -> bool {
        match self {
            Self::Subject(text) => {
                subject.to_lowercase().contains(&text.to_lowercase())
            }
            Self::Since(since) => date >= *since,
            Self::And(parts) => parts.iter().all(|p| p.matches(subject, date)),
            Self::Or(left, right) => {
                left.matches(subject, date) || right.matches(subject, date)
            }
        }
    }

}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn subject_query_quotes_literal() {
        let expr = FilterExpr::Subject("Factura".to_string());
        assert_eq!(expr.to_query(), "SUBJECT \"Factura\"");
    }

    #[test]
    fn subject_query_escapes_quotes_and_backslash() {
        let expr = FilterExpr::Subject("say \"hi\"".to_string());
        assert_eq!(expr.to_query(), "SUBJECT \"say \\\"hi\\\"\"");
    }

    #[test]
    fn since_query_uses_imap_date_format() {
        let expr = FilterExpr::Since(date(2024, 1, 5));
        assert_eq!(expr.to_query(), "SINCE \"05-Jan-2024\"");
    }

    #[test]
    fn and_group_is_parenthesized() {
        let expr = FilterExpr::And(vec![
            FilterExpr::Subject("Factura".to_string()),
            FilterExpr::Since(date(2024, 1, 5)),
        ]);
        assert_eq!(expr.to_query(), "(SUBJECT \"Factura\" SINCE \"05-Jan-2024\")");
    }

    #[test]
    fn single_member_and_is_unwrapped() {
        let expr = FilterExpr::And(vec![FilterExpr::Subject("x".to_string())]);
        assert_eq!(expr.to_query(), "SUBJECT \"x\"");
    }

    #[test]
    fn or_renders_prefix_form() {
        let expr = FilterExpr::Or(
            Box::new(FilterExpr::Subject("a b".to_string())),
            Box::new(FilterExpr::And(vec![
                FilterExpr::Subject("a".to_string()),
                FilterExpr::Subject("b".to_string()),
            ])),
        );
        assert_eq!(expr.to_query(), "OR SUBJECT \"a b\" (SUBJECT \"a\" SUBJECT \"b\")");
    }

    #[test]
    fn matches_subject_is_case_insensitive() {
        let expr = FilterExpr::Subject("factura".to_string());
        assert!(expr.matches("FACTURA mensual", date(2024, 1, 1)));
        assert!(!expr.matches("pedido", date(2024, 1, 1)));
    }

    #[test]
    fn matches_since_is_inclusive() {
        let expr = FilterExpr::Since(date(2024, 1, 5));
        assert!(expr.matches("x", date(2024, 1, 5)));
        assert!(expr.matches("x", date(2024, 2, 1)));
        assert!(!expr.matches("x", date(2024, 1, 4)));
    }

    #[test]
    fn matches_and_or() {
        let expr = FilterExpr::Or(
            Box::new(FilterExpr::Subject("missing".to_string())),
            Box::new(FilterExpr::And(vec![
                FilterExpr::Subject("pedido".to_string()),
                FilterExpr::Subject("confirmacion".to_string()),
            ])),
        );
        assert!(expr.matches("RE: Pedido urgente Confirmacion 2024-01-01", date(2024, 1, 1)));
        assert!(!expr.matches("Pedido urgente", date(2024, 1, 1)));
    }
}
