//! Criteria compiler: free-text phrase to server filter.
//!
//! The compiler turns a profile's search phrase into a [`FilterExpr`] that
//! performs approximate subject matching: a multi-word phrase matches subjects
//! that contain all of its significant words, even when extra text (reply
//! prefixes, timestamps) surrounds them. Compilation never fails; when a
//! phrase degrades to nothing usable, the filter falls back to the date bound
//! alone.

use chrono::NaiveDate;
use tracing::debug;

use super::filter::FilterExpr;

/// Words dropped from multi-word phrases before building the all-words
/// alternative. Prepositions and conjunctions in the profiles' language carry
/// no selectivity in a subject search.
const STOP_WORDS: &[&str] = &[
    "a", "al", "con", "de", "del", "el", "en", "la", "las", "los", "o", "para",
    "por", "que", "se", "sin", "su", "un", "una", "y",
];

/// Maximum number of significant words used verbatim in the all-words
/// alternative before the compiler adds a first-three-words fallback.
const MAX_SIGNIFICANT_WORDS: usize = 3;

/// Characters the mail protocol's quoted literals cannot carry. Profile
/// validation rejects these up front; the compiler strips them anyway so a
/// stale persisted profile still compiles to something usable.
const UNSUPPORTED_CHARS: &[char] = &['\\', '\n', '\r', '\t'];

/// Compile a search phrase into a filter with a lower date bound.
///
/// The fallback ladder, most specific first:
/// 1. no internal whitespace: exact phrase AND date bound;
/// 2. one significant word: that word AND date bound;
/// 3. two or three significant words: `(phrase) OR (all words)` AND date;
/// 4. more than three: a first-three-words alternative is OR'd in as well;
/// 5. nothing significant survives: all words of length >= 2, then the date
///    bound alone.
///
/// Deterministic for the same input; identical phrases always yield identical
/// filters.
#[must_use]
pub fn compile(criteria: &str, since: NaiveDate) -> FilterExpr {
    let phrase = normalize(criteria);
    let date_bound = FilterExpr::Since(since);

    if phrase.is_empty() {
        return date_bound;
    }

    if !phrase.contains(' ') {
        return FilterExpr::And(vec![FilterExpr::Subject(phrase), date_bound]);
    }

    let words = significant_words(&phrase);
    debug!(phrase = %phrase, words = ?words, "compiled significant words");

    match words.len() {
        0 => date_bound,
        1 => FilterExpr::And(vec![
            FilterExpr::Subject(words[0].clone()),
            date_bound,
        ]),
        n => {
            let phrase_alt = FilterExpr::Subject(phrase);
            let all_words = FilterExpr::And(
                words.iter().cloned().map(FilterExpr::Subject).collect(),
            );

            let alternatives = if n > MAX_SIGNIFICANT_WORDS {
                // Long noisy phrases also get a first-three-words alternative
                // to keep matching tractable.
                let first_three = FilterExpr::And(
                    words[..MAX_SIGNIFICANT_WORDS]
                        .iter()
                        .cloned()
                        .map(FilterExpr::Subject)
                        .collect(),
                );
                FilterExpr::Or(
                    Box::new(phrase_alt),
                    Box::new(FilterExpr::Or(
                        Box::new(all_words),
                        Box::new(first_three),
                    )),
                )
            } else {
                FilterExpr::Or(Box::new(phrase_alt), Box::new(all_words))
            };

            FilterExpr::And(vec![alternatives, date_bound])
        }
    }
}

/// Trim the phrase and strip characters the protocol cannot carry in a
/// quoted literal, collapsing runs of whitespace to single spaces.
fn normalize(criteria: &str) -> String {
    let stripped: String = criteria
        .chars()
        .filter(|c| !UNSUPPORTED_CHARS.contains(c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split the phrase into words, dropping stop words and words shorter than
/// two characters. When filtering removes everything, falls back to all
/// words of length >= 2 so the phrase still constrains the search.
fn significant_words(phrase: &str) -> Vec<String> {
    let candidates: Vec<&str> = phrase
        .split_whitespace()
        .filter(|w| w.chars().count() >= 2)
        .collect();

    let filtered: Vec<String> = candidates
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .map(|w| (*w).to_string())
        .collect();

    if filtered.is_empty() {
        candidates.into_iter().map(str::to_string).collect()
    } else {
        filtered
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn since() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn single_word_requires_exact_phrase() {
        let expr = compile("Factura", since());
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::Subject("Factura".to_string()),
                FilterExpr::Since(since()),
            ])
        );
    }

    #[test]
    fn phrase_without_spaces_keeps_punctuation() {
        let expr = compile("[URGENTE]", since());
        assert_eq!(expr.to_query(), "(SUBJECT \"[URGENTE]\" SINCE \"01-Jan-2024\")");
    }

    #[test]
    fn two_words_compile_to_phrase_or_all_words() {
        let expr = compile("Pedido Confirmacion", since());
        let query = expr.to_query();
        assert!(query.contains("OR SUBJECT \"Pedido Confirmacion\""));
        assert!(query.contains("(SUBJECT \"Pedido\" SUBJECT \"Confirmacion\")"));
        assert!(query.contains("SINCE \"01-Jan-2024\""));
    }

    #[test]
    fn approximate_match_tolerates_surrounding_text() {
        let expr = compile("Pedido Confirmacion", since());
        assert!(expr.matches(
            "RE: Pedido urgente Confirmacion 2024-01-01",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        ));
    }

    #[test]
    fn stop_words_are_dropped() {
        let expr = compile("Estado de Cuenta", since());
        let query = expr.to_query();
        assert!(query.contains("SUBJECT \"Estado\" SUBJECT \"Cuenta\""));
        assert!(!query.contains("SUBJECT \"de\""));
    }

    #[test]
    fn all_stop_words_falls_back_to_all_words() {
        // Every word is a stop word, so the filter keeps them all rather
        // than degrading to a date-only search.
        let expr = compile("de la con", since());
        let query = expr.to_query();
        assert!(query.contains("SUBJECT \"de\""));
        assert!(query.contains("SUBJECT \"la\""));
    }

    #[test]
    fn one_surviving_word_skips_the_or() {
        let expr = compile("de Factura", since());
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::Subject("Factura".to_string()),
                FilterExpr::Since(since()),
            ])
        );
    }

    #[test]
    fn long_phrase_adds_first_three_words_alternative() {
        let expr = compile("Informe Ventas Trimestre Region Norte", since());
        let query = expr.to_query();
        // Full phrase, all five words, and first three words.
        assert!(query.contains("SUBJECT \"Informe Ventas Trimestre Region Norte\""));
        assert!(query.contains(
            "(SUBJECT \"Informe\" SUBJECT \"Ventas\" SUBJECT \"Trimestre\" \
             SUBJECT \"Region\" SUBJECT \"Norte\")"
        ));
        assert!(query.contains("(SUBJECT \"Informe\" SUBJECT \"Ventas\" SUBJECT \"Trimestre\")"));
    }

    #[test]
    fn unsupported_chars_are_stripped() {
        let expr = compile("Factura\tMensual\n", since());
        let query = expr.to_query();
        assert!(!query.contains('\t'));
        assert!(!query.contains('\n'));
        assert!(query.contains("SUBJECT \"FacturaMensual\""));
    }

    #[test]
    fn empty_phrase_degrades_to_date_bound() {
        assert_eq!(compile("   ", since()), FilterExpr::Since(since()));
        assert_eq!(compile("", since()), FilterExpr::Since(since()));
    }

    #[test]
    fn whitespace_runs_collapse() {
        let expr = compile("  Pedido   Confirmacion  ", since());
        assert!(expr.to_query().contains("SUBJECT \"Pedido Confirmacion\""));
    }

    proptest! {
        #[test]
        fn compilation_is_deterministic(phrase in "[a-zA-Z ]{0,60}") {
            let first = compile(&phrase, since());
            let second = compile(&phrase, since());
            prop_assert_eq!(first.to_query(), second.to_query());
        }

        #[test]
        fn compiled_filter_always_keeps_date_bound(phrase in "[a-zA-Z ]{0,60}") {
            let query = compile(&phrase, since()).to_query();
            prop_assert!(query.contains("SINCE \"01-Jan-2024\""));
        }
    }
}
