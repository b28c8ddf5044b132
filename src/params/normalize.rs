//! Canonical identifier keys for fuzzy comparison of parameters and files

use serde::{Deserialize, Serialize};

const PARAM_PREFIX: &str = "#fp-";

/// Extension tokens stripped from the end of a key, longest first
const EXTENSION_TOKENS: [&str; 4] = ["geojson", "json", "csv", "txt"];

/// How aggressively two identifiers are folded together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrictness {
    /// Prefix, case, punctuation and extension are ignored
    Exact,
    /// As `Exact`, and one trailing digit is also ignored
    #[default]
    IgnoreVersionDigit,
}

/// Reduce an identifier or file name to its canonical key.
///
/// `#fp-Transect_Time_Series_csv` and `transect_time_series.csv` both
/// become `transecttimeseries`.
pub fn normalize_identifier(raw: &str, strictness: MatchStrictness) -> String {
    let text = match raw.get(..PARAM_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PARAM_PREFIX) => &raw[PARAM_PREFIX.len()..],
        _ => raw,
    };

    let mut key: String = text
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if let Some(token) = EXTENSION_TOKENS.iter().find(|t| key.ends_with(*t)) {
        key.truncate(key.len() - token.len());
    }

    if strictness == MatchStrictness::IgnoreVersionDigit
        && key.chars().last().is_some_and(|c| c.is_ascii_digit())
    {
        key.pop();
    }

    key
}

/// True when both identifiers reduce to the same canonical key
pub fn is_fuzzy_match(a: &str, b: &str, strictness: MatchStrictness) -> bool {
    normalize_identifier(a, strictness) == normalize_identifier(b, strictness)
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Identifier of an unversioned notebook-local parameter
pub fn local_parameter_id(basename: &str) -> String {
    format!("{}{}", PARAM_PREFIX, sanitize_key(basename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parameter_and_file_name_share_a_key() {
        let strict = MatchStrictness::Exact;
        assert_eq!(
            normalize_identifier("#fp-transect_time_series_csv", strict),
            "transecttimeseries"
        );
        assert_eq!(
            normalize_identifier("transect_time_series.csv", strict),
            "transecttimeseries"
        );
    }

    #[test]
    fn geojson_is_stripped_whole() {
        assert_eq!(
            normalize_identifier("shoreline.geojson", MatchStrictness::Exact),
            "shoreline"
        );
    }

    #[test]
    fn only_one_extension_token_is_stripped() {
        assert_eq!(normalize_identifier("a.csv.csv", MatchStrictness::Exact), "acsv");
    }

    #[test]
    fn xlsx_is_kept() {
        assert_eq!(normalize_identifier("nzd0001.xlsx", MatchStrictness::Exact), "nzd0001xlsx");
    }

    #[test]
    fn trailing_digit_depends_on_strictness() {
        assert!(!is_fuzzy_match("#fp-transects-1", "transects.csv", MatchStrictness::Exact));
        assert!(is_fuzzy_match(
            "#fp-transects-1",
            "transects.csv",
            MatchStrictness::IgnoreVersionDigit
        ));
    }

    #[test]
    fn only_one_digit_is_ignored() {
        assert!(!is_fuzzy_match(
            "#fp-transects-12",
            "transects.csv",
            MatchStrictness::IgnoreVersionDigit
        ));
    }

    #[test]
    fn local_ids_are_sanitised() {
        assert_eq!(local_parameter_id("transect time-series.csv"), "#fp-transect_time-series_csv");
        assert_eq!(local_parameter_id("*.geojson"), "#fp-__geojson");
    }

    fn strictness() -> impl Strategy<Value = MatchStrictness> {
        prop_oneof![
            Just(MatchStrictness::Exact),
            Just(MatchStrictness::IgnoreVersionDigit)
        ]
    }

    proptest! {
        #[test]
        fn fuzzy_match_is_reflexive(s in "[ -~]{0,24}", level in strictness()) {
            prop_assert!(is_fuzzy_match(&s, &s, level));
        }

        #[test]
        fn fuzzy_match_ignores_case(s in "[ -~]{0,24}", level in strictness()) {
            prop_assert!(is_fuzzy_match(&s.to_ascii_uppercase(), &s, level));
            prop_assert!(is_fuzzy_match(&s.to_ascii_lowercase(), &s, level));
        }

        #[test]
        fn fuzzy_match_is_symmetric(a in "[a-z0-9_.]{0,12}", b in "[a-z0-9_.]{0,12}", level in strictness()) {
            prop_assert_eq!(is_fuzzy_match(&a, &b, level), is_fuzzy_match(&b, &a, level));
        }
    }
}
