//! Record normalization.
//!
//! Raw tabular rows arrive as loosely-typed string maps. This module coerces
//! them into [`NormalizedRecord`]s, derives the impact metric and drops rows
//! that cannot contribute to the terrain.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::FALLBACK_GENRE;

pub const TITLE_FIELDS: &[&str] = &["Title", "title"];
pub const GROSS_FIELDS: &[&str] = &["Worldwide_Gross", "Gross"];
pub const ROI_FIELDS: &[&str] = &["Profit_Margin_Pct", "ROI", "Return"];
pub const RATING_FIELDS: &[&str] = &["IMDb_Rating", "rating"];
pub const YEAR_FIELDS: &[&str] = &["Year"];
pub const GENRE_FIELDS: &[&str] = &["Main_Genre", "Genre"];

const UNTITLED: &str = "Untitled";

/// Raw ROI values at or below this are read as ratios rather than percentages.
pub const ROI_RATIO_LIMIT: f64 = 3.0;

/// One untyped row from a tabular source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// First non-blank value among `aliases`.
    ///
    /// Exact names are tried first, in alias order; then the same aliases are
    /// matched ignoring ASCII case.
    pub fn lookup(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|alias| {
                self.fields
                    .get(*alias)
                    .filter(|v| !v.trim().is_empty())
            })
            .or_else(|| {
                aliases.iter().find_map(|alias| {
                    self.fields
                        .iter()
                        .find(|(k, v)| k.eq_ignore_ascii_case(alias) && !v.trim().is_empty())
                        .map(|(_, v)| v)
                })
            })
            .map(|v| v.trim())
    }
}

/// A cleaned, typed record with its derived impact.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub gross: f64,
    /// Return on investment as a percentage.
    pub roi: f64,
    pub rating: f64,
    pub year: i32,
    pub genre: String,
    pub impact: f64,
}

impl NormalizedRecord {
    /// Build a record from already-typed values, deriving impact.
    pub fn new(
        title: impl Into<String>,
        gross: f64,
        roi: f64,
        rating: f64,
        year: i32,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            gross,
            roi,
            rating,
            year,
            genre: genre.into(),
            impact: impact(rating, roi, gross),
        }
    }

    pub fn from_raw(raw: &RawRecord) -> Self {
        let title = raw.lookup(TITLE_FIELDS).unwrap_or(UNTITLED);
        let gross = raw.lookup(GROSS_FIELDS).map(coerce_number).unwrap_or(0.0);
        let roi = raw
            .lookup(ROI_FIELDS)
            .map(|v| normalize_roi(coerce_number(v)))
            .unwrap_or(0.0);
        let rating = raw.lookup(RATING_FIELDS).map(coerce_number).unwrap_or(0.0);
        let year = raw.lookup(YEAR_FIELDS).map(parse_year).unwrap_or(0);
        let genre = raw
            .lookup(GENRE_FIELDS)
            .map(primary_genre)
            .unwrap_or(FALLBACK_GENRE);

        Self::new(title, gross, roi, rating, year, genre)
    }

    /// Whether the record can contribute to the terrain.
    pub fn is_valid(&self) -> bool {
        self.rating > 0.0 && self.roi > 0.0 && self.gross > 0.0 && self.year > 0
    }
}

/// `rating * roi * sqrt(max(0, gross))`
pub fn impact(rating: f64, roi: f64, gross: f64) -> f64 {
    rating * roi * gross.max(0.0).sqrt()
}

fn non_numeric() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\d.\-]").expect("static pattern"))
}

/// Best-effort numeric coercion: strip everything but digits, `.` and `-`,
/// then parse. Anything unparseable becomes 0.
pub fn coerce_number(raw: &str) -> f64 {
    let cleaned = non_numeric().replace_all(raw, "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Resolve the ratio-vs-percentage ambiguity of ROI columns.
///
/// Values in `(0, 3]` are ratios and get scaled to percent; everything else is
/// taken as a percentage already. A genuine 2% ROI therefore reads as 200%.
pub fn normalize_roi(value: f64) -> f64 {
    if value > 0.0 && value <= ROI_RATIO_LIMIT {
        value * 100.0
    } else {
        value
    }
}

/// Leading-integer parse: optional sign followed by digits, rest ignored.
pub fn parse_year(raw: &str) -> i32 {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i32>()
        .map(|v| sign * v)
        .unwrap_or(0)
}

/// First `/`-separated segment of a genre string, e.g. "Action/Adventure" -> "Action".
pub fn primary_genre(raw: &str) -> &str {
    let first = raw.split('/').next().unwrap_or("").trim();
    if first.is_empty() {
        FALLBACK_GENRE
    } else {
        first
    }
}

/// Normalize every raw record and keep the valid ones, in input order.
pub fn normalize_records(raw: &[RawRecord]) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> = raw
        .iter()
        .map(NormalizedRecord::from_raw)
        .filter(NormalizedRecord::is_valid)
        .collect();

    let dropped = raw.len() - records.len();
    if dropped > 0 {
        log::debug!(
            "Dropped {} of {} records (missing rating, ROI, gross or year)",
            dropped,
            raw.len()
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_normalize_roi() {
        assert_eq!(normalize_roi(1.6), 160.0);
        assert_eq!(normalize_roi(160.0), 160.0);
        assert_eq!(normalize_roi(0.0), 0.0);
        assert_eq!(normalize_roi(3.0), 300.0);
        assert_eq!(normalize_roi(3.01), 3.01);
        assert_eq!(normalize_roi(-1.0), -1.0);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number("$1,234,567"), 1_234_567.0);
        assert_eq!(coerce_number("7.8/10"), 7.81);
        assert_eq!(coerce_number("-12.5%"), -12.5);
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("n/a"), 0.0);
        assert_eq!(coerce_number("1.2.3"), 0.0);
        assert_eq!(coerce_number("-"), 0.0);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2010"), 2010);
        assert_eq!(parse_year(" 2010 "), 2010);
        assert_eq!(parse_year("2010.7"), 2010);
        assert_eq!(parse_year("2019 (re-release)"), 2019);
        assert_eq!(parse_year("c. 2019"), 0);
        assert_eq!(parse_year(""), 0);
        assert_eq!(parse_year("-5"), -5);
    }

    #[test]
    fn test_primary_genre() {
        assert_eq!(primary_genre("Action/Adventure"), "Action");
        assert_eq!(primary_genre("Drama"), "Drama");
        assert_eq!(primary_genre(" Sci-Fi / Thriller"), "Sci-Fi");
        assert_eq!(primary_genre("/Drama"), "Other");
    }

    #[test]
    fn test_from_raw_full_record() {
        let r = NormalizedRecord::from_raw(&film(&[
            ("Title", "Avatar"),
            ("Worldwide_Gross", "2847246203"),
            ("Profit_Margin_Pct", "160"),
            ("IMDb_Rating", "7.8"),
            ("Year", "2009"),
            ("Main_Genre", "Sci-Fi/Adventure"),
        ]));
        assert_eq!(r.title, "Avatar");
        assert_eq!(r.gross, 2_847_246_203.0);
        assert_eq!(r.roi, 160.0);
        assert_eq!(r.rating, 7.8);
        assert_eq!(r.year, 2009);
        assert_eq!(r.genre, "Sci-Fi");
        assert_eq!(r.impact, r.rating * r.roi * r.gross.max(0.0).sqrt());
        assert!(r.is_valid());
    }

    #[test]
    fn test_from_raw_aliases_and_defaults() {
        let r = NormalizedRecord::from_raw(&film(&[
            ("title", "Lowercase"),
            ("Gross", "1000"),
            ("ROI", "1.5"),
            ("rating", "6"),
            ("Year", "2001"),
        ]));
        assert_eq!(r.title, "Lowercase");
        assert_eq!(r.gross, 1000.0);
        assert_eq!(r.roi, 150.0);
        assert_eq!(r.genre, "Other");

        let r = NormalizedRecord::from_raw(&film(&[("Return", "250"), ("GENRE", "Horror")]));
        assert_eq!(r.title, "Untitled");
        assert_eq!(r.roi, 250.0);
        assert_eq!(r.genre, "Horror");
        assert_eq!(r.gross, 0.0);
        assert_eq!(r.year, 0);
        assert!(!r.is_valid());
    }

    #[test]
    fn test_lookup_prefers_first_non_blank_alias() {
        let raw = film(&[("Worldwide_Gross", "  "), ("Gross", "42"), ("gross", "7")]);
        assert_eq!(raw.lookup(GROSS_FIELDS), Some("42"));

        let raw = film(&[("WORLDWIDE_GROSS", "9")]);
        assert_eq!(raw.lookup(GROSS_FIELDS), Some("9"));
        assert_eq!(raw.lookup(TITLE_FIELDS), None);
    }

    #[test]
    fn test_normalize_records_filters_invalid() {
        let raw = vec![
            film(&[
                ("Title", "Kept"),
                ("Gross", "100"),
                ("ROI", "200"),
                ("rating", "7"),
                ("Year", "2000"),
            ]),
            film(&[("Title", "No rating"), ("Gross", "100"), ("ROI", "200"), ("Year", "2000")]),
            film(&[("Title", "Loss"), ("Gross", "100"), ("ROI", "-20"), ("rating", "7"), ("Year", "2000")]),
            film(&[("Title", "No year"), ("Gross", "100"), ("ROI", "200"), ("rating", "7")]),
            film(&[]),
        ];
        let records = normalize_records(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }

    #[test]
    fn test_impact_invariant() {
        let r = NormalizedRecord::new("A", 1_000_000_000.0, 160.0, 8.0, 2010, "Action");
        assert_eq!(r.impact, 8.0 * 160.0 * 1_000_000_000f64.sqrt());
        assert_eq!(impact(5.0, 100.0, -4.0), 0.0);
    }
}
