//! Tolerant timestamp parsing.
//!
//! A cell is tried against an ordered list of primary patterns, first match
//! wins. If none match, a fixed list of inference strategies runs as the
//! catch-all. Failure at every step yields `None`, never an error.

use crate::{table::is_missing, types::Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Primary patterns in tie-break order.
pub const DEFAULT_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// One way of turning text into a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Full date and time pattern.
    Pattern(String),
    /// Date-only pattern, read as midnight.
    DateOnly(String),
    /// RFC 3339, offset dropped after conversion to UTC.
    Rfc3339,
}

impl ParseStrategy {
    pub fn attempt(&self, text: &str) -> Option<Timestamp> {
        match self {
            ParseStrategy::Pattern(fmt) => NaiveDateTime::parse_from_str(text, fmt).ok(),
            ParseStrategy::DateOnly(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            ParseStrategy::Rfc3339 => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc()),
        }
    }
}

/// Layouts tried once the primary patterns are exhausted.
fn inference_strategies() -> Vec<ParseStrategy> {
    let patterns = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%m-%d-%Y %H:%M:%S",
        "%m-%d-%Y %H:%M",
        "%d-%b-%Y %H:%M:%S",
        "%d %b %Y %H:%M",
    ];
    let dates = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

    let mut strategies = vec![ParseStrategy::Rfc3339];
    strategies.extend(patterns.iter().map(|p| ParseStrategy::Pattern(p.to_string())));
    strategies.extend(dates.iter().map(|p| ParseStrategy::DateOnly(p.to_string())));
    strategies
}

#[derive(Debug, Clone)]
pub struct TimestampParser {
    primary: Vec<ParseStrategy>,
    inference: Vec<ParseStrategy>,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new(DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl TimestampParser {
    pub fn new(formats: Vec<String>) -> Self {
        Self {
            primary: formats.into_iter().map(ParseStrategy::Pattern).collect(),
            inference: inference_strategies(),
        }
    }

    /// Parse one cell. `None` is the missing marker.
    pub fn parse(&self, raw: &str) -> Option<Timestamp> {
        if is_missing(raw) {
            return None;
        }
        let text = raw.trim();
        self.primary
            .iter()
            .chain(self.inference.iter())
            .find_map(|strategy| strategy.attempt(text))
    }
}
