//! Lenient normalization of scraped values.
//!
//! Source markup and payloads are not guaranteed stable, so numeric fields
//! never fail a row: a missing or non-numeric value becomes `0`. Every such
//! fallback is counted so the resulting record can be flagged as degraded.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLAYER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)$").expect("player label pattern"));

/// Split a `"Name (License)"` label into name and license.
///
/// Labels without a trailing parenthetical yield the whole trimmed label as the
/// name and an empty license.
pub fn parse_player_label(label: &str) -> (String, String) {
    let label = label.trim();
    match PLAYER_LABEL.captures(label) {
        Some(caps) => (caps[1].trim().to_string(), caps[2].to_string()),
        None => (label.to_string(), String::new()),
    }
}

/// Base-10 integer prefix of `text`, the way a browser's `parseInt` reads it:
/// leading whitespace and sign are accepted, parsing stops at the first
/// non-digit, and text without leading digits has no value.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Round number from a listing cell; anything unparseable or negative is round 0
pub fn parse_round(text: &str) -> u32 {
    parse_leading_int(text).and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
}

/// Accumulates lenient integer parses and remembers whether any of them fell
/// back to zero.
#[derive(Debug, Default)]
pub struct LenientInts {
    fallbacks: usize,
}

impl LenientInts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer from rendered cell text
    pub fn read_text(&mut self, text: Option<&str>) -> i32 {
        let parsed = text.and_then(parse_leading_int).and_then(|n| i32::try_from(n).ok());
        self.settle(parsed)
    }

    /// Integer from a JSON payload field
    pub fn read_value(&mut self, value: Option<&Value>) -> i32 {
        let parsed = value.and_then(value_as_i64).and_then(|n| i32::try_from(n).ok());
        self.settle(parsed)
    }

    /// True if any parse so far fell back to zero
    pub fn degraded(&self) -> bool {
        self.fallbacks > 0
    }

    fn settle(&mut self, parsed: Option<i32>) -> i32 {
        parsed.unwrap_or_else(|| {
            self.fallbacks += 1;
            0
        })
    }
}

/// Integer view of a JSON value; numeric strings are accepted
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// String view of a JSON scalar; numbers are rendered in base 10
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
