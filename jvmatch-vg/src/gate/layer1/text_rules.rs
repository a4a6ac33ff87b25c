// Layer 1: Free-Text and Metric Rules
//
// Free-text claims (company, what_you_do, bio, ...) are bounded by length and
// screened for placeholders and values that belong in another column. Audience
// metrics are parsed into a canonical integer.

use super::patterns::{EMAIL_IN_TEXT, PHONE_LIKE, PLACEHOLDER_TEXT, WHOLE_URL};
use crate::config::Layer1Config;
use crate::gate::reasons;
use crate::types::{FieldName, FieldVerdict, VerificationLayer};
use serde_json::Value;

const LAYER: VerificationLayer = VerificationLayer::Deterministic;

/// Free text bounded to `min_len..=max_len` characters
///
/// Checks run in order: placeholder, field swap, dump, thin content.
pub fn check_free_text(
    field: FieldName,
    value: &str,
    min_len: usize,
    max_len: usize,
    config: &Layer1Config,
) -> FieldVerdict {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if PLACEHOLDER_TEXT.is_match(trimmed) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: '{}' is not real content", reasons::PLACEHOLDER, trimmed),
        )
        .clearing();
    }

    if let Some(kind) = swapped_value_kind(trimmed) {
        let label = field.to_string();
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: {} in {} column", reasons::FIELD_SWAP, kind, label),
        )
        .clearing();
    }

    if len > max_len {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: {} characters exceeds {}", reasons::SUSPECTED_DUMP, len, max_len),
        )
        .clearing();
    }

    if len < min_len {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: {} characters, expected at least {}", reasons::THIN_CONTENT, len, min_len),
        );
    }

    FieldVerdict::pass(field, LAYER, 1.0, format!("{} text", reasons::VALID))
}

/// Contact data sitting in a free-text column
fn swapped_value_kind(text: &str) -> Option<&'static str> {
    if EMAIL_IN_TEXT.is_match(text) {
        Some("email address")
    } else if WHOLE_URL.is_match(text) {
        Some("URL")
    } else if PHONE_LIKE.is_match(text) {
        Some("phone number")
    } else {
        None
    }
}

/// Audience metric: JSON number or `"12,500"` / `"12.5k"` / `"1.2M"`
pub fn check_metric(field: FieldName, value: &Value, config: &Layer1Config) -> FieldVerdict {
    let parsed = match value {
        Value::Number(n) => parse_json_number(n),
        Value::String(s) => parse_metric_text(s),
        other => Err(format!("expected a number, got {}", json_type_name(other))),
    };

    let count = match parsed {
        Ok(count) => count,
        Err(detail) => {
            return FieldVerdict::fail(field, LAYER, format!("{}: {}", reasons::INVALID_FORMAT, detail))
                .clearing();
        }
    };

    if count > config.max_metric {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: {} exceeds {}", reasons::IMPLAUSIBLE, count, config.max_metric),
        )
        .clearing();
    }

    if count == 0 {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: zero audience", reasons::PLACEHOLDER),
        );
    }

    let verdict = FieldVerdict::pass(field, LAYER, 1.0, format!("{} metric", reasons::VALID));
    match value {
        Value::String(s) if s.trim() != count.to_string() => verdict.with_auto_fix(count.to_string()),
        _ => verdict,
    }
}

fn parse_json_number(n: &serde_json::Number) -> Result<u64, String> {
    if let Some(count) = n.as_u64() {
        return Ok(count);
    }
    if n.as_i64().is_some_and(|i| i < 0) {
        return Err(format!("negative count {}", n));
    }
    match n.as_f64() {
        Some(f) if f < 0.0 => Err(format!("negative count {}", n)),
        Some(f) if f.fract() != 0.0 => Err(format!("fractional count {}", n)),
        Some(f) if f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(format!("unrepresentable count {}", n)),
    }
}

/// Integer arithmetic throughout, so `"1.1k"` is exactly 1100
fn parse_metric_text(text: &str) -> Result<u64, String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    if cleaned.starts_with('-') {
        return Err(format!("negative count '{}'", text.trim()));
    }

    let (number, multiplier) = match cleaned.strip_suffix('k') {
        Some(rest) => (rest, 1_000u64),
        None => match cleaned.strip_suffix('m') {
            Some(rest) => (rest, 1_000_000u64),
            None => (cleaned.as_str(), 1u64),
        },
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(format!("'{}' is not a count", text.trim()));
    }

    let overflow = || format!("'{}' is out of range", text.trim());
    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut total = whole_value.checked_mul(multiplier).ok_or_else(overflow)?;

    let fraction = fraction.trim_end_matches('0');
    if !fraction.is_empty() {
        let scale = 10u64
            .checked_pow(fraction.len() as u32)
            .ok_or_else(overflow)?;
        let digits: u64 = fraction.parse().map_err(|_| overflow())?;
        let scaled = digits.checked_mul(multiplier).ok_or_else(overflow)?;
        if scaled % scale != 0 {
            return Err(format!("fractional count '{}'", text.trim()));
        }
        total = total.checked_add(scaled / scale).ok_or_else(overflow)?;
    }

    Ok(total)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
