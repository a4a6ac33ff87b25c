// Layer 1: Contact Field Rules
//
// Rules for the contactability fields (email, phone, website, booking link,
// LinkedIn). Failures here on a critical field quarantine the whole record, so
// every FAIL carries a reason phrase from `gate::reasons` and a clearing auto-fix.

use super::patterns::{
    is_reserved_host, BARE_DOMAIN, EMAIL, HOSTNAME, HTTP_URL, LINKEDIN_PROFILE, PHONE,
};
use crate::config::Layer1Config;
use crate::gate::reasons;
use crate::types::{FieldName, FieldVerdict, VerificationLayer};

const LAYER: VerificationLayer = VerificationLayer::Deterministic;

/// Email: format, then reserved domain, placeholder local-part, disposable domain
///
/// Only a regex failure is a FAIL; every well-formed address is PASS or SUSPICIOUS.
pub fn check_email(field: FieldName, value: &str, config: &Layer1Config) -> FieldVerdict {
    if !EMAIL.is_match(value) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: '{}' is not local@domain.tld", reasons::INVALID_FORMAT, value),
        )
        .clearing();
    }

    // Regex guarantees exactly one '@'
    let (local, domain) = value.split_once('@').unwrap_or((value, ""));
    let domain = domain.to_ascii_lowercase();

    // Well-formed but non-routable: a placeholder address, left for Layer 3 or retry
    if is_reserved_host(&domain) {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: {} will not resolve", reasons::RESERVED_DOMAIN, domain),
        );
    }

    if is_placeholder_local_part(local, &config.suspicious_local_parts) {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: role or placeholder local-part '{}'", reasons::PLACEHOLDER, local),
        );
    }

    if config
        .disposable_domains
        .iter()
        .any(|d| domain == d.to_ascii_lowercase())
    {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: {}", reasons::DISPOSABLE_MAILBOX, domain),
        );
    }

    FieldVerdict::pass(field, LAYER, 1.0, format!("{} email", reasons::VALID))
}

/// `info`, `info2`, `support+jv` all count as the role address `info`/`support`
fn is_placeholder_local_part(local: &str, suspicious: &[String]) -> bool {
    let base = local.split('+').next().unwrap_or(local).to_ascii_lowercase();
    let base = base.trim_end_matches(|c: char| c.is_ascii_digit());
    suspicious.iter().any(|s| base == s.to_ascii_lowercase())
}

/// Phone: allowed characters, 7–15 digits, placeholder number patterns
pub fn check_phone(field: FieldName, value: &str, config: &Layer1Config) -> FieldVerdict {
    let trimmed = value.trim();
    let Some(caps) = PHONE.captures(trimmed) else {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: '{}' contains characters not used in phone numbers", reasons::INVALID_FORMAT, trimmed),
        )
        .clearing();
    };

    let main = caps.name("main").map(|m| m.as_str()).unwrap_or("");
    let digits: String = main.chars().filter(|c| c.is_ascii_digit()).collect();

    if !(7..=15).contains(&digits.len()) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: {} digits, expected 7-15", reasons::INVALID_FORMAT, digits.len()),
        )
        .clearing();
    }

    if let Some(pattern) = placeholder_phone_pattern(&digits) {
        return FieldVerdict::suspicious(
            field,
            LAYER,
            config.suspicious_confidence,
            format!("{}: {} phone number", reasons::PLACEHOLDER, pattern),
        );
    }

    FieldVerdict::pass(field, LAYER, 1.0, format!("{} phone", reasons::VALID))
}

fn placeholder_phone_pattern(digits: &str) -> Option<&'static str> {
    let bytes = digits.as_bytes();

    if bytes.iter().all(|b| *b == bytes[0]) {
        return Some("repeated-digit");
    }

    // Ascending run, wrapping 9 -> 0 ("1234567890")
    if bytes.windows(2).all(|w| (w[0] - b'0' + 1) % 10 == w[1] - b'0') {
        return Some("sequential");
    }

    // North American fictional range 555-0100..555-0199
    let national = if digits.len() == 11 && digits.starts_with('1') {
        &digits[1..]
    } else {
        digits
    };
    if national.len() == 10 && &national[3..6] == "555" && &national[6..8] == "01" {
        return Some("fictional 555-01xx");
    }

    None
}

/// Website / booking link: scheme, host shape, reserved host, column swaps
pub fn check_url(field: FieldName, value: &str, config: &Layer1Config) -> FieldVerdict {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    let label = field.to_string();

    if EMAIL.is_match(trimmed) || lower.starts_with("mailto:") {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: email address in {} column", reasons::FIELD_SWAP, label),
        )
        .clearing();
    }

    if lower.contains("linkedin.com/") {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: LinkedIn URL in {} column", reasons::FIELD_SWAP, label),
        )
        .clearing();
    }

    let Some(caps) = HTTP_URL.captures(trimmed) else {
        if BARE_DOMAIN.is_match(trimmed) {
            return FieldVerdict::suspicious(
                field,
                LAYER,
                config.suspicious_confidence,
                format!("{}: '{}'", reasons::MISSING_SCHEME, trimmed),
            )
            .with_auto_fix(format!("https://{}", trimmed));
        }
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: '{}' is not an http(s) URL", reasons::INVALID_FORMAT, trimmed),
        )
        .clearing();
    };

    let scheme = caps[1].to_ascii_lowercase();
    let host = caps[2].to_ascii_lowercase();

    if !HOSTNAME.is_match(&host) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: '{}' is not a valid host", reasons::INVALID_FORMAT, host),
        )
        .clearing();
    }

    if is_reserved_host(&host) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: {} will not resolve", reasons::RESERVED_DOMAIN, host),
        )
        .clearing();
    }

    if scheme == "http" {
        return FieldVerdict::pass(
            field,
            LAYER,
            config.insecure_url_confidence,
            format!("{} (soft warning)", reasons::INSECURE_URL),
        );
    }

    FieldVerdict::pass(field, LAYER, 1.0, format!("{} URL", reasons::VALID))
}

/// LinkedIn: must point at a person (`/in/`) or company (`/company/`) profile
pub fn check_linkedin(field: FieldName, value: &str) -> FieldVerdict {
    let trimmed = value.trim();

    if EMAIL.is_match(trimmed) {
        return FieldVerdict::fail(
            field,
            LAYER,
            format!("{}: email address in LinkedIn column", reasons::FIELD_SWAP),
        )
        .clearing();
    }

    if LINKEDIN_PROFILE.is_match(trimmed) {
        return FieldVerdict::pass(field, LAYER, 1.0, format!("{} LinkedIn profile", reasons::VALID));
    }

    FieldVerdict::fail(
        field,
        LAYER,
        format!(
            "{}: '{}' is not a linkedin.com/in/ or linkedin.com/company/ URL",
            reasons::INVALID_FORMAT,
            trimmed
        ),
    )
    .clearing()
}
