//! Compiled patterns for Layer 1 rules
//!
//! All patterns are literals, so compiling them cannot fail at runtime.

use once_cell::sync::Lazy;
use regex::Regex;

/// Whole-value email: `local@domain.tld`, at least one dot in the domain, TLD ≥ 2 letters
pub static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@(?:[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Email address anywhere inside a larger text
pub static EMAIL_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@(?:[A-Za-z0-9\-]+\.)+[A-Za-z]{2,}").expect("email-in-text pattern is valid")
});

/// `http(s)://host[:port][/path]`, host captured
pub static HTTP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?)://([^/?#:\s]+)(?::\d{1,5})?(?:[/?#]\S*)?$").expect("url pattern is valid")
});

/// Hostname: dot-separated labels ending in an alphabetic TLD
pub static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?\.)+[a-z]{2,}$").expect("hostname pattern is valid")
});

/// Domain without scheme, optional path (`www.acme.com/about`)
pub static BARE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?\.)+[a-z]{2,}(?:/\S*)?$")
        .expect("bare domain pattern is valid")
});

/// Any scheme-qualified URL as the entire value
pub static WHOLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://\S+$").expect("whole url pattern is valid"));

/// LinkedIn person or company profile
pub static LINKEDIN_PROFILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)linkedin\.com/(?:in|company)/[A-Za-z0-9\-_%.]+").expect("linkedin pattern is valid")
});

/// Phone: digits and separators, optional `x`/`ext` extension
pub static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<main>\+?[0-9\-. ()]+?)\s*(?:(?:ext\.?|x)\s*(?P<ext>[0-9]{1,6}))?$")
        .expect("phone pattern is valid")
});

/// Whole value that looks like a phone number (used for field-swap detection)
pub static PHONE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\-. ()]{6,}$").expect("phone-like pattern is valid"));

/// Placeholder phrases an extractor emits instead of data
pub static PLACEHOLDER_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:n/?a|none|null|nil|unknown|not (?:available|found|provided)|tbd|tba|-+|\?+|lorem ipsum.*|\[.*\]|<.*>|\{.*\})$")
        .expect("placeholder pattern is valid")
});

/// Email domains and URL hosts that never resolve publicly (RFC 2606 / 6761)
pub fn is_reserved_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    const RESERVED_NAMES: [&str; 4] = ["example.com", "example.org", "example.net", "localhost"];
    const RESERVED_SUFFIXES: [&str; 5] = [".test", ".example", ".invalid", ".localhost", ".local"];

    RESERVED_NAMES.iter().any(|name| host == *name || host.ends_with(&format!(".{}", name)))
        || RESERVED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}
