// Layer 2: Key-Phrase Extraction
//
// Last-resort grounding: when the quote itself cannot be found, check whether
// the distinctive tokens of the claimed value appear in the source at all.

use std::collections::HashSet;

/// Words never treated as salient even when capitalized or long
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "each", "every", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "him", "his", "how", "i", "if", "in", "into", "is",
    "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "of", "on", "once",
    "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "you", "your", "yours", "everything", "something", "anything", "business", "businesses",
    "company", "companies", "including", "helping", "working", "currently",
];

/// Minimum length of an uncapitalized word to count as salient
const LONG_WORD_LEN: usize = 7;

/// Split text into lowercase tokens, trimming surrounding punctuation
///
/// Inner `@`, `.`, `-`, `'` and `/` are kept so emails, domains and hyphenated
/// words stay whole.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(trim_token)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn trim_token(raw: &str) -> &str {
    raw.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_stopword(lower: &str) -> bool {
    STOPWORDS.contains(&lower)
}

/// Emails and domains are matched as one token
fn is_address_like(token: &str) -> bool {
    token.contains('@')
        || token
            .split_once('.')
            .is_some_and(|(left, right)| !left.is_empty() && right.chars().any(char::is_alphabetic))
}

/// Distinctive tokens of a claimed value, lowercased and de-duplicated
///
/// Salient when any of:
/// - email or domain
/// - contains a digit (`2019`, `10k`, `B2B`)
/// - capitalized non-stopword (`Shopify`, `Toronto`)
/// - non-stopword of at least 7 characters
pub fn salient_tokens(value: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for raw in value.split_whitespace() {
        let token = trim_token(raw);
        if token.is_empty() {
            continue;
        }
        let lower = token.to_lowercase();
        if is_stopword(&lower) {
            continue;
        }

        let salient = is_address_like(&lower)
            || token.chars().any(|c| c.is_ascii_digit())
            || (token.chars().next().is_some_and(char::is_uppercase) && token.chars().count() >= 2)
            || token.chars().count() >= LONG_WORD_LEN;

        if salient && seen.insert(lower.clone()) {
            tokens.push(lower);
        }
    }

    tokens
}

/// Fraction of `tokens` present verbatim (case-insensitive) in `source`
///
/// Plain words must match a whole source token; emails and domains may appear
/// anywhere in the source. Returns 0.0 for an empty token list.
pub fn overlap_fraction(tokens: &[String], source: &str) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }

    let lowered = source.to_lowercase();
    let source_tokens: HashSet<String> = tokenize(source).into_iter().collect();

    let found = tokens
        .iter()
        .filter(|t| source_tokens.contains(*t) || (is_address_like(t) && lowered.contains(t.as_str())))
        .count();

    found as f64 / tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salient_tokens() {
        let tokens = salient_tokens("I help Shopify founders scale to $10k months via podcasting.");
        assert_eq!(tokens, vec!["shopify", "founders", "10k", "podcasting"]);
    }

    #[test]
    fn test_stopwords_never_salient() {
        assert!(salient_tokens("The Business of Everything").is_empty());
    }

    #[test]
    fn test_addresses_stay_whole() {
        let tokens = salient_tokens("Email jane@acme.io or visit acme.io.");
        assert!(tokens.contains(&"jane@acme.io".to_string()));
        assert!(tokens.contains(&"acme.io".to_string()));
    }

    #[test]
    fn test_overlap_fraction() {
        let tokens = salient_tokens("Shopify growth consultant in Toronto");
        let fraction = overlap_fraction(&tokens, "Jane is a consultant based in toronto.");
        assert_eq!(tokens, vec!["shopify", "consultant", "toronto"]);
        assert!((fraction - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_whole_token_match_for_words() {
        let tokens = vec!["ai".to_string()];
        assert_eq!(overlap_fraction(&tokens, "she said so"), 0.0);
        assert_eq!(overlap_fraction(&tokens, "Applied AI, daily"), 1.0);
    }

    #[test]
    fn test_empty_tokens_zero() {
        assert_eq!(overlap_fraction(&[], "anything"), 0.0);
    }
}
