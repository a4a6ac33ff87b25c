// Layer 2: Source-Quote Verifier
//
// Concept: A value is only as good as the text it was extracted from. Check that
// the extractor's claimed quote actually occurs in the raw source text.
// Synchronization: Accepts ExtractedField + &[SourceText], outputs FieldVerdict
//
// Stages (first decisive stage wins):
// 1. No quote                      -> UNCHECKED
// 2. No usable source text         -> UNCHECKED
// 3. Exact normalized substring    -> PASS 1.0
// 4. Fuzzy token-window match      -> PASS at the similarity ratio
//    (only windows sharing enough exact tokens with the quote are scored,
//    over at most max_source_tokens tokens per source)
// 5. Key-phrase overlap of value   -> PASS at key_phrase_confidence x overlap
//    otherwise                     -> FAIL at ungrounded_confidence

use super::key_phrases::{overlap_fraction, salient_tokens};
use crate::config::Layer2Config;
use crate::gate::reasons;
use crate::types::{ExtractedField, FieldName, FieldStatus, FieldVerdict, SourceText, VerificationLayer};
use std::collections::HashSet;

const LAYER: VerificationLayer = VerificationLayer::SourceQuote;

/// Lowercase, fold typographic punctuation, drop control/replacement characters,
/// collapse whitespace
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2010}'..='\u{2015}' => '-',
            '\u{00A0}' => ' ',
            '\u{FFFD}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Source text after normalization, with its origin
struct UsableSource<'a> {
    url: Option<&'a str>,
    text: String,
}

impl UsableSource<'_> {
    fn label(&self) -> &str {
        self.url.unwrap_or("source text")
    }
}

/// Source-quote verifier (Layer 2)
///
/// Thresholds come from `[layer2]` configuration.
pub struct SourceQuoteVerifier {
    config: Layer2Config,
}

impl Default for SourceQuoteVerifier {
    fn default() -> Self {
        Self::new(Layer2Config::default())
    }
}

impl SourceQuoteVerifier {
    pub fn new(config: Layer2Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Layer2Config {
        &self.config
    }

    /// Ground one field against the raw source texts
    pub fn verify(&self, field: &FieldName, extracted: &ExtractedField, sources: &[SourceText]) -> FieldVerdict {
        let Some(quote) = extracted.quote() else {
            return FieldVerdict::unchecked(field.clone(), LAYER, reasons::NO_QUOTE);
        };

        let quote = normalize(quote);
        if quote.is_empty() {
            return FieldVerdict::unchecked(field.clone(), LAYER, reasons::NO_QUOTE);
        }

        if sources.iter().all(|s| s.content.trim().is_empty()) {
            return FieldVerdict::unchecked(field.clone(), LAYER, reasons::NO_SOURCE);
        }

        let usable = usable_sources(sources, extracted.source_url.as_deref());
        if usable.is_empty() {
            return FieldVerdict::unchecked(field.clone(), LAYER, reasons::UNUSABLE_SOURCE);
        }

        // Stage 3: exact
        if let Some(source) = usable.iter().find(|s| s.text.contains(&quote)) {
            return FieldVerdict::pass(
                field.clone(),
                LAYER,
                1.0,
                format!("{}: exact quote found in {}", reasons::GROUNDED, source.label()),
            );
        }

        // Stage 4: fuzzy
        let (best_ratio, best_source) = usable
            .iter()
            .map(|s| (best_window_similarity(&quote, &s.text, self.config.max_source_tokens), s))
            .fold((0.0_f64, None), |(best, best_src), (ratio, src)| {
                if ratio > best {
                    (ratio, Some(src))
                } else {
                    (best, best_src)
                }
            });

        if best_ratio >= self.config.fuzzy_threshold {
            let label = best_source.map(UsableSource::label).unwrap_or("source text");
            return FieldVerdict::pass(
                field.clone(),
                LAYER,
                best_ratio,
                format!("{}: fuzzy quote match {:.2} in {}", reasons::GROUNDED, best_ratio, label),
            );
        }

        // Stage 5: key phrases of the claimed value
        let value = extracted.value_text().unwrap_or_default();
        let tokens = salient_tokens(&value);
        if tokens.is_empty() {
            return self.ungrounded(
                field,
                format!("quote not found (best match {:.2}), no key phrases in value", best_ratio),
            );
        }

        let combined = usable.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
        let overlap = overlap_fraction(&tokens, &combined);

        tracing::debug!(
            field = %field,
            best_ratio,
            overlap,
            salient = tokens.len(),
            "Quote not matched; key-phrase fallback"
        );

        if overlap >= self.config.key_phrase_min_overlap {
            return FieldVerdict::pass(
                field.clone(),
                LAYER,
                self.config.key_phrase_confidence * overlap,
                format!(
                    "{}: {:.0}% of key phrases found in source",
                    reasons::GROUNDED,
                    overlap * 100.0
                ),
            );
        }

        self.ungrounded(
            field,
            format!(
                "quote not found (best match {:.2}), {:.0}% of key phrases in source",
                best_ratio,
                overlap * 100.0
            ),
        )
    }

    fn ungrounded(&self, field: &FieldName, detail: String) -> FieldVerdict {
        FieldVerdict::new(
            field.clone(),
            FieldStatus::Fail,
            LAYER,
            self.config.ungrounded_confidence,
            format!("{}: {}", reasons::UNGROUNDED, detail),
        )
    }
}

/// Normalized sources with any text left, the one matching `source_url` first
fn usable_sources<'a>(sources: &'a [SourceText], source_url: Option<&str>) -> Vec<UsableSource<'a>> {
    let mut usable: Vec<UsableSource<'a>> = sources
        .iter()
        .map(|s| UsableSource {
            url: s.url.as_deref(),
            text: normalize(&s.content),
        })
        .filter(|s| s.text.chars().any(char::is_alphanumeric))
        .collect();

    if let Some(wanted) = source_url {
        // Stable: other sources keep their order
        usable.sort_by_key(|s| s.url != Some(wanted));
    }

    usable
}

/// Exact quote tokens a window must contain before it is scored, as a
/// fraction of the quote's token count
const MIN_SHARED_TOKEN_FRACTION: f64 = 0.34;

/// Best normalized-Levenshtein ratio between `quote` and any window of the
/// source with the quote's token count, one fewer, or one more
///
/// Levenshtein runs only on windows that share at least a third of their
/// tokens with the quote, counted with a prefix sum so the scan stays linear
/// in the source length. Only the first `max_tokens` source tokens are scanned.
fn best_window_similarity(quote: &str, source: &str, max_tokens: usize) -> f64 {
    let quote_tokens: Vec<&str> = quote.split(' ').collect();
    let quote_len = quote_tokens.len();
    let tokens: Vec<&str> = source.split(' ').take(max_tokens).collect();

    if tokens.len() <= quote_len {
        return strsim::normalized_levenshtein(quote, &tokens.join(" "));
    }

    let quote_set: HashSet<&str> = quote_tokens.iter().copied().collect();
    let mut shared_before = Vec::with_capacity(tokens.len() + 1);
    shared_before.push(0usize);
    for token in &tokens {
        let hit = usize::from(quote_set.contains(token));
        shared_before.push(shared_before[shared_before.len() - 1] + hit);
    }
    let min_shared = ((quote_len as f64 * MIN_SHARED_TOKEN_FRACTION).ceil() as usize).max(1);

    let mut best = 0.0_f64;
    for size in quote_len.saturating_sub(1).max(1)..=(quote_len + 1).min(tokens.len()) {
        for start in 0..=(tokens.len() - size) {
            if shared_before[start + size] - shared_before[start] < min_shared {
                continue;
            }
            let candidate = tokens[start..start + size].join(" ");
            let ratio = strsim::normalized_levenshtein(quote, &candidate);
            if ratio > best {
                best = ratio;
                if best >= 1.0 {
                    return best;
                }
            }
        }
    }
    best
}
