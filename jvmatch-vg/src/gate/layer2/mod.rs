// Layer 2: Source Grounding
//
// Free, synchronous. Checks that the quote an extractor cites really occurs in
// the raw text it was given. A field with no quote or no source text is
// UNCHECKED here, never PASS.

pub mod key_phrases;
pub mod source_quote_verifier;

pub use source_quote_verifier::SourceQuoteVerifier;
