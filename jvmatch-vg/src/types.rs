// Shared Types and Data Contracts
//
// Explicit contracts between the three gate layers, the gate orchestrator and
// the enrichment pipeline that calls it. Everything here is a value type: built
// fresh per enrichment attempt and never mutated after construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Field Naming
// ============================================================================

/// Category a profile field belongs to
///
/// Drives which Layer 1 rules apply and the default criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    /// Contactability fields (email, phone, URLs)
    Contact,
    /// Free-text claims about the member
    FreeText,
    /// Numeric audience metrics
    Metric,
    /// Field the gate has no rule for
    Other,
}

/// Name of an extracted profile field
///
/// Known fields are closed variants so criticality and category are decided at
/// compile time. Unknown names are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldName {
    Email,
    Phone,
    Website,
    BookingLink,
    Linkedin,
    Company,
    WhatYouDo,
    WhoYouServe,
    Seeking,
    Offering,
    Bio,
    ListSize,
    SocialReach,
    Other(String),
}

impl FieldName {
    /// Wire name (snake_case)
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::BookingLink => "booking_link",
            Self::Linkedin => "linkedin",
            Self::Company => "company",
            Self::WhatYouDo => "what_you_do",
            Self::WhoYouServe => "who_you_serve",
            Self::Seeking => "seeking",
            Self::Offering => "offering",
            Self::Bio => "bio",
            Self::ListSize => "list_size",
            Self::SocialReach => "social_reach",
            Self::Other(name) => name,
        }
    }

    pub fn category(&self) -> FieldCategory {
        match self {
            Self::Email | Self::Phone | Self::Website | Self::BookingLink | Self::Linkedin => {
                FieldCategory::Contact
            }
            Self::Company
            | Self::WhatYouDo
            | Self::WhoYouServe
            | Self::Seeking
            | Self::Offering
            | Self::Bio => FieldCategory::FreeText,
            Self::ListSize | Self::SocialReach => FieldCategory::Metric,
            Self::Other(_) => FieldCategory::Other,
        }
    }

    /// Contactability fields whose failure blocks the whole record
    ///
    /// `booking_link` is a contact field but not critical: a bad scheduling link
    /// does not make the member unreachable.
    pub fn is_critical_by_default(&self) -> bool {
        matches!(self, Self::Email | Self::Phone | Self::Website | Self::Linkedin)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "phone" => Self::Phone,
            "website" => Self::Website,
            "booking_link" => Self::BookingLink,
            "linkedin" => Self::Linkedin,
            "company" => Self::Company,
            "what_you_do" => Self::WhatYouDo,
            "who_you_serve" => Self::WhoYouServe,
            "seeking" => Self::Seeking,
            "offering" => Self::Offering,
            "bio" => Self::Bio,
            "list_size" => Self::ListSize,
            "social_reach" => Self::SocialReach,
            _ => Self::Other(name.to_string()),
        }
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<FieldName> for String {
    fn from(name: FieldName) -> Self {
        name.as_str().to_string()
    }
}

impl FromStr for FieldName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

// ============================================================================
// Field-Level Verdicts
// ============================================================================

/// Gate layer that produced a field verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLayer {
    /// Layer 1: free regex/heuristic checks
    Deterministic,
    /// Layer 2: grounding against raw source text
    SourceQuote,
    /// Layer 3: paid AI verification
    Ai,
}

impl fmt::Display for VerificationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deterministic => "deterministic",
            Self::SourceQuote => "source_quote",
            Self::Ai => "ai",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Pass,
    Fail,
    Suspicious,
    Unchecked,
}

/// One verification outcome for a single field
///
/// `auto_fix` is a proposal only; the gate collects it into
/// `GateVerdict::auto_fixed_data` and the caller applies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub field: FieldName,
    pub status: FieldStatus,
    pub reason: String,
    pub confidence: f64, // [0.0, 1.0]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fix: Option<String>,
    pub layer: VerificationLayer,
}

impl FieldVerdict {
    pub fn new(
        field: FieldName,
        status: FieldStatus,
        layer: VerificationLayer,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field,
            status,
            reason: reason.into(),
            confidence: clamp_unit(confidence),
            auto_fix: None,
            layer,
        }
    }

    pub fn pass(
        field: FieldName,
        layer: VerificationLayer,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(field, FieldStatus::Pass, layer, confidence, reason)
    }

    /// Failed verdict with confidence 0.0
    pub fn fail(field: FieldName, layer: VerificationLayer, reason: impl Into<String>) -> Self {
        Self::new(field, FieldStatus::Fail, layer, 0.0, reason)
    }

    pub fn suspicious(
        field: FieldName,
        layer: VerificationLayer,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(field, FieldStatus::Suspicious, layer, confidence, reason)
    }

    /// Unchecked verdict; confidence is irrelevant and excluded from scoring
    pub fn unchecked(field: FieldName, layer: VerificationLayer, reason: impl Into<String>) -> Self {
        Self::new(field, FieldStatus::Unchecked, layer, 1.0, reason)
    }

    pub fn with_auto_fix(mut self, value: impl Into<String>) -> Self {
        self.auto_fix = Some(value.into());
        self
    }

    /// Proposes clearing the field
    pub fn clearing(self) -> Self {
        self.with_auto_fix("")
    }
}

// ============================================================================
// Gate-Level Verdict
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    /// Write at full base confidence
    Verified,
    /// Write with `base_confidence * overall_confidence`
    Unverified,
    /// Do not write; route to retry
    Quarantined,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Verified => "VERIFIED",
            Self::Unverified => "UNVERIFIED",
            Self::Quarantined => "QUARANTINED",
        };
        f.write_str(name)
    }
}

/// Aggregate decision for one profile-enrichment result
///
/// Fields are private: a verdict is terminal once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    status: GateStatus,
    field_verdicts: BTreeMap<FieldName, FieldVerdict>,
    overall_confidence: f64,
    auto_fixed_data: BTreeMap<FieldName, String>,
}

impl GateVerdict {
    /// Build a verdict from already-decided parts
    ///
    /// The gate uses this after applying its decision rule; pipelines and tests
    /// may use it to replay a stored decision.
    pub fn from_parts(
        status: GateStatus,
        field_verdicts: BTreeMap<FieldName, FieldVerdict>,
        overall_confidence: f64,
        auto_fixed_data: BTreeMap<FieldName, String>,
    ) -> Self {
        Self {
            status,
            field_verdicts,
            overall_confidence: clamp_unit(overall_confidence),
            auto_fixed_data,
        }
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    pub fn field_verdicts(&self) -> &BTreeMap<FieldName, FieldVerdict> {
        &self.field_verdicts
    }

    pub fn field_verdict(&self, field: &FieldName) -> Option<&FieldVerdict> {
        self.field_verdicts.get(field)
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn auto_fixed_data(&self) -> &BTreeMap<FieldName, String> {
        &self.auto_fixed_data
    }

    pub fn is_writable(&self) -> bool {
        self.status != GateStatus::Quarantined
    }

    /// Confidence the pipeline should persist with, or `None` when quarantined
    ///
    /// The discount is multiplicative, never additive.
    pub fn effective_confidence(&self, base_confidence: f64) -> Option<f64> {
        match self.status {
            GateStatus::Verified => Some(base_confidence),
            GateStatus::Unverified => Some(base_confidence * self.overall_confidence),
            GateStatus::Quarantined => None,
        }
    }
}

// ============================================================================
// Gate Input
// ============================================================================

/// One candidate field value with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// Raw JSON value from the extractor (not guaranteed to be a string)
    #[serde(default)]
    pub value: serde_json::Value,
    /// Verbatim text the extractor claims supports the value
    #[serde(default)]
    pub source_quote: Option<String>,
    /// URL of the page the quote was taken from
    #[serde(default)]
    pub source_url: Option<String>,
}

impl ExtractedField {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            source_quote: None,
            source_url: None,
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.source_quote = Some(quote.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// False for `null` and blank strings
    pub fn has_value(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Value rendered as text (strings verbatim, numbers/bools via JSON)
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Quote with surrounding whitespace removed, if non-blank
    pub fn quote(&self) -> Option<&str> {
        self.source_quote
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Raw text fed to the extraction step (page content, search snippets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceText {
    #[serde(default)]
    pub url: Option<String>,
    pub content: String,
}

impl SourceText {
    pub fn new(url: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            url: url.map(str::to_string),
            content: content.into(),
        }
    }
}

fn default_base_confidence() -> f64 {
    1.0
}

/// Everything the gate needs to judge one profile-enrichment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentInput {
    pub profile_id: String,
    #[serde(default)]
    pub fields: BTreeMap<FieldName, ExtractedField>,
    #[serde(default)]
    pub sources: Vec<SourceText>,
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,
    /// Per-field override of `FieldName::is_critical_by_default`
    #[serde(default)]
    pub critical_overrides: BTreeMap<FieldName, bool>,
}

impl EnrichmentInput {
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            fields: BTreeMap::new(),
            sources: Vec::new(),
            base_confidence: default_base_confidence(),
            critical_overrides: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<FieldName>, field: ExtractedField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Shorthand for a field with a value and no provenance
    pub fn with_value(self, name: impl Into<FieldName>, value: impl Into<serde_json::Value>) -> Self {
        self.with_field(name, ExtractedField::new(value))
    }

    pub fn with_source(mut self, url: Option<&str>, content: impl Into<String>) -> Self {
        self.sources.push(SourceText::new(url, content));
        self
    }

    pub fn with_base_confidence(mut self, base_confidence: f64) -> Self {
        self.base_confidence = base_confidence;
        self
    }

    pub fn with_critical_override(mut self, name: impl Into<FieldName>, critical: bool) -> Self {
        self.critical_overrides.insert(name.into(), critical);
        self
    }

    pub fn is_critical(&self, field: &FieldName) -> bool {
        self.critical_overrides
            .get(field)
            .copied()
            .unwrap_or_else(|| field.is_critical_by_default())
    }
}

/// Clamp into [0.0, 1.0]; NaN becomes 0.0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_round_trips_wire_name() {
        for name in ["email", "booking_link", "what_you_do", "social_reach"] {
            assert_eq!(FieldName::from(name).as_str(), name);
        }
        assert_eq!(FieldName::from("twitter"), FieldName::Other("twitter".to_string()));
    }

    #[test]
    fn test_criticality_defaults() {
        assert!(FieldName::Email.is_critical_by_default());
        assert!(FieldName::Linkedin.is_critical_by_default());
        assert!(!FieldName::BookingLink.is_critical_by_default());
        assert!(!FieldName::WhatYouDo.is_critical_by_default());
    }

    #[test]
    fn test_critical_override() {
        let input = EnrichmentInput::new("p1")
            .with_critical_override("email", false)
            .with_critical_override("bio", true);
        assert!(!input.is_critical(&FieldName::Email));
        assert!(input.is_critical(&FieldName::Bio));
        assert!(input.is_critical(&FieldName::Phone));
    }

    #[test]
    fn test_confidence_clamped() {
        let v = FieldVerdict::pass(FieldName::Email, VerificationLayer::Deterministic, 1.7, "ok");
        assert_eq!(v.confidence, 1.0);
        let v = FieldVerdict::pass(FieldName::Email, VerificationLayer::Deterministic, f64::NAN, "ok");
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn test_effective_confidence_is_multiplicative() {
        let verdict = GateVerdict::from_parts(
            GateStatus::Unverified,
            BTreeMap::new(),
            0.5,
            BTreeMap::new(),
        );
        assert!((verdict.effective_confidence(0.8).unwrap() - 0.4).abs() < 1e-9);

        let quarantined = GateVerdict::from_parts(
            GateStatus::Quarantined,
            BTreeMap::new(),
            0.9,
            BTreeMap::new(),
        );
        assert_eq!(quarantined.effective_confidence(0.8), None);
    }

    #[test]
    fn test_input_deserializes_from_pipeline_json() {
        let json = r#"{
            "profile_id": "abc",
            "fields": {
                "email": {"value": "jane@acme.io", "source_quote": "Contact jane@acme.io"},
                "list_size": {"value": 12000}
            },
            "sources": [{"url": "https://acme.io", "content": "Contact jane@acme.io"}]
        }"#;
        let input: EnrichmentInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.base_confidence, 1.0);
        assert!(input.fields.contains_key(&FieldName::Email));
        assert_eq!(
            input.fields[&FieldName::Email].quote(),
            Some("Contact jane@acme.io")
        );
        assert!(input.fields[&FieldName::ListSize].has_value());
    }

    #[test]
    fn test_blank_values_are_absent() {
        assert!(!ExtractedField::new("   ").has_value());
        assert!(!ExtractedField::new(serde_json::Value::Null).has_value());
        assert!(ExtractedField::new(0).has_value());
    }
}
