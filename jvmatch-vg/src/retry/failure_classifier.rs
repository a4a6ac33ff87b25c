// Retry: Failure Classifier
//
// Concept: Name *why* a field failed, using only what the field verdict already
// says (layer, status, reason). Nothing is re-derived from raw data.
// Synchronization: Accepts &GateVerdict / &FieldVerdict, outputs ClassifiedFailure
//
// The lookup table is evaluated top to bottom; the first rule whose layer
// matches and whose phrase starts the reason wins. Unmatched reasons become
// `Unknown` and are logged at warn so the table can be extended.

use crate::gate::reasons;
use crate::types::{FieldName, FieldStatus, FieldVerdict, GateVerdict, VerificationLayer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a field failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    InvalidFormat,
    PlaceholderPattern,
    UnreachableDomain,
    UngroundedClaim,
    /// Data in the wrong column
    FieldSwap,
    ThinContent,
    SuspectedHallucination,
    AiRefuted,
    Unknown,
}

impl FailureType {
    pub const ALL: [FailureType; 9] = [
        Self::InvalidFormat,
        Self::PlaceholderPattern,
        Self::UnreachableDomain,
        Self::UngroundedClaim,
        Self::FieldSwap,
        Self::ThinContent,
        Self::SuspectedHallucination,
        Self::AiRefuted,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::PlaceholderPattern => "placeholder_pattern",
            Self::UnreachableDomain => "unreachable_domain",
            Self::UngroundedClaim => "ungrounded_claim",
            Self::FieldSwap => "field_swap",
            Self::ThinContent => "thin_content",
            Self::SuspectedHallucination => "suspected_hallucination",
            Self::AiRefuted => "ai_refuted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureType {
    type Err = jvmatch_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| jvmatch_common::Error::InvalidInput(format!("unknown failure type '{}'", s)))
    }
}

/// One row of the classification table
struct ClassificationRule {
    /// `None` matches any layer
    layer: Option<VerificationLayer>,
    reason_prefix: &'static str,
    failure_type: FailureType,
}

const fn rule(
    layer: Option<VerificationLayer>,
    reason_prefix: &'static str,
    failure_type: FailureType,
) -> ClassificationRule {
    ClassificationRule {
        layer,
        reason_prefix,
        failure_type,
    }
}

const DETERMINISTIC: Option<VerificationLayer> = Some(VerificationLayer::Deterministic);

static CLASSIFICATION_TABLE: &[ClassificationRule] = &[
    rule(Some(VerificationLayer::Ai), reasons::AI_REFUTED, FailureType::AiRefuted),
    rule(Some(VerificationLayer::SourceQuote), reasons::UNGROUNDED, FailureType::UngroundedClaim),
    rule(DETERMINISTIC, reasons::FIELD_SWAP, FailureType::FieldSwap),
    rule(DETERMINISTIC, reasons::RESERVED_DOMAIN, FailureType::UnreachableDomain),
    rule(DETERMINISTIC, reasons::PLACEHOLDER, FailureType::PlaceholderPattern),
    rule(DETERMINISTIC, reasons::DISPOSABLE_MAILBOX, FailureType::PlaceholderPattern),
    rule(DETERMINISTIC, reasons::THIN_CONTENT, FailureType::ThinContent),
    rule(DETERMINISTIC, reasons::SUSPECTED_DUMP, FailureType::SuspectedHallucination),
    rule(DETERMINISTIC, reasons::IMPLAUSIBLE, FailureType::SuspectedHallucination),
    rule(DETERMINISTIC, reasons::MISSING_SCHEME, FailureType::InvalidFormat),
    rule(None, reasons::INVALID_FORMAT, FailureType::InvalidFormat),
];

/// A failing or suspicious field with its failure category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFailure {
    pub field: FieldName,
    pub failure_type: FailureType,
    pub status: FieldStatus,
    pub reason: String,
}

/// Failure classifier (static lookup table)
pub struct FailureClassifier {
    table: &'static [ClassificationRule],
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            table: CLASSIFICATION_TABLE,
        }
    }
}

impl FailureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one field verdict; `None` for PASS and UNCHECKED
    pub fn classify_field(&self, verdict: &FieldVerdict) -> Option<ClassifiedFailure> {
        if !matches!(verdict.status, FieldStatus::Fail | FieldStatus::Suspicious) {
            return None;
        }

        let failure_type = self
            .table
            .iter()
            .find(|r| {
                r.layer.map_or(true, |layer| layer == verdict.layer)
                    && verdict.reason.starts_with(r.reason_prefix)
            })
            .map(|r| r.failure_type)
            .unwrap_or_else(|| {
                tracing::warn!(
                    field = %verdict.field,
                    layer = %verdict.layer,
                    reason = %verdict.reason,
                    "Unclassified failure reason; add a rule to the classification table"
                );
                FailureType::Unknown
            });

        Some(ClassifiedFailure {
            field: verdict.field.clone(),
            failure_type,
            status: verdict.status,
            reason: verdict.reason.clone(),
        })
    }

    /// Classify every FAIL and SUSPICIOUS field of a verdict, in field order
    ///
    /// Works for any gate status; quarantined verdicts are the usual input.
    pub fn classify(&self, verdict: &GateVerdict) -> Vec<ClassifiedFailure> {
        verdict
            .field_verdicts()
            .values()
            .filter_map(|v| self.classify_field(v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::VerificationGate;
    use crate::types::{EnrichmentInput, GateStatus};

    fn classify(layer: VerificationLayer, status: FieldStatus, reason: &str) -> Option<FailureType> {
        let verdict = FieldVerdict::new(FieldName::Email, status, layer, 0.0, reason);
        FailureClassifier::default()
            .classify_field(&verdict)
            .map(|c| c.failure_type)
    }

    #[test]
    fn test_table_lookups() {
        use FieldStatus::*;
        use VerificationLayer::*;
        let cases = [
            (Deterministic, Fail, "invalid format: 'x' is not local@domain.tld", FailureType::InvalidFormat),
            (Deterministic, Suspicious, "reserved domain: example.com will not resolve", FailureType::UnreachableDomain),
            (Deterministic, Suspicious, "placeholder: role or placeholder local-part 'info'", FailureType::PlaceholderPattern),
            (Deterministic, Suspicious, "disposable mailbox: mailinator.com", FailureType::PlaceholderPattern),
            (Deterministic, Fail, "field swap: email address in bio column", FailureType::FieldSwap),
            (Deterministic, Suspicious, "thin content: 8 characters", FailureType::ThinContent),
            (Deterministic, Fail, "suspected dump: 2500 characters exceeds 2000", FailureType::SuspectedHallucination),
            (Deterministic, Suspicious, "missing URL scheme: 'acme.io'", FailureType::InvalidFormat),
            (SourceQuote, Suspicious, "ungrounded: quote not found", FailureType::UngroundedClaim),
            (Ai, Fail, "refuted by AI verifier: not on page", FailureType::AiRefuted),
        ];
        for (layer, status, reason, expected) in cases {
            assert_eq!(classify(layer, status, reason), Some(expected), "{}", reason);
        }
    }

    #[test]
    fn test_unmatched_reason_is_unknown() {
        assert_eq!(
            classify(VerificationLayer::Deterministic, FieldStatus::Fail, "cosmic rays"),
            Some(FailureType::Unknown)
        );
        // Layer must match too
        assert_eq!(
            classify(VerificationLayer::Deterministic, FieldStatus::Fail, reasons::AI_REFUTED),
            Some(FailureType::Unknown)
        );
    }

    #[test]
    fn test_pass_and_unchecked_not_classified() {
        assert_eq!(classify(VerificationLayer::Deterministic, FieldStatus::Pass, "valid email"), None);
        assert_eq!(
            classify(VerificationLayer::SourceQuote, FieldStatus::Unchecked, reasons::NO_QUOTE),
            None
        );
    }

    #[test]
    fn test_classify_degraded_verdict() {
        let input = EnrichmentInput::new("p1")
            .with_value("email", "jane@example.com")
            .with_value("website", "https://acme.io")
            .with_value("bio", "N/A");
        let verdict = VerificationGate::default().evaluate(&input);
        assert_eq!(verdict.status(), GateStatus::Unverified);

        let failures = FailureClassifier::default().classify(&verdict);
        let types: Vec<_> = failures.iter().map(|f| (f.field.as_str(), f.failure_type)).collect();
        assert_eq!(
            types,
            vec![
                ("email", FailureType::UnreachableDomain),
                ("bio", FailureType::PlaceholderPattern),
            ]
        );
    }

    #[test]
    fn test_failure_type_parses_wire_name() {
        assert_eq!("field_swap".parse::<FailureType>().unwrap(), FailureType::FieldSwap);
        assert_eq!(" Thin_Content ".parse::<FailureType>().unwrap(), FailureType::ThinContent);
        assert!("nope".parse::<FailureType>().is_err());
        assert_eq!(
            serde_json::to_string(&FailureType::AiRefuted).unwrap(),
            "\"ai_refuted\""
        );
    }
}
