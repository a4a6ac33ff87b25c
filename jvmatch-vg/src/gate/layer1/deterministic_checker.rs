// Layer 1: Deterministic Checker
//
// Concept: Dispatch each extracted field to the rule set for its category
// Synchronization: Accepts EnrichmentInput, outputs one FieldVerdict per field
//
// Never panics and never errors: wrong JSON types, blank values and unknown
// field names all become verdicts.

use super::contact_rules::{check_email, check_linkedin, check_phone, check_url};
use super::text_rules::{check_free_text, check_metric, json_type_name};
use crate::config::Layer1Config;
use crate::gate::reasons;
use crate::types::{EnrichmentInput, ExtractedField, FieldName, FieldVerdict, VerificationLayer};
use serde_json::Value;
use std::collections::BTreeMap;

const LAYER: VerificationLayer = VerificationLayer::Deterministic;

/// Deterministic checker (Layer 1)
///
/// **Legible Software Principle:**
/// - Independent module: regex and arithmetic only, no I/O
/// - Explicit synchronization: one verdict per field present in the input
/// - Transparent behavior: every FAIL names its rule in `reason`
pub struct DeterministicChecker {
    config: Layer1Config,
}

impl Default for DeterministicChecker {
    fn default() -> Self {
        Self::new(Layer1Config::default())
    }
}

impl DeterministicChecker {
    pub fn new(config: Layer1Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Layer1Config {
        &self.config
    }

    /// Check every field of an enrichment result
    pub fn check(&self, input: &EnrichmentInput) -> BTreeMap<FieldName, FieldVerdict> {
        input
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), self.check_extracted(name, field)))
            .collect()
    }

    fn check_extracted(&self, name: &FieldName, field: &ExtractedField) -> FieldVerdict {
        if !field.has_value() {
            return FieldVerdict::unchecked(name.clone(), LAYER, reasons::NO_VALUE);
        }
        self.check_field(name, &field.value)
    }

    /// Check a single raw value
    ///
    /// # Returns
    /// - UNCHECKED for `null`, blank strings and fields without a rule
    /// - FAIL (clearing) for a non-string where text is expected
    /// - otherwise the category rule's verdict
    pub fn check_field(&self, name: &FieldName, value: &Value) -> FieldVerdict {
        let field = name.clone();

        if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
            return FieldVerdict::unchecked(field, LAYER, reasons::NO_VALUE);
        }

        match name {
            FieldName::ListSize | FieldName::SocialReach => check_metric(field, value, &self.config),
            FieldName::Other(_) => FieldVerdict::unchecked(field, LAYER, reasons::NO_RULE),
            _ => {
                let Some(text) = value.as_str() else {
                    return FieldVerdict::fail(
                        field,
                        LAYER,
                        format!(
                            "{}: expected a string, got {}",
                            reasons::INVALID_FORMAT,
                            json_type_name(value)
                        ),
                    )
                    .clearing();
                };
                self.check_text_field(field, text)
            }
        }
    }

    fn check_text_field(&self, field: FieldName, text: &str) -> FieldVerdict {
        let config = &self.config;
        match field {
            FieldName::Email => check_email(field, text.trim(), config),
            FieldName::Phone => check_phone(field, text, config),
            FieldName::Website | FieldName::BookingLink => check_url(field, text, config),
            FieldName::Linkedin => check_linkedin(field, text),
            FieldName::Company => {
                check_free_text(field, text, config.company_min_len, config.company_max_len, config)
            }
            _ => check_free_text(field, text, config.min_text_len, config.max_text_len, config),
        }
    }
}
