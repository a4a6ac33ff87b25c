// Retry: Strategy Selector
//
// Concept: Given (field, failure type), return the enrichment methods to try
// next, most likely to succeed first
// Synchronization: Accepts ClassifiedFailure + RetryContext, outputs RetryPlan
//
// The priority table is static. The learning log records outcomes for offline
// review but is not read here.

use super::failure_classifier::{ClassifiedFailure, FailureType};
use crate::config::RetryConfig;
use crate::types::{EnrichmentInput, FieldCategory, FieldName, FieldStatus, GateVerdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Alternative ways to obtain a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentMethod {
    /// first.last@domain style guesses against a known company domain
    EmailPatternGuess,
    WebsiteRescrape,
    LinkedinLookup,
    /// Third-party professional contact database
    ContactDatabase,
    WebSearch,
    /// Re-run extraction over the same sources with a stricter prompt
    AiReextract,
    ManualReview,
}

impl EnrichmentMethod {
    pub const ALL: [EnrichmentMethod; 7] = [
        Self::EmailPatternGuess,
        Self::WebsiteRescrape,
        Self::LinkedinLookup,
        Self::ContactDatabase,
        Self::WebSearch,
        Self::AiReextract,
        Self::ManualReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailPatternGuess => "email_pattern_guess",
            Self::WebsiteRescrape => "website_rescrape",
            Self::LinkedinLookup => "linkedin_lookup",
            Self::ContactDatabase => "contact_database",
            Self::WebSearch => "web_search",
            Self::AiReextract => "ai_reextract",
            Self::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for EnrichmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentMethod {
    type Err = jvmatch_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                jvmatch_common::Error::InvalidInput(format!("unknown enrichment method '{}'", s))
            })
    }
}

/// Ordered retry methods for one failed field
///
/// Never empty: "nothing automated left" is `[ManualReview]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPlan {
    pub field: FieldName,
    pub failure_type: FailureType,
    pub methods: Vec<EnrichmentMethod>,
}

impl RetryPlan {
    pub fn is_manual_only(&self) -> bool {
        self.methods == [EnrichmentMethod::ManualReview]
    }
}

/// What is known about the profile when planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Domain usable for email pattern guesses (`acme.io`)
    pub company_domain: Option<String>,
    /// A website is on record to re-scrape
    pub has_website: bool,
    /// A LinkedIn profile is on record to look up
    pub has_linkedin: bool,
    /// Methods already tried for this profile
    pub already_attempted: BTreeSet<EnrichmentMethod>,
}

impl RetryContext {
    /// Derive context from the input and the gate's verdict on it
    ///
    /// Only values the gate did not FAIL count as known.
    pub fn from_input(input: &EnrichmentInput, verdict: &GateVerdict) -> Self {
        let usable = |name: &FieldName| -> Option<String> {
            let failed = verdict
                .field_verdict(name)
                .is_some_and(|v| v.status == FieldStatus::Fail);
            if failed {
                return None;
            }
            let value = verdict
                .auto_fixed_data()
                .get(name)
                .cloned()
                .or_else(|| input.fields.get(name).and_then(|f| f.value_text()))?;
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        };

        let website = usable(&FieldName::Website);
        let email_domain = usable(&FieldName::Email)
            .and_then(|email| email.split_once('@').map(|(_, domain)| domain.to_ascii_lowercase()));

        Self {
            company_domain: website.as_deref().and_then(domain_of).or(email_domain),
            has_website: website.is_some(),
            has_linkedin: usable(&FieldName::Linkedin).is_some(),
            already_attempted: BTreeSet::new(),
        }
    }

    pub fn with_attempted(mut self, method: EnrichmentMethod) -> Self {
        self.already_attempted.insert(method);
        self
    }
}

/// Host of a URL or bare domain, without `www.`
fn domain_of(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#', ':'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    host.contains('.').then_some(host)
}

/// Retry strategy selector (static priority table)
pub struct RetryStrategySelector {
    max_methods: usize,
}

impl Default for RetryStrategySelector {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

impl RetryStrategySelector {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_methods: config.max_methods.max(1),
        }
    }

    /// Plan for one (field, failure type)
    ///
    /// # Algorithm
    /// 1. Look up the priority list for the field and failure type
    /// 2. Drop methods the context rules out or that were already attempted
    /// 3. Cap at `max_methods`; an empty result becomes `[ManualReview]`
    pub fn select(&self, field: &FieldName, failure_type: FailureType, context: &RetryContext) -> RetryPlan {
        let mut methods: Vec<EnrichmentMethod> = Vec::new();
        for method in priority_table(field, failure_type) {
            if !methods.contains(&method) && is_applicable(method, field, failure_type, context) {
                methods.push(method);
            }
        }
        methods.truncate(self.max_methods);

        if methods.is_empty() {
            methods.push(EnrichmentMethod::ManualReview);
        }

        tracing::debug!(
            field = %field,
            failure_type = %failure_type,
            methods = ?methods,
            "Retry plan selected"
        );

        RetryPlan {
            field: field.clone(),
            failure_type,
            methods,
        }
    }

    /// Plans for every classified failure, in order
    pub fn plan_for(&self, failures: &[ClassifiedFailure], context: &RetryContext) -> Vec<RetryPlan> {
        failures
            .iter()
            .map(|f| self.select(&f.field, f.failure_type, context))
            .collect()
    }
}

fn priority_table(field: &FieldName, failure_type: FailureType) -> Vec<EnrichmentMethod> {
    use EnrichmentMethod::*;
    use FailureType as F;

    match (field.category(), field, failure_type) {
        (_, _, F::FieldSwap) => vec![AiReextract, WebsiteRescrape, LinkedinLookup, ContactDatabase],

        (_, FieldName::Email, F::InvalidFormat | F::PlaceholderPattern) => {
            vec![EmailPatternGuess, WebsiteRescrape, ContactDatabase, WebSearch]
        }
        (_, FieldName::Email, F::UnreachableDomain) => vec![ContactDatabase, WebSearch],
        (_, FieldName::Email, _) => vec![WebsiteRescrape, ContactDatabase, EmailPatternGuess, WebSearch],

        (_, FieldName::Phone, _) => vec![WebsiteRescrape, ContactDatabase, WebSearch],

        (_, FieldName::Linkedin, _) => vec![LinkedinLookup, WebSearch, WebsiteRescrape],

        (_, FieldName::Website | FieldName::BookingLink, F::UnreachableDomain) => {
            vec![ContactDatabase, WebSearch, LinkedinLookup]
        }
        (_, FieldName::Website | FieldName::BookingLink, _) => {
            vec![WebSearch, LinkedinLookup, ContactDatabase]
        }

        (FieldCategory::FreeText, _, F::ThinContent | F::PlaceholderPattern) => {
            vec![WebsiteRescrape, LinkedinLookup, WebSearch, AiReextract]
        }
        (FieldCategory::FreeText, _, _) => vec![AiReextract, WebsiteRescrape, LinkedinLookup, WebSearch],

        (FieldCategory::Metric, _, _) => vec![WebSearch, AiReextract],

        _ => vec![AiReextract, WebSearch],
    }
}

/// Whether the context allows a method for this field
fn is_applicable(
    method: EnrichmentMethod,
    field: &FieldName,
    failure_type: FailureType,
    context: &RetryContext,
) -> bool {
    if context.already_attempted.contains(&method) {
        return false;
    }

    match method {
        EnrichmentMethod::EmailPatternGuess => {
            *field == FieldName::Email && context.company_domain.is_some()
        }
        EnrichmentMethod::WebsiteRescrape => {
            failure_type != FailureType::UnreachableDomain && context.has_website
        }
        EnrichmentMethod::LinkedinLookup => linkedin_can_supply(field, context),
        _ => true,
    }
}

/// LinkedIn profiles carry these fields; other fields need a known profile URL
fn linkedin_can_supply(field: &FieldName, context: &RetryContext) -> bool {
    match field {
        FieldName::Linkedin => true,
        FieldName::Company
        | FieldName::WhatYouDo
        | FieldName::WhoYouServe
        | FieldName::Offering
        | FieldName::Bio
        | FieldName::Website
        | FieldName::BookingLink => context.has_linkedin,
        _ => false,
    }
}
