//! Retry routing integration tests
//!
//! Gate verdict -> classified failures -> retry plans.

mod helpers;

use helpers::*;
use jvmatch_vg::retry::{EnrichmentMethod, FailureClassifier, FailureType, RetryContext, RetryStrategySelector};
use jvmatch_vg::{EnrichmentInput, FieldName, GateStatus, VerificationGate};

fn plans_for(input: &EnrichmentInput) -> Vec<jvmatch_vg::retry::RetryPlan> {
    let verdict = VerificationGate::default().evaluate(input);
    let failures = FailureClassifier::default().classify(&verdict);
    let context = RetryContext::from_input(input, &verdict);
    RetryStrategySelector::default().plan_for(&failures, &context)
}

#[test]
fn malformed_email_with_known_domain_guesses_pattern_first() {
    let input = malformed_input("r1").with_value("website", "https://acmegrowth.io");
    let plans = plans_for(&input);

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].field, FieldName::Email);
    assert_eq!(plans[0].failure_type, FailureType::InvalidFormat);
    assert_eq!(plans[0].methods[0], EnrichmentMethod::EmailPatternGuess);
    assert!(plans[0].methods.len() <= 3);
}

#[test]
fn unreachable_domain_goes_straight_to_contact_database() {
    let input = EnrichmentInput::new("r2")
        .with_value("email", "jane@example.com")
        .with_value("website", "https://acmegrowth.io");
    let plans = plans_for(&input);

    let email = plans.iter().find(|p| p.field == FieldName::Email).unwrap();
    assert_eq!(email.failure_type, FailureType::UnreachableDomain);
    assert_eq!(email.methods[0], EnrichmentMethod::ContactDatabase);
    assert!(!email.methods.contains(&EnrichmentMethod::WebsiteRescrape));
}

#[test]
fn field_swap_is_reextracted() {
    let input = EnrichmentInput::new("r3").with_value("linkedin", "jane@acmegrowth.io");
    let verdict = VerificationGate::default().evaluate(&input);
    assert_eq!(verdict.status(), GateStatus::Quarantined);

    let plans = plans_for(&input);
    assert_eq!(plans[0].failure_type, FailureType::FieldSwap);
    assert_eq!(plans[0].methods[0], EnrichmentMethod::AiReextract);
}

#[test]
fn exhausted_methods_fall_back_to_manual_review() {
    let input = malformed_input("r4");
    let verdict = VerificationGate::default().evaluate(&input);
    let failures = FailureClassifier::default().classify(&verdict);

    let context = EnrichmentMethod::ALL
        .into_iter()
        .fold(RetryContext::from_input(&input, &verdict), RetryContext::with_attempted);
    let plans = RetryStrategySelector::default().plan_for(&failures, &context);

    assert_eq!(plans.len(), 1);
    assert!(plans[0].is_manual_only());
}

#[test]
fn failed_website_is_not_treated_as_known() {
    let input = EnrichmentInput::new("r5")
        .with_value("email", "not-an-email")
        .with_value("website", "https://www.example.com");
    let verdict = VerificationGate::default().evaluate(&input);
    let context = RetryContext::from_input(&input, &verdict);

    assert!(!context.has_website);
    assert_eq!(context.company_domain, None);

    let plans = plans_for(&input);
    for plan in &plans {
        assert!(!plan.methods.contains(&EnrichmentMethod::WebsiteRescrape));
        assert!(!plan.methods.contains(&EnrichmentMethod::EmailPatternGuess));
    }
}

#[test]
fn every_classified_failure_gets_a_non_empty_plan() {
    let input = malformed_input("r6")
        .with_value("phone", "123")
        .with_value("bio", "TBD")
        .with_value("list_size", "-40")
        .with_value("booking_link", "calendly.com/jane");
    let plans = plans_for(&input);

    assert!(plans.len() >= 3);
    assert!(plans.iter().all(|p| !p.methods.is_empty()));
}
