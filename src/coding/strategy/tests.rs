use std::collections::BTreeMap;

use super::*;
use crate::coding::fixtures::{assign, assign_inductive};
use crate::model::UNKNOWN_DOMAIN;

fn verdict(domain_id: &str, confidence: f64) -> DomainVerdict {
    DomainVerdict {
        domain_id: domain_id.to_string(),
        confidence,
        score_per_domain: BTreeMap::new(),
        hits_per_domain: BTreeMap::new(),
        matched_keywords: Vec::new(),
    }
}

#[test]
fn tiers_include_their_lower_bound() {
    assert_eq!(select(&verdict("health", 0.8)).mode, HybridMode::DeductivePrimary);
    assert_eq!(select(&verdict("health", 0.79)).mode, HybridMode::Balanced);
    assert_eq!(select(&verdict("health", 0.5)).mode, HybridMode::Balanced);
    assert_eq!(select(&verdict("health", 0.49)).mode, HybridMode::InductivePrimary);
}

#[test]
fn unknown_domain_is_always_inductive_primary() {
    let plan = select(&verdict(UNKNOWN_DOMAIN, 0.95));

    assert_eq!(plan.mode, HybridMode::InductivePrimary);
    assert_eq!(plan.deductive_weight, 0.3);
    assert_eq!(plan.inductive_weight, 0.7);
}

#[test]
fn non_finite_confidence_is_inductive_primary() {
    assert_eq!(
        select(&verdict("health", f64::NAN)).mode,
        HybridMode::InductivePrimary
    );
}

#[test]
fn weights_follow_mode() {
    let deductive = select(&verdict("health", 0.9));
    let balanced = select(&verdict("health", 0.6));

    assert_eq!(
        (deductive.deductive_weight, deductive.inductive_weight),
        (0.7, 0.3)
    );
    assert_eq!(
        (balanced.deductive_weight, balanced.inductive_weight),
        (0.5, 0.5)
    );
    assert_eq!(deductive.source_weights().deductive, 0.7);
}

#[test]
fn selection_is_deterministic() {
    let input = verdict("health", 0.65);
    assert_eq!(select(&input), select(&input));
}

#[test]
fn deductive_primary_fills_gaps_with_inductive_codes() {
    let plan = select(&verdict("health", 0.9));
    let assignments = vec![
        assign("u0", "pain", "r1", 0.9),
        assign_inductive("u0", "worry", "r1", 0.8),
        assign("u1", "pain", "r1", 0.3),
        assign_inductive("u1", "worry", "r1", 0.8),
        assign_inductive("u2", "hope", "r1", 0.8),
    ];

    let selection = apply(&plan, &assignments, 0.5);

    assert_eq!(selection.deductive_offered, 2);
    assert_eq!(selection.inductive_offered, 3);
    assert_eq!(selection.deductive_kept, 2);
    assert_eq!(selection.inductive_kept, 2);
    assert!(
        !selection
            .assignments
            .iter()
            .any(|assignment| assignment.utterance_id == "u0" && assignment.code == "worry")
    );
}

#[test]
fn balanced_keeps_both_streams() {
    let plan = select(&verdict("health", 0.6));
    let assignments = vec![
        assign("u0", "pain", "r1", 0.9),
        assign_inductive("u0", "worry", "r1", 0.8),
    ];

    let selection = apply(&plan, &assignments, 0.5);

    assert_eq!(selection.assignments, assignments);
}

#[test]
fn inductive_primary_keeps_deductive_codes_only_where_inductive_found_something() {
    let plan = select(&verdict(UNKNOWN_DOMAIN, 0.0));
    let assignments = vec![
        assign_inductive("u0", "worry", "r1", 0.8),
        assign("u0", "pain", "r1", 0.9),
        assign("u1", "pain", "r1", 0.9),
    ];

    let selection = apply(&plan, &assignments, 0.5);

    assert_eq!(selection.deductive_kept, 1);
    assert_eq!(selection.inductive_kept, 1);
    assert!(
        selection
            .assignments
            .iter()
            .all(|assignment| assignment.utterance_id == "u0")
    );
}
