use super::*;
use crate::coding::fixtures::{profile, transcript};

fn healthcare_and_education() -> Vec<DomainProfile> {
    compile_profiles(&[
        profile("healthcare", &["patient", "nurse", "clinic", "diagnosis"]),
        profile("education", &["student", "teacher", "classroom", "exam"]),
    ])
    .expect("profiles should compile")
}

#[test]
fn picks_domain_with_most_keyword_hits() {
    let profiles = healthcare_and_education();
    let verdict = classify(
        "The patient told the nurse the clinic delayed her diagnosis. The teacher was kind.",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("classification should succeed");

    assert_eq!(verdict.domain_id, "healthcare");
    assert!((verdict.confidence - 0.8).abs() < 1e-3, "{}", verdict.confidence);
    assert_eq!(
        verdict.matched_keywords,
        vec!["clinic", "diagnosis", "nurse", "patient"]
    );
    assert_eq!(verdict.hits_per_domain["healthcare"], 4);
    assert_eq!(verdict.hits_per_domain["education"], 1);
}

#[test]
fn text_without_keywords_is_unknown_with_zero_confidence() {
    let profiles = healthcare_and_education();
    let verdict = classify(
        "we talked about the weather and the garden",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("classification should succeed");

    assert!(verdict.is_unknown());
    assert_eq!(verdict.confidence, 0.0);
    assert!(verdict.matched_keywords.is_empty());
    assert!(verdict.score_per_domain.values().all(|score| *score == 0.0));
}

#[test]
fn zero_smoothing_without_hits_keeps_confidence_at_zero() {
    let profiles = healthcare_and_education();
    let options = ClassifierOptions {
        smoothing: 0.0,
        ..ClassifierOptions::default()
    };

    let verdict = classify("nothing relevant here", &profiles, &options)
        .expect("classification should succeed");

    assert!(verdict.is_unknown());
    assert_eq!(verdict.confidence, 0.0);
    assert_eq!(
        serde_json::to_value(&verdict).expect("verdict should serialize")["confidence"],
        serde_json::json!(0.0)
    );
}

#[test]
fn empty_text_is_unknown() {
    let profiles = healthcare_and_education();
    let verdict =
        classify("   ", &profiles, &ClassifierOptions::default()).expect("should classify");

    assert!(verdict.is_unknown());
    assert_eq!(verdict.confidence, 0.0);
    assert_eq!(verdict.score_per_domain.len(), 2);
}

#[test]
fn tied_profiles_fall_back_to_unknown() {
    let profiles = healthcare_and_education();
    let verdict = classify(
        "the patient and the student",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("classification should succeed");

    assert!(verdict.is_unknown());
    assert!(verdict.confidence > 0.0 && verdict.confidence < 0.6);
}

#[test]
fn score_below_floor_is_unknown() {
    let profiles = healthcare_and_education();
    let long_text = format!("patient {}", "word ".repeat(200));
    let options = ClassifierOptions {
        score_floor: 0.5,
        ..ClassifierOptions::default()
    };

    let verdict = classify(&long_text, &profiles, &options).expect("should classify");

    assert!(verdict.is_unknown());
    assert!(verdict.score_per_domain["healthcare"] < 0.5);
}

#[test]
fn keywords_match_whole_words_case_insensitively() {
    let profiles = compile_profiles(&[
        profile("healthcare", &["care"]),
        profile("software", &["C++"]),
    ])
    .expect("profiles should compile");

    let careful = classify(
        "She was careful and caring.",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("should classify");
    assert_eq!(careful.hits_per_domain["healthcare"], 0);

    let cpp = classify(
        "we rewrote it in c++ last year",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("should classify");
    assert_eq!(cpp.domain_id, "software");
}

#[test]
fn patterns_and_weights_contribute_to_score() {
    let mut weighted = profile("finance", &["budget"]);
    weighted.weight = 2.0;
    let mut patterned = profile("legal", &[]);
    patterned.patterns = vec![r"section \d+".to_string()];

    let profiles = compile_profiles(&[weighted, patterned]).expect("profiles should compile");
    let verdict = classify(
        "the budget under section 12 and section 14",
        &profiles,
        &ClassifierOptions::default(),
    )
    .expect("should classify");

    assert!(verdict.is_unknown(), "2.0 * 1 ties 2 pattern hits");
    assert_eq!(verdict.hits_per_domain["legal"], 2);
}

#[test]
fn adding_matching_keyword_never_lowers_score() {
    let text = "the patient met the nurse at the clinic";
    let before = compile_profiles(&[
        profile("healthcare", &["patient"]),
        profile("education", &["teacher"]),
    ])
    .expect("profiles should compile");
    let after = compile_profiles(&[
        profile("healthcare", &["patient", "nurse"]),
        profile("education", &["teacher"]),
    ])
    .expect("profiles should compile");

    let options = ClassifierOptions::default();
    let before = classify(text, &before, &options).expect("should classify");
    let after = classify(text, &after, &options).expect("should classify");

    assert!(after.score_per_domain["healthcare"] >= before.score_per_domain["healthcare"]);
}

#[test]
fn classification_is_deterministic() {
    let profiles = healthcare_and_education();
    let transcript = transcript(&[
        "the teacher gave the exam",
        "the student was in the classroom",
    ]);
    let options = ClassifierOptions::default();

    let first = classify_transcript(&transcript, &profiles, &options).expect("should classify");
    let second = classify_transcript(&transcript, &profiles, &options).expect("should classify");

    assert_eq!(first, second);
    assert_eq!(first.domain_id, "education");
}

#[test]
fn empty_profile_set_is_rejected() {
    let error = classify("anything", &[], &ClassifierOptions::default())
        .expect_err("empty profile set should fail");
    assert_eq!(error, DataContractError::EmptyProfileSet);

    let error = compile_profiles(&[]).expect_err("empty config set should fail");
    assert_eq!(error, DataContractError::EmptyProfileSet);
}

#[test]
fn invalid_profiles_are_rejected() {
    let duplicate = compile_profiles(&[profile("health", &["a"]), profile("health", &["b"])])
        .expect_err("duplicate domain should fail");
    assert_eq!(duplicate, DataContractError::DuplicateDomain("health".to_string()));

    let mut bad_pattern = profile("legal", &[]);
    bad_pattern.patterns = vec!["(unclosed".to_string()];
    assert!(matches!(
        DomainProfile::compile(&bad_pattern),
        Err(DataContractError::InvalidPattern { .. })
    ));

    let mut negative = profile("legal", &["court"]);
    negative.weight = -1.0;
    assert!(matches!(
        DomainProfile::compile(&negative),
        Err(DataContractError::InvalidWeight { .. })
    ));

    assert!(DomainProfile::compile(&profile(UNKNOWN_DOMAIN, &["x"])).is_err());
}
