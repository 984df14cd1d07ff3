use super::*;

#[test]
fn partial_config_keeps_defaults_for_missing_fields() {
    let raw = serde_json::json!({
        "consensus": { "threshold": 0.6 },
        "validator": { "warning_penalty": 0.1 }
    });

    let config: AnalysisConfig =
        serde_json::from_value(raw).expect("partial config should deserialize");
    assert_eq!(config.consensus.threshold, 0.6);
    assert_eq!(config.consensus.single_rater_threshold, 0.85);
    assert_eq!(config.validator.warning_penalty, 0.1);
    assert_eq!(config.validator.error_penalty, 0.35);
    assert_eq!(config.min_acceptance_confidence, 0.5);
    config.validate().expect("partial config should validate");
}

#[test]
fn validate_rejects_threshold_outside_unit_interval() {
    let mut config = AnalysisConfig::default();
    config.consensus.threshold = 1.2;

    let error = config
        .validate()
        .expect_err("threshold above one should be rejected");
    assert!(
        error.to_string().contains("consensus.threshold"),
        "unexpected error: {error}"
    );
}

#[test]
fn threshold_override_is_validated() {
    let config = AnalysisConfig::default()
        .with_threshold(Some(0.8))
        .expect("0.8 is a valid threshold");
    assert_eq!(config.consensus.threshold, 0.8);

    let error = AnalysisConfig::default()
        .with_threshold(Some(-0.1))
        .expect_err("negative threshold should be rejected");
    assert!(error.to_string().contains("outside [0, 1]"));
}

#[test]
fn load_without_path_returns_defaults() {
    let config = AnalysisConfig::load(None).expect("defaults should load");
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn validate_rejects_non_positive_smoothing() {
    let mut config = AnalysisConfig::default();
    config.classifier.smoothing = 0.0;

    let error = config
        .validate()
        .expect_err("zero smoothing should be rejected");
    assert!(
        error.to_string().contains("classifier.smoothing"),
        "unexpected error: {error}"
    );

    config.classifier.smoothing = 1e-6;
    config.validate().expect("small positive smoothing is valid");
}
