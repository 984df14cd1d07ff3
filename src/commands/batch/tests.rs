use super::*;

fn entry(status: TranscriptStatus, domain: Option<&str>, coverage: Option<f64>) -> BatchEntry {
    BatchEntry {
        input_path: "in/bundle.json".to_string(),
        input_sha256: Some("abc".to_string()),
        transcript_id: Some("t".to_string()),
        status,
        result_path: None,
        domain_id: domain.map(str::to_string),
        utterance_coverage_ratio: coverage,
        confidence_score: coverage.map(|_| 1.0),
        error: None,
    }
}

#[test]
fn summary_counts_statuses_and_domains() {
    let entries = vec![
        entry(TranscriptStatus::Passed, Some("healthcare"), Some(0.8)),
        entry(TranscriptStatus::Flagged, Some("healthcare"), Some(0.4)),
        entry(TranscriptStatus::Failed, Some("unknown"), Some(0.0)),
        failed_entry(
            Path::new("in/broken.json"),
            None,
            None,
            "failed to parse json file".to_string(),
        ),
    ];

    let summary = summarize(&entries);

    assert_eq!(summary.transcript_count, 4);
    assert_eq!(summary.passed_count, 1);
    assert_eq!(summary.flagged_count, 1);
    assert_eq!(summary.failed_count, 2);
    assert_eq!(summary.domain_distribution["healthcare"], 2);
    assert_eq!(summary.domain_distribution["unknown"], 1);
    assert_eq!(summary.coverage.min, Some(0.0));
    assert_eq!(summary.coverage.max, Some(0.8));
    let mean = summary.coverage.mean.expect("mean should be defined");
    assert!((mean - 0.4).abs() < 1e-9, "unexpected mean {mean}");
}

#[test]
fn summary_of_failures_has_no_coverage() {
    let entries = vec![failed_entry(
        Path::new("in/broken.json"),
        Some("abc".to_string()),
        Some("t-9".to_string()),
        "domain profile set is empty".to_string(),
    )];

    let summary = summarize(&entries);

    assert_eq!(summary.failed_count, 1);
    assert!(summary.domain_distribution.is_empty());
    assert_eq!(summary.coverage.min, None);
    assert_eq!(summary.coverage.mean, None);
    assert_eq!(summary.coverage.max, None);
}

#[test]
fn manifest_entries_serialize_undefined_fields_as_null() {
    let failed = failed_entry(Path::new("in/broken.json"), None, None, "boom".to_string());

    let value = serde_json::to_value(&failed).expect("entry should serialize");

    assert_eq!(
        value,
        serde_json::json!({
            "input_path": "in/broken.json",
            "input_sha256": null,
            "transcript_id": null,
            "status": "failed",
            "result_path": null,
            "domain_id": null,
            "utterance_coverage_ratio": null,
            "confidence_score": null,
            "error": "boom"
        })
    );
}

#[test]
fn file_stem_falls_back_for_bare_paths() {
    assert_eq!(file_stem(Path::new("in/interview-07.json")), "interview-07");
    assert_eq!(file_stem(Path::new("")), "bundle");
}
