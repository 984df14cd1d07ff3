use std::collections::{BTreeMap, BTreeSet};

use crate::config::ValidatorOptions;
use crate::model::{
    CheckResult, ConfidenceBucket, ConsensusAssignment, CoverageReport, DomainVerdict,
    ReliabilityReport, ValidationCheck, ValidationResult,
};

#[derive(Debug, Default)]
struct Findings {
    warnings: Vec<String>,
    errors: Vec<String>,
    checks: Vec<ValidationCheck>,
}

impl Findings {
    fn record(&mut self, check_id: &str, name: &str, errors: Vec<String>, warnings: Vec<String>) {
        let result = if !errors.is_empty() {
            CheckResult::Error
        } else if !warnings.is_empty() {
            CheckResult::Warning
        } else {
            CheckResult::Pass
        };

        self.checks.push(ValidationCheck {
            check_id: check_id.to_string(),
            name: name.to_string(),
            result,
        });
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }
}

/// Runs the sanity rules over one transcript's merged output.
///
/// Findings never abort: errors make `passed` false, and every finding lowers
/// `confidence_score`.
pub fn validate(
    consensus: &[ConsensusAssignment],
    coverage: &CoverageReport,
    reliability: &ReliabilityReport,
    verdict: &DomainVerdict,
    options: &ValidatorOptions,
) -> ValidationResult {
    let mut findings = Findings::default();

    let uncoded_content =
        coverage.utterance_coverage_ratio == 0.0 && coverage.non_empty_utterances > 0;
    findings.record(
        "V-001",
        "Content is coded",
        uncoded_content
            .then(|| {
                format!(
                    "no codes despite content: {} non-empty utterances, none coded",
                    coverage.non_empty_utterances
                )
            })
            .into_iter()
            .collect(),
        Vec::new(),
    );

    findings.record(
        "V-002",
        "Coverage above floor",
        Vec::new(),
        (coverage.utterance_coverage_ratio < options.low_coverage_ratio)
            .then(|| {
                format!(
                    "coverage suspiciously low: {:.1}% of utterances coded",
                    coverage.utterance_coverage_ratio * 100.0
                )
            })
            .into_iter()
            .collect(),
    );

    findings.record(
        "V-003",
        "No near-universal code",
        near_universal_codes(consensus, options.near_universal_ratio)
            .into_iter()
            .map(|(code, share)| {
                format!(
                    "near-universal code `{code}` on {:.1}% of coded utterances; likely false positive or overfitting",
                    share * 100.0
                )
            })
            .collect(),
        Vec::new(),
    );

    findings.record(
        "V-004",
        "Reliability computable",
        Vec::new(),
        reliability
            .overall_alpha
            .is_none()
            .then(|| {
                format!(
                    "overall alpha undefined: {} of {} raters produced judgments",
                    reliability.counts.active_raters,
                    reliability.counts.rater_ids.len()
                )
            })
            .into_iter()
            .collect(),
    );

    findings.record(
        "V-005",
        "Reliability above floor",
        Vec::new(),
        reliability
            .overall_alpha
            .filter(|alpha| *alpha < options.min_reliable_alpha)
            .map(|alpha| {
                format!(
                    "overall alpha {alpha:.3} is below {:.3}",
                    options.min_reliable_alpha
                )
            })
            .into_iter()
            .collect(),
    );

    let domain_warning = if verdict.confidence < options.low_domain_confidence {
        Some(format!(
            "low domain confidence {:.2} for `{}`",
            verdict.confidence, verdict.domain_id
        ))
    } else if verdict.is_unknown() {
        Some(format!(
            "domain unknown at confidence {:.2}; profiles tie or score below floor",
            verdict.confidence
        ))
    } else {
        None
    };
    findings.record(
        "V-006",
        "Domain identified",
        Vec::new(),
        domain_warning.into_iter().collect(),
    );

    findings.record(
        "V-007",
        "Confidence distribution varied",
        Vec::new(),
        uniform_high_confidence(&coverage.confidence_histogram, options.uniform_confidence_ratio)
            .map(|share| {
                format!(
                    "suspiciously uniform high confidence: {:.1}% of assignments at or above {}",
                    share * 100.0,
                    ConfidenceBucket::HIGH_FLOOR
                )
            })
            .into_iter()
            .collect(),
    );

    let penalty = findings.errors.len() as f64 * options.error_penalty
        + findings.warnings.len() as f64 * options.warning_penalty;

    ValidationResult {
        passed: findings.errors.is_empty(),
        confidence_score: (1.0 - penalty).clamp(0.0, 1.0),
        warnings: findings.warnings,
        errors: findings.errors,
        checks: findings.checks,
    }
}

/// Codes present on at least `ratio` of coded utterances, only reported when
/// more than one distinct code was accepted.
fn near_universal_codes(consensus: &[ConsensusAssignment], ratio: f64) -> Vec<(String, f64)> {
    let mut utterances_per_code = BTreeMap::<&str, BTreeSet<&str>>::new();
    let mut coded_utterances = BTreeSet::new();

    for entry in consensus.iter().filter(|entry| entry.accepted) {
        utterances_per_code
            .entry(entry.code.as_str())
            .or_default()
            .insert(entry.utterance_id.as_str());
        coded_utterances.insert(entry.utterance_id.as_str());
    }

    if utterances_per_code.len() < 2 || coded_utterances.is_empty() {
        return Vec::new();
    }

    utterances_per_code
        .into_iter()
        .map(|(code, utterances)| {
            (
                code.to_string(),
                utterances.len() as f64 / coded_utterances.len() as f64,
            )
        })
        .filter(|(_, share)| *share >= ratio)
        .collect()
}

fn uniform_high_confidence(
    histogram: &BTreeMap<ConfidenceBucket, usize>,
    ratio: f64,
) -> Option<f64> {
    let total = histogram.values().sum::<usize>();
    if total == 0 {
        return None;
    }

    let high = histogram
        .get(&ConfidenceBucket::High)
        .copied()
        .unwrap_or(0);
    let share = high as f64 / total as f64;
    (share >= ratio).then_some(share)
}
