use std::collections::{BTreeMap, HashSet};

use crate::model::{
    CodeAssignment, ConfidenceBucket, CoverageReport, Transcript, UncodedReason, UncodedSegment,
    Utterance,
};

const SHORT_UTTERANCE_TOKENS: usize = 5;
const SHORT_QUESTION_TOKENS: usize = 10;

/// Measures how much of `transcript` is accounted for by `assignments`.
///
/// An utterance counts as covered when at least one assignment on it reaches
/// `min_acceptance`. The histogram counts every assignment, accepted or not.
pub fn analyze(
    transcript: &Transcript,
    assignments: &[CodeAssignment],
    min_acceptance: f64,
) -> CoverageReport {
    let accepted = assignments
        .iter()
        .filter(|assignment| assignment.confidence >= min_acceptance)
        .filter(|assignment| transcript.contains(&assignment.utterance_id))
        .collect::<Vec<&CodeAssignment>>();

    let covered_ids = accepted
        .iter()
        .map(|assignment| assignment.utterance_id.as_str())
        .collect::<HashSet<&str>>();

    let mut coded_utterance_ids = Vec::with_capacity(covered_ids.len());
    let mut uncoded_utterance_ids = Vec::new();
    let mut uncoded_segments = Vec::new();
    let mut covered_tokens = 0;

    for utterance in transcript.utterances() {
        if covered_ids.contains(utterance.id.as_str()) {
            coded_utterance_ids.push(utterance.id.clone());
            covered_tokens += utterance.token_count;
        } else {
            uncoded_utterance_ids.push(utterance.id.clone());
            uncoded_segments.push(UncodedSegment {
                utterance_id: utterance.id.clone(),
                speaker: utterance.speaker.clone(),
                token_count: utterance.token_count,
                reason: uncoded_reason(utterance),
            });
        }
    }

    let total_utterances = transcript.len();
    let total_tokens = transcript.total_tokens();

    CoverageReport {
        utterance_coverage_ratio: ratio(coded_utterance_ids.len(), total_utterances),
        token_coverage_ratio: ratio(covered_tokens, total_tokens),
        total_utterances,
        non_empty_utterances: transcript
            .utterances()
            .iter()
            .filter(|utterance| !utterance.is_empty())
            .count(),
        total_tokens,
        covered_tokens,
        assignment_count: assignments.len(),
        codes_per_covered_utterance: if coded_utterance_ids.is_empty() {
            0.0
        } else {
            accepted.len() as f64 / coded_utterance_ids.len() as f64
        },
        coded_utterance_ids,
        uncoded_utterance_ids,
        uncoded_segments,
        confidence_histogram: confidence_histogram(assignments),
    }
}

pub fn confidence_histogram(assignments: &[CodeAssignment]) -> BTreeMap<ConfidenceBucket, usize> {
    let mut histogram = ConfidenceBucket::all()
        .into_iter()
        .map(|bucket| (bucket, 0))
        .collect::<BTreeMap<ConfidenceBucket, usize>>();

    for assignment in assignments {
        *histogram
            .entry(ConfidenceBucket::for_confidence(assignment.confidence))
            .or_insert(0) += 1;
    }

    histogram
}

fn uncoded_reason(utterance: &Utterance) -> UncodedReason {
    if utterance.is_empty() {
        UncodedReason::Empty
    } else if utterance.token_count < SHORT_UTTERANCE_TOKENS {
        UncodedReason::TooShort
    } else if utterance.text.trim_end().ends_with('?')
        && utterance.token_count < SHORT_QUESTION_TOKENS
    {
        UncodedReason::ShortQuestion
    } else {
        UncodedReason::NoMatchingCodes
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
