use std::panic;
use std::thread;

use serde::Serialize;
use tracing::{debug, warn};

use super::consensus::{self, ConsensusQuality, Disagreement};
use super::domain::{self, DomainProfile};
use super::strategy::{self, StrategyPlan};
use super::{agreement, coverage, validator};
use crate::config::AnalysisConfig;
use crate::error::DataContractError;
use crate::model::{
    CodeAssignment, CodeSource, ConsensusAssignment, CoverageReport, DomainVerdict,
    RejectedAssignment, ReliabilityReport, Transcript, TranscriptStatus, ValidationResult,
};

/// Everything the core needs for one transcript.
#[derive(Debug, Clone)]
pub struct TranscriptInputs {
    pub transcript: Transcript,
    pub roster: Vec<String>,
    pub assignments: Vec<CodeAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    #[serde(flatten)]
    pub plan: StrategyPlan,
    pub deductive_offered: usize,
    pub inductive_offered: usize,
    pub deductive_kept: usize,
    pub inductive_kept: usize,
    pub deductive_only_coverage: f64,
    pub coverage_improvement: f64,
}

/// Immutable result bundle for one transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptAnalysis {
    pub transcript_id: String,
    pub utterance_count: usize,
    pub domain: DomainVerdict,
    pub strategy: StrategyOutcome,
    pub reliability: ReliabilityReport,
    pub consensus: Vec<ConsensusAssignment>,
    pub quality: ConsensusQuality,
    pub disagreements: Vec<Disagreement>,
    pub coverage: CoverageReport,
    pub validation: ValidationResult,
    pub rejected: Vec<RejectedAssignment>,
}

impl TranscriptAnalysis {
    pub fn status(&self) -> TranscriptStatus {
        if !self.validation.passed {
            TranscriptStatus::Failed
        } else if !self.validation.warnings.is_empty() || !self.rejected.is_empty() {
            TranscriptStatus::Flagged
        } else {
            TranscriptStatus::Passed
        }
    }
}

pub fn check_assignment(
    transcript: &Transcript,
    assignment: &CodeAssignment,
) -> Result<(), DataContractError> {
    if !(0.0..=1.0).contains(&assignment.confidence) {
        return Err(DataContractError::ConfidenceOutOfRange {
            utterance_id: assignment.utterance_id.clone(),
            rater_id: assignment.rater_id.clone(),
            confidence: assignment.confidence,
        });
    }
    if assignment.rater_id.trim().is_empty() {
        return Err(DataContractError::EmptyIdentifier("rater"));
    }
    if assignment.code.trim().is_empty() {
        return Err(DataContractError::EmptyIdentifier("code"));
    }
    if !transcript.contains(&assignment.utterance_id) {
        return Err(DataContractError::UnknownUtterance {
            utterance_id: assignment.utterance_id.clone(),
            rater_id: assignment.rater_id.clone(),
        });
    }
    Ok(())
}

/// Splits assignments into those honouring the data contract and those
/// rejected, keeping the reason for each rejection.
pub fn admit(
    transcript: &Transcript,
    assignments: &[CodeAssignment],
) -> (Vec<CodeAssignment>, Vec<RejectedAssignment>) {
    let mut admitted = Vec::with_capacity(assignments.len());
    let mut rejected = Vec::new();

    for assignment in assignments {
        match check_assignment(transcript, assignment) {
            Ok(()) => admitted.push(assignment.clone()),
            Err(error) => {
                warn!(
                    transcript_id = %transcript.id(),
                    utterance_id = %assignment.utterance_id,
                    rater_id = %assignment.rater_id,
                    error = %error,
                    "rejected assignment"
                );
                rejected.push(RejectedAssignment {
                    assignment: assignment.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    (admitted, rejected)
}

pub fn analyze_transcript(
    inputs: &TranscriptInputs,
    profiles: &[DomainProfile],
    config: &AnalysisConfig,
) -> Result<TranscriptAnalysis, DataContractError> {
    let transcript = &inputs.transcript;
    let (admitted, rejected) = admit(transcript, &inputs.assignments);

    let verdict = domain::classify_transcript(transcript, profiles, &config.classifier)?;
    let plan = strategy::select(&verdict);
    debug!(
        transcript_id = %transcript.id(),
        domain = %verdict.domain_id,
        confidence = verdict.confidence,
        mode = %plan.mode,
        "strategy selected"
    );

    let selection = strategy::apply(&plan, &admitted, config.min_acceptance_confidence);
    let responding = consensus::responding_raters(&inputs.roster, &admitted);

    let per_rater = agreement::group_by_rater(&selection.assignments, &inputs.roster);
    let code_space = agreement::code_space_of(&selection.assignments);
    let reliability = agreement::compute(&per_rater, &code_space);

    let merged = consensus::merge(
        transcript,
        &selection.assignments,
        &responding,
        &reliability,
        &plan.source_weights(),
        &config.consensus,
    );
    let accepted = consensus::accepted_assignments(&merged);
    let coverage_report = coverage::analyze(transcript, &accepted, config.min_acceptance_confidence);

    let deductive_only = merged
        .iter()
        .filter(|entry| entry.sources.contains(&CodeSource::Deductive))
        .filter_map(|entry| entry.to_accepted_assignment(consensus::CONSENSUS_RATER_ID))
        .collect::<Vec<CodeAssignment>>();
    let deductive_only_coverage =
        coverage::analyze(transcript, &deductive_only, config.min_acceptance_confidence)
            .utterance_coverage_ratio;

    let quality = consensus::quality(&merged, &reliability, &config.consensus);
    let disagreements = consensus::disagreements(&merged, &responding);
    let validation = validator::validate(
        &merged,
        &coverage_report,
        &reliability,
        &verdict,
        &config.validator,
    );

    debug!(
        transcript_id = %transcript.id(),
        accepted = quality.accepted,
        rejected_groups = quality.rejected,
        coverage = coverage_report.utterance_coverage_ratio,
        passed = validation.passed,
        "transcript analysed"
    );

    Ok(TranscriptAnalysis {
        transcript_id: transcript.id().to_string(),
        utterance_count: transcript.len(),
        domain: verdict,
        strategy: StrategyOutcome {
            plan,
            deductive_offered: selection.deductive_offered,
            inductive_offered: selection.inductive_offered,
            deductive_kept: selection.deductive_kept,
            inductive_kept: selection.inductive_kept,
            deductive_only_coverage,
            coverage_improvement: (coverage_report.utterance_coverage_ratio
                - deductive_only_coverage)
                .max(0.0),
        },
        reliability,
        consensus: merged,
        quality,
        disagreements,
        coverage: coverage_report,
        validation,
        rejected,
    })
}

/// Analyses independent transcripts in parallel, at most `max_workers` at a
/// time. Results come back in input order; a contract failure on one
/// transcript is returned in its slot and does not stop the others.
pub fn analyze_batch(
    inputs: &[TranscriptInputs],
    profiles: &[DomainProfile],
    config: &AnalysisConfig,
    max_workers: usize,
) -> Vec<Result<TranscriptAnalysis, DataContractError>> {
    let mut results = Vec::with_capacity(inputs.len());

    for chunk in inputs.chunks(max_workers.max(1)) {
        let chunk_results = thread::scope(|scope| {
            let handles = chunk
                .iter()
                .map(|input| scope.spawn(move || analyze_transcript(input, profiles, config)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>()
        });
        results.extend(chunk_results);
    }

    results
}
