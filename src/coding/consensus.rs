use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::ConsensusOptions;
use crate::model::{
    CodeAssignment, CodeSource, ConsensusAssignment, ReliabilityReport, ResolutionMethod,
    Transcript,
};

pub const CONSENSUS_RATER_ID: &str = "consensus";

// Ratios and means within this distance below a threshold count as meeting it.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Trust given to each coding stream in the confidence-weighted mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    pub deductive: f64,
    pub inductive: f64,
}

impl SourceWeights {
    pub fn uniform() -> Self {
        Self {
            deductive: 0.5,
            inductive: 0.5,
        }
    }

    pub fn weight_for(&self, source: CodeSource) -> f64 {
        if source.is_deductive() {
            self.deductive
        } else {
            self.inductive
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Vote {
    confidence: f64,
    source: CodeSource,
}

#[derive(Debug, Default)]
struct Group {
    votes: BTreeMap<String, Vote>,
    sources: BTreeSet<CodeSource>,
}

/// Raters that answered for this transcript: everyone on the roster plus
/// anyone who produced an assignment. A rater that answered with no codes
/// still counts; a rater that never answered does not.
pub fn responding_raters(roster: &[String], assignments: &[CodeAssignment]) -> BTreeSet<String> {
    roster
        .iter()
        .cloned()
        .chain(
            assignments
                .iter()
                .map(|assignment| assignment.rater_id.clone()),
        )
        .collect()
}

fn meets(value: f64, threshold: f64) -> bool {
    value + THRESHOLD_EPSILON >= threshold
}

/// Decides whether a (utterance, code) group is accepted and by which rule.
pub fn resolve(
    raters_in_group: usize,
    agreement_ratio: f64,
    weighted_confidence: f64,
    options: &ConsensusOptions,
) -> Option<ResolutionMethod> {
    if meets(agreement_ratio, options.threshold) {
        Some(ResolutionMethod::Majority)
    } else if raters_in_group >= 2 && meets(weighted_confidence, options.threshold) {
        Some(ResolutionMethod::ConfidenceWeighted)
    } else if raters_in_group == 1 && meets(weighted_confidence, options.single_rater_threshold) {
        Some(ResolutionMethod::SingleRaterFallback)
    } else {
        None
    }
}

/// Merges per-rater assignments into one consensus entry per (utterance, code).
///
/// `responding` is the rater set used as the agreement denominator. Every
/// group is emitted, rejected ones with `accepted = false`, ordered by
/// utterance sequence index and then code.
pub fn merge(
    transcript: &Transcript,
    assignments: &[CodeAssignment],
    responding: &BTreeSet<String>,
    reliability: &ReliabilityReport,
    weights: &SourceWeights,
    options: &ConsensusOptions,
) -> Vec<ConsensusAssignment> {
    let active = responding
        .iter()
        .map(String::as_str)
        .chain(
            assignments
                .iter()
                .map(|assignment| assignment.rater_id.as_str()),
        )
        .collect::<BTreeSet<&str>>()
        .len();
    let mut groups = BTreeMap::<(usize, String, String), Group>::new();

    for assignment in assignments {
        let Some(sequence_index) = transcript.sequence_index(&assignment.utterance_id) else {
            continue;
        };

        let group = groups
            .entry((
                sequence_index,
                assignment.code.clone(),
                assignment.utterance_id.clone(),
            ))
            .or_default();
        group.sources.insert(assignment.source);

        let vote = Vote {
            confidence: assignment.confidence,
            source: assignment.source,
        };
        group
            .votes
            .entry(assignment.rater_id.clone())
            .and_modify(|existing| {
                if vote.confidence > existing.confidence {
                    *existing = vote;
                }
            })
            .or_insert(vote);
    }

    groups
        .into_iter()
        .map(|((sequence_index, code, utterance_id), group)| {
            let raters_in_group = group.votes.len();
            let agreement_ratio = raters_in_group as f64 / active.max(1) as f64;
            let mean_confidence = group
                .votes
                .values()
                .map(|vote| vote.confidence)
                .sum::<f64>()
                / raters_in_group as f64;
            let weighted_confidence = weighted_mean(&group, weights).unwrap_or(mean_confidence);

            let resolution_method =
                resolve(raters_in_group, agreement_ratio, weighted_confidence, options);
            let code_reliability = reliability.code_agreement(&code);

            ConsensusAssignment {
                utterance_id,
                sequence_index,
                code,
                accepted: resolution_method.is_some(),
                agreement_ratio,
                contributing_raters: group.votes.into_keys().collect(),
                resolution_method,
                mean_confidence,
                weighted_confidence,
                sources: group.sources,
                code_reliability,
            }
        })
        .collect()
}

fn weighted_mean(group: &Group, weights: &SourceWeights) -> Option<f64> {
    let total_weight = group
        .votes
        .values()
        .map(|vote| weights.weight_for(vote.source))
        .sum::<f64>();
    if total_weight <= 0.0 {
        return None;
    }

    let weighted = group
        .votes
        .values()
        .map(|vote| vote.confidence * weights.weight_for(vote.source))
        .sum::<f64>();
    Some(weighted / total_weight)
}

pub fn accepted_assignments(consensus: &[ConsensusAssignment]) -> Vec<CodeAssignment> {
    consensus
        .iter()
        .filter_map(|entry| entry.to_accepted_assignment(CONSENSUS_RATER_ID))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusQuality {
    pub groups_considered: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub majority: usize,
    pub confidence_weighted: usize,
    pub single_rater_fallback: usize,
    pub high_consensus_groups: usize,
    pub mean_agreement: Option<f64>,
    pub mean_confidence: Option<f64>,
    pub overall_quality: Option<f64>,
    pub overall_alpha: Option<f64>,
}

pub fn quality(
    consensus: &[ConsensusAssignment],
    reliability: &ReliabilityReport,
    options: &ConsensusOptions,
) -> ConsensusQuality {
    let count_method = |method: ResolutionMethod| {
        consensus
            .iter()
            .filter(|entry| entry.resolution_method == Some(method))
            .count()
    };

    let accepted = consensus.iter().filter(|entry| entry.accepted).count();
    let (mean_agreement, mean_confidence) = if consensus.is_empty() {
        (None, None)
    } else {
        let count = consensus.len() as f64;
        (
            Some(consensus.iter().map(|entry| entry.agreement_ratio).sum::<f64>() / count),
            Some(consensus.iter().map(|entry| entry.mean_confidence).sum::<f64>() / count),
        )
    };

    ConsensusQuality {
        groups_considered: consensus.len(),
        accepted,
        rejected: consensus.len() - accepted,
        majority: count_method(ResolutionMethod::Majority),
        confidence_weighted: count_method(ResolutionMethod::ConfidenceWeighted),
        single_rater_fallback: count_method(ResolutionMethod::SingleRaterFallback),
        high_consensus_groups: consensus
            .iter()
            .filter(|entry| meets(entry.agreement_ratio, options.threshold))
            .count(),
        mean_agreement,
        mean_confidence,
        overall_quality: mean_confidence
            .zip(mean_agreement)
            .map(|(confidence, agreement)| confidence * 0.6 + agreement * 0.4),
        overall_alpha: reliability.overall_alpha,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementPriority {
    SingleRater,
    Split,
    NearConsensus,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disagreement {
    pub utterance_id: String,
    pub code: String,
    pub applied_by: BTreeSet<String>,
    pub missing_from: BTreeSet<String>,
    pub priority: DisagreementPriority,
}

/// Groups where some responding raters applied the code and others did not.
pub fn disagreements(
    consensus: &[ConsensusAssignment],
    responding: &BTreeSet<String>,
) -> Vec<Disagreement> {
    let total = responding.len();

    consensus
        .iter()
        .filter_map(|entry| {
            let missing_from = responding
                .difference(&entry.contributing_raters)
                .cloned()
                .collect::<BTreeSet<String>>();
            if missing_from.is_empty() {
                return None;
            }

            let applied = entry.contributing_raters.len();
            let priority = if applied == 1 && total > 2 {
                DisagreementPriority::SingleRater
            } else if applied * 2 == total {
                DisagreementPriority::Split
            } else if applied + 1 == total {
                DisagreementPriority::NearConsensus
            } else {
                DisagreementPriority::Mixed
            };

            Some(Disagreement {
                utterance_id: entry.utterance_id.clone(),
                code: entry.code.clone(),
                applied_by: entry.contributing_raters.clone(),
                missing_from,
                priority,
            })
        })
        .collect()
}
