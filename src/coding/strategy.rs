use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::consensus::SourceWeights;
use crate::model::{CodeAssignment, DomainVerdict};

pub const DEDUCTIVE_PRIMARY_FLOOR: f64 = 0.8;
pub const BALANCED_FLOOR: f64 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridMode {
    DeductivePrimary,
    Balanced,
    InductivePrimary,
}

impl HybridMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeductivePrimary => "deductive_primary",
            Self::Balanced => "balanced",
            Self::InductivePrimary => "inductive_primary",
        }
    }
}

impl fmt::Display for HybridMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub mode: HybridMode,
    pub deductive_weight: f64,
    pub inductive_weight: f64,
}

impl StrategyPlan {
    pub fn source_weights(&self) -> SourceWeights {
        SourceWeights {
            deductive: self.deductive_weight,
            inductive: self.inductive_weight,
        }
    }
}

/// Picks how deductive and inductive coding combine, from the domain verdict
/// alone. Tiers include their lower bound; an unknown domain is always
/// inductive-primary.
pub fn select(verdict: &DomainVerdict) -> StrategyPlan {
    let confidence = verdict.confidence;

    let mode = if verdict.is_unknown() || !confidence.is_finite() {
        HybridMode::InductivePrimary
    } else if confidence >= DEDUCTIVE_PRIMARY_FLOOR {
        HybridMode::DeductivePrimary
    } else if confidence >= BALANCED_FLOOR {
        HybridMode::Balanced
    } else {
        HybridMode::InductivePrimary
    };

    let weights = match mode {
        HybridMode::DeductivePrimary => SourceWeights {
            deductive: 0.7,
            inductive: 0.3,
        },
        HybridMode::Balanced => SourceWeights::uniform(),
        HybridMode::InductivePrimary => SourceWeights {
            deductive: 0.3,
            inductive: 0.7,
        },
    };

    StrategyPlan {
        mode,
        deductive_weight: weights.deductive,
        inductive_weight: weights.inductive,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSelection {
    pub assignments: Vec<CodeAssignment>,
    pub deductive_offered: usize,
    pub inductive_offered: usize,
    pub deductive_kept: usize,
    pub inductive_kept: usize,
}

/// Gates the deductive and inductive streams according to `plan`.
///
/// * deductive-primary: inductive/emergent codes only on utterances without
///   an accepted deductive code.
/// * balanced: both streams pass unchanged.
/// * inductive-primary: deductive codes only on utterances that already carry
///   an inductive/emergent code.
pub fn apply(
    plan: &StrategyPlan,
    assignments: &[CodeAssignment],
    min_acceptance: f64,
) -> StreamSelection {
    let (deductive, inductive): (Vec<&CodeAssignment>, Vec<&CodeAssignment>) = assignments
        .iter()
        .partition(|assignment| assignment.source.is_deductive());

    let selected: Vec<CodeAssignment> = match plan.mode {
        HybridMode::Balanced => assignments.to_vec(),
        HybridMode::DeductivePrimary => {
            let covered = deductive
                .iter()
                .filter(|assignment| assignment.confidence >= min_acceptance)
                .map(|assignment| assignment.utterance_id.as_str())
                .collect::<HashSet<&str>>();
            assignments
                .iter()
                .filter(|assignment| {
                    assignment.source.is_deductive()
                        || !covered.contains(assignment.utterance_id.as_str())
                })
                .cloned()
                .collect()
        }
        HybridMode::InductivePrimary => {
            let discovered = inductive
                .iter()
                .map(|assignment| assignment.utterance_id.as_str())
                .collect::<HashSet<&str>>();
            assignments
                .iter()
                .filter(|assignment| {
                    !assignment.source.is_deductive()
                        || discovered.contains(assignment.utterance_id.as_str())
                })
                .cloned()
                .collect()
        }
    };

    let deductive_kept = selected
        .iter()
        .filter(|assignment| assignment.source.is_deductive())
        .count();

    StreamSelection {
        deductive_offered: deductive.len(),
        inductive_offered: inductive.len(),
        deductive_kept,
        inductive_kept: selected.len() - deductive_kept,
        assignments: selected,
    }
}

#[cfg(test)]
mod tests;
