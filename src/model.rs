use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataContractError;

pub const UNKNOWN_DOMAIN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: String,
    pub sequence_index: usize,
    pub speaker: String,
    pub text: String,
    pub token_count: usize,
}

impl Utterance {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Dialogue-ordered utterances of one transcript. Read-only once built.
#[derive(Debug, Clone)]
pub struct Transcript {
    transcript_id: String,
    utterances: Vec<Utterance>,
    total_tokens: usize,
    positions: HashMap<String, usize>,
}

impl Transcript {
    pub fn new(
        transcript_id: impl Into<String>,
        utterances: Vec<Utterance>,
    ) -> Result<Self, DataContractError> {
        let transcript_id = transcript_id.into();
        if transcript_id.trim().is_empty() {
            return Err(DataContractError::EmptyIdentifier("transcript"));
        }

        let mut positions = HashMap::with_capacity(utterances.len());
        for (position, utterance) in utterances.iter().enumerate() {
            if utterance.id.trim().is_empty() {
                return Err(DataContractError::EmptyIdentifier("utterance"));
            }
            if positions.insert(utterance.id.clone(), position).is_some() {
                return Err(DataContractError::DuplicateUtterance(utterance.id.clone()));
            }
        }

        let total_tokens = utterances.iter().map(|utterance| utterance.token_count).sum();

        Ok(Self {
            transcript_id,
            utterances,
            total_tokens,
            positions,
        })
    }

    pub fn id(&self) -> &str {
        &self.transcript_id
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn get(&self, utterance_id: &str) -> Option<&Utterance> {
        self.positions
            .get(utterance_id)
            .map(|position| &self.utterances[*position])
    }

    pub fn contains(&self, utterance_id: &str) -> bool {
        self.positions.contains_key(utterance_id)
    }

    pub fn sequence_index(&self, utterance_id: &str) -> Option<usize> {
        self.get(utterance_id)
            .map(|utterance| utterance.sequence_index)
    }

    pub fn full_text(&self) -> String {
        self.utterances
            .iter()
            .map(|utterance| utterance.text.as_str())
            .collect::<Vec<&str>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    Deductive,
    Inductive,
    Emergent,
}

impl CodeSource {
    pub fn is_deductive(self) -> bool {
        matches!(self, Self::Deductive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAssignment {
    pub utterance_id: String,
    pub code: String,
    pub rater_id: String,
    pub confidence: f64,
    pub source: CodeSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainProfileConfig {
    pub domain_id: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default = "default_profile_weight")]
    pub weight: f64,
}

fn default_profile_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainVerdict {
    pub domain_id: String,
    pub confidence: f64,
    pub score_per_domain: BTreeMap<String, f64>,
    pub hits_per_domain: BTreeMap<String, usize>,
    pub matched_keywords: Vec<String>,
}

impl DomainVerdict {
    pub fn is_unknown(&self) -> bool {
        self.domain_id == UNKNOWN_DOMAIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Majority,
    ConfidenceWeighted,
    SingleRaterFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusAssignment {
    pub utterance_id: String,
    pub sequence_index: usize,
    pub code: String,
    pub accepted: bool,
    pub agreement_ratio: f64,
    pub contributing_raters: BTreeSet<String>,
    pub resolution_method: Option<ResolutionMethod>,
    pub mean_confidence: f64,
    pub weighted_confidence: f64,
    pub sources: BTreeSet<CodeSource>,
    pub code_reliability: Option<f64>,
}

impl ConsensusAssignment {
    /// Accepted merge result expressed as a single consensus-rated assignment.
    pub fn to_accepted_assignment(&self, rater_id: &str) -> Option<CodeAssignment> {
        if !self.accepted {
            return None;
        }

        let source = self
            .sources
            .iter()
            .next()
            .copied()
            .unwrap_or(CodeSource::Deductive);

        Some(CodeAssignment {
            utterance_id: self.utterance_id.clone(),
            code: self.code.clone(),
            rater_id: rater_id.to_string(),
            confidence: self.mean_confidence,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseAgreement {
    pub rater_a: String,
    pub rater_b: String,
    pub agreement: Option<f64>,
    pub cohen_kappa: Option<f64>,
    pub agreed: usize,
    pub compared: usize,
    pub per_code: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAgreement {
    pub agreement: Option<f64>,
    pub alpha: Option<f64>,
    pub contributing_raters: usize,
    pub utterances_applied: usize,
    pub agreed: usize,
    pub compared: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityCounts {
    pub rater_ids: Vec<String>,
    pub active_raters: usize,
    pub item_count: usize,
    pub pairable_values: usize,
    pub observed_disagreement: Option<f64>,
    pub expected_disagreement: Option<f64>,
}

/// Inter-rater reliability over binary (utterance, code) items.
///
/// `None` always means "could not compute", never zero agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    pub overall_alpha: Option<f64>,
    pub fleiss_kappa: Option<f64>,
    pub pairwise: Vec<PairwiseAgreement>,
    pub per_code_agreement: BTreeMap<String, CodeAgreement>,
    pub counts: ReliabilityCounts,
}

impl ReliabilityReport {
    pub fn code_agreement(&self, code: &str) -> Option<f64> {
        self.per_code_agreement
            .get(code)
            .and_then(|entry| entry.agreement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBucket {
    Low,
    Medium,
    High,
}

impl ConfidenceBucket {
    pub const MEDIUM_FLOOR: f64 = 0.5;
    pub const HIGH_FLOOR: f64 = 0.8;

    pub fn all() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    pub fn for_confidence(confidence: f64) -> Self {
        if confidence >= Self::HIGH_FLOOR {
            Self::High
        } else if confidence >= Self::MEDIUM_FLOOR {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncodedReason {
    Empty,
    TooShort,
    ShortQuestion,
    NoMatchingCodes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncodedSegment {
    pub utterance_id: String,
    pub speaker: String,
    pub token_count: usize,
    pub reason: UncodedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub utterance_coverage_ratio: f64,
    pub token_coverage_ratio: f64,
    pub total_utterances: usize,
    pub non_empty_utterances: usize,
    pub total_tokens: usize,
    pub covered_tokens: usize,
    pub assignment_count: usize,
    pub codes_per_covered_utterance: f64,
    pub coded_utterance_ids: Vec<String>,
    pub uncoded_utterance_ids: Vec<String>,
    pub uncoded_segments: Vec<UncodedSegment>,
    pub confidence_histogram: BTreeMap<ConfidenceBucket, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Pass,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub check_id: String,
    pub name: String,
    pub result: CheckResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub confidence_score: f64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub checks: Vec<ValidationCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedAssignment {
    pub assignment: CodeAssignment,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtteranceInput {
    pub id: String,
    #[serde(default)]
    pub sequence_index: Option<usize>,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub token_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptInput {
    pub transcript_id: String,
    pub utterances: Vec<UtteranceInput>,
}

impl TranscriptInput {
    pub fn into_transcript(self) -> Result<Transcript, DataContractError> {
        let utterances = self
            .utterances
            .into_iter()
            .enumerate()
            .map(|(position, input)| {
                let token_count = input
                    .token_count
                    .unwrap_or_else(|| input.text.split_whitespace().count());
                Utterance {
                    id: input.id,
                    sequence_index: input.sequence_index.unwrap_or(position),
                    speaker: input.speaker,
                    text: input.text,
                    token_count,
                }
            })
            .collect::<Vec<Utterance>>();

        Transcript::new(self.transcript_id, utterances)
    }
}

/// One transcript plus every raw per-rater judgment collected for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingBundle {
    pub transcript: TranscriptInput,
    #[serde(default)]
    pub raters: Vec<String>,
    #[serde(default)]
    pub assignments: Vec<CodeAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Passed,
    Flagged,
    Failed,
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Passed => "passed",
            Self::Flagged => "flagged",
            Self::Failed => "failed",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub input_path: String,
    pub input_sha256: Option<String>,
    pub transcript_id: Option<String>,
    pub status: TranscriptStatus,
    pub result_path: Option<String>,
    pub domain_id: Option<String>,
    pub utterance_coverage_ratio: Option<f64>,
    pub confidence_score: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageSummary {
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub transcript_count: usize,
    pub passed_count: usize,
    pub flagged_count: usize,
    pub failed_count: usize,
    pub domain_distribution: BTreeMap<String, usize>,
    pub coverage: CoverageSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_directory: String,
    pub profiles_sha256: String,
    pub consensus_threshold: f64,
    pub summary: BatchSummary,
    pub entries: Vec<BatchEntry>,
}

#[cfg(test)]
mod tests;
