use thiserror::Error;

/// Malformed input detected at the boundary of the coding core.
///
/// Item-level variants reject a single assignment and processing continues;
/// transcript-level variants are recorded against that transcript only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataContractError {
    #[error("assignment by rater `{rater_id}` references unknown utterance `{utterance_id}`")]
    UnknownUtterance {
        utterance_id: String,
        rater_id: String,
    },

    #[error("confidence {confidence} from rater `{rater_id}` on utterance `{utterance_id}` is outside [0, 1]")]
    ConfidenceOutOfRange {
        utterance_id: String,
        rater_id: String,
        confidence: f64,
    },

    #[error("domain profile set is empty")]
    EmptyProfileSet,

    #[error("invalid pattern `{pattern}` in domain profile `{domain_id}`: {message}")]
    InvalidPattern {
        domain_id: String,
        pattern: String,
        message: String,
    },

    #[error("domain profile `{domain_id}` has invalid weight {weight}")]
    InvalidWeight { domain_id: String, weight: f64 },

    #[error("domain profile `{0}` is defined more than once")]
    DuplicateDomain(String),

    #[error("utterance id `{0}` appears more than once in the transcript")]
    DuplicateUtterance(String),

    #[error("empty {0} identifier")]
    EmptyIdentifier(&'static str),
}
