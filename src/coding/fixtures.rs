use crate::model::{CodeAssignment, CodeSource, DomainProfileConfig, Transcript, Utterance};

pub fn utterance(id: &str, index: usize, text: &str) -> Utterance {
    Utterance {
        id: id.to_string(),
        sequence_index: index,
        speaker: if index % 2 == 0 {
            "interviewer".to_string()
        } else {
            "participant".to_string()
        },
        text: text.to_string(),
        token_count: text.split_whitespace().count(),
    }
}

pub fn transcript(texts: &[&str]) -> Transcript {
    let utterances = texts
        .iter()
        .enumerate()
        .map(|(index, text)| utterance(&format!("u{index}"), index, text))
        .collect();
    Transcript::new("t-1", utterances).expect("fixture transcript should be valid")
}

/// A transcript of `count` utterances that are each long enough to code.
pub fn long_transcript(count: usize) -> Transcript {
    let texts = (0..count)
        .map(|index| format!("participant describes situation number {index} in some detail"))
        .collect::<Vec<String>>();
    let refs = texts.iter().map(String::as_str).collect::<Vec<&str>>();
    transcript(&refs)
}

pub fn assign(utterance: &str, code: &str, rater: &str, confidence: f64) -> CodeAssignment {
    CodeAssignment {
        utterance_id: utterance.to_string(),
        code: code.to_string(),
        rater_id: rater.to_string(),
        confidence,
        source: CodeSource::Deductive,
    }
}

pub fn assign_inductive(
    utterance: &str,
    code: &str,
    rater: &str,
    confidence: f64,
) -> CodeAssignment {
    CodeAssignment {
        source: CodeSource::Inductive,
        ..assign(utterance, code, rater, confidence)
    }
}

pub fn roster(raters: &[&str]) -> Vec<String> {
    raters.iter().map(|rater| rater.to_string()).collect()
}

pub fn profile(domain_id: &str, keywords: &[&str]) -> DomainProfileConfig {
    DomainProfileConfig {
        domain_id: domain_id.to_string(),
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        patterns: Vec::new(),
        weight: 1.0,
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
