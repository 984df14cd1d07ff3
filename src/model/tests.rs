use super::*;

#[test]
fn bundle_input_fills_missing_index_and_token_count() {
    let raw = serde_json::json!({
        "transcript": {
            "transcript_id": "interview-07",
            "utterances": [
                { "id": "a", "speaker": "interviewer", "text": "How was the first week?" },
                { "id": "b", "sequence_index": 7, "text": "Hard", "token_count": 3 }
            ]
        },
        "raters": ["r1", "r2"],
        "assignments": [
            {
                "utterance_id": "b",
                "code": "CHALLENGE::Onboarding",
                "rater_id": "r1",
                "confidence": 0.9,
                "source": "deductive"
            }
        ]
    });

    let bundle: CodingBundle = serde_json::from_value(raw).expect("bundle should deserialize");
    assert_eq!(bundle.raters, vec!["r1", "r2"]);
    assert_eq!(bundle.assignments[0].source, CodeSource::Deductive);

    let transcript = bundle
        .transcript
        .into_transcript()
        .expect("transcript should be valid");
    assert_eq!(transcript.id(), "interview-07");
    assert_eq!(transcript.sequence_index("a"), Some(0));
    assert_eq!(transcript.sequence_index("b"), Some(7));
    assert_eq!(transcript.get("a").map(|utterance| utterance.token_count), Some(5));
    assert_eq!(transcript.total_tokens(), 8);
    assert_eq!(transcript.full_text(), "How was the first week?\nHard");
}

#[test]
fn duplicate_utterance_ids_are_rejected() {
    let input = TranscriptInput {
        transcript_id: "t".to_string(),
        utterances: vec![
            UtteranceInput {
                id: "a".to_string(),
                sequence_index: None,
                speaker: String::new(),
                text: "one".to_string(),
                token_count: None,
            },
            UtteranceInput {
                id: "a".to_string(),
                sequence_index: None,
                speaker: String::new(),
                text: "two".to_string(),
                token_count: None,
            },
        ],
    };

    let error = input
        .into_transcript()
        .expect_err("duplicate ids should be rejected");
    assert_eq!(error, DataContractError::DuplicateUtterance("a".to_string()));
}

#[test]
fn empty_transcript_id_is_rejected() {
    let error = Transcript::new(" ", Vec::new()).expect_err("blank id should be rejected");
    assert_eq!(error, DataContractError::EmptyIdentifier("transcript"));
}

#[test]
fn confidence_buckets_include_lower_edges() {
    assert_eq!(ConfidenceBucket::for_confidence(0.0), ConfidenceBucket::Low);
    assert_eq!(ConfidenceBucket::for_confidence(0.49), ConfidenceBucket::Low);
    assert_eq!(ConfidenceBucket::for_confidence(0.5), ConfidenceBucket::Medium);
    assert_eq!(ConfidenceBucket::for_confidence(0.8), ConfidenceBucket::High);
    assert_eq!(ConfidenceBucket::for_confidence(1.0), ConfidenceBucket::High);
}

#[test]
fn rejected_consensus_yields_no_assignment() {
    let entry = ConsensusAssignment {
        utterance_id: "u0".to_string(),
        sequence_index: 0,
        code: "X".to_string(),
        accepted: false,
        agreement_ratio: 0.5,
        contributing_raters: BTreeSet::from(["A".to_string()]),
        resolution_method: None,
        mean_confidence: 0.8,
        weighted_confidence: 0.8,
        sources: BTreeSet::from([CodeSource::Inductive]),
        code_reliability: None,
    };

    assert_eq!(entry.to_accepted_assignment("consensus"), None);

    let accepted = ConsensusAssignment {
        accepted: true,
        resolution_method: Some(ResolutionMethod::Majority),
        ..entry
    };
    let assignment = accepted
        .to_accepted_assignment("consensus")
        .expect("accepted entry should convert");
    assert_eq!(assignment.source, CodeSource::Inductive);
    assert_eq!(assignment.rater_id, "consensus");
}
