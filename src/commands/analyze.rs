use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{AnalyzeArgs, FailOn};
use crate::coding::pipeline::{self, TranscriptAnalysis};
use crate::commands::inputs::{load_bundle, load_config, load_profiles};
use crate::model::TranscriptStatus;
use crate::util::{now_utc_string, write_json_pretty};

const RESULT_BUNDLE_VERSION: u32 = 1;

/// Everything a report renderer needs about one analysed transcript.
#[derive(Debug, Serialize)]
pub struct ResultBundle<'a> {
    pub bundle_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: &'a str,
    pub profiles_sha256: &'a str,
    pub status: TranscriptStatus,
    #[serde(flatten)]
    pub analysis: &'a TranscriptAnalysis,
}

impl<'a> ResultBundle<'a> {
    pub fn new(
        input_path: &Path,
        input_sha256: &'a str,
        profiles_sha256: &'a str,
        analysis: &'a TranscriptAnalysis,
    ) -> Self {
        Self {
            bundle_version: RESULT_BUNDLE_VERSION,
            generated_at: now_utc_string(),
            input_path: input_path.display().to_string(),
            input_sha256,
            profiles_sha256,
            status: analysis.status(),
            analysis,
        }
    }
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.threshold)?;
    let profiles = load_profiles(&args.profiles)?;
    let bundle = load_bundle(&args.input)?;

    info!(
        input = %args.input.display(),
        transcript_id = %bundle.inputs.transcript.id(),
        utterances = bundle.inputs.transcript.len(),
        assignments = bundle.inputs.assignments.len(),
        threshold = config.consensus.threshold,
        "analysing transcript"
    );

    let analysis = pipeline::analyze_transcript(&bundle.inputs, &profiles.profiles, &config)
        .with_context(|| format!("failed to analyse {}", args.input.display()))?;

    let output_path = args
        .output_path
        .unwrap_or_else(|| result_path(&args.out_dir.join("results"), &analysis.transcript_id));
    let result = ResultBundle::new(&args.input, &bundle.sha256, &profiles.sha256, &analysis);
    write_json_pretty(&output_path, &result)?;

    log_outcome(&analysis);
    info!(path = %output_path.display(), "wrote result bundle");

    if should_fail(args.fail_on, result.status) {
        bail!(
            "transcript {} finished with status {} (--fail-on {})",
            analysis.transcript_id,
            result.status,
            args.fail_on.as_str()
        );
    }

    Ok(())
}

pub fn log_outcome(analysis: &TranscriptAnalysis) {
    for error in &analysis.validation.errors {
        warn!(transcript_id = %analysis.transcript_id, finding = %error, "validation error");
    }
    for warning in &analysis.validation.warnings {
        warn!(transcript_id = %analysis.transcript_id, finding = %warning, "validation warning");
    }

    info!(
        transcript_id = %analysis.transcript_id,
        status = %analysis.status(),
        domain = %analysis.domain.domain_id,
        mode = %analysis.strategy.plan.mode,
        accepted = analysis.quality.accepted,
        rejected_groups = analysis.quality.rejected,
        rejected_assignments = analysis.rejected.len(),
        coverage = analysis.coverage.utterance_coverage_ratio,
        confidence_score = analysis.validation.confidence_score,
        "analysis completed"
    );
}

pub fn should_fail(fail_on: FailOn, status: TranscriptStatus) -> bool {
    match fail_on {
        FailOn::Never => false,
        FailOn::Error => status == TranscriptStatus::Failed,
        FailOn::Warning => status != TranscriptStatus::Passed,
    }
}

/// Result file for `stem` inside `dir`, with characters unsafe in file names
/// replaced by `_`.
pub fn result_path(dir: &Path, stem: &str) -> PathBuf {
    let safe = stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '-' | '_' | '.') {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();
    dir.join(format!("{safe}.result.json"))
}
