use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::BatchArgs;
use crate::coding::pipeline::{self, TranscriptAnalysis};
use crate::commands::analyze::{ResultBundle, log_outcome, result_path, should_fail};
use crate::commands::inputs::{load_bundle, load_config, load_profiles};
use crate::model::{BatchEntry, BatchManifest, BatchSummary, CoverageSummary, TranscriptStatus};
use crate::util::{
    ensure_directory, json_files_in, now_utc_string, utc_compact_string, write_json_pretty,
};

const BATCH_MANIFEST_VERSION: u32 = 1;

enum Slot<'a> {
    Unreadable(BatchEntry),
    Loaded {
        path: &'a Path,
        sha256: String,
        transcript_id: String,
    },
}

pub fn run(args: BatchArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let config = load_config(args.config.as_deref(), args.threshold)?;
    let profiles = load_profiles(&args.profiles)?;

    let files = json_files_in(&args.input_dir)?;
    if files.is_empty() {
        bail!("no coding bundles found in {}", args.input_dir.display());
    }

    let run_dir = args.out_dir.join("runs").join(&run_id);
    ensure_directory(&run_dir)?;

    info!(
        run_id = %run_id,
        input_dir = %args.input_dir.display(),
        bundle_count = files.len(),
        max_workers = args.max_workers,
        "starting batch"
    );

    let mut slots = Vec::with_capacity(files.len());
    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        match load_bundle(path) {
            Ok(bundle) => {
                slots.push(Slot::Loaded {
                    path,
                    sha256: bundle.sha256,
                    transcript_id: bundle.inputs.transcript.id().to_string(),
                });
                inputs.push(bundle.inputs);
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(path = %path.display(), error = %reason, "skipping unreadable bundle");
                slots.push(Slot::Unreadable(failed_entry(path, None, None, reason)));
            }
        }
    }

    let mut outcomes =
        pipeline::analyze_batch(&inputs, &profiles.profiles, &config, args.max_workers)
            .into_iter();

    let mut entries = Vec::with_capacity(slots.len());
    for slot in slots {
        let (path, sha256, transcript_id) = match slot {
            Slot::Unreadable(entry) => {
                entries.push(entry);
                continue;
            }
            Slot::Loaded {
                path,
                sha256,
                transcript_id,
            } => (path, sha256, transcript_id),
        };

        let Some(outcome) = outcomes.next() else {
            bail!("batch produced fewer outcomes than loaded bundles");
        };

        let entry = match outcome {
            Ok(analysis) => {
                let output_path = result_path(&run_dir, &file_stem(path));
                write_json_pretty(
                    &output_path,
                    &ResultBundle::new(path, &sha256, &profiles.sha256, &analysis),
                )?;
                log_outcome(&analysis);
                analysed_entry(path, sha256, &analysis, output_path)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    transcript_id = %transcript_id,
                    error = %err,
                    "transcript failed"
                );
                failed_entry(path, Some(sha256), Some(transcript_id), err.to_string())
            }
        };
        entries.push(entry);
    }

    let summary = summarize(&entries);
    let manifest = BatchManifest {
        manifest_version: BATCH_MANIFEST_VERSION,
        run_id: run_id.clone(),
        generated_at: now_utc_string(),
        input_directory: args.input_dir.display().to_string(),
        profiles_sha256: profiles.sha256,
        consensus_threshold: config.consensus.threshold,
        summary,
        entries,
    };

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| run_dir.join("batch_manifest.json"));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        transcripts = manifest.summary.transcript_count,
        passed = manifest.summary.passed_count,
        flagged = manifest.summary.flagged_count,
        failed = manifest.summary.failed_count,
        path = %manifest_path.display(),
        "batch completed"
    );

    let failing = manifest
        .entries
        .iter()
        .filter(|entry| should_fail(args.fail_on, entry.status))
        .count();
    if failing > 0 {
        bail!(
            "{failing} transcript(s) did not meet --fail-on {}",
            args.fail_on.as_str()
        );
    }

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string())
}

fn analysed_entry(
    path: &Path,
    sha256: String,
    analysis: &TranscriptAnalysis,
    output_path: PathBuf,
) -> BatchEntry {
    BatchEntry {
        input_path: path.display().to_string(),
        input_sha256: Some(sha256),
        transcript_id: Some(analysis.transcript_id.clone()),
        status: analysis.status(),
        result_path: Some(output_path.display().to_string()),
        domain_id: Some(analysis.domain.domain_id.clone()),
        utterance_coverage_ratio: Some(analysis.coverage.utterance_coverage_ratio),
        confidence_score: Some(analysis.validation.confidence_score),
        error: None,
    }
}

fn failed_entry(
    path: &Path,
    sha256: Option<String>,
    transcript_id: Option<String>,
    error: String,
) -> BatchEntry {
    BatchEntry {
        input_path: path.display().to_string(),
        input_sha256: sha256,
        transcript_id,
        status: TranscriptStatus::Failed,
        result_path: None,
        domain_id: None,
        utterance_coverage_ratio: None,
        confidence_score: None,
        error: Some(error),
    }
}

pub fn summarize(entries: &[BatchEntry]) -> BatchSummary {
    let count_status = |status: TranscriptStatus| {
        entries
            .iter()
            .filter(|entry| entry.status == status)
            .count()
    };

    let mut domain_distribution = BTreeMap::new();
    for domain_id in entries.iter().filter_map(|entry| entry.domain_id.as_ref()) {
        *domain_distribution.entry(domain_id.clone()).or_insert(0) += 1;
    }

    let ratios = entries
        .iter()
        .filter_map(|entry| entry.utterance_coverage_ratio)
        .collect::<Vec<f64>>();
    let coverage = if ratios.is_empty() {
        CoverageSummary::default()
    } else {
        CoverageSummary {
            min: ratios.iter().copied().reduce(f64::min),
            mean: Some(ratios.iter().sum::<f64>() / ratios.len() as f64),
            max: ratios.iter().copied().reduce(f64::max),
        }
    };

    BatchSummary {
        transcript_count: entries.len(),
        passed_count: count_status(TranscriptStatus::Passed),
        flagged_count: count_status(TranscriptStatus::Flagged),
        failed_count: count_status(TranscriptStatus::Failed),
        domain_distribution,
        coverage,
    }
}

#[cfg(test)]
mod tests;
