use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::coding::domain::{self, DomainProfile};
use crate::coding::pipeline::TranscriptInputs;
use crate::config::AnalysisConfig;
use crate::model::{CodingBundle, DomainProfileConfig};
use crate::util::read_json_fingerprinted;

pub struct LoadedProfiles {
    pub profiles: Vec<DomainProfile>,
    pub sha256: String,
}

pub fn load_profiles(path: &Path) -> Result<LoadedProfiles> {
    let raw = read_json_fingerprinted::<Vec<DomainProfileConfig>>(path)?;
    let profiles = domain::compile_profiles(&raw.value)
        .with_context(|| format!("invalid domain profiles in {}", path.display()))?;

    info!(
        path = %path.display(),
        profile_count = profiles.len(),
        "loaded domain profiles"
    );

    Ok(LoadedProfiles {
        profiles,
        sha256: raw.sha256,
    })
}

pub struct LoadedBundle {
    pub inputs: TranscriptInputs,
    pub sha256: String,
}

pub fn load_bundle(path: &Path) -> Result<LoadedBundle> {
    let raw = read_json_fingerprinted::<CodingBundle>(path)?;
    let CodingBundle {
        transcript,
        raters,
        assignments,
    } = raw.value;

    let transcript = transcript
        .into_transcript()
        .with_context(|| format!("invalid transcript in {}", path.display()))?;

    Ok(LoadedBundle {
        inputs: TranscriptInputs {
            transcript,
            roster: raters,
            assignments,
        },
        sha256: raw.sha256,
    })
}

pub fn load_config(path: Option<&Path>, threshold: Option<f64>) -> Result<AnalysisConfig> {
    AnalysisConfig::load(path)?
        .with_threshold(threshold)
        .context("invalid consensus threshold override")
}
