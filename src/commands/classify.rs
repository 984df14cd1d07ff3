use anyhow::{Result, bail};
use tracing::info;

use crate::cli::ClassifyArgs;
use crate::coding::domain;
use crate::commands::inputs::{load_bundle, load_config, load_profiles};

pub fn run(args: ClassifyArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), None)?;
    let profiles = load_profiles(&args.profiles)?;

    let text = match (&args.input, args.text) {
        (Some(path), _) => load_bundle(path)?.inputs.transcript.full_text(),
        (None, Some(text)) => text,
        (None, None) => bail!("either --input or --text is required"),
    };

    let verdict = domain::classify(&text, &profiles.profiles, &config.classifier)?;
    info!(
        domain = %verdict.domain_id,
        confidence = verdict.confidence,
        "classified text"
    );

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
