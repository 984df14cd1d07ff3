use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "qualcode",
    version,
    about = "Multi-rater qualitative coding aggregation and validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Classify(ClassifyArgs),
    Analyze(AnalyzeArgs),
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(long)]
    pub profiles: PathBuf,

    /// Coding bundle whose transcript text is classified.
    #[arg(long, conflicts_with = "text")]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FailOn {
    Never,
    Error,
    Warning,
}

impl FailOn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub profiles: PathBuf,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides `consensus.threshold` from the config file.
    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, default_value = ".cache/qualcode")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FailOn::Never)]
    pub fail_on: FailOn,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub profiles: PathBuf,

    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, default_value = ".cache/qualcode")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = 4)]
    pub max_workers: usize,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FailOn::Never)]
    pub fail_on: FailOn,
}
