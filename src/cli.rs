use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "econex",
    version,
    about = "Local economic metric extraction and curation tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Query(QueryArgs),
    Review(ReviewArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/econex")]
    pub cache_root: PathBuf,

    /// Directory of document JSON files produced by the document converter.
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub metrics_config: Option<PathBuf>,

    #[arg(long)]
    pub sectors_config: Option<PathBuf>,

    #[arg(long)]
    pub publishers_config: Option<PathBuf>,

    #[arg(long)]
    pub entity_hints_config: Option<PathBuf>,

    /// Wall-clock budget per document; overruns abandon remaining strategies.
    #[arg(long, default_value_t = 10_000)]
    pub doc_timeout_ms: u64,

    #[arg(long, default_value_t = 0.3)]
    pub min_confidence: f64,

    #[arg(long, default_value_t = 0.8)]
    pub accept_confidence: f64,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".cache/econex")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub metric_type: Option<String>,

    #[arg(long)]
    pub year: Option<i64>,

    #[arg(long)]
    pub sector: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    #[arg(long, default_value = ".cache/econex")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Write pending review records to this JSON file.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Apply reviewer decisions from this JSON file.
    #[arg(long)]
    pub apply: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/econex")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
