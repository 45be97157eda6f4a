use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use registry_scd2::logging::{self, LogFormat};
use registry_scd2::{run_pipeline, Config, PipelineConfig, Settings};

#[derive(Parser)]
#[command(name = "registry_scd2")]
#[command(about = "Company registry JSONL -> deduplicated SCD2 Parquet")]
#[command(version)]
struct Cli {
    /// Input JSONL path
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output Parquet file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rows per read batch
    #[arg(long, alias = "chunk")]
    batch_size: Option<usize>,

    /// Minimum name similarity (0-100) for a fuzzy duplicate
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,

    /// TOML file with a [pipeline] table; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn overrides(&self) -> PipelineConfig {
        PipelineConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            batch_size: self.batch_size,
            threshold: self.threshold,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(cli.log_format);

    let file_config = match &cli.config {
        Some(path) => {
            Config::load(path)
                .with_context(|| format!("loading config {}", path.display()))?
                .pipeline
        }
        None => PipelineConfig::default(),
    };
    let settings = Settings::resolve(file_config, cli.overrides())?;

    let summary = run_pipeline(&settings)
        .with_context(|| format!("run failed for {}", settings.input.display()))?;

    println!("Run {}", summary.run_id);
    println!("   Raw rows: {}", summary.raw_rows);
    println!("   Exact duplicates removed: {}", summary.dedup.exact_removed);
    println!("   Fuzzy duplicates removed: {}", summary.dedup.fuzzy_removed);
    println!("   Clusters: {}", summary.versions.clusters);
    println!("   Versions written: {}", summary.output.rows);
    println!("   Output file: {}", settings.output.display());
    Ok(())
}
