//! STOFS-2D-Global regional subsetter.
//!
//! Reads unstructured-mesh field files from the public NOAA bucket (or a
//! local mirror), cuts them down to a set of bounding regions and writes one
//! NetCDF file per region under `{output_dir}/{region}/{date}/`.

mod config;
mod pipeline;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ConfigLayer, SubsetterConfig};
use mesh_common::DatasetSource;
use pipeline::SubsetPipeline;
use sources::{LocalDatasetSource, S3DatasetSource};
use storage::ObjectStorage;

#[derive(Parser, Debug)]
#[command(name = "subsetter")]
#[command(about = "Subset STOFS-2D-Global mesh output to bounding regions")]
struct Args {
    /// YAML file with defaults for any of the options below
    #[arg(short, long, env = "SUBSETTER_CONFIG")]
    config: Option<PathBuf>,

    /// Source bucket
    #[arg(long, env = "STOFS_BUCKET")]
    bucket_name: Option<String>,

    /// Model name used in object keys
    #[arg(long)]
    model_name: Option<String>,

    /// Key prefix inside the bucket (e.g. `_para3`)
    #[arg(long)]
    prefix: Option<String>,

    /// Run dates (YYYYMMDD)
    #[arg(long, num_args = 1..)]
    dates: Option<Vec<String>>,

    /// Run cycles (00, 06, 12, 18)
    #[arg(long, num_args = 1..)]
    cycles: Option<Vec<String>>,

    /// File variants (e.g. fields.cwl fields.htp)
    #[arg(long, num_args = 1..)]
    stofs_files: Option<Vec<String>>,

    /// Regions as "(x_min, x_max, y_min, y_max)(...)"
    #[arg(long)]
    regions: Option<String>,

    /// One output directory name per region
    #[arg(long, num_args = 1..)]
    region_names: Option<Vec<String>>,

    /// Output root directory
    #[arg(short, long, env = "SUBSETTER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// File variant that carries connectivity
    #[arg(long)]
    companion_file: Option<String>,

    /// Variables never read from the source
    #[arg(long, num_args = 1..)]
    drop_variables: Option<Vec<String>>,

    /// Read from a local directory laid out like the bucket
    #[arg(long, env = "STOFS_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Items processed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: String,
}

impl Args {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            bucket_name: self.bucket_name.clone(),
            model_name: self.model_name.clone(),
            prefix: self.prefix.clone(),
            dates: self.dates.clone(),
            cycles: self.cycles.clone(),
            stofs_files: self.stofs_files.clone(),
            regions: self.regions.clone(),
            region_names: self.region_names.clone(),
            output_dir: self.output_dir.clone(),
            companion_file: self.companion_file.clone(),
            drop_variables: self.drop_variables.clone(),
            local_root: self.local_root.clone(),
            jobs: self.jobs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if args.log_format == "pretty" {
        tracing::subscriber::set_global_default(builder.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }

    let file_layer = match &args.config {
        Some(path) => ConfigLayer::from_yaml_file(path)?,
        None => ConfigLayer::default(),
    };
    let config = SubsetterConfig::resolve(args.layer().over(file_layer))?;

    info!(
        bucket = %config.storage.bucket,
        model = %config.model,
        regions = ?config.regions.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        output_dir = %config.output_dir.display(),
        "Loaded configuration"
    );

    let source: Arc<dyn DatasetSource> = match &config.local_root {
        Some(root) => {
            info!(root = %root.display(), "Reading from local mirror");
            Arc::new(LocalDatasetSource::new(root))
        }
        None => {
            let storage = ObjectStorage::new(&config.storage)?;
            Arc::new(S3DatasetSource::new(
                Arc::new(storage),
                tokio::runtime::Handle::current(),
            ))
        }
    };

    let summary = SubsetPipeline::new(config, source).run().await?;
    if !summary.is_success() {
        bail!(
            "{} of {} outputs failed",
            summary.failed,
            summary.written + summary.failed
        );
    }
    Ok(())
}
