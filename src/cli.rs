//! Command-line interface components.

use crate::config::ConverterConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seaglider_og1")]
#[command(about = "Convert Seaglider basestation dive files to an OG1 trajectory netCDF file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory of per-dive netCDF files, or an http(s) URL listing them
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Output netCDF file (default: og1/<id>.nc beside the source)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First dive profile to include
    #[arg(long)]
    pub start_profile: Option<i64>,

    /// Last dive profile to include
    #[arg(long)]
    pub end_profile: Option<i64>,

    /// Directory with replacement vocabulary tables
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Directory for downloaded dive files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum dives converted concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Deflate level for output variables (0-9)
    #[arg(long)]
    pub compression_level: Option<i32>,

    /// List the dive files that would be converted then exit
    #[arg(long)]
    pub discovery_only: bool,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Build the converter configuration from the arguments
    pub fn to_config(&self) -> ConverterConfig {
        let mut config = ConverterConfig::default()
            .with_profile_range(self.start_profile, self.end_profile);

        if let Some(concurrency) = self.concurrency {
            config = config.with_max_concurrent_files(concurrency);
        }
        if let Some(level) = self.compression_level {
            config = config.with_compression_level(level);
        }
        if let Some(dir) = &self.config_dir {
            config = config.with_config_dir(dir.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir.clone());
        }
        if self.discovery_only {
            config = config.with_discovery_only();
        }
        if self.overwrite {
            config = config.with_overwrite();
        }
        config
    }
}

/// Initialise tracing on stderr; `RUST_LOG` overrides the verbosity flags
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("seaglider_og1={}", args.get_log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
