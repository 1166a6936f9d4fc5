//! Mission processing engine.
//!
//! Orchestrates a basestation to OG1 conversion: dive discovery, concurrent
//! per-dive conversion, mission assembly and netCDF writing.

pub mod discovery;
pub mod streaming;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    discovery::{DiveSource, FileDiscovery},
    streaming::StreamingProcessor,
    writer::Og1Writer,
};

use crate::config::ConverterConfig;
use crate::constants::OUTPUT_DIR_NAME;
use crate::converter::Converter;
use crate::error::{Og1Error, Result};
use crate::models::{MissionDataset, ProcessingStats};
use crate::vocabularies::Vocabularies;

use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, warn};

/// Main processor for a Seaglider mission
#[derive(Debug)]
pub struct MissionProcessor {
    source: DiveSource,
    output_path: Option<PathBuf>,
    config: ConverterConfig,
    show_progress: bool,
}

impl MissionProcessor {
    /// Create a processor for a dive directory or URL
    ///
    /// Without an explicit output path the file is named after the mission id
    /// and placed in an `og1` directory beside the source.
    pub fn new(source: &str, output_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            source: DiveSource::parse(source)?,
            output_path,
            config: ConverterConfig::default(),
            show_progress: true,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    /// Hide the progress bar
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Main processing entry point
    pub async fn process(&mut self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        println!(
            "{}",
            "Starting Seaglider to OG1 conversion".bright_green().bold()
        );
        println!("  {} {}", "Source:".bright_cyan(), self.source);
        if let Some(output) = &self.output_path {
            println!("  {} {}", "Output:".bright_cyan(), output.display());
        }

        // Step 1: Discover dive files
        println!("\n{}", "Discovering dive files...".bright_yellow());
        let discovery = FileDiscovery::new(
            self.source.clone(),
            self.config.profile_range,
            self.config.cache_dir.clone(),
        );
        let discovered = discovery.discover_dive_files().await?;
        let failed_downloads = discovered.failed_downloads;
        let files = discovered.files;
        println!(
            "  {} {} dive files",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );
        if failed_downloads > 0 {
            println!(
                "  {} {} dive files could not be downloaded",
                "Warning:".bright_red(),
                failed_downloads.to_string().bright_red().bold()
            );
        }

        if self.config.discovery_only {
            println!("\n{}", "Discovery mode - no conversion".bright_green());
            for file in &files {
                println!("  {}", file.display());
            }
            return Ok(ProcessingStats {
                dives_found: files.len() + failed_downloads,
                dives_failed: failed_downloads,
                processing_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        if files.is_empty() {
            warn!("No dive files found in {}", self.source);
            return Ok(ProcessingStats {
                dives_found: failed_downloads,
                dives_failed: failed_downloads,
                processing_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        // Step 2: Load the vocabulary tables
        let vocab = Vocabularies::load(self.config.config_dir.as_deref())?;
        let converter = Arc::new(Converter::new(vocab, &self.config));

        // Step 3: Convert dives
        println!("\n{}", "Converting dives...".bright_yellow());
        let mut streaming =
            StreamingProcessor::new(Arc::clone(&converter), self.config.max_concurrent_files);
        if !self.show_progress {
            streaming = streaming.quiet();
        }
        let (dives, mut stats) = streaming.process_dives(&files).await?;
        stats.dives_found += failed_downloads;
        stats.dives_failed += failed_downloads;

        // Step 4: Assemble the mission
        println!("\n{}", "Assembling mission...".bright_yellow());
        let (mission, warnings) = task::spawn_blocking({
            let converter = Arc::clone(&converter);
            move || converter.assemble_mission(dives)
        })
        .await
        .map_err(|e| Og1Error::ProcessingFailed {
            path: PathBuf::from(self.source.to_string()),
            reason: format!("Mission assembly task failed: {e}"),
        })??;

        if !warnings.is_empty() {
            println!(
                "  {} {} variables differ from the vocabulary attributes",
                "Note:".bright_yellow(),
                warnings.len().to_string().bright_white()
            );
            for warning in &warnings {
                debug!("Attribute mismatch: {}", warning);
            }
        }

        // Step 5: Write the OG1 file
        let output_path = self
            .output_path
            .clone()
            .unwrap_or_else(|| default_output_path(&self.source, &mission));
        println!(
            "  {} {}",
            "Writing:".bright_cyan(),
            output_path.display()
        );
        let writer = Og1Writer::new(output_path.clone(), &self.config);
        let total_measurements = task::spawn_blocking(move || writer.write(&mission))
            .await
            .map_err(|e| Og1Error::ProcessingFailed {
                path: output_path.clone(),
                reason: format!("Writer task failed: {e}"),
            })??;

        stats.total_measurements = total_measurements;
        stats.attribute_warnings = warnings.len();
        stats.output_path = output_path;

        let total_time = start_time.elapsed().as_millis();
        println!("\n{}", "Processing Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            total_time.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Dives processed:".bright_cyan(),
            stats.dives_processed.to_string().bright_white()
        );
        if stats.dives_skipped > 0 {
            println!(
                "  {} {}",
                "Dives skipped:".bright_yellow(),
                stats.dives_skipped.to_string().bright_white()
            );
        }
        if stats.dives_failed > 0 {
            println!(
                "  {} {}",
                "Dives failed:".bright_red(),
                stats.dives_failed.to_string().bright_red().bold()
            );
        }
        println!(
            "  {} {}",
            "Total measurements:".bright_cyan(),
            stats.total_measurements.to_string().bright_white().bold()
        );

        Ok(ProcessingStats {
            processing_time_ms: total_time,
            ..stats
        })
    }
}

/// `<source parent>/og1/<id>.nc`, or `./og1/<id>.nc` for remote sources
pub fn default_output_path(source: &DiveSource, mission: &MissionDataset) -> PathBuf {
    let file_name = format!("{}.nc", mission.id().unwrap_or("og1_mission"));
    let base = match source {
        DiveSource::Local(dir) => dir.parent().unwrap_or_else(|| Path::new(".")),
        DiveSource::Remote(_) => Path::new("."),
    };
    base.join(OUTPUT_DIR_NAME).join(file_name)
}
