//! Concurrent per-dive conversion
//!
//! Reads and converts dive files with bounded parallelism. netCDF access is
//! blocking, so every dive runs on the blocking pool.

use crate::converter::{Converter, ProcessedDive};
use crate::error::{Og1Error, Result};
use crate::models::ProcessingStats;
use crate::readers::read_dive;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, warn};

/// Streaming processor for basestation dives
#[derive(Debug, Clone)]
pub struct StreamingProcessor {
    converter: Arc<Converter>,
    max_concurrent_files: usize,
    show_progress: bool,
}

impl StreamingProcessor {
    pub fn new(converter: Arc<Converter>, max_concurrent_files: usize) -> Self {
        Self {
            converter,
            max_concurrent_files: max_concurrent_files.max(1),
            show_progress: true,
        }
    }

    /// Disable the progress bar
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Convert every file, returning the usable dives and per-dive counts
    ///
    /// A dive that fails is logged and counted; it does not abort the run.
    pub async fn process_dives(
        &self,
        files: &[PathBuf],
    ) -> Result<(Vec<ProcessedDive>, ProcessingStats)> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("Converting dives");
            pb
        } else {
            ProgressBar::hidden()
        };

        let concurrent_limit = self.max_concurrent_files.min(files.len()).max(1);
        debug!(
            "Converting {} dives with concurrency {}",
            files.len(),
            concurrent_limit
        );

        let (dives, skipped, failed) = stream::iter(files)
            .map(|file_path| {
                let pb = pb.clone();
                async move {
                    if let Some(file_name) = file_path.file_name() {
                        pb.set_message(format!("Converting: {}", file_name.to_string_lossy()));
                    }
                    let result = self.process_single_dive(file_path).await;
                    pb.inc(1);

                    match result {
                        Ok(Some(dive)) => {
                            debug!("Converted: {}", file_path.display());
                            Ok(Some(dive))
                        }
                        Ok(None) => {
                            warn!("Skipped dive (no measurements): {}", file_path.display());
                            Ok(None)
                        }
                        Err(e) => {
                            error!("Failed to convert {}: {:#}", file_path.display(), e);
                            Err(e)
                        }
                    }
                }
            })
            .buffer_unordered(concurrent_limit)
            .fold(
                (Vec::new(), 0usize, 0usize),
                |(mut dives, skipped, failed), result| async move {
                    match result {
                        Ok(Some(dive)) => {
                            dives.push(dive);
                            (dives, skipped, failed)
                        }
                        Ok(None) => (dives, skipped + 1, failed),
                        Err(_) => (dives, skipped, failed + 1),
                    }
                },
            )
            .await;

        pb.finish_with_message("All dives converted");

        let stats = ProcessingStats {
            dives_found: files.len(),
            dives_processed: dives.len(),
            dives_skipped: skipped,
            dives_failed: failed,
            total_measurements: dives.iter().map(|d| d.measurements.height()).sum(),
            ..Default::default()
        };
        Ok((dives, stats))
    }

    /// Read and convert one dive file on the blocking pool
    pub async fn process_single_dive(&self, file_path: &Path) -> Result<Option<ProcessedDive>> {
        let converter = Arc::clone(&self.converter);
        let path = file_path.to_path_buf();
        task::spawn_blocking(move || {
            let dive = read_dive(&path)?;
            converter.process_dive(dive)
        })
        .await
        .map_err(|e| Og1Error::ProcessingFailed {
            path: file_path.to_path_buf(),
            reason: format!("Dive conversion task failed: {e}"),
        })?
    }
}
