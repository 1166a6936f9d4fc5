//! Runtime configuration for the converter.
//!
//! Provides the options that steer discovery, concurrency, unit
//! harmonisation and output writing. The vocabulary tables themselves are
//! loaded separately by [`crate::vocabularies`].

use crate::constants::{
    CACHE_DIR_NAME, DEFAULT_COMPRESSION_LEVEL, DEFAULT_PREFERRED_UNITS, DEFAULT_VARS_TO_REMOVE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Inclusive range of dive profile numbers to convert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl ProfileRange {
    pub fn contains(&self, profile: i64) -> bool {
        self.start.is_none_or(|s| profile >= s) && self.end.is_none_or(|e| profile <= e)
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Maximum concurrent dive files read and converted
    pub max_concurrent_files: usize,

    /// Dive profiles to include
    pub profile_range: ProfileRange,

    /// Units variables are converted to when a conversion is known
    pub preferred_units: Vec<String>,

    /// Derived basestation variables dropped from each dive
    pub vars_to_remove: Vec<String>,

    /// Directory holding replacement vocabulary tables
    pub config_dir: Option<PathBuf>,

    /// Directory for dive files downloaded from a remote source
    pub cache_dir: PathBuf,

    /// Deflate level for output variables (0 disables compression)
    pub compression_level: i32,

    /// Replace an existing output file
    pub overwrite: bool,

    /// List dive files then exit without converting
    pub discovery_only: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(CACHE_DIR_NAME);

        Self {
            max_concurrent_files: num_cpus::get().clamp(1, 8),
            profile_range: ProfileRange::default(),
            preferred_units: DEFAULT_PREFERRED_UNITS
                .iter()
                .map(|u| u.to_string())
                .collect(),
            vars_to_remove: DEFAULT_VARS_TO_REMOVE
                .iter()
                .map(|v| v.to_string())
                .collect(),
            config_dir: None,
            cache_dir,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            overwrite: false,
            discovery_only: false,
        }
    }
}

impl ConverterConfig {
    /// Restrict conversion to an inclusive profile range
    pub fn with_profile_range(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        debug!("Profile range: {:?}..={:?}", start, end);
        self.profile_range = ProfileRange { start, end };
        self
    }

    /// Set maximum concurrent files
    pub fn with_max_concurrent_files(mut self, max_files: usize) -> Self {
        self.max_concurrent_files = max_files.max(1);
        self
    }

    pub fn with_preferred_units(mut self, units: Vec<String>) -> Self {
        self.preferred_units = units;
        self
    }

    pub fn with_config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir = Some(dir);
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level.clamp(0, 9);
        self
    }

    /// Allow an existing output file to be replaced
    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Enable discovery only mode
    pub fn with_discovery_only(mut self) -> Self {
        self.discovery_only = true;
        self
    }
}
