//! Error handling for basestation to OG1 conversion.
//!
//! Provides error types with context for file discovery, netCDF decoding,
//! vocabulary lookups and output validation failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Og1Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("netCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config table parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Source must be a local directory or an http(s) URL: {source_str}")]
    InvalidSource { source_str: String },

    #[error("Variable '{name}' missing from dataset: {context}")]
    MissingVariable { name: String, context: String },

    #[error("Variable '{name}' has no complete attribute set in the OG1 vocabulary")]
    MissingAttributes { name: String },

    #[error("Invalid dimension '{found}': expected only '{expected}'")]
    InvalidDimension { expected: String, found: String },

    #[error("Variable '{name}' has {found} values but the table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Output file already exists: {path}")]
    OutputExists { path: PathBuf },

    #[error("No usable dives: {reason}")]
    NoDives { reason: String },

    #[error("Processing failed for file: {path} - {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Og1Error {
    pub fn missing_variable(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingVariable {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Og1Error>;
