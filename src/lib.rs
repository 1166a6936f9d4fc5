//! Seaglider to OG1 Converter Library
//!
//! A Rust library for converting Seaglider basestation per-dive netCDF files
//! into a single OceanGliders OG1 trajectory file.
//!
//! This library provides tools for:
//! - Discovering dive files in a local directory or behind an HTTP listing
//! - Reading basestation dives into typed variables and attributes
//! - Renaming, unit conversion and vocabulary metadata for OG1 variables
//! - GPS interpolation, profile and phase numbering and depth from pressure
//! - Sensor and platform metadata variables
//! - Writing compressed netCDF-4 output with OG1 global attributes

pub mod cli;
pub mod config;
pub mod constants;
pub mod converter;
pub mod error;
pub mod models;
pub mod processor;
pub mod readers;
pub mod table;
pub mod units;
pub mod vocabularies;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConverterConfig, ProfileRange};
pub use converter::{Converter, ProcessedDive};
pub use error::{Og1Error, Result};
pub use models::{AttrValue, Attributes, DiveDataset, MissionDataset, ProcessingStats, Variable};
pub use processor::MissionProcessor;
pub use processor::writer::save_dataset;
pub use readers::{read_basestation, read_dive};
pub use table::MeasurementTable;
pub use vocabularies::Vocabularies;
