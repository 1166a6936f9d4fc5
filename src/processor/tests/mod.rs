//! Integration tests for the processor module
//!
//! Runs the complete pipeline over synthetic basestation dive directories.
