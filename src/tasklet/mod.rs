//! # Tasklet Module
//!
//! Tasklets are single-task operations that don't follow the chunk-oriented processing pattern.

/// Merge of configuration files into the configuration document
pub mod config;
