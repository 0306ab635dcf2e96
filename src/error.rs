use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    /// The source file of a step does not exist. Non-fatal: the step is skipped.
    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// The source is not valid JSON, or not the expected JSON shape.
    #[error("Invalid JSON format in '{origin}': {message}")]
    Format { origin: String, message: String },

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    /// A chunk write failed after its first `written` items were stored.
    #[error("ItemWriter from: {message} ({written} items written)")]
    PartialWrite { written: usize, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}
