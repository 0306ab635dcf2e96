/// Records and the blank-key filter applied before storage.
pub mod record;

/// This module provides a JSON item reader.
pub mod json;

/// This module provides a logger item writer, used for dry runs.
pub mod logger;

#[cfg(feature = "mongodb")]
/// This module provides the MongoDB item writers.
pub mod mongodb;
