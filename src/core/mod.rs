use rand::distr::{Alphanumeric, SampleString};

/// Reader, processor and writer abstractions
pub mod item;

/// Sequential execution of steps
pub mod job;

/// Chunk-oriented steps and step bookkeeping
pub mod step;

/// Single-shot steps
pub mod tasklet;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
