use serde_json::{Map, Value};

use crate::core::item::{ItemProcessor, ItemProcessorResult};

/// One JSON object read from a source file. No fixed schema.
pub type Record = Map<String, Value>;

/// Whether `key` is empty once surrounding whitespace and byte order marks
/// (U+FEFF) are trimmed.
pub fn is_blank_key(key: &str) -> bool {
    key.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .is_empty()
}

/// Copies `record` without its blank keys, see [`is_blank_key`].
///
/// Returns `None` when nothing is left, such records must never be stored.
/// Nested objects are kept as they are.
pub fn sanitize(record: &Record) -> Option<Record> {
    let clean: Record = record
        .iter()
        .filter(|(key, _)| !is_blank_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    (!clean.is_empty()).then_some(clean)
}

/// Processor dropping blank keys, and records left empty by it.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankKeyFilter;

impl ItemProcessor<Record, Record> for BlankKeyFilter {
    fn process(&self, item: &Record) -> ItemProcessorResult<Record> {
        Ok(sanitize(item))
    }
}
