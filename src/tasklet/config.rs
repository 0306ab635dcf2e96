//! # Configuration Tasklet
//!
//! Folds a file of key/value pairs into one configuration object and merges it
//! into a single fixed document.
//!
//! Each entry of the source array looks like
//! `{"clave": "IVA", "valor": "15"}` or `{"constante": "MONEDA", "valor": "USD"}`.
//!
//! ## Resolution rules
//!
//! - The key is `clave` when it is a non-empty string, `constante` otherwise.
//!   Entries whose key is missing, not a string, or blank once trimmed are
//!   skipped, as are entries that are not objects.
//! - A string value whose trimmed form is a plain decimal number
//!   (`42`, `-3.5`, `.5`, `1e3`) is stored as a number. Integral values within
//!   the exactly representable range are stored as integers.
//! - Anything else is stored as given: `""`, `"  "`, `"0x10"`, `"Infinity"`,
//!   booleans, null, numbers, arrays and objects. A missing `valor` is null.
//! - Later entries overwrite earlier ones with the same key.
//!
//! ```
//! use bulk_loader::tasklet::config::fold_entries;
//! use serde_json::json;
//!
//! let entries = vec![
//!     json!({"clave": "IVA", "valor": "15"}),
//!     json!({"constante": "MONEDA", "valor": "USD"}),
//!     json!({"clave": "  ", "valor": "ignored"}),
//! ];
//!
//! let config = fold_entries(&entries);
//! assert_eq!(config["IVA"], json!(15));
//! assert_eq!(config["MONEDA"], json!("USD"));
//! assert_eq!(config.len(), 2);
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::{
    BatchError,
    core::{
        item::{ItemReader, ItemWriter},
        step::{StepExecution, StepStatus},
        tasklet::Tasklet,
    },
    item::{
        json::JsonItemReaderBuilder,
        record::{Record, is_blank_key},
    },
};

/// Collection holding the configuration document.
pub const CONFIG_COLLECTION: &str = "system_config";

/// Identifier of the configuration document.
pub const CONFIG_DOCUMENT_ID: &str = "global_vars";

static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("Invalid regex")
});

/// Largest magnitude below which every integer is exactly representable as `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One resolved key/value pair of a configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Value,
}

impl ConfigEntry {
    /// Resolves a raw source entry, `None` when it has no usable key.
    pub fn resolve(entry: &Value) -> Option<ConfigEntry> {
        let Value::Object(fields) = entry else {
            return None;
        };

        let key = match fields.get("clave") {
            Some(Value::String(clave)) if !clave.is_empty() => clave,
            _ => match fields.get("constante") {
                Some(Value::String(constante)) => constante,
                _ => return None,
            },
        };

        if is_blank_key(key) {
            return None;
        }

        let value = fields.get("valor").map_or(Value::Null, coerce_value);

        Some(ConfigEntry {
            key: key.clone(),
            value,
        })
    }
}

/// Converts numeric-looking strings to numbers, returns other values unchanged.
pub fn coerce_value(value: &Value) -> Value {
    match value {
        Value::String(text) => parse_number(text)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if !RE_DECIMAL.is_match(trimmed) {
        return None;
    }

    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Number::from(integer));
    }

    let float = trimmed.parse::<f64>().ok()?;
    if float.fract() == 0.0 && float.abs() < MAX_SAFE_INTEGER {
        return Some(Number::from(float as i64));
    }
    Number::from_f64(float)
}

/// Folds raw source entries into one configuration object.
pub fn fold_entries(entries: &[Value]) -> Record {
    entries
        .iter()
        .filter_map(ConfigEntry::resolve)
        .map(|entry| (entry.key, entry.value))
        .collect()
}

/// Tasklet merging one configuration file into the configuration document.
///
/// A missing file is skipped without any warning.
pub struct ConfigMergeTasklet<'a> {
    path: PathBuf,
    writer: &'a dyn ItemWriter<Record>,
}

impl<'a> ConfigMergeTasklet<'a> {
    pub fn new<P: AsRef<Path>>(path: P, writer: &'a dyn ItemWriter<Record>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer,
        }
    }

    fn read_entries(&self) -> Result<Vec<Value>, BatchError> {
        let reader = JsonItemReaderBuilder::<Value>::new().from_path(&self.path);
        reader.open()?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.read()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl Tasklet for ConfigMergeTasklet<'_> {
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(BatchError::MissingFile(path)) => {
                debug!("Configuration file '{}' absent", path.display());
                step_execution.status = StepStatus::Skipped;
                return Ok(());
            }
            Err(error) => {
                step_execution.read_error_count += 1;
                return Err(error);
            }
        };
        step_execution.read_count = entries.len();

        let config = fold_entries(&entries);
        step_execution.filter_count = entries.len().saturating_sub(config.len());

        if config.is_empty() {
            info!(
                "No configuration keys found in '{}', nothing to merge.",
                self.path.display()
            );
            return Ok(());
        }

        let keys = config.len();
        self.writer.write(&[config])?;
        self.writer.flush()?;

        step_execution.write_count = keys;
        step_execution.batch_count = 1;
        info!(
            "Global configuration updated from '{}' ({} keys).",
            self.path.display(),
            keys
        );
        Ok(())
    }
}
