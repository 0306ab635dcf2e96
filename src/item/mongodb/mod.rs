use mongodb::bson::{Bson, Document};
use serde_json::Value;

use crate::item::record::Record;

/// This module contains the MongoDB writer inserting chunks of records.
pub mod mongodb_writer;

/// This module contains the MongoDB writer merging records into one document.
pub mod mongodb_merge_writer;

pub use mongodb_merge_writer::{MongodbMergeWriter, MongodbMergeWriterBuilder};
pub use mongodb_writer::{MongodbItemWriter, MongodbItemWriterBuilder};

/// Maps a JSON value to BSON.
///
/// Integers that fit in an `i64` stay integers, every other number becomes a
/// double.
pub(crate) fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(*flag),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => Bson::Int64(integer),
            (None, Some(float)) => Bson::Double(float),
            (None, None) => Bson::String(number.to_string()),
        },
        Value::String(text) => Bson::String(text.clone()),
        Value::Array(values) => Bson::Array(values.iter().map(to_bson).collect()),
        Value::Object(map) => Bson::Document(to_document(map)),
    }
}

pub(crate) fn to_document(record: &Record) -> Document {
    record
        .iter()
        .map(|(key, value)| (key.clone(), to_bson(value)))
        .collect()
}
