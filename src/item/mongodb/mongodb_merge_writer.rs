use log::{debug, warn};
use mongodb::{
    bson::{Document, doc},
    sync::Collection,
};

use crate::{BatchError, core::item::ItemWriter, item::record::Record};

use super::to_bson;

/// Merges every record it receives into a single fixed document.
///
/// Each record becomes one upsert whose update pipeline sets the record's
/// keys one by one: keys present in the record replace the stored ones, keys
/// absent from it are left untouched, and the document is created on first
/// write. Keys are literal field names, so `"version.app"` or `"$rate"` are
/// stored as written instead of being read as paths or operators.
///
/// The document's own `_id` cannot be changed, a record key `_id` is skipped.
pub struct MongodbMergeWriter {
    collection: Collection<Document>,
    document_id: String,
}

/// Update pipeline setting every key of `fields` as a literal top-level field.
fn merge_pipeline(fields: &Record) -> Vec<Document> {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .map(|(key, value)| {
            doc! {
                "$replaceWith": {
                    "$setField": {
                        "field": { "$literal": key.as_str() },
                        "input": "$$ROOT",
                        "value": { "$literal": to_bson(value) },
                    }
                }
            }
        })
        .collect()
}

impl ItemWriter<Record> for MongodbMergeWriter {
    fn write(&self, items: &[Record]) -> Result<(), BatchError> {
        for fields in items {
            if fields.contains_key("_id") {
                warn!(
                    "Key '_id' cannot be merged into {}/{}, skipped",
                    self.collection.name(),
                    self.document_id
                );
            }

            let pipeline = merge_pipeline(fields);
            if pipeline.is_empty() {
                continue;
            }

            let result = self
                .collection
                .update_one(doc! { "_id": self.document_id.as_str() }, pipeline)
                .upsert(true)
                .run()
                .map_err(|error| BatchError::ItemWriter(error.to_string()))?;

            debug!(
                "{} keys merged into {}/{} (matched: {}, upserted: {})",
                fields.len(),
                self.collection.name(),
                self.document_id,
                result.matched_count,
                result.upserted_id.is_some()
            );
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MongodbMergeWriterBuilder {
    collection: Option<Collection<Document>>,
    document_id: Option<String>,
}

impl MongodbMergeWriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(mut self, collection: Collection<Document>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn document_id(mut self, document_id: &str) -> Self {
        self.document_id = Some(document_id.to_string());
        self
    }

    pub fn build(self) -> Result<MongodbMergeWriter, BatchError> {
        Ok(MongodbMergeWriter {
            collection: self.collection.ok_or_else(|| {
                BatchError::Configuration("MongoDB collection is required".to_string())
            })?,
            document_id: self.document_id.ok_or_else(|| {
                BatchError::Configuration("Target document id is required".to_string())
            })?,
        })
    }
}
