use log::{debug, warn};
use mongodb::{
    bson::{Document, oid::ObjectId},
    error::{Error, ErrorKind, InsertManyError},
    sync::{Client, Collection},
};

use crate::{BatchError, core::item::ItemWriter, item::record::Record};

use super::to_bson;

/// Field receiving the `_id` of a source record, `_id` itself always being generated.
pub const SOURCE_ID_FIELD: &str = "_source_id";

/// Inserts each chunk of records as new documents with generated identifiers.
///
/// In transactional mode a chunk is inserted inside a multi-document
/// transaction, so it is committed entirely or not at all. Transactions need a
/// replica set. Otherwise the chunk is sent as one ordered `insert_many`,
/// which may leave a prefix of the chunk behind on failure. That prefix is
/// reported through [`BatchError::PartialWrite`].
pub struct MongodbItemWriter<'a> {
    client: &'a Client,
    collection: Collection<Document>,
    transactional: bool,
}

impl MongodbItemWriter<'_> {
    fn insert_in_transaction(&self, documents: Vec<Document>) -> Result<(), BatchError> {
        let mut session = self.client.start_session().run().map_err(writer_error)?;
        session.start_transaction().run().map_err(writer_error)?;

        let inserted = self
            .collection
            .insert_many(documents)
            .session(&mut session)
            .run();

        match inserted {
            Ok(result) => {
                session.commit_transaction().run().map_err(writer_error)?;
                debug!(
                    "{} documents committed into {}",
                    result.inserted_ids.len(),
                    self.collection.name()
                );
                Ok(())
            }
            Err(error) => {
                if let Err(abort_error) = session.abort_transaction().run() {
                    warn!("Unable to abort transaction: {}", abort_error);
                }
                Err(writer_error(error))
            }
        }
    }

    fn insert(&self, documents: Vec<Document>) -> Result<(), BatchError> {
        let result = self
            .collection
            .insert_many(documents)
            .run()
            .map_err(|error| match stored_before_failure(&error) {
                Some(written) => BatchError::PartialWrite {
                    written,
                    message: error.to_string(),
                },
                None => writer_error(error),
            })?;
        debug!(
            "{} documents inserted into {}",
            result.inserted_ids.len(),
            self.collection.name()
        );
        Ok(())
    }
}

impl ItemWriter<Record> for MongodbItemWriter<'_> {
    fn write(&self, items: &[Record]) -> Result<(), BatchError> {
        if items.is_empty() {
            return Ok(());
        }

        let documents: Vec<Document> = items.iter().map(to_insert_document).collect();

        if self.transactional {
            self.insert_in_transaction(documents)
        } else {
            self.insert(documents)
        }
    }
}

/// Builds the document stored for `record`, under a fresh `ObjectId`.
fn to_insert_document(record: &Record) -> Document {
    let mut document = Document::new();
    document.insert("_id", ObjectId::new());

    for (key, value) in record {
        let key = if key == "_id" { SOURCE_ID_FIELD } else { key.as_str() };
        document.insert(key, to_bson(value));
    }

    document
}

/// Documents stored by an ordered `insert_many` before the write error that
/// stopped it, i.e. the index of its first failed document.
fn stored_before_failure(error: &Error) -> Option<usize> {
    match error.kind.as_ref() {
        ErrorKind::InsertMany(InsertManyError {
            write_errors: Some(write_errors),
            ..
        }) => write_errors.iter().map(|write_error| write_error.index).min(),
        _ => None,
    }
}

fn writer_error(error: Error) -> BatchError {
    BatchError::ItemWriter(error.to_string())
}

pub struct MongodbItemWriterBuilder<'a> {
    client: Option<&'a Client>,
    collection: Option<Collection<Document>>,
    transactional: bool,
}

impl Default for MongodbItemWriterBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> MongodbItemWriterBuilder<'a> {
    pub fn new() -> Self {
        Self {
            client: None,
            collection: None,
            transactional: true,
        }
    }

    /// Client used to open a session per chunk.
    pub fn client(mut self, client: &'a Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn collection(mut self, collection: Collection<Document>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn build(self) -> Result<MongodbItemWriter<'a>, BatchError> {
        Ok(MongodbItemWriter {
            client: self.client.ok_or_else(|| {
                BatchError::Configuration("MongoDB client is required".to_string())
            })?,
            collection: self.collection.ok_or_else(|| {
                BatchError::Configuration("MongoDB collection is required".to_string())
            })?,
            transactional: self.transactional,
        })
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{Bson, oid::ObjectId};
    use serde_json::json;

    use super::{SOURCE_ID_FIELD, to_insert_document};

    #[test]
    fn every_document_should_get_a_new_object_id() {
        let serde_json::Value::Object(record) = json!({"codigo": "GYE"}) else {
            unreachable!()
        };

        let first = to_insert_document(&record);
        let second = to_insert_document(&record);

        let first_id: ObjectId = first.get_object_id("_id").unwrap();
        let second_id: ObjectId = second.get_object_id("_id").unwrap();
        assert_ne!(first_id, second_id);
        assert_eq!(first.get_str("codigo").unwrap(), "GYE");
    }

    #[test]
    fn source_id_should_be_kept_under_another_key() {
        let serde_json::Value::Object(record) = json!({"_id": 17, "codigo": "UIO"}) else {
            unreachable!()
        };

        let document = to_insert_document(&record);

        assert!(document.get_object_id("_id").is_ok());
        assert_eq!(document.get(SOURCE_ID_FIELD), Some(&Bson::Int64(17)));
    }
}
