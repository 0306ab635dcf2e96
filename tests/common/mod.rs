#![allow(dead_code)]

pub mod mocks;

use std::{cell::RefCell, collections::HashMap, fs, path::Path};

use bulk_loader::{
    BatchError,
    core::item::ItemWriter,
    item::record::Record,
    loader::Destination,
};
use serde_json::Value;
use uuid::Uuid;

/// Document stored by [`InMemoryDestination`].
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Record,
}

/// Destination keeping everything in memory, with optional failure injection.
#[derive(Default)]
pub struct InMemoryDestination {
    collections: RefCell<HashMap<String, Vec<StoredDocument>>>,
    chunk_sizes: RefCell<HashMap<String, Vec<usize>>>,
    config: RefCell<Record>,
    merge_count: RefCell<usize>,
    /// (collection, zero-based chunk index) whose write must fail
    failing_chunk: Option<(String, usize)>,
}

impl InMemoryDestination {
    pub fn failing_at(collection: &str, chunk_index: usize) -> Self {
        Self {
            failing_chunk: Some((collection.to_string(), chunk_index)),
            ..Self::default()
        }
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .borrow()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.documents(collection).len()
    }

    pub fn chunk_sizes(&self, collection: &str) -> Vec<usize> {
        self.chunk_sizes
            .borrow()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn config(&self) -> Record {
        self.config.borrow().clone()
    }

    pub fn merge_count(&self) -> usize {
        *self.merge_count.borrow()
    }

    /// Seeds the configuration document, as if written by an earlier run.
    pub fn seed_config(&self, key: &str, value: Value) {
        self.config.borrow_mut().insert(key.to_string(), value);
    }
}

struct InMemoryCollectionWriter<'a> {
    destination: &'a InMemoryDestination,
    collection: String,
}

impl ItemWriter<Record> for InMemoryCollectionWriter<'_> {
    fn write(&self, items: &[Record]) -> Result<(), BatchError> {
        let chunk_index = self.destination.chunk_sizes(&self.collection).len();
        if self.destination.failing_chunk == Some((self.collection.clone(), chunk_index)) {
            return Err(BatchError::ItemWriter("deadline exceeded".to_string()));
        }

        let documents = items.iter().map(|fields| StoredDocument {
            id: Uuid::new_v4().to_string(),
            fields: fields.clone(),
        });

        self.destination
            .collections
            .borrow_mut()
            .entry(self.collection.clone())
            .or_default()
            .extend(documents);
        self.destination
            .chunk_sizes
            .borrow_mut()
            .entry(self.collection.clone())
            .or_default()
            .push(items.len());
        Ok(())
    }
}

struct InMemoryMergeWriter<'a> {
    destination: &'a InMemoryDestination,
}

impl ItemWriter<Record> for InMemoryMergeWriter<'_> {
    fn write(&self, items: &[Record]) -> Result<(), BatchError> {
        for fields in items {
            self.destination
                .config
                .borrow_mut()
                .extend(fields.iter().map(|(key, value)| (key.clone(), value.clone())));
            *self.destination.merge_count.borrow_mut() += 1;
        }
        Ok(())
    }
}

impl Destination for InMemoryDestination {
    fn collection_writer(
        &self,
        collection: &str,
    ) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
        Ok(Box::new(InMemoryCollectionWriter {
            destination: self,
            collection: collection.to_string(),
        }))
    }

    fn config_writer(&self) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
        Ok(Box::new(InMemoryMergeWriter { destination: self }))
    }
}

/// Writes `content` to `dir/name`.
pub fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("Unable to write test file");
}

/// JSON array of `count` records `{"index": i, "name": "item-i"}`.
pub fn records_json(count: usize) -> String {
    let records: Vec<Value> = (0..count)
        .map(|index| serde_json::json!({"index": index, "name": format!("item-{index}")}))
        .collect();
    Value::Array(records).to_string()
}
