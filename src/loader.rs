//! Wiring of a [`Manifest`] into one sequential job.
//!
//! Every collection of the manifest becomes a chunk-oriented step
//! (JSON reader, blank-key filter, destination writer), every configuration
//! file a tasklet step. The destination is injected: production runs pass a
//! [`MongodbDestination`] built once from the key file, dry runs and tests pass
//! their own.

use std::fs::File;

use crate::{
    BatchError,
    core::{
        item::ItemWriter,
        job::{Job, JobBuilder, JobExecution},
        step::{ChunkOrientedStep, StepBuilder},
        tasklet::{TaskletBuilder, TaskletStep},
    },
    item::{
        json::{JsonItemReader, JsonItemReaderBuilder},
        logger::LoggerWriter,
        record::{BlankKeyFilter, Record},
    },
    manifest::Manifest,
    tasklet::config::ConfigMergeTasklet,
};

/// Name of the job running a manifest.
pub const JOB_NAME: &str = "bulk-load";

/// Store receiving the uploaded records.
pub trait Destination {
    /// Writer inserting records as new documents of `collection`.
    fn collection_writer(
        &self,
        collection: &str,
    ) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError>;

    /// Writer merging records into the configuration document.
    fn config_writer(&self) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError>;
}

/// Destination that only logs, nothing leaves the process.
#[derive(Default)]
pub struct LoggerDestination;

impl Destination for LoggerDestination {
    fn collection_writer(
        &self,
        _collection: &str,
    ) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
        Ok(Box::new(LoggerWriter))
    }

    fn config_writer(&self) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
        Ok(Box::new(LoggerWriter))
    }
}

/// Uploads everything the manifest lists, strictly one step after the other.
///
/// Per-step failures are logged and recorded in the returned
/// [`JobExecution`], they never interrupt the run. An `Err` only means the job
/// could not be assembled.
pub fn run_manifest(
    manifest: &Manifest,
    destination: &dyn Destination,
    chunk_size: usize,
) -> Result<JobExecution, BatchError> {
    let processor = BlankKeyFilter;

    let readers: Vec<JsonItemReader<File, Record>> = manifest
        .collections
        .iter()
        .map(|source| JsonItemReaderBuilder::new().from_path(&source.file))
        .collect();

    let writers = manifest
        .collections
        .iter()
        .map(|source| destination.collection_writer(&source.collection))
        .collect::<Result<Vec<_>, _>>()?;

    let config_writer = destination.config_writer()?;

    let tasklets: Vec<ConfigMergeTasklet> = manifest
        .config_files
        .iter()
        .map(|path| ConfigMergeTasklet::new(path, config_writer.as_ref()))
        .collect();

    let collection_steps = manifest
        .collections
        .iter()
        .zip(&readers)
        .zip(&writers)
        .map(|((source, reader), writer)| {
            StepBuilder::<Record, Record>::new(&source.collection)
                .reader(reader)
                .processor(&processor)
                .writer(writer.as_ref())
                .chunk(chunk_size)
                .build()
        })
        .collect::<Result<Vec<ChunkOrientedStep<Record, Record>>, _>>()?;

    let config_steps = manifest
        .config_files
        .iter()
        .zip(&tasklets)
        .map(|(path, tasklet)| {
            TaskletBuilder::new(&format!("config:{}", path.display()))
                .tasklet(tasklet)
                .build()
        })
        .collect::<Result<Vec<TaskletStep>, _>>()?;

    let mut builder = JobBuilder::new().name(JOB_NAME.to_string());
    for step in &collection_steps {
        builder = builder.next(step);
    }
    for step in &config_steps {
        builder = builder.next(step);
    }

    Ok(builder.build().run())
}

#[cfg(feature = "mongodb")]
pub use self::mongodb_destination::MongodbDestination;

#[cfg(feature = "mongodb")]
mod mongodb_destination {
    use log::info;
    use mongodb::{
        bson::Document,
        sync::{Client, Database},
    };

    use crate::{
        BatchError,
        core::item::ItemWriter,
        credentials::Credentials,
        item::{
            mongodb::{MongodbItemWriterBuilder, MongodbMergeWriterBuilder},
            record::Record,
        },
        tasklet::config::{CONFIG_COLLECTION, CONFIG_DOCUMENT_ID},
    };

    use super::Destination;

    /// MongoDB database shared by every writer of a run.
    pub struct MongodbDestination {
        client: Client,
        database: Database,
        transactional: bool,
    }

    impl MongodbDestination {
        /// Builds the client once. The driver connects lazily, on first write.
        pub fn connect(credentials: &Credentials, transactional: bool) -> Result<Self, BatchError> {
            let client = Client::with_uri_str(&credentials.uri)
                .map_err(|error| BatchError::Configuration(error.to_string()))?;
            let database = client.database(&credentials.database);

            info!(
                "Destination database: {} (transactional batches: {})",
                credentials.database, transactional
            );

            Ok(Self {
                client,
                database,
                transactional,
            })
        }
    }

    impl Destination for MongodbDestination {
        fn collection_writer(
            &self,
            collection: &str,
        ) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
            let writer = MongodbItemWriterBuilder::new()
                .client(&self.client)
                .collection(self.database.collection::<Document>(collection))
                .transactional(self.transactional)
                .build()?;
            Ok(Box::new(writer))
        }

        fn config_writer(&self) -> Result<Box<dyn ItemWriter<Record> + '_>, BatchError> {
            let writer = MongodbMergeWriterBuilder::new()
                .collection(self.database.collection::<Document>(CONFIG_COLLECTION))
                .document_id(CONFIG_DOCUMENT_ID)
                .build()?;
            Ok(Box::new(writer))
        }
    }
}
