use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{ItemProcessor, ItemReader, ItemWriter},
};

/// Commit interval used when a step does not set one.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step has been created but not run yet.
    Starting,
    /// Items have been read and chunks are being written.
    Started,
    /// Every chunk has been written.
    Success,
    /// The source was missing, nothing was attempted.
    Skipped,
    /// The source could not be read or parsed. Nothing was written.
    ReadError,
    /// An item could not be processed. Nothing was written.
    ProcessorError,
    /// A chunk write failed. Chunks written before it remain committed.
    WriteError,
    /// A tasklet failed.
    Failed,
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StepStatus::ReadError
                | StepStatus::ProcessorError
                | StepStatus::WriteError
                | StepStatus::Failed
        )
    }
}

/// Bookkeeping of one step run.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    /// Current status of the step execution
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items dropped by the processor
    pub filter_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of chunks successfully written
    pub batch_count: usize,
    /// Number of errors encountered during reading
    pub read_error_count: usize,
    /// Number of errors encountered during processing
    pub process_error_count: usize,
    /// Number of items lost in failed chunk writes
    pub write_error_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            read_count: 0,
            filter_count: 0,
            write_count: 0,
            batch_count: 0,
            read_error_count: 0,
            process_error_count: 0,
            write_error_count: 0,
        }
    }
}

pub trait Step {
    /// Name reported in logs and in the job summary.
    fn get_name(&self) -> &str;

    /// Executes the step, recording counters and status in `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())`: the step succeeded or was skipped
    /// - `Err(BatchError)`: the step failed, `step_execution.status` says where
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Reads a whole source, processes every item, then writes the surviving
/// items in consecutive chunks of at most `chunk_size`.
///
/// Chunks are written one after the other in source order; a chunk is only
/// started once the previous write returned. The first failed chunk stops the
/// step.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Component responsible for processing items
    processor: &'a dyn ItemProcessor<I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    /// Number of items written per chunk
    chunk_size: usize,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Starting;

        debug!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = self.run(step_execution);

        debug!(
            "End of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        result
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn run(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        match self.reader.open() {
            Ok(()) => {}
            Err(BatchError::MissingFile(path)) => {
                warn!(
                    "File '{}' not found. Skipping '{}'...",
                    path.display(),
                    self.name
                );
                step_execution.status = StepStatus::Skipped;
                return Ok(());
            }
            Err(error) => {
                step_execution.read_error_count += 1;
                step_execution.status = StepStatus::ReadError;
                return Err(error);
            }
        }

        let items = self.read_items(step_execution)?;
        let total = items.len();

        info!("Starting upload of '{}' ({} records)...", self.name, total);
        step_execution.status = StepStatus::Started;

        if let Err(error) = self.writer.open() {
            step_execution.status = StepStatus::WriteError;
            return Err(error);
        }

        for chunk in items.chunks(self.chunk_size) {
            if let Err(error) = self.write_chunk(chunk) {
                let written = match &error {
                    BatchError::PartialWrite { written, .. } => (*written).min(chunk.len()),
                    _ => 0,
                };
                step_execution.write_count += written;
                step_execution.write_error_count += chunk.len() - written;
                step_execution.status = StepStatus::WriteError;
                if let Err(close_error) = self.writer.close() {
                    error!("Unable to close writer of '{}': {}", self.name, close_error);
                }
                return Err(error);
            }

            step_execution.write_count += chunk.len();
            step_execution.batch_count += 1;
            info!(
                "Batch {} written ({}/{})",
                step_execution.batch_count, step_execution.write_count, total
            );
        }

        if let Err(error) = self.writer.close() {
            step_execution.status = StepStatus::WriteError;
            return Err(error);
        }

        step_execution.status = StepStatus::Success;
        info!("SUCCESS: '{}' completed.", self.name);
        Ok(())
    }

    /// Drains the reader and runs every item through the processor.
    ///
    /// Reading is all-or-nothing: the first read or process error aborts the
    /// step before anything reaches the writer.
    fn read_items(&self, step_execution: &mut StepExecution) -> Result<Vec<O>, BatchError> {
        debug!("Start reading items");
        let mut processed_items = Vec::new();

        loop {
            let item = match self.reader.read() {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(error) => {
                    step_execution.read_error_count += 1;
                    step_execution.status = StepStatus::ReadError;
                    return Err(error);
                }
            };
            step_execution.read_count += 1;

            match self.processor.process(&item) {
                Ok(Some(processed)) => processed_items.push(processed),
                Ok(None) => step_execution.filter_count += 1,
                Err(error) => {
                    step_execution.process_error_count += 1;
                    step_execution.status = StepStatus::ProcessorError;
                    return Err(error);
                }
            }
        }

        debug!(
            "End reading items: {} kept, {} filtered",
            processed_items.len(),
            step_execution.filter_count
        );
        Ok(processed_items)
    }

    fn write_chunk(&self, chunk: &[O]) -> Result<(), BatchError> {
        debug!("Start writing chunk of {} items", chunk.len());
        self.writer.write(chunk)?;
        self.writer.flush()?;
        debug!("End writing chunk");
        Ok(())
    }
}

/// Builder for [`ChunkOrientedStep`].
///
/// ```
/// use bulk_loader::core::step::{Step, StepBuilder, StepExecution, StepStatus};
/// use bulk_loader::item::json::JsonItemReaderBuilder;
/// use bulk_loader::item::logger::LoggerWriter;
/// use bulk_loader::item::record::{BlankKeyFilter, Record};
///
/// let json = r#"[{"code": "GYE"}, {" ": "dropped"}]"#;
/// let reader = JsonItemReaderBuilder::<Record>::new().from_reader(json.as_bytes());
/// let processor = BlankKeyFilter;
/// let writer = LoggerWriter;
///
/// let step = StepBuilder::<Record, Record>::new("ports")
///     .reader(&reader)
///     .processor(&processor)
///     .writer(&writer)
///     .chunk(400)
///     .build()
///     .unwrap();
///
/// let mut execution = StepExecution::new(step.get_name());
/// step.execute(&mut execution).unwrap();
///
/// assert_eq!(execution.status, StepStatus::Success);
/// assert_eq!(execution.write_count, 1);
/// assert_eq!(execution.filter_count, 1);
/// ```
pub struct StepBuilder<'a, I, O> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
}

impl<'a, I, O> StepBuilder<'a, I, O> {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            reader: None,
            processor: None,
            writer: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Builder for a step whose name is generated.
    pub fn unnamed() -> Self {
        Self {
            name: None,
            ..Self::new("")
        }
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Sets the commit interval. Values below 1 are raised to 1.
    pub fn chunk(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        let name = self.name.unwrap_or_else(build_name);
        let missing = |component: &str| {
            BatchError::Configuration(format!("{component} is required for step '{name}'"))
        };

        Ok(ChunkOrientedStep {
            reader: self.reader.ok_or_else(|| missing("Reader"))?,
            processor: self.processor.ok_or_else(|| missing("Processor"))?,
            writer: self.writer.ok_or_else(|| missing("Writer"))?,
            chunk_size: self.chunk_size,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        path::PathBuf,
    };

    use crate::{
        BatchError,
        core::item::{ItemProcessor, ItemProcessorResult, ItemReader, ItemReaderResult, ItemWriter},
    };

    use super::{Step, StepBuilder, StepExecution, StepStatus};

    struct VecReader {
        items: RefCell<VecDeque<Result<i32, String>>>,
        missing: bool,
    }

    impl VecReader {
        fn new(items: Vec<Result<i32, String>>) -> Self {
            Self {
                items: RefCell::new(items.into()),
                missing: false,
            }
        }
    }

    impl ItemReader<i32> for VecReader {
        fn open(&self) -> Result<(), BatchError> {
            if self.missing {
                return Err(BatchError::MissingFile(PathBuf::from("missing.json")));
            }
            Ok(())
        }

        fn read(&self) -> ItemReaderResult<i32> {
            match self.items.borrow_mut().pop_front() {
                Some(Ok(item)) => Ok(Some(item)),
                Some(Err(message)) => Err(BatchError::ItemReader(message)),
                None => Ok(None),
            }
        }
    }

    /// Drops negative numbers.
    struct PositiveOnly;

    impl ItemProcessor<i32, i32> for PositiveOnly {
        fn process(&self, item: &i32) -> ItemProcessorResult<i32> {
            Ok((*item >= 0).then_some(*item))
        }
    }

    #[derive(Default)]
    struct ChunkRecorder {
        chunks: RefCell<Vec<Vec<i32>>>,
        fail_at: Option<usize>,
        calls: Cell<usize>,
    }

    impl ItemWriter<i32> for ChunkRecorder {
        fn write(&self, items: &[i32]) -> Result<(), BatchError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.fail_at == Some(call) {
                return Err(BatchError::ItemWriter("connection reset".to_string()));
            }
            self.chunks.borrow_mut().push(items.to_vec());
            Ok(())
        }
    }

    #[test]
    fn chunks_should_preserve_order_and_only_the_last_may_be_short() {
        let reader = VecReader::new((0..10).map(Ok).collect());
        let writer = ChunkRecorder::default();

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .chunk(4)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        assert!(step.execute(&mut execution).is_ok());

        let chunks = writer.chunks.borrow();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(chunks.concat(), (0..10).collect::<Vec<_>>());
        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.batch_count, 3);
        assert_eq!(execution.write_count, 10);
    }

    #[test]
    fn filtered_items_should_not_leave_holes_in_chunks() {
        let reader = VecReader::new(vec![Ok(1), Ok(-1), Ok(2), Ok(-2), Ok(3)]);
        let writer = ChunkRecorder::default();

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .chunk(2)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        step.execute(&mut execution).unwrap();

        assert_eq!(*writer.chunks.borrow(), vec![vec![1, 2], vec![3]]);
        assert_eq!(execution.read_count, 5);
        assert_eq!(execution.filter_count, 2);
        assert_eq!(execution.write_count, 3);
    }

    #[test]
    fn read_error_should_prevent_any_write() {
        let reader = VecReader::new(vec![Ok(1), Ok(2), Err("broken".to_string())]);
        let writer = ChunkRecorder::default();

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .chunk(1)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        assert!(step.execute(&mut execution).is_err());

        assert_eq!(execution.status, StepStatus::ReadError);
        assert_eq!(execution.read_error_count, 1);
        assert_eq!(execution.write_count, 0);
        assert_eq!(writer.calls.get(), 0);
    }

    #[test]
    fn failed_chunk_should_stop_remaining_chunks() {
        let reader = VecReader::new((0..5).map(Ok).collect());
        let writer = ChunkRecorder {
            fail_at: Some(1),
            ..ChunkRecorder::default()
        };

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .chunk(2)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        let result = step.execute(&mut execution);

        assert!(matches!(result, Err(BatchError::ItemWriter(_))));
        assert_eq!(execution.status, StepStatus::WriteError);
        assert_eq!(*writer.chunks.borrow(), vec![vec![0, 1]]);
        assert_eq!(writer.calls.get(), 2);
        assert_eq!(execution.write_count, 2);
        assert_eq!(execution.write_error_count, 2);
    }

    #[test]
    fn missing_source_should_skip_the_step() {
        let reader = VecReader {
            missing: true,
            ..VecReader::new(vec![Ok(1)])
        };
        let writer = ChunkRecorder::default();

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        assert!(step.execute(&mut execution).is_ok());
        assert_eq!(execution.status, StepStatus::Skipped);
        assert_eq!(writer.calls.get(), 0);
    }

    #[test]
    fn build_should_fail_without_writer() {
        let reader = VecReader::new(vec![]);

        let result = StepBuilder::<i32, i32>::unnamed()
            .reader(&reader)
            .processor(&PositiveOnly)
            .build();

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }

    #[test]
    fn zero_chunk_size_should_be_raised_to_one() {
        let reader = VecReader::new(vec![Ok(1), Ok(2)]);
        let writer = ChunkRecorder::default();

        let step = StepBuilder::<i32, i32>::new("numbers")
            .reader(&reader)
            .processor(&PositiveOnly)
            .writer(&writer)
            .chunk(0)
            .build()
            .unwrap();

        let mut execution = StepExecution::new(step.get_name());
        step.execute(&mut execution).unwrap();
        assert_eq!(execution.batch_count, 2);
    }
}
