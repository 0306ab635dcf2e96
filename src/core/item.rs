use crate::error::BatchError;

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<R> = Result<Option<R>, BatchError>;

/// Result of processing one item: `Ok(None)` filters the item out.
pub type ItemProcessorResult<W> = Result<Option<W>, BatchError>;

/// Result of writing a chunk of items.
pub type ItemWriterResult = Result<(), BatchError>;

/// Retrieves input for a step, one item at a time.
pub trait ItemReader<R> {
    /// Acquires the underlying source.
    ///
    /// Readers backed by a file report a missing file here with
    /// [`BatchError::MissingFile`] so the step can skip instead of failing.
    fn open(&self) -> Result<(), BatchError> {
        Ok(())
    }

    fn read(&self) -> ItemReaderResult<R>;
}

/// Business logic applied to every item read.
pub trait ItemProcessor<R, W> {
    fn process(&self, item: &R) -> ItemProcessorResult<W>;
}

/// Output of a step, one chunk of items at a time.
///
/// A call to `write` receives exactly one chunk; implementations that can
/// commit atomically must apply the whole slice or nothing.
pub trait ItemWriter<W> {
    fn write(&self, items: &[W]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
