use crate::error::BatchError;

/// Result of a single `ItemReader::read` call.
///
/// - `Ok(Some(item))`: an item was read
/// - `Ok(None)`: the reader is exhausted
/// - `Err(error)`: the read failed
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of a single `ItemProcessor::process` call.
///
/// - `Ok(Some(item))`: the transformed item, to be written
/// - `Ok(None)`: the item is filtered out of the write batch
/// - `Err(error)`: processing failed, which fails the whole chunk
pub type ItemProcessorResult<O> = Result<Option<O>, BatchError>;

/// Result of an `ItemWriter` operation.
pub type ItemWriterResult = Result<(), BatchError>;

/// Source of the items of a chunk-oriented step, read one at a time.
///
/// Once exhausted, a reader must keep returning `Ok(None)` on every further call.
/// Readers take `&self`: implementations that hold a cursor use interior mutability.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Business logic applied to each read item, in read order.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Destination of the processed items, one chunk at a time.
///
/// `write` receives the whole chunk and either consumes all of it or fails for all of it.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    /// Called after each successful `write`.
    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Called once before the first chunk of a step.
    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Called once after the last chunk of a step, whatever its outcome.
    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Processor used when a chunk-oriented step has none: every item goes through unchanged.
#[derive(Default)]
pub struct PassThroughProcessor;

impl<I: Clone> ItemProcessor<I, I> for PassThroughProcessor {
    fn process(&self, item: &I) -> ItemProcessorResult<I> {
        Ok(Some(item.clone()))
    }
}
