use log::{debug, warn};

use crate::BatchError;

use super::{
    execution::{BatchStatus, StepExecution},
    item::{ItemProcessor, ItemReader, ItemWriter},
    parameters::{JobParameter, JobParameters},
    step::{Step, StepBuilder, StepContext, StepKind},
};

/// State of the reader after a chunk has been read.
#[derive(Debug, PartialEq)]
pub enum ChunkStatus {
    /// The chunk holds `chunk_size` items; the reader may have more.
    Full,
    /// The reader is exhausted; the chunk may be smaller than `chunk_size`, or empty.
    Finished,
}

/// Number of items per chunk (the commit interval).
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSize {
    Fixed(usize),
    /// Read from a job parameter when the step starts, `default` when absent.
    FromParameter { name: String, default: usize },
}

impl ChunkSize {
    /// Resolves the chunk size for one execution.
    ///
    /// A late-bound size accepts a long parameter or a string parameter holding
    /// an integer. Anything else, or a value below 1, is a configuration error.
    pub fn resolve(&self, parameters: &JobParameters) -> Result<usize, BatchError> {
        let (name, size) = match self {
            ChunkSize::Fixed(size) => return Self::validate("chunk size", *size),
            ChunkSize::FromParameter { name, default } => match parameters.get(name) {
                None => (name, *default),
                Some(JobParameter::Long(value)) => (name, Self::from_long(name, *value)?),
                Some(JobParameter::String(value)) => match value.trim().parse::<i64>() {
                    Ok(value) => (name, Self::from_long(name, value)?),
                    Err(_) => {
                        return Err(BatchError::Configuration(format!(
                            "job parameter {} is not an integer: {}",
                            name, value
                        )));
                    }
                },
                Some(other) => {
                    return Err(BatchError::Configuration(format!(
                        "job parameter {} cannot be used as a chunk size: {}",
                        name, other
                    )));
                }
            },
        };
        Self::validate(name, size)
    }

    fn from_long(name: &str, value: i64) -> Result<usize, BatchError> {
        usize::try_from(value).map_err(|_| {
            BatchError::Configuration(format!(
                "{} must be a positive integer, got {}",
                name, value
            ))
        })
    }

    fn validate(name: &str, size: usize) -> Result<usize, BatchError> {
        if size == 0 {
            return Err(BatchError::Configuration(format!(
                "{} must be a positive integer, got 0",
                name
            )));
        }
        Ok(size)
    }
}

/// Type-erased view of a [`ChunkOrientedStep`], so that steps with different item
/// types fit in the same job.
pub trait ChunkProcessing {
    /// Runs every chunk until the reader is exhausted, a stop is requested, or an error occurs.
    fn process_chunks(&self, context: &mut StepContext<'_>) -> Result<BatchStatus, BatchError>;
}

/// Step that reads, processes and writes items in chunks.
///
/// One chunk is: up to `chunk_size` reads, one processor call per read item (in read
/// order), then a single writer call with the items the processor kept. Any error fails
/// the chunk and the step; nothing is skipped or retried.
pub struct ChunkOrientedStep<'a, I, O> {
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Component responsible for processing items
    processor: &'a dyn ItemProcessor<I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    chunk_size: ChunkSize,
}

impl<I, O> ChunkProcessing for ChunkOrientedStep<'_, I, O> {
    fn process_chunks(&self, context: &mut StepContext<'_>) -> Result<BatchStatus, BatchError> {
        // Late-bound values are resolved once per execution, before anything is read.
        let chunk_size = self.chunk_size.resolve(context.job_parameters())?;
        debug!("Chunk size for step {}: {}", context.step_name(), chunk_size);

        self.writer.open()?;

        let result = self.run_chunks(context, chunk_size);

        if let Err(error) = self.writer.close() {
            warn!("Non-fatal error while closing writer: {}", error);
        }

        result
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn run_chunks(
        &self,
        context: &mut StepContext<'_>,
        chunk_size: usize,
    ) -> Result<BatchStatus, BatchError> {
        loop {
            if context.is_stop_requested() {
                debug!("Stop requested, no further chunk is read");
                return Ok(BatchStatus::Stopped);
            }

            let step_execution = context.step_execution_mut();

            let (read_items, chunk_status) = self
                .read_chunk(step_execution, chunk_size)
                .inspect_err(|_| step_execution.rollback_count += 1)?;

            if read_items.is_empty() {
                debug!("Reader exhausted, end of step");
                return Ok(BatchStatus::Completed);
            }

            let processed_items = self
                .process_chunk(step_execution, &read_items)
                .inspect_err(|_| step_execution.rollback_count += 1)?;

            self.write_chunk(step_execution, &processed_items)
                .inspect_err(|_| step_execution.rollback_count += 1)?;

            step_execution.commit_count += 1;

            if chunk_status == ChunkStatus::Finished {
                return Ok(BatchStatus::Completed);
            }
        }
    }

    /// Reads up to `chunk_size` items from the reader.
    ///
    /// # Returns
    /// - `Ok((items, ChunkStatus::Full))`: the chunk is full
    /// - `Ok((items, ChunkStatus::Finished))`: the reader is exhausted
    /// - `Err(BatchError)`: the reader failed
    fn read_chunk(
        &self,
        step_execution: &mut StepExecution,
        chunk_size: usize,
    ) -> Result<(Vec<I>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");

        let mut read_items = Vec::new();

        while read_items.len() < chunk_size {
            match self.reader.read()? {
                Some(item) => {
                    read_items.push(item);
                    step_execution.read_count += 1;
                }
                None => {
                    debug!("End reading chunk: FINISHED ({} items)", read_items.len());
                    return Ok((read_items, ChunkStatus::Finished));
                }
            }
        }

        debug!("End reading chunk: FULL");
        Ok((read_items, ChunkStatus::Full))
    }

    /// Applies the processor to each item in read order, leaving out the dropped ones.
    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        read_items: &[I],
    ) -> Result<Vec<O>, BatchError> {
        debug!("Processing chunk of {} items", read_items.len());

        let mut processed_items = Vec::with_capacity(read_items.len());

        for item in read_items {
            match self.processor.process(item)? {
                Some(processed_item) => processed_items.push(processed_item),
                None => step_execution.filter_count += 1,
            }
        }

        Ok(processed_items)
    }

    /// Writes the processed items in a single writer call.
    ///
    /// A chunk whose items were all filtered out is not written.
    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        if processed_items.is_empty() {
            debug!("No items to write, skipping write call");
            return Ok(());
        }

        debug!("Writing chunk of {} items", processed_items.len());

        self.writer.write(processed_items)?;
        self.writer.flush()?;
        step_execution.write_count += processed_items.len();

        Ok(())
    }
}

/// Builder for a chunk-oriented step, obtained from [`StepBuilder::chunk`].
///
/// # Examples
///
/// ```
/// use batch_core::core::item::{ItemProcessor, ItemProcessorResult, ItemWriter, ItemWriterResult};
/// use batch_core::core::step::StepBuilder;
/// use batch_core::item::list::ListItemReader;
///
/// struct Greeting;
///
/// impl ItemProcessor<String, String> for Greeting {
///     fn process(&self, item: &String) -> ItemProcessorResult<String> {
///         Ok(Some(format!("{}, Spring Batch", item)))
///     }
/// }
///
/// struct Sink;
///
/// impl ItemWriter<String> for Sink {
///     fn write(&self, _items: &[String]) -> ItemWriterResult {
///         Ok(())
///     }
/// }
///
/// let reader = ListItemReader::new(vec!["Hello".to_string()]);
/// let processor = Greeting;
/// let writer = Sink;
///
/// let step = StepBuilder::new("chunkBaseStep")
///     .chunk::<String>(10)
///     .reader(&reader)
///     .processor(&processor)
///     .writer(&writer)
///     .build()
///     .unwrap();
///
/// assert_eq!(step.name(), "chunkBaseStep");
/// ```
pub struct ChunkOrientedStepBuilder<'a, I, O> {
    step: StepBuilder,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: &'a dyn ItemProcessor<I, O>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: ChunkSize,
}

impl<'a, I: 'a, O: 'a> ChunkOrientedStepBuilder<'a, I, O> {
    pub(crate) fn new(
        step: StepBuilder,
        chunk_size: ChunkSize,
        processor: &'a dyn ItemProcessor<I, O>,
    ) -> Self {
        Self {
            step,
            reader: None,
            processor,
            writer: None,
            chunk_size,
        }
    }

    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Sets the processor, which may change the output item type.
    ///
    /// Call it before [`writer`](Self::writer): the writer depends on the output type,
    /// so a writer set earlier is discarded.
    pub fn processor<P: 'a>(
        self,
        processor: &'a dyn ItemProcessor<I, P>,
    ) -> ChunkOrientedStepBuilder<'a, I, P> {
        if self.writer.is_some() {
            warn!(
                "Step {}: processor set after writer, the writer must be set again",
                self.step.name()
            );
        }
        ChunkOrientedStepBuilder {
            step: self.step,
            reader: self.reader,
            processor,
            writer: None,
            chunk_size: self.chunk_size,
        }
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Replaces the chunk size given to [`StepBuilder::chunk`].
    pub fn chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Validates the configuration and builds the step.
    ///
    /// # Errors
    /// `BatchError::Configuration` when the reader or the writer is missing, or when
    /// the chunk size (or the default of a late-bound one) is not positive.
    pub fn build(self) -> Result<Step<'a>, BatchError> {
        let name = self.step.name().to_string();

        let reader = self.reader.ok_or_else(|| {
            BatchError::Configuration(format!("step {}: a reader is required", name))
        })?;
        let writer = self.writer.ok_or_else(|| {
            BatchError::Configuration(format!("step {}: a writer is required", name))
        })?;

        match &self.chunk_size {
            ChunkSize::Fixed(size) => ChunkSize::validate("chunk size", *size)?,
            ChunkSize::FromParameter { name, default } => {
                ChunkSize::validate(&format!("default of {}", name), *default)?
            }
        };

        let step = ChunkOrientedStep {
            reader,
            processor: self.processor,
            writer,
            chunk_size: self.chunk_size,
        };

        Ok(self.step.into_step(StepKind::Chunk(Box::new(step))))
    }
}
