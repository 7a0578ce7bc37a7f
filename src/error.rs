use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
/// Batch error
pub enum BatchError {
    /// Invalid step or job configuration, detected before any item is read.
    #[error("Configuration: {0}")]
    Configuration(String),

    /// Non-transient failure of an `ItemReader` (parse error, corrupted input, ...).
    #[error("ItemReader from: {0}")]
    ItemReader(String),

    /// Failure of an `ItemReader` that may succeed if attempted again (I/O hiccup, timeout, ...).
    #[error("ItemReader (transient) from: {0}")]
    TransientItemReader(String),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("Tasklet from: {0}")]
    Tasklet(String),

    /// A step ended unsuccessfully; `source` is the error that failed it.
    #[error("Step {step_name} failed: {source}")]
    Step {
        step_name: String,
        source: Box<BatchError>,
    },

    /// A job execution failed without a more specific recorded cause.
    #[error("Job {0} failed")]
    Job(String),

    #[error("A job instance already exists and is complete for job={job_name}, parameters={parameters}")]
    JobInstanceAlreadyComplete {
        job_name: String,
        parameters: String,
    },

    #[error("A job execution for this job is already running: {0}")]
    JobExecutionAlreadyRunning(String),

    #[error("JobInstance already exists and is not restartable: {0}")]
    JobRestart(String),

    #[error("JobRepository: {0}")]
    JobRepository(String),
}

impl BatchError {
    /// Returns `true` for errors a future retry policy could attempt again.
    ///
    /// The engine itself never retries: a transient reader error fails the step
    /// exactly like a non-transient one.
    pub fn is_transient(&self) -> bool {
        match self {
            BatchError::TransientItemReader(_) => true,
            BatchError::Step { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
