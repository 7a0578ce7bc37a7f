use chrono::Utc;
use log::{error, info, warn};

use crate::BatchError;

use super::{
    build_name,
    chunk::{ChunkOrientedStepBuilder, ChunkProcessing, ChunkSize},
    context::ExecutionContext,
    execution::{BatchStatus, StepExecution},
    item::PassThroughProcessor,
    launcher::StopHandle,
    parameters::JobParameters,
    tasklet::{Tasklet, TaskletStep, TaskletStepBuilder},
};

static PASS_THROUGH: PassThroughProcessor = PassThroughProcessor;

/// What a step is allowed to see and change while it runs.
///
/// A `StepContext` borrows the job parameters and the execution context of the
/// enclosing job execution, plus the step's own [`StepExecution`]. Writes to the
/// job-scoped context go straight into the job execution's context and are
/// visible to every following step of the same run.
pub struct StepContext<'a> {
    job_name: &'a str,
    job_parameters: &'a JobParameters,
    job_execution_context: &'a mut ExecutionContext,
    step_execution: &'a mut StepExecution,
    stop_handle: &'a StopHandle,
}

impl<'a> StepContext<'a> {
    pub fn new(
        job_name: &'a str,
        job_parameters: &'a JobParameters,
        job_execution_context: &'a mut ExecutionContext,
        step_execution: &'a mut StepExecution,
        stop_handle: &'a StopHandle,
    ) -> Self {
        Self {
            job_name,
            job_parameters,
            job_execution_context,
            step_execution,
            stop_handle,
        }
    }

    pub fn job_name(&self) -> &str {
        self.job_name
    }

    pub fn step_name(&self) -> &str {
        &self.step_execution.step_name
    }

    pub fn job_parameters(&self) -> &JobParameters {
        self.job_parameters
    }

    pub fn job_execution_context(&self) -> &ExecutionContext {
        self.job_execution_context
    }

    pub fn job_execution_context_mut(&mut self) -> &mut ExecutionContext {
        self.job_execution_context
    }

    pub fn step_execution(&self) -> &StepExecution {
        self.step_execution
    }

    pub fn step_execution_mut(&mut self) -> &mut StepExecution {
        self.step_execution
    }

    pub fn step_execution_context(&self) -> &ExecutionContext {
        &self.step_execution.execution_context
    }

    pub fn step_execution_context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.step_execution.execution_context
    }

    /// `true` once a stop was requested for the job or for this step only.
    pub fn is_stop_requested(&self) -> bool {
        self.step_execution.is_terminate_only() || self.stop_handle.is_stop_requested()
    }
}

/// The two kinds of step the engine knows how to run.
pub enum StepKind<'a> {
    /// Calls a [`Tasklet`] until it reports it is finished.
    Tasklet(TaskletStep<'a>),
    /// Reads, processes and writes items chunk by chunk.
    Chunk(Box<dyn ChunkProcessing + 'a>),
}

/// A named phase of a job.
///
/// Steps are built with [`StepBuilder`] and executed in order by the job launcher.
pub struct Step<'a> {
    name: String,
    allow_start_if_complete: bool,
    promote_keys: Vec<String>,
    kind: StepKind<'a>,
}

impl<'a> Step<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the step runs again on restart even if it completed in a previous execution.
    pub fn allow_start_if_complete(&self) -> bool {
        self.allow_start_if_complete
    }

    /// Runs the step and records its outcome on the step execution of `context`.
    ///
    /// # Returns
    /// - `Ok(())` when the step completed or was stopped on request
    /// - `Err(BatchError::Step)` when the step failed; the cause is also recorded in
    ///   the step execution's failure exceptions
    pub fn execute(&self, context: &mut StepContext<'_>) -> Result<(), BatchError> {
        {
            let step_execution = context.step_execution_mut();
            step_execution.status = BatchStatus::Started;
            step_execution.start_time = Some(Utc::now());
        }

        info!(
            "Start of step: {}, id: {}",
            self.name,
            context.step_execution().id
        );

        let result = match &self.kind {
            StepKind::Tasklet(step) => step.run(context),
            StepKind::Chunk(step) => step.process_chunks(context),
        };

        let outcome = match result {
            Ok(BatchStatus::Completed) => {
                self.promote(context);
                context.step_execution_mut().status = BatchStatus::Completed;
                Ok(())
            }
            Ok(status) => {
                warn!("Step {} ended with status {}", self.name, status);
                context.step_execution_mut().status = status;
                Ok(())
            }
            Err(error) => {
                error!("Step {} failed: {}", self.name, error);
                let step_execution = context.step_execution_mut();
                step_execution.status = BatchStatus::Failed;
                step_execution.failure_exceptions.push(error.clone());
                Err(BatchError::Step {
                    step_name: self.name.clone(),
                    source: Box::new(error),
                })
            }
        };

        context.step_execution_mut().end_time = Some(Utc::now());

        info!(
            "End of step: {}, id: {}, status: {}",
            self.name,
            context.step_execution().id,
            context.step_execution().status
        );

        outcome
    }

    /// Copies the promoted keys of the step context into the job context.
    fn promote(&self, context: &mut StepContext<'_>) {
        for key in &self.promote_keys {
            if let Some(value) = context.step_execution_context().get(key).cloned() {
                context.job_execution_context_mut().put(key, value);
            }
        }
    }
}

/// Entry point for building a [`Step`].
///
/// # Examples
///
/// ```
/// use batch_core::core::step::{StepBuilder, StepContext};
/// use batch_core::core::tasklet::{RepeatStatus, Tasklet};
/// use batch_core::BatchError;
///
/// struct HelloTasklet;
///
/// impl Tasklet for HelloTasklet {
///     fn execute(&self, _context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let tasklet = HelloTasklet;
/// let step = StepBuilder::new("helloStep").tasklet(&tasklet).build();
/// assert_eq!(step.name(), "helloStep");
/// ```
pub struct StepBuilder {
    name: String,
    allow_start_if_complete: bool,
    promote_keys: Vec<String>,
}

impl Default for StepBuilder {
    fn default() -> Self {
        Self {
            name: build_name(),
            allow_start_if_complete: false,
            promote_keys: Vec::new(),
        }
    }
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Runs the step again on restart even if it already completed.
    pub fn allow_start_if_complete(mut self, allow: bool) -> Self {
        self.allow_start_if_complete = allow;
        self
    }

    /// Keys copied from the step context to the job context when the step completes.
    pub fn promote_keys(mut self, keys: &[&str]) -> Self {
        self.promote_keys = keys.iter().map(|key| key.to_string()).collect();
        self
    }

    /// Continues as a tasklet step.
    pub fn tasklet<'a>(self, tasklet: &'a dyn Tasklet) -> TaskletStepBuilder<'a> {
        TaskletStepBuilder::new(self, tasklet)
    }

    /// Continues as a chunk-oriented step reading items of type `I`.
    ///
    /// Until [`ChunkOrientedStepBuilder::processor`] is called, items are written
    /// unchanged.
    pub fn chunk<'a, I: Clone + 'a>(self, chunk_size: usize) -> ChunkOrientedStepBuilder<'a, I, I> {
        ChunkOrientedStepBuilder::new(self, ChunkSize::Fixed(chunk_size), &PASS_THROUGH)
    }

    /// Same as [`StepBuilder::chunk`], with a chunk size read from a job parameter
    /// when the step starts (`default` when the parameter is absent).
    pub fn chunk_from_parameter<'a, I: Clone + 'a>(
        self,
        parameter: &str,
        default: usize,
    ) -> ChunkOrientedStepBuilder<'a, I, I> {
        let chunk_size = ChunkSize::FromParameter {
            name: parameter.to_string(),
            default,
        };
        ChunkOrientedStepBuilder::new(self, chunk_size, &PASS_THROUGH)
    }

    pub(crate) fn into_step<'a>(self, kind: StepKind<'a>) -> Step<'a> {
        Step {
            name: self.name,
            allow_start_if_complete: self.allow_start_if_complete,
            promote_keys: self.promote_keys,
            kind,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}
