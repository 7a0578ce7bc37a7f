use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use log::{error, info};

use crate::BatchError;

use super::{
    execution::{BatchStatus, JobExecution, JobInstance, StepExecution},
    job::Job,
    parameters::JobParameters,
    repository::JobRepository,
    step::{Step, StepContext},
};

/// Runs a job with a set of parameters.
pub trait JobLauncher {
    /// Launches `job` with `parameters`.
    ///
    /// # Returns
    /// - `Ok(JobExecution)` once the job ran, whatever its final status; a failed
    ///   execution carries its errors in `failure_exceptions`
    /// - `Err(BatchError)` when the launch is rejected before any step runs
    ///   (instance already complete, already running, not restartable) or when the
    ///   repository fails; an execution interrupted by a repository error is
    ///   recorded as failed with that error
    fn run(&self, job: &Job<'_>, parameters: &JobParameters) -> Result<JobExecution, BatchError>;
}

/// Requests a running job to stop.
///
/// The request is observed between chunks, between tasklet iterations and between
/// steps. A reader or writer call already in progress is never interrupted.
/// Handles are cheap to clone and can be moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stop_requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }
}

/// [`JobLauncher`] running the steps of a job one after the other on the calling thread.
///
/// # Example
///
/// ```
/// use batch_core::core::job::JobBuilder;
/// use batch_core::core::launcher::{JobLauncher, SimpleJobLauncher};
/// use batch_core::core::parameters::{JobParameters, RunIdIncrementer};
/// use batch_core::core::execution::BatchStatus;
/// use batch_core::core::repository::InMemoryJobRepository;
/// use batch_core::core::step::{StepBuilder, StepContext};
/// use batch_core::core::tasklet::{RepeatStatus, Tasklet};
/// use batch_core::BatchError;
///
/// struct Hello;
///
/// impl Tasklet for Hello {
///     fn execute(&self, _context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let hello = Hello;
/// let job = JobBuilder::new()
///     .name("helloJob".to_string())
///     .incrementer(RunIdIncrementer::default())
///     .start(StepBuilder::new("helloStep").tasklet(&hello).build())
///     .build();
///
/// let repository = InMemoryJobRepository::new();
/// let launcher = SimpleJobLauncher::new(&repository);
///
/// let first = launcher.run(&job, &JobParameters::new()).unwrap();
/// let second = launcher.run(&job, &JobParameters::new()).unwrap();
///
/// assert_eq!(first.status, BatchStatus::Completed);
/// assert_eq!(second.parameters.get_long("run.id"), Some(2));
/// ```
pub struct SimpleJobLauncher<'r> {
    repository: &'r dyn JobRepository,
    stop_handle: StopHandle,
}

impl<'r> SimpleJobLauncher<'r> {
    pub fn new(repository: &'r dyn JobRepository) -> Self {
        Self {
            repository,
            stop_handle: StopHandle::default(),
        }
    }

    /// Handle stopping the job this launcher is running.
    ///
    /// Every launch clears previous stop requests.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Applies the incrementer of the job, if any, to the supplied parameters.
    fn resolve_parameters(
        &self,
        job: &Job<'_>,
        parameters: &JobParameters,
    ) -> Result<JobParameters, BatchError> {
        if !job.has_incrementer() {
            return Ok(parameters.clone());
        }

        let previous = self
            .repository
            .get_last_job_instance(job.name())?
            .map(|instance| instance.parameters)
            .unwrap_or_default();

        Ok(job.next_parameters(&previous, parameters))
    }

    /// Rejects a new execution of an existing instance when it is not allowed.
    fn check_restart(&self, job: &Job<'_>, instance: &JobInstance) -> Result<(), BatchError> {
        let executions = self.repository.get_job_executions(instance)?;

        if executions.iter().any(|execution| execution.status.is_running()) {
            return Err(BatchError::JobExecutionAlreadyRunning(format!(
                "job={}, parameters={}",
                instance.job_name, instance.parameters
            )));
        }

        if executions
            .iter()
            .any(|execution| execution.status == BatchStatus::Completed)
        {
            return Err(BatchError::JobInstanceAlreadyComplete {
                job_name: instance.job_name.clone(),
                parameters: instance.parameters.to_string(),
            });
        }

        if !executions.is_empty() && !job.is_restartable() {
            return Err(BatchError::JobRestart(format!(
                "job={}, parameters={}",
                instance.job_name, instance.parameters
            )));
        }

        Ok(())
    }

    /// Runs the steps in order and returns the resulting job status.
    fn execute_steps(
        &self,
        job: &Job<'_>,
        job_execution: &mut JobExecution,
    ) -> Result<BatchStatus, BatchError> {
        for step in job.steps() {
            if self.stop_handle.is_stop_requested() {
                info!("Stop requested, step {} is not executed", step.name());
                return Ok(BatchStatus::Stopped);
            }

            let Some(mut step_execution) = self.prepare_step_execution(step, job_execution)? else {
                continue;
            };

            self.repository.add_step_execution(&step_execution)?;

            let result = {
                let mut context = StepContext::new(
                    job.name(),
                    &job_execution.parameters,
                    &mut job_execution.execution_context,
                    &mut step_execution,
                    &self.stop_handle,
                );
                step.execute(&mut context)
            };

            self.repository.update_step_execution(&step_execution)?;

            let step_status = step_execution.status;
            job_execution.step_executions.push(step_execution);
            self.repository.update_job_execution(job_execution)?;

            if let Err(error) = result {
                job_execution.failure_exceptions.push(error);
                return Ok(BatchStatus::Failed);
            }

            if step_status != BatchStatus::Completed {
                return Ok(step_status);
            }
        }

        Ok(BatchStatus::Completed)
    }

    /// Marks an execution interrupted by a repository error as failed.
    ///
    /// The final save is attempted once; if the repository is still failing the
    /// execution stays recorded as running.
    fn abandon(&self, job_execution: &mut JobExecution, error: BatchError) {
        error!(
            "Job {} aborted, id: {}: {}",
            job_execution.job_name(),
            job_execution.id,
            error
        );
        job_execution.status = BatchStatus::Failed;
        job_execution.end_time = Some(Utc::now());
        job_execution.failure_exceptions.push(error);

        if let Err(update_error) = self.repository.update_job_execution(job_execution) {
            error!(
                "Unable to record the failure of job execution {}: {}",
                job_execution.id, update_error
            );
        }
    }

    /// Creates the step execution for `step`, or `None` when the step already
    /// completed in a previous execution of the same instance.
    ///
    /// A step restarting after a failure or a stop gets back the context of its
    /// last execution.
    fn prepare_step_execution(
        &self,
        step: &Step<'_>,
        job_execution: &JobExecution,
    ) -> Result<Option<StepExecution>, BatchError> {
        let mut step_execution = StepExecution::new(step.name(), job_execution.id);

        let last = self
            .repository
            .get_last_step_execution(&job_execution.instance, step.name())?;

        if let Some(last) = last {
            if last.status == BatchStatus::Completed {
                if !step.allow_start_if_complete() {
                    info!(
                        "Step already complete or not restartable, so no action to execute: {}",
                        step.name()
                    );
                    return Ok(None);
                }
            } else {
                info!("Restarting step {} from its last execution", step.name());
                step_execution.execution_context = last.execution_context;
            }
        }

        Ok(Some(step_execution))
    }
}

impl JobLauncher for SimpleJobLauncher<'_> {
    fn run(&self, job: &Job<'_>, parameters: &JobParameters) -> Result<JobExecution, BatchError> {
        let parameters = self.resolve_parameters(job, parameters)?;

        let (instance, previous_execution) =
            match self.repository.get_job_instance(job.name(), &parameters)? {
                Some(instance) => {
                    self.check_restart(job, &instance)?;
                    let previous = self.repository.get_last_job_execution(&instance)?;
                    (instance, previous)
                }
                None => (
                    self.repository
                        .create_job_instance(job.name(), &parameters)?,
                    None,
                ),
            };

        let mut job_execution = self.repository.create_job_execution(&instance)?;

        if let Some(previous) = previous_execution {
            info!(
                "Restarting job: {}, previous execution: {} ({})",
                job.name(),
                previous.id,
                previous.status
            );
            job_execution.execution_context = previous.execution_context;
        }

        self.stop_handle.reset();

        job_execution.start_time = Some(Utc::now());
        job_execution.status = BatchStatus::Started;
        self.repository.update_job_execution(&job_execution)?;

        info!(
            "Start of job: {}, id: {}, parameters: {}",
            job.name(),
            job_execution.id,
            job_execution.parameters
        );

        let status = match self.execute_steps(job, &mut job_execution) {
            Ok(status) => status,
            Err(error) => {
                self.abandon(&mut job_execution, error.clone());
                return Err(error);
            }
        };

        job_execution.status = status;
        job_execution.end_time = Some(Utc::now());
        self.repository.update_job_execution(&job_execution)?;

        if status == BatchStatus::Failed {
            error!("Job {} failed, id: {}", job.name(), job_execution.id);
            for failure in job_execution.all_failure_exceptions() {
                error!("Job {} failure: {}", job.name(), failure);
            }
        }

        info!(
            "End of job: {}, id: {}, status: {}",
            job.name(),
            job_execution.id,
            job_execution.status
        );

        Ok(job_execution)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{JobLauncher, SimpleJobLauncher, StopHandle};
    use crate::{
        BatchError,
        core::{
            execution::{BatchStatus, JobExecution, JobInstance, StepExecution},
            job::JobBuilder,
            parameters::{JobParameters, JobParametersBuilder},
            repository::{InMemoryJobRepository, JobRepository},
            step::{StepBuilder, StepContext},
            tasklet::{RepeatStatus, Tasklet},
        },
    };

    struct CountingTasklet {
        calls: Cell<usize>,
    }

    impl CountingTasklet {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }
    }

    impl Tasklet for CountingTasklet {
        fn execute(&self, _context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(RepeatStatus::Finished)
        }
    }

    /// Requests a job stop through the handle while it runs.
    struct StopRequestingTasklet {
        handle: StopHandle,
    }

    impl Tasklet for StopRequestingTasklet {
        fn execute(&self, _context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
            self.handle.stop();
            Ok(RepeatStatus::Finished)
        }
    }

    /// In-memory repository refusing step execution updates while `failing` is set.
    struct UnreliableRepository {
        inner: InMemoryJobRepository,
        failing: Cell<bool>,
    }

    impl JobRepository for UnreliableRepository {
        fn get_last_job_instance(&self, job_name: &str) -> Result<Option<JobInstance>, BatchError> {
            self.inner.get_last_job_instance(job_name)
        }

        fn get_job_instance(
            &self,
            job_name: &str,
            parameters: &JobParameters,
        ) -> Result<Option<JobInstance>, BatchError> {
            self.inner.get_job_instance(job_name, parameters)
        }

        fn create_job_instance(
            &self,
            job_name: &str,
            parameters: &JobParameters,
        ) -> Result<JobInstance, BatchError> {
            self.inner.create_job_instance(job_name, parameters)
        }

        fn get_job_executions(&self, instance: &JobInstance) -> Result<Vec<JobExecution>, BatchError> {
            self.inner.get_job_executions(instance)
        }

        fn create_job_execution(&self, instance: &JobInstance) -> Result<JobExecution, BatchError> {
            self.inner.create_job_execution(instance)
        }

        fn update_job_execution(&self, job_execution: &JobExecution) -> Result<(), BatchError> {
            self.inner.update_job_execution(job_execution)
        }

        fn add_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
            self.inner.add_step_execution(step_execution)
        }

        fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
            if self.failing.get() {
                return Err(BatchError::JobRepository("connection lost".to_string()));
            }
            self.inner.update_step_execution(step_execution)
        }

        fn get_last_step_execution(
            &self,
            instance: &JobInstance,
            step_name: &str,
        ) -> Result<Option<StepExecution>, BatchError> {
            self.inner.get_last_step_execution(instance, step_name)
        }
    }

    #[test]
    fn repository_error_during_the_steps_leaves_a_failed_execution() {
        let repository = UnreliableRepository {
            inner: InMemoryJobRepository::new(),
            failing: Cell::new(true),
        };
        let launcher = SimpleJobLauncher::new(&repository);
        let tasklet = CountingTasklet::new();
        let job = JobBuilder::new()
            .name("unreliable".to_string())
            .start(StepBuilder::new("only").tasklet(&tasklet).build())
            .build();
        let parameters = JobParametersBuilder::new().add_long("day", 1).build();

        let result = launcher.run(&job, &parameters);
        assert_eq!(
            result.unwrap_err(),
            BatchError::JobRepository("connection lost".to_string())
        );

        let instance = repository
            .get_job_instance("unreliable", &parameters)
            .unwrap()
            .unwrap();
        let recorded = repository
            .get_last_job_execution(&instance)
            .unwrap()
            .unwrap();
        assert_eq!(recorded.status, BatchStatus::Failed);
        assert!(recorded.end_time.is_some());

        repository.failing.set(false);
        let restarted = launcher.run(&job, &parameters).unwrap();

        assert_eq!(restarted.status, BatchStatus::Completed);
        assert_eq!(restarted.instance, instance);
        assert_eq!(tasklet.calls.get(), 2);
    }

    #[test]
    fn stop_handle_is_shared_between_clones() {
        let handle = StopHandle::default();
        let clone = handle.clone();

        clone.stop();

        assert!(handle.is_stop_requested());
        handle.reset();
        assert!(!clone.is_stop_requested());
    }

    #[test]
    fn job_without_steps_completes() {
        let repository = InMemoryJobRepository::new();
        let launcher = SimpleJobLauncher::new(&repository);
        let job = JobBuilder::new().name("empty".to_string()).build();

        let execution = launcher.run(&job, &JobParameters::new()).unwrap();

        assert_eq!(execution.status, BatchStatus::Completed);
        assert!(execution.start_time.is_some());
        assert!(execution.end_time.is_some());
        assert!(execution.step_executions.is_empty());
    }

    #[test]
    fn stop_between_steps_leaves_the_remaining_ones_unexecuted() {
        let repository = InMemoryJobRepository::new();
        let launcher = SimpleJobLauncher::new(&repository);
        let stopper = StopRequestingTasklet {
            handle: launcher.stop_handle(),
        };
        let second = CountingTasklet::new();
        let job = JobBuilder::new()
            .name("stoppable".to_string())
            .start(StepBuilder::new("first").tasklet(&stopper).build())
            .next(StepBuilder::new("second").tasklet(&second).build())
            .build();

        let execution = launcher.run(&job, &JobParameters::new()).unwrap();

        assert_eq!(execution.status, BatchStatus::Stopped);
        assert_eq!(execution.step_executions.len(), 1);
        assert_eq!(second.calls.get(), 0);
    }

    #[test]
    fn stopped_instance_restarts_where_it_stopped() {
        let repository = InMemoryJobRepository::new();
        let launcher = SimpleJobLauncher::new(&repository);
        let stopper = StopRequestingTasklet {
            handle: launcher.stop_handle(),
        };
        let second = CountingTasklet::new();
        let job = JobBuilder::new()
            .name("stoppable".to_string())
            .start(StepBuilder::new("first").tasklet(&stopper).build())
            .next(StepBuilder::new("second").tasklet(&second).build())
            .build();
        let parameters = JobParametersBuilder::new().add_long("day", 1).build();

        let stopped = launcher.run(&job, &parameters).unwrap();
        let restarted = launcher.run(&job, &parameters).unwrap();

        assert_eq!(stopped.status, BatchStatus::Stopped);
        assert_eq!(restarted.status, BatchStatus::Completed);
        assert_eq!(restarted.instance, stopped.instance);
        assert_eq!(second.calls.get(), 1);
        // first completed in the stopped execution and is skipped
        assert_eq!(restarted.step_executions.len(), 1);
        assert_eq!(restarted.step_executions[0].step_name, "second");
        assert_eq!(
            repository
                .get_job_executions(&restarted.instance)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn non_restartable_job_rejects_a_second_execution() {
        let repository = InMemoryJobRepository::new();
        let launcher = SimpleJobLauncher::new(&repository);
        let stopper = StopRequestingTasklet {
            handle: launcher.stop_handle(),
        };
        let job = JobBuilder::new()
            .name("once".to_string())
            .restartable(false)
            .start(StepBuilder::new("first").tasklet(&stopper).build())
            .next(StepBuilder::new("second").tasklet(&stopper).build())
            .build();

        let stopped = launcher.run(&job, &JobParameters::new()).unwrap();
        assert_eq!(stopped.status, BatchStatus::Stopped);

        let result = launcher.run(&job, &JobParameters::new());
        assert!(matches!(result, Err(BatchError::JobRestart(_))));
    }

    #[test]
    fn running_execution_rejects_a_new_launch() {
        let repository = InMemoryJobRepository::new();
        let launcher = SimpleJobLauncher::new(&repository);
        let tasklet = CountingTasklet::new();
        let job = JobBuilder::new()
            .name("busy".to_string())
            .start(StepBuilder::new("only").tasklet(&tasklet).build())
            .build();

        // simulates an execution left running by another process
        let instance = repository
            .create_job_instance("busy", &JobParameters::new())
            .unwrap();
        let mut running = repository.create_job_execution(&instance).unwrap();
        running.status = BatchStatus::Started;
        repository.update_job_execution(&running).unwrap();

        let result = launcher.run(&job, &JobParameters::new());

        assert!(matches!(
            result,
            Err(BatchError::JobExecutionAlreadyRunning(_))
        ));
        assert_eq!(tasklet.calls.get(), 0);
    }
}
