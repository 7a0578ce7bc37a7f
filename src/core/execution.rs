use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BatchError;

use super::{context::ExecutionContext, parameters::JobParameters};

/// Status of a job execution or of a step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Created, not running yet.
    Starting,
    /// Running.
    Started,
    /// Stopped by request.
    Stopped,
    /// Ended with an error.
    Failed,
    /// Ended successfully.
    Completed,
}

impl BatchStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, BatchStatus::Starting | BatchStatus::Started)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Stopped => "STOPPED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Completed => "COMPLETED",
        };
        write!(f, "{}", label)
    }
}

/// A job name bound to one set of identifying parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInstance {
    pub id: Uuid,
    pub job_name: String,
    pub parameters: JobParameters,
}

impl JobInstance {
    pub fn new(job_name: &str, parameters: &JobParameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            parameters: parameters.clone(),
        }
    }
}

/// One execution attempt of a [`JobInstance`].
///
/// The execution exclusively owns its execution context and its step executions;
/// steps reach the job context through a [`StepContext`](super::step::StepContext)
/// borrowed from it.
#[derive(Debug, Clone)]
pub struct JobExecution {
    pub id: Uuid,
    pub instance: JobInstance,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub execution_context: ExecutionContext,
    pub step_executions: Vec<StepExecution>,
    pub failure_exceptions: Vec<BatchError>,
}

impl JobExecution {
    pub fn new(instance: &JobInstance) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance: instance.clone(),
            parameters: instance.parameters.clone(),
            status: BatchStatus::Starting,
            create_time: Utc::now(),
            start_time: None,
            end_time: None,
            execution_context: ExecutionContext::new(),
            step_executions: Vec::new(),
            failure_exceptions: Vec::new(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.instance.job_name
    }

    pub fn step_execution(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|step_execution| step_execution.step_name == step_name)
    }

    /// Errors of the job itself followed by those of its steps.
    pub fn all_failure_exceptions(&self) -> Vec<&BatchError> {
        self.failure_exceptions
            .iter()
            .chain(
                self.step_executions
                    .iter()
                    .flat_map(|step_execution| step_execution.failure_exceptions.iter()),
            )
            .collect()
    }

    /// Turns a failed execution into its first recorded error.
    ///
    /// Completed and stopped executions are returned as is.
    pub fn into_result(self) -> Result<JobExecution, BatchError> {
        if self.status != BatchStatus::Failed {
            return Ok(self);
        }

        match self.failure_exceptions.first() {
            Some(error) => Err(error.clone()),
            None => Err(BatchError::Job(self.job_name().to_string())),
        }
    }

    /// Wall clock time between start and end, when both are known.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// One execution of one step inside a [`JobExecution`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepExecution {
    pub id: Uuid,
    pub step_name: String,
    /// Id of the owning job execution.
    pub job_execution_id: Uuid,
    pub status: BatchStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Number of items read.
    pub read_count: usize,
    /// Number of items written.
    pub write_count: usize,
    /// Number of items dropped by the processor.
    pub filter_count: usize,
    /// Number of chunks (or tasklet iterations) that went through.
    pub commit_count: usize,
    /// Number of chunks (or tasklet iterations) that failed.
    pub rollback_count: usize,
    pub execution_context: ExecutionContext,
    pub failure_exceptions: Vec<BatchError>,
    terminate_only: bool,
}

impl StepExecution {
    pub fn new(step_name: &str, job_execution_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_name: step_name.to_string(),
            job_execution_id,
            status: BatchStatus::Starting,
            start_time: None,
            end_time: None,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            commit_count: 0,
            rollback_count: 0,
            execution_context: ExecutionContext::new(),
            failure_exceptions: Vec::new(),
            terminate_only: false,
        }
    }

    /// Asks the engine to stop this step at the next chunk or iteration boundary.
    pub fn set_terminate_only(&mut self) {
        self.terminate_only = true;
    }

    pub fn is_terminate_only(&self) -> bool {
        self.terminate_only
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
