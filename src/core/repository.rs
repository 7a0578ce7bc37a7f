//! Storage of job instances, job executions and step executions.

use std::cell::RefCell;

use log::debug;
use uuid::Uuid;

use crate::BatchError;

use super::{
    context::ExecutionContext,
    execution::{JobExecution, JobInstance, StepExecution},
    parameters::JobParameters,
};

/// Persistence contract used by the job launcher.
///
/// Every state transition of a job execution or of a step execution goes through
/// this trait. Implementations decide how durable the records are.
pub trait JobRepository {
    /// Most recently created instance of the job, if any.
    fn get_last_job_instance(&self, job_name: &str) -> Result<Option<JobInstance>, BatchError>;

    /// Instance identified by the job name and the parameters, if any.
    fn get_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<Option<JobInstance>, BatchError>;

    fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance, BatchError>;

    /// Every execution of the instance, oldest first.
    fn get_job_executions(&self, instance: &JobInstance) -> Result<Vec<JobExecution>, BatchError>;

    fn get_last_job_execution(
        &self,
        instance: &JobInstance,
    ) -> Result<Option<JobExecution>, BatchError> {
        Ok(self.get_job_executions(instance)?.pop())
    }

    /// Creates and stores a new execution of `instance`.
    fn create_job_execution(&self, instance: &JobInstance) -> Result<JobExecution, BatchError>;

    /// Saves the status, timestamps, context and step executions of a job execution.
    fn update_job_execution(&self, job_execution: &JobExecution) -> Result<(), BatchError>;

    fn add_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError>;

    fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError>;

    /// Last execution of the named step across all executions of `instance`.
    fn get_last_step_execution(
        &self,
        instance: &JobInstance,
        step_name: &str,
    ) -> Result<Option<StepExecution>, BatchError>;
}

/// Stored form of a job execution: the execution context is kept as a JSON snapshot.
struct JobExecutionRecord {
    execution: JobExecution,
    context: String,
}

/// Stored form of a step execution.
struct StepExecutionRecord {
    execution: StepExecution,
    context: String,
}

#[derive(Default)]
struct Store {
    instances: Vec<JobInstance>,
    job_executions: Vec<JobExecutionRecord>,
    step_executions: Vec<StepExecutionRecord>,
}

/// [`JobRepository`] keeping everything in memory, for tests and single-process jobs.
///
/// Execution contexts are stored as JSON snapshots, so what comes back from the
/// repository is what was last saved, not a live view of the running execution.
#[derive(Default)]
pub struct InMemoryJobRepository {
    store: RefCell<Store>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn restore_job_execution(record: &JobExecutionRecord) -> Result<JobExecution, BatchError> {
        let mut execution = record.execution.clone();
        execution.execution_context = ExecutionContext::from_json(&record.context)?;
        Ok(execution)
    }

    fn restore_step_execution(record: &StepExecutionRecord) -> Result<StepExecution, BatchError> {
        let mut execution = record.execution.clone();
        execution.execution_context = ExecutionContext::from_json(&record.context)?;
        Ok(execution)
    }

    fn job_execution_ids(store: &Store, instance_id: Uuid) -> Vec<Uuid> {
        store
            .job_executions
            .iter()
            .filter(|record| record.execution.instance.id == instance_id)
            .map(|record| record.execution.id)
            .collect()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn get_last_job_instance(&self, job_name: &str) -> Result<Option<JobInstance>, BatchError> {
        let store = self.store.borrow();
        Ok(store
            .instances
            .iter()
            .rev()
            .find(|instance| instance.job_name == job_name)
            .cloned())
    }

    fn get_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<Option<JobInstance>, BatchError> {
        let store = self.store.borrow();
        Ok(store
            .instances
            .iter()
            .find(|instance| instance.job_name == job_name && &instance.parameters == parameters)
            .cloned())
    }

    fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobInstance, BatchError> {
        if self.get_job_instance(job_name, parameters)?.is_some() {
            return Err(BatchError::JobRepository(format!(
                "job instance already exists for job={}, parameters={}",
                job_name, parameters
            )));
        }

        let instance = JobInstance::new(job_name, parameters);
        debug!("Created job instance {} for job {}", instance.id, job_name);
        self.store.borrow_mut().instances.push(instance.clone());
        Ok(instance)
    }

    fn get_job_executions(&self, instance: &JobInstance) -> Result<Vec<JobExecution>, BatchError> {
        let store = self.store.borrow();
        let mut executions = Vec::new();
        for record in store
            .job_executions
            .iter()
            .filter(|record| record.execution.instance.id == instance.id)
        {
            executions.push(Self::restore_job_execution(record)?);
        }
        Ok(executions)
    }

    fn create_job_execution(&self, instance: &JobInstance) -> Result<JobExecution, BatchError> {
        let execution = JobExecution::new(instance);
        let context = execution.execution_context.to_json()?;
        self.store.borrow_mut().job_executions.push(JobExecutionRecord {
            execution: execution.clone(),
            context,
        });
        Ok(execution)
    }

    fn update_job_execution(&self, job_execution: &JobExecution) -> Result<(), BatchError> {
        let context = job_execution.execution_context.to_json()?;
        let mut store = self.store.borrow_mut();
        let record = store
            .job_executions
            .iter_mut()
            .find(|record| record.execution.id == job_execution.id)
            .ok_or_else(|| {
                BatchError::JobRepository(format!("unknown job execution {}", job_execution.id))
            })?;
        record.execution = job_execution.clone();
        record.context = context;
        Ok(())
    }

    fn add_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        let context = step_execution.execution_context.to_json()?;
        let mut store = self.store.borrow_mut();
        if !store
            .job_executions
            .iter()
            .any(|record| record.execution.id == step_execution.job_execution_id)
        {
            return Err(BatchError::JobRepository(format!(
                "step execution {} refers to unknown job execution {}",
                step_execution.id, step_execution.job_execution_id
            )));
        }
        store.step_executions.push(StepExecutionRecord {
            execution: step_execution.clone(),
            context,
        });
        Ok(())
    }

    fn update_step_execution(&self, step_execution: &StepExecution) -> Result<(), BatchError> {
        let context = step_execution.execution_context.to_json()?;
        let mut store = self.store.borrow_mut();
        let record = store
            .step_executions
            .iter_mut()
            .find(|record| record.execution.id == step_execution.id)
            .ok_or_else(|| {
                BatchError::JobRepository(format!("unknown step execution {}", step_execution.id))
            })?;
        record.execution = step_execution.clone();
        record.context = context;
        Ok(())
    }

    fn get_last_step_execution(
        &self,
        instance: &JobInstance,
        step_name: &str,
    ) -> Result<Option<StepExecution>, BatchError> {
        let store = self.store.borrow();
        let job_execution_ids = Self::job_execution_ids(&store, instance.id);
        store
            .step_executions
            .iter()
            .rev()
            .find(|record| {
                record.execution.step_name == step_name
                    && job_execution_ids.contains(&record.execution.job_execution_id)
            })
            .map(Self::restore_step_execution)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryJobRepository, JobRepository};
    use crate::{
        BatchError,
        core::{
            execution::{BatchStatus, StepExecution},
            parameters::JobParametersBuilder,
        },
    };

    #[test]
    fn instances_are_looked_up_by_name_and_parameters() {
        let repository = InMemoryJobRepository::new();
        let parameters = JobParametersBuilder::new().add_long("run.id", 1).build();
        let other = JobParametersBuilder::new().add_long("run.id", 2).build();

        let instance = repository.create_job_instance("job", &parameters).unwrap();

        assert_eq!(
            repository.get_job_instance("job", &parameters).unwrap(),
            Some(instance.clone())
        );
        assert_eq!(repository.get_job_instance("job", &other).unwrap(), None);
        assert_eq!(repository.get_job_instance("other", &parameters).unwrap(), None);
        assert!(matches!(
            repository.create_job_instance("job", &parameters),
            Err(BatchError::JobRepository(_))
        ));

        let second = repository.create_job_instance("job", &other).unwrap();
        assert_eq!(repository.get_last_job_instance("job").unwrap(), Some(second));
    }

    #[test]
    fn saved_context_is_a_snapshot() {
        let repository = InMemoryJobRepository::new();
        let instance = repository
            .create_job_instance("job", &JobParametersBuilder::new().build())
            .unwrap();
        let mut execution = repository.create_job_execution(&instance).unwrap();

        execution.execution_context.put_string("jobKey", "saved");
        execution.status = BatchStatus::Started;
        repository.update_job_execution(&execution).unwrap();
        execution.execution_context.put_string("jobKey", "not saved");

        let stored = repository.get_last_job_execution(&instance).unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Started);
        assert_eq!(stored.execution_context.get_string("jobKey"), Some("saved"));
    }

    #[test]
    fn last_step_execution_spans_all_executions_of_the_instance() {
        let repository = InMemoryJobRepository::new();
        let instance = repository
            .create_job_instance("job", &JobParametersBuilder::new().build())
            .unwrap();

        let first = repository.create_job_execution(&instance).unwrap();
        let mut failed = StepExecution::new("load", first.id);
        failed.status = BatchStatus::Failed;
        failed.execution_context.put_long("offset", 30);
        repository.add_step_execution(&failed).unwrap();

        let second = repository.create_job_execution(&instance).unwrap();
        let mut retried = StepExecution::new("load", second.id);
        repository.add_step_execution(&retried).unwrap();
        retried.status = BatchStatus::Completed;
        repository.update_step_execution(&retried).unwrap();

        let last = repository
            .get_last_step_execution(&instance, "load")
            .unwrap()
            .unwrap();
        assert_eq!(last.id, retried.id);
        assert_eq!(last.status, BatchStatus::Completed);
        assert_eq!(repository.get_job_executions(&instance).unwrap().len(), 2);
        assert_eq!(
            repository.get_last_step_execution(&instance, "other").unwrap(),
            None
        );
    }

    #[test]
    fn unknown_executions_are_rejected() {
        let repository = InMemoryJobRepository::new();
        let orphan = StepExecution::new("load", uuid::Uuid::new_v4());

        assert!(matches!(
            repository.add_step_execution(&orphan),
            Err(BatchError::JobRepository(_))
        ));
        assert!(matches!(
            repository.update_step_execution(&orphan),
            Err(BatchError::JobRepository(_))
        ));
    }
}
