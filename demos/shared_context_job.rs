use batch_core::{
    BatchError,
    core::{
        job::JobBuilder,
        launcher::{JobLauncher, SimpleJobLauncher},
        parameters::{JobParameters, RunIdIncrementer},
        repository::InMemoryJobRepository,
        step::{StepBuilder, StepContext},
        tasklet::{RepeatStatus, Tasklet},
    },
};
use log::info;

/// Writes one value in its own step context and one in the job context.
struct ShareTasklet;

impl Tasklet for ShareTasklet {
    fn execute(&self, context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
        context
            .step_execution_context_mut()
            .put_string("stepKey", "step execution context");
        context
            .job_execution_context_mut()
            .put_string("jobKey", "job execution context");

        info!(
            "job name: {}, step name: {}, parameter: {}",
            context.job_name(),
            context.step_name(),
            context.job_parameters().get_long_or("run.id", 0)
        );

        Ok(RepeatStatus::Finished)
    }
}

/// Only the job context is shared, so the step key falls back to its default.
struct ReadSharedTasklet;

impl Tasklet for ReadSharedTasklet {
    fn execute(&self, context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
        info!(
            "job key : {}, step key : {}",
            context
                .job_execution_context()
                .get_string_or("jobKey", "emptyJobKey"),
            context
                .step_execution_context()
                .get_string_or("stepKey", "emptyStepKey")
        );

        Ok(RepeatStatus::Finished)
    }
}

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let share = ShareTasklet;
    let read_shared = ReadSharedTasklet;

    let job = JobBuilder::new()
        .name("shareJob".to_string())
        .incrementer(RunIdIncrementer::default())
        .start(StepBuilder::new("shareStep").tasklet(&share).build())
        .next(StepBuilder::new("shareStep2").tasklet(&read_shared).build())
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = SimpleJobLauncher::new(&repository);

    launcher.run(&job, &JobParameters::new())?.into_result()?;

    Ok(())
}
