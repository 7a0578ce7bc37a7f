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

struct HelloTasklet;

impl Tasklet for HelloTasklet {
    fn execute(&self, context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
        info!(
            "hello spring batch, run.id: {}",
            context.job_parameters().get_long_or("run.id", 0)
        );
        Ok(RepeatStatus::Finished)
    }
}

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let tasklet = HelloTasklet;

    let job = JobBuilder::new()
        .name("helloJob".to_string())
        .incrementer(RunIdIncrementer::default())
        .start(StepBuilder::new("helloStep").tasklet(&tasklet).build())
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = SimpleJobLauncher::new(&repository);

    // every launch gets a new run.id, hence a new job instance
    for _ in 0..2 {
        let execution = launcher.run(&job, &JobParameters::new())?.into_result()?;
        info!(
            "job instance {} ended with status {}",
            execution.instance.id, execution.status
        );
    }

    Ok(())
}
