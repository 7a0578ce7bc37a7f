use std::env;

use batch_core::{
    BatchError,
    core::{
        item::{ItemProcessor, ItemProcessorResult},
        job::JobBuilder,
        launcher::{JobLauncher, SimpleJobLauncher},
        parameters::{JobParametersBuilder, RunIdIncrementer},
        repository::InMemoryJobRepository,
        step::{StepBuilder, StepContext},
        tasklet::{RepeatStatus, Tasklet},
    },
    item::{list::ListItemReader, logger::LoggerWriter},
};
use log::info;

fn get_items() -> Vec<String> {
    (0..100).map(|i| format!("{} Hello", i)).collect()
}

struct SuffixProcessor;

impl ItemProcessor<String, String> for SuffixProcessor {
    fn process(&self, item: &String) -> ItemProcessorResult<String> {
        Ok(Some(format!("{}, Spring Batch", item)))
    }
}

/// The chunk step below, written by hand: the read count of the step is the offset
/// of the next page.
struct PagingTasklet {
    items: Vec<String>,
}

impl Tasklet for PagingTasklet {
    fn execute(&self, context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
        let chunk_size = context.job_parameters().get_string_or("chunkSize", "10");
        let chunk_size: usize = chunk_size
            .trim()
            .parse()
            .map_err(|_| BatchError::Configuration(format!("invalid chunkSize {}", chunk_size)))?;

        let from_index = context.step_execution().read_count;
        if from_index >= self.items.len() {
            return Ok(RepeatStatus::Finished);
        }

        let to_index = (from_index + chunk_size).min(self.items.len());
        info!("task item size: {}", self.items[from_index..to_index].len());
        context.step_execution_mut().read_count = to_index;

        Ok(RepeatStatus::Continuable)
    }
}

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let chunk_size = env::args().nth(1).unwrap_or_else(|| "10".to_string());

    let tasklet = PagingTasklet { items: get_items() };
    let reader = ListItemReader::new(get_items());
    let processor = SuffixProcessor;
    let writer = LoggerWriter::default();

    let job = JobBuilder::new()
        .name("chunkProcessingJob".to_string())
        .incrementer(RunIdIncrementer::default())
        .start(StepBuilder::new("taskBaseStep").tasklet(&tasklet).build())
        .next(
            StepBuilder::new("chunkBaseStep")
                .chunk_from_parameter::<String>("chunkSize", 10)
                .reader(&reader)
                .processor(&processor)
                .writer(&writer)
                .build()?,
        )
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = SimpleJobLauncher::new(&repository);
    let parameters = JobParametersBuilder::new()
        .add_string("chunkSize", &chunk_size)
        .build();

    let execution = launcher.run(&job, &parameters)?.into_result()?;

    for step_execution in &execution.step_executions {
        info!(
            "{}: read={}, write={}, commit={}",
            step_execution.step_name,
            step_execution.read_count,
            step_execution.write_count,
            step_execution.commit_count
        );
    }

    Ok(())
}
