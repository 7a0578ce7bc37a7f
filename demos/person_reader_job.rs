use std::path::Path;

use serde::Deserialize;

use batch_core::{
    BatchError,
    core::{
        job::JobBuilder,
        launcher::{JobLauncher, SimpleJobLauncher},
        parameters::{JobParameters, RunIdIncrementer},
        repository::InMemoryJobRepository,
        step::StepBuilder,
    },
    item::{csv::csv_reader::CsvItemReaderBuilder, list::ListItemReader, logger::LoggerWriter},
};

#[derive(Deserialize, Debug, Clone)]
#[allow(dead_code)]
struct Person {
    id: u32,
    name: String,
    age: String,
    address: String,
}

fn get_items() -> Vec<Person> {
    (0..10)
        .map(|i| Person {
            id: i + 1,
            name: format!("test name{}", i),
            age: "test age".to_string(),
            address: "test address".to_string(),
        })
        .collect()
}

fn main() -> Result<(), BatchError> {
    env_logger::init();

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/data/persons.csv");

    let list_reader = ListItemReader::new(get_items());
    let csv_reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let writer = LoggerWriter::default();

    let job = JobBuilder::new()
        .name("itemReaderJob".to_string())
        .incrementer(RunIdIncrementer::default())
        .start(
            StepBuilder::new("customItemReaderStep")
                .chunk::<Person>(10)
                .reader(&list_reader)
                .writer(&writer)
                .build()?,
        )
        .next(
            StepBuilder::new("csvFileStep")
                .chunk::<Person>(10)
                .reader(&csv_reader)
                .writer(&writer)
                .build()?,
        )
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = SimpleJobLauncher::new(&repository);

    launcher.run(&job, &JobParameters::new())?.into_result()?;

    Ok(())
}
