#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # batch-core

 A job and step execution engine for batch processing: jobs made of ordered steps,
 chunk-oriented and tasklet steps, execution contexts shared between steps, job
 parameters, and a launcher that records every run in a job repository.

 ## Core Concepts

- **Job:** An ordered list of `Step`s, launched with a set of `JobParameters`.
- **Step:** One phase of a job. A step is either a tasklet step or a chunk-oriented step.
- **Tasklet:** A single unit of work called repeatedly until it reports `RepeatStatus::Finished`.
- **ItemReader / ItemProcessor / ItemWriter:** The three stages of a chunk-oriented step.
  Items are read one at a time, processed one at a time, and written one chunk at a time.
- **ExecutionContext:** A key/value store attached to a job execution or to a step execution.
  The job-scoped context is how steps of a run share data.
- **JobRepository:** Keeps job instances, job executions and step executions, so that
  duplicate launches are rejected and failed or stopped instances can be restarted.
- **JobLauncher:** Resolves parameters, picks the instance and runs the steps.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| csv           | Enables a CSV `ItemReader`                                    |
| logger        | Enables a logger `ItemWriter`, useful for debugging purposes  |
| full          | Enables all available features                                |

 ## Getting Started

```rust
# use batch_core::{
#     core::{
#         execution::BatchStatus,
#         item::{ItemProcessor, ItemProcessorResult, ItemWriter, ItemWriterResult},
#         job::JobBuilder,
#         launcher::{JobLauncher, SimpleJobLauncher},
#         parameters::{JobParametersBuilder, RunIdIncrementer},
#         repository::InMemoryJobRepository,
#         step::StepBuilder,
#     },
#     error::BatchError,
#     item::list::ListItemReader,
# };
# use std::cell::RefCell;
#[derive(Default)]
struct UpperCaseProcessor {}

impl ItemProcessor<String, String> for UpperCaseProcessor {
    fn process(&self, item: &String) -> ItemProcessorResult<String> {
        Ok(Some(item.to_uppercase()))
    }
}

#[derive(Default)]
struct CollectingWriter {
    items: RefCell<Vec<String>>,
}

impl ItemWriter<String> for CollectingWriter {
    fn write(&self, items: &[String]) -> ItemWriterResult {
        self.items.borrow_mut().extend_from_slice(items);
        Ok(())
    }
}

fn main() -> Result<(), BatchError> {
    let reader = ListItemReader::new(vec![
        "porsche".to_string(),
        "peugeot".to_string(),
        "mazda".to_string(),
    ]);
    let processor = UpperCaseProcessor::default();
    let writer = CollectingWriter::default();

    let step = StepBuilder::new("upperCaseStep")
        .chunk::<String>(2)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()?;

    let job = JobBuilder::new()
        .name("carsJob".to_string())
        .incrementer(RunIdIncrementer::default())
        .start(step)
        .build();

    let repository = InMemoryJobRepository::new();
    let launcher = SimpleJobLauncher::new(&repository);

    let execution = launcher
        .run(&job, &JobParametersBuilder::new().build())?
        .into_result()?;

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(writer.items.borrow().as_slice(), ["PORSCHE", "PEUGEOT", "MAZDA"]);

    Ok(())
}
```

 ## Demos
+ `hello_job`: a single tasklet step launched twice with a run id incrementer
+ `shared_context_job`: two tasklet steps sharing a value through the job execution context
+ `chunk_processing_job`: the same paging job written as a chunk step and as a tasklet
+ `person_reader_job`: persons read from a CSV file and logged chunk by chunk

 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of item readers and writers (for example: csv reader, logger writer)
pub mod item;
