use super::{
    build_name,
    parameters::{JobParameters, JobParametersIncrementer},
    step::Step,
};

/// A named, ordered list of steps.
///
/// A job does not run itself: it is handed to a
/// [`JobLauncher`](super::launcher::JobLauncher) together with the parameters of the run.
pub struct Job<'a> {
    /// Human-readable name for the job, part of the identity of its instances
    name: String,
    /// Collection of steps that make up this job, in execution order
    steps: Vec<Step<'a>>,
    /// Derives fresh parameters for every launch, when present
    incrementer: Option<Box<dyn JobParametersIncrementer + 'a>>,
    /// Whether a failed or stopped instance may be executed again
    restartable: bool,
}

impl<'a> Job<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step<'a>] {
        &self.steps
    }

    pub fn is_restartable(&self) -> bool {
        self.restartable
    }

    pub fn has_incrementer(&self) -> bool {
        self.incrementer.is_some()
    }

    /// Parameters for the next run, given those of the last instance of this job.
    ///
    /// Without an incrementer, `supplied` is returned unchanged. With one, the
    /// incremented keys are added and `supplied` wins on any key both define.
    pub fn next_parameters(&self, previous: &JobParameters, supplied: &JobParameters) -> JobParameters {
        match &self.incrementer {
            Some(incrementer) => incrementer.get_next(previous).merge(supplied),
            None => supplied.clone(),
        }
    }
}

/// Builder for creating a [`Job`].
///
/// # Example
///
/// ```
/// use batch_core::core::job::JobBuilder;
/// use batch_core::core::parameters::RunIdIncrementer;
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
///
/// let job = JobBuilder::new()
///     .name("helloJob".to_string())
///     .incrementer(RunIdIncrementer::default())
///     .start(StepBuilder::new("helloStep").tasklet(&hello).build())
///     .build();
///
/// assert_eq!(job.name(), "helloJob");
/// assert_eq!(job.steps().len(), 1);
/// ```
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    /// Collection of steps to be executed, in order
    steps: Vec<Step<'a>>,
    incrementer: Option<Box<dyn JobParametersIncrementer + 'a>>,
    restartable: bool,
}

impl Default for JobBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
            incrementer: None,
            restartable: true,
        }
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Injects fresh parameters on every launch, so each launch creates a new instance.
    pub fn incrementer(mut self, incrementer: impl JobParametersIncrementer + 'a) -> JobBuilder<'a> {
        self.incrementer = Some(Box::new(incrementer));
        self
    }

    /// When `false`, an instance that already has an execution can never run again.
    pub fn restartable(mut self, restartable: bool) -> JobBuilder<'a> {
        self.restartable = restartable;
        self
    }

    /// Sets the first step of the job.
    ///
    /// Identical to `next()`, reads better for the first step.
    pub fn start(mut self, step: Step<'a>) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps are executed in the order they are added.
    pub fn next(mut self, step: Step<'a>) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// If no name has been provided, a random name is generated.
    pub fn build(self) -> Job<'a> {
        Job {
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
            incrementer: self.incrementer,
            restartable: self.restartable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::JobBuilder;
    use crate::{
        BatchError,
        core::{
            parameters::{JobParameters, JobParametersBuilder, RunIdIncrementer},
            step::{StepBuilder, StepContext},
            tasklet::{RepeatStatus, Tasklet},
        },
    };

    struct Noop;

    impl Tasklet for Noop {
        fn execute(&self, _context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError> {
            Ok(RepeatStatus::Finished)
        }
    }

    #[test]
    fn steps_keep_their_declared_order() {
        let noop = Noop;
        let job = JobBuilder::new()
            .name("job".to_string())
            .start(StepBuilder::new("first").tasklet(&noop).build())
            .next(StepBuilder::new("second").tasklet(&noop).build())
            .next(StepBuilder::new("third").tasklet(&noop).build())
            .build();

        let names: Vec<&str> = job.steps().iter().map(|step| step.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(job.is_restartable());
    }

    #[test]
    fn job_without_name_gets_a_random_one() {
        let job = JobBuilder::new().build();
        assert_eq!(job.name().len(), 8);
    }

    #[test]
    fn next_parameters_without_incrementer_are_the_supplied_ones() {
        let job = JobBuilder::new().name("job".to_string()).build();
        let supplied = JobParametersBuilder::new()
            .add_string("input", "a.csv")
            .build();

        let next = job.next_parameters(&JobParameters::new(), &supplied);

        assert_eq!(next, supplied);
    }

    #[test]
    fn next_parameters_with_incrementer_add_a_fresh_run_id() {
        let job = JobBuilder::new()
            .name("job".to_string())
            .incrementer(RunIdIncrementer::default())
            .build();
        let previous = JobParametersBuilder::new().add_long("run.id", 4).build();
        let supplied = JobParametersBuilder::new()
            .add_string("input", "a.csv")
            .build();

        let next = job.next_parameters(&previous, &supplied);

        assert_eq!(next.get_long("run.id"), Some(5));
        assert_eq!(next.get_string("input"), Some("a.csv"));
    }

    #[test]
    fn next_parameters_do_not_inherit_the_previous_run() {
        let job = JobBuilder::new()
            .name("job".to_string())
            .incrementer(RunIdIncrementer::default())
            .build();
        let previous = JobParametersBuilder::new()
            .add_long("run.id", 1)
            .add_long("chunkSize", 5)
            .build();

        let overridden = job.next_parameters(
            &previous,
            &JobParametersBuilder::new().add_long("chunkSize", 20).build(),
        );
        assert_eq!(overridden.get_long("chunkSize"), Some(20));
        assert_eq!(overridden.get_long("run.id"), Some(2));

        let omitted = job.next_parameters(&previous, &JobParameters::new());
        assert!(!omitted.contains_key("chunkSize"));
        assert_eq!(omitted.get_long("run.id"), Some(2));
    }
}
