use log::debug;

use crate::BatchError;

use super::{
    execution::BatchStatus,
    step::{Step, StepBuilder, StepContext, StepKind},
};

/// Tells a tasklet step whether to call its tasklet again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatStatus {
    /// The tasklet has more work: call it again.
    Continuable,
    /// The tasklet is done: the step completes.
    Finished,
}

/// A single unit of work, called repeatedly until it returns [`RepeatStatus::Finished`].
///
/// A tasklet that works in several iterations tracks its own progress (for instance an
/// offset kept in its step context or in the step's `read_count`). The engine does not
/// undo anything between iterations.
pub trait Tasklet {
    fn execute(&self, context: &mut StepContext<'_>) -> Result<RepeatStatus, BatchError>;
}

/// Step that repeats a [`Tasklet`].
pub struct TaskletStep<'a> {
    tasklet: &'a dyn Tasklet,
}

impl TaskletStep<'_> {
    /// Calls the tasklet until it is finished, fails, or a stop is requested.
    ///
    /// Every successful call counts as one commit, a failed one as one rollback.
    pub(crate) fn run(&self, context: &mut StepContext<'_>) -> Result<BatchStatus, BatchError> {
        let mut iteration = 0;

        loop {
            if context.is_stop_requested() {
                debug!("Stop requested before tasklet iteration {}", iteration);
                return Ok(BatchStatus::Stopped);
            }

            let status = match self.tasklet.execute(context) {
                Ok(status) => status,
                Err(error) => {
                    context.step_execution_mut().rollback_count += 1;
                    return Err(error);
                }
            };

            context.step_execution_mut().commit_count += 1;
            iteration += 1;
            debug!("Tasklet iteration {} returned {:?}", iteration, status);

            if status == RepeatStatus::Finished {
                return Ok(BatchStatus::Completed);
            }
        }
    }
}

/// Builder for a tasklet step, obtained from [`StepBuilder::tasklet`].
pub struct TaskletStepBuilder<'a> {
    step: StepBuilder,
    tasklet: &'a dyn Tasklet,
}

impl<'a> TaskletStepBuilder<'a> {
    pub(crate) fn new(step: StepBuilder, tasklet: &'a dyn Tasklet) -> Self {
        Self { step, tasklet }
    }

    pub fn build(self) -> Step<'a> {
        let kind = StepKind::Tasklet(TaskletStep {
            tasklet: self.tasklet,
        });
        self.step.into_step(kind)
    }
}
