use std::time::{Duration, Instant};

use log::{error, info};
use uuid::Uuid;

use super::{
    build_name,
    step::{Step, StepExecution, StepStatus},
};

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps executed strictly in order.
/// Each step is awaited, including its own error handling, before the next
/// one starts.
///
/// # Example Usage
///
/// ```rust,no_run,compile_fail
/// use bulk_loader::core::job::{Job, JobBuilder};
///
/// let job = JobBuilder::new()
///     .name("seed-catalogs".to_string())
///     .start(&ports_step)
///     .next(&airports_step)
///     .build();
///
/// let execution = job.run();
/// ```
pub trait Job {
    /// Runs every step and returns the execution report.
    ///
    /// A failing step never stops the job: its error is logged and recorded
    /// in its [`StepExecution`], then the next step runs.
    fn run(&self) -> JobExecution;
}

/// Represents the execution of a job.
#[derive(Debug)]
pub struct JobExecution {
    /// The time when the job started executing
    pub start: Instant,
    /// The time when the job finished executing
    pub end: Instant,
    /// The total duration of the job execution
    pub duration: Duration,
    /// One entry per step, in execution order
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    /// Steps that ended in a failed state.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepExecution> {
        self.step_executions
            .iter()
            .filter(|execution| execution.status.is_failure())
    }

    pub fn skipped_steps(&self) -> impl Iterator<Item = &StepExecution> {
        self.step_executions
            .iter()
            .filter(|execution| execution.status == StepStatus::Skipped)
    }

    /// Total number of items written across all steps.
    pub fn write_count(&self) -> usize {
        self.step_executions
            .iter()
            .map(|execution| execution.write_count)
            .sum()
    }
}

/// Represents an instance of a job.
pub struct JobInstance<'a> {
    /// Unique identifier for this job instance
    id: Uuid,
    /// Human-readable name for the job
    name: String,
    /// Collection of steps that make up this job, in execution order
    steps: Vec<&'a dyn Step>,
}

impl JobInstance<'_> {
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobExecution {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut step_executions = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());

            if let Err(error) = step.execute(&mut step_execution) {
                error!("ERROR in '{}': {}", step.get_name(), error);
            }

            step_executions.push(step_execution);
        }

        info!("End of job: {}, id: {}", self.name, self.id);

        JobExecution {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            step_executions,
        }
    }
}

/// Builder for creating a job instance.
///
/// If no name has been provided, a random name is generated.
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    /// Collection of steps to be executed, in order
    steps: Vec<&'a dyn Step>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
        }
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Sets the first step of the job.
    ///
    /// Semantically identical to `next()`, reads better for the initial step.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps run in the order they are added.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> JobInstance<'a> {
        JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crate::{
        BatchError,
        core::step::{Step, StepExecution, StepStatus},
    };

    use super::{Job, JobBuilder};

    struct FakeStep<'a> {
        name: &'static str,
        fail: bool,
        journal: &'a RefCell<Vec<&'static str>>,
    }

    impl Step for FakeStep<'_> {
        fn get_name(&self) -> &str {
            self.name
        }

        fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
            self.journal.borrow_mut().push(self.name);
            if self.fail {
                step_execution.status = StepStatus::WriteError;
                return Err(BatchError::ItemWriter("unavailable".to_string()));
            }
            step_execution.status = StepStatus::Success;
            step_execution.write_count = 3;
            Ok(())
        }
    }

    #[test]
    fn failing_step_should_not_stop_following_steps() {
        let journal = RefCell::new(Vec::new());
        let first = FakeStep {
            name: "first",
            fail: true,
            journal: &journal,
        };
        let second = FakeStep {
            name: "second",
            fail: false,
            journal: &journal,
        };

        let job = JobBuilder::new()
            .name("test".to_string())
            .start(&first)
            .next(&second)
            .build();
        let execution = job.run();

        assert_eq!(*journal.borrow(), vec!["first", "second"]);
        assert_eq!(execution.step_executions.len(), 2);
        assert_eq!(execution.failed_steps().count(), 1);
        assert_eq!(execution.write_count(), 3);
        assert!(execution.start <= execution.end);
    }

    #[test]
    fn unnamed_job_should_get_a_generated_name() {
        let job = JobBuilder::new().build();
        assert_eq!(job.get_name().len(), 8);
        assert!(job.run().step_executions.is_empty());
    }
}
