use std::time::Instant;

use log::debug;

use crate::BatchError;

use super::step::{Step, StepExecution, StepStatus};

/// A single unit of work that does not follow the read/process/write pattern.
///
/// Implementations update the counters of `step_execution` themselves and may
/// set its status to [`StepStatus::Skipped`] when there is nothing to do.
pub trait Tasklet {
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Step running one [`Tasklet`].
pub struct TaskletStep<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl Step for TaskletStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Started;

        debug!(
            "Start of tasklet step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = self.tasklet.execute(step_execution);

        match result {
            Ok(()) if step_execution.status == StepStatus::Skipped => {}
            Ok(()) => step_execution.status = StepStatus::Success,
            Err(_) => step_execution.status = StepStatus::Failed,
        }

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        result
    }
}

pub struct TaskletBuilder<'a> {
    name: String,
    tasklet: Option<&'a dyn Tasklet>,
}

impl<'a> TaskletBuilder<'a> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tasklet: None,
        }
    }

    pub fn tasklet(mut self, tasklet: &'a dyn Tasklet) -> Self {
        self.tasklet = Some(tasklet);
        self
    }

    pub fn build(self) -> Result<TaskletStep<'a>, BatchError> {
        let tasklet = self.tasklet.ok_or_else(|| {
            BatchError::Configuration(format!("Tasklet is required for step '{}'", self.name))
        })?;

        Ok(TaskletStep {
            name: self.name,
            tasklet,
        })
    }
}
