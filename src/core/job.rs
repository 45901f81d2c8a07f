use std::time::{Duration, Instant};

use log::{error, info};
use uuid::Uuid;

use crate::error::ExportError;

use super::{
    build_name,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
type JobResult<T> = Result<T, ExportError>;

/// Represents a job that can be executed.
///
/// A job runs its steps in order, one after the other, and reports the
/// outcome of each.
pub trait Job {
    /// Runs the job and returns the result of the job execution.
    ///
    /// A failing step does not prevent the next ones from running: its
    /// failure is recorded in its `StepExecution`.
    fn run(&self) -> JobResult<JobExecution>;
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
    /// Execution details of each step, in execution order
    pub steps: Vec<StepExecution>,
}

impl JobExecution {
    /// Steps that ended in failure.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepExecution> {
        self.steps.iter().filter(|step| step.status.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failed_steps().next().is_none()
    }
}

/// Represents an instance of a job: one export run over several datasets.
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
    /// Runs the job by executing its steps in sequence.
    ///
    /// Steps are independent: a failure is logged and the next step starts.
    fn run(&self) -> JobResult<JobExecution> {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut executions = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());
            if let Err(err) = step.execute(&mut step_execution) {
                error!(
                    "Step {} ended with status {:?}: {}",
                    step.get_name(),
                    step_execution.status,
                    err
                );
            }
            executions.push(step_execution);
        }

        info!("End of job: {}, id: {}", self.name, self.id);

        Ok(JobExecution {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            steps: executions,
        })
    }
}

/// Builder for creating a job instance.
///
/// # Example
///
/// ```rust,ignore
/// use safemap_export::core::job::JobBuilder;
///
/// let job = JobBuilder::new()
///     .name("safemap-export".to_string())
///     .start(&crash_step)
///     .next(&hotspot_step)
///     .build();
/// ```
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
    /// Identical to `next()`, reads better for the first step.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps are executed in the order they are added.
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
