//! The measurement collaborator seam.

use std::path::Path;

use crate::error::PlannerResult;
use crate::timing::TimingRecord;
use crate::types::{Configuration, MemoryLevel};

/// Output target handed to the classifier; results are discarded.
pub const NULL_DEVICE: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// Everything a measurer needs for one timed classifier run.
#[derive(Clone, Copy, Debug)]
pub struct MeasureRequest<'a> {
    pub configuration: Configuration,
    /// Table count and memory the planner expects the classifier to use.
    pub level: MemoryLevel,
    pub rule_fixture: &'a Path,
    pub data_fixture: &'a Path,
}

/// Runs the classifier once and reports its timings.
///
/// Implementations block until the run finishes. A run that produced
/// no complete timing record is a
/// [`PlannerError::ExternalCollaborator`](crate::PlannerError::ExternalCollaborator).
pub trait Measurer {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> PlannerResult<TimingRecord>;

    /// Human-readable command line for `request`, recorded with results.
    fn command_line(&self, request: &MeasureRequest<'_>) -> String;

    /// Name of this measurer.
    fn name(&self) -> &str;
}

impl<M: Measurer + ?Sized> Measurer for Box<M> {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> PlannerResult<TimingRecord> {
        (**self).measure(request)
    }

    fn command_line(&self, request: &MeasureRequest<'_>) -> String {
        (**self).command_line(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// `<program> <memory allowed> <rule file> <data file> <null device>`.
pub fn classifier_command_line(program: &str, request: &MeasureRequest<'_>) -> String {
    format!(
        "{} {} {} {} {}",
        program,
        request.configuration.memory_budget,
        request.rule_fixture.display(),
        request.data_fixture.display(),
        NULL_DEVICE
    )
}

/// Dry-run measurer: never runs anything, always reports the same
/// fake timings.
#[derive(Debug, Clone)]
pub struct SimulatedMeasurer {
    program: String,
    timings: TimingRecord,
    pub calls: usize,
}

impl SimulatedMeasurer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timings: TimingRecord {
                read_micros: 123_456,
                build_micros: 123_456,
                cpu_process_micros: 123_456,
                real_process_micros: 123_456,
                total_micros: 456_789,
            },
            calls: 0,
        }
    }

    /// Report `timings` instead of the default fake ones.
    pub fn with_timings(mut self, timings: TimingRecord) -> Self {
        self.timings = timings;
        self
    }
}

impl Default for SimulatedMeasurer {
    fn default() -> Self {
        Self::new("./grouper")
    }
}

impl Measurer for SimulatedMeasurer {
    fn measure(&mut self, _request: &MeasureRequest<'_>) -> PlannerResult<TimingRecord> {
        self.calls += 1;
        Ok(self.timings)
    }

    fn command_line(&self, request: &MeasureRequest<'_>) -> String {
        classifier_command_line(&self.program, request)
    }

    fn name(&self) -> &str {
        "simulated-measurer"
    }
}
