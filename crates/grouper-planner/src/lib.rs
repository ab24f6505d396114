//! # grouper-planner
//!
//! Experiment planning for multi-table packet classifiers. A classifier
//! with a fixed pattern width and rule count can split the pattern over
//! any number of lookup tables, trading memory for lookup speed; this
//! crate works out which memory budgets are worth benchmarking and
//! drives the sweep that benchmarks them.
//!
//! ## Components
//!
//! - **model**: closed-form memory per table count, plus the minimum
//!   (most tables) and maximum (one table) sizes
//! - **levels**: restartable enumeration of `(tables, bytes)` levels
//!   under a memory ceiling
//! - **solver**: minimum table count for a budget (binary search)
//! - **sampler**: bounded even-spacing and dual-resolution sampling
//! - **sweep**: classification, memoization and collaborator calls
//!
//! ## Collaborators
//!
//! The planner never runs the classifier or writes files itself.
//! It calls a [`FixtureSource`] for rule and packet files, a
//! [`Measurer`] for timed runs and a [`ResultSink`] for result rows.
//! Simulated implementations of each are included for dry runs and
//! tests.

#![deny(unsafe_code)]

pub mod error;
pub mod fixture;
pub mod levels;
pub mod measure;
pub mod model;
pub mod sampler;
pub mod sink;
pub mod solver;
pub mod sweep;
pub mod timing;
pub mod types;

// ── Re-exports ──────────────────────────────────────────────────────

pub use error::{PlannerError, PlannerResult};
pub use fixture::{Fixture, FixtureSource, SimulatedFixtureSource};
pub use levels::{MemoryLevelIter, MemoryLevels};
pub use measure::{classifier_command_line, MeasureRequest, Measurer, SimulatedMeasurer};
pub use model::{max_bytes, max_tables, min_bytes, table_memory};
pub use sampler::{bounded_mem_levels, massive_levels};
pub use sink::{MemorySink, ResultRow, ResultSink, RESULT_COLUMNS};
pub use solver::min_tables;
pub use sweep::{
    classify, Classification, MemSteps, SweepPlan, SweepPlanner, SweepReport, SweepSettings,
    SweepState, GB,
};
pub use timing::{RawTimingRecord, Throughput, TimingRecord, TimingSummary};
pub use types::{Configuration, MemoizationKey, MemoryLevel, TooSmallReason, Verdict};
