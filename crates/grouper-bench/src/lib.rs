//! # grouper-bench
//!
//! Concrete collaborators for the sweep planner and the pieces of the
//! `bigtest` driver that are worth testing without a terminal:
//!
//! - [`RandomFixtureSource`] writes random rule and packet files
//! - [`SubprocessMeasurer`] runs the classifier and parses its timings
//! - [`CsvSink`] writes result rows
//! - [`BenchConfig`] layers defaults, a step file and `GROUPER_*`
//!   environment variables

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod fixtures;
pub mod measure;
pub mod output;
pub mod runner;
pub mod sink;

pub use config::BenchConfig;
pub use error::{BenchError, BenchResult};
pub use fixtures::{data_file_size, RandomFixtureSource};
pub use measure::{parse_timing_line, parse_timing_output, SubprocessMeasurer};
pub use runner::{build_plan, level_policy, listed_levels, run_round, solve, RunOptions, Solution};
pub use sink::{round_file_name, CsvSink};
