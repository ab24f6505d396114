//! Plan selection and single-round execution for `bigtest run`.

use std::path::Path;
use std::time::Duration;

use grouper_planner::{
    classify, max_bytes, min_bytes, Classification, Configuration, MemSteps, MemoryLevel,
    MemoryLevels, Measurer, SimulatedMeasurer, SweepPlan, SweepPlanner, SweepReport,
    SweepState,
};
use serde::Serialize;
use tracing::info;

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::fixtures::RandomFixtureSource;
use crate::measure::SubprocessMeasurer;
use crate::sink::CsvSink;

/// Rule counts swept when none are given in all-tests mode.
pub const DEFAULT_RULE_STEPS: [u64; 4] = [1_000, 10_000, 100_000, 1_000_000];

/// Command-line choices that shape the sweep plan.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub all_tests: bool,
    pub bits: Option<u64>,
    pub rule_steps: Option<Vec<u64>>,
    pub max_mem_steps: Option<usize>,
    pub massive: Option<usize>,
}

impl RunOptions {
    fn enumerates(&self) -> bool {
        self.all_tests || self.massive.is_some()
    }

    /// Memory-step policy for all-tests mode; massive wins over bounded.
    pub fn mem_steps(&self) -> MemSteps {
        match (self.massive, self.max_mem_steps) {
            (Some(total), _) => MemSteps::Massive(total),
            (None, Some(num)) => MemSteps::Bounded(num),
            (None, None) => MemSteps::All,
        }
    }
}

/// The plan to run and the default result-file prefix.
pub fn build_plan(config: &BenchConfig, options: &RunOptions) -> BenchResult<(SweepPlan, String)> {
    if options.enumerates() {
        let bits = options.bits.ok_or_else(|| {
            BenchError::Config("all-tests and massive modes need --bits".into())
        })?;
        let rule_steps = options
            .rule_steps
            .clone()
            .unwrap_or_else(|| DEFAULT_RULE_STEPS.to_vec());
        let plan = SweepPlan::new(vec![bits], rule_steps, options.mem_steps());
        plan.validate()?;
        return Ok((plan, format!("alltest{}bits", bits)));
    }

    let mut plan = config.step_plan()?;
    if let Some(rule_steps) = &options.rule_steps {
        plan.rule_steps = rule_steps.clone();
        plan.validate()?;
    }
    Ok((plan, "steptest".to_string()))
}

/// Run one round of `plan`, writing rows to a CSV file at `output`.
///
/// With `dry_run` the classifier is never started and every measured
/// configuration gets the same fake timings.
pub fn run_round(
    config: &BenchConfig,
    plan: &SweepPlan,
    output: &Path,
    dry_run: bool,
    seed: Option<u64>,
) -> BenchResult<SweepReport> {
    let sink = CsvSink::create(output)?;
    let fixtures = match seed {
        Some(seed) => RandomFixtureSource::seeded(&config.work_dir, seed),
        None => RandomFixtureSource::new(&config.work_dir),
    };
    let measurer: Box<dyn Measurer> = if dry_run {
        Box::new(SimulatedMeasurer::new(config.program.clone()))
    } else {
        let measurer = SubprocessMeasurer::new(config.program.clone());
        match config.measure_timeout_secs {
            0 => Box::new(measurer),
            secs => Box::new(measurer.with_timeout(Duration::from_secs(secs))),
        }
    };

    info!(output = %output.display(), dry_run, "Writing results");
    let mut planner = SweepPlanner::new(config.sweep_settings(), fixtures, measurer, sink);
    Ok(planner.run(plan)?)
}

/// Policy for `bigtest levels`: a table filter wins, then the sweep's
/// own massive/bounded/all choice.
pub fn level_policy(
    max_steps: Option<usize>,
    massive: Option<usize>,
    tables: Option<&[u64]>,
) -> MemSteps {
    match tables {
        Some(tables) => MemSteps::Tables(tables.to_vec()),
        None => RunOptions {
            max_mem_steps: max_steps,
            massive,
            ..Default::default()
        }
        .mem_steps(),
    }
}

/// Levels listed by `bigtest levels`, sampled like the sweep would.
pub fn listed_levels(
    levels: MemoryLevels,
    max_steps: Option<usize>,
    massive: Option<usize>,
    tables: Option<&[u64]>,
) -> Vec<MemoryLevel> {
    level_policy(max_steps, massive, tables)
        .select_levels(levels)
        .unwrap_or_default()
}

/// Answer printed by `bigtest solve`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub configuration: Configuration,
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub verdict: &'static str,
    pub level: Option<MemoryLevel>,
}

pub fn solve(configuration: Configuration) -> Solution {
    let Configuration {
        bits,
        rules,
        memory_budget: _,
    } = configuration;
    let (verdict, level) = match classify(&configuration, &SweepState::new()) {
        Classification::TooSmall(_) => ("too small", None),
        Classification::Trivial => ("trivial", None),
        Classification::Measure { level, .. } | Classification::Cached { level, .. } => {
            ("feasible", Some(level))
        }
    };
    Solution {
        configuration,
        min_bytes: min_bytes(rules, bits),
        max_bytes: max_bytes(rules, bits),
        verdict,
        level,
    }
}
