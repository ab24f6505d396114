//! Sweep planning and driving.
//!
//! [`SweepPlanner`] walks bit-length steps, then rule-count steps, then
//! memory steps. Each configuration is classified against the memory
//! bounds and the sweep's memoization table before anything is run, so
//! the measurement collaborator sees every distinct configuration at
//! most once.
//!
//! ```text
//! bits ─┬─ data fixture
//!       └─ rules ─┬─ practical? ── no ──> TooSmall rows
//!                 └─ rule fixture ─ memory ─┬─ < min ──> TooSmall
//!                                           ├─ >= max ─> Trivial
//!                                           ├─ cached ─> Duplicate
//!                                           └─ measure -> Feasible
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlannerError, PlannerResult};
use crate::fixture::{Fixture, FixtureSource};
use crate::levels::MemoryLevels;
use crate::measure::{MeasureRequest, Measurer};
use crate::model::{ceil_div, max_bytes, min_bytes};
use crate::sampler::{bounded_mem_levels, massive_levels};
use crate::sink::ResultSink;
use crate::solver::min_tables;
use crate::timing::{Throughput, TimingSummary};
use crate::types::{Configuration, MemoizationKey, MemoryLevel, TooSmallReason, Verdict};

/// One gigabyte, decimal.
pub const GB: u64 = 1_000_000_000;

// ── Settings ────────────────────────────────────────────────────────

/// Tunables shared by every configuration of a sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Ceiling for enumerated memory levels, in bytes.
    pub max_space: u64,
    /// Largest `(bits + 1) * rules` rule fixture worth writing.
    pub practical_limit: u64,
    /// Packets per measurement, in thousands.
    pub data_kilo_packets: u64,
    /// Nominal packet size for the bandwidth column.
    pub packet_size_bytes: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            max_space: 2 * GB,
            practical_limit: 3 * GB / 2,
            data_kilo_packets: 100,
            packet_size_bytes: 1500,
        }
    }
}

impl SweepSettings {
    pub fn with_max_space(mut self, max_space: u64) -> Self {
        self.max_space = max_space;
        self
    }

    pub fn with_practical_limit(mut self, limit: u64) -> Self {
        self.practical_limit = limit;
        self
    }

    pub fn with_data_kilo_packets(mut self, kilo_packets: u64) -> Self {
        self.data_kilo_packets = kilo_packets;
        self
    }

    pub fn with_packet_size_bytes(mut self, bytes: u64) -> Self {
        self.packet_size_bytes = bytes;
        self
    }

    pub fn packets(&self) -> u64 {
        self.data_kilo_packets.saturating_mul(1000)
    }

    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.packets(), self.packet_size_bytes)
    }

    /// Whether a rule fixture for this pair is small enough to write.
    pub fn fixture_is_practical(&self, bits: u64, rules: u64) -> bool {
        bits.saturating_add(1).saturating_mul(rules) <= self.practical_limit
    }
}

// ── Memory steps ────────────────────────────────────────────────────

/// How the memory steps of a `(bits, rules)` pair are chosen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum MemSteps {
    /// The same fixed budgets for every pair.
    Explicit(Vec<u64>),
    /// Every enumerated level.
    All,
    /// At most this many evenly spaced levels.
    Bounded(usize),
    /// About half this many coarse levels plus half as many tail levels.
    Massive(usize),
    /// Levels whose table count is in the set.
    Tables(Vec<u64>),
}

impl MemSteps {
    /// Memory budgets to try for one pair.
    pub fn resolve(&self, bits: u64, rules: u64, max_space: u64) -> Vec<u64> {
        match self {
            MemSteps::Explicit(steps) => steps.clone(),
            _ => self
                .select_levels(MemoryLevels::new(bits, rules, max_space))
                .unwrap_or_default()
                .into_iter()
                .map(|level| level.bytes)
                .collect(),
        }
    }

    /// The enumerated levels this policy picks, or `None` for a fixed
    /// list of budgets.
    pub fn select_levels(&self, levels: MemoryLevels) -> Option<Vec<MemoryLevel>> {
        let picked = match self {
            MemSteps::Explicit(_) => return None,
            MemSteps::All => levels.iter().collect(),
            MemSteps::Bounded(num) => bounded_mem_levels(levels, *num),
            MemSteps::Massive(total) => {
                let highres = ceil_div(*total as u64, 2) as usize;
                let lowres = total / 2;
                massive_levels(levels, lowres, highres)
            }
            MemSteps::Tables(tables) => levels
                .iter()
                .filter(|level| tables.contains(&level.table_count))
                .collect(),
        };
        Some(picked)
    }

    pub fn is_enumerated(&self) -> bool {
        !matches!(self, MemSteps::Explicit(_))
    }
}

// ── Plan ────────────────────────────────────────────────────────────

/// The cross product a sweep walks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub bit_steps: Vec<u64>,
    pub rule_steps: Vec<u64>,
    pub mem_steps: MemSteps,
}

impl SweepPlan {
    pub fn new(bit_steps: Vec<u64>, rule_steps: Vec<u64>, mem_steps: MemSteps) -> Self {
        Self {
            bit_steps,
            rule_steps,
            mem_steps,
        }
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.bit_steps.is_empty() {
            return Err(PlannerError::InvalidConfiguration("no bit steps".into()));
        }
        if self.rule_steps.is_empty() {
            return Err(PlannerError::InvalidConfiguration("no rule steps".into()));
        }
        if self.bit_steps.contains(&0) {
            return Err(PlannerError::InvalidConfiguration(
                "bit steps must be at least 1".into(),
            ));
        }
        if self.rule_steps.contains(&0) {
            return Err(PlannerError::InvalidConfiguration(
                "rule steps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Memoization table of one sweep invocation.
///
/// Created empty when a sweep starts, only grows while it runs, and is
/// dropped when it ends.
#[derive(Debug, Default)]
pub struct SweepState {
    memo: HashMap<MemoizationKey, TimingSummary>,
}

impl SweepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &MemoizationKey) -> Option<&TimingSummary> {
        self.memo.get(key)
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    fn remember(&mut self, key: MemoizationKey, summary: TimingSummary) {
        self.memo.insert(key, summary);
    }
}

// ── Classification ──────────────────────────────────────────────────

/// What the planner will do with a configuration, decided before any
/// measurement.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    TooSmall(TooSmallReason),
    Trivial,
    /// Same key already measured in this sweep.
    Cached {
        level: MemoryLevel,
        summary: TimingSummary,
    },
    /// Needs a measurement.
    Measure {
        level: MemoryLevel,
        key: MemoizationKey,
    },
}

/// Classify a configuration against the memory bounds and `state`.
pub fn classify(configuration: &Configuration, state: &SweepState) -> Classification {
    let Configuration {
        bits,
        rules,
        memory_budget,
    } = *configuration;

    if memory_budget < min_bytes(rules, bits) {
        return Classification::TooSmall(TooSmallReason::BelowMinimum);
    }
    if memory_budget >= max_bytes(rules, bits) {
        return Classification::Trivial;
    }

    let level = min_tables(memory_budget, rules, bits);
    let key = MemoizationKey::new(level, bits, rules);
    match state.get(&key) {
        Some(summary) => Classification::Cached {
            level,
            summary: summary.clone(),
        },
        None => Classification::Measure { level, key },
    }
}

// ── Report ──────────────────────────────────────────────────────────

/// Tally of one sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepReport {
    pub rows: usize,
    pub measured: usize,
    pub cached: usize,
    pub too_small: usize,
    pub trivial: usize,
    /// Bit-lengths abandoned because timings fell below resolution.
    pub abandoned_bits: Vec<u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SweepReport {
    fn start() -> Self {
        Self {
            rows: 0,
            measured: 0,
            cached: 0,
            too_small: 0,
            trivial: 0,
            abandoned_bits: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn tally(&mut self, verdict: &Verdict) {
        self.rows += 1;
        match verdict {
            Verdict::TooSmall(_) => self.too_small += 1,
            Verdict::Trivial => self.trivial += 1,
            Verdict::Feasible { .. } => self.measured += 1,
            Verdict::Duplicate { .. } => self.cached += 1,
        }
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows: {} measured, {} cached, {} too small, {} trivial",
            self.rows, self.measured, self.cached, self.too_small, self.trivial
        )?;
        if !self.abandoned_bits.is_empty() {
            write!(f, "; abandoned bit-lengths {:?}", self.abandoned_bits)?;
        }
        Ok(())
    }
}

// ── Planner ─────────────────────────────────────────────────────────

/// Drives a sweep through its fixture, measurement and result
/// collaborators.
pub struct SweepPlanner<F, M, S> {
    settings: SweepSettings,
    fixtures: F,
    measurer: M,
    sink: S,
}

impl<F, M, S> SweepPlanner<F, M, S>
where
    F: FixtureSource,
    M: Measurer,
    S: ResultSink,
{
    pub fn new(settings: SweepSettings, fixtures: F, measurer: M, sink: S) -> Self {
        Self {
            settings,
            fixtures,
            measurer,
            sink,
        }
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    pub fn fixtures(&self) -> &F {
        &self.fixtures
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (F, M, S) {
        (self.fixtures, self.measurer, self.sink)
    }

    /// Run a full sweep with a fresh memoization table.
    ///
    /// A bit-length whose timings fall below resolution is abandoned and
    /// the sweep moves on to the next one; any other error ends the
    /// sweep. Fixtures are released on every path.
    pub fn run(&mut self, plan: &SweepPlan) -> PlannerResult<SweepReport> {
        plan.validate()?;

        let mut state = SweepState::new();
        let mut report = SweepReport::start();
        info!(
            bit_steps = plan.bit_steps.len(),
            rule_steps = plan.rule_steps.len(),
            enumerated = plan.mem_steps.is_enumerated(),
            measurer = self.measurer.name(),
            "Starting sweep"
        );

        for &bits in &plan.bit_steps {
            match self.sweep_bits(&mut state, &mut report, plan, bits) {
                Ok(()) => {}
                Err(e) if e.is_bit_length_fatal() => {
                    warn!(bits, error = %e, "Abandoning bit-length");
                    report.abandoned_bits.push(bits);
                }
                Err(e) => return Err(e),
            }
        }

        self.sink.flush()?;
        report.finished_at = Some(Utc::now());
        info!(%report, memoized = state.len(), "Sweep finished");
        Ok(report)
    }

    fn sweep_bits(
        &mut self,
        state: &mut SweepState,
        report: &mut SweepReport,
        plan: &SweepPlan,
        bits: u64,
    ) -> PlannerResult<()> {
        let data = self.fixtures.data_fixture(bits, self.settings.packets())?;
        info!(bits, data = %data.path().display(), "Built test input");

        for &rules in &plan.rule_steps {
            let mem_steps = plan.mem_steps.resolve(bits, rules, self.settings.max_space);

            if !self.settings.fixture_is_practical(bits, rules) {
                warn!(bits, rules, "Rule file would be too large to be practical");
                for &memory in &mem_steps {
                    let verdict = Verdict::TooSmall(TooSmallReason::FixtureTooLarge);
                    self.record(report, &Configuration::new(bits, rules, memory), verdict)?;
                }
                continue;
            }

            let rule_fixture = self.fixtures.rule_fixture(bits, rules)?;
            info!(
                bits,
                rules,
                steps = mem_steps.len(),
                rules_file = %rule_fixture.path().display(),
                "Working with rule file"
            );

            for &memory in &mem_steps {
                let configuration = Configuration::new(bits, rules, memory);
                let verdict = self.evaluate(state, &configuration, &rule_fixture, &data)?;
                self.record(report, &configuration, verdict)?;
            }
        }

        Ok(())
    }

    fn evaluate(
        &mut self,
        state: &mut SweepState,
        configuration: &Configuration,
        rule_fixture: &Fixture,
        data: &Fixture,
    ) -> PlannerResult<Verdict> {
        let memory = configuration.memory_budget;
        match classify(configuration, state) {
            Classification::TooSmall(reason) => {
                debug!(memory, %reason, "Skipping");
                Ok(Verdict::TooSmall(reason))
            }
            Classification::Trivial => {
                debug!(memory, "Needs only one table");
                Ok(Verdict::Trivial)
            }
            Classification::Cached { level, summary } => {
                info!(
                    memory,
                    tables = level.table_count,
                    bytes = level.bytes,
                    "Run already completed, using cached values"
                );
                // timings come from the cache, the command line is this row's
                let request = MeasureRequest {
                    configuration: *configuration,
                    level,
                    rule_fixture: rule_fixture.path(),
                    data_fixture: data.path(),
                };
                let summary = TimingSummary {
                    command: self.measurer.command_line(&request),
                    ..summary
                };
                Ok(Verdict::Duplicate { level, summary })
            }
            Classification::Measure { level, key } => {
                let request = MeasureRequest {
                    configuration: *configuration,
                    level,
                    rule_fixture: rule_fixture.path(),
                    data_fixture: data.path(),
                };
                let command = self.measurer.command_line(&request);
                info!(
                    memory,
                    tables = level.table_count,
                    bytes = level.bytes,
                    %command,
                    "Benchmarking"
                );

                let timings = self.measurer.measure(&request)?;
                debug!(?timings, "Timings");

                let summary = TimingSummary::derive(
                    &timings,
                    configuration.bits,
                    self.settings.throughput(),
                    command,
                )?;
                state.remember(key, summary.clone());
                Ok(Verdict::Feasible { level, summary })
            }
        }
    }

    fn record(
        &mut self,
        report: &mut SweepReport,
        configuration: &Configuration,
        verdict: Verdict,
    ) -> PlannerResult<()> {
        self.sink.record_row(configuration, &verdict)?;
        report.tally(&verdict);
        Ok(())
    }
}
