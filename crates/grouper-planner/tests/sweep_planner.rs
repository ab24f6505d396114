//! End-to-end sweeps against recording collaborators.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use grouper_planner::*;
use tempfile::TempDir;

/// Writes real fixture files into a scratch directory.
struct ScratchFixtures {
    dir: PathBuf,
    created: Vec<PathBuf>,
    rule_requests: Vec<(u64, u64)>,
}

impl ScratchFixtures {
    fn new(dir: &TempDir) -> Self {
        Self {
            dir: dir.path().to_path_buf(),
            created: Vec::new(),
            rule_requests: Vec::new(),
        }
    }

    fn write(&mut self, name: String) -> PlannerResult<Fixture> {
        let path = self.dir.join(name);
        std::fs::write(&path, b"fixture").map_err(|e| PlannerError::Fixture(e.to_string()))?;
        self.created.push(path.clone());
        Ok(Fixture::owned(path))
    }

    fn leftovers(&self) -> Vec<&PathBuf> {
        self.created.iter().filter(|p| p.exists()).collect()
    }
}

impl FixtureSource for ScratchFixtures {
    fn rule_fixture(&mut self, bits: u64, rules: u64) -> PlannerResult<Fixture> {
        self.rule_requests.push((bits, rules));
        self.write(format!("{}bx{}rules.pol", bits, rules))
    }

    fn data_fixture(&mut self, bits: u64, packets: u64) -> PlannerResult<Fixture> {
        self.write(format!("{}b-{}packets.bin", bits, packets))
    }
}

/// Scripted measurer: zero CPU time for some widths, failure for some
/// budgets, fixed timings otherwise.
#[derive(Default)]
struct ScriptedMeasurer {
    calls: Vec<Configuration>,
    unmeasurable_bits: Vec<u64>,
    failing_budget: Option<u64>,
    fixtures_seen: Rc<Cell<usize>>,
}

impl Measurer for ScriptedMeasurer {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> PlannerResult<TimingRecord> {
        self.calls.push(request.configuration);
        if request.rule_fixture.exists() && request.data_fixture.exists() {
            self.fixtures_seen.set(self.fixtures_seen.get() + 1);
        }
        if Some(request.configuration.memory_budget) == self.failing_budget {
            return Err(PlannerError::ExternalCollaborator(
                "no timing record in classifier output".into(),
            ));
        }
        let cpu = if self.unmeasurable_bits.contains(&request.configuration.bits) {
            0
        } else {
            request.level.table_count * 1_000
        };
        Ok(TimingRecord {
            read_micros: 10,
            build_micros: 20,
            cpu_process_micros: cpu,
            real_process_micros: cpu + 5,
            total_micros: cpu + 40,
        })
    }

    fn command_line(&self, request: &MeasureRequest<'_>) -> String {
        classifier_command_line("./grouper", request)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn planner(
    dir: &TempDir,
    measurer: ScriptedMeasurer,
) -> SweepPlanner<ScratchFixtures, ScriptedMeasurer, MemorySink> {
    SweepPlanner::new(
        SweepSettings::default(),
        ScratchFixtures::new(dir),
        measurer,
        MemorySink::new(),
    )
}

#[test]
fn identical_keys_are_measured_once_and_share_timings() {
    let dir = TempDir::new().unwrap();
    let mut planner = planner(&dir, ScriptedMeasurer::default());
    // 10_000 and 10_001 both resolve to 20 tables using 10_000 bytes
    let plan = SweepPlan::new(
        vec![40],
        vec![1000],
        MemSteps::Explicit(vec![10_000, 10_001]),
    );

    let report = planner.run(&plan).unwrap();
    assert_eq!(report.measured, 1);
    assert_eq!(report.cached, 1);
    assert_eq!(planner.measurer().calls.len(), 1);

    let rows = planner.sink().rendered();
    assert_eq!(rows.len(), 2);
    // timings are shared; budget, repeat flag and command are per row
    let (first, second) = (rows[0].fields(), rows[1].fields());
    assert_eq!(first[1..10], second[1..10]);
    assert_eq!(first[12..], second[12..]);
    assert_eq!(first[10], "false");
    assert_eq!(second[10], "true");
    assert!(first[11].starts_with("./grouper 10000 "));
    assert!(second[11].starts_with("./grouper 10001 "));
}

#[test]
fn enumerated_levels_measure_each_table_count_once() {
    let dir = TempDir::new().unwrap();
    let mut planner = planner(&dir, ScriptedMeasurer::default());
    let plan = SweepPlan::new(vec![20], vec![1000], MemSteps::All);

    let report = planner.run(&plan).unwrap();
    // 10..=2 tables, then the single-table fallback, which resolves to
    // the two-table key
    assert_eq!(report.rows, 10);
    assert_eq!(report.measured, 9);
    assert_eq!(report.cached, 1);
    assert_eq!(report.too_small + report.trivial, 0);

    let tables: Vec<u64> = planner
        .measurer()
        .calls
        .iter()
        .map(|c| min_tables(c.memory_budget, c.rules, c.bits).table_count)
        .collect();
    assert_eq!(tables, (2..=10).rev().collect::<Vec<_>>());
}

#[test]
fn below_resolution_abandons_only_that_bit_length() {
    let dir = TempDir::new().unwrap();
    let measurer = ScriptedMeasurer {
        unmeasurable_bits: vec![20],
        ..Default::default()
    };
    let mut planner = planner(&dir, measurer);
    let plan = SweepPlan::new(
        vec![20, 40],
        vec![1000, 2000],
        MemSteps::Explicit(vec![1, 10_000, 20_000]),
    );

    let report = planner.run(&plan).unwrap();
    assert_eq!(report.abandoned_bits, vec![20]);

    let recorded: Vec<u64> = planner.sink().rows.iter().map(|(c, _)| c.bits).collect();
    // bits 20: the too-small row before the failed measurement only
    assert_eq!(recorded.iter().filter(|&&b| b == 20).count(), 1);
    // bits 40: every rule/memory combination
    assert_eq!(recorded.iter().filter(|&&b| b == 40).count(), 6);

    assert!(planner.fixtures().leftovers().is_empty());
}

#[test]
fn collaborator_failure_ends_the_sweep_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let measurer = ScriptedMeasurer {
        failing_budget: Some(20_000),
        ..Default::default()
    };
    let mut planner = planner(&dir, measurer);
    let plan = SweepPlan::new(
        vec![40, 48],
        vec![1000],
        MemSteps::Explicit(vec![10_000, 20_000, 30_000]),
    );

    let err = planner.run(&plan).unwrap_err();
    assert!(matches!(err, PlannerError::ExternalCollaborator(_)));
    assert_eq!(planner.sink().rows.len(), 1);
    assert_eq!(planner.fixtures().rule_requests, vec![(40, 1000)]);
    assert!(!planner.fixtures().created.is_empty());
    assert!(planner.fixtures().leftovers().is_empty());
}

#[test]
fn fixtures_exist_while_measuring() {
    let dir = TempDir::new().unwrap();
    let seen = Rc::new(Cell::new(0));
    let measurer = ScriptedMeasurer {
        fixtures_seen: seen.clone(),
        ..Default::default()
    };
    let mut planner = planner(&dir, measurer);
    let plan = SweepPlan::new(vec![40], vec![1000], MemSteps::Bounded(4));

    let report = planner.run(&plan).unwrap();
    assert_eq!(seen.get(), report.measured);
    assert!(report.measured > 0);
    assert!(planner.fixtures().leftovers().is_empty());
}

#[test]
fn impractical_pairs_are_recorded_without_a_rule_file() {
    let dir = TempDir::new().unwrap();
    let mut planner = SweepPlanner::new(
        SweepSettings::default().with_practical_limit(10_000),
        ScratchFixtures::new(&dir),
        ScriptedMeasurer::default(),
        MemorySink::new(),
    );
    let plan = SweepPlan::new(
        vec![40],
        vec![100, 1000],
        MemSteps::Explicit(vec![5_000, 10_000]),
    );

    let report = planner.run(&plan).unwrap();
    // 41 * 1000 > 10_000
    assert_eq!(planner.fixtures().rule_requests, vec![(40, 100)]);
    let impractical: Vec<_> = planner
        .sink()
        .rows
        .iter()
        .filter(|(_, v)| *v == Verdict::TooSmall(TooSmallReason::FixtureTooLarge))
        .collect();
    assert_eq!(impractical.len(), 2);
    assert_eq!(report.rows, 4);
}

#[test]
fn memoization_does_not_outlive_a_sweep() {
    let dir = TempDir::new().unwrap();
    let mut planner = planner(&dir, ScriptedMeasurer::default());
    let plan = SweepPlan::new(vec![40], vec![1000], MemSteps::Explicit(vec![10_000]));

    planner.run(&plan).unwrap();
    let second = planner.run(&plan).unwrap();
    assert_eq!(second.measured, 1);
    assert_eq!(planner.measurer().calls.len(), 2);
}

#[test]
fn dry_run_with_simulated_collaborators() {
    let mut planner = SweepPlanner::new(
        SweepSettings::default(),
        SimulatedFixtureSource::new(),
        SimulatedMeasurer::default(),
        MemorySink::new(),
    );
    let plan = SweepPlan::new(vec![10, 40], vec![1000], MemSteps::Massive(6));

    let report = planner.run(&plan).unwrap();
    let (fixtures, measurer, sink) = planner.into_parts();
    assert_eq!(fixtures.data_requests, vec![(10, 100_000), (40, 100_000)]);
    assert_eq!(measurer.calls, report.measured);
    assert_eq!(sink.rows.len(), report.rows);
    // 10 bits x 1000 rules has min > max: nothing is measured there
    assert!(sink
        .rows
        .iter()
        .filter(|(c, _)| c.bits == 10)
        .all(|(_, v)| v.outcome().is_none()));
}
