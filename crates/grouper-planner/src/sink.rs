//! Result rows and the sink that receives them.

use serde::{Deserialize, Serialize};

use crate::error::PlannerResult;
use crate::types::{Configuration, Verdict};

/// Column names, in row order.
pub const RESULT_COLUMNS: [&str; 14] = [
    "memory allowed",
    "number of rules",
    "packet size in bits",
    "kbps",
    "pps",
    "table build time",
    "memory used",
    "number of tables",
    "policy read time",
    "total run time",
    "repeat run",
    "command",
    "cpu process time",
    "real process time",
];

/// Columns that depend on the run rather than the configuration.
pub const DEPENDENT_COLUMNS: usize = RESULT_COLUMNS.len() - 3;

/// Marker written for single-table configurations that were skipped.
pub const REDO_MARKER: &str = "redo";

/// One rendered result row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow(pub Vec<String>);

impl ResultRow {
    /// Render the row recorded for `configuration` under `verdict`.
    pub fn new(configuration: &Configuration, verdict: &Verdict) -> Self {
        let mut fields = vec![
            configuration.memory_budget.to_string(),
            configuration.rules.to_string(),
            configuration.bits.to_string(),
        ];

        match verdict {
            Verdict::TooSmall(_) => {
                fields.extend(std::iter::repeat(String::new()).take(DEPENDENT_COLUMNS))
            }
            Verdict::Trivial => fields.extend(
                std::iter::repeat(REDO_MARKER.to_string()).take(DEPENDENT_COLUMNS),
            ),
            Verdict::Feasible { level, summary } | Verdict::Duplicate { level, summary } => {
                fields.extend([
                    summary.kbps.to_string(),
                    summary.pps.to_string(),
                    format!("{:.4}", summary.build_secs),
                    level.bytes.to_string(),
                    level.table_count.to_string(),
                    format!("{:.4}", summary.read_secs),
                    format!("{:.4}", summary.total_secs),
                    verdict.is_repeat().to_string(),
                    summary.command.clone(),
                    format!("{:.4}", summary.cpu_process_secs),
                    format!("{:.4}", summary.real_process_secs),
                ]);
            }
        }

        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

/// Receives one row per configuration of a sweep, whatever its verdict.
pub trait ResultSink {
    fn record_row(&mut self, configuration: &Configuration, verdict: &Verdict)
        -> PlannerResult<()>;

    /// Push buffered rows to their destination.
    fn flush(&mut self) -> PlannerResult<()> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn record_row(
        &mut self,
        configuration: &Configuration,
        verdict: &Verdict,
    ) -> PlannerResult<()> {
        (**self).record_row(configuration, verdict)
    }

    fn flush(&mut self) -> PlannerResult<()> {
        (**self).flush()
    }
}

/// Sink that keeps every row in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<(Configuration, Verdict)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered rows, in recording order.
    pub fn rendered(&self) -> Vec<ResultRow> {
        self.rows
            .iter()
            .map(|(configuration, verdict)| ResultRow::new(configuration, verdict))
            .collect()
    }
}

impl ResultSink for MemorySink {
    fn record_row(
        &mut self,
        configuration: &Configuration,
        verdict: &Verdict,
    ) -> PlannerResult<()> {
        self.rows.push((*configuration, verdict.clone()));
        Ok(())
    }
}
