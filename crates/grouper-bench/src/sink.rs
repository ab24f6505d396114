//! CSV result files.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use grouper_planner::{
    Configuration, PlannerError, PlannerResult, ResultRow, ResultSink, Verdict, RESULT_COLUMNS,
};

use crate::error::BenchResult;

/// Writes one CSV row per configuration, header first.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> BenchResult<Self> {
        let writer = csv::Writer::from_path(path)?;
        Self::with_writer(writer)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> BenchResult<Self> {
        Self::with_writer(csv::Writer::from_writer(inner))
    }

    fn with_writer(mut writer: csv::Writer<W>) -> BenchResult<Self> {
        writer.write_record(RESULT_COLUMNS)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> BenchResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn record_row(
        &mut self,
        configuration: &Configuration,
        verdict: &Verdict,
    ) -> PlannerResult<()> {
        let row = ResultRow::new(configuration, verdict);
        self.writer
            .write_record(row.fields())
            .map_err(|e| PlannerError::Sink(e.to_string()))?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> PlannerResult<()> {
        self.writer
            .flush()
            .map_err(|e| PlannerError::Sink(e.to_string()))
    }
}

/// Result file name for a round.
///
/// `base` is the `--output` value or the mode prefix. With more than one
/// round, rounds are numbered from 1.
pub fn round_file_name(base: &str, round: usize, rounds: usize) -> PathBuf {
    if rounds == 1 {
        PathBuf::from(format!("{}.csv", base))
    } else {
        PathBuf::from(format!("{}_{}.csv", base, round + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grouper_planner::{MemoryLevel, TimingSummary, TooSmallReason};

    fn summary() -> TimingSummary {
        TimingSummary {
            kbps: 150_000,
            pps: 100_000,
            build_secs: 0.1234,
            read_secs: 0.5,
            total_secs: 2.0,
            cpu_process_secs: 1.0,
            real_process_secs: 1.25,
            command: "./grouper 10000 40bx1000rules.pol 100Kpackets.bin /dev/null".into(),
        }
    }

    fn read_back(sink: CsvSink<Vec<u8>>) -> Vec<Vec<String>> {
        let bytes = sink.into_inner().unwrap();
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn header_comes_first() {
        let sink = CsvSink::from_writer(Vec::new()).unwrap();
        let rows = read_back(sink);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], RESULT_COLUMNS.map(str::to_string).to_vec());
    }

    #[test]
    fn rows_follow_verdicts() {
        let mut sink = CsvSink::from_writer(Vec::new()).unwrap();
        let level = MemoryLevel::new(20, 10_000);
        sink.record_row(
            &Configuration::new(40, 1000, 1),
            &Verdict::TooSmall(TooSmallReason::BelowMinimum),
        )
        .unwrap();
        sink.record_row(&Configuration::new(40, 1000, u64::MAX), &Verdict::Trivial)
            .unwrap();
        sink.record_row(
            &Configuration::new(40, 1000, 10_000),
            &Verdict::Feasible {
                level,
                summary: summary(),
            },
        )
        .unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.rows(), 3);

        let rows = read_back(sink);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == RESULT_COLUMNS.len()));
        assert_eq!(rows[1][..3], ["1", "1000", "40"]);
        assert!(rows[1][3..].iter().all(String::is_empty));
        assert!(rows[2][3..].iter().all(|f| f == "redo"));
        assert_eq!(rows[3][5], "0.1234");
        assert_eq!(rows[3][10], "false");
        // the command contains spaces but no commas, so it stays unquoted
        assert_eq!(rows[3][11], summary().command);
    }

    #[test]
    fn create_writes_to_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("steptest.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.record_row(&Configuration::new(8, 8, 1), &Verdict::Trivial)
            .unwrap();
        sink.flush().unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("memory allowed,number of rules"));
        assert!(lines.next().unwrap().starts_with("1,8,8,redo"));
    }

    #[test]
    fn round_names() {
        assert_eq!(round_file_name("steptest", 0, 1), PathBuf::from("steptest.csv"));
        assert_eq!(round_file_name("run", 0, 3), PathBuf::from("run_1.csv"));
        assert_eq!(round_file_name("run", 2, 3), PathBuf::from("run_3.csv"));
    }
}
