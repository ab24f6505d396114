//! Random rule and packet fixtures written to a work directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use grouper_planner::model::ceil_div;
use grouper_planner::{Fixture, FixtureSource, PlannerError, PlannerResult};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::info;

/// Symbols a rule position may take.
const RULE_SYMBOLS: [u8; 3] = *b"01?";

const CHUNK_BYTES: usize = 64 * 1024;

/// Writes uniformly random rule and packet files.
///
/// Every fixture is owned: its file is removed when the handle drops.
#[derive(Debug)]
pub struct RandomFixtureSource<R = StdRng> {
    work_dir: PathBuf,
    rng: R,
}

impl RandomFixtureSource<StdRng> {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_rng(work_dir, StdRng::from_entropy())
    }

    /// Reproducible fixtures for a given seed.
    pub fn seeded(work_dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self::with_rng(work_dir, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomFixtureSource<R> {
    pub fn with_rng(work_dir: impl Into<PathBuf>, rng: R) -> Self {
        Self {
            work_dir: work_dir.into(),
            rng,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn rule_path(&self, bits: u64, rules: u64) -> PathBuf {
        self.work_dir.join(format!("{}bx{}rules.pol", bits, rules))
    }

    pub fn data_path(&self, packets: u64) -> PathBuf {
        self.work_dir.join(format!("{}Kpackets.bin", packets / 1000))
    }

    fn write_rules(&mut self, path: &Path, bits: u64, rules: u64) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", bits)?;

        let mut line = vec![b'\n'; bits as usize + 1];
        for _ in 0..rules {
            for symbol in line.iter_mut().take(bits as usize) {
                *symbol = RULE_SYMBOLS[self.rng.gen_range(0..RULE_SYMBOLS.len())];
            }
            out.write_all(&line)?;
        }
        out.flush()
    }

    fn write_packets(&mut self, path: &Path, size: u64) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        let mut chunk = vec![0u8; CHUNK_BYTES];
        let mut remaining = size;
        while remaining > 0 {
            let n = remaining.min(CHUNK_BYTES as u64) as usize;
            self.rng.fill_bytes(&mut chunk[..n]);
            out.write_all(&chunk[..n])?;
            remaining -= n as u64;
        }
        out.flush()
    }
}

/// Size in bytes of a packet file holding `packets` packets of `bits`
/// bits each.
pub fn data_file_size(bits: u64, packets: u64) -> u64 {
    ceil_div(bits.saturating_mul(packets), 8)
}

fn fixture_error(path: &Path, e: std::io::Error) -> PlannerError {
    PlannerError::Fixture(format!("{}: {}", path.display(), e))
}

impl<R: Rng> FixtureSource for RandomFixtureSource<R> {
    fn rule_fixture(&mut self, bits: u64, rules: u64) -> PlannerResult<Fixture> {
        let path = self.rule_path(bits, rules);
        info!(path = %path.display(), bits, rules, "Writing rule file");
        // owned before writing so a partial file is removed too
        let fixture = Fixture::owned(path.clone());
        self.write_rules(&path, bits, rules)
            .map_err(|e| fixture_error(&path, e))?;
        Ok(fixture)
    }

    fn data_fixture(&mut self, bits: u64, packets: u64) -> PlannerResult<Fixture> {
        let path = self.data_path(packets);
        let size = data_file_size(bits, packets);
        info!(path = %path.display(), bits, packets, size, "Building test input");
        let fixture = Fixture::owned(path.clone());
        self.write_packets(&path, size)
            .map_err(|e| fixture_error(&path, e))?;
        Ok(fixture)
    }
}
