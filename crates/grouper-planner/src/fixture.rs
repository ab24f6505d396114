//! Rule and data fixtures.
//!
//! A [`Fixture`] owns a generated input file and deletes it when
//! dropped, so every exit path of a sweep (success, abandoned
//! bit-length, propagated error) releases what it generated.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PlannerResult;

/// Handle to a generated input file.
#[derive(Debug)]
pub struct Fixture {
    path: PathBuf,
    remove_on_drop: bool,
}

impl Fixture {
    /// A fixture whose file is removed on drop.
    pub fn owned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remove_on_drop: true,
        }
    }

    /// A fixture that refers to a path but leaves it alone on drop.
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remove_on_drop: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file after the handle goes away.
    pub fn keep(mut self) -> PathBuf {
        self.remove_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed fixture"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove fixture"),
        }
    }
}

/// Produces the input files a measurement needs.
pub trait FixtureSource {
    /// Random rule set of `rules` patterns, each `bits` wide.
    fn rule_fixture(&mut self, bits: u64, rules: u64) -> PlannerResult<Fixture>;

    /// Random packet data: `packets` patterns of `bits` bits.
    fn data_fixture(&mut self, bits: u64, packets: u64) -> PlannerResult<Fixture>;
}

impl<F: FixtureSource + ?Sized> FixtureSource for Box<F> {
    fn rule_fixture(&mut self, bits: u64, rules: u64) -> PlannerResult<Fixture> {
        (**self).rule_fixture(bits, rules)
    }

    fn data_fixture(&mut self, bits: u64, packets: u64) -> PlannerResult<Fixture> {
        (**self).data_fixture(bits, packets)
    }
}

/// Fixture source that writes nothing and remembers what was asked for.
#[derive(Debug, Default)]
pub struct SimulatedFixtureSource {
    pub rule_requests: Vec<(u64, u64)>,
    pub data_requests: Vec<(u64, u64)>,
}

impl SimulatedFixtureSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FixtureSource for SimulatedFixtureSource {
    fn rule_fixture(&mut self, bits: u64, rules: u64) -> PlannerResult<Fixture> {
        self.rule_requests.push((bits, rules));
        Ok(Fixture::detached(format!("{}bx{}rules.pol", bits, rules)))
    }

    fn data_fixture(&mut self, bits: u64, packets: u64) -> PlannerResult<Fixture> {
        self.data_requests.push((bits, packets));
        Ok(Fixture::detached(format!("{}Kpackets.bin", packets / 1000)))
    }
}
