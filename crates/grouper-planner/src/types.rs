//! Core value types for the planner.
//!
//! Configurations, memory levels, memoization keys and the verdicts a
//! sweep records for each point of the parameter space.

use serde::{Deserialize, Serialize};

use crate::timing::TimingSummary;

/// One point of the parameter space: pattern width, rule count and
/// memory budget in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub bits: u64,
    pub rules: u64,
    pub memory_budget: u64,
}

impl Configuration {
    pub fn new(bits: u64, rules: u64, memory_budget: u64) -> Self {
        Self {
            bits,
            rules,
            memory_budget,
        }
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} bits x {} rules @ {} bytes",
            self.bits, self.rules, self.memory_budget
        )
    }
}

/// A table count together with the bytes a classifier needs for it.
///
/// Along an enumeration, bytes never decrease as the table count falls,
/// with one exception: the terminal single-table level stores a packed
/// rule index per entry and can be smaller than the two-table level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryLevel {
    pub table_count: u64,
    pub bytes: u64,
}

impl MemoryLevel {
    pub fn new(table_count: u64, bytes: u64) -> Self {
        Self { table_count, bytes }
    }
}

impl std::fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tables / {} bytes", self.table_count, self.bytes)
    }
}

/// Identifies configurations that drive the classifier identically.
///
/// Two budgets that resolve to the same table count and memory use for
/// the same pattern width and rule count are one experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoizationKey {
    pub table_count: u64,
    pub bytes: u64,
    pub bits: u64,
    pub rules: u64,
}

impl MemoizationKey {
    pub fn new(level: MemoryLevel, bits: u64, rules: u64) -> Self {
        Self {
            table_count: level.table_count,
            bytes: level.bytes,
            bits,
            rules,
        }
    }
}

/// Why a configuration was not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooSmallReason {
    /// Budget is below the minimum at maximum table count.
    BelowMinimum,
    /// The rule fixture for this pair would be too large to write.
    FixtureTooLarge,
}

impl std::fmt::Display for TooSmallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMinimum => write!(f, "not enough memory for rules and bits given"),
            Self::FixtureTooLarge => write!(f, "rule file would be too large to be practical"),
        }
    }
}

/// Outcome recorded for one configuration of a sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    /// Not run; the row carries empty fields.
    TooSmall(TooSmallReason),
    /// Budget covers the single-table case; not benchmarked, needs redo.
    Trivial,
    /// Freshly measured.
    Feasible {
        level: MemoryLevel,
        summary: TimingSummary,
    },
    /// Served from the memoization table.
    Duplicate {
        level: MemoryLevel,
        summary: TimingSummary,
    },
}

impl Verdict {
    /// Level and timings, when the configuration resolved to a run.
    pub fn outcome(&self) -> Option<(&MemoryLevel, &TimingSummary)> {
        match self {
            Verdict::Feasible { level, summary } | Verdict::Duplicate { level, summary } => {
                Some((level, summary))
            }
            _ => None,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Verdict::Duplicate { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall(reason) => write!(f, "too small ({})", reason),
            Self::Trivial => write!(f, "trivial (single table)"),
            Self::Feasible { level, .. } => write!(f, "feasible ({})", level),
            Self::Duplicate { level, .. } => write!(f, "duplicate ({})", level),
        }
    }
}
