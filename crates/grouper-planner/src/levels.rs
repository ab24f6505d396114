//! Memory-level enumeration.
//!
//! [`MemoryLevels`] is a cheap, copyable description of the enumeration;
//! every call to [`MemoryLevels::iter`] starts a fresh pass, so callers
//! can count the levels and then walk them again.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::model::{max_tables, single_table_bytes, table_memory};
use crate::types::MemoryLevel;

/// The `(table_count, bytes)` pairs reachable for one `(bits, rules)`
/// pair, from the maximum table count down to one table, under a
/// memory ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLevels {
    pub bits: u64,
    pub rules: u64,
    pub max_space: u64,
}

impl MemoryLevels {
    pub fn new(bits: u64, rules: u64, max_space: u64) -> Self {
        Self {
            bits,
            rules,
            max_space,
        }
    }

    /// Start a new pass over the levels.
    pub fn iter(&self) -> MemoryLevelIter {
        MemoryLevelIter::new(*self)
    }

    /// Number of levels; walks the enumeration once.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Memory sizes of every level, in enumeration order.
    pub fn bytes(&self) -> Vec<u64> {
        self.iter().map(|level| level.bytes).collect()
    }

    /// Memory sizes of the levels whose table count is in `tables`.
    pub fn for_tables(&self, tables: &[u64]) -> Vec<u64> {
        self.iter()
            .filter(|level| tables.contains(&level.table_count))
            .map(|level| level.bytes)
            .collect()
    }
}

impl IntoIterator for MemoryLevels {
    type Item = MemoryLevel;
    type IntoIter = MemoryLevelIter;

    fn into_iter(self) -> Self::IntoIter {
        MemoryLevelIter::new(self)
    }
}

impl IntoIterator for &MemoryLevels {
    type Item = MemoryLevel;
    type IntoIter = MemoryLevelIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`MemoryLevels`] enumeration.
///
/// Table counts from `ceil(bits / 2)` down to 2 use the split-table
/// model; the pass ends at the first count over the ceiling. If it gets
/// that far, the single-table case is checked last using a bit-packed
/// rule index per entry.
#[derive(Clone, Debug)]
pub struct MemoryLevelIter {
    levels: MemoryLevels,
    next_tables: Option<u64>,
}

impl MemoryLevelIter {
    fn new(levels: MemoryLevels) -> Self {
        let empty = levels.bits == 0 || levels.rules == 0 || levels.max_space == 0;
        Self {
            levels,
            next_tables: if empty {
                None
            } else {
                Some(max_tables(levels.bits))
            },
        }
    }
}

impl Iterator for MemoryLevelIter {
    type Item = MemoryLevel;

    fn next(&mut self) -> Option<MemoryLevel> {
        let t = self.next_tables.take()?;
        let MemoryLevels {
            bits,
            rules,
            max_space,
        } = self.levels;

        let bytes = if t >= 2 {
            table_memory(t, rules, bits)
        } else {
            single_table_bytes(rules, bits)
        };
        if bytes > max_space {
            return None;
        }

        if t >= 2 {
            self.next_tables = Some(t - 1);
        }
        Some(MemoryLevel::new(t, bytes))
    }
}

impl FusedIterator for MemoryLevelIter {}
