//! Minimum table count for a memory budget.

use crate::model::{max_tables, table_memory};
use crate::types::MemoryLevel;

/// Smallest table count whose split-table memory fits in `budget`.
///
/// Binary search over `[1, ceil(bits / 2)]`, keeping `high` on a count
/// that fits and `low` on one that does not. The caller guarantees
/// `min_bytes(rules, bits) <= budget < max_bytes(rules, bits)`; under
/// that precondition one table never fits and the maximum count always
/// does.
pub fn min_tables(budget: u64, rules: u64, bits: u64) -> MemoryLevel {
    let mut high = max_tables(bits).max(1);
    let mut low = 1;

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if budget < table_memory(mid, rules, bits) {
            low = mid;
        } else {
            high = mid;
        }
    }

    MemoryLevel::new(high, table_memory(high, rules, bits))
}
