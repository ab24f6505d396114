//! Closed-form memory model of a multi-table classifier.
//!
//! A `bits`-wide pattern split over `t` tables gives each table a group
//! of roughly `bits / t` bits; every table holds `2^width` entries of one
//! rule bitmask (`ceil(rules / 8)` bytes) each. All arithmetic saturates
//! at `u64::MAX`, which exceeds every budget the planner compares
//! against, so very wide patterns stay ordered correctly.

/// Integer division rounding up.
pub fn ceil_div(num: u64, denom: u64) -> u64 {
    num / denom + u64::from(num % denom != 0)
}

/// `2^exp`, saturating.
pub fn pow2(exp: u64) -> u64 {
    if exp >= u64::BITS as u64 {
        u64::MAX
    } else {
        1u64 << exp
    }
}

/// Bits needed to index `rules` distinct rules.
pub fn ceil_log2(rules: u64) -> u64 {
    if rules <= 1 {
        0
    } else {
        u64::from(u64::BITS - (rules - 1).leading_zeros())
    }
}

/// Largest table count worth considering: two bits per table.
pub fn max_tables(bits: u64) -> u64 {
    ceil_div(bits, 2)
}

/// Bytes used at the maximum table count.
pub fn min_bytes(rules: u64, bits: u64) -> u64 {
    2u64.saturating_mul(ceil_div(rules, 8)).saturating_mul(bits)
}

/// Bytes for the single-table case: one rule index per pattern value.
pub fn max_bytes(rules: u64, bits: u64) -> u64 {
    ceil_div(ceil_log2(rules), 8).saturating_mul(pow2(bits))
}

/// Bytes needed when `bits` is split as evenly as possible over `t`
/// tables: `bits mod t` groups one bit wider than `floor(bits / t)`.
///
/// `t` must be at least 1.
pub fn table_memory(t: u64, rules: u64, bits: u64) -> u64 {
    debug_assert!(t >= 1, "table count must be positive");
    let row = ceil_div(rules, 8);
    let (width, wide) = (bits / t, bits % t);
    let narrow = t - wide;

    let narrow_bytes = narrow.saturating_mul(pow2(width)).saturating_mul(row);
    let wide_bytes = wide
        .saturating_mul(pow2(width.saturating_add(1)))
        .saturating_mul(row);
    narrow_bytes.saturating_add(wide_bytes)
}

/// Bytes of a bit-packed single table, `ceil_log2(rules)` bits per entry.
pub fn single_table_bytes(rules: u64, bits: u64) -> u64 {
    let total_bits = pow2(bits).saturating_mul(ceil_log2(rules));
    ceil_div(total_bits, 8)
}
