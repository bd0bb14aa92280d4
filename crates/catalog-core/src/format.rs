//! Compact display formatting for pearl amounts.
//!
//! Amounts under 100K render with thousands separators; everything above
//! collapses to one decimal and a suffix (K, M, B, T, Q, Qi), matching
//! how balances and prices appear across the rest of Pearl Verse.

/// Suffix table, largest magnitude first. Qi (1e18) covers the top of the
/// `u64` range; larger suffixes would be unreachable.
const SUFFIXES: [(f64, &str); 5] = [
    (1e18, "Qi"),
    (1e15, "Q"),
    (1e12, "T"),
    (1e9, "B"),
    (1e6, "M"),
];

/// Threshold below which amounts render in full.
const COMPACT_THRESHOLD: u64 = 100_000;

/// Format a pearl amount for display.
pub fn compact(amount: u64) -> String {
    let value = amount as f64;
    for (magnitude, suffix) in SUFFIXES {
        if value >= magnitude {
            return format!("{:.1}{}", value / magnitude, suffix);
        }
    }
    if amount >= COMPACT_THRESHOLD {
        return format!("{:.1}K", value / 1e3);
    }
    with_separators(amount)
}

/// Plain rendering with thousands separators (e.g. `12,345`).
pub fn with_separators(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Price label: free items say so instead of showing a zero.
pub fn price_label(price: u64) -> String {
    if price == 0 {
        "Free".to_string()
    } else {
        compact(price)
    }
}
