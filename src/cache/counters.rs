//! Names of the counters the list cache emits.

pub const HIT_TOTAL: &str = "postwell_cache_hit_total";
pub const MISS_TOTAL: &str = "postwell_cache_miss_total";
pub const INVALIDATE_TOTAL: &str = "postwell_cache_invalidate_total";

/// Every cache counter with its help text, for registration at start-up.
pub const ALL: [(&str, &str); 3] = [
    (HIT_TOTAL, "List cache lookups answered from a live entry."),
    (
        MISS_TOTAL,
        "List cache lookups that found no entry or an expired one.",
    ),
    (
        INVALIDATE_TOTAL,
        "Full list cache flushes triggered by post writes.",
    ),
];
