//! Counts over a classified set of processes.

use super::process::PROCESS_LABELS;
use crate::matcher::FieldRegistry;
use serde::Serialize;

/// How many selected processes ended up in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessCounts {
    pub count: usize,
    pub ok_count: usize,
    pub warn_count: usize,
    pub crit_count: usize,
}

/// Builder for aggregate filters such as `count == 0 || crit_count > 2`.
///
/// Per-process labels bind as disabled so the same expression can be bound
/// against both records and counts.
pub fn aggregate_registry() -> FieldRegistry<ProcessCounts> {
    let mut registry = FieldRegistry::new();
    registry
        .register_number("count", |c: &ProcessCounts| c.count as f64)
        .register_number("ok_count", |c: &ProcessCounts| c.ok_count as f64)
        .register_number("warn_count", |c: &ProcessCounts| c.warn_count as f64)
        .register_number("crit_count", |c: &ProcessCounts| c.crit_count as f64);
    for label in PROCESS_LABELS {
        registry.tolerate(label);
    }
    registry
}
