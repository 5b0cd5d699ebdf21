//! Unit scaling helpers used by checker builders.
//!
//! None of these run automatically: a builder applies them to the labels that
//! need them (a "time elapsed" field normalises durations and flips negative
//! thresholds, a memory field normalises bytes). Unknown units are passed
//! through unscaled.

use crate::ast::Cmp;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3600.0;
const DAY: f64 = 86400.0;
const WEEK: f64 = DAY * 7.0;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Scale `value` to seconds using the first character of `unit`.
///
/// `w`, `d`, `h`, `m` (either case) scale to weeks, days, hours and minutes;
/// anything else is taken as seconds already.
///
/// ```rust
/// use check_filter::matcher::normalize::normalize_duration;
///
/// assert_eq!(normalize_duration(2.0, "h"), (7200.0, "s"));
/// assert_eq!(normalize_duration(5.0, ""), (5.0, "s"));
/// ```
pub fn normalize_duration(value: f64, unit: &str) -> (f64, &'static str) {
    let factor = match unit.chars().next() {
        Some('w' | 'W') => WEEK,
        Some('d' | 'D') => DAY,
        Some('h' | 'H') => HOUR,
        Some('m' | 'M') => MINUTE,
        _ => 1.0,
    };
    (value * factor, "s")
}

/// Scale `value` to bytes using the first character of `unit`.
///
/// ```rust
/// use check_filter::matcher::normalize::normalize_bytes;
///
/// assert_eq!(normalize_bytes(1.0, "G"), (1073741824.0, "b"));
/// assert_eq!(normalize_bytes(3.0, "b"), (3.0, "b"));
/// ```
pub fn normalize_bytes(value: f64, unit: &str) -> (f64, &'static str) {
    let factor = match unit.chars().next() {
        Some('g' | 'G') => GIB,
        Some('m' | 'M') => MIB,
        Some('k' | 'K') => KIB,
        _ => 1.0,
    };
    (value * factor, "b")
}

/// Make a negative threshold positive and invert the comparator.
///
/// `creation > -1h` reads "created more recently than one hour ago", i.e. the
/// elapsed time is below 3600 seconds. Non-negative thresholds are returned
/// unchanged.
pub fn normalize_negative_threshold(value: f64, comparator: Cmp) -> (f64, Cmp) {
    if value < 0.0 {
        (-value, comparator.flip())
    } else {
        (value, comparator)
    }
}
