//! Event log record fields.

use crate::ast::{FilterNode, InRule, SetMembership, StrCmp, StringCompare};
use crate::error::BindError;
use crate::matcher::normalize::normalize_duration;
use crate::matcher::{BindResult, Binding, FieldRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const KEYWORD_AUDIT_FAILURE: u64 = 0x0010_0000_0000_0000;
pub const KEYWORD_AUDIT_SUCCESS: u64 = 0x0020_0000_0000_0000;
const KEYWORD_AUDIT_MASK: u64 = KEYWORD_AUDIT_FAILURE | KEYWORD_AUDIT_SUCCESS;

/// One event log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub event_id: u32,
    /// 1 (critical) to 5 (verbose).
    pub level: u8,
    pub provider: String,
    pub computer: String,
    pub channel: String,
    pub keywords: u64,
    /// Seconds elapsed since the event was written.
    pub written: f64,
}

/// Level number for a level name, or for a level written as a number.
///
/// ```rust
/// use check_filter::consumers::event_log::level_from_name;
///
/// assert_eq!(level_from_name("error"), Some(2));
/// assert_eq!(level_from_name("4"), Some(4));
/// assert_eq!(level_from_name("noisy"), None);
/// ```
pub fn level_from_name(name: &str) -> Option<u8> {
    match name {
        "critical" => Some(1),
        "error" => Some(2),
        "warning" | "warn" => Some(3),
        "information" | "informational" | "info" => Some(4),
        "verbose" | "debug" => Some(5),
        other => other.parse().ok(),
    }
}

fn level_of(label: &str, name: &str) -> Result<u8, BindError> {
    level_from_name(name).ok_or_else(|| BindError::invalid_value(label, name, "unknown level"))
}

fn keyword_of(label: &str, name: &str) -> Result<u64, BindError> {
    match name {
        "auditsuccess" => Ok(KEYWORD_AUDIT_SUCCESS),
        "auditfailure" => Ok(KEYWORD_AUDIT_FAILURE),
        other => Err(BindError::invalid_value(
            label,
            other,
            "only auditfailure and auditsuccess keywords are allowed",
        )),
    }
}

fn bind_level_string(leaf: &StringCompare) -> BindResult<EventRecord> {
    let level = level_of(&leaf.label, &leaf.value)?;
    let comparator = leaf.comparator;
    Ok(Binding::checker(move |event: &EventRecord| match comparator {
        StrCmp::Eq => event.level == level,
        StrCmp::Ne => event.level != level,
    }))
}

fn bind_level_set(leaf: &SetMembership) -> BindResult<EventRecord> {
    let levels = leaf
        .values
        .iter()
        .map(|value| level_of(&leaf.label, value))
        .collect::<Result<BTreeSet<u8>, _>>()?;
    let rule = leaf.rule;
    Ok(Binding::checker(move |event: &EventRecord| {
        rule.apply(levels.contains(&event.level))
    }))
}

fn bind_keywords_string(leaf: &StringCompare) -> BindResult<EventRecord> {
    let keyword = keyword_of(&leaf.label, &leaf.value)?;
    let comparator = leaf.comparator;
    Ok(Binding::checker(move |event: &EventRecord| {
        let audit = event.keywords & KEYWORD_AUDIT_MASK;
        match comparator {
            StrCmp::Eq => audit == keyword,
            StrCmp::Ne => audit != keyword,
        }
    }))
}

fn bind_keywords_set(leaf: &SetMembership) -> BindResult<EventRecord> {
    let mut mask = 0;
    for value in &leaf.values {
        mask |= keyword_of(&leaf.label, value)?;
    }
    let rule = leaf.rule;
    Ok(Binding::checker(move |event: &EventRecord| {
        let any = event.keywords & mask != 0;
        match rule {
            InRule::In => any,
            InRule::NotIn => !any,
        }
    }))
}

/// Builder for event log filters.
pub fn event_log_registry() -> FieldRegistry<EventRecord> {
    let mut registry = FieldRegistry::new();
    registry
        .register_number("event_id", |e: &EventRecord| f64::from(e.event_id))
        .register_number("level", |e: &EventRecord| f64::from(e.level))
        .register_custom_string("level", bind_level_string)
        .register_custom_set("level", bind_level_set)
        .register_duration("written", |e: &EventRecord| e.written)
        .register_string("provider", |e: &EventRecord| e.provider.as_str())
        .register_string("computer", |e: &EventRecord| e.computer.as_str())
        .register_string("channel", |e: &EventRecord| e.channel.as_str())
        .register_custom_string("keywords", bind_keywords_string)
        .register_custom_set("keywords", bind_keywords_set);
    registry
}

/// Largest `written` age, in seconds, that a filter compares against.
///
/// A classification made by such a filter can change once an event gets older
/// than this age, so stored events must be checked again past it. `None` when
/// the filter does not look at `written`.
///
/// ```rust
/// use check_filter::consumers::event_log::written_limit;
/// use check_filter::parse;
///
/// let tree = parse("level == 'error' and (written > -2s or written < 1h)")?;
/// assert_eq!(written_limit(&tree), Some(3600.0));
/// assert_eq!(written_limit(&parse("level == 'error'")?), None);
/// # Ok::<(), check_filter::ParseError>(())
/// ```
pub fn written_limit(tree: &FilterNode) -> Option<f64> {
    let mut limit: Option<f64> = None;
    tree.visit(&mut |node| {
        if let FilterNode::ValueCompare(leaf) = node {
            if leaf.label == "written" {
                let (seconds, _) = normalize_duration(leaf.threshold.abs(), &leaf.unit);
                limit = Some(limit.map_or(seconds, |current| current.max(seconds)));
            }
        }
    });
    limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, BoundFilter};

    fn event() -> EventRecord {
        EventRecord {
            event_id: 6,
            level: 2,
            provider: "Service Control Manager".to_string(),
            computer: "srv01".to_string(),
            channel: "System".to_string(),
            keywords: KEYWORD_AUDIT_SUCCESS | 0x80,
            written: 120.0,
        }
    }

    fn bind(filter: &str) -> Result<BoundFilter<EventRecord>, BindError> {
        parse(filter).unwrap().bind(&event_log_registry())
    }

    fn check(filter: &str, record: &EventRecord) -> bool {
        bind(filter).unwrap().check(record)
    }

    #[test]
    fn test_event_id() {
        let record = event();
        assert!(check("event_id in (5, 6)", &record));
        assert!(!check("event_id not_in (5, 6)", &record));
        assert!(check("event_id >= 6", &record));
        assert!(matches!(
            bind("event_id in (5, six)"),
            Err(BindError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_level_by_number_and_name() {
        let record = event();
        assert!(check("level == 2", &record));
        assert!(check("level < 3", &record));
        assert!(check("level == 'error'", &record));
        assert!(check("level != 'warning'", &record));
        assert!(check("level in ('critical', 'error')", &record));
        assert!(check("level not_in (info, verbose, 3)", &record));
        assert!(matches!(bind("level == 'loud'"), Err(BindError::InvalidValue { .. })));
    }

    #[test]
    fn test_written_is_an_age() {
        let record = event();
        assert!(check("written > -5m", &record));
        assert!(!check("written > -1m", &record));
    }

    #[test]
    fn test_string_fields() {
        let record = event();
        assert!(check(
            "provider == 'Service Control Manager' && computer in ('srv01', 'srv02')",
            &record
        ));
        assert!(check("channel != 'Security'", &record));
    }

    #[test]
    fn test_keywords() {
        let record = event();
        assert!(check("keywords == 'auditsuccess'", &record));
        assert!(check("keywords != 'auditfailure'", &record));
        assert!(check("keywords in ('auditfailure', 'auditsuccess')", &record));
        assert!(!check("keywords in ('auditfailure')", &record));
        assert!(check("keywords not_in ('auditfailure')", &record));

        let err = bind("keywords == 'classic'").err().unwrap();
        assert!(err.to_string().contains("only auditfailure and auditsuccess"));
        assert!(matches!(bind("keywords > 1"), Err(BindError::Unsupported { .. })));
    }

    #[test]
    fn test_written_limit() {
        let limit = |filter: &str| written_limit(&parse(filter).unwrap());
        assert_eq!(limit("level == 'warning' and written > -2s"), Some(2.0));
        assert_eq!(limit("written > -60m || written < 1d"), Some(86400.0));
        assert_eq!(limit("level in ('error', 'critical')"), None);
        assert_eq!(limit("written in (5m)"), None);
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(
            bind("record_id > 1").err(),
            Some(BindError::UnknownLabel("record_id".to_string()))
        );
    }
}
