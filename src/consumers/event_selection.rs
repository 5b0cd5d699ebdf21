//! Event log check classification.
//!
//! Each event passing the primary `filter` is critical when `critical` accepts
//! it, else warning when `warning` accepts it, else ok. The check status is the
//! worst status among the kept events.
//!
//! `warning` and `critical` often depend on `written` (`written > -2s`): an
//! event classified now may fall back to another status once it gets older.
//! [`EventSelection::recheck_after`] tells how long a classification holds.

use super::event_log::{event_log_registry, written_limit, EventRecord};
use super::selection::Status;
use crate::ast::FilterNode;
use crate::compiler::FilterCompiler;
use crate::error::Result;
use crate::matcher::BoundFilter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Filter strings of an event log check. Empty strings mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventSelectionConfig {
    /// **Default**: `written > 60m and level in ('error', 'warning', 'critical')`
    pub filter: String,
    /// **Default**: `level == 'warning'`
    pub warning: String,
    /// **Default**: `level in ('error', 'critical')`
    pub critical: String,
}

impl Default for EventSelectionConfig {
    fn default() -> Self {
        Self {
            filter: "written > 60m and level in ('error', 'warning', 'critical')".to_string(),
            warning: "level == 'warning'".to_string(),
            critical: "level in ('error', 'critical')".to_string(),
        }
    }
}

impl EventSelectionConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Number of kept events per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub count: usize,
    pub ok_count: usize,
    pub warn_count: usize,
    pub crit_count: usize,
}

/// Outcome of one classification pass over events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport<'a> {
    pub status: Status,
    pub counts: EventCounts,
    pub ok: Vec<&'a EventRecord>,
    pub warning: Vec<&'a EventRecord>,
    pub critical: Vec<&'a EventRecord>,
}

/// Bound filters of an event log check.
pub struct EventSelection {
    filter: Option<BoundFilter<EventRecord>>,
    warning: Option<BoundFilter<EventRecord>>,
    critical: Option<BoundFilter<EventRecord>>,
}

impl EventSelection {
    /// Parse and bind every filter of `config` with the default compiler.
    pub fn new(config: &EventSelectionConfig) -> Result<Self> {
        Self::with_compiler(config, &FilterCompiler::new())
    }

    pub fn with_compiler(config: &EventSelectionConfig, compiler: &FilterCompiler) -> Result<Self> {
        let registry = event_log_registry();
        let compile = |text: &str| -> Result<Option<BoundFilter<EventRecord>>> {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                compiler.compile(text, &registry).map(Some)
            }
        };

        let selection = Self {
            filter: compile(&config.filter)?,
            warning: compile(&config.warning)?,
            critical: compile(&config.critical)?,
        };
        info!(
            filter = %config.filter,
            warning = %config.warning,
            critical = %config.critical,
            "event selection ready"
        );
        Ok(selection)
    }

    /// Whether `event` passes the primary filter.
    pub fn is_selected(&self, event: &EventRecord) -> bool {
        self.filter.as_ref().map_or(true, |f| f.check(event))
    }

    /// Status of a single selected event; critical wins over warning.
    pub fn event_status(&self, event: &EventRecord) -> Status {
        if self.critical.as_ref().is_some_and(|f| f.check(event)) {
            Status::Critical
        } else if self.warning.as_ref().is_some_and(|f| f.check(event)) {
            Status::Warning
        } else {
            Status::Ok
        }
    }

    /// Classify `events` and compute the check status.
    pub fn evaluate<'a>(&self, events: &'a [EventRecord]) -> EventReport<'a> {
        let selected: Vec<&EventRecord> = match &self.filter {
            Some(filter) => filter.matching_par(events),
            None => events.iter().collect(),
        };

        let mut report = EventReport {
            status: Status::Ok,
            counts: EventCounts::default(),
            ok: Vec::new(),
            warning: Vec::new(),
            critical: Vec::new(),
        };
        for event in selected {
            match self.event_status(event) {
                Status::Ok => report.ok.push(event),
                Status::Warning => report.warning.push(event),
                Status::Critical => report.critical.push(event),
            }
        }

        report.counts = EventCounts {
            count: report.ok.len() + report.warning.len() + report.critical.len(),
            ok_count: report.ok.len(),
            warn_count: report.warning.len(),
            crit_count: report.critical.len(),
        };
        report.status = if report.counts.crit_count > 0 {
            Status::Critical
        } else if report.counts.warn_count > 0 {
            Status::Warning
        } else {
            Status::Ok
        };

        debug!(
            status = ?report.status,
            count = report.counts.count,
            warn_count = report.counts.warn_count,
            crit_count = report.counts.crit_count,
            "events classified"
        );
        report
    }

    /// `written` limit of the warning filter, in seconds.
    pub fn warning_written_limit(&self) -> Option<f64> {
        self.warning.as_ref().and_then(|f| written_limit(f.template()))
    }

    /// `written` limit of the critical filter, in seconds.
    pub fn critical_written_limit(&self) -> Option<f64> {
        self.critical.as_ref().and_then(|f| written_limit(f.template()))
    }

    /// Age, in seconds, past which classified events must be evaluated again:
    /// the smallest `written` limit of the warning and critical filters, capped
    /// by `scan_range`. `None` when neither filter depends on `written`.
    pub fn recheck_after(&self, scan_range: f64) -> Option<f64> {
        [self.warning_written_limit(), self.critical_written_limit()]
            .into_iter()
            .flatten()
            .reduce(f64::min)
            .map(|limit| limit.min(scan_range))
    }

    /// The parsed primary filter, if any.
    pub fn filter(&self) -> Option<&FilterNode> {
        self.filter.as_ref().map(BoundFilter::template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;

    fn event(event_id: u32, level: u8, written: f64) -> EventRecord {
        EventRecord {
            event_id,
            level,
            provider: "Service Control Manager".to_string(),
            channel: "System".to_string(),
            written,
            ..Default::default()
        }
    }

    fn events() -> Vec<EventRecord> {
        vec![
            event(1, 4, 7200.0),
            event(2, 3, 7200.0),
            event(3, 2, 7200.0),
            event(4, 1, 10.0),
            event(5, 3, 4000.0),
        ]
    }

    #[test]
    fn test_default_config() {
        let selection = EventSelection::new(&EventSelectionConfig::default()).unwrap();
        let events = events();
        let report = selection.evaluate(&events);

        // information event and the recent critical one fail the primary filter
        assert_eq!(report.counts.count, 3);
        assert_eq!(report.counts.warn_count, 2);
        assert_eq!(report.critical[0].event_id, 3);
        assert_eq!(report.status, Status::Critical);
        assert!(!selection.is_selected(&events[3]));
    }

    #[test]
    fn test_critical_wins_over_warning() {
        let selection = EventSelection::new(&EventSelectionConfig {
            filter: String::new(),
            warning: "level <= 3".to_string(),
            critical: "event_id == 3".to_string(),
        })
        .unwrap();

        assert_eq!(selection.event_status(&event(3, 2, 0.0)), Status::Critical);
        assert_eq!(selection.event_status(&event(2, 2, 0.0)), Status::Warning);
        assert_eq!(selection.event_status(&event(2, 4, 0.0)), Status::Ok);
    }

    #[test]
    fn test_recent_events_only() {
        let selection = EventSelection::new(&EventSelectionConfig {
            filter: "written < 1h".to_string(),
            warning: "level == 'warning' and written > -2s".to_string(),
            critical: "level == 'error' and written > -60m".to_string(),
        })
        .unwrap();
        let events = vec![event(1, 3, 1.0), event(2, 3, 5.0), event(3, 4, 1.0)];
        let report = selection.evaluate(&events);

        assert_eq!(report.counts.count, 3);
        assert_eq!(report.warning.len(), 1);
        assert_eq!(report.warning[0].event_id, 1);
        assert_eq!(report.ok.len(), 2);
        assert_eq!(report.status, Status::Warning);

        assert_eq!(selection.warning_written_limit(), Some(2.0));
        assert_eq!(selection.critical_written_limit(), Some(3600.0));
        assert_eq!(selection.recheck_after(86400.0), Some(2.0));
        assert_eq!(selection.recheck_after(1.0), Some(1.0));
    }

    #[test]
    fn test_no_written_dependency() {
        let selection = EventSelection::new(&EventSelectionConfig::default()).unwrap();
        assert_eq!(selection.warning_written_limit(), None);
        assert_eq!(selection.recheck_after(3600.0), None);
        assert!(selection.filter().is_some());
    }

    #[test]
    fn test_nothing_selected_is_ok() {
        let selection = EventSelection::new(&EventSelectionConfig::default()).unwrap();
        let report = selection.evaluate(&[]);
        assert_eq!(report.counts, EventCounts::default());
        assert_eq!(report.status, Status::Ok);
    }

    #[test]
    fn test_invalid_filters() {
        let result = EventSelection::new(&EventSelectionConfig {
            critical: "level in ('error',".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FilterError::Parse(_))));

        let result = EventSelection::new(&EventSelectionConfig {
            warning: "keywords == 'classic'".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(FilterError::Bind(_))));
    }

    #[test]
    fn test_config_from_yaml() {
        let config =
            EventSelectionConfig::from_yaml_str("critical: \"event_id in (7031, 7034)\"\n").unwrap();
        assert_eq!(config.critical, "event_id in (7031, 7034)");
        assert_eq!(config.warning, "level == 'warning'");
        assert!(EventSelection::new(&config).is_ok());
        assert!(EventSelectionConfig::from_yaml_str("warn: x").is_err());
    }
}
