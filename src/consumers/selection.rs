//! Process check classification.
//!
//! A process check selects processes with `filter` minus `exclude`, marks each
//! selected process ok, warning or critical, then decides the check status
//! from the per-process results and the counts.
//!
//! `warning` and `critical` may mix per-process labels with count labels
//! (`state != 'started' || count == 0`). Each is parsed once and bound twice:
//! against [`ProcessRecord`] (count leaves disabled) and against
//! [`ProcessCounts`] (process leaves disabled). A binding left without any
//! enabled leaf is ignored.

use super::aggregate::{aggregate_registry, ProcessCounts};
use super::process::{process_registry, ProcessRecord};
use crate::ast::FilterNode;
use crate::compiler::FilterCompiler;
use crate::error::{FilterError, Result};
use crate::matcher::{BoundFilter, FieldRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Check status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

/// Filter strings of a process check. Empty strings mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// **Default**: `state = 'started'`
    pub filter: String,
    pub exclude: String,
    /// **Default**: `state != 'started'`
    pub warning: String,
    /// **Default**: `count = 0`
    pub critical: String,
    pub warning_rules: String,
    pub critical_rules: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            filter: "state = 'started'".to_string(),
            exclude: String::new(),
            warning: "state != 'started'".to_string(),
            critical: "count = 0".to_string(),
            warning_rules: String::new(),
            critical_rules: String::new(),
        }
    }
}

impl SelectionConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// A threshold bound against records and against counts.
struct Threshold {
    per_process: Option<BoundFilter<ProcessRecord>>,
    aggregate: Option<BoundFilter<ProcessCounts>>,
}

impl Threshold {
    fn new(
        tree: Option<FilterNode>,
        processes: &FieldRegistry<ProcessRecord>,
        counts: &FieldRegistry<ProcessCounts>,
    ) -> Result<Self> {
        let Some(tree) = tree else {
            return Ok(Self {
                per_process: None,
                aggregate: None,
            });
        };
        let per_process = tree.bind(processes)?;
        let aggregate = tree.bind(counts)?;
        Ok(Self {
            per_process: per_process.has_enabled_leaves().then_some(per_process),
            aggregate: aggregate.has_enabled_leaves().then_some(aggregate),
        })
    }

    fn matches_process(&self, process: &ProcessRecord) -> bool {
        self.per_process
            .as_ref()
            .is_some_and(|filter| filter.check(process))
    }

    fn matches_counts(&self, counts: &ProcessCounts) -> bool {
        self.aggregate
            .as_ref()
            .is_some_and(|filter| filter.check(counts))
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport<'a> {
    pub status: Status,
    pub counts: ProcessCounts,
    pub ok: Vec<&'a ProcessRecord>,
    pub warning: Vec<&'a ProcessRecord>,
    pub critical: Vec<&'a ProcessRecord>,
}

/// Bound filters of a process check.
pub struct ProcessSelection {
    filter: Option<BoundFilter<ProcessRecord>>,
    exclude: Option<BoundFilter<ProcessRecord>>,
    warning: Threshold,
    critical: Threshold,
    warning_rules: Option<BoundFilter<ProcessCounts>>,
    critical_rules: Option<BoundFilter<ProcessCounts>>,
}

impl ProcessSelection {
    /// Parse and bind every filter of `config` with the default compiler.
    pub fn new(config: &SelectionConfig) -> Result<Self> {
        Self::with_compiler(config, &FilterCompiler::new())
    }

    pub fn with_compiler(config: &SelectionConfig, compiler: &FilterCompiler) -> Result<Self> {
        let processes = process_registry();
        let counts = aggregate_registry();

        let parse = |text: &str| -> Result<Option<FilterNode>> {
            if text.trim().is_empty() {
                Ok(None)
            } else {
                Ok(Some(compiler.parse(text)?))
            }
        };
        let bind_processes = |text: &str| -> Result<Option<BoundFilter<ProcessRecord>>> {
            parse(text)?
                .map(|tree| bind_with(&tree, &processes, compiler))
                .transpose()
        };
        let bind_counts = |text: &str| -> Result<Option<BoundFilter<ProcessCounts>>> {
            parse(text)?
                .map(|tree| bind_with(&tree, &counts, compiler))
                .transpose()
        };

        let selection = Self {
            filter: bind_processes(&config.filter)?,
            exclude: bind_processes(&config.exclude)?,
            warning: Threshold::new(parse(&config.warning)?, &processes, &counts)?,
            critical: Threshold::new(parse(&config.critical)?, &processes, &counts)?,
            warning_rules: bind_counts(&config.warning_rules)?,
            critical_rules: bind_counts(&config.critical_rules)?,
        };
        info!(
            filter = %config.filter,
            exclude = %config.exclude,
            warning = %config.warning,
            critical = %config.critical,
            "process selection ready"
        );
        Ok(selection)
    }

    /// Whether `process` passes `filter` and is not excluded.
    pub fn is_selected(&self, process: &ProcessRecord) -> bool {
        self.filter.as_ref().map_or(true, |f| f.check(process))
            && !self.exclude.as_ref().is_some_and(|f| f.check(process))
    }

    /// Status of a single selected process.
    pub fn process_status(&self, process: &ProcessRecord) -> Status {
        if self.critical.matches_process(process) {
            Status::Critical
        } else if self.warning.matches_process(process) {
            Status::Warning
        } else {
            Status::Ok
        }
    }

    /// Classify `processes` and compute the check status.
    pub fn evaluate<'a>(&self, processes: &'a [ProcessRecord]) -> SelectionReport<'a> {
        let selected: Vec<&ProcessRecord> = match &self.filter {
            Some(filter) => filter.matching_par(processes),
            None => processes.iter().collect(),
        };

        let mut report = SelectionReport {
            status: Status::Ok,
            counts: ProcessCounts::default(),
            ok: Vec::new(),
            warning: Vec::new(),
            critical: Vec::new(),
        };

        for process in selected {
            if self.exclude.as_ref().is_some_and(|f| f.check(process)) {
                continue;
            }
            match self.process_status(process) {
                Status::Ok => report.ok.push(process),
                Status::Warning => report.warning.push(process),
                Status::Critical => report.critical.push(process),
            }
        }

        report.counts = ProcessCounts {
            count: report.ok.len() + report.warning.len() + report.critical.len(),
            ok_count: report.ok.len(),
            warn_count: report.warning.len(),
            crit_count: report.critical.len(),
        };
        report.status = self.status_of(&report.counts);

        debug!(
            status = ?report.status,
            count = report.counts.count,
            warn_count = report.counts.warn_count,
            crit_count = report.counts.crit_count,
            "processes classified"
        );
        report
    }

    /// Check status from the counts of a classification pass.
    pub fn status_of(&self, counts: &ProcessCounts) -> Status {
        let matches = |rules: &Option<BoundFilter<ProcessCounts>>| {
            rules.as_ref().is_some_and(|f| f.check(counts))
        };

        if counts.crit_count > 0
            || self.critical.matches_counts(counts)
            || matches(&self.critical_rules)
        {
            Status::Critical
        } else if counts.warn_count > 0
            || self.warning.matches_counts(counts)
            || matches(&self.warning_rules)
        {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

fn bind_with<R>(
    tree: &FilterNode,
    registry: &FieldRegistry<R>,
    compiler: &FilterCompiler,
) -> Result<BoundFilter<R>>
where
    R: 'static,
{
    let bound = tree.bind(registry).map_err(FilterError::from)?;
    Ok(bound.with_config(compiler.config().clone()))
}
