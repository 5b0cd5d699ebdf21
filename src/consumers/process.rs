//! Process snapshot fields.

use crate::matcher::FieldRegistry;
use serde::{Deserialize, Serialize};

/// Run state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    #[default]
    Started,
    /// Started but not responding.
    Hung,
    /// Its details could not be read (access denied, exited mid-collection).
    Unreadable,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Hung => "hung",
            Self::Unreadable => "unreadable",
        }
    }
}

/// One process as seen by a collection pass.
///
/// Times are in seconds, sizes in bytes. `creation` is the age of the process
/// at collection time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessRecord {
    pub pid: u32,
    pub exe: String,
    pub filename: String,
    pub state: ProcessState,
    pub creation: f64,

    pub gdi_handles: u32,
    pub user_handles: u32,
    pub handles: u32,

    pub kernel: f64,
    pub user: f64,
    pub kernel_percent: f64,
    pub user_percent: f64,

    pub virtual_size: u64,
    pub peak_virtual: u64,
    pub pagefile: u64,
    pub peak_pagefile: u64,
    pub working_set: u64,
    pub peak_working_set: u64,
}

impl ProcessRecord {
    pub fn new(pid: u32, exe: impl Into<String>) -> Self {
        Self {
            pid,
            exe: exe.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = state;
        self
    }

    /// Total CPU time.
    pub fn time(&self) -> f64 {
        self.kernel + self.user
    }

    pub fn time_percent(&self) -> f64 {
        self.kernel_percent + self.user_percent
    }
}

/// Labels resolved against a [`ProcessRecord`].
pub const PROCESS_LABELS: &[&str] = &[
    "pid",
    "exe",
    "filename",
    "state",
    "status",
    "creation",
    "gdi_handles",
    "user_handles",
    "handles",
    "kernel",
    "user",
    "time",
    "kernel_percent",
    "user_percent",
    "time_percent",
    "virtual",
    "peak_virtual",
    "pagefile",
    "peak_pagefile",
    "working_set",
    "peak_working_set",
];

/// Aggregate labels, meaningful only once all processes are classified.
pub const COUNT_LABELS: &[&str] = &["count", "ok_count", "warn_count", "crit_count"];

/// Builder for per-process filters.
///
/// `status` is accepted as a synonym of `state`. Count labels bind as disabled
/// so a warning or critical expression can mix both kinds.
pub fn process_registry() -> FieldRegistry<ProcessRecord> {
    let mut registry = FieldRegistry::new();
    registry
        .register_number("pid", |p: &ProcessRecord| f64::from(p.pid))
        .register_string("exe", |p: &ProcessRecord| p.exe.as_str())
        .register_string("filename", |p: &ProcessRecord| p.filename.as_str())
        .register_string("state", |p: &ProcessRecord| p.state.as_str())
        .register_string("status", |p: &ProcessRecord| p.state.as_str())
        .register_duration("creation", |p: &ProcessRecord| p.creation)
        .register_number("gdi_handles", |p: &ProcessRecord| f64::from(p.gdi_handles))
        .register_number("user_handles", |p: &ProcessRecord| f64::from(p.user_handles))
        .register_number("handles", |p: &ProcessRecord| f64::from(p.handles))
        .register_number("kernel", |p: &ProcessRecord| p.kernel)
        .register_number("user", |p: &ProcessRecord| p.user)
        .register_number("time", ProcessRecord::time)
        .register_number("kernel_percent", |p: &ProcessRecord| p.kernel_percent)
        .register_number("user_percent", |p: &ProcessRecord| p.user_percent)
        .register_number("time_percent", ProcessRecord::time_percent)
        .register_bytes("virtual", |p: &ProcessRecord| p.virtual_size as f64)
        .register_bytes("peak_virtual", |p: &ProcessRecord| p.peak_virtual as f64)
        .register_bytes("pagefile", |p: &ProcessRecord| p.pagefile as f64)
        .register_bytes("peak_pagefile", |p: &ProcessRecord| p.peak_pagefile as f64)
        .register_bytes("working_set", |p: &ProcessRecord| p.working_set as f64)
        .register_bytes("peak_working_set", |p: &ProcessRecord| {
            p.peak_working_set as f64
        });
    for label in COUNT_LABELS {
        registry.tolerate(label);
    }
    registry
}
