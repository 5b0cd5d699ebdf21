//! Ready-made builders for the record types monitoring checks filter.
//!
//! - [`process`] - process snapshots, plus the count labels tolerated as
//!   disabled
//! - [`aggregate`] - counts of classified processes
//! - [`event_log`] - event log entries
//! - [`selection`] - the process check pipeline binding one expression
//!   against both records and counts
//! - [`event_selection`] - the event log check pipeline
//!
//! Collecting the records is left to the caller.

pub mod aggregate;
pub mod event_log;
pub mod event_selection;
pub mod process;
pub mod selection;

pub use aggregate::{aggregate_registry, ProcessCounts};
pub use event_log::{event_log_registry, written_limit, EventRecord};
pub use event_selection::{EventCounts, EventReport, EventSelection, EventSelectionConfig};
pub use process::{process_registry, ProcessRecord, ProcessState};
pub use selection::{ProcessSelection, SelectionConfig, SelectionReport, Status};
