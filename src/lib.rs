//! # Check Filter
//!
//! Filter expression engine for monitoring checks. An operator writes a rule
//! such as `exe == 'sshd' && (time_percent > 50% || state != 'started')`; the
//! engine parses it once, binds its labels to the fields of a record type, and
//! evaluates it against every candidate record of each check cycle.
//!
//! ## Quick Start
//!
//! ### Parse, bind, check
//!
//! ```rust
//! use check_filter::consumers::{process_registry, ProcessRecord};
//! use check_filter::parse;
//!
//! let tree = parse("pid=55 && gdi_handles > 0 && gdi_handles <= 1")?;
//! let filter = tree.bind(&process_registry())?;
//!
//! let mut record = ProcessRecord::new(55, "explorer.exe");
//! record.gdi_handles = 1;
//! assert!(filter.check(&record));
//!
//! record.gdi_handles = 2;
//! assert!(!filter.check(&record));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Your own record type
//!
//! ```rust
//! use check_filter::{FieldRegistry, FilterCompiler, FilterConfig};
//!
//! struct Disk { mount: String, free: u64 }
//!
//! let mut registry = FieldRegistry::<Disk>::new();
//! registry
//!     .register_string("mount", |d: &Disk| d.mount.as_str())
//!     .register_bytes("free", |d: &Disk| d.free as f64);
//!
//! let compiler = FilterCompiler::with_config(FilterConfig::new().with_max_depth(8));
//! let filter = compiler.compile("mount in ('/', '/var') and free < 1g", &registry)?;
//!
//! let disk = Disk { mount: "/var".into(), free: 512 * 1024 * 1024 };
//! assert!(filter.check(&disk));
//! # Ok::<(), check_filter::FilterError>(())
//! ```
//!
//! ## Grammar
//!
//! - numeric comparison: `label OP number[unit]` or `number[unit] OP label`,
//!   with `OP` one of `< <= > >= == = !=`
//! - string comparison: `label == 'text'`, `label != 'text'`
//! - set membership: `label in (a, 'b', "c")`, `label not_in (...)`
//! - `&&`/`and` binds tighter than `||`/`or`; parentheses group
//!
//! Units are free-form; builders decide which labels scale them (durations to
//! seconds, sizes to bytes).
//!
//! ## Disabled leaves
//!
//! A builder may tolerate a label it cannot evaluate. Such leaves are skipped:
//! they count as `true` under `&&` and as `false` under `||`, which lets one
//! expression be bound against several record types. A parenthesized group
//! made only of disabled leaves is skipped as a whole.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod consumers;
pub mod error;
pub mod matcher;

pub use ast::{
    Cmp, Combinator, FilterNode, InRule, LogicalOp, SetMembership, StrCmp, StringCompare,
    ValueCompare,
};
pub use compiler::{parse, FilterCompiler};
pub use config::FilterConfig;
pub use error::{BindError, FilterError, ParseError, Result};
pub use matcher::{
    number_checker, number_set_checker, scaled_number_set_checker, text_checker, text_getter,
    text_set_checker, BindResult, Binding, BoundFilter, Checker, CheckerBuilder, FieldRegistry,
};
