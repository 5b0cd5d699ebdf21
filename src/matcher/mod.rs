//! Checker binding and evaluation.
//!
//! Parsing yields a [`FilterNode`](crate::FilterNode) that knows nothing about
//! records. This module turns it into something that can answer "does this
//! record match":
//!
//! - [`CheckerBuilder`] - resolves a leaf label into a [`Checker`] for one
//!   record type, or declares it disabled
//! - [`FieldRegistry`] - registry pattern builder: register a getter per
//!   label, get a `CheckerBuilder`
//! - [`BoundFilter`] - the bound tree, evaluated once per record
//! - [`normalize`] - unit scaling applied by builders to specific labels
//!
//! ## Example Usage
//!
//! ```rust
//! use check_filter::{parse, FieldRegistry};
//!
//! struct Proc { pid: u32, exe: String }
//!
//! let mut registry = FieldRegistry::<Proc>::new();
//! registry
//!     .register_number("pid", |p: &Proc| f64::from(p.pid))
//!     .register_string("exe", |p: &Proc| p.exe.as_str());
//!
//! let filter = parse("exe in ('sshd', 'cron') && pid > 1")?.bind(&registry)?;
//! let procs = vec![
//!     Proc { pid: 1, exe: "sshd".into() },
//!     Proc { pid: 80, exe: "cron".into() },
//! ];
//! assert_eq!(filter.matching(&procs).len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bound;
pub mod builder;
pub mod normalize;
pub mod registry;
pub mod types;

pub use bound::{BoundFilter, BoundLeaf, BoundNode, LeafState};
pub use builder::{
    number_checker, number_set_checker, scaled_number_set_checker, text_checker,
    text_set_checker, CheckerBuilder,
};
pub use registry::FieldRegistry;
pub use types::{text_getter, BindResult, Binding, Checker, NumberGetter, TextGetter};
