//! Core type definitions shared by builders and bound filters.

use crate::error::BindError;
use std::sync::Arc;

/// Bound predicate evaluating one leaf against a record.
///
/// Checkers are built once at bind time and called for every record, so they
/// should only read from the record.
///
/// # Example
/// ```rust
/// use check_filter::Checker;
/// use std::sync::Arc;
///
/// struct Proc { pid: u32 }
///
/// let is_init: Checker<Proc> = Arc::new(|p: &Proc| p.pid == 1);
/// assert!(is_init(&Proc { pid: 1 }));
/// ```
pub type Checker<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Numeric field accessor.
pub type NumberGetter<R> = Arc<dyn Fn(&R) -> f64 + Send + Sync>;

/// String field accessor borrowing from the record.
pub type TextGetter<R> = Arc<dyn for<'a> Fn(&'a R) -> &'a str + Send + Sync>;

/// Box a string accessor.
///
/// Closures returning a borrow of their argument need their signature pinned
/// by a bound, which this function provides.
pub fn text_getter<R, F>(getter: F) -> TextGetter<R>
where
    F: Fn(&R) -> &str + Send + Sync + 'static,
{
    Arc::new(getter)
}

/// Outcome of asking a builder about one leaf.
pub enum Binding<R> {
    /// The leaf is evaluated with this checker.
    Checker(Checker<R>),
    /// The label is known but meaningless for this record type; the leaf is
    /// skipped during evaluation.
    Disabled,
}

impl<R> Binding<R> {
    /// Wrap a closure into an enabled binding.
    pub fn checker<F>(check: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Binding::Checker(Arc::new(check))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Binding::Disabled)
    }
}

impl<R> Clone for Binding<R> {
    fn clone(&self) -> Self {
        match self {
            Binding::Checker(checker) => Binding::Checker(Arc::clone(checker)),
            Binding::Disabled => Binding::Disabled,
        }
    }
}

impl<R> std::fmt::Debug for Binding<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Checker(_) => f.write_str("Checker(..)"),
            Binding::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Result of a bind step.
pub type BindResult<R> = Result<Binding<R>, BindError>;
