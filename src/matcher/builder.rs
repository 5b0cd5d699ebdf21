//! Checker builder protocol.
//!
//! A [`CheckerBuilder`] knows the fields of one record type. Binding walks a
//! parsed tree and asks the builder about every leaf; the builder answers with
//! a [`Binding`]: a checker, `Disabled` for labels that are tolerated but
//! meaningless for this record type, or a [`BindError`].
//!
//! The free functions below build checkers out of field getters so builders
//! rarely need to write comparison closures by hand.

use crate::ast::{Cmp, InRule, SetMembership, StrCmp, StringCompare, ValueCompare};
use crate::error::BindError;
use crate::matcher::types::{BindResult, Checker, NumberGetter, TextGetter};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Domain specific label resolver.
///
/// `bind_value` receives the leaf mutably so the builder can normalise its
/// threshold (durations, byte sizes, negative ages) before capturing it. The
/// normalised leaf is what the bound filter displays afterwards.
///
/// # Example
/// ```rust
/// use check_filter::{
///     number_checker, parse, BindError, Binding, BoundFilter, CheckerBuilder, SetMembership,
///     StringCompare, ValueCompare,
/// };
/// use std::sync::Arc;
///
/// struct Disk { used: f64 }
///
/// struct DiskBuilder;
///
/// impl CheckerBuilder<Disk> for DiskBuilder {
///     fn bind_value(&self, leaf: &mut ValueCompare) -> Result<Binding<Disk>, BindError> {
///         match leaf.label.as_str() {
///             "used" => Ok(Binding::Checker(number_checker(
///                 Arc::new(|d: &Disk| d.used),
///                 leaf.comparator,
///                 leaf.threshold,
///             ))),
///             other => Err(BindError::UnknownLabel(other.to_string())),
///         }
///     }
///
///     fn bind_string(&self, leaf: &StringCompare) -> Result<Binding<Disk>, BindError> {
///         Err(BindError::unsupported(&leaf.label, "string comparison"))
///     }
///
///     fn bind_set(&self, leaf: &SetMembership) -> Result<Binding<Disk>, BindError> {
///         Err(BindError::unsupported(&leaf.label, "set membership"))
///     }
/// }
///
/// let filter = BoundFilter::bind(&parse("used > 90")?, &DiskBuilder)?;
/// assert!(filter.check(&Disk { used: 95.0 }));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait CheckerBuilder<R> {
    fn bind_value(&self, leaf: &mut ValueCompare) -> BindResult<R>;

    fn bind_string(&self, leaf: &StringCompare) -> BindResult<R>;

    fn bind_set(&self, leaf: &SetMembership) -> BindResult<R>;
}

/// `getter(record) OP threshold`
pub fn number_checker<R: 'static>(
    getter: NumberGetter<R>,
    comparator: Cmp,
    threshold: f64,
) -> Checker<R> {
    Arc::new(move |record: &R| comparator.apply(getter(record), threshold))
}

/// `getter(record) OP value`
pub fn text_checker<R: 'static>(
    getter: TextGetter<R>,
    comparator: StrCmp,
    value: impl Into<String>,
) -> Checker<R> {
    let value = value.into();
    Arc::new(move |record: &R| comparator.apply(getter(record), &value))
}

/// `getter(record) in values` (or `not_in`).
pub fn text_set_checker<R: 'static>(
    getter: TextGetter<R>,
    rule: InRule,
    values: BTreeSet<String>,
) -> Checker<R> {
    Arc::new(move |record: &R| rule.apply(values.contains(getter(record))))
}

/// Numeric set membership; every item must parse as a number. A unit attached
/// to an item is ignored.
pub fn number_set_checker<R: 'static>(
    label: &str,
    getter: NumberGetter<R>,
    rule: InRule,
    values: &BTreeSet<String>,
) -> Result<Checker<R>, BindError> {
    scaled_number_set_checker(label, getter, rule, values, |value, _unit| value)
}

/// Numeric set membership where each item's unit goes through `scale`, so
/// `creation in (1h, 2h)` compares against seconds.
pub fn scaled_number_set_checker<R, S>(
    label: &str,
    getter: NumberGetter<R>,
    rule: InRule,
    values: &BTreeSet<String>,
    scale: S,
) -> Result<Checker<R>, BindError>
where
    R: 'static,
    S: Fn(f64, &str) -> f64,
{
    let numbers = values
        .iter()
        .map(|value| {
            split_unit(value)
                .map(|(number, unit)| scale(number, unit))
                .ok_or_else(|| BindError::invalid_value(label, value.as_str(), "not a number"))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    Ok(Arc::new(move |record: &R| {
        let field = getter(record);
        rule.apply(numbers.iter().any(|number| *number == field))
    }))
}

/// `"1.5h"` -> `(1.5, "h")`
fn split_unit(item: &str) -> Option<(f64, &str)> {
    let item = item.trim();
    let split = item
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .unwrap_or(item.len());
    let (number, unit) = item.split_at(split);
    number.parse().ok().map(|number| (number, unit))
}
