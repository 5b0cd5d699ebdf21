//! Label registry implementing [`CheckerBuilder`].

use crate::ast::{SetMembership, StringCompare, ValueCompare};
use crate::error::BindError;
use crate::matcher::builder::{
    number_checker, scaled_number_set_checker, text_checker, text_set_checker, CheckerBuilder,
};
use crate::matcher::normalize::{normalize_bytes, normalize_duration};
use crate::matcher::types::{text_getter, BindResult, Binding, NumberGetter};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type ValueHandler<R> = Arc<dyn Fn(&mut ValueCompare) -> BindResult<R> + Send + Sync>;
type StringHandler<R> = Arc<dyn Fn(&StringCompare) -> BindResult<R> + Send + Sync>;
type SetHandler<R> = Arc<dyn Fn(&SetMembership) -> BindResult<R> + Send + Sync>;

/// How numeric thresholds of a label are normalised before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Plain,
    /// Seconds, negative thresholds read as "ago".
    Duration,
    Bytes,
}

impl Scale {
    /// Value of a set item, in the label's base unit.
    fn apply(self, value: f64, unit: &str) -> f64 {
        match self {
            Scale::Plain => value,
            Scale::Duration => normalize_duration(value, unit).0,
            Scale::Bytes => normalize_bytes(value, unit).0,
        }
    }
}

struct FieldEntry<R> {
    value: Option<ValueHandler<R>>,
    string: Option<StringHandler<R>>,
    set: Option<SetHandler<R>>,
}

impl<R> Default for FieldEntry<R> {
    fn default() -> Self {
        Self {
            value: None,
            string: None,
            set: None,
        }
    }
}

/// Builder for checker tables, one getter per label.
///
/// Registering a numeric field covers `label OP number` and numeric
/// `label in (...)`; a string field covers `label == '...'` and string sets.
/// The `register_custom_*` methods override a single leaf kind for labels whose
/// semantics do not fit the plain getters.
///
/// # Example
/// ```rust
/// use check_filter::{parse, BoundFilter, FieldRegistry};
///
/// struct Service { name: String, restarts: u32 }
///
/// let mut registry = FieldRegistry::<Service>::new();
/// registry
///     .register_string("name", |s: &Service| s.name.as_str())
///     .register_number("restarts", |s: &Service| f64::from(s.restarts))
///     .tolerate("count");
///
/// let filter = BoundFilter::bind(&parse("name == 'cron' && restarts > 2")?, &registry)?;
/// assert!(filter.check(&Service { name: "cron".into(), restarts: 3 }));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FieldRegistry<R> {
    fields: HashMap<String, FieldEntry<R>>,
    tolerated: HashSet<String>,
}

impl<R: 'static> FieldRegistry<R> {
    /// Create an empty registry: every label is unknown.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
            tolerated: HashSet::new(),
        }
    }

    /// Register a plain numeric field.
    pub fn register_number<F>(&mut self, label: &str, getter: F) -> &mut Self
    where
        F: Fn(&R) -> f64 + Send + Sync + 'static,
    {
        self.register_numeric(label, Arc::new(getter), Scale::Plain)
    }

    /// Register an elapsed-time field, in seconds.
    ///
    /// Thresholds are converted to seconds and a negative threshold flips the
    /// comparator, so `creation > -1h` matches records younger than an hour.
    pub fn register_duration<F>(&mut self, label: &str, getter: F) -> &mut Self
    where
        F: Fn(&R) -> f64 + Send + Sync + 'static,
    {
        self.register_numeric(label, Arc::new(getter), Scale::Duration)
    }

    /// Register a size field, in bytes. `k`, `m` and `g` units are powers of 1024,
    /// in comparisons and in set items alike.
    pub fn register_bytes<F>(&mut self, label: &str, getter: F) -> &mut Self
    where
        F: Fn(&R) -> f64 + Send + Sync + 'static,
    {
        self.register_numeric(label, Arc::new(getter), Scale::Bytes)
    }

    fn register_numeric(&mut self, label: &str, getter: NumberGetter<R>, scale: Scale) -> &mut Self {
        let value_getter = Arc::clone(&getter);
        let value: ValueHandler<R> = Arc::new(move |leaf: &mut ValueCompare| -> BindResult<R> {
            match scale {
                Scale::Plain => {}
                Scale::Duration => {
                    leaf.normalize_duration();
                    leaf.normalize_negative_threshold();
                }
                Scale::Bytes => leaf.normalize_bytes(),
            }
            Ok(Binding::Checker(number_checker(
                Arc::clone(&value_getter),
                leaf.comparator,
                leaf.threshold,
            )))
        });
        let set: SetHandler<R> = Arc::new(move |leaf: &SetMembership| -> BindResult<R> {
            scaled_number_set_checker(
                &leaf.label,
                Arc::clone(&getter),
                leaf.rule,
                &leaf.values,
                |value, unit| scale.apply(value, unit),
            )
            .map(Binding::Checker)
        });

        let entry = self.fields.entry(label.to_string()).or_default();
        entry.value = Some(value);
        entry.set = Some(set);
        self
    }

    /// Register a string field.
    pub fn register_string<F>(&mut self, label: &str, getter: F) -> &mut Self
    where
        F: Fn(&R) -> &str + Send + Sync + 'static,
    {
        let getter = text_getter(getter);
        let string_getter = Arc::clone(&getter);
        let string: StringHandler<R> = Arc::new(move |leaf: &StringCompare| -> BindResult<R> {
            Ok(Binding::Checker(text_checker(
                Arc::clone(&string_getter),
                leaf.comparator,
                leaf.value.as_str(),
            )))
        });
        let set: SetHandler<R> = Arc::new(move |leaf: &SetMembership| -> BindResult<R> {
            Ok(Binding::Checker(text_set_checker(
                Arc::clone(&getter),
                leaf.rule,
                leaf.values.clone(),
            )))
        });

        let entry = self.fields.entry(label.to_string()).or_default();
        entry.string = Some(string);
        entry.set = Some(set);
        self
    }

    /// Override how `label OP number` binds for `label`.
    pub fn register_custom_value<F>(&mut self, label: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut ValueCompare) -> BindResult<R> + Send + Sync + 'static,
    {
        self.fields.entry(label.to_string()).or_default().value = Some(Arc::new(handler));
        self
    }

    /// Override how `label == '...'` binds for `label`.
    pub fn register_custom_string<F>(&mut self, label: &str, handler: F) -> &mut Self
    where
        F: Fn(&StringCompare) -> BindResult<R> + Send + Sync + 'static,
    {
        self.fields.entry(label.to_string()).or_default().string = Some(Arc::new(handler));
        self
    }

    /// Override how `label in (...)` binds for `label`.
    pub fn register_custom_set<F>(&mut self, label: &str, handler: F) -> &mut Self
    where
        F: Fn(&SetMembership) -> BindResult<R> + Send + Sync + 'static,
    {
        self.fields.entry(label.to_string()).or_default().set = Some(Arc::new(handler));
        self
    }

    /// Accept `label` without checking it: its leaves bind as disabled.
    pub fn tolerate(&mut self, label: &str) -> &mut Self {
        self.tolerated.insert(label.to_string());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.fields.contains_key(label)
    }

    pub fn is_tolerated(&self, label: &str) -> bool {
        self.tolerated.contains(label)
    }

    /// Number of registered (not tolerated) labels.
    pub fn label_count(&self) -> usize {
        self.fields.len()
    }

    fn entry(&self, label: &str) -> Result<Option<&FieldEntry<R>>, BindError> {
        match self.fields.get(label) {
            Some(entry) => Ok(Some(entry)),
            None if self.tolerated.contains(label) => Ok(None),
            None => Err(BindError::UnknownLabel(label.to_string())),
        }
    }
}

impl<R: 'static> Default for FieldRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> CheckerBuilder<R> for FieldRegistry<R> {
    fn bind_value(&self, leaf: &mut ValueCompare) -> BindResult<R> {
        match self.entry(&leaf.label)? {
            None => Ok(Binding::Disabled),
            Some(FieldEntry {
                value: Some(handler),
                ..
            }) => handler(leaf),
            Some(_) => Err(BindError::unsupported(&leaf.label, "numeric comparison")),
        }
    }

    fn bind_string(&self, leaf: &StringCompare) -> BindResult<R> {
        match self.entry(&leaf.label)? {
            None => Ok(Binding::Disabled),
            Some(FieldEntry {
                string: Some(handler),
                ..
            }) => handler(leaf),
            Some(_) => Err(BindError::unsupported(&leaf.label, "string comparison")),
        }
    }

    fn bind_set(&self, leaf: &SetMembership) -> BindResult<R> {
        match self.entry(&leaf.label)? {
            None => Ok(Binding::Disabled),
            Some(FieldEntry { set: Some(handler), .. }) => handler(leaf),
            Some(_) => Err(BindError::unsupported(&leaf.label, "set membership")),
        }
    }
}
