//! Parsed filter tree.
//!
//! A [`FilterNode`] is pure data: the output of the parser and the template
//! consumers clone and bind. It never holds checkers; binding produces a
//! separate [`BoundFilter`](crate::BoundFilter).

use crate::matcher::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Numeric comparator, always read as `label OP threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    /// Comparator to use once both operands swap sides (`5 < x` is `x > 5`).
    pub fn flip(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Gt => Self::Lt,
            Self::Le => Self::Ge,
            Self::Ge => Self::Le,
            Self::Eq | Self::Ne => self,
        }
    }

    /// Evaluate `field OP threshold`.
    #[inline]
    pub fn apply(self, field: f64, threshold: f64) -> bool {
        match self {
            Self::Eq => field == threshold,
            Self::Ne => field != threshold,
            Self::Lt => field < threshold,
            Self::Le => field <= threshold,
            Self::Gt => field > threshold,
            Self::Ge => field >= threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrCmp {
    Eq,
    Ne,
}

impl StrCmp {
    #[inline]
    pub fn apply(self, field: &str, value: &str) -> bool {
        match self {
            Self::Eq => field == value,
            Self::Ne => field != value,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

impl fmt::Display for StrCmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set membership rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InRule {
    In,
    NotIn,
}

impl InRule {
    /// Turn a raw "value is in the set" answer into the leaf result.
    #[inline]
    pub fn apply(self, contained: bool) -> bool {
        match self {
            Self::In => contained,
            Self::NotIn => !contained,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "not_in",
        }
    }
}

impl fmt::Display for InRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical operator shared by every direct child of a combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric comparison of a field against a threshold, e.g. `foo > 10.5ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCompare {
    pub label: String,
    pub comparator: Cmp,
    pub threshold: f64,
    /// Free-form unit suffix, empty when absent.
    #[serde(default)]
    pub unit: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

impl ValueCompare {
    pub fn new(
        label: impl Into<String>,
        comparator: Cmp,
        threshold: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            comparator,
            threshold,
            unit: unit.into(),
            enabled: true,
        }
    }

    /// Build from the `value OP label` surface form; the stored comparator
    /// still reads `label OP value`.
    pub fn reversed(
        threshold: f64,
        unit: impl Into<String>,
        comparator: Cmp,
        label: impl Into<String>,
    ) -> Self {
        Self::new(label, comparator.flip(), threshold, unit)
    }

    /// Convert the threshold to seconds according to its unit.
    pub fn normalize_duration(&mut self) {
        let (threshold, unit) = normalize::normalize_duration(self.threshold, &self.unit);
        self.threshold = threshold;
        self.unit = unit.to_string();
    }

    /// Convert the threshold to bytes according to its unit.
    pub fn normalize_bytes(&mut self) {
        let (threshold, unit) = normalize::normalize_bytes(self.threshold, &self.unit);
        self.threshold = threshold;
        self.unit = unit.to_string();
    }

    /// Turn a negative ("in the past") threshold into its magnitude and
    /// invert the comparator accordingly.
    pub fn normalize_negative_threshold(&mut self) {
        let (threshold, comparator) =
            normalize::normalize_negative_threshold(self.threshold, self.comparator);
        self.threshold = threshold;
        self.comparator = comparator;
    }
}

/// String equality test, e.g. `exe == 'sshd'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringCompare {
    pub label: String,
    pub comparator: StrCmp,
    pub value: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

impl StringCompare {
    pub fn new(label: impl Into<String>, comparator: StrCmp, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            comparator,
            value: value.into(),
            enabled: true,
        }
    }
}

/// Set membership test, e.g. `provider in ('a', 'b')`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMembership {
    pub label: String,
    pub rule: InRule,
    pub values: BTreeSet<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

impl SetMembership {
    pub fn new<I, S>(label: impl Into<String>, rule: InRule, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            rule,
            values: values.into_iter().map(Into::into).collect(),
            enabled: true,
        }
    }
}

/// Inner node: every child is combined with the same operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combinator {
    pub operator: LogicalOp,
    pub children: Vec<FilterNode>,
}

impl Combinator {
    /// Build a combinator node, collapsing a single child into itself.
    pub fn collapse(operator: LogicalOp, mut children: Vec<FilterNode>) -> FilterNode {
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        FilterNode::Combinator(Combinator { operator, children })
    }
}

fn enabled_default() -> bool {
    true
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    ValueCompare(ValueCompare),
    StringCompare(StringCompare),
    SetMembership(SetMembership),
    Combinator(Combinator),
}

impl FilterNode {
    /// Shorthand for `Combinator::collapse(LogicalOp::And, children)`.
    pub fn and(children: Vec<FilterNode>) -> Self {
        Combinator::collapse(LogicalOp::And, children)
    }

    /// Shorthand for `Combinator::collapse(LogicalOp::Or, children)`.
    pub fn or(children: Vec<FilterNode>) -> Self {
        Combinator::collapse(LogicalOp::Or, children)
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, FilterNode::Combinator(_))
    }

    /// Label of a leaf, `None` for combinators.
    pub fn label(&self) -> Option<&str> {
        match self {
            FilterNode::ValueCompare(leaf) => Some(&leaf.label),
            FilterNode::StringCompare(leaf) => Some(&leaf.label),
            FilterNode::SetMembership(leaf) => Some(&leaf.label),
            FilterNode::Combinator(_) => None,
        }
    }

    /// Calls `visitor` on every node, parents before children.
    pub fn visit<F>(&self, visitor: &mut F)
    where
        F: FnMut(&FilterNode),
    {
        visitor(self);
        if let FilterNode::Combinator(comb) = self {
            for child in &comb.children {
                child.visit(visitor);
            }
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |node| {
            if node.is_leaf() {
                count += 1;
            }
        });
        count
    }

    /// Distinct labels used by the tree.
    pub fn labels(&self) -> BTreeSet<&str> {
        let mut labels = BTreeSet::new();
        self.collect_labels(&mut labels);
        labels
    }

    fn collect_labels<'a>(&'a self, labels: &mut BTreeSet<&'a str>) {
        match self {
            FilterNode::Combinator(comb) => {
                for child in &comb.children {
                    child.collect_labels(labels);
                }
            }
            leaf => {
                if let Some(label) = leaf.label() {
                    labels.insert(label);
                }
            }
        }
    }

    /// Human readable reconstruction, used in logs.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl From<ValueCompare> for FilterNode {
    fn from(leaf: ValueCompare) -> Self {
        FilterNode::ValueCompare(leaf)
    }
}

impl From<StringCompare> for FilterNode {
    fn from(leaf: StringCompare) -> Self {
        FilterNode::StringCompare(leaf)
    }
}

impl From<SetMembership> for FilterNode {
    fn from(leaf: SetMembership) -> Self {
        FilterNode::SetMembership(leaf)
    }
}

impl From<Combinator> for FilterNode {
    fn from(comb: Combinator) -> Self {
        FilterNode::Combinator(comb)
    }
}

impl fmt::Display for ValueCompare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{}",
            self.label, self.comparator, self.threshold, self.unit
        )
    }
}

impl fmt::Display for StringCompare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.label, self.comparator, self.value)
    }
}

impl fmt::Display for SetMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (", self.label, self.rule)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if value.contains('\'') {
                write!(f, "\"{value}\"")?;
            } else {
                write!(f, "'{value}'")?;
            }
        }
        f.write_str(")")
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {}", self.operator)?;
            }
            write!(f, " {child}")?;
        }
        f.write_str(" )")
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::ValueCompare(leaf) => fmt::Display::fmt(leaf, f),
            FilterNode::StringCompare(leaf) => fmt::Display::fmt(leaf, f),
            FilterNode::SetMembership(leaf) => fmt::Display::fmt(leaf, f),
            FilterNode::Combinator(comb) => fmt::Display::fmt(comb, f),
        }
    }
}
