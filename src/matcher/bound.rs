//! Bound filter trees.
//!
//! A [`BoundFilter`] is built from a parsed [`FilterNode`] template and a
//! [`CheckerBuilder`]. Every leaf is either enabled with a checker or disabled,
//! so there is no way to evaluate a leaf that was never bound.
//!
//! Evaluation rules:
//! - `&&` combinators skip disabled children (they count as `true`) and stop at
//!   the first `false`
//! - `||` combinators skip disabled children (they count as `false`) and stop
//!   at the first `true`
//! - a combinator whose children are all disabled is itself disabled, so its
//!   parent skips it the same way
//! - a filter whose root is disabled accepts every record

use crate::ast::{FilterNode, LogicalOp};
use crate::config::FilterConfig;
use crate::error::BindError;
use crate::matcher::builder::CheckerBuilder;
use crate::matcher::types::{Binding, Checker};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, error, instrument, trace};

/// State of a bound leaf.
pub enum LeafState<R> {
    Enabled(Checker<R>),
    Disabled,
}

impl<R> Clone for LeafState<R> {
    fn clone(&self) -> Self {
        match self {
            LeafState::Enabled(checker) => LeafState::Enabled(checker.clone()),
            LeafState::Disabled => LeafState::Disabled,
        }
    }
}

/// Leaf data as seen by the builder (after normalisation) plus its state.
pub struct BoundLeaf<R> {
    leaf: FilterNode,
    state: LeafState<R>,
}

impl<R> BoundLeaf<R> {
    fn new(mut leaf: FilterNode, binding: Binding<R>) -> Self {
        let state = match binding {
            Binding::Checker(checker) => LeafState::Enabled(checker),
            Binding::Disabled => {
                set_enabled(&mut leaf, false);
                debug!(leaf = %leaf, "filter leaf disabled");
                LeafState::Disabled
            }
        };
        Self { leaf, state }
    }

    pub fn leaf(&self) -> &FilterNode {
        &self.leaf
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, LeafState::Enabled(_))
    }

    #[inline]
    fn evaluate(&self, record: &R) -> bool {
        match &self.state {
            LeafState::Enabled(checker) => checker(record),
            LeafState::Disabled => true,
        }
    }
}

impl<R> Clone for BoundLeaf<R> {
    fn clone(&self) -> Self {
        Self {
            leaf: self.leaf.clone(),
            state: self.state.clone(),
        }
    }
}

/// Node of a bound tree.
pub enum BoundNode<R> {
    Leaf(BoundLeaf<R>),
    Combinator {
        operator: LogicalOp,
        children: Vec<BoundNode<R>>,
        /// False when every child is disabled.
        enabled: bool,
    },
}

impl<R> BoundNode<R> {
    fn bind(node: &FilterNode, builder: &dyn CheckerBuilder<R>) -> Result<Self, BindError> {
        match node {
            FilterNode::Combinator(comb) => {
                let children = comb
                    .children
                    .iter()
                    .map(|child| BoundNode::bind(child, builder))
                    .collect::<Result<Vec<_>, _>>()?;
                let enabled = children.iter().any(|child| !child.is_disabled());
                Ok(BoundNode::Combinator {
                    operator: comb.operator,
                    children,
                    enabled,
                })
            }
            FilterNode::ValueCompare(leaf) => {
                let mut leaf = leaf.clone();
                let binding = builder.bind_value(&mut leaf)?;
                Ok(BoundNode::Leaf(BoundLeaf::new(leaf.into(), binding)))
            }
            FilterNode::StringCompare(leaf) => {
                let binding = builder.bind_string(leaf)?;
                Ok(BoundNode::Leaf(BoundLeaf::new(leaf.clone().into(), binding)))
            }
            FilterNode::SetMembership(leaf) => {
                let binding = builder.bind_set(leaf)?;
                Ok(BoundNode::Leaf(BoundLeaf::new(leaf.clone().into(), binding)))
            }
        }
    }

    /// A disabled leaf, or a combinator with no enabled descendant.
    pub fn is_disabled(&self) -> bool {
        match self {
            BoundNode::Leaf(leaf) => !leaf.is_enabled(),
            BoundNode::Combinator { enabled, .. } => !enabled,
        }
    }

    fn evaluate(&self, record: &R) -> bool {
        match self {
            BoundNode::Leaf(leaf) => leaf.evaluate(record),
            BoundNode::Combinator {
                operator: LogicalOp::And,
                children,
                ..
            } => children
                .iter()
                .all(|child| child.is_disabled() || child.evaluate(record)),
            BoundNode::Combinator {
                operator: LogicalOp::Or,
                children,
                ..
            } => children
                .iter()
                .any(|child| !child.is_disabled() && child.evaluate(record)),
        }
    }

    fn to_node(&self) -> FilterNode {
        match self {
            BoundNode::Leaf(leaf) => leaf.leaf.clone(),
            BoundNode::Combinator {
                operator, children, ..
            } => {
                FilterNode::Combinator(crate::ast::Combinator {
                    operator: *operator,
                    children: children.iter().map(BoundNode::to_node).collect(),
                })
            }
        }
    }

    fn visit_leaves<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a BoundLeaf<R>),
    {
        match self {
            BoundNode::Leaf(leaf) => visitor(leaf),
            BoundNode::Combinator { children, .. } => {
                for child in children {
                    child.visit_leaves(visitor);
                }
            }
        }
    }
}

impl<R> Clone for BoundNode<R> {
    fn clone(&self) -> Self {
        match self {
            BoundNode::Leaf(leaf) => BoundNode::Leaf(leaf.clone()),
            BoundNode::Combinator {
                operator,
                children,
                enabled,
            } => BoundNode::Combinator {
                operator: *operator,
                children: children.clone(),
                enabled: *enabled,
            },
        }
    }
}

fn set_enabled(node: &mut FilterNode, enabled: bool) {
    match node {
        FilterNode::ValueCompare(leaf) => leaf.enabled = enabled,
        FilterNode::StringCompare(leaf) => leaf.enabled = enabled,
        FilterNode::SetMembership(leaf) => leaf.enabled = enabled,
        FilterNode::Combinator(_) => {}
    }
}

/// A filter ready for evaluation against records of type `R`.
///
/// Bound filters are immutable once built and `Send + Sync`, so one instance
/// can be shared by threads evaluating different records.
pub struct BoundFilter<R> {
    template: FilterNode,
    root: BoundNode<R>,
    config: FilterConfig,
}

impl<R> BoundFilter<R> {
    /// Bind a parsed template.
    ///
    /// The template is left untouched; leaves are copied before the builder
    /// normalises them.
    #[instrument(level = "debug", skip_all, fields(filter = %template))]
    pub fn bind(template: &FilterNode, builder: &dyn CheckerBuilder<R>) -> Result<Self, BindError> {
        let root = Self::bind_root(template, builder)?;
        Ok(Self {
            template: template.clone(),
            root,
            config: FilterConfig::default(),
        })
    }

    /// Bind the template again with another builder, replacing every checker.
    ///
    /// On error the current binding is kept.
    pub fn rebind(&mut self, builder: &dyn CheckerBuilder<R>) -> Result<(), BindError> {
        self.root = Self::bind_root(&self.template, builder)?;
        Ok(())
    }

    fn bind_root(
        template: &FilterNode,
        builder: &dyn CheckerBuilder<R>,
    ) -> Result<BoundNode<R>, BindError> {
        BoundNode::bind(template, builder).map_err(|err| {
            error!(filter = %template, error = %err, "fail to bind filter");
            err
        })
    }

    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// The parsed tree this filter was bound from.
    pub fn template(&self) -> &FilterNode {
        &self.template
    }

    pub fn root(&self) -> &BoundNode<R> {
        &self.root
    }

    /// The tree as bound: normalised thresholds, `enabled` cleared on
    /// disabled leaves.
    pub fn to_node(&self) -> FilterNode {
        self.root.to_node()
    }

    /// Labels of the leaves that bound as disabled.
    pub fn disabled_labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        self.root.visit_leaves(&mut |leaf| {
            if !leaf.is_enabled() {
                if let Some(label) = leaf.leaf.label() {
                    labels.push(label);
                }
            }
        });
        labels
    }

    /// False when every leaf bound as disabled: such a filter accepts
    /// everything and usually means the expression targets another record type.
    pub fn has_enabled_leaves(&self) -> bool {
        !self.root.is_disabled()
    }

    /// Evaluate the filter against one record.
    pub fn check(&self, record: &R) -> bool {
        let result = self.root.is_disabled() || self.root.evaluate(record);
        if self.config.log_evaluations {
            trace!(filter = %self, result, "filter evaluated");
        }
        result
    }

    /// Records accepted by the filter, in input order.
    pub fn matching<'a>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|record| self.check(record)).collect()
    }

    /// Same as [`matching`](Self::matching), fanned out over rayon's pool once
    /// the batch reaches `parallel_threshold` records.
    pub fn matching_par<'a>(&self, records: &'a [R]) -> Vec<&'a R>
    where
        R: Sync,
    {
        if records.len() < self.config.parallel_threshold {
            return self.matching(records);
        }
        debug!(records = records.len(), "filtering records in parallel");
        records
            .par_iter()
            .filter(|record| self.check(record))
            .collect()
    }

    /// Number of records accepted by the filter.
    pub fn count_matching(&self, records: &[R]) -> usize {
        records.iter().filter(|record| self.check(record)).count()
    }
}

impl<R> Clone for BoundFilter<R> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            root: self.root.clone(),
            config: self.config.clone(),
        }
    }
}

impl FilterNode {
    /// Shorthand for [`BoundFilter::bind`].
    pub fn bind<R, B>(&self, builder: &B) -> Result<BoundFilter<R>, BindError>
    where
        B: CheckerBuilder<R>,
    {
        BoundFilter::bind(self, builder)
    }
}

impl<R> fmt::Display for BoundNode<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundNode::Leaf(leaf) if leaf.is_enabled() => fmt::Display::fmt(&leaf.leaf, f),
            BoundNode::Leaf(leaf) => write!(f, "~{}", leaf.leaf),
            BoundNode::Combinator {
                operator,
                children,
                enabled,
            } => {
                if !enabled {
                    f.write_str("~")?;
                }
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {operator}")?;
                    }
                    write!(f, " {child}")?;
                }
                f.write_str(" )")
            }
        }
    }
}

impl<R> fmt::Display for BoundFilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

impl<R> fmt::Debug for BoundFilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFilter")
            .field("filter", &self.root.to_string())
            .field("config", &self.config)
            .finish()
    }
}
