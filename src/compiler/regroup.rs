//! Precedence restoration for one nesting level.
//!
//! The parser reads `a op b op c ...` without any notion of precedence. This
//! pass folds every maximal run of `&&`-joined atoms into an AND combinator and
//! ORs the result with the atoms that were not part of any run. Atoms outside
//! a run come first, followed by the runs in the order they were opened, so
//! `a && b || c` regroups to `( c || ( a && b ) )`.

use crate::ast::{Combinator, FilterNode, LogicalOp};

/// Regroup `first (op atom)*` into a single node.
pub(crate) fn regroup(first: FilterNode, rest: Vec<(LogicalOp, FilterNode)>) -> FilterNode {
    if rest.is_empty() {
        return first;
    }

    let mut ors: Vec<FilterNode> = Vec::new();
    let mut runs: Vec<Vec<FilterNode>> = Vec::new();
    let mut open_run: Option<Vec<FilterNode>> = None;
    let mut previous = first;

    for (operator, next) in rest {
        let atom = std::mem::replace(&mut previous, next);
        match (operator, open_run.take()) {
            (LogicalOp::And, Some(mut run)) => {
                run.push(atom);
                open_run = Some(run);
            }
            (LogicalOp::And, None) => open_run = Some(vec![atom]),
            (LogicalOp::Or, Some(mut run)) => {
                run.push(atom);
                runs.push(run);
            }
            (LogicalOp::Or, None) => ors.push(atom),
        }
    }

    // An open run means the last operator was `&&`.
    match open_run {
        Some(mut run) => {
            run.push(previous);
            runs.push(run);
        }
        None => ors.push(previous),
    }

    if ors.is_empty() && runs.len() == 1 {
        if let Some(run) = runs.pop() {
            return Combinator::collapse(LogicalOp::And, run);
        }
    }

    ors.extend(
        runs.into_iter()
            .map(|run| Combinator::collapse(LogicalOp::And, run)),
    );
    Combinator::collapse(LogicalOp::Or, ors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Cmp, ValueCompare};

    fn atom(label: &str) -> FilterNode {
        ValueCompare::new(label, Cmp::Gt, 0.0, "").into()
    }

    fn seq(first: &str, rest: &[(LogicalOp, &str)]) -> FilterNode {
        regroup(
            atom(first),
            rest.iter().map(|(op, label)| (*op, atom(label))).collect(),
        )
    }

    use LogicalOp::{And, Or};

    #[test]
    fn test_single_atom() {
        assert_eq!(seq("a", &[]), atom("a"));
    }

    #[test]
    fn test_pure_and() {
        assert_eq!(
            seq("a", &[(And, "b"), (And, "c")]),
            FilterNode::and(vec![atom("a"), atom("b"), atom("c")])
        );
    }

    #[test]
    fn test_pure_or() {
        assert_eq!(
            seq("a", &[(Or, "b"), (Or, "c")]),
            FilterNode::or(vec![atom("a"), atom("b"), atom("c")])
        );
    }

    #[test]
    fn test_and_then_or() {
        assert_eq!(
            seq("a", &[(And, "b"), (Or, "c")]),
            FilterNode::or(vec![atom("c"), FilterNode::and(vec![atom("a"), atom("b")])])
        );
    }

    #[test]
    fn test_or_then_and() {
        assert_eq!(
            seq("a", &[(Or, "b"), (And, "c")]),
            FilterNode::or(vec![atom("a"), FilterNode::and(vec![atom("b"), atom("c")])])
        );
    }

    #[test]
    fn test_two_and_runs() {
        assert_eq!(
            seq("a", &[(And, "b"), (Or, "c"), (And, "d")]),
            FilterNode::or(vec![
                FilterNode::and(vec![atom("a"), atom("b")]),
                FilterNode::and(vec![atom("c"), atom("d")]),
            ])
        );
    }

    #[test]
    fn test_mixed_runs_and_singles() {
        // a || b && c || d || e && f && g
        assert_eq!(
            seq(
                "a",
                &[(Or, "b"), (And, "c"), (Or, "d"), (Or, "e"), (And, "f"), (And, "g")]
            ),
            FilterNode::or(vec![
                atom("a"),
                atom("d"),
                FilterNode::and(vec![atom("b"), atom("c")]),
                FilterNode::and(vec![atom("e"), atom("f"), atom("g")]),
            ])
        );
    }

    #[test]
    fn test_nested_group_is_an_atom() {
        let group = FilterNode::or(vec![atom("b"), atom("c")]);
        let node = regroup(atom("a"), vec![(And, group.clone())]);
        assert_eq!(node, FilterNode::and(vec![atom("a"), group]));
    }
}
