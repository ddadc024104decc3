//! Aggregate / scalar classification of compiled trees
//!
//! A tree is walked in one of two modes:
//! - `Collect`: outside any aggregate; columns and aggregates are recorded
//! - `InsideAggregate`: below an aggregate call; its arguments are evaluated
//!   per row by the aggregate itself, so columns are not recorded, and any
//!   further aggregate is an error

use crate::CompilationError;
use crate::node::{EvalFunction, EvalNode};
use crate::registry::EvalColumn;

type Result<T> = std::result::Result<T, CompilationError>;

/// Columns and aggregates referenced at the outer (row) scope of a tree
#[derive(Debug, Default)]
pub struct Classification<'a> {
    pub columns: Vec<&'a EvalColumn>,
    pub aggregates: Vec<&'a EvalFunction>,
}

/// Shape of an expression with respect to aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// Neither columns nor aggregates, e.g. a constant
    Constant,
    /// Row-level: columns only
    Scalar,
    /// Aggregates only
    Aggregate,
    /// Both columns and aggregates at the outer scope (illegal)
    Mixed,
}

impl ExprKind {
    /// Whether the expression is evaluated per row
    pub fn is_scalar(self) -> bool {
        matches!(self, ExprKind::Constant | ExprKind::Scalar)
    }
}

impl Classification<'_> {
    pub fn counts(&self) -> (usize, usize) {
        (self.columns.len(), self.aggregates.len())
    }

    pub fn kind(&self) -> ExprKind {
        match self.counts() {
            (0, 0) => ExprKind::Constant,
            (_, 0) => ExprKind::Scalar,
            (0, _) => ExprKind::Aggregate,
            _ => ExprKind::Mixed,
        }
    }
}

#[derive(Clone, Copy)]
enum Mode<'a> {
    Collect,
    InsideAggregate(&'a EvalFunction),
}

/// Partition a tree into outer-scope columns and aggregate calls
///
/// Fails when an aggregate is nested (at any depth) under another aggregate.
pub fn get_columns_and_aggregates(node: &EvalNode) -> Result<Classification<'_>> {
    let mut classification = Classification::default();
    walk(node, Mode::Collect, &mut classification)?;
    Ok(classification)
}

fn walk<'a>(node: &'a EvalNode, mode: Mode<'a>, out: &mut Classification<'a>) -> Result<()> {
    match node {
        EvalNode::Column(column) => {
            if let Mode::Collect = mode {
                out.columns.push(column);
            }
            Ok(())
        }
        EvalNode::Constant(_) => Ok(()),
        EvalNode::Function(function) if function.is_aggregate() => match mode {
            Mode::Collect => {
                out.aggregates.push(function);
                walk_args(function, Mode::InsideAggregate(function), out)
            }
            Mode::InsideAggregate(outer) => {
                Err(CompilationError::NestedAggregates(outer.to_string()))
            }
        },
        EvalNode::Function(function) => walk_args(function, mode, out),
    }
}

fn walk_args<'a>(
    function: &'a EvalFunction,
    mode: Mode<'a>,
    out: &mut Classification<'a>,
) -> Result<()> {
    function.args.iter().try_for_each(|arg| walk(arg, mode, out))
}

/// Whether a tree contains an aggregate anywhere
pub fn has_aggregates(node: &EvalNode) -> Result<bool> {
    Ok(!get_columns_and_aggregates(node)?.aggregates.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Context, Function};
    use chrono::NaiveDate;

    fn column(name: &str) -> EvalNode {
        Context::Postings.column(name).unwrap().into()
    }

    fn node(function: Function, args: Vec<EvalNode>) -> EvalNode {
        EvalFunction::new(function, args).unwrap().into()
    }

    fn counts(tree: &EvalNode) -> (usize, usize) {
        get_columns_and_aggregates(tree).unwrap().counts()
    }

    fn date_is_new_year() -> EvalNode {
        node(
            Function::Equal,
            vec![
                column("date"),
                EvalNode::constant(NaiveDate::from_ymd_opt(2014, 1, 1).unwrap()),
            ],
        )
    }

    #[test]
    fn derived_expressions() {
        let tree = node(
            Function::And,
            vec![
                node(Function::Equal, vec![column("change"), EvalNode::constant(42)]),
                node(
                    Function::Or,
                    vec![
                        node(Function::Not, vec![date_is_new_year()]),
                        EvalNode::constant(false),
                    ],
                ),
            ],
        );
        assert_eq!(counts(&tree), (2, 0));

        // Aggregate deep in the tree
        let tree = node(
            Function::And,
            vec![
                node(Function::Equal, vec![column("change"), EvalNode::constant(42)]),
                node(
                    Function::Or,
                    vec![
                        node(Function::Not, vec![date_is_new_year()]),
                        node(Function::Sum, vec![EvalNode::constant(1)]),
                    ],
                ),
            ],
        );
        assert_eq!(counts(&tree), (2, 1));
    }

    #[test]
    fn columns_and_aggregates() {
        assert_eq!(counts(&column("change")), (1, 0));

        let both = node(Function::And, vec![column("change"), column("date")]);
        assert_eq!(counts(&both), (2, 0));

        let sum = node(Function::Sum, vec![column("change")]);
        assert_eq!(counts(&sum), (0, 1));

        let first_last = node(
            Function::And,
            vec![
                node(Function::First, vec![column("account")]),
                node(Function::Last, vec![column("account")]),
            ],
        );
        assert_eq!(counts(&first_last), (0, 2));

        let length = node(Function::Length, vec![column("account")]);
        assert_eq!(counts(&length), (1, 0));

        let mixed = node(
            Function::And,
            vec![
                node(Function::Length, vec![column("account")]),
                node(Function::Sum, vec![column("change")]),
            ],
        );
        assert_eq!(counts(&mixed), (1, 1));
        assert_eq!(
            get_columns_and_aggregates(&mixed).unwrap().kind(),
            ExprKind::Mixed
        );
    }

    #[test]
    fn constants_are_neither() {
        let tree = EvalNode::constant(17);
        let classification = get_columns_and_aggregates(&tree).unwrap();
        assert_eq!(classification.kind(), ExprKind::Constant);
        assert!(classification.kind().is_scalar());
    }

    #[test]
    fn nested_aggregates_are_rejected() {
        let inner = node(
            Function::Sum,
            vec![node(Function::Length, vec![column("account")])],
        );
        let tree = node(Function::Sum, vec![inner]);
        let err = get_columns_and_aggregates(&tree).unwrap_err();
        assert!(matches!(err, CompilationError::NestedAggregates(_)));
        assert!(err.to_string().starts_with("Aggregates of aggregates"));
    }

    #[test]
    fn nested_aggregate_below_scalar_is_rejected() {
        let inner = node(Function::Count, vec![column("account")]);
        let scalar = node(Function::Equal, vec![inner, EvalNode::constant(1)]);
        let tree = node(Function::First, vec![scalar]);
        assert!(get_columns_and_aggregates(&tree).is_err());
    }
}
