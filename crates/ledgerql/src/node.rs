//! Compiled, typed expression nodes
//!
//! An `EvalNode` tree is the output of compilation and the input of the
//! execution engine. Each node's type is fixed when the node is built.

use crate::CompilationError;
use crate::registry::{EvalColumn, Function};
use crate::types::{DataType, Value};

type Result<T> = std::result::Result<T, CompilationError>;

/// Node of a compiled expression tree
///
/// Equality is structural: two trees are equal when they have the same shape,
/// the same functions, columns and constants.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalNode {
    /// Reads one attribute of the current row
    Column(EvalColumn),
    /// Literal value
    Constant(Value),
    /// Scalar or aggregate function call
    Function(EvalFunction),
}

impl EvalNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        EvalNode::Constant(value.into())
    }

    pub fn dtype(&self) -> DataType {
        match self {
            EvalNode::Column(column) => column.dtype(),
            EvalNode::Constant(value) => value.dtype(),
            EvalNode::Function(function) => function.dtype,
        }
    }

    pub fn as_function(&self) -> Option<&EvalFunction> {
        match self {
            EvalNode::Function(function) => Some(function),
            _ => None,
        }
    }
}

impl From<EvalColumn> for EvalNode {
    fn from(column: EvalColumn) -> Self {
        EvalNode::Column(column)
    }
}

impl From<EvalFunction> for EvalNode {
    fn from(function: EvalFunction) -> Self {
        EvalNode::Function(function)
    }
}

/// Call of a registered function over compiled arguments
#[derive(Debug, Clone, PartialEq)]
pub struct EvalFunction {
    pub function: Function,
    pub args: Vec<EvalNode>,
    pub dtype: DataType,
}

impl EvalFunction {
    /// Type-check `args` against the function's signatures
    ///
    /// Fails unless exactly the argument count and types of one signature
    /// match; arity and type mismatches are reported the same way.
    pub fn new(function: Function, args: Vec<EvalNode>) -> Result<Self> {
        let arg_types: Vec<DataType> = args.iter().map(EvalNode::dtype).collect();
        let dtype = function
            .resolve(&arg_types)
            .ok_or_else(|| CompilationError::Signature {
                function: function.name(),
                args: arg_types
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
        Ok(Self {
            function,
            args,
            dtype,
        })
    }

    pub fn is_aggregate(&self) -> bool {
        self.function.is_aggregate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Context;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn call(function: Function, args: Vec<EvalNode>) -> Result<EvalNode> {
        EvalFunction::new(function, args).map(EvalNode::from)
    }

    fn today() -> EvalNode {
        EvalNode::constant(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap())
    }

    fn column(name: &str) -> EvalNode {
        Context::Postings.column(name).unwrap().into()
    }

    #[test]
    fn operators_return_booleans() {
        for function in [
            Function::Equal,
            Function::Greater,
            Function::GreaterEq,
            Function::Less,
            Function::LessEq,
            Function::And,
            Function::Or,
        ] {
            let node = call(function, vec![EvalNode::constant(17), EvalNode::constant(18)]);
            assert_eq!(node.unwrap().dtype(), DataType::Boolean, "{function}");
        }
        let not = call(Function::Not, vec![EvalNode::constant(17)]).unwrap();
        assert_eq!(not.dtype(), DataType::Boolean);
    }

    #[test]
    fn match_requires_strings() {
        assert!(
            call(
                Function::Match,
                vec![EvalNode::constant("testing"), EvalNode::constant(18)]
            )
            .is_err()
        );
        let node = call(
            Function::Match,
            vec![EvalNode::constant("testing"), EvalNode::constant("test.*")],
        )
        .unwrap();
        assert_eq!(node.dtype(), DataType::Boolean);
    }

    #[test]
    fn scalar_function_types() {
        assert!(call(Function::Length, vec![EvalNode::constant(17)]).is_err());
        let length = call(Function::Length, vec![EvalNode::constant("testing")]).unwrap();
        assert_eq!(length.dtype(), DataType::Integer);

        for function in [Function::Year, Function::Month, Function::Day] {
            assert!(call(function, vec![EvalNode::constant(17)]).is_err());
            assert_eq!(call(function, vec![today()]).unwrap().dtype(), DataType::Integer);
        }
    }

    #[test]
    fn units_and_cost_accept_positions_and_inventories() {
        for function in [Function::Units, Function::Cost] {
            assert!(call(function, vec![EvalNode::constant(17)]).is_err());

            let position = call(function, vec![column("change")]).unwrap();
            assert_eq!(position.dtype(), DataType::Inventory);

            let inventory = call(Function::Sum, vec![column("change")]).unwrap();
            let node = call(function, vec![inventory]).unwrap();
            assert_eq!(node.dtype(), DataType::Inventory);
        }
    }

    #[test]
    fn aggregate_types() {
        assert!(call(Function::Sum, vec![EvalNode::constant("testing")]).is_err());
        let sum = call(Function::Sum, vec![EvalNode::constant(17)]).unwrap();
        assert_eq!(sum.dtype(), DataType::Integer);
        let sum = call(
            Function::Sum,
            vec![EvalNode::constant(Decimal::from_str("17.00").unwrap())],
        )
        .unwrap();
        assert_eq!(sum.dtype(), DataType::Decimal);

        let count = call(Function::Count, vec![EvalNode::constant(17)]).unwrap();
        assert_eq!(count.dtype(), DataType::Integer);

        for function in [Function::First, Function::Last, Function::Min, Function::Max] {
            let node = call(function, vec![EvalNode::constant(17.0)]).unwrap();
            assert_eq!(node.dtype(), DataType::Float);
        }
    }

    #[test]
    fn wrong_arity_is_a_signature_error() {
        let err = call(Function::Sum, vec![column("date"), column("account")]).unwrap_err();
        assert!(matches!(err, CompilationError::Signature { function: "sum", .. }));
        assert!(err.to_string().contains("sum(date, string)"));
    }

    #[test]
    fn structural_equality() {
        let a = call(Function::Length, vec![column("account")]).unwrap();
        let b = call(Function::Length, vec![column("account")]).unwrap();
        let c = call(Function::Length, vec![column("payee")]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
