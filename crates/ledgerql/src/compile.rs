//! Compile AST expressions into typed nodes
//!
//! This pass:
//! - Resolves column names against the active row context
//! - Dispatches operators and named calls to registry functions
//! - Type-checks every call against the function's signatures

use regex::Regex;

use crate::CompilationError;
use crate::ast::{BinOp, Expr, UnaryOp};
use crate::node::{EvalFunction, EvalNode};
use crate::registry::{Context, Function};
use crate::types::DataType;

type Result<T> = std::result::Result<T, CompilationError>;

/// Compile an expression in the given row context
pub fn compile_expression(expr: &Expr, context: Context) -> Result<EvalNode> {
    match expr {
        Expr::Column(name) => context.column(name).map(EvalNode::Column),
        Expr::Constant(value) => Ok(EvalNode::Constant(value.clone())),
        Expr::UnaryOp(op, operand) => {
            let operand = compile_expression(operand, context)?;
            match op {
                UnaryOp::Not => call(Function::Not, vec![operand]),
            }
        }
        Expr::BinaryOp(lhs, op, rhs) => {
            let lhs = compile_expression(lhs, context)?;
            let rhs = compile_expression(rhs, context)?;
            compile_binop(lhs, *op, rhs)
        }
        Expr::Function(name, args) => {
            let function = Function::from_name(name)
                .ok_or_else(|| CompilationError::UnknownFunction(name.clone()))?;
            let args = args
                .iter()
                .map(|arg| compile_expression(arg, context))
                .collect::<Result<Vec<_>>>()?;
            call(function, args)
        }
    }
}

fn compile_binop(lhs: EvalNode, op: BinOp, rhs: EvalNode) -> Result<EvalNode> {
    let function = match op {
        BinOp::Eq => Function::Equal,
        // a != b is not(a = b)
        BinOp::Ne => {
            let equal = call(Function::Equal, vec![lhs, rhs])?;
            return call(Function::Not, vec![equal]);
        }
        BinOp::Lt => Function::Less,
        BinOp::Le => Function::LessEq,
        BinOp::Gt => Function::Greater,
        BinOp::Ge => Function::GreaterEq,
        BinOp::And => Function::And,
        BinOp::Or => Function::Or,
        BinOp::Match => {
            check_pattern(&rhs)?;
            Function::Match
        }
    };
    call(function, vec![lhs, rhs])
}

/// The right side of a match must be a string; constant patterns must also be
/// valid regular expressions.
fn check_pattern(pattern: &EvalNode) -> Result<()> {
    let dtype = pattern.dtype();
    if dtype != DataType::String {
        return Err(CompilationError::InvalidMatchPattern(dtype.name()));
    }
    if let EvalNode::Constant(value) = pattern
        && let Some(text) = value.as_str()
    {
        Regex::new(text).map_err(|e| CompilationError::InvalidRegex {
            pattern: text.to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

fn call(function: Function, args: Vec<EvalNode>) -> Result<EvalNode> {
    EvalFunction::new(function, args).map(EvalNode::Function)
}
