//! Display for query ASTs and compiled trees
//!
//! Rendering is single-line and close to the query syntax; it is used in
//! error messages and debug logging.

use std::fmt::{self, Display};

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::node::{EvalFunction, EvalNode};
use crate::registry::{EvalColumn, Function};
use crate::types::{DataType, Value};

// ============ Values ============

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Set(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============ AST ============

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Match => "~",
        };
        write!(f, "{}", s)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "NOT"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::UnaryOp(op, operand) => write!(f, "{} {}", op, operand),
            Expr::BinaryOp(lhs, op, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Function(name, args) => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

// ============ Compiled trees ============

impl Display for EvalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Display for EvalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalNode::Column(column) => write!(f, "{}", column),
            EvalNode::Constant(value) => write!(f, "{}", value),
            EvalNode::Function(function) => write!(f, "{}", function),
        }
    }
}

impl Display for EvalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (infix_symbol(self.function), self.args.as_slice()) {
            (Some(symbol), [lhs, rhs]) => write!(f, "({} {} {})", lhs, symbol, rhs),
            _ if self.function == Function::Not && self.args.len() == 1 => {
                write!(f, "NOT {}", self.args[0])
            }
            _ => {
                write!(f, "{}(", self.function.name())?;
                write_args(f, &self.args)?;
                write!(f, ")")
            }
        }
    }
}

fn infix_symbol(function: Function) -> Option<&'static str> {
    let s = match function {
        Function::Equal => "=",
        Function::Greater => ">",
        Function::GreaterEq => ">=",
        Function::Less => "<",
        Function::LessEq => "<=",
        Function::And => "AND",
        Function::Or => "OR",
        Function::Match => "~",
        _ => return None,
    };
    Some(s)
}

fn write_args<T: Display>(f: &mut fmt::Formatter<'_>, args: &[T]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}
