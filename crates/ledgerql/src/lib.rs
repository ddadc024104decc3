//! ledgerql - semantic analysis for a ledger query language
//!
//! Compiles a parsed query over ledger postings and entries into a typed,
//! scoped expression tree ready for an execution engine.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ledgerql::expr_helpers::{col, func};
//! use ledgerql::{Reference, Select, Target, compile_select};
//!
//! let select = Select::new(vec![
//!     Target::new(col("account")),
//!     Target::new(func("sum", vec![col("number")])),
//! ])
//! .group_by(vec![Reference::from(col("account"))]);
//!
//! let compiled = compile_select(&select)?;
//! assert_eq!(compiled.group_by, Some(vec![0]));
//! ```
//!
//! ## Pipeline
//!
//! - `compile_expression`: AST expression → typed `EvalNode`
//! - `get_columns_and_aggregates`: split a tree into row columns and aggregates
//! - `compile_select`: targets, FROM, WHERE, GROUP BY, ORDER BY → `CompiledSelect`

mod ast;
mod classify;
mod compile;
mod names;
mod node;
mod pretty;
mod registry;
mod select;
mod types;

use thiserror::Error;

// ============ Primary Public API ============

pub use ast::{BinOp, Expr, FromClause, OrderBy, Ordering, Reference, Select, Target, Targets, UnaryOp};
pub use classify::{Classification, ExprKind, get_columns_and_aggregates};
pub use compile::compile_expression;
pub use names::find_unique_name;
pub use node::{EvalFunction, EvalNode};
pub use registry::{Column, Context, EvalColumn, Function, Param, Returns, Signature};
pub use select::{
    CompiledFrom, CompiledOrderBy, CompiledSelect, CompiledTarget, OrderKey, compile_select,
    compile_select_in,
};
pub use types::{DataType, Value};

/// Helpers for building query ASTs programmatically
pub mod expr_helpers {
    pub use crate::ast::helpers::*;
}

// ============ Errors ============

/// Why a query failed to compile
///
/// The message names the offending column, function or clause and is meant to
/// be shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilationError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("'{name}' is not a valid {context} column")]
    InvalidContextColumn { name: String, context: Context },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("wrong arity or argument types for {function}({args})")]
    Signature { function: &'static str, args: String },

    #[error("invalid match pattern: expected a string, got {0}")]
    InvalidMatchPattern(&'static str),

    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Mixed aggregates and non-aggregates are not allowed in target '{0}'")]
    MixedAggregates(String),

    #[error("Mixed aggregates and non-aggregates are not allowed in ORDER BY key '{0}'")]
    MixedOrderKey(String),

    #[error("Aggregates of aggregates are not allowed: '{0}'")]
    NestedAggregates(String),

    #[error("Aggregates are not allowed in FROM clause: '{0}'")]
    AggregateInFrom(String),

    #[error("Aggregates are not allowed in WHERE clause: '{0}'")]
    AggregateInWhere(String),

    #[error("GROUP BY expressions may not be aggregates: '{0}'")]
    AggregateGroupKey(String),

    #[error("GROUP BY may not reference aggregate target '{0}'")]
    GroupByAggregateTarget(String),

    #[error("GROUP BY a non-hashable type is not supported: '{key}' ({dtype})")]
    NonHashableGroupKey { key: String, dtype: &'static str },

    #[error("invalid {clause} column index {index}; expected 1 to {count}")]
    IndexOutOfRange {
        clause: &'static str,
        index: usize,
        count: usize,
    },

    #[error("all non-aggregate targets must be covered by GROUP BY; missing: {0}")]
    NotCoveredByGroupBy(String),

    #[error(
        "aggregate query without GROUP BY must have only aggregate targets; ungrouped: {0}"
    )]
    UngroupedTargets(String),

    #[error("The HAVING clause is not supported yet")]
    HavingNotSupported,
}
