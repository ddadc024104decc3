//! Query AST consumed by the compiler
//!
//! This is what an external parser produces: untyped expressions plus the
//! clause structure of a SELECT statement. Nothing here is resolved or
//! type-checked yet; see `compile` and `select` for that.

use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: `account`
    Column(String),

    /// Literal value: `42`, `'Assets:Cash'`, `2014-01-01`
    Constant(Value),

    /// Unary operation: `NOT x`
    UnaryOp(UnaryOp, Box<Expr>),

    /// Binary operation: `a = b`, `a AND b`, `a ~ 'pattern'`
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),

    /// Function call: `sum(number)`
    Function(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // Regular expression match
    Match,
}

impl Expr {
    pub fn binop(self, op: BinOp, rhs: Expr) -> Self {
        Expr::BinaryOp(Box::new(self), op, Box::new(rhs))
    }

    pub fn eq(self, rhs: Expr) -> Self {
        self.binop(BinOp::Eq, rhs)
    }

    pub fn ne(self, rhs: Expr) -> Self {
        self.binop(BinOp::Ne, rhs)
    }

    pub fn and(self, rhs: Expr) -> Self {
        self.binop(BinOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        self.binop(BinOp::Or, rhs)
    }

    pub fn matches(self, pattern: Expr) -> Self {
        self.binop(BinOp::Match, pattern)
    }

    /// Bare identifier, if this is a plain column reference
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Column(name) => Some(name),
            _ => None,
        }
    }
}

// ============ Statement ============

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub expression: Expr,
    /// Explicit `AS` alias
    pub name: Option<String>,
}

impl Target {
    pub fn new(expression: Expr) -> Self {
        Self {
            expression,
            name: None,
        }
    }

    pub fn named(expression: Expr, name: impl Into<String>) -> Self {
        Self {
            expression,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// `SELECT *`
    Wildcard,
    List(Vec<Target>),
}

/// `FROM <filter> [CLOSE]`
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub expression: Option<Expr>,
    pub close: bool,
}

/// Entry of a GROUP BY or ORDER BY list
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// 1-based target position
    Index(usize),
    /// Target name or arbitrary expression
    Expr(Expr),
}

impl From<usize> for Reference {
    fn from(index: usize) -> Self {
        Reference::Index(index)
    }
}

impl From<Expr> for Reference {
    fn from(expr: Expr) -> Self {
        Reference::Expr(expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub columns: Vec<Reference>,
    pub ordering: Ordering,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub targets: Targets,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<Vec<Reference>>,
    pub having: Option<Expr>,
    pub order_by: Option<OrderBy>,
    pub distinct: bool,
    pub limit: Option<u64>,
}

impl Select {
    pub fn new(targets: Vec<Target>) -> Self {
        Self::with_targets(Targets::List(targets))
    }

    pub fn wildcard() -> Self {
        Self::with_targets(Targets::Wildcard)
    }

    fn with_targets(targets: Targets) -> Self {
        Self {
            targets,
            from: None,
            where_clause: None,
            group_by: None,
            having: None,
            order_by: None,
            distinct: false,
            limit: None,
        }
    }

    pub fn from_clause(mut self, expression: Option<Expr>, close: bool) -> Self {
        self.from = Some(FromClause { expression, close });
        self
    }

    pub fn filter(mut self, expression: Expr) -> Self {
        self.where_clause = Some(expression);
        self
    }

    pub fn group_by(mut self, columns: Vec<Reference>) -> Self {
        self.group_by = Some(columns);
        self
    }

    pub fn having(mut self, expression: Expr) -> Self {
        self.having = Some(expression);
        self
    }

    pub fn order_by(mut self, columns: Vec<Reference>, ordering: Ordering) -> Self {
        self.order_by = Some(OrderBy { columns, ordering });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Helper functions for building AST nodes
pub mod helpers {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    /// Build a column reference
    pub fn col(name: &str) -> Expr {
        Expr::Column(name.into())
    }

    /// Build a function call
    pub fn func(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Function(name.into(), args)
    }

    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Constant(value.into())
    }

    pub fn lit_int(n: i64) -> Expr {
        lit(n)
    }

    pub fn lit_str(s: &str) -> Expr {
        lit(s)
    }

    pub fn lit_decimal(d: Decimal) -> Expr {
        lit(d)
    }

    pub fn lit_float(n: f64) -> Expr {
        lit(n)
    }

    pub fn lit_bool(b: bool) -> Expr {
        lit(b)
    }

    pub fn lit_date(d: NaiveDate) -> Expr {
        lit(d)
    }

    /// Build a binary operation
    pub fn binop(left: Expr, op: BinOp, right: Expr) -> Expr {
        left.binop(op, right)
    }

    /// Build `NOT operand`
    pub fn not(operand: Expr) -> Expr {
        Expr::UnaryOp(UnaryOp::Not, Box::new(operand))
    }
}
