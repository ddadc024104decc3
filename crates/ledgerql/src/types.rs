//! Data types and literal values
//!
//! Every compiled node carries a `DataType` fixed at compile time. Literal
//! constants carry a `Value`, whose variant determines the type.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Semantic type of the value an expression produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Decimal,
    Float,
    String,
    Boolean,
    Date,
    /// Set of strings (tags, links)
    Set,
    Inventory,
    Position,
}

impl DataType {
    /// Whether rows can be grouped on values of this type
    pub fn is_hashable(self) -> bool {
        !matches!(self, DataType::Set | DataType::Inventory)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Set => "set",
            DataType::Inventory => "inventory",
            DataType::Position => "position",
        }
    }
}

/// A literal value appearing in a query
///
/// Positions and inventories have no literal syntax; those types only come
/// from the `change` column and functions over it, such as `sum(change)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
    String(String),
    Boolean(bool),
    Date(NaiveDate),
    Set(BTreeSet<String>),
}

impl Value {
    pub fn dtype(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Decimal(_) => DataType::Decimal,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
            Value::Boolean(_) => DataType::Boolean,
            Value::Date(_) => DataType::Date,
            Value::Set(_) => DataType::Set,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
