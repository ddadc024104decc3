//! Column and function registry
//!
//! Static tables describing what a query may reference:
//! - columns exposed by each row context, in declared order
//! - functions, with their typed call signatures and aggregate marker
//!
//! Tables are built once on first use and never mutated afterwards, so they can
//! be shared freely across concurrent compilations.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;

use crate::CompilationError;
use crate::types::DataType;

type Result<T> = std::result::Result<T, CompilationError>;

// ============ Contexts & Columns ============

/// Row context a query runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Context {
    /// One row per posting
    #[default]
    Postings,
    /// One row per entry
    Entries,
}

/// A column name known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Type,
    Filename,
    LineNo,
    Date,
    Flag,
    Payee,
    Narration,
    Tags,
    Links,
    Account,
    Number,
    Currency,
    Change,
}

const ENTRY_COLUMNS: [Column; 9] = [
    Column::Type,
    Column::Filename,
    Column::LineNo,
    Column::Date,
    Column::Flag,
    Column::Payee,
    Column::Narration,
    Column::Tags,
    Column::Links,
];

const POSTING_COLUMNS: [Column; 13] = [
    Column::Type,
    Column::Filename,
    Column::LineNo,
    Column::Date,
    Column::Flag,
    Column::Payee,
    Column::Narration,
    Column::Tags,
    Column::Links,
    Column::Account,
    Column::Number,
    Column::Currency,
    Column::Change,
];

static POSTINGS_TABLE: LazyLock<IndexMap<&'static str, Column>> =
    LazyLock::new(|| build_table(&POSTING_COLUMNS));

static ENTRIES_TABLE: LazyLock<IndexMap<&'static str, Column>> =
    LazyLock::new(|| build_table(&ENTRY_COLUMNS));

fn build_table(columns: &[Column]) -> IndexMap<&'static str, Column> {
    columns.iter().map(|c| (c.name(), *c)).collect()
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Filename => "filename",
            Column::LineNo => "lineno",
            Column::Date => "date",
            Column::Flag => "flag",
            Column::Payee => "payee",
            Column::Narration => "narration",
            Column::Tags => "tags",
            Column::Links => "links",
            Column::Account => "account",
            Column::Number => "number",
            Column::Currency => "currency",
            Column::Change => "change",
        }
    }

    pub fn dtype(self) -> DataType {
        match self {
            Column::Type
            | Column::Filename
            | Column::Flag
            | Column::Payee
            | Column::Narration
            | Column::Account
            | Column::Currency => DataType::String,
            Column::LineNo => DataType::Integer,
            Column::Date => DataType::Date,
            Column::Tags | Column::Links => DataType::Set,
            Column::Number => DataType::Decimal,
            Column::Change => DataType::Position,
        }
    }
}

impl Context {
    pub const ALL: [Context; 2] = [Context::Postings, Context::Entries];

    pub fn name(self) -> &'static str {
        match self {
            Context::Postings => "postings",
            Context::Entries => "entries",
        }
    }

    fn table(self) -> &'static IndexMap<&'static str, Column> {
        match self {
            Context::Postings => LazyLock::force(&POSTINGS_TABLE),
            Context::Entries => LazyLock::force(&ENTRIES_TABLE),
        }
    }

    /// Columns exposed by this context, in declared order
    pub fn columns(self) -> impl ExactSizeIterator<Item = EvalColumn> {
        self.table().values().map(move |&column| EvalColumn {
            context: self,
            column,
        })
    }

    /// Resolve a column name in this context, ignoring case
    pub fn column(self, name: &str) -> Result<EvalColumn> {
        let key = name.to_ascii_lowercase();
        if let Some(&column) = self.table().get(key.as_str()) {
            return Ok(EvalColumn {
                context: self,
                column,
            });
        }
        let elsewhere = Context::ALL
            .iter()
            .any(|other| *other != self && other.table().contains_key(key.as_str()));
        if elsewhere {
            Err(CompilationError::InvalidContextColumn {
                name: name.to_string(),
                context: self,
            })
        } else {
            Err(CompilationError::UnknownColumn(name.to_string()))
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compiled reference to a column of the current row
///
/// A column read in the postings context is distinct from the column of the
/// same name read in the entries context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvalColumn {
    pub context: Context,
    pub column: Column,
}

impl EvalColumn {
    pub fn name(&self) -> &'static str {
        self.column.name()
    }

    pub fn dtype(&self) -> DataType {
        self.column.dtype()
    }
}

// ============ Functions ============

/// Every function a compiled tree can call, operators included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Scalar functions
    Length,
    Year,
    Month,
    Day,
    Units,
    Cost,

    // Aggregates
    Sum,
    Count,
    First,
    Last,
    Min,
    Max,

    // Operators
    Not,
    And,
    Or,
    Equal,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Match,
}

/// Parameter slot of a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Is(DataType),
    Any,
}

impl Param {
    fn accepts(self, dtype: DataType) -> bool {
        match self {
            Param::Is(expected) => expected == dtype,
            Param::Any => true,
        }
    }
}

/// How a signature determines its result type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    Fixed(DataType),
    /// Same type as the first argument
    FirstArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [Param],
    pub returns: Returns,
}

const fn sig(params: &'static [Param], returns: DataType) -> Signature {
    Signature {
        params,
        returns: Returns::Fixed(returns),
    }
}

use DataType as T;
use Param::{Any, Is};

const LENGTH: &[Signature] = &[
    sig(&[Is(T::String)], T::Integer),
    sig(&[Is(T::Set)], T::Integer),
];
const DATE_PART: &[Signature] = &[sig(&[Is(T::Date)], T::Integer)];
const HOLDINGS: &[Signature] = &[
    sig(&[Is(T::Inventory)], T::Inventory),
    sig(&[Is(T::Position)], T::Inventory),
];
const SUM: &[Signature] = &[
    sig(&[Is(T::Integer)], T::Integer),
    sig(&[Is(T::Decimal)], T::Decimal),
    sig(&[Is(T::Float)], T::Float),
    sig(&[Is(T::Position)], T::Inventory),
    sig(&[Is(T::Inventory)], T::Inventory),
];
const COUNT: &[Signature] = &[sig(&[Any], T::Integer)];
const PICK: &[Signature] = &[Signature {
    params: &[Any],
    returns: Returns::FirstArg,
}];
const UNARY_BOOL: &[Signature] = &[sig(&[Any], T::Boolean)];
const BINARY_BOOL: &[Signature] = &[sig(&[Any, Any], T::Boolean)];
const MATCH: &[Signature] = &[sig(&[Is(T::String), Is(T::String)], T::Boolean)];

impl Function {
    /// Look up a function callable by name (operators are not)
    pub fn from_name(name: &str) -> Option<Function> {
        let f = match name.to_ascii_lowercase().as_str() {
            "length" => Function::Length,
            "year" => Function::Year,
            "month" => Function::Month,
            "day" => Function::Day,
            "units" => Function::Units,
            "cost" => Function::Cost,
            "sum" => Function::Sum,
            "count" => Function::Count,
            "first" => Function::First,
            "last" => Function::Last,
            "min" => Function::Min,
            "max" => Function::Max,
            _ => return None,
        };
        Some(f)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Length => "length",
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Units => "units",
            Function::Cost => "cost",
            Function::Sum => "sum",
            Function::Count => "count",
            Function::First => "first",
            Function::Last => "last",
            Function::Min => "min",
            Function::Max => "max",
            Function::Not => "not",
            Function::And => "and",
            Function::Or => "or",
            Function::Equal => "equal",
            Function::Greater => "greater",
            Function::GreaterEq => "greater_eq",
            Function::Less => "less",
            Function::LessEq => "less_eq",
            Function::Match => "match",
        }
    }

    /// Aggregates accumulate across rows instead of computing per row
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Function::Sum
                | Function::Count
                | Function::First
                | Function::Last
                | Function::Min
                | Function::Max
        )
    }

    pub fn signatures(self) -> &'static [Signature] {
        match self {
            Function::Length => LENGTH,
            Function::Year | Function::Month | Function::Day => DATE_PART,
            Function::Units | Function::Cost => HOLDINGS,
            Function::Sum => SUM,
            Function::Count => COUNT,
            Function::First | Function::Last | Function::Min | Function::Max => PICK,
            Function::Not => UNARY_BOOL,
            Function::And
            | Function::Or
            | Function::Equal
            | Function::Greater
            | Function::GreaterEq
            | Function::Less
            | Function::LessEq => BINARY_BOOL,
            Function::Match => MATCH,
        }
    }

    /// Result type of calling this function with arguments of the given types,
    /// or `None` when no signature matches
    pub fn resolve(self, arg_types: &[DataType]) -> Option<DataType> {
        self.signatures().iter().find_map(|signature| {
            let matches = signature.params.len() == arg_types.len()
                && signature
                    .params
                    .iter()
                    .zip(arg_types)
                    .all(|(param, dtype)| param.accepts(*dtype));
            if !matches {
                return None;
            }
            match signature.returns {
                Returns::Fixed(dtype) => Some(dtype),
                Returns::FirstArg => arg_types.first().copied(),
            }
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_types() {
        let expected = [
            (Column::Type, T::String),
            (Column::Filename, T::String),
            (Column::LineNo, T::Integer),
            (Column::Date, T::Date),
            (Column::Flag, T::String),
            (Column::Payee, T::String),
            (Column::Narration, T::String),
            (Column::Tags, T::Set),
            (Column::Links, T::Set),
            (Column::Account, T::String),
            (Column::Number, T::Decimal),
            (Column::Currency, T::String),
            (Column::Change, T::Position),
        ];
        for (column, dtype) in expected {
            assert_eq!(column.dtype(), dtype, "{}", column.name());
        }
    }

    #[test]
    fn context_column_sets() {
        assert_eq!(Context::Postings.columns().len(), 13);
        assert_eq!(Context::Entries.columns().len(), 9);

        let names: Vec<_> = Context::Entries.columns().map(|c| c.name()).collect();
        assert_eq!(
            names,
            [
                "type",
                "filename",
                "lineno",
                "date",
                "flag",
                "payee",
                "narration",
                "tags",
                "links"
            ]
        );
    }

    #[test]
    fn column_names_are_case_insensitive() {
        let upper = Context::Postings.column("ACCOUNT").unwrap();
        assert_eq!(upper, Context::Postings.column("account").unwrap());
        assert!(matches!(
            Context::Entries.column("Number"),
            Err(CompilationError::InvalidContextColumn { .. })
        ));
    }

    #[test]
    fn same_name_differs_across_contexts() {
        let postings = Context::Postings.column("date").unwrap();
        let entries = Context::Entries.column("date").unwrap();
        assert_ne!(postings, entries);
        assert_eq!(postings.dtype(), entries.dtype());
    }

    #[test]
    fn unknown_and_cross_context_columns() {
        assert!(matches!(
            Context::Postings.column("invalid"),
            Err(CompilationError::UnknownColumn(_))
        ));
        assert!(matches!(
            Context::Entries.column("account"),
            Err(CompilationError::InvalidContextColumn {
                context: Context::Entries,
                ..
            })
        ));
    }

    #[test]
    fn resolve_signatures() {
        assert_eq!(Function::Sum.resolve(&[T::Integer]), Some(T::Integer));
        assert_eq!(Function::Sum.resolve(&[T::Decimal]), Some(T::Decimal));
        assert_eq!(Function::Sum.resolve(&[T::Position]), Some(T::Inventory));
        assert_eq!(Function::Sum.resolve(&[T::String]), None);
        assert_eq!(Function::Sum.resolve(&[T::Date, T::String]), None);
        assert_eq!(Function::First.resolve(&[T::Float]), Some(T::Float));
        assert_eq!(Function::Units.resolve(&[T::Position]), Some(T::Inventory));
        assert_eq!(Function::Units.resolve(&[T::Integer]), None);
        assert_eq!(Function::And.resolve(&[T::Integer, T::Integer]), Some(T::Boolean));
        assert_eq!(Function::Count.resolve(&[]), None);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(Function::from_name("SUM"), Some(Function::Sum));
        assert_eq!(Function::from_name("Length"), Some(Function::Length));
        assert_eq!(Function::from_name("and"), None);
        assert_eq!(Function::from_name("nope"), None);
    }

    #[test]
    fn aggregate_marker() {
        let aggregates: Vec<_> = [
            Function::Length,
            Function::Sum,
            Function::Count,
            Function::First,
            Function::Last,
            Function::Min,
            Function::Max,
            Function::And,
        ]
        .into_iter()
        .filter(|f| f.is_aggregate())
        .collect();
        assert_eq!(aggregates.len(), 6);
    }
}
