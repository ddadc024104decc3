//! Target naming and symbolic reference resolution
//!
//! - Expands `SELECT *` into one target per context column
//! - Gives every visible target a unique name
//! - Resolves GROUP BY / ORDER BY entries (positions, names, expressions)
//!   against the compiled target list

use std::collections::HashSet;

use crate::CompilationError;
use crate::ast::{BinOp, Expr, Reference, Targets, UnaryOp};
use crate::compile::compile_expression;
use crate::node::EvalNode;
use crate::registry::Context;
use crate::select::CompiledTarget;
use crate::types::Value;

type Result<T> = std::result::Result<T, CompilationError>;

/// First of `name`, `name_1`, `name_2`, ... not present in `used`
pub fn find_unique_name(name: &str, used: &HashSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{name}_{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Compile the SELECT list, naming each target
///
/// Names come from the explicit alias or, failing that, from the expression's
/// surface form; collisions get numeric suffixes.
pub(crate) fn compile_targets(targets: &Targets, context: Context) -> Result<Vec<CompiledTarget>> {
    let mut used = HashSet::new();
    match targets {
        Targets::Wildcard => Ok(context
            .columns()
            .map(|column| CompiledTarget {
                name: Some(claim_name(column.name(), &mut used)),
                expression: EvalNode::Column(column),
            })
            .collect()),
        Targets::List(list) => list
            .iter()
            .map(|target| {
                let expression = compile_expression(&target.expression, context)?;
                let base = match &target.name {
                    Some(alias) => alias.clone(),
                    None => expression_name(&target.expression),
                };
                Ok(CompiledTarget {
                    name: Some(claim_name(&base, &mut used)),
                    expression,
                })
            })
            .collect(),
    }
}

fn claim_name(base: &str, used: &mut HashSet<String>) -> String {
    let name = find_unique_name(base, used);
    used.insert(name.clone());
    name
}

/// Name derived from an expression's surface form, e.g. `length_account`
pub(crate) fn expression_name(expr: &Expr) -> String {
    match expr {
        Expr::Column(name) => name.clone(),
        Expr::Constant(value) => format!("c{}", sanitize(&constant_text(value))),
        Expr::UnaryOp(UnaryOp::Not, operand) => format!("not_{}", expression_name(operand)),
        Expr::BinaryOp(lhs, op, rhs) => format!(
            "{}_{}_{}",
            binop_name(*op),
            expression_name(lhs),
            expression_name(rhs)
        ),
        Expr::Function(name, args) if args.is_empty() => name.to_ascii_lowercase(),
        Expr::Function(name, args) => {
            let args: Vec<String> = args.iter().map(expression_name).collect();
            format!("{}_{}", name.to_ascii_lowercase(), args.join("_"))
        }
    }
}

fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Eq => "equal",
        BinOp::Ne => "not_equal",
        BinOp::Lt => "less",
        BinOp::Le => "less_eq",
        BinOp::Gt => "greater",
        BinOp::Ge => "greater_eq",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Match => "match",
    }
}

fn constant_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lowercase, with each run of characters outside `[a-z0-9]` replaced by `_`
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out
}

// ============ References ============

/// What a GROUP BY / ORDER BY entry refers to
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolved {
    /// Index into the target list
    Target(usize),
    /// Expression not among the targets
    Expression(EvalNode),
}

/// Resolve a reference against the visible targets
///
/// Positions are 1-based. A bare name matching a target name refers to that
/// target; anything else is compiled in `context`, and reuses a target whose
/// expression is structurally equal.
pub(crate) fn resolve_reference(
    reference: &Reference,
    targets: &[CompiledTarget],
    context: Context,
    clause: &'static str,
) -> Result<Resolved> {
    let visible = targets.iter().filter(|t| t.is_visible()).count();
    match reference {
        Reference::Index(index) => {
            if *index == 0 || *index > visible {
                return Err(CompilationError::IndexOutOfRange {
                    clause,
                    index: *index,
                    count: visible,
                });
            }
            Ok(Resolved::Target(index - 1))
        }
        Reference::Expr(expr) => {
            if let Some(name) = expr.as_name()
                && let Some(index) = targets
                    .iter()
                    .position(|t| t.name.as_deref() == Some(name))
            {
                return Ok(Resolved::Target(index));
            }
            let expression = compile_expression(expr, context)?;
            match targets.iter().position(|t| t.expression == expression) {
                Some(index) => Ok(Resolved::Target(index)),
                None => Ok(Resolved::Expression(expression)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Target;
    use crate::ast::helpers::*;
    use chrono::NaiveDate;

    fn used(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unique_names() {
        assert_eq!(find_unique_name("date", &used(&[])), "date");
        assert_eq!(find_unique_name("date", &used(&["account", "number"])), "date");
        assert_eq!(find_unique_name("date", &used(&["date", "number"])), "date_1");
        assert_eq!(
            find_unique_name("date", &used(&["date", "date_1", "date_3"])),
            "date_2"
        );
    }

    #[test]
    fn derived_names() {
        assert_eq!(expression_name(&col("account")), "account");
        assert_eq!(
            expression_name(&func("length", vec![col("account")])),
            "length_account"
        );
        assert_eq!(
            expression_name(&func("SUM", vec![func("units", vec![col("change")])])),
            "sum_units_change"
        );
        assert_eq!(expression_name(&not(col("payee"))), "not_payee");
        assert_eq!(
            expression_name(&col("number").binop(BinOp::Gt, lit_int(100))),
            "greater_number_c100"
        );
        assert_eq!(expression_name(&lit_str("Assets:Cash")), "cassets_cash");
        let date = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        assert_eq!(expression_name(&lit_date(date)), "c2014_01_01");
    }

    #[test]
    fn wildcard_targets() {
        let targets = compile_targets(&Targets::Wildcard, Context::Postings).unwrap();
        assert_eq!(targets.len(), Context::Postings.columns().len());
        assert!(
            targets
                .iter()
                .all(|t| matches!(t.expression, EvalNode::Column(_)))
        );
        assert_eq!(targets[0].name.as_deref(), Some("type"));
    }

    #[test]
    fn colliding_names_are_suffixed() {
        let list = Targets::List(vec![
            Target::new(col("date")),
            Target::new(col("date")),
            Target::named(col("account"), "date_1"),
            Target::new(col("date")),
        ]);
        let targets = compile_targets(&list, Context::Postings).unwrap();
        let names: Vec<_> = targets.iter().filter_map(|t| t.name.as_deref()).collect();
        assert_eq!(names, ["date", "date_1", "date_1_1", "date_2"]);
    }

    #[test]
    fn resolve_by_position_and_name() {
        let list = Targets::List(vec![
            Target::new(col("date")),
            Target::named(col("payee"), "p"),
        ]);
        let targets = compile_targets(&list, Context::Postings).unwrap();
        let resolve = |r: Reference| resolve_reference(&r, &targets, Context::Postings, "GROUP BY");

        assert_eq!(resolve(Reference::Index(2)).unwrap(), Resolved::Target(1));
        assert_eq!(resolve(Reference::from(col("p"))).unwrap(), Resolved::Target(1));
        // Same expression as a target, under its column name
        assert_eq!(resolve(Reference::from(col("payee"))).unwrap(), Resolved::Target(1));
        assert!(matches!(
            resolve(Reference::from(col("account"))).unwrap(),
            Resolved::Expression(_)
        ));
        assert!(matches!(
            resolve(Reference::Index(3)),
            Err(CompilationError::IndexOutOfRange { index: 3, count: 2, .. })
        ));
        assert!(resolve(Reference::Index(0)).is_err());
        assert!(matches!(
            resolve(Reference::from(col("something"))),
            Err(CompilationError::UnknownColumn(_))
        ));
    }
}
