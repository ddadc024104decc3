//! SELECT statement compilation
//!
//! Clauses are compiled in a fixed order, and the first violation aborts:
//! FROM, targets, WHERE, GROUP BY, HAVING, ORDER BY. The result is handed
//! to the execution engine as-is.

use crate::CompilationError;
use crate::ast::{Expr, FromClause, OrderBy, Ordering, Reference, Select};
use crate::classify::{ExprKind, get_columns_and_aggregates, has_aggregates};
use crate::compile::compile_expression;
use crate::names::{Resolved, compile_targets, resolve_reference};
use crate::node::EvalNode;
use crate::registry::Context;

type Result<T> = std::result::Result<T, CompilationError>;

/// One output column of a compiled query
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTarget {
    pub expression: EvalNode,
    /// Unique display name; `None` for invisible targets that only carry a
    /// GROUP BY key and are not rendered
    pub name: Option<String>,
}

impl CompiledTarget {
    pub fn is_visible(&self) -> bool {
        self.name.is_some()
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.expression.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFrom {
    /// Entry filter; never contains aggregates
    pub filter: Option<EvalNode>,
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderKey {
    /// Index into `CompiledSelect::targets`
    Target(usize),
    /// Expression computed only for sorting
    Expression(EvalNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOrderBy {
    pub keys: Vec<OrderKey>,
    pub ordering: Ordering,
}

/// A fully compiled query, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSelect {
    /// Row context the query was compiled in
    pub context: Context,
    /// Visible targets first, then any invisible GROUP BY targets
    pub targets: Vec<CompiledTarget>,
    pub from: Option<CompiledFrom>,
    pub where_clause: Option<EvalNode>,
    /// Indexes into `targets`:
    /// - `None`: row-level query, no grouping
    /// - `Some([])`: aggregate-only query, one group over all rows
    pub group_by: Option<Vec<usize>>,
    pub order_by: Option<CompiledOrderBy>,
    pub distinct: bool,
    pub limit: Option<u64>,
}

impl CompiledSelect {
    pub fn visible_targets(&self) -> impl Iterator<Item = &CompiledTarget> {
        self.targets.iter().filter(|t| t.is_visible())
    }
}

/// Compile a SELECT statement over postings
pub fn compile_select(select: &Select) -> Result<CompiledSelect> {
    compile_select_in(select, Context::Postings)
}

/// Compile a SELECT statement in the given row context
pub fn compile_select_in(select: &Select, context: Context) -> Result<CompiledSelect> {
    let from = select
        .from
        .as_ref()
        .map(|from| compile_from(from, context))
        .transpose()?;

    let mut targets = compile_targets(&select.targets, context)?;
    let kinds = classify_targets(&targets)?;

    let where_clause = select
        .where_clause
        .as_ref()
        .map(|expr| compile_filter(expr, context, CompilationError::AggregateInWhere))
        .transpose()?;

    let group_by = compile_group_by(select.group_by.as_deref(), &mut targets, &kinds, context)?;

    // HAVING is not supported yet; reject rather than silently ignore it
    if select.having.is_some() {
        return Err(CompilationError::HavingNotSupported);
    }

    let order_by = select
        .order_by
        .as_ref()
        .map(|order_by| compile_order_by(order_by, &targets, context))
        .transpose()?;

    log::debug!(
        "compiled select in {} context: {} targets ({} invisible), group_by={:?}",
        context,
        targets.len(),
        targets.len() - kinds.len(),
        group_by
    );

    Ok(CompiledSelect {
        context,
        targets,
        from,
        where_clause,
        group_by,
        order_by,
        distinct: select.distinct,
        limit: select.limit,
    })
}

fn compile_from(from: &FromClause, context: Context) -> Result<CompiledFrom> {
    let filter = from
        .expression
        .as_ref()
        .map(|expr| compile_filter(expr, context, CompilationError::AggregateInFrom))
        .transpose()?;
    Ok(CompiledFrom {
        filter,
        close: from.close,
    })
}

/// Compile a row filter, rejecting aggregates with `reject`
fn compile_filter(
    expr: &Expr,
    context: Context,
    reject: fn(String) -> CompilationError,
) -> Result<EvalNode> {
    let node = compile_expression(expr, context)?;
    if has_aggregates(&node)? {
        return Err(reject(expr.to_string()));
    }
    Ok(node)
}

/// Classify each target, rejecting targets that mix row columns and aggregates
fn classify_targets(targets: &[CompiledTarget]) -> Result<Vec<ExprKind>> {
    targets
        .iter()
        .map(|target| {
            let kind = get_columns_and_aggregates(&target.expression)?.kind();
            if kind == ExprKind::Mixed {
                return Err(CompilationError::MixedAggregates(target.label()));
            }
            Ok(kind)
        })
        .collect()
}

/// Resolve GROUP BY keys to target indexes, appending invisible targets for
/// keys that are not selected
///
/// `kinds` covers the selected targets only; appended targets are scalar.
fn compile_group_by(
    group_by: Option<&[Reference]>,
    targets: &mut Vec<CompiledTarget>,
    kinds: &[ExprKind],
    context: Context,
) -> Result<Option<Vec<usize>>> {
    let is_aggregate_query = kinds.contains(&ExprKind::Aggregate);

    let Some(columns) = group_by else {
        if !is_aggregate_query {
            return Ok(None);
        }
        // Without GROUP BY, an aggregate query may only select aggregates
        let ungrouped = ungrouped_labels(targets, kinds, &[]);
        if !ungrouped.is_empty() {
            return Err(CompilationError::UngroupedTargets(ungrouped.join(", ")));
        }
        return Ok(Some(Vec::new()));
    };

    let mut indexes = Vec::with_capacity(columns.len());
    for reference in columns {
        let index = match resolve_reference(reference, targets, context, "GROUP BY")? {
            Resolved::Target(index) => {
                if kinds.get(index) == Some(&ExprKind::Aggregate) {
                    return Err(match reference {
                        Reference::Expr(expr) if expr.as_name().is_none() => {
                            CompilationError::AggregateGroupKey(expr.to_string())
                        }
                        _ => CompilationError::GroupByAggregateTarget(targets[index].label()),
                    });
                }
                index
            }
            Resolved::Expression(expression) => {
                if has_aggregates(&expression)? {
                    return Err(CompilationError::AggregateGroupKey(expression.to_string()));
                }
                log::trace!("GROUP BY key {} appended as invisible target", expression);
                targets.push(CompiledTarget {
                    expression,
                    name: None,
                });
                targets.len() - 1
            }
        };

        let key = &targets[index].expression;
        let dtype = key.dtype();
        if !dtype.is_hashable() {
            return Err(CompilationError::NonHashableGroupKey {
                key: key.to_string(),
                dtype: dtype.name(),
            });
        }
        log::trace!("GROUP BY key resolved to target {}", index);
        indexes.push(index);
    }

    if is_aggregate_query {
        let missing = ungrouped_labels(targets, kinds, &indexes);
        if !missing.is_empty() {
            return Err(CompilationError::NotCoveredByGroupBy(missing.join(", ")));
        }
    }

    Ok(Some(indexes))
}

/// Labels of selected scalar targets not structurally equal to any key
fn ungrouped_labels(targets: &[CompiledTarget], kinds: &[ExprKind], keys: &[usize]) -> Vec<String> {
    let is_key = |target: &CompiledTarget| {
        keys.iter()
            .any(|&key| targets[key].expression == target.expression)
    };
    targets
        .iter()
        .zip(kinds)
        .filter(|(target, kind)| kind.is_scalar() && !is_key(target))
        .map(|(target, _)| target.label())
        .collect()
}

fn compile_order_by(
    order_by: &OrderBy,
    targets: &[CompiledTarget],
    context: Context,
) -> Result<CompiledOrderBy> {
    let keys = order_by
        .columns
        .iter()
        .map(|reference| {
            match resolve_reference(reference, targets, context, "ORDER BY")? {
                Resolved::Target(index) => Ok(OrderKey::Target(index)),
                Resolved::Expression(expression) => {
                    // Scalar or aggregate, but not both
                    if get_columns_and_aggregates(&expression)?.kind() == ExprKind::Mixed {
                        return Err(CompilationError::MixedOrderKey(expression.to_string()));
                    }
                    log::trace!("ORDER BY key {} computed for sorting only", expression);
                    Ok(OrderKey::Expression(expression))
                }
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CompiledOrderBy {
        keys,
        ordering: order_by.ordering,
    })
}
