//! The SELECT pipeline: scan, join, filter, order, limit, project.
//!
//! Joins are nested loops over working rows. The RIGHT join emits every
//! matched pair during the forward (left-major) pass and appends the
//! unmatched right rows afterwards, so result order is deterministic.

use std::cmp::Ordering;

use ahash::AHashMap;

use crate::error::{RelicError, RelicResult};
use crate::sql::ast::{Expr, JoinClause, JoinType, OrderByItem, OrderDirection, SelectStmt};
use crate::sql::executor::eval::{eval_expr, eval_predicate};
use crate::sql::executor::{ContextTable, ExecutionContext, Executor, JoinRow, QueryResult};
use crate::value::{Value, compare_values};

impl Executor<'_> {
    pub(crate) fn execute_select(&self, stmt: &SelectStmt) -> RelicResult<QueryResult> {
        let mut ctx = ExecutionContext::new();

        // A SELECT without FROM evaluates its expressions once against an
        // empty row.
        let Some(from) = &stmt.from else {
            let empty = JoinRow::default();
            let mut columns = Vec::with_capacity(stmt.columns.len());
            let mut row = AHashMap::with_capacity(stmt.columns.len());
            for expr in &stmt.columns {
                let name = expr.to_string();
                let value = eval_expr(expr, &empty, &ctx)?;
                columns.push(name.clone());
                row.insert(name, value);
            }
            return Ok(QueryResult {
                columns,
                rows: vec![row],
                affected_rows: 0,
                message: String::new(),
            });
        };

        // Base table scan.
        ctx.add_table(self.db, &from.table)?;
        let mut rows = scan_rows(ctx.entries().last().expect("base table just added"));

        // Joins, in order.
        for join in &from.joins {
            ctx.add_table(self.db, &join.table)?;
            rows = execute_join(rows, join, &ctx)?;
        }

        // WHERE: null is falsy.
        if let Some(where_clause) = &stmt.where_clause {
            let mut filtered = Vec::with_capacity(rows.len());
            for row in rows {
                if eval_predicate(Some(where_clause), &row, &ctx)? {
                    filtered.push(row);
                }
            }
            rows = filtered;
        }

        if !stmt.order_by.is_empty() {
            rows = apply_order_by(rows, &stmt.order_by, &ctx)?;
        }

        // OFFSET drops, then LIMIT keeps.
        let offset = stmt.offset.unwrap_or(0) as usize;
        if offset > 0 {
            rows.drain(..offset.min(rows.len()));
        }
        if let Some(limit) = stmt.limit {
            rows.truncate(limit as usize);
        }

        project(&stmt.columns, &rows, &ctx)
    }
}

fn scan_rows(entry: &ContextTable<'_>) -> Vec<JoinRow> {
    entry
        .table
        .scan()
        .map(|row| JoinRow::from_row(&entry.prefix, row))
        .collect()
}

fn execute_join(
    left_rows: Vec<JoinRow>,
    join: &JoinClause,
    ctx: &ExecutionContext<'_>,
) -> RelicResult<Vec<JoinRow>> {
    let entries = ctx.entries();
    let right = entries.last().expect("right table just added");
    let right_rows = scan_rows(right);

    if join.join_type == JoinType::Cross {
        let mut result = Vec::with_capacity(left_rows.len() * right_rows.len());
        for left in &left_rows {
            for right_row in &right_rows {
                result.push(left.merge(right_row));
            }
        }
        return Ok(result);
    }

    let mut result = Vec::new();

    // Forward pass, left-major. A join without ON matches every pair.
    for left in &left_rows {
        let mut matched = false;
        for right_row in &right_rows {
            let merged = left.merge(right_row);
            if eval_predicate(join.condition.as_ref(), &merged, ctx)? {
                result.push(merged);
                matched = true;
            }
        }
        if !matched && join.join_type == JoinType::Left {
            result.push(left.merge(&JoinRow::nulls_for(&right.prefix, right.table)));
        }
    }

    // RIGHT join: append right rows no left row matched, padded with a
    // null left half.
    if join.join_type == JoinType::Right {
        let left_entries = &entries[..entries.len() - 1];
        for right_row in &right_rows {
            let mut matched = false;
            for left in &left_rows {
                let merged = left.merge(right_row);
                if eval_predicate(join.condition.as_ref(), &merged, ctx)? {
                    matched = true;
                    break;
                }
            }
            if !matched {
                let mut padded = JoinRow::default();
                for entry in left_entries {
                    padded = padded.merge(&JoinRow::nulls_for(&entry.prefix, entry.table));
                }
                result.push(padded.merge(right_row));
            }
        }
    }

    Ok(result)
}

/// Stable multi-key sort. Nulls go last ascending and first descending;
/// non-null keys compare with `compare_values`, reversed for DESC.
fn apply_order_by(
    rows: Vec<JoinRow>,
    order_by: &[OrderByItem],
    ctx: &ExecutionContext<'_>,
) -> RelicResult<Vec<JoinRow>> {
    let mut keyed: Vec<(Vec<Value>, JoinRow)> = Vec::with_capacity(rows.len());
    for row in rows {
        let keys = order_by
            .iter()
            .map(|item| ctx.resolve(&item.column, &row))
            .collect::<RelicResult<Vec<Value>>>()?;
        keyed.push((keys, row));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        for (i, item) in order_by.iter().enumerate() {
            let ascending = item.direction == OrderDirection::Asc;
            let ord = match (a[i].is_null(), b[i].is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => {
                    if ascending {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                }
                (false, true) => {
                    if ascending {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                }
                (false, false) => {
                    let ord = compare_values(&a[i], &b[i]);
                    if ascending { ord } else { ord.reverse() }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Expands the select list into display column names and projects every
/// working row through it.
fn project(
    columns: &[Expr],
    rows: &[JoinRow],
    ctx: &ExecutionContext<'_>,
) -> RelicResult<QueryResult> {
    let mut result_columns: Vec<String> = Vec::new();
    for expr in columns {
        match expr {
            Expr::Star { table: None } => {
                for entry in ctx.entries() {
                    for col in &entry.table.schema().columns {
                        result_columns.push(format!("{}.{}", entry.display, col.name));
                    }
                }
            }
            Expr::Star { table: Some(name) } => {
                let entry = ctx
                    .get(name)
                    .ok_or_else(|| RelicError::TableNotFound(name.clone()))?;
                for col in &entry.table.schema().columns {
                    result_columns.push(format!("{name}.{}", col.name));
                }
            }
            other => result_columns.push(other.to_string()),
        }
    }

    let mut result_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut projected = AHashMap::with_capacity(result_columns.len());
        for expr in columns {
            match expr {
                Expr::Star { table: None } => {
                    for entry in ctx.entries() {
                        for col in &entry.table.schema().columns {
                            let value = row
                                .get(&entry.prefix, &col.key())
                                .cloned()
                                .unwrap_or(Value::Null);
                            projected.insert(format!("{}.{}", entry.display, col.name), value);
                        }
                    }
                }
                Expr::Star { table: Some(name) } => {
                    let entry = ctx
                        .get(name)
                        .ok_or_else(|| RelicError::TableNotFound(name.clone()))?;
                    for col in &entry.table.schema().columns {
                        let value = row
                            .get(&entry.prefix, &col.key())
                            .cloned()
                            .unwrap_or(Value::Null);
                        projected.insert(format!("{name}.{}", col.name), value);
                    }
                }
                other => {
                    projected.insert(other.to_string(), eval_expr(other, row, ctx)?);
                }
            }
        }
        result_rows.push(projected);
    }

    Ok(QueryResult {
        columns: result_columns,
        rows: result_rows,
        affected_rows: 0,
        message: String::new(),
    })
}
