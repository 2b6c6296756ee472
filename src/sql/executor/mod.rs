//! Query executor — evaluates parsed statements against a database.
//!
//! DDL and DML are handled here; the SELECT pipeline (scan, join, filter,
//! order, limit, project) lives in `select`, expression evaluation with
//! SQL three-valued logic in `eval`.

pub(crate) mod eval;
mod select;

use ahash::AHashMap;
use serde::Serialize;
use tracing::debug;

use crate::engine::Database;
use crate::error::{RelicError, RelicResult};
use crate::index::RowId;
use crate::schema::{Column, TableSchema};
use crate::sql::ast::{
    CreateTableStmt, DeleteStmt, DropTableStmt, InsertStmt, Statement, TableRef, UpdateStmt,
};
use crate::storage::{Row, Table};
use crate::value::Value;

/// Result of executing one statement.
///
/// SELECT fills `columns` and `rows`; DDL/DML leave them empty and carry
/// an affected-row count plus a human-readable message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<AHashMap<String, Value>>,
    pub affected_rows: u64,
    pub message: String,
}

impl QueryResult {
    fn statement(message: String, affected_rows: u64) -> Self {
        QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows,
            message,
        }
    }

    /// Number of result rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes statements against a [`Database`].
pub struct Executor<'a> {
    db: &'a mut Database,
}

impl<'a> Executor<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Executor { db }
    }

    /// Dispatches on the statement kind.
    pub fn execute(&mut self, stmt: &Statement) -> RelicResult<QueryResult> {
        match stmt {
            Statement::CreateTable(s) => self.execute_create_table(s),
            Statement::DropTable(s) => self.execute_drop_table(s),
            Statement::Insert(s) => self.execute_insert(s),
            Statement::Select(s) => self.execute_select(s),
            Statement::Update(s) => self.execute_update(s),
            Statement::Delete(s) => self.execute_delete(s),
        }
    }

    fn execute_create_table(&mut self, stmt: &CreateTableStmt) -> RelicResult<QueryResult> {
        if stmt.if_not_exists && self.db.has_table(&stmt.table_name) {
            return Ok(QueryResult::statement(
                format!("Table '{}' already exists", stmt.table_name),
                0,
            ));
        }

        let columns: Vec<Column> = stmt
            .columns
            .iter()
            .map(|def| {
                Column::new(
                    def.name.clone(),
                    def.data_type,
                    def.primary_key,
                    def.unique,
                    def.not_null,
                )
            })
            .collect();
        let schema = TableSchema::new(stmt.table_name.clone(), columns)?;
        self.db.create_table(schema)?;

        debug!(table = %stmt.table_name, "created table");
        Ok(QueryResult::statement(
            format!("Table '{}' created", stmt.table_name),
            0,
        ))
    }

    fn execute_drop_table(&mut self, stmt: &DropTableStmt) -> RelicResult<QueryResult> {
        if stmt.if_exists && !self.db.has_table(&stmt.table_name) {
            return Ok(QueryResult::statement(
                format!("Table '{}' does not exist", stmt.table_name),
                0,
            ));
        }

        self.db.drop_table(&stmt.table_name)?;

        debug!(table = %stmt.table_name, "dropped table");
        Ok(QueryResult::statement(
            format!("Table '{}' dropped", stmt.table_name),
            0,
        ))
    }

    fn execute_insert(&mut self, stmt: &InsertStmt) -> RelicResult<QueryResult> {
        let columns: Vec<String> = match &stmt.columns {
            Some(cols) => {
                // The table must exist even when the schema order is not
                // consulted.
                self.db.get_table(&stmt.table_name)?;
                cols.clone()
            }
            None => self.db.get_schema(&stmt.table_name)?.column_names(),
        };

        let mut inserted = 0u64;
        for value_list in &stmt.values {
            if value_list.len() != columns.len() {
                return Err(RelicError::Semantic(format!(
                    "column count ({}) doesn't match value count ({})",
                    columns.len(),
                    value_list.len()
                )));
            }

            let mut row_values: AHashMap<String, Value> = AHashMap::with_capacity(columns.len());
            for (col, expr) in columns.iter().zip(value_list) {
                row_values.insert(col.clone(), eval::eval_const(expr)?);
            }

            self.db.get_table_mut(&stmt.table_name)?.insert(row_values)?;
            inserted += 1;
        }

        Ok(QueryResult::statement(
            format!("Inserted {inserted} row(s)"),
            inserted,
        ))
    }

    fn execute_update(&mut self, stmt: &UpdateStmt) -> RelicResult<QueryResult> {
        // Collect matching row ids and their new values first, mutate
        // second: the scan must not observe its own writes.
        let pending = {
            let table = self.db.get_table(&stmt.table_name)?;
            let mut ctx = ExecutionContext::new();
            ctx.add_existing(&stmt.table_name, table);
            let prefix = stmt.table_name.to_lowercase();

            let mut pending: Vec<(RowId, AHashMap<String, Value>)> = Vec::new();
            for row in table.scan() {
                let working = JoinRow::from_row(&prefix, row);
                if eval::eval_predicate(stmt.where_clause.as_ref(), &working, &ctx)? {
                    let mut updates = AHashMap::with_capacity(stmt.assignments.len());
                    for (column, expr) in &stmt.assignments {
                        updates.insert(column.clone(), eval::eval_expr(expr, &working, &ctx)?);
                    }
                    pending.push((row.row_id, updates));
                }
            }
            pending
        };

        let table = self.db.get_table_mut(&stmt.table_name)?;
        let mut updated = 0u64;
        for (row_id, updates) in pending {
            if table.update(row_id, updates)?.is_some() {
                updated += 1;
            }
        }

        Ok(QueryResult::statement(
            format!("Updated {updated} row(s)"),
            updated,
        ))
    }

    fn execute_delete(&mut self, stmt: &DeleteStmt) -> RelicResult<QueryResult> {
        let to_delete = {
            let table = self.db.get_table(&stmt.table_name)?;
            let mut ctx = ExecutionContext::new();
            ctx.add_existing(&stmt.table_name, table);
            let prefix = stmt.table_name.to_lowercase();

            let mut to_delete: Vec<RowId> = Vec::new();
            for row in table.scan() {
                let working = JoinRow::from_row(&prefix, row);
                if eval::eval_predicate(stmt.where_clause.as_ref(), &working, &ctx)? {
                    to_delete.push(row.row_id);
                }
            }
            to_delete
        };

        let table = self.db.get_table_mut(&stmt.table_name)?;
        let mut deleted = 0u64;
        for row_id in to_delete {
            if table.delete(row_id).is_some() {
                deleted += 1;
            }
        }

        Ok(QueryResult::statement(
            format!("Deleted {deleted} row(s)"),
            deleted,
        ))
    }
}

// ===== Working set =====

/// One row flowing through the SELECT pipeline: values keyed by
/// (folded prefix, folded column), plus the source row id per prefix.
/// Keeping the prefix separate from the column name avoids any collision
/// between user identifiers and the bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct JoinRow {
    bindings: AHashMap<(String, String), Value>,
    row_ids: AHashMap<String, RowId>,
}

impl JoinRow {
    /// Wraps a stored row under a prefix.
    pub(crate) fn from_row(prefix: &str, row: &Row) -> Self {
        let bindings = row
            .data
            .iter()
            .map(|(col, value)| ((prefix.to_string(), col.clone()), value.clone()))
            .collect();
        let mut row_ids = AHashMap::with_capacity(1);
        row_ids.insert(prefix.to_string(), row.row_id);
        JoinRow { bindings, row_ids }
    }

    /// An all-null row for the given table under a prefix, used to pad
    /// the unmatched side of an outer join.
    pub(crate) fn nulls_for(prefix: &str, table: &Table) -> Self {
        let bindings = table
            .schema()
            .columns
            .iter()
            .map(|col| ((prefix.to_string(), col.key()), Value::Null))
            .collect();
        JoinRow {
            bindings,
            row_ids: AHashMap::new(),
        }
    }

    /// Unions two rows; on a key collision the right side wins.
    pub(crate) fn merge(&self, right: &JoinRow) -> JoinRow {
        let mut merged = self.clone();
        for (key, value) in &right.bindings {
            merged.bindings.insert(key.clone(), value.clone());
        }
        for (prefix, row_id) in &right.row_ids {
            merged.row_ids.insert(prefix.clone(), *row_id);
        }
        merged
    }

    pub(crate) fn get(&self, prefix: &str, column: &str) -> Option<&Value> {
        self.bindings
            .get(&(prefix.to_string(), column.to_string()))
    }
}

/// One table visible to a query, under its folded prefix (alias or table
/// name) with the display spelling preserved for `*` expansion.
pub(crate) struct ContextTable<'t> {
    pub(crate) prefix: String,
    pub(crate) display: String,
    pub(crate) table: &'t Table,
}

/// Tables in scope during execution, in addition order.
#[derive(Default)]
pub(crate) struct ExecutionContext<'t> {
    entries: Vec<ContextTable<'t>>,
}

impl<'t> ExecutionContext<'t> {
    pub(crate) fn new() -> Self {
        ExecutionContext::default()
    }

    /// Resolves a FROM-clause table reference and brings it into scope.
    pub(crate) fn add_table(
        &mut self,
        db: &'t Database,
        table_ref: &TableRef,
    ) -> RelicResult<()> {
        let table = db.get_table(&table_ref.name)?;
        self.add_existing(table_ref.effective_name(), table);
        Ok(())
    }

    /// Brings an already-resolved table into scope under a display name.
    pub(crate) fn add_existing(&mut self, display: &str, table: &'t Table) {
        let prefix = display.to_lowercase();
        // A repeated prefix rebinds rather than shadowing, so unqualified
        // resolution sees each prefix once.
        if let Some(existing) = self.entries.iter_mut().find(|e| e.prefix == prefix) {
            existing.display = display.to_string();
            existing.table = table;
        } else {
            self.entries.push(ContextTable {
                prefix,
                display: display.to_string(),
                table,
            });
        }
    }

    pub(crate) fn entries(&self) -> &[ContextTable<'t>] {
        &self.entries
    }

    /// Looks a prefix up case-insensitively.
    pub(crate) fn get(&self, name: &str) -> Option<&ContextTable<'t>> {
        let folded = name.to_lowercase();
        self.entries.iter().find(|e| e.prefix == folded)
    }

    /// Resolves a column reference against a working row. Unqualified
    /// names are searched across every prefix in scope: no match is an
    /// unknown column, more than one is ambiguous.
    pub(crate) fn resolve(
        &self,
        col: &crate::sql::ast::ColumnRef,
        row: &JoinRow,
    ) -> RelicResult<Value> {
        let column = col.column.to_lowercase();
        if let Some(table) = &col.table {
            return row
                .get(&table.to_lowercase(), &column)
                .cloned()
                .ok_or_else(|| RelicError::ColumnNotFound {
                    column: col.column.clone(),
                    table: Some(table.clone()),
                });
        }

        let mut found: Option<&Value> = None;
        for entry in &self.entries {
            if let Some(value) = row.get(&entry.prefix, &column) {
                if found.is_some() {
                    return Err(RelicError::AmbiguousColumn(col.column.clone()));
                }
                found = Some(value);
            }
        }
        found.cloned().ok_or_else(|| RelicError::ColumnNotFound {
            column: col.column.clone(),
            table: None,
        })
    }
}
