//! Database engine — the catalog plus per-table storage, and the
//! embedded `execute` entry point.

use ahash::AHashMap;
use tracing::debug;

use crate::error::{RelicError, RelicResult};
use crate::schema::{Catalog, TableSchema};
use crate::sql::executor::{Executor, QueryResult};
use crate::sql::parser;
use crate::storage::Table;

/// An in-memory database: a schema catalog and one [`Table`] per schema.
///
/// The engine is single-threaded; callers embedding it from multiple
/// threads must supply their own mutual exclusion.
#[derive(Debug, Default)]
pub struct Database {
    catalog: Catalog,
    tables: AHashMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Parses and executes a single SQL statement.
    pub fn execute(&mut self, sql: &str) -> RelicResult<QueryResult> {
        let stmt = parser::parse(sql)?;
        debug!(statement = %stmt, "executing statement");
        Executor::new(self).execute(&stmt)
    }

    /// Creates a table from a schema, registering it in the catalog.
    pub fn create_table(&mut self, schema: TableSchema) -> RelicResult<()> {
        let key = schema.name.to_lowercase();
        self.catalog.create_table(schema.clone())?;
        self.tables.insert(key, Table::new(schema));
        Ok(())
    }

    /// Drops a table and its schema.
    pub fn drop_table(&mut self, name: &str) -> RelicResult<()> {
        self.catalog.drop_table(name)?;
        self.tables.remove(&name.to_lowercase());
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> RelicResult<&Table> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| RelicError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> RelicResult<&mut Table> {
        self.tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| RelicError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.catalog.has_table(name)
    }

    /// Display-case names of all tables.
    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables()
    }

    pub fn get_schema(&self, name: &str) -> RelicResult<&TableSchema> {
        self.catalog.get_table(name)
    }

    /// Drops every table.
    pub fn clear(&mut self) {
        self.catalog.clear();
        self.tables.clear();
    }
}
