//! Table and column metadata — the schema catalog.
//!
//! Identifiers are case-insensitive for lookup and case-preserving for
//! display: every map in this module is keyed by the folded (lowercased)
//! name while the original spelling is kept on the definition itself.

use std::fmt;

use ahash::{AHashMap, AHashSet};

use crate::error::{RelicError, RelicResult};
use crate::value::DataType;

/// Definition of a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

impl Column {
    /// Builds a column, normalizing constraints: a primary key is
    /// implicitly unique and not-null.
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        primary_key: bool,
        unique: bool,
        not_null: bool,
    ) -> Self {
        Column {
            name: name.into(),
            data_type,
            primary_key,
            unique: unique || primary_key,
            not_null: not_null || primary_key,
        }
    }

    /// Folded name used as a lookup key.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        } else if self.unique {
            write!(f, " UNIQUE")?;
        }
        if self.not_null && !self.primary_key {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Schema of one table: an ordered column list plus derived lookups.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    column_index: AHashMap<String, usize>,
    unique_columns: AHashSet<String>,
    primary_key: Option<usize>,
}

impl TableSchema {
    /// Builds a schema, deriving the lookup maps. Fails when more than one
    /// column is declared PRIMARY KEY.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> RelicResult<Self> {
        let name = name.into();
        let mut column_index = AHashMap::with_capacity(columns.len());
        let mut unique_columns = AHashSet::new();
        let mut primary_key = None;

        for (i, col) in columns.iter().enumerate() {
            column_index.insert(col.key(), i);
            if col.primary_key {
                if primary_key.is_some() {
                    return Err(RelicError::Semantic(format!(
                        "table '{name}' has multiple primary keys"
                    )));
                }
                primary_key = Some(i);
            }
            if col.unique {
                unique_columns.insert(col.key());
            }
        }

        Ok(TableSchema {
            name,
            columns,
            column_index,
            unique_columns,
            primary_key,
        })
    }

    /// Looks a column up by name, case-insensitively.
    pub fn get_column(&self, name: &str) -> RelicResult<&Column> {
        self.column_index
            .get(&name.to_lowercase())
            .map(|&i| &self.columns[i])
            .ok_or_else(|| RelicError::ColumnNotFound {
                column: name.to_string(),
                table: Some(self.name.clone()),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(&name.to_lowercase())
    }

    /// The primary-key column, if one was declared.
    pub fn primary_key(&self) -> Option<&Column> {
        self.primary_key.map(|i| &self.columns[i])
    }

    /// Folded names of all UNIQUE (and PRIMARY KEY) columns.
    pub fn unique_columns(&self) -> &AHashSet<String> {
        &self.unique_columns
    }

    /// Column names in declaration order, original spelling.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols = self
            .columns
            .iter()
            .map(|c| format!("  {c}"))
            .collect::<Vec<_>>()
            .join(",\n");
        write!(f, "CREATE TABLE {} (\n{cols}\n);", self.name)
    }
}

/// Central registry of table schemas, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: AHashMap<String, TableSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Registers a new table schema.
    pub fn create_table(&mut self, schema: TableSchema) -> RelicResult<()> {
        let key = schema.name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(RelicError::TableExists(schema.name));
        }
        self.tables.insert(key, schema);
        Ok(())
    }

    /// Removes a table schema.
    pub fn drop_table(&mut self, name: &str) -> RelicResult<TableSchema> {
        self.tables
            .remove(&name.to_lowercase())
            .ok_or_else(|| RelicError::TableNotFound(name.to_string()))
    }

    /// Looks a schema up by name.
    pub fn get_table(&self, name: &str) -> RelicResult<&TableSchema> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| RelicError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Display-case names of all registered tables.
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.values().map(|s| s.name.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
