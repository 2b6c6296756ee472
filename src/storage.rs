//! Row storage with typed validation, constraint enforcement, and index
//! maintenance.
//!
//! A [`Table`] owns its rows, its index manager, and a per-unique-column
//! set of live values for O(1) duplicate detection. Every mutation fully
//! validates before touching any state, so a failing insert or update
//! leaves the table unchanged.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use tracing::trace;

use crate::error::{RelicError, RelicResult};
use crate::index::{IndexManager, RowId};
use crate::schema::TableSchema;
use crate::value::{Value, validate_and_coerce};

/// A single stored row: its id plus folded column name → value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_id: RowId,
    pub data: AHashMap<String, Value>,
}

impl Row {
    /// Reads a column value, case-insensitively. Absent columns read as
    /// null (they cannot occur on rows produced by [`Table::insert`]).
    pub fn get(&self, column: &str) -> Value {
        self.data
            .get(&column.to_lowercase())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Writes a column value, case-insensitively.
    pub fn set(&mut self, column: &str, value: Value) {
        self.data.insert(column.to_lowercase(), value);
    }
}

/// In-memory table: schema, rows in insertion order, secondary indexes.
#[derive(Debug)]
pub struct Table {
    schema: TableSchema,
    // BTreeMap keyed by the monotonically increasing row id gives scans
    // insertion order for free.
    rows: BTreeMap<RowId, Row>,
    next_row_id: RowId,
    indexes: IndexManager,
    unique_values: AHashMap<String, AHashSet<Value>>,
}

impl Table {
    /// Creates an empty table, with an index on the primary key and on
    /// each non-primary unique column.
    pub fn new(schema: TableSchema) -> Self {
        let mut indexes = IndexManager::new();
        if let Some(pk) = schema.primary_key() {
            indexes.create_index(&pk.name);
        }
        for col in &schema.columns {
            if col.unique && !col.primary_key {
                indexes.create_index(&col.name);
            }
        }
        let unique_values = schema
            .unique_columns()
            .iter()
            .map(|name| (name.clone(), AHashSet::new()))
            .collect();

        Table {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
            indexes,
            unique_values,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn index_manager(&self) -> &IndexManager {
        &self.indexes
    }

    /// Inserts a row. `values` maps column names (any casing) to values;
    /// columns absent from the map are bound to null, and keys unknown to
    /// the schema are ignored.
    ///
    /// Validation — NOT NULL, type coercion, and unique-duplicate checks —
    /// completes for every column before any state changes.
    pub fn insert(&mut self, values: AHashMap<String, Value>) -> RelicResult<RowId> {
        let normalized: AHashMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        let mut row_data: AHashMap<String, Value> = AHashMap::with_capacity(self.schema.columns.len());
        for col in &self.schema.columns {
            let key = col.key();
            let value = normalized.get(&key).cloned().unwrap_or(Value::Null);

            if value.is_null() && col.not_null {
                return Err(RelicError::NotNullViolation {
                    column: col.name.clone(),
                });
            }
            let value = validate_and_coerce(value, col.data_type, Some(&col.name))?;

            if col.unique && !value.is_null() && self.unique_values[&key].contains(&value) {
                return Err(duplicate_violation(col.primary_key, &col.name, &value));
            }
            row_data.insert(key, value);
        }

        let row_id = self.next_row_id;
        self.next_row_id += 1;

        for col in &self.schema.columns {
            let key = col.key();
            let value = &row_data[&key];
            if value.is_null() {
                continue;
            }
            if col.unique {
                self.unique_values
                    .get_mut(&key)
                    .expect("unique set exists for every unique column")
                    .insert(value.clone());
            }
            self.indexes.insert(&key, value.clone(), row_id);
        }

        self.rows.insert(row_id, Row { row_id, data: row_data });
        trace!(table = %self.schema.name, row_id, "inserted row");
        Ok(row_id)
    }

    /// Updates the supplied columns of one row. Returns `Ok(None)` when
    /// the row id does not exist. All columns are validated before any of
    /// them is applied.
    pub fn update(
        &mut self,
        row_id: RowId,
        values: AHashMap<String, Value>,
    ) -> RelicResult<Option<RowId>> {
        if !self.rows.contains_key(&row_id) {
            return Ok(None);
        }

        let mut coerced: Vec<(String, Value)> = Vec::with_capacity(values.len());
        for (name, value) in values {
            let col = self.schema.get_column(&name)?;
            let key = col.key();
            let old_value = self.rows[&row_id].data.get(&key).cloned().unwrap_or(Value::Null);

            if value.is_null() && col.not_null {
                return Err(RelicError::NotNullViolation {
                    column: col.name.clone(),
                });
            }
            let value = validate_and_coerce(value, col.data_type, Some(&col.name))?;

            if col.unique
                && !value.is_null()
                && value != old_value
                && self.unique_values[&key].contains(&value)
            {
                return Err(duplicate_violation(col.primary_key, &col.name, &value));
            }
            coerced.push((key, value));
        }

        for (key, new_value) in coerced {
            let col = self.schema.get_column(&key)?;
            let unique = col.unique;
            let row = self.rows.get_mut(&row_id).expect("checked above");
            let old_value = row.data.get(&key).cloned().unwrap_or(Value::Null);

            if unique {
                let set = self
                    .unique_values
                    .get_mut(&key)
                    .expect("unique set exists for every unique column");
                if !old_value.is_null() {
                    set.remove(&old_value);
                }
                if !new_value.is_null() {
                    set.insert(new_value.clone());
                }
            }
            if !old_value.is_null() {
                self.indexes.delete(&key, &old_value, row_id);
            }
            if !new_value.is_null() {
                self.indexes.insert(&key, new_value.clone(), row_id);
            }
            self.rows
                .get_mut(&row_id)
                .expect("checked above")
                .data
                .insert(key, new_value);
        }

        trace!(table = %self.schema.name, row_id, "updated row");
        Ok(Some(row_id))
    }

    /// Deletes one row, stripping its values from the unique sets and
    /// every index. Returns the removed row, or `None`.
    pub fn delete(&mut self, row_id: RowId) -> Option<Row> {
        let row = self.rows.remove(&row_id)?;

        for key in self.schema.unique_columns() {
            if let Some(value) = row.data.get(key) {
                if !value.is_null() {
                    self.unique_values
                        .get_mut(key)
                        .expect("unique set exists for every unique column")
                        .remove(value);
                }
            }
        }
        for (key, value) in &row.data {
            if !value.is_null() {
                self.indexes.delete(key, value, row_id);
            }
        }

        trace!(table = %self.schema.name, row_id, "deleted row");
        Some(row)
    }

    pub fn get(&self, row_id: RowId) -> Option<&Row> {
        self.rows.get(&row_id)
    }

    /// Iterates rows in insertion order.
    pub fn scan(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Finds rows with `column = value`, probing the column's index when
    /// one exists and falling back to a full scan otherwise.
    pub fn find_by_index(&self, column: &str, value: &Value) -> Vec<&Row> {
        match self.indexes.search(column, value) {
            Some(row_ids) => row_ids
                .into_iter()
                .filter_map(|rid| self.rows.get(&rid))
                .collect(),
            None => {
                let key = column.to_lowercase();
                self.scan()
                    .filter(|row| row.data.get(&key) == Some(value))
                    .collect()
            }
        }
    }

    /// Removes every row, resets the row-id counter, and rebuilds the
    /// (now empty) constraint indexes.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.next_row_id = 1;
        for set in self.unique_values.values_mut() {
            set.clear();
        }
        self.indexes.clear();
        if let Some(pk) = self.schema.primary_key() {
            let name = pk.name.clone();
            self.indexes.create_index(&name);
        }
        let unique: Vec<String> = self
            .schema
            .columns
            .iter()
            .filter(|c| c.unique && !c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        for name in unique {
            self.indexes.create_index(&name);
        }
    }
}

fn duplicate_violation(primary_key: bool, column: &str, value: &Value) -> RelicError {
    if primary_key {
        RelicError::PrimaryKeyViolation {
            column: column.to_string(),
            value: value.to_string(),
        }
    } else {
        RelicError::UniqueViolation {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}
