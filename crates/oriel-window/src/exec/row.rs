//! Row types for window evaluation.
//!
//! This module defines the [`Row`] type consumed by the evaluator. Rows
//! arrive with all expressions already resolved to named columns; the
//! evaluator only reads values, it never mutates row content.

use std::collections::HashMap;
use std::sync::Arc;

use oriel_core::Value;

/// A schema defines the column names and their order in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Column names in order (using Arc<str> to avoid cloning).
    columns: Vec<Arc<str>>,
    /// Map from column name to index for fast lookup.
    name_to_index: HashMap<Arc<str>, usize>,
}

impl Schema {
    /// Creates a new schema from column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        let arc_columns: Vec<Arc<str>> =
            columns.into_iter().map(|s| Arc::from(s.as_str())).collect();
        let name_to_index =
            arc_columns.iter().enumerate().map(|(i, name)| (Arc::clone(name), i)).collect();
        Self { columns: arc_columns, name_to_index }
    }

    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self { columns: Vec::new(), name_to_index: HashMap::new() }
    }

    /// Returns the column names as string slices.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.as_ref()).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets the index for a column name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Gets the column name at an index.
    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|s| s.as_ref())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<&str>> for Schema {
    fn from(columns: Vec<&str>) -> Self {
        Self::new(columns.into_iter().map(String::from).collect())
    }
}

/// A row of resolved values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The schema describing the columns.
    schema: Arc<Schema>,
    /// The values in this row.
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given schema and values.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the number of values doesn't match the
    /// schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(
            schema.len(),
            values.len(),
            "Row values count must match schema column count"
        );
        Self { schema, values }
    }

    /// Returns the schema of this row.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the shared schema reference.
    #[must_use]
    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Returns the values in this row.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets a value by column index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Gets a value by column name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }
}
