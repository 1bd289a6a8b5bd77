//! Table metadata consumed by the optimizer.
//!
//! The storage layer owns the actual tables. The optimizer only needs their shape, which it
//! reads through [`TableMetadata`]. A [`Catalog`] is handed explicitly to whoever builds plans
//! so that tests can work with fixture tables.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::bail;
use strum_macros::Display;

use crate::error::{OptResult, OptimizerError};
use crate::plan::ColumnId;

/// Semantic type of a column or expression.
#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Null,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int | DataType::Long | DataType::Float | DataType::Double
        )
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDefinition {
    pub fn new<S: Into<String>>(name: S, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Read-only view of a table backed by the storage layer.
pub trait TableMetadata: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn column_count(&self) -> usize;

    fn column_name(&self, column_id: ColumnId) -> &str;

    fn column_data_type(&self, column_id: ColumnId) -> DataType;

    fn column_is_nullable(&self, column_id: ColumnId) -> bool;

    fn row_count(&self) -> u64;

    fn find_column_id(&self, name: &str) -> Option<ColumnId> {
        (0..self.column_count())
            .map(ColumnId::from)
            .find(|column_id| self.column_name(*column_id) == name)
    }
}

/// Table metadata held in memory, used for static tables and fixtures.
#[derive(Clone, Debug)]
pub struct MemoryTable {
    name: String,
    columns: Vec<ColumnDefinition>,
    row_count: u64,
}

impl MemoryTable {
    pub fn new<S: Into<String>>(name: S, columns: Vec<ColumnDefinition>, row_count: u64) -> Self {
        Self {
            name: name.into(),
            columns,
            row_count,
        }
    }
}

impl TableMetadata for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, column_id: ColumnId) -> &str {
        &self.columns[column_id.index()].name
    }

    fn column_data_type(&self, column_id: ColumnId) -> DataType {
        self.columns[column_id.index()].data_type
    }

    fn column_is_nullable(&self, column_id: ColumnId) -> bool {
        self.columns[column_id.index()].nullable
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }
}

/// Name to table lookup.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Arc<dyn TableMetadata>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its own name, replacing any previous table of that name.
    pub fn add_table(&mut self, table: Arc<dyn TableMetadata>) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn table(&self, name: &str) -> OptResult<Arc<dyn TableMetadata>> {
        match self.tables.get(name) {
            Some(table) => Ok(table.clone()),
            None => bail!(OptimizerError::TableNotFound(name.to_string())),
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}
