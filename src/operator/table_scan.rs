use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::catalog::{ColumnDefinition, TableMetadata};

/// Scan of a table known to the storage layer.
#[derive(Clone, Debug)]
pub struct TableScan {
    table: Arc<dyn TableMetadata>,
}

impl TableScan {
    pub fn new(table: Arc<dyn TableMetadata>) -> Self {
        Self { table }
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    pub fn table(&self) -> &dyn TableMetadata {
        self.table.as_ref()
    }
}

/// Two scans are the same operator if they read the same table.
impl PartialEq for TableScan {
    fn eq(&self, other: &Self) -> bool {
        self.table_name() == other.table_name()
    }
}

impl Eq for TableScan {}

impl Hash for TableScan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_name().hash(state);
    }
}

/// Synthetic source with fixed column definitions and no data behind it.
///
/// The name is only used for display, mock tables with the same columns are interchangeable.
#[derive(Clone, Debug)]
pub struct MockTable {
    name: Option<String>,
    columns: Vec<ColumnDefinition>,
}

impl MockTable {
    pub fn new(name: Option<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self { name, columns }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}

impl PartialEq for MockTable {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for MockTable {}

impl Hash for MockTable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.columns.hash(state);
    }
}
