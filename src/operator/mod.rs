//! Node kinds of a logical plan.
//!
//! Every plan node carries one [`LogicalOperator`] plus the list of node expressions whose
//! meaning depends on the operator (the predicate of a predicate node, the predicates of a
//! join, group-by and aggregate expressions of an aggregate, ...).

mod aggregate;
pub use aggregate::*;
mod join;
pub use join::*;
mod sort;
pub use sort::*;
mod table_scan;
pub use table_scan::*;
mod union;
pub use union::*;

use std::hash::{Hash, Hasher};

use enum_as_inner::EnumAsInner;

/// Logical relational operator.
#[derive(Clone, Debug, EnumAsInner)]
pub enum LogicalOperator {
    /// Holds on to the whole plan. Has exactly one input.
    Root,
    StoredTable(TableScan),
    Mock(MockTable),
    Predicate,
    Join(Join),
    Union(Union),
    Aggregate(Aggregate),
    Projection,
    Sort(Sort),
    Limit,
}

impl LogicalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::Root => "Root",
            LogicalOperator::StoredTable(_) => "StoredTable",
            LogicalOperator::Mock(_) => "Mock",
            LogicalOperator::Predicate => "Predicate",
            LogicalOperator::Join(_) => "Join",
            LogicalOperator::Union(_) => "Union",
            LogicalOperator::Aggregate(_) => "Aggregate",
            LogicalOperator::Projection => "Projection",
            LogicalOperator::Sort(_) => "Sort",
            LogicalOperator::Limit => "Limit",
        }
    }

    /// Number of inputs a node of this kind must have.
    pub fn input_count(&self) -> usize {
        match self {
            LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_) => 0,
            LogicalOperator::Join(_) | LogicalOperator::Union(_) => 2,
            LogicalOperator::Root
            | LogicalOperator::Predicate
            | LogicalOperator::Aggregate(_)
            | LogicalOperator::Projection
            | LogicalOperator::Sort(_)
            | LogicalOperator::Limit => 1,
        }
    }

    /// Compares everything but inputs and node expressions.
    pub fn shallow_eq(&self, other: &LogicalOperator) -> bool {
        match (self, other) {
            (LogicalOperator::Root, LogicalOperator::Root)
            | (LogicalOperator::Predicate, LogicalOperator::Predicate)
            | (LogicalOperator::Projection, LogicalOperator::Projection)
            | (LogicalOperator::Limit, LogicalOperator::Limit) => true,
            (LogicalOperator::StoredTable(l), LogicalOperator::StoredTable(r)) => l == r,
            (LogicalOperator::Mock(l), LogicalOperator::Mock(r)) => l == r,
            (LogicalOperator::Join(l), LogicalOperator::Join(r)) => l == r,
            (LogicalOperator::Union(l), LogicalOperator::Union(r)) => l == r,
            (LogicalOperator::Aggregate(l), LogicalOperator::Aggregate(r)) => l == r,
            (LogicalOperator::Sort(l), LogicalOperator::Sort(r)) => l == r,
            _ => false,
        }
    }

    /// Hash consistent with [`LogicalOperator::shallow_eq`].
    pub fn shallow_hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        match self {
            LogicalOperator::StoredTable(table_scan) => table_scan.hash(state),
            LogicalOperator::Mock(mock) => mock.hash(state),
            LogicalOperator::Join(join) => join.hash(state),
            LogicalOperator::Union(union) => union.hash(state),
            LogicalOperator::Aggregate(aggregate) => aggregate.hash(state),
            LogicalOperator::Sort(sort) => sort.hash(state),
            LogicalOperator::Root
            | LogicalOperator::Predicate
            | LogicalOperator::Projection
            | LogicalOperator::Limit => {}
        }
    }
}
