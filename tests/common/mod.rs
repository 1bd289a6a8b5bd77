#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use lqp_reuse::catalog::{Catalog, ColumnDefinition, DataType, MemoryTable};
use lqp_reuse::config::OptimizerContext;
use lqp_reuse::plan::{ColumnId, LogicalPlan, NodeId, PlanVisitation};
use lqp_reuse::rules::{Rule, SubplanReuseRule};

pub fn init_logger() {
    let _ = env_logger::try_init();
}

pub fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_table(Arc::new(MemoryTable::new(
        "int_int",
        vec![
            ColumnDefinition::new("a", DataType::Int, false),
            ColumnDefinition::new("b", DataType::Int, true),
        ],
        1000,
    )));
    catalog.add_table(Arc::new(MemoryTable::new(
        "int_float",
        vec![
            ColumnDefinition::new("a", DataType::Int, false),
            ColumnDefinition::new("b", DataType::Float, true),
        ],
        500,
    )));
    catalog
}

pub fn int_mock(plan: &mut LogicalPlan, name: &str, column: &str) -> NodeId {
    plan.mock(name, vec![ColumnDefinition::new(column, DataType::Int, false)])
}

pub fn two_column_mock(plan: &mut LogicalPlan, name: &str) -> NodeId {
    plan.mock(
        name,
        vec![
            ColumnDefinition::new("a", DataType::Int, false),
            ColumnDefinition::new("b", DataType::Long, true),
        ],
    )
}

/// Runs the reuse rule with the default configuration.
pub fn apply_reuse(plan: &mut LogicalPlan, root: NodeId) -> bool {
    SubplanReuseRule::new()
        .apply(plan, root, &OptimizerContext::default())
        .unwrap()
}

pub fn reachable_nodes(plan: &LogicalPlan, root: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![];
    plan.visit_downward(root, |node_id| {
        nodes.push(node_id);
        PlanVisitation::VisitInputs
    });
    nodes
}

/// `(nullable, data type)` of every output column.
pub fn schema(plan: &LogicalPlan, node_id: NodeId) -> Vec<(bool, DataType)> {
    (0..plan.column_expressions(node_id).len())
        .map(ColumnId::from)
        .map(|column_id| {
            (
                plan.is_column_nullable(node_id, column_id),
                plan.column_data_type(node_id, column_id),
            )
        })
        .collect()
}

pub fn schemas(plan: &LogicalPlan, root: NodeId) -> HashMap<NodeId, Vec<(bool, DataType)>> {
    reachable_nodes(plan, root)
        .into_iter()
        .map(|node_id| (node_id, schema(plan, node_id)))
        .collect()
}

/// Checks that every node still in the plan has the schema it had before.
pub fn assert_schemas_preserved(
    before: &HashMap<NodeId, Vec<(bool, DataType)>>,
    plan: &LogicalPlan,
    root: NodeId,
) {
    for node_id in reachable_nodes(plan, root) {
        if let Some(old_schema) = before.get(&node_id) {
            assert_eq!(
                old_schema,
                &schema(plan, node_id),
                "schema of #{} changed",
                node_id.index()
            );
        }
    }
}

/// Whether every column reference below `root` points at nodes that are still below `root`.
pub fn references_resolve(plan: &LogicalPlan, root: NodeId) -> bool {
    let reachable = plan.reachable_from(root);
    reachable_nodes(plan, root).into_iter().all(|node_id| {
        plan.node_expressions(node_id).iter().all(|expression| {
            expression.column_references().into_iter().all(|column_reference| {
                reachable.contains(&column_reference.origin())
                    && column_reference
                        .lineage()
                        .iter()
                        .all(|step| reachable.contains(&step.join))
            })
        })
    })
}

pub fn all_evaluable(plan: &LogicalPlan, root: NodeId) -> bool {
    reachable_nodes(plan, root)
        .into_iter()
        .all(|node_id| plan.node_expressions_evaluable(node_id))
}
