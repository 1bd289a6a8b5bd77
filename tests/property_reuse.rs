//! Property-based tests of subplan reuse over random plans (proptest).

mod common;

use proptest::prelude::*;

use lqp_reuse::catalog::{ColumnDefinition, DataType};
use lqp_reuse::expression::functional::{count_star, equals, greater_than, lit};
use lqp_reuse::expression::Expression;
use lqp_reuse::operator::JoinMode;
use lqp_reuse::plan::{LogicalPlan, NodeId};

use common::*;

/// Plan whose leaves are mock tables. Leaves of the same shape are structurally equal.
#[derive(Clone, Debug)]
enum PlanTree {
    Leaf(usize),
    Join(JoinMode, Box<PlanTree>, Box<PlanTree>),
    /// Filters on the first column.
    Predicate(Box<PlanTree>),
    /// Keeps the first column and adds a constant one, hiding the rest.
    Projection(Box<PlanTree>),
    /// Groups by the first column and counts rows of the left-most leaf.
    Aggregate(Box<PlanTree>),
}

fn join_mode() -> impl Strategy<Value = JoinMode> {
    prop_oneof![
        Just(JoinMode::Inner),
        Just(JoinMode::Cross),
        Just(JoinMode::Semi),
        Just(JoinMode::Left),
    ]
}

fn plan_tree() -> impl Strategy<Value = PlanTree> {
    let leaf = (0usize..3).prop_map(PlanTree::Leaf);
    leaf.prop_recursive(5, 24, 2, |inner| {
        prop_oneof![
            2 => (join_mode(), inner.clone(), inner.clone()).prop_map(|(mode, left, right)| {
                PlanTree::Join(mode, Box::new(left), Box::new(right))
            }),
            1 => inner.clone().prop_map(|input| PlanTree::Predicate(Box::new(input))),
            1 => inner.clone().prop_map(|input| PlanTree::Projection(Box::new(input))),
            1 => inner.prop_map(|input| PlanTree::Aggregate(Box::new(input))),
        ]
    })
}

fn first_column(plan: &LogicalPlan, node_id: NodeId) -> Expression {
    plan.column_expressions(node_id).swap_remove(0)
}

/// Returns the built node and the left-most leaf below it.
fn build(plan: &mut LogicalPlan, tree: &PlanTree, leaves: &mut usize) -> (NodeId, NodeId) {
    match tree {
        PlanTree::Leaf(shape) => {
            *leaves += 1;
            let columns = (0..=*shape)
                .map(|column| ColumnDefinition::new(format!("c{}", column), DataType::Int, false))
                .collect();
            let leaf = plan.mock(format!("t{}", leaves), columns);
            (leaf, leaf)
        }
        PlanTree::Join(mode, left, right) => {
            let (left, leaf) = build(plan, left, leaves);
            let (right, _) = build(plan, right, leaves);
            if *mode == JoinMode::Cross {
                return (plan.cross_join(left, right), leaf);
            }
            let predicate = equals(first_column(plan, left), first_column(plan, right));
            (plan.join(*mode, vec![predicate], left, right), leaf)
        }
        PlanTree::Predicate(input) => {
            let (input, leaf) = build(plan, input, leaves);
            let predicate = greater_than(first_column(plan, input), 0);
            (plan.predicate(predicate, input), leaf)
        }
        PlanTree::Projection(input) => {
            let (input, leaf) = build(plan, input, leaves);
            let expressions = vec![first_column(plan, input), lit(1)];
            (plan.projection(expressions, input), leaf)
        }
        PlanTree::Aggregate(input) => {
            let (input, leaf) = build(plan, input, leaves);
            let group_by = vec![first_column(plan, input)];
            (plan.aggregate(group_by, vec![count_star(leaf)], input), leaf)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn reuse_keeps_plans_valid(tree in plan_tree()) {
        init_logger();
        let mut plan = LogicalPlan::new();
        let (top, _) = build(&mut plan, &tree, &mut 0);
        let root = plan.root(top);
        prop_assume!(all_evaluable(&plan, root));

        let before = schemas(&plan, root);
        let node_count = plan.node_count();

        let changed = apply_reuse(&mut plan, root);

        prop_assert_eq!(changed, plan.node_count() < node_count);
        prop_assert!(plan.node_count() <= node_count);
        for node_id in reachable_nodes(&plan, root) {
            if let Some(old_schema) = before.get(&node_id) {
                prop_assert_eq!(old_schema, &schema(&plan, node_id));
            }
        }
        prop_assert!(references_resolve(&plan, root));
        prop_assert!(all_evaluable(&plan, root));

        prop_assert!(!apply_reuse(&mut plan, root));
    }
}
