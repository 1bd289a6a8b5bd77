//! Structural comparison of subplans, i.e. comparison that ignores node identity.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::expression::Expression;
use crate::plan::{ColumnReference, LogicalPlan, NodeId};

/// Node correspondence built up while comparing two subplans.
type NodeMapping = HashMap<NodeId, NodeId>;

/// Memoized structural hashes of the nodes of one plan.
///
/// Hashes stay valid only as long as the plan below the hashed nodes does not change.
#[derive(Debug, Default)]
pub struct StructuralHashes {
    hashes: HashMap<NodeId, u64>,
}

impl StructuralHashes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&mut self, plan: &LogicalPlan, node_id: NodeId) -> u64 {
        if let Some(hash) = self.hashes.get(&node_id) {
            return *hash;
        }

        let mut hasher = DefaultHasher::new();
        let node = plan.node(node_id);
        node.operator().shallow_hash(&mut hasher);
        // Column references only hash their column id, which keeps this identity insensitive
        node.expressions().hash(&mut hasher);
        for input in plan.inputs(node_id) {
            self.hash(plan, input).hash(&mut hasher);
        }

        let hash = hasher.finish();
        self.hashes.insert(node_id, hash);
        hash
    }
}

impl LogicalPlan {
    /// Hash of the subplan below `node_id` that is equal for structurally equal subplans.
    pub fn structural_hash(&self, node_id: NodeId) -> u64 {
        StructuralHashes::new().hash(self, node_id)
    }

    /// Whether the subplan below `lhs` in this plan and the one below `rhs` in `other` are
    /// structurally equal: same operators, same inputs, and node expressions that are equal once
    /// column references are translated from one subplan to the other.
    ///
    /// `other` may be `self`.
    pub fn subplans_equal(&self, lhs: NodeId, other: &LogicalPlan, rhs: NodeId) -> bool {
        let mut mapping = NodeMapping::new();
        nodes_equal(self, lhs, other, rhs, &mut mapping)
    }

    /// Pairs every node below `lhs` with its counterpart below `rhs`, or `None` if the two
    /// subplans are not structurally equal.
    pub(crate) fn subplan_correspondence(
        &self,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Option<HashMap<NodeId, NodeId>> {
        let mut mapping = NodeMapping::new();
        nodes_equal(self, lhs, self, rhs, &mut mapping).then_some(mapping)
    }

    /// Copies the subplan below `root` into `target`, returning the id of the copy of `root`.
    /// Nodes shared within the subplan stay shared in the copy.
    pub fn copy_subplan(&self, root: NodeId, target: &mut LogicalPlan) -> NodeId {
        let mut mapping = NodeMapping::new();
        self.copy_node(root, target, &mut mapping)
    }

    fn copy_node(
        &self,
        node_id: NodeId,
        target: &mut LogicalPlan,
        mapping: &mut NodeMapping,
    ) -> NodeId {
        if let Some(copied) = mapping.get(&node_id) {
            return *copied;
        }

        let inputs: Vec<NodeId> = self
            .inputs(node_id)
            .into_iter()
            .map(|input| self.copy_node(input, target, mapping))
            .collect();

        // The copy exists before its expressions are translated: join predicates may carry
        // lineage naming the join itself.
        let node = self.node(node_id);
        let copied = target.add_node(node.operator().clone(), vec![], &inputs);
        mapping.insert(node_id, copied);

        let expressions = node
            .expressions()
            .iter()
            .map(|expression| {
                let mut expression = expression.clone();
                expression.replace_column_references(|column_reference| {
                    Some(column_reference.remap(|origin| map_node(mapping, origin)))
                });
                expression
            })
            .collect();
        *target.node_expressions_mut(copied) = expressions;
        copied
    }
}

fn map_node(mapping: &NodeMapping, node_id: NodeId) -> NodeId {
    mapping.get(&node_id).copied().unwrap_or(node_id)
}

fn nodes_equal(
    lhs_plan: &LogicalPlan,
    lhs: NodeId,
    rhs_plan: &LogicalPlan,
    rhs: NodeId,
    mapping: &mut NodeMapping,
) -> bool {
    if let Some(mapped) = mapping.get(&lhs) {
        return *mapped == rhs;
    }

    let lhs_node = lhs_plan.node(lhs);
    let rhs_node = rhs_plan.node(rhs);
    if !lhs_node.operator().shallow_eq(rhs_node.operator())
        || lhs_node.expressions().len() != rhs_node.expressions().len()
    {
        return false;
    }

    let lhs_inputs = lhs_plan.inputs(lhs);
    let rhs_inputs = rhs_plan.inputs(rhs);
    if lhs_inputs.len() != rhs_inputs.len() {
        return false;
    }
    for (lhs_input, rhs_input) in lhs_inputs.into_iter().zip(rhs_inputs) {
        if !nodes_equal(lhs_plan, lhs_input, rhs_plan, rhs_input, mapping) {
            return false;
        }
    }

    mapping.insert(lhs, rhs);
    lhs_node
        .expressions()
        .iter()
        .zip(rhs_node.expressions())
        .all(|(lhs_expression, rhs_expression)| {
            expressions_equal(lhs_expression, rhs_expression, mapping)
        })
}

fn column_references_equal(
    lhs: &ColumnReference,
    rhs: &ColumnReference,
    mapping: &NodeMapping,
) -> bool {
    lhs.column_id() == rhs.column_id()
        && map_node(mapping, lhs.origin()) == rhs.origin()
        && lhs.lineage().len() == rhs.lineage().len()
        && lhs
            .lineage()
            .iter()
            .zip(rhs.lineage())
            .all(|(lhs_step, rhs_step)| {
                lhs_step.side == rhs_step.side && map_node(mapping, lhs_step.join) == rhs_step.join
            })
}

fn expressions_equal(lhs: &Expression, rhs: &Expression, mapping: &NodeMapping) -> bool {
    let same_node = match (lhs, rhs) {
        (Expression::Column(lhs), Expression::Column(rhs)) => {
            return column_references_equal(lhs, rhs, mapping)
        }
        (Expression::Literal(lhs), Expression::Literal(rhs)) => lhs == rhs,
        (
            Expression::Arithmetic { operator: lhs, .. },
            Expression::Arithmetic { operator: rhs, .. },
        ) => lhs == rhs,
        (
            Expression::BinaryPredicate { condition: lhs, .. },
            Expression::BinaryPredicate { condition: rhs, .. },
        ) => lhs == rhs,
        (Expression::Logical { operator: lhs, .. }, Expression::Logical { operator: rhs, .. }) => {
            lhs == rhs
        }
        (Expression::IsNull { negated: lhs, .. }, Expression::IsNull { negated: rhs, .. }) => {
            lhs == rhs
        }
        (
            Expression::Aggregate { function: lhs, .. },
            Expression::Aggregate { function: rhs, .. },
        ) => lhs == rhs,
        (
            Expression::Function { function: lhs, .. },
            Expression::Function { function: rhs, .. },
        ) => lhs == rhs,
        _ => false,
    };

    same_node
        && lhs.same_shape(rhs)
        && lhs
            .arguments()
            .into_iter()
            .zip(rhs.arguments())
            .all(|(lhs, rhs)| expressions_equal(lhs, rhs, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDefinition, DataType};
    use crate::expression::functional::*;
    use crate::operator::JoinMode;
    use crate::plan::InputSide;

    fn int_mock(plan: &mut LogicalPlan, name: &str) -> NodeId {
        plan.mock(name, vec![ColumnDefinition::new("a", DataType::Int, false)])
    }

    #[test]
    fn test_equal_subplans_at_different_nodes() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a");
        let b = int_mock(&mut plan, "b");
        let a_a = plan.column(a, "a").unwrap();
        let b_a = plan.column(b, "a").unwrap();

        let a_predicate = plan.predicate(greater_than(a_a.clone(), 10), a);
        let b_predicate = plan.predicate(greater_than(b_a.clone(), 10), b);
        let b_other = plan.predicate(greater_than(b_a, 20), b);

        assert!(plan.subplans_equal(a_predicate, &plan, b_predicate));
        assert_eq!(
            plan.structural_hash(a_predicate),
            plan.structural_hash(b_predicate)
        );
        assert!(!plan.subplans_equal(a_predicate, &plan, b_other));

        // The predicate refers to `a` but sits on top of `b`
        let crossed = plan.predicate(greater_than(a_a, 10), b);
        assert!(!plan.subplans_equal(a_predicate, &plan, crossed));
    }

    #[test]
    fn test_lineage_is_compared_through_mapping() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a");
        let b = int_mock(&mut plan, "b");
        let a_a = plan.column(a, "a").unwrap();
        let b_a = plan.column(b, "a").unwrap();

        let a_join = plan.cross_join(a, a);
        let a_predicate = plan.predicate(
            equals(
                a_a.clone().with_lineage(a_join, InputSide::Left),
                a_a.clone().with_lineage(a_join, InputSide::Right),
            ),
            a_join,
        );
        let b_join = plan.cross_join(b, b);
        let b_predicate = plan.predicate(
            equals(
                b_a.clone().with_lineage(b_join, InputSide::Left),
                b_a.clone().with_lineage(b_join, InputSide::Right),
            ),
            b_join,
        );
        let b_swapped = plan.predicate(
            equals(
                b_a.clone().with_lineage(b_join, InputSide::Right),
                b_a.with_lineage(b_join, InputSide::Left),
            ),
            b_join,
        );

        assert!(plan.subplans_equal(a_predicate, &plan, b_predicate));
        assert!(!plan.subplans_equal(a_predicate, &plan, b_swapped));
    }

    #[test]
    fn test_copy_subplan_keeps_sharing() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a");
        let b = int_mock(&mut plan, "b");
        let a_a = plan.column(a, "a").unwrap();
        let b_a = plan.column(b, "a").unwrap();
        let join = plan.join(JoinMode::Inner, vec![equals(a_a.clone(), b_a)], a, b);
        let self_join = plan.cross_join(join, join);
        let root = plan.root(self_join);

        let mut copy = LogicalPlan::new();
        let copied_root = plan.copy_subplan(root, &mut copy);

        assert_eq!(plan.node_count(), copy.node_count());
        assert!(plan.subplans_equal(root, &copy, copied_root));

        let copied_join = copy.left_input(copy.left_input(copied_root).unwrap()).unwrap();
        let copied_a = copy.left_input(copied_join).unwrap();
        let predicate = &copy.node_expressions(copied_join)[0];
        assert_eq!(copied_a, predicate.column_references()[0].origin());
    }
}
