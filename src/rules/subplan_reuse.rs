//! Merges structurally equal subplans into one shared node.
//!
//! A pass walks the plan from its root and remembers the first node of every structural shape
//! as the primary of that shape. The first later node equal to a known primary is the
//! duplicate. Every parent of the duplicate is rewired to the primary, and the nodes above are
//! rewritten bottom up: for each of them, the columns it used to see from its inputs are
//! mapped position by position to the columns it sees now. Joins that see the same column
//! through both inputs after the rewiring disambiguate it with lineage, so the mapping of a
//! node above such a join carries the lineage along.
//!
//! The merge is built on a copy of the plan. If a rewritten node ends up with an expression
//! its inputs cannot provide, the copy is dropped and the pair is not tried again.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::config::{OptimizerContext, SubplanReuseConfig};
use crate::error::OptResult;
use crate::expression::Expression;
use crate::operator::{LogicalOperator, UnionMode};
use crate::plan::{
    ColumnReference, LogicalPlan, NodeId, PlanVisitation, StructuralHashes, UpwardVisitation,
};
use crate::rules::Rule;

type ColumnMapping = HashMap<ColumnReference, ColumnReference>;

#[derive(Clone, Debug, Default)]
pub struct SubplanReuseRule;

impl Rule for SubplanReuseRule {
    fn name(&self) -> &str {
        "SubplanReuseRule"
    }

    fn apply(
        &self,
        plan: &mut LogicalPlan,
        root: NodeId,
        context: &OptimizerContext,
    ) -> OptResult<bool> {
        let config = &context.config().subplan_reuse;
        if !config.enabled {
            return Ok(false);
        }

        let mut rejected = HashSet::new();
        let mut merges = 0;
        while config.max_passes.map_or(true, |max_passes| merges < max_passes) {
            if !self.merge_next(plan, root, config.validate_merges, &mut rejected) {
                break;
            }
            merges += 1;
        }

        debug!("{} merged {} duplicate subplans", self.name(), merges);
        Ok(merges > 0)
    }
}

impl SubplanReuseRule {
    pub fn new() -> Self {
        Self
    }

    /// Merges the first duplicate subplan found below `root`, if any.
    ///
    /// # Return
    ///
    /// The return value indicates whether a merge happened.
    pub fn apply_once(
        &self,
        plan: &mut LogicalPlan,
        root: NodeId,
        config: &SubplanReuseConfig,
    ) -> bool {
        self.merge_next(plan, root, config.validate_merges, &mut HashSet::new())
    }

    fn merge_next(
        &self,
        plan: &mut LogicalPlan,
        root: NodeId,
        validate: bool,
        rejected: &mut HashSet<(NodeId, NodeId)>,
    ) -> bool {
        assert!(
            matches!(plan.operator(root), LogicalOperator::Root),
            "Subplan reuse has to start at a Root node, got {} node",
            plan.operator(root).name()
        );

        loop {
            let (primary, duplicate) = match find_duplicate(plan, root, rejected) {
                Some(pair) => pair,
                None => return false,
            };
            debug!(
                "Found duplicate #{} of #{}: {}",
                duplicate.index(),
                primary.index(),
                plan.describe_node(duplicate)
            );

            match merge(plan, primary, duplicate, validate) {
                Some(merged) => {
                    *plan = merged;
                    return true;
                }
                None => {
                    debug!(
                        "Declined to merge #{} into #{}",
                        duplicate.index(),
                        primary.index()
                    );
                    rejected.insert((primary, duplicate));
                }
            }
        }
    }
}

/// Every node below a union by positions, the unions included.
fn positional_union_subtrees(plan: &LogicalPlan, root: NodeId) -> HashSet<NodeId> {
    let mut excluded = HashSet::new();
    plan.visit_downward(root, |node_id| match plan.operator(node_id) {
        LogicalOperator::Union(union) if union.mode() == UnionMode::Positions => {
            excluded.extend(plan.reachable_from(node_id));
            PlanVisitation::DoNotVisitInputs
        }
        _ => PlanVisitation::VisitInputs,
    });
    excluded
}

/// Returns the first `(primary, duplicate)` pair in traversal order that has not been rejected.
fn find_duplicate(
    plan: &LogicalPlan,
    root: NodeId,
    rejected: &HashSet<(NodeId, NodeId)>,
) -> Option<(NodeId, NodeId)> {
    let excluded = positional_union_subtrees(plan, root);
    let mut hashes = StructuralHashes::new();
    let mut primaries: HashMap<u64, Vec<NodeId>> = HashMap::new();
    let mut duplicate = None;

    plan.visit_downward(root, |node_id| {
        if duplicate.is_some() || excluded.contains(&node_id) {
            return PlanVisitation::DoNotVisitInputs;
        }

        let same_hash = primaries.entry(hashes.hash(plan, node_id)).or_default();
        let primary = same_hash.iter().copied().find(|primary| {
            !rejected.contains(&(*primary, node_id)) && plan.subplans_equal(*primary, plan, node_id)
        });

        match primary {
            Some(primary) => {
                duplicate = Some((primary, node_id));
                PlanVisitation::DoNotVisitInputs
            }
            None => {
                same_hash.push(node_id);
                PlanVisitation::VisitInputs
            }
        }
    });

    duplicate
}

/// Builds the plan in which every parent of `duplicate` uses `primary` instead. Returns `None`
/// if `validate` is set and some rewritten node is no longer evaluable.
fn merge(
    plan: &LogicalPlan,
    primary: NodeId,
    duplicate: NodeId,
    validate: bool,
) -> Option<LogicalPlan> {
    let mut merged = plan.clone();
    let parents = merged.parents(duplicate);
    let count_stars = count_star_mapping(&merged, primary, duplicate);

    let mut ancestors = HashSet::new();
    merged.visit_upward_from(parents.iter().map(|(parent, _)| *parent), |node_id| {
        ancestors.insert(node_id);
        UpwardVisitation::VisitOutputs
    });
    let rewritten = children_first(&merged, &ancestors);

    // Columns every rewritten node saw before the rewiring
    let old_inputs: HashMap<NodeId, Vec<Expression>> = rewritten
        .iter()
        .map(|node_id| (*node_id, merged.input_column_expressions(*node_id)))
        .collect();

    for (parent, side) in parents {
        merged.set_input(parent, side, primary);
    }

    let mut mappings: HashMap<NodeId, ColumnMapping> = HashMap::new();
    for node_id in &rewritten {
        let new_input = merged.input_column_expressions(*node_id);
        let mut mapping = create_column_mapping(&old_inputs[node_id], &new_input);
        // Inherited entries reach references the input columns do not show, like a COUNT(*)
        // below a projection
        for input in merged.inputs(*node_id) {
            if let Some(input_mapping) = mappings.get(&input) {
                inherit_entries(&mut mapping, input_mapping);
            }
        }
        inherit_entries(&mut mapping, &count_stars);

        merged.mark_if_ambiguous(*node_id);

        let replacements = mapping.iter().filter(|(old, new)| old != new).count();
        if replacements > 0 {
            trace!(
                "Applying {} column replacements to #{}",
                replacements,
                node_id.index()
            );
            for expression in merged.node_expressions_mut(*node_id).iter_mut() {
                expression.replace_column_references(|column_reference| {
                    mapping
                        .get(column_reference)
                        .filter(|replacement| *replacement != column_reference)
                        .cloned()
                });
            }
        }
        mappings.insert(*node_id, mapping);
    }

    let collected = merged.collect_garbage();
    trace!("Collected {} nodes after merge", collected);

    if validate {
        for node_id in &rewritten {
            if merged.contains(*node_id) && !merged.node_expressions_evaluable(*node_id) {
                debug!(
                    "{} node #{} can not be evaluated after merge",
                    merged.operator(*node_id).name(),
                    node_id.index()
                );
                return None;
            }
        }
    }

    Some(merged)
}

/// `COUNT(*)` of every source below `duplicate` mapped to the one of its counterpart below
/// `primary`.
fn count_star_mapping(plan: &LogicalPlan, primary: NodeId, duplicate: NodeId) -> ColumnMapping {
    let correspondence = match plan.subplan_correspondence(duplicate, primary) {
        Some(correspondence) => correspondence,
        None => panic!(
            "#{} is not structurally equal to #{}",
            duplicate.index(),
            primary.index()
        ),
    };

    correspondence
        .into_iter()
        .filter(|(node_id, _)| {
            matches!(
                plan.operator(*node_id),
                LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_)
            )
        })
        .map(|(old_source, new_source)| {
            (
                ColumnReference::count_star(old_source),
                ColumnReference::count_star(new_source),
            )
        })
        .collect()
}

/// Adds the entries of `inherited` whose references `mapping` does not map yet.
fn inherit_entries(mapping: &mut ColumnMapping, inherited: &ColumnMapping) {
    for (old_reference, new_reference) in inherited {
        mapping
            .entry(old_reference.clone())
            .or_insert_with(|| new_reference.clone());
    }
}

/// Orders `nodes` so that every node comes after those of its inputs that are in `nodes`.
fn children_first(plan: &LogicalPlan, nodes: &HashSet<NodeId>) -> Vec<NodeId> {
    fn push_children_first(
        plan: &LogicalPlan,
        node_id: NodeId,
        nodes: &HashSet<NodeId>,
        done: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) {
        if !done.insert(node_id) {
            return;
        }
        for input in plan.inputs(node_id) {
            if nodes.contains(&input) {
                push_children_first(plan, input, nodes, done, order);
            }
        }
        order.push(node_id);
    }

    let mut sorted: Vec<NodeId> = nodes.iter().copied().collect();
    sorted.sort();

    let mut done = HashSet::new();
    let mut order = Vec::with_capacity(sorted.len());
    for node_id in sorted {
        push_children_first(plan, node_id, nodes, &mut done, &mut order);
    }
    order
}

/// Maps every column reference of `old_columns` to the reference at the same place in
/// `new_columns`, descending into composite expressions. Every mapped origin also gets an
/// entry for its `COUNT(*)` reference. References that keep their place map to themselves, so
/// entries inherited from further down never override them.
fn create_column_mapping(
    old_columns: &[Expression],
    new_columns: &[Expression],
) -> ColumnMapping {
    assert_eq!(
        old_columns.len(),
        new_columns.len(),
        "Merged subplans must produce the same number of columns"
    );

    let mut mapping = ColumnMapping::new();
    for (old_column, new_column) in old_columns.iter().zip(new_columns) {
        add_column_mapping(old_column, new_column, &mut mapping);
    }

    let count_stars: Vec<(ColumnReference, ColumnReference)> = mapping
        .iter()
        .filter(|(old_reference, _)| !old_reference.is_count_star())
        .map(|(old_reference, new_reference)| {
            (old_reference.as_count_star(), new_reference.as_count_star())
        })
        .collect();
    for (old_reference, new_reference) in count_stars {
        mapping.entry(old_reference).or_insert(new_reference);
    }
    mapping
}

fn add_column_mapping(old: &Expression, new: &Expression, mapping: &mut ColumnMapping) {
    match (old, new) {
        (Expression::Column(old_reference), Expression::Column(new_reference)) => {
            mapping
                .entry(old_reference.clone())
                .or_insert_with(|| new_reference.clone());
        }
        _ => {
            assert!(
                old.same_shape(new),
                "Merged subplans must produce columns of the same shape"
            );
            for (old_argument, new_argument) in old.arguments().into_iter().zip(new.arguments()) {
                add_column_mapping(old_argument, new_argument, mapping);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDefinition, DataType};
    use crate::config::OptimizerConfig;
    use crate::expression::functional::*;
    use crate::operator::JoinMode;
    use crate::plan::{ColumnId, InputSide};

    fn int_mock(plan: &mut LogicalPlan, name: &str, column: &str) -> NodeId {
        plan.mock(name, vec![ColumnDefinition::new(column, DataType::Int, false)])
    }

    #[test]
    fn test_column_mapping_descends_into_expressions() {
        let a = ColumnReference::new(NodeId::new(1), ColumnId::from(0));
        let b = ColumnReference::new(NodeId::new(2), ColumnId::from(0));

        let mapping = create_column_mapping(&[sum(a.clone())], &[sum(b.clone())]);
        assert_eq!(Some(&b), mapping.get(&a));
        assert_eq!(Some(&b.as_count_star()), mapping.get(&a.as_count_star()));
        assert_eq!(2, mapping.len());
    }

    #[test]
    #[should_panic(expected = "same shape")]
    fn test_column_mapping_rejects_different_shapes() {
        let a = ColumnReference::new(NodeId::new(1), ColumnId::from(0));
        let b = ColumnReference::new(NodeId::new(2), ColumnId::from(0));
        create_column_mapping(&[sum(a)], &[abs(b)]);
    }

    #[test]
    fn test_children_first_order() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a", "a");
        let a_a = plan.column(a, "a").unwrap();
        let predicate = plan.predicate(greater_than(a_a.clone(), 1), a);
        let projection = plan.projection(vec![col(a_a)], predicate);
        let root = plan.root(projection);

        let nodes: HashSet<NodeId> = [root, projection, predicate].into_iter().collect();
        assert_eq!(
            vec![predicate, projection, root],
            children_first(&plan, &nodes)
        );
    }

    #[test]
    #[should_panic(expected = "has to start at a Root node")]
    fn test_requires_root_node() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a", "a");
        SubplanReuseRule::new().apply_once(&mut plan, a, &SubplanReuseConfig::default());
    }

    #[test]
    fn test_self_join_of_duplicates_gets_lineage() {
        let mut plan = LogicalPlan::new();
        let t1 = int_mock(&mut plan, "t", "a");
        let t2 = int_mock(&mut plan, "t", "a");
        let t1_a = plan.column(t1, "a").unwrap();
        let t2_a = plan.column(t2, "a").unwrap();
        let join = plan.join(JoinMode::Inner, vec![equals(t1_a, t2_a.clone())], t1, t2);
        let root = plan.root(join);

        let rule = SubplanReuseRule::new();
        assert!(rule.apply_once(&mut plan, root, &SubplanReuseConfig::default()));

        assert!(!plan.contains(t1));
        assert_eq!(vec![t2, t2], plan.inputs(join));
        assert!(plan.operator(join).as_join().unwrap().disambiguate());
        assert_eq!(
            vec![equals(
                t2_a.clone().with_lineage(join, InputSide::Left),
                t2_a.with_lineage(join, InputSide::Right)
            )],
            plan.node_expressions(join)
        );
    }

    #[test]
    fn test_positional_union_is_left_alone() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a", "a");
        let a_a = plan.column(a, "a").unwrap();
        let left = plan.predicate(greater_than(a_a.clone(), 1), a);
        let right = plan.predicate(greater_than(a_a, 1), a);
        let union = plan.union(UnionMode::Positions, left, right);
        let root = plan.root(union);

        let rule = SubplanReuseRule::new();
        let context = OptimizerContext::default();
        assert!(!rule.apply(&mut plan, root, &context).unwrap());
        assert_eq!(5, plan.node_count());
    }

    #[test]
    fn test_declines_merge_that_cannot_be_validated() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a", "a");
        let b = int_mock(&mut plan, "b", "a");
        let z = int_mock(&mut plan, "z", "z");
        let a_a = plan.column(a, "a").unwrap();
        let b_a = plan.column(b, "a").unwrap();
        let z_z = plan.column(z, "z").unwrap();

        let join = plan.join(JoinMode::Inner, vec![equals(a_a, b_a)], a, b);
        let projection = plan.projection(vec![col(z_z)], join);
        let root = plan.root(projection);

        let rule = SubplanReuseRule::new();
        let mut declined = plan.clone();
        assert!(!rule
            .apply(&mut declined, root, &OptimizerContext::default())
            .unwrap());
        assert!(declined.contains(a) && declined.contains(b));

        let mut config = OptimizerConfig::default();
        config.subplan_reuse.validate_merges = false;
        let context = OptimizerContext::new(config).unwrap();
        assert!(rule.apply(&mut plan, root, &context).unwrap());
        assert!(!plan.contains(a));
        assert_eq!(vec![b, b], plan.inputs(join));
    }

    #[test]
    fn test_disabled_rule_does_nothing() {
        let mut plan = LogicalPlan::new();
        let a = int_mock(&mut plan, "a", "a");
        let b = int_mock(&mut plan, "b", "a");
        let join = plan.cross_join(a, b);
        let root = plan.root(join);

        let mut config = OptimizerConfig::default();
        config.subplan_reuse.enabled = false;
        let context = OptimizerContext::new(config).unwrap();
        assert!(!SubplanReuseRule::new().apply(&mut plan, root, &context).unwrap());
        assert_eq!(4, plan.node_count());
    }

    #[test]
    fn test_count_star_below_projection_follows_merge() {
        let mut plan = LogicalPlan::new();
        let d = int_mock(&mut plan, "d", "a");
        let p = int_mock(&mut plan, "p", "a");
        let projection = plan.projection(vec![lit(1)], d);
        let aggregate = plan.aggregate(vec![], vec![count_star(d)], projection);
        let join = plan.cross_join(aggregate, p);
        let root = plan.root(join);

        let mut unvalidated = plan.clone();
        let mut config = OptimizerConfig::default();
        config.subplan_reuse.validate_merges = false;
        let context = OptimizerContext::new(config).unwrap();

        let rule = SubplanReuseRule::new();
        assert!(rule
            .apply(&mut plan, root, &OptimizerContext::default())
            .unwrap());
        assert!(rule.apply(&mut unvalidated, root, &context).unwrap());

        for plan in [&plan, &unvalidated] {
            assert!(!plan.contains(d));
            assert_eq!(vec![p], plan.inputs(projection));
            assert_eq!(&[count_star(p)], plan.node_expressions(aggregate));
            assert!(plan.node_expressions_evaluable(aggregate));
        }
    }

    #[test]
    fn test_count_star_of_merged_subplan_source() {
        let mut plan = LogicalPlan::new();
        let d = int_mock(&mut plan, "d", "a");
        let p = int_mock(&mut plan, "p", "a");
        let duplicate = plan.projection(vec![lit(1)], d);
        let primary = plan.projection(vec![lit(1)], p);
        let aggregate = plan.aggregate(vec![], vec![count_star(d)], duplicate);
        let join = plan.cross_join(aggregate, primary);
        let root = plan.root(join);

        let rule = SubplanReuseRule::new();
        assert!(rule.apply_once(&mut plan, root, &SubplanReuseConfig::default()));

        assert!(!plan.contains(duplicate));
        assert!(!plan.contains(d));
        assert_eq!(5, plan.node_count());
        assert_eq!(vec![primary], plan.inputs(aggregate));
        assert_eq!(&[count_star(p)], plan.node_expressions(aggregate));
    }

    #[test]
    fn test_join_built_over_shared_input_merges_with_rewired_join() {
        let mut plan = LogicalPlan::new();
        let x = int_mock(&mut plan, "x", "a");
        let u = int_mock(&mut plan, "u", "a");
        let built = plan.cross_join(x, x);
        let rewired = plan.cross_join(u, x);
        let join = plan.cross_join(built, rewired);
        let root = plan.root(join);
        assert!(plan.operator(built).as_join().unwrap().disambiguate());
        assert!(!plan.operator(rewired).as_join().unwrap().disambiguate());

        let rule = SubplanReuseRule::new();
        assert!(rule
            .apply(&mut plan, root, &OptimizerContext::default())
            .unwrap());

        assert_eq!(4, plan.node_count());
        assert!(!plan.contains(built));
        assert_eq!(vec![rewired, rewired], plan.inputs(join));
        assert!(plan.operator(join).as_join().unwrap().disambiguate());
    }
}
