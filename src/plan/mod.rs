//! Logical query plans.
//!
//! A plan is a single-root dag: a node can be the input of several parents. All nodes live in
//! one arena ([`LogicalPlan`]) and are addressed by stable [`NodeId`]s. Edges point from a parent
//! to its input and are labelled with the [`InputSide`] they occupy, so the incoming edges of a
//! node are its back-edges. The arena owns every node; nodes that are no longer reachable from
//! any root are dropped by [`LogicalPlan::collect_garbage`].

mod column_reference;
pub use column_reference::*;
mod columns;
mod explain;
mod join_resolver;
mod structure;
pub use structure::*;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use log::trace;
use petgraph::prelude::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};

use crate::catalog::{Catalog, ColumnDefinition, DataType, TableMetadata};
use crate::error::{OptResult, OptimizerError};
use crate::expression::Expression;
use crate::operator::{
    Aggregate, Join, JoinMode, LogicalOperator, MockTable, Sort, SortMode, TableScan, Union,
    UnionMode,
};

pub type NodeId = NodeIndex<u32>;

type PlanGraph = StableGraph<PlanNode, InputSide, Directed, u32>;

/// One node in a plan: its operator and the node expressions the operator interprets.
#[derive(Clone, Debug)]
pub struct PlanNode {
    operator: LogicalOperator,
    expressions: Vec<Expression>,
}

impl PlanNode {
    pub fn operator(&self) -> &LogicalOperator {
        &self.operator
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }
}

/// Result of a downward visitor call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlanVisitation {
    VisitInputs,
    DoNotVisitInputs,
}

/// Result of an upward visitor call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpwardVisitation {
    VisitOutputs,
    DoNotVisitOutputs,
}

/// Arena holding one or more plans.
#[derive(Clone, Debug, Default)]
pub struct LogicalPlan {
    graph: PlanGraph,
}

impl LogicalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with the given inputs, the first input being the left one.
    pub fn add_node(
        &mut self,
        operator: LogicalOperator,
        expressions: Vec<Expression>,
        inputs: &[NodeId],
    ) -> NodeId {
        assert_eq!(
            operator.input_count(),
            inputs.len(),
            "{} node takes {} inputs",
            operator.name(),
            operator.input_count()
        );
        for input in inputs {
            self.assert_contains(*input);
        }

        let node_id = self.graph.add_node(PlanNode {
            operator,
            expressions,
        });
        for (input, side) in inputs.iter().zip([InputSide::Left, InputSide::Right]) {
            self.graph.add_edge(node_id, *input, side);
        }
        self.mark_if_ambiguous(node_id);
        node_id
    }

    /// Marks a join that sees some column through both inputs as disambiguated.
    pub(crate) fn mark_if_ambiguous(&mut self, node_id: NodeId) {
        if self.operator(node_id).as_join().is_none() || !self.join_has_ambiguous_columns(node_id)
        {
            return;
        }
        if let Some(join) = self.operator_mut(node_id).as_join_mut() {
            join.mark_disambiguated();
        }
    }

    pub fn root(&mut self, input: NodeId) -> NodeId {
        self.add_node(LogicalOperator::Root, vec![], &[input])
    }

    pub fn stored_table(&mut self, catalog: &Catalog, table_name: &str) -> OptResult<NodeId> {
        let table = catalog.table(table_name)?;
        Ok(self.table_scan(table))
    }

    pub fn table_scan(&mut self, table: Arc<dyn TableMetadata>) -> NodeId {
        self.add_node(
            LogicalOperator::StoredTable(TableScan::new(table)),
            vec![],
            &[],
        )
    }

    pub fn mock<S: Into<String>>(&mut self, name: S, columns: Vec<ColumnDefinition>) -> NodeId {
        self.add_node(
            LogicalOperator::Mock(MockTable::new(Some(name.into()), columns)),
            vec![],
            &[],
        )
    }

    pub fn predicate(&mut self, predicate: Expression, input: NodeId) -> NodeId {
        self.add_node(LogicalOperator::Predicate, vec![predicate], &[input])
    }

    pub fn join(
        &mut self,
        mode: JoinMode,
        predicates: Vec<Expression>,
        left: NodeId,
        right: NodeId,
    ) -> NodeId {
        assert!(mode != JoinMode::Cross, "Cross joins take no predicate");
        assert!(!predicates.is_empty(), "Non-cross joins require predicates");
        self.add_node(
            LogicalOperator::Join(Join::new(mode)),
            predicates,
            &[left, right],
        )
    }

    pub fn cross_join(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.add_node(
            LogicalOperator::Join(Join::new(JoinMode::Cross)),
            vec![],
            &[left, right],
        )
    }

    pub fn union(&mut self, mode: UnionMode, left: NodeId, right: NodeId) -> NodeId {
        self.add_node(
            LogicalOperator::Union(Union::new(mode)),
            vec![],
            &[left, right],
        )
    }

    pub fn aggregate(
        &mut self,
        group_by: Vec<Expression>,
        aggregates: Vec<Expression>,
        input: NodeId,
    ) -> NodeId {
        let group_by_count = group_by.len();
        let mut expressions = group_by;
        expressions.extend(aggregates);
        self.add_node(
            LogicalOperator::Aggregate(Aggregate::new(group_by_count)),
            expressions,
            &[input],
        )
    }

    pub fn projection(&mut self, expressions: Vec<Expression>, input: NodeId) -> NodeId {
        self.add_node(LogicalOperator::Projection, expressions, &[input])
    }

    pub fn sort(
        &mut self,
        expressions: Vec<Expression>,
        modes: Vec<SortMode>,
        input: NodeId,
    ) -> NodeId {
        assert_eq!(expressions.len(), modes.len(), "One sort mode per expression");
        self.add_node(LogicalOperator::Sort(Sort::new(modes)), expressions, &[input])
    }

    pub fn limit(&mut self, row_count: Expression, input: NodeId) -> NodeId {
        self.add_node(LogicalOperator::Limit, vec![row_count], &[input])
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.graph.contains_node(node_id)
    }

    fn assert_contains(&self, node_id: NodeId) {
        assert!(
            self.contains(node_id),
            "Node #{} is not part of the plan",
            node_id.index()
        );
    }

    pub fn node(&self, node_id: NodeId) -> &PlanNode {
        self.assert_contains(node_id);
        &self.graph[node_id]
    }

    pub fn operator(&self, node_id: NodeId) -> &LogicalOperator {
        &self.node(node_id).operator
    }

    pub fn node_expressions(&self, node_id: NodeId) -> &[Expression] {
        &self.node(node_id).expressions
    }

    /// Replaces the node expressions of a node. The number of expressions is part of the
    /// node's shape and cannot change.
    pub fn set_node_expressions(&mut self, node_id: NodeId, expressions: Vec<Expression>) {
        self.assert_contains(node_id);
        let node = &mut self.graph[node_id];
        assert_eq!(
            node.expressions.len(),
            expressions.len(),
            "Number of node expressions of {} node cannot change",
            node.operator.name()
        );
        node.expressions = expressions;
    }

    pub(crate) fn node_expressions_mut(&mut self, node_id: NodeId) -> &mut Vec<Expression> {
        self.assert_contains(node_id);
        &mut self.graph[node_id].expressions
    }

    pub(crate) fn operator_mut(&mut self, node_id: NodeId) -> &mut LogicalOperator {
        self.assert_contains(node_id);
        &mut self.graph[node_id].operator
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// All nodes of kind Root.
    pub fn roots(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|node_id| matches!(self.graph[*node_id].operator, LogicalOperator::Root))
            .collect()
    }

    pub fn input(&self, node_id: NodeId, side: InputSide) -> Option<NodeId> {
        self.assert_contains(node_id);
        self.graph
            .edges_directed(node_id, Direction::Outgoing)
            .find(|edge| *edge.weight() == side)
            .map(|edge| edge.target())
    }

    pub fn left_input(&self, node_id: NodeId) -> Option<NodeId> {
        self.input(node_id, InputSide::Left)
    }

    pub fn right_input(&self, node_id: NodeId) -> Option<NodeId> {
        self.input(node_id, InputSide::Right)
    }

    /// Inputs in left, right order.
    pub fn inputs(&self, node_id: NodeId) -> Vec<NodeId> {
        [InputSide::Left, InputSide::Right]
            .into_iter()
            .filter_map(|side| self.input(node_id, side))
            .collect()
    }

    /// Every current parent of a node and the input side the node occupies there.
    pub fn parents(&self, node_id: NodeId) -> Vec<(NodeId, InputSide)> {
        self.assert_contains(node_id);
        let mut parents: Vec<(NodeId, InputSide)> = self
            .graph
            .edges_directed(node_id, Direction::Incoming)
            .map(|edge| (edge.source(), *edge.weight()))
            .collect();
        parents.sort();
        parents
    }

    /// Rewires one input edge of `node_id` to `new_input`. The back-edges follow automatically.
    pub fn set_input(&mut self, node_id: NodeId, side: InputSide, new_input: NodeId) {
        self.assert_contains(node_id);
        self.assert_contains(new_input);

        let old_edge = self
            .graph
            .edges_directed(node_id, Direction::Outgoing)
            .find(|edge| *edge.weight() == side)
            .map(|edge| (edge.id(), edge.target()));

        match old_edge {
            Some((_, old_input)) if old_input == new_input => return,
            Some((edge_id, _)) => {
                self.graph.remove_edge(edge_id);
            }
            None => {}
        }

        trace!(
            "Setting {} input of #{} to #{}",
            side,
            node_id.index(),
            new_input.index()
        );
        self.graph.add_edge(node_id, new_input, side);
        self.mark_if_ambiguous(node_id);
    }

    /// Depth first traversal through inputs, visiting every node once even if it is reachable
    /// through several paths. Inputs are pushed left before right onto the work stack, so the
    /// right subtree of a node is entered first. Subplan reuse keeps the first of two equal
    /// subplans it meets, so the copy in the right subtree is the one that survives.
    pub fn visit_downward<F>(&self, root: NodeId, mut visitor: F)
    where
        F: FnMut(NodeId) -> PlanVisitation,
    {
        self.assert_contains(root);
        let mut stack = vec![root];
        let mut visited = HashSet::new();

        while let Some(node_id) = stack.pop() {
            if !visited.insert(node_id) {
                continue;
            }
            if visitor(node_id) == PlanVisitation::VisitInputs {
                stack.extend(self.inputs(node_id));
            }
        }
    }

    /// Breadth first traversal through back-edges, starting at `start` itself.
    pub fn visit_upward<F>(&self, start: NodeId, visitor: F)
    where
        F: FnMut(NodeId) -> UpwardVisitation,
    {
        self.visit_upward_from([start], visitor)
    }

    pub fn visit_upward_from<I, F>(&self, starts: I, mut visitor: F)
    where
        I: IntoIterator<Item = NodeId>,
        F: FnMut(NodeId) -> UpwardVisitation,
    {
        let mut queue: VecDeque<NodeId> = starts.into_iter().collect();
        let mut visited = HashSet::new();

        while let Some(node_id) = queue.pop_front() {
            self.assert_contains(node_id);
            if !visited.insert(node_id) {
                continue;
            }
            if visitor(node_id) == UpwardVisitation::VisitOutputs {
                queue.extend(self.parents(node_id).into_iter().map(|(parent, _)| parent));
            }
        }
    }

    /// Nodes reachable from `root` through inputs, `root` included.
    pub fn reachable_from(&self, root: NodeId) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        self.visit_downward(root, |node_id| {
            reachable.insert(node_id);
            PlanVisitation::VisitInputs
        });
        reachable
    }

    /// Drops every node that is not reachable from a root node. Returns the number of dropped
    /// nodes.
    pub fn collect_garbage(&mut self) -> usize {
        let mut live = HashSet::new();
        for root in self.roots() {
            live.extend(self.reachable_from(root));
        }

        let dead: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|node_id| !live.contains(node_id))
            .collect();
        for node_id in &dead {
            self.graph.remove_node(*node_id);
        }
        dead.len()
    }

    /// Column references of every column a source node (stored table or mock) produces.
    pub fn source_columns(&self, node_id: NodeId) -> Vec<ColumnReference> {
        let column_count = match self.operator(node_id) {
            LogicalOperator::StoredTable(scan) => scan.table().column_count(),
            LogicalOperator::Mock(mock) => mock.columns().len(),
            other => panic!("{} node does not create columns", other.name()),
        };
        (0..column_count)
            .map(|column_id| ColumnReference::new(node_id, ColumnId::from(column_id)))
            .collect()
    }

    /// Looks up a column of a source node by name.
    pub fn column(&self, node_id: NodeId, name: &str) -> OptResult<ColumnReference> {
        let (relation, column_id) = match self.operator(node_id) {
            LogicalOperator::StoredTable(scan) => (
                scan.table_name().to_string(),
                scan.table().find_column_id(name),
            ),
            LogicalOperator::Mock(mock) => (
                mock.name().unwrap_or("mock").to_string(),
                mock.columns()
                    .iter()
                    .position(|column| column.name == name)
                    .map(ColumnId::from),
            ),
            other => panic!("{} node does not create columns", other.name()),
        };

        match column_id {
            Some(column_id) => Ok(ColumnReference::new(node_id, column_id)),
            None => Err(OptimizerError::ColumnNotFound {
                relation,
                column: name.to_string(),
            }
            .into()),
        }
    }

    fn origin_operator(&self, column_reference: &ColumnReference) -> &LogicalOperator {
        match self.graph.node_weight(column_reference.origin()) {
            Some(node) => &node.operator,
            None => panic!(
                "Origin #{} of column reference has expired",
                column_reference.origin().index()
            ),
        }
    }

    /// Human readable form of a column reference, including its lineage.
    pub fn describe_column(&self, column_reference: &ColumnReference) -> String {
        let column_id = column_reference.column_id();
        let mut description = match self.origin_operator(column_reference) {
            LogicalOperator::StoredTable(scan) if column_reference.is_count_star() => {
                format!("{}.*", scan.table_name())
            }
            LogicalOperator::StoredTable(scan) => scan.table().column_name(column_id).to_string(),
            LogicalOperator::Mock(mock) if column_reference.is_count_star() => {
                format!("{}.*", mock.name().unwrap_or("mock"))
            }
            LogicalOperator::Mock(mock) => mock.columns()[column_id.index()].name.clone(),
            other => panic!("Unexpected origin {} for column reference", other.name()),
        };

        for step in column_reference.lineage() {
            description.push_str(&format!(" via #{}({})", step.join.index(), step.side));
        }
        description
    }

    pub fn column_reference_data_type(&self, column_reference: &ColumnReference) -> DataType {
        if column_reference.is_count_star() {
            return DataType::Long;
        }
        let column_id = column_reference.column_id();
        match self.origin_operator(column_reference) {
            LogicalOperator::StoredTable(scan) => scan.table().column_data_type(column_id),
            LogicalOperator::Mock(mock) => mock.columns()[column_id.index()].data_type,
            other => panic!("Unexpected origin {} for column reference", other.name()),
        }
    }

    pub fn column_reference_nullable(&self, column_reference: &ColumnReference) -> bool {
        if column_reference.is_count_star() {
            return false;
        }
        let column_id = column_reference.column_id();
        match self.origin_operator(column_reference) {
            LogicalOperator::StoredTable(scan) => scan.table().column_is_nullable(column_id),
            LogicalOperator::Mock(mock) => mock.columns()[column_id.index()].nullable,
            other => panic!("Unexpected origin {} for column reference", other.name()),
        }
    }
}
