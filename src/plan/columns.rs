//! Output columns of plan nodes.
//!
//! Output columns are derived on every call. The reuse rule rewires nodes in place, so a list
//! obtained before a mutation must not be used afterwards.

use crate::catalog::DataType;
use crate::expression::{AggregateFunction, Expression, Value};
use crate::operator::{JoinMode, LogicalOperator};
use crate::plan::{ColumnId, InputSide, LogicalPlan, NodeId};

impl LogicalPlan {
    pub(crate) fn single_input(&self, node_id: NodeId) -> NodeId {
        match self.left_input(node_id) {
            Some(input) => input,
            None => panic!(
                "{} node #{} has no input",
                self.operator(node_id).name(),
                node_id.index()
            ),
        }
    }

    pub(crate) fn both_inputs(&self, node_id: NodeId) -> (NodeId, NodeId) {
        match (self.left_input(node_id), self.right_input(node_id)) {
            (Some(left), Some(right)) => (left, right),
            _ => panic!(
                "{} node #{} needs both inputs",
                self.operator(node_id).name(),
                node_id.index()
            ),
        }
    }

    /// Ordered output columns of a node, as expressions over the plan's column references.
    pub fn column_expressions(&self, node_id: NodeId) -> Vec<Expression> {
        match self.operator(node_id) {
            LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_) => self
                .source_columns(node_id)
                .into_iter()
                .map(Expression::Column)
                .collect(),
            LogicalOperator::Root
            | LogicalOperator::Predicate
            | LogicalOperator::Sort(_)
            | LogicalOperator::Limit => self.column_expressions(self.single_input(node_id)),
            LogicalOperator::Join(join) => {
                self.join_column_expressions(node_id, join.mode().outputs_right_input())
            }
            LogicalOperator::Union(_) => self.column_expressions(self.both_inputs(node_id).0),
            LogicalOperator::Aggregate(_) | LogicalOperator::Projection => {
                self.node_expressions(node_id).to_vec()
            }
        }
    }

    /// Columns of both inputs of a join, regardless of its mode. Semi and anti joins hide their
    /// right input from the output, but their predicates still refer to it.
    pub fn all_column_expressions(&self, join_id: NodeId) -> Vec<Expression> {
        assert!(
            self.operator(join_id).as_join().is_some(),
            "Node #{} is not a join",
            join_id.index()
        );
        self.join_column_expressions(join_id, true)
    }

    pub(crate) fn join_column_expressions(
        &self,
        join_id: NodeId,
        include_right: bool,
    ) -> Vec<Expression> {
        let (left_input, right_input) = self.both_inputs(join_id);
        let left_expressions = self.column_expressions(left_input);
        if !include_right {
            return left_expressions;
        }
        let right_expressions = self.column_expressions(right_input);

        let mut result = Vec::with_capacity(left_expressions.len() + right_expressions.len());
        for (expressions, other_side, side) in [
            (&left_expressions, &right_expressions, InputSide::Left),
            (&right_expressions, &left_expressions, InputSide::Right),
        ] {
            for expression in expressions {
                if other_side.contains(expression) {
                    result.push(disambiguate(expression, join_id, side));
                } else {
                    result.push(expression.clone());
                }
            }
        }
        result
    }

    /// Whether some column reaches the join through both of its inputs.
    pub fn join_has_ambiguous_columns(&self, join_id: NodeId) -> bool {
        let (left_input, right_input) = self.both_inputs(join_id);
        let right_expressions = self.column_expressions(right_input);
        self.column_expressions(left_input)
            .iter()
            .any(|expression| right_expressions.contains(expression))
    }

    /// The columns a node's own expressions are written against: both sides of a join, the
    /// left input of a union, the single input otherwise.
    pub fn input_column_expressions(&self, node_id: NodeId) -> Vec<Expression> {
        match self.operator(node_id) {
            LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_) => vec![],
            LogicalOperator::Join(_) => self.all_column_expressions(node_id),
            _ => self.column_expressions(self.single_input(node_id)),
        }
    }

    pub fn column_data_type(&self, node_id: NodeId, column_id: ColumnId) -> DataType {
        self.column_expressions(node_id)[column_id.index()].data_type(self)
    }

    pub fn is_column_nullable(&self, node_id: NodeId, column_id: ColumnId) -> bool {
        match self.operator(node_id) {
            LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_) => {
                let column_reference = &self.source_columns(node_id)[column_id.index()];
                self.column_reference_nullable(column_reference)
            }
            LogicalOperator::Root
            | LogicalOperator::Predicate
            | LogicalOperator::Sort(_)
            | LogicalOperator::Limit => {
                self.is_column_nullable(self.single_input(node_id), column_id)
            }
            LogicalOperator::Union(_) => {
                let (left_input, right_input) = self.both_inputs(node_id);
                self.is_column_nullable(left_input, column_id)
                    || self.is_column_nullable(right_input, column_id)
            }
            LogicalOperator::Join(join) => {
                let (left_input, right_input) = self.both_inputs(node_id);
                let left_column_count = self.column_expressions(left_input).len();
                let from_left = column_id.index() < left_column_count;

                match join.mode() {
                    JoinMode::Left if !from_left => true,
                    JoinMode::Right if from_left => true,
                    JoinMode::FullOuter => true,
                    _ if from_left => self.is_column_nullable(left_input, column_id),
                    _ => self.is_column_nullable(
                        right_input,
                        ColumnId::from(column_id.index() - left_column_count),
                    ),
                }
            }
            LogicalOperator::Aggregate(_) | LogicalOperator::Projection => {
                let expression = &self.node_expressions(node_id)[column_id.index()];
                self.expression_nullable(expression, self.single_input(node_id))
            }
        }
    }

    fn expression_nullable(&self, expression: &Expression, input: NodeId) -> bool {
        if let Some(column_id) = self.find_column_id(input, expression) {
            return self.is_column_nullable(input, column_id);
        }

        match expression {
            Expression::Column(column_reference) => {
                self.column_reference_nullable(column_reference)
            }
            Expression::Literal(value) => matches!(value, Value::Null),
            Expression::IsNull { .. } => false,
            Expression::Aggregate {
                function: AggregateFunction::Count | AggregateFunction::CountDistinct,
                ..
            } => false,
            // Aggregates over empty groups are NULL
            Expression::Aggregate { .. } => true,
            _ => expression
                .arguments()
                .into_iter()
                .any(|argument| self.expression_nullable(argument, input)),
        }
    }
}

/// Appends a lineage step to every column reference inside `expression`.
pub(crate) fn disambiguate(
    expression: &Expression,
    join_id: NodeId,
    side: InputSide,
) -> Expression {
    let mut disambiguated = expression.clone();
    disambiguated.replace_column_references(|column_reference| {
        Some(column_reference.clone().with_lineage(join_id, side))
    });
    disambiguated
}
