//! Resolution of expressions to column positions, with the lineage rules joins impose.

use crate::expression::{Expression, ExpressionVisitation, PredicateCondition};
use crate::operator::{JoinPredicate, LogicalOperator};
use crate::plan::{ColumnId, InputSide, LogicalPlan, NodeId};

impl LogicalPlan {
    /// Position of `expression` in the output of `node_id`, if it can be found unambiguously.
    pub fn find_column_id(&self, node_id: NodeId, expression: &Expression) -> Option<ColumnId> {
        match self.operator(node_id) {
            LogicalOperator::Join(join) => self.find_join_column_id(
                node_id,
                expression,
                join.mode().outputs_right_input(),
            ),
            _ => self
                .column_expressions(node_id)
                .iter()
                .position(|column| column == expression)
                .map(ColumnId::from),
        }
    }

    /// Like [`LogicalPlan::find_column_id`] on a join, optionally searching the right input even
    /// when the join mode hides it from the output.
    pub(crate) fn find_join_column_id(
        &self,
        join_id: NodeId,
        expression: &Expression,
        include_right: bool,
    ) -> Option<ColumnId> {
        let (reduced, side) = reduce_lineage_at(expression, join_id)?;

        let (left_input, _) = self.both_inputs(join_id);
        let left_column_count = self.column_expressions(left_input).len();
        let columns = self.join_column_expressions(join_id, include_right);
        let (left_columns, right_columns) = columns.split_at(left_column_count);

        let matches = |column: &Expression| column == expression || column == &reduced;
        let left_match = left_columns.iter().position(matches);
        let right_match = right_columns
            .iter()
            .position(matches)
            .map(|position| position + left_column_count);

        let position = match (side, left_match, right_match) {
            (Some(InputSide::Left), left_match, _) => left_match,
            (Some(InputSide::Right), _, right_match) => right_match,
            (None, Some(left_match), None) => Some(left_match),
            (None, None, Some(right_match)) => Some(right_match),
            _ => None,
        };
        position.map(ColumnId::from)
    }

    /// Recognizes `expression` as a comparison between one column of each input of `join_id`.
    /// The returned positions are relative to the respective input.
    pub fn resolve_join_predicate(
        &self,
        expression: &Expression,
        join_id: NodeId,
    ) -> Option<JoinPredicate> {
        assert!(
            self.operator(join_id).as_join().is_some(),
            "Node #{} is not a join",
            join_id.index()
        );
        let (condition, left_operand, right_operand) = comparison_operands(expression)?;

        let (left_input, _) = self.both_inputs(join_id);
        let left_column_count = self.column_expressions(left_input).len();
        let left_position = self
            .find_join_column_id(join_id, left_operand, true)?
            .index();
        let right_position = self
            .find_join_column_id(join_id, right_operand, true)?
            .index();

        let from_left = |position: usize| position < left_column_count;
        let mut join_predicate = match (from_left(left_position), from_left(right_position)) {
            (true, false) => JoinPredicate::new(
                (
                    ColumnId::from(left_position),
                    ColumnId::from(right_position - left_column_count),
                ),
                condition,
            ),
            (false, true) => JoinPredicate::new(
                (
                    ColumnId::from(left_position - left_column_count),
                    ColumnId::from(right_position),
                ),
                condition,
            ),
            _ => return None,
        };
        if !from_left(left_position) {
            join_predicate.flip();
        }
        Some(join_predicate)
    }

    /// Recognizes `expression` as a comparison between a column of `left_input` and one of
    /// `right_input`, before any join over the two exists.
    pub fn resolve_join_predicate_for_inputs(
        &self,
        expression: &Expression,
        left_input: NodeId,
        right_input: NodeId,
    ) -> Option<JoinPredicate> {
        let (condition, left_operand, right_operand) = comparison_operands(expression)?;

        let locate = |operand: &Expression| {
            (
                self.find_column_id(left_input, operand),
                self.find_column_id(right_input, operand),
            )
        };

        match (locate(left_operand), locate(right_operand)) {
            ((Some(left), None), (None, Some(right))) => {
                Some(JoinPredicate::new((left, right), condition))
            }
            ((None, Some(right)), (Some(left), None)) => {
                let mut join_predicate = JoinPredicate::new((right, left), condition);
                join_predicate.flip();
                Some(join_predicate)
            }
            _ => None,
        }
    }

    /// Whether every expression of `node_id` can be computed from the columns its inputs provide.
    pub fn node_expressions_evaluable(&self, node_id: NodeId) -> bool {
        self.node_expressions(node_id)
            .iter()
            .all(|expression| self.expression_evaluable_on(node_id, expression))
    }

    /// Whether `expression`, written as a node expression of `node_id`, can be computed from the
    /// columns the node's inputs provide.
    pub fn expression_evaluable_on(&self, node_id: NodeId, expression: &Expression) -> bool {
        let found = match self.operator(node_id) {
            LogicalOperator::Join(_) => self
                .find_join_column_id(node_id, expression, true)
                .is_some(),
            LogicalOperator::StoredTable(_) | LogicalOperator::Mock(_) => false,
            _ => self
                .find_column_id(self.single_input(node_id), expression)
                .is_some(),
        };
        if found {
            return true;
        }

        match expression {
            Expression::Literal(_) => true,
            Expression::Column(column_reference) if column_reference.is_count_star() => self
                .inputs(node_id)
                .into_iter()
                .any(|input| self.reachable_from(input).contains(&column_reference.origin())),
            Expression::Column(_) => false,
            _ => expression
                .arguments()
                .into_iter()
                .all(|argument| self.expression_evaluable_on(node_id, argument)),
        }
    }
}

fn comparison_operands(
    expression: &Expression,
) -> Option<(PredicateCondition, &Expression, &Expression)> {
    match expression {
        Expression::BinaryPredicate {
            condition,
            left,
            right,
        } if condition.is_comparison() => Some((*condition, left.as_ref(), right.as_ref())),
        _ => None,
    }
}

/// Strips the lineage step naming `join_id` from every column reference inside `expression`.
/// Returns the side those steps named, or `None` for the whole result if they disagree.
fn reduce_lineage_at(
    expression: &Expression,
    join_id: NodeId,
) -> Option<(Expression, Option<InputSide>)> {
    let mut reduced = expression.clone();
    let mut side = None;
    let mut conflicting = false;

    reduced.visit_mut(&mut |sub_expression| {
        if let Expression::Column(column_reference) = sub_expression {
            if let Some((stripped, step_side)) = column_reference.reduce_lineage_at(join_id) {
                match side {
                    Some(seen) if seen != step_side => conflicting = true,
                    _ => side = Some(step_side),
                }
                *column_reference = stripped;
            }
            return ExpressionVisitation::DoNotVisitArguments;
        }
        ExpressionVisitation::VisitArguments
    });

    if conflicting {
        None
    } else {
        Some((reduced, side))
    }
}
