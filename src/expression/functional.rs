//! Short-hand constructors for building expressions, mostly in rules and tests.
//!
//! ```ignore
//! let predicate = greater_than(sum(a), 10);
//! ```

use crate::expression::{
    AggregateFunction, ArithmeticOperator, BooleanOperator, Expression, FunctionKind,
    PredicateCondition, Value,
};
use crate::plan::{ColumnReference, NodeId};

impl From<ColumnReference> for Expression {
    fn from(column_reference: ColumnReference) -> Self {
        Expression::Column(column_reference)
    }
}

impl From<&ColumnReference> for Expression {
    fn from(column_reference: &ColumnReference) -> Self {
        Expression::Column(column_reference.clone())
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl From<i32> for Expression {
    fn from(value: i32) -> Self {
        Expression::Literal(Value::Int(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Literal(Value::Long(value))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Literal(Value::Double(value))
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Literal(Value::String(value.to_string()))
    }
}

pub fn col<C: Into<ColumnReference>>(column_reference: C) -> Expression {
    Expression::Column(column_reference.into())
}

pub fn lit<V: Into<Expression>>(value: V) -> Expression {
    value.into()
}

pub fn null() -> Expression {
    Expression::Literal(Value::Null)
}

fn binary_predicate<L, R>(condition: PredicateCondition, left: L, right: R) -> Expression
where
    L: Into<Expression>,
    R: Into<Expression>,
{
    Expression::BinaryPredicate {
        condition,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

pub fn equals<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::Equals, left, right)
}

pub fn not_equals<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::NotEquals, left, right)
}

pub fn less_than<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::LessThan, left, right)
}

pub fn less_than_equals<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::LessThanEquals, left, right)
}

pub fn greater_than<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::GreaterThan, left, right)
}

pub fn greater_than_equals<L: Into<Expression>, R: Into<Expression>>(
    left: L,
    right: R,
) -> Expression {
    binary_predicate(PredicateCondition::GreaterThanEquals, left, right)
}

pub fn like<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    binary_predicate(PredicateCondition::Like, left, right)
}

pub fn predicate<L, R>(condition: PredicateCondition, left: L, right: R) -> Expression
where
    L: Into<Expression>,
    R: Into<Expression>,
{
    binary_predicate(condition, left, right)
}

fn logical<L: Into<Expression>, R: Into<Expression>>(
    operator: BooleanOperator,
    left: L,
    right: R,
) -> Expression {
    Expression::Logical {
        operator,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

pub fn and<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    logical(BooleanOperator::And, left, right)
}

pub fn or<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    logical(BooleanOperator::Or, left, right)
}

fn arithmetic<L: Into<Expression>, R: Into<Expression>>(
    operator: ArithmeticOperator,
    left: L,
    right: R,
) -> Expression {
    Expression::Arithmetic {
        operator,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

pub fn add<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    arithmetic(ArithmeticOperator::Addition, left, right)
}

pub fn sub<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    arithmetic(ArithmeticOperator::Subtraction, left, right)
}

pub fn mul<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    arithmetic(ArithmeticOperator::Multiplication, left, right)
}

pub fn div<L: Into<Expression>, R: Into<Expression>>(left: L, right: R) -> Expression {
    arithmetic(ArithmeticOperator::Division, left, right)
}

pub fn is_null<E: Into<Expression>>(operand: E) -> Expression {
    Expression::IsNull {
        negated: false,
        operand: Box::new(operand.into()),
    }
}

pub fn is_not_null<E: Into<Expression>>(operand: E) -> Expression {
    Expression::IsNull {
        negated: true,
        operand: Box::new(operand.into()),
    }
}

fn aggregate<E: Into<Expression>>(function: AggregateFunction, argument: E) -> Expression {
    Expression::Aggregate {
        function,
        argument: Box::new(argument.into()),
    }
}

pub fn sum<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::Sum, argument)
}

pub fn min<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::Min, argument)
}

pub fn max<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::Max, argument)
}

pub fn avg<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::Avg, argument)
}

pub fn count<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::Count, argument)
}

pub fn count_distinct<E: Into<Expression>>(argument: E) -> Expression {
    aggregate(AggregateFunction::CountDistinct, argument)
}

/// `COUNT(*)` over everything `origin` produces.
pub fn count_star(origin: NodeId) -> Expression {
    aggregate(AggregateFunction::Count, ColumnReference::count_star(origin))
}

pub fn abs<E: Into<Expression>>(argument: E) -> Expression {
    Expression::Function {
        function: FunctionKind::Abs,
        arguments: vec![argument.into()],
    }
}

pub fn concat(arguments: Vec<Expression>) -> Expression {
    Expression::Function {
        function: FunctionKind::Concatenate,
        arguments,
    }
}
