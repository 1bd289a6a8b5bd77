//! Scalar expressions attached to plan nodes.
//!
//! The optimizer only needs a small part of a full expression system: structural equality,
//! deep copies, a visitor that can substitute sub-expressions in place and the ordered
//! arguments of every expression. Column references are the leaves that matter, everything
//! else is carried along untouched.

pub mod functional;

use std::fmt;
use std::hash::{Hash, Hasher};

use enum_as_inner::EnumAsInner;
use itertools::Itertools;
use strum_macros::{Display, EnumIter};

use crate::catalog::DataType;
use crate::plan::{ColumnReference, LogicalPlan};

/// Literal value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
        }
    }
}

/// Floats compare by bit pattern so that literals can take part in plan hashing.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Long(l), Value::Long(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => l.to_bits() == r.to_bits(),
            (Value::Double(l), Value::Double(r)) => l.to_bits() == r.to_bits(),
            (Value::String(l), Value::String(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
        }
    }
}

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
pub enum ArithmeticOperator {
    #[strum(serialize = "+")]
    Addition,
    #[strum(serialize = "-")]
    Subtraction,
    #[strum(serialize = "*")]
    Multiplication,
    #[strum(serialize = "/")]
    Division,
    #[strum(serialize = "%")]
    Modulo,
}

#[derive(Copy, Clone, Debug, Display, EnumIter, Hash, Eq, PartialEq)]
pub enum PredicateCondition {
    #[strum(serialize = "=")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanEquals,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanEquals,
    #[strum(serialize = "LIKE")]
    Like,
    #[strum(serialize = "NOT LIKE")]
    NotLike,
}

impl PredicateCondition {
    /// Whether this is one of the six comparisons a join can evaluate.
    pub fn is_comparison(&self) -> bool {
        !matches!(self, PredicateCondition::Like | PredicateCondition::NotLike)
    }

    /// The condition that holds for swapped operands, i.e. `a < b` iff `b > a`.
    pub fn flip(&self) -> PredicateCondition {
        match self {
            PredicateCondition::LessThan => PredicateCondition::GreaterThan,
            PredicateCondition::LessThanEquals => PredicateCondition::GreaterThanEquals,
            PredicateCondition::GreaterThan => PredicateCondition::LessThan,
            PredicateCondition::GreaterThanEquals => PredicateCondition::LessThanEquals,
            PredicateCondition::Equals
            | PredicateCondition::NotEquals
            | PredicateCondition::Like
            | PredicateCondition::NotLike => *self,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
pub enum BooleanOperator {
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
}

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    #[strum(serialize = "COUNT DISTINCT")]
    CountDistinct,
    Sum,
    Min,
    Max,
    Avg,
}

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
pub enum FunctionKind {
    #[strum(serialize = "ABS")]
    Abs,
    #[strum(serialize = "CONCAT")]
    Concatenate,
}

/// Tells a visitor whether to continue into the arguments of the expression it just saw.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExpressionVisitation {
    VisitArguments,
    DoNotVisitArguments,
}

/// A scalar expression tree.
///
/// `Clone` is a deep copy. `==` is structural, with column references compared by identity of
/// their origin and lineage.
#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner)]
pub enum Expression {
    Column(ColumnReference),
    Literal(Value),
    Arithmetic {
        operator: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    BinaryPredicate {
        condition: PredicateCondition,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: BooleanOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    IsNull {
        negated: bool,
        operand: Box<Expression>,
    },
    Aggregate {
        function: AggregateFunction,
        argument: Box<Expression>,
    },
    Function {
        function: FunctionKind,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// Ordered child expressions.
    pub fn arguments(&self) -> Vec<&Expression> {
        match self {
            Expression::Column(_) | Expression::Literal(_) => vec![],
            Expression::Arithmetic { left, right, .. }
            | Expression::BinaryPredicate { left, right, .. }
            | Expression::Logical { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::IsNull { operand, .. } => vec![operand.as_ref()],
            Expression::Aggregate { argument, .. } => vec![argument.as_ref()],
            Expression::Function { arguments, .. } => arguments.iter().collect(),
        }
    }

    pub fn arguments_mut(&mut self) -> Vec<&mut Expression> {
        match self {
            Expression::Column(_) | Expression::Literal(_) => vec![],
            Expression::Arithmetic { left, right, .. }
            | Expression::BinaryPredicate { left, right, .. }
            | Expression::Logical { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expression::IsNull { operand, .. } => vec![operand.as_mut()],
            Expression::Aggregate { argument, .. } => vec![argument.as_mut()],
            Expression::Function { arguments, .. } => arguments.iter_mut().collect(),
        }
    }

    /// Whether two expressions are the same kind of expression with the same number of
    /// arguments, ignoring the arguments themselves.
    pub fn same_shape(&self, other: &Expression) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.arguments().len() == other.arguments().len()
    }

    /// Pre-order traversal.
    pub fn visit<F>(&self, visitor: &mut F)
    where
        F: FnMut(&Expression) -> ExpressionVisitation,
    {
        if visitor(self) == ExpressionVisitation::VisitArguments {
            for argument in self.arguments() {
                argument.visit(visitor);
            }
        }
    }

    /// Pre-order traversal that may replace the visited expression in place. Descent continues
    /// into the arguments of whatever the visitor left in place.
    pub fn visit_mut<F>(&mut self, visitor: &mut F)
    where
        F: FnMut(&mut Expression) -> ExpressionVisitation,
    {
        if visitor(self) == ExpressionVisitation::VisitArguments {
            for argument in self.arguments_mut() {
                argument.visit_mut(visitor);
            }
        }
    }

    pub fn column_references(&self) -> Vec<&ColumnReference> {
        let mut column_references = vec![];
        self.collect_column_references(&mut column_references);
        column_references
    }

    fn collect_column_references<'a>(&'a self, column_references: &mut Vec<&'a ColumnReference>) {
        match self {
            Expression::Column(column_reference) => column_references.push(column_reference),
            _ => {
                for argument in self.arguments() {
                    argument.collect_column_references(column_references);
                }
            }
        }
    }

    /// Replaces every column reference for which `replacement` returns a value. Returns whether
    /// anything changed.
    pub fn replace_column_references<F>(&mut self, mut replacement: F) -> bool
    where
        F: FnMut(&ColumnReference) -> Option<ColumnReference>,
    {
        let mut replaced = false;
        self.visit_mut(&mut |sub_expression| {
            if let Expression::Column(column_reference) = sub_expression {
                if let Some(new_reference) = replacement(column_reference) {
                    *column_reference = new_reference;
                    replaced = true;
                }
                return ExpressionVisitation::DoNotVisitArguments;
            }
            ExpressionVisitation::VisitArguments
        });
        replaced
    }

    pub fn data_type(&self, plan: &LogicalPlan) -> DataType {
        match self {
            Expression::Column(column_reference) => {
                plan.column_reference_data_type(column_reference)
            }
            Expression::Literal(value) => value.data_type(),
            Expression::Arithmetic { left, right, .. } => {
                std::cmp::max(left.data_type(plan), right.data_type(plan))
            }
            Expression::BinaryPredicate { .. }
            | Expression::Logical { .. }
            | Expression::IsNull { .. } => DataType::Int,
            Expression::Aggregate { function, argument } => match function {
                AggregateFunction::Count | AggregateFunction::CountDistinct => DataType::Long,
                AggregateFunction::Avg => DataType::Double,
                AggregateFunction::Sum => match argument.data_type(plan) {
                    DataType::Int | DataType::Long => DataType::Long,
                    DataType::Float | DataType::Double => DataType::Double,
                    other => other,
                },
                AggregateFunction::Min | AggregateFunction::Max => argument.data_type(plan),
            },
            Expression::Function { function, arguments } => match function {
                FunctionKind::Abs => arguments
                    .first()
                    .map(|argument| argument.data_type(plan))
                    .unwrap_or(DataType::Null),
                FunctionKind::Concatenate => DataType::String,
            },
        }
    }

    /// Renders the expression with column names resolved through `plan`.
    pub fn display<'a>(&'a self, plan: &'a LogicalPlan) -> ExpressionDisplay<'a> {
        ExpressionDisplay {
            expression: self,
            plan,
        }
    }
}

pub struct ExpressionDisplay<'a> {
    expression: &'a Expression,
    plan: &'a LogicalPlan,
}

impl<'a> ExpressionDisplay<'a> {
    fn operand(&self, expression: &'a Expression, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nested = expression.display(self.plan);
        match expression {
            Expression::Arithmetic { .. }
            | Expression::BinaryPredicate { .. }
            | Expression::Logical { .. } => write!(f, "({})", nested),
            _ => write!(f, "{}", nested),
        }
    }
}

impl<'a> fmt::Display for ExpressionDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expression {
            Expression::Column(column_reference) => {
                write!(f, "{}", self.plan.describe_column(column_reference))
            }
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Arithmetic {
                operator,
                left,
                right,
            } => {
                self.operand(left, f)?;
                write!(f, " {} ", operator)?;
                self.operand(right, f)
            }
            Expression::BinaryPredicate {
                condition,
                left,
                right,
            } => {
                self.operand(left, f)?;
                write!(f, " {} ", condition)?;
                self.operand(right, f)
            }
            Expression::Logical {
                operator,
                left,
                right,
            } => {
                self.operand(left, f)?;
                write!(f, " {} ", operator)?;
                self.operand(right, f)
            }
            Expression::IsNull { negated, operand } => {
                self.operand(operand, f)?;
                if *negated {
                    write!(f, " IS NOT NULL")
                } else {
                    write!(f, " IS NULL")
                }
            }
            Expression::Aggregate { function, argument } => match argument.as_ref() {
                Expression::Column(column_reference) if column_reference.is_count_star() => {
                    write!(f, "{}(*)", function)
                }
                _ => write!(f, "{}({})", function, argument.display(self.plan)),
            },
            Expression::Function {
                function,
                arguments,
            } => write!(
                f,
                "{}({})",
                function,
                arguments
                    .iter()
                    .map(|argument| argument.display(self.plan))
                    .join(", ")
            ),
        }
    }
}
