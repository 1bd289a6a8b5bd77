use enumset::{enum_set, EnumSet, EnumSetType};
use strum_macros::{Display, EnumIter};

use crate::expression::PredicateCondition;
use crate::plan::ColumnId;

#[derive(Debug, Display, EnumIter, EnumSetType, Hash)]
pub enum JoinMode {
    Inner,
    Left,
    Right,
    FullOuter,
    Cross,
    Semi,
    AntiNullAsTrue,
    AntiNullAsFalse,
}

/// Modes whose output consists of the left input's columns only.
pub const LEFT_ONLY_JOIN_MODES: EnumSet<JoinMode> =
    enum_set!(JoinMode::Semi | JoinMode::AntiNullAsTrue | JoinMode::AntiNullAsFalse);

impl JoinMode {
    pub fn outputs_right_input(&self) -> bool {
        !LEFT_ONLY_JOIN_MODES.contains(*self)
    }
}

/// Logical join operator.
///
/// `disambiguate` records that the join has been used as a lineage boundary, i.e. the same
/// column reached it through both inputs at some point.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Join {
    mode: JoinMode,
    disambiguate: bool,
}

impl Join {
    pub fn new(mode: JoinMode) -> Self {
        Self {
            mode,
            disambiguate: false,
        }
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    pub fn disambiguate(&self) -> bool {
        self.disambiguate
    }

    pub(crate) fn mark_disambiguated(&mut self) {
        self.disambiguate = true;
    }
}

/// A join predicate resolved to column positions of the join's two inputs.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct JoinPredicate {
    /// Positions in the left and the right input.
    pub column_ids: (ColumnId, ColumnId),
    pub condition: PredicateCondition,
}

impl JoinPredicate {
    pub fn new(column_ids: (ColumnId, ColumnId), condition: PredicateCondition) -> Self {
        Self {
            column_ids,
            condition,
        }
    }

    /// Swaps the sides, keeping the meaning of the predicate.
    pub fn flip(&mut self) {
        self.column_ids = (self.column_ids.1, self.column_ids.0);
        self.condition = self.condition.flip();
    }
}
