use std::hash::{Hash, Hasher};

use derive_more::{Display, From};
use smallvec::SmallVec;
use strum_macros::Display as StrumDisplay;

use crate::plan::NodeId;

/// Position of a column within the output of the node that created it.
#[derive(Copy, Clone, Debug, Display, From, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ColumnId(usize);

impl ColumnId {
    /// Sentinel standing for "all columns of the origin", used by `COUNT(*)`.
    pub const COUNT_STAR: ColumnId = ColumnId(usize::MAX);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Which input of a two-input node an edge or a lineage step refers to.
#[derive(Copy, Clone, Debug, StrumDisplay, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[strum(serialize_all = "lowercase")]
pub enum InputSide {
    Left,
    Right,
}

impl InputSide {
    pub fn opposite(&self) -> InputSide {
        match self {
            InputSide::Left => InputSide::Right,
            InputSide::Right => InputSide::Left,
        }
    }
}

/// One join boundary a column reference has been disambiguated across.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct LineageStep {
    pub join: NodeId,
    pub side: InputSide,
}

impl LineageStep {
    pub fn new(join: NodeId, side: InputSide) -> Self {
        Self { join, side }
    }
}

pub type Lineage = SmallVec<[LineageStep; 2]>;

/// Identifies a column by the node that produced it plus the joins it was disambiguated
/// across on its way up, most recent step last.
///
/// Equality compares origin and lineage nodes by identity. The hash only covers the column id:
/// equal subplans living at different nodes must hash alike, collisions are left to `==`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnReference {
    origin: NodeId,
    column_id: ColumnId,
    lineage: Lineage,
}

impl Hash for ColumnReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column_id.hash(state);
    }
}

impl ColumnReference {
    pub fn new(origin: NodeId, column_id: ColumnId) -> Self {
        Self {
            origin,
            column_id,
            lineage: Lineage::new(),
        }
    }

    /// Reference standing for `*` in `COUNT(*)` over everything `origin` produces.
    pub fn count_star(origin: NodeId) -> Self {
        Self::new(origin, ColumnId::COUNT_STAR)
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn is_count_star(&self) -> bool {
        self.column_id == ColumnId::COUNT_STAR
    }

    pub fn lineage(&self) -> &[LineageStep] {
        &self.lineage
    }

    pub fn last_step(&self) -> Option<LineageStep> {
        self.lineage.last().copied()
    }

    /// Appends a step unless it is already the most recent one.
    pub fn push_lineage(&mut self, step: LineageStep) {
        if self.last_step() != Some(step) {
            self.lineage.push(step);
        }
    }

    pub fn with_lineage(mut self, join: NodeId, side: InputSide) -> Self {
        self.push_lineage(LineageStep::new(join, side));
        self
    }

    /// Strips the last lineage step if it names `join`, returning the side it named.
    pub fn reduce_lineage_at(&self, join: NodeId) -> Option<(ColumnReference, InputSide)> {
        match self.last_step() {
            Some(step) if step.join == join => {
                let mut reduced = self.clone();
                reduced.lineage.pop();
                Some((reduced, step.side))
            }
            _ => None,
        }
    }

    /// The `COUNT(*)` reference sharing this reference's origin and lineage.
    pub(crate) fn as_count_star(&self) -> ColumnReference {
        Self {
            origin: self.origin,
            column_id: ColumnId::COUNT_STAR,
            lineage: self.lineage.clone(),
        }
    }

    pub(crate) fn remap<F>(&self, mut map_node: F) -> ColumnReference
    where
        F: FnMut(NodeId) -> NodeId,
    {
        Self {
            origin: map_node(self.origin),
            column_id: self.column_id,
            lineage: self
                .lineage
                .iter()
                .map(|step| LineageStep::new(map_node(step.join), step.side))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of(column_reference: &ColumnReference) -> u64 {
        let mut hasher = DefaultHasher::new();
        column_reference.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_uses_origin_identity_and_lineage() {
        let a = ColumnReference::new(NodeId::new(1), ColumnId::from(0));
        let b = ColumnReference::new(NodeId::new(2), ColumnId::from(0));
        assert_ne!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let a_left = a.clone().with_lineage(NodeId::new(7), InputSide::Left);
        let a_right = a.clone().with_lineage(NodeId::new(7), InputSide::Right);
        assert_ne!(a, a_left);
        assert_ne!(a_left, a_right);
        assert_eq!(hash_of(&a), hash_of(&a_left));
    }

    #[test]
    fn test_lineage_append_is_idempotent() {
        let column = ColumnReference::new(NodeId::new(1), ColumnId::from(3))
            .with_lineage(NodeId::new(4), InputSide::Left)
            .with_lineage(NodeId::new(4), InputSide::Left);
        assert_eq!(1, column.lineage().len());

        let column = column.with_lineage(NodeId::new(5), InputSide::Right);
        assert_eq!(2, column.lineage().len());
    }

    #[test]
    fn test_reduce_lineage() {
        let base = ColumnReference::new(NodeId::new(1), ColumnId::from(0));
        let stepped = base.clone().with_lineage(NodeId::new(9), InputSide::Right);

        assert_eq!(
            Some((base.clone(), InputSide::Right)),
            stepped.reduce_lineage_at(NodeId::new(9))
        );
        assert_eq!(None, stepped.reduce_lineage_at(NodeId::new(8)));
        assert_eq!(None, base.reduce_lineage_at(NodeId::new(9)));
    }

    #[test]
    fn test_count_star() {
        let column = ColumnReference::new(NodeId::new(1), ColumnId::from(2))
            .with_lineage(NodeId::new(3), InputSide::Left);
        let count_star = column.as_count_star();
        assert!(count_star.is_count_star());
        assert_eq!(column.lineage(), count_star.lineage());
        assert_eq!(column.origin(), count_star.origin());
    }
}
