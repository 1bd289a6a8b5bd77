use itertools::Itertools;
use strum_macros::Display;

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
pub enum SortMode {
    Ascending,
    Descending,
}

/// Sort node payload, one mode per node expression.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Sort {
    modes: Vec<SortMode>,
}

impl Sort {
    pub fn new(modes: Vec<SortMode>) -> Self {
        Self { modes }
    }

    pub fn modes(&self) -> &[SortMode] {
        &self.modes
    }

    pub(crate) fn describe_modes(&self) -> String {
        self.modes.iter().join(", ")
    }
}
