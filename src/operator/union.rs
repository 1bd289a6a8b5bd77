use strum_macros::Display;

#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq)]
pub enum UnionMode {
    /// Merges position lists of the same underlying rows. Both inputs have to produce rows
    /// from the same table in the same order.
    Positions,
    /// Concatenates all rows of both inputs.
    All,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Union {
    mode: UnionMode,
}

impl Union {
    pub fn new(mode: UnionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> UnionMode {
        self.mode
    }
}
