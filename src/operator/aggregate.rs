/// Aggregate node payload. The node expressions hold `group_by_count` group-by expressions
/// followed by the aggregates.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Aggregate {
    group_by_count: usize,
}

impl Aggregate {
    pub fn new(group_by_count: usize) -> Self {
        Self { group_by_count }
    }

    pub fn group_by_count(&self) -> usize {
        self.group_by_count
    }
}
