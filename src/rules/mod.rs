//! Rewrite rules applied by the [`crate::heuristic::HeuristicOptimizer`].

mod subplan_reuse;
pub use subplan_reuse::*;

use enum_dispatch::enum_dispatch;

use crate::config::OptimizerContext;
use crate::error::OptResult;
use crate::plan::{LogicalPlan, NodeId};

#[enum_dispatch]
pub trait Rule {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Rewrites the plan below `root` in place.
    ///
    /// # Return
    ///
    /// The return value indicates whether the plan changed.
    fn apply(
        &self,
        plan: &mut LogicalPlan,
        root: NodeId,
        context: &OptimizerContext,
    ) -> OptResult<bool>;
}

#[enum_dispatch(Rule)]
#[derive(Clone, Debug)]
pub enum RuleImpl {
    SubplanReuseRule,
}
