use log::{debug, log_enabled, trace, Level};

use crate::config::OptimizerContext;
use crate::error::OptResult;
use crate::operator::LogicalOperator;
use crate::plan::{LogicalPlan, NodeId};
use crate::rules::{Rule, RuleImpl};

pub struct HeuristicOptimizer {
    rules: Vec<RuleImpl>,
    context: OptimizerContext,
}

impl HeuristicOptimizer {
    pub fn new(rules: Vec<RuleImpl>, context: OptimizerContext) -> Self {
        Self { rules, context }
    }

    pub fn context(&self) -> &OptimizerContext {
        &self.context
    }

    /// Applies the rules in order to the plan below `root` until none of them changes it or the
    /// batch ran `max_iter_times` times.
    ///
    /// # Return
    ///
    /// The return value indicates whether the plan changed.
    pub fn optimize(&self, plan: &mut LogicalPlan, root: NodeId) -> OptResult<bool> {
        assert!(
            matches!(plan.operator(root), LogicalOperator::Root),
            "Optimizer has to start at a Root node, got {} node",
            plan.operator(root).name()
        );
        if log_enabled!(Level::Trace) {
            trace!("Plan before optimization:\n{}", plan.explain(root));
        }

        let mut changed = false;
        for times in 0..self.context.config().max_iter_times {
            // The plan no longer changes after iteration
            let mut fixed_point = true;
            for rule in &self.rules {
                debug!("Trying to apply rule {} in iteration {}", rule.name(), times);
                if rule.apply(plan, root, &self.context)? {
                    fixed_point = false;
                    if log_enabled!(Level::Trace) {
                        trace!(
                            "Plan after applying rule {}:\n{}",
                            rule.name(),
                            plan.explain(root)
                        );
                    }
                } else {
                    debug!("Skipped applying rule {}", rule.name());
                }
            }

            if fixed_point {
                break;
            }
            changed = true;
        }

        Ok(changed)
    }
}
