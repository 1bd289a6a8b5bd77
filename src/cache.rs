//! Plans shared between statements.
//!
//! A cached plan is frozen: it is never handed out, only structural copies of it are. Callers
//! optimize their copy without affecting concurrent readers of the cache.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::plan::{LogicalPlan, NodeId};

#[derive(Debug)]
struct CachedPlan {
    plan: LogicalPlan,
    root: NodeId,
}

/// Plans keyed by statement.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<String, Arc<CachedPlan>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a copy of the plan below `root`, replacing whatever was cached for `key`.
    pub fn insert<S: Into<String>>(&self, key: S, plan: &LogicalPlan, root: NodeId) {
        let mut frozen = LogicalPlan::new();
        let frozen_root = plan.copy_subplan(root, &mut frozen);
        let key = key.into();
        debug!(
            "Caching plan of {} nodes for statement '{}'",
            frozen.node_count(),
            key
        );
        self.plans.write().insert(
            key,
            Arc::new(CachedPlan {
                plan: frozen,
                root: frozen_root,
            }),
        );
    }

    /// A private copy of the plan cached for `key`, and the root of the copy.
    pub fn get(&self, key: &str) -> Option<(LogicalPlan, NodeId)> {
        let cached = self.plans.read().get(key).cloned()?;

        let mut plan = LogicalPlan::new();
        let root = cached.plan.copy_subplan(cached.root, &mut plan);
        Some((plan, root))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.plans.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.plans.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
