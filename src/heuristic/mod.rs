//! Rule based plan rewriting.
//!
//! The heuristic optimizer runs a batch of rewrite rules over a plan, in order, until a whole
//! batch leaves the plan unchanged or the configured number of iterations is used up. The
//! scheme follows the HepPlanner of [apache calcite](https://github.com/apache/calcite).

mod optimizer;
pub use optimizer::*;
