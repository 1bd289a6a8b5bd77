//! ## Background
//!
//! A logical query plan (LQP) is a relational algebra dag: predicates, joins, aggregates and so
//! on, down to the tables they read. Queries often compute the same thing more than once, for
//! example when a table is joined with itself or when a subquery repeats a part of the outer
//! query. Executing such a plan as is computes every repeated subplan once per occurrence.
//!
//! Subplan reuse merges structurally equal subplans into one node that is consumed by several
//! parents, so the physical plan generated from it computes the result once and shares it.
//! Merging is not free of risk: once two branches of a join read the very same node, a column
//! reaches the join through both inputs, and expressions above the join must still be able to
//! tell the two apart. This crate solves that with column lineage: a column reference records
//! every join it was disambiguated across on its way up.
//!
//! ## Design
//!
//! ### Plan
//!
//! All nodes of a plan live in one arena ([`plan::LogicalPlan`]) backed by a stable graph, so
//! node ids survive the removal of other nodes. Edges point from a node to its inputs and carry
//! the input side, the incoming edges of a node are its back-edges to its parents. Output
//! columns are derived on demand, never cached.
//!
//! ### Heuristic Optimizer
//!
//! Heuristic optimizer is a rule base optimizer. It runs a batch of rules iteratively, until
//! reaching fix point or maximum number of iteration times. The only rule currently shipped is
//! [`rules::SubplanReuseRule`].
//!
//! ### Plan cache
//!
//! Plans placed in a [`cache::PlanCache`] are frozen. Every reader gets its own structural copy
//! to optimize, so concurrent readers never observe a plan being rewritten.

#[macro_use]
extern crate prettytable;

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod expression;
pub mod heuristic;
pub mod operator;
pub mod plan;
pub mod rules;
