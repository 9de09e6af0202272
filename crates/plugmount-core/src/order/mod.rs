//! Load-order resolution.
//!
//! - [`graph`] extracts `id -> [dependency ids]` from a bean set.
//! - [`weight`] turns the graph into per-id weights, detecting cycles and
//!   synthesizing placeholders for missing dependencies.
//! - [`cycle`] reconstructs a readable cycle path for error messages.
//! - [`strategy`] applies either explicit priorities or dependency weights
//!   to order beans before they are mounted.

pub mod cycle;
pub mod graph;
pub mod strategy;
pub mod weight;

pub use cycle::find_cycle;
pub use graph::{DependencyGraph, build_graph};
pub use strategy::{DependencyOrder, PriorityOrder, SortKind, SortStrategy, sort_by_dependencies};
pub use weight::{ImplicitDependency, Weight, WeightStack, compute_weights};
