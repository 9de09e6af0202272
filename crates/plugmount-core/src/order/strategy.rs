use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::graph::DependencyGraph;
use super::weight::{WeightStack, compute_weights};
use crate::error::SortResult;
use crate::plugin::Bean;

/// Orders a loaded bean set before mounting.
///
/// Implementations must be deterministic: equal inputs give equal orders.
pub trait SortStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reorders `beans` in place.
    fn sort(&self, beans: &mut [Bean]) -> SortResult<()>;
}

/// Sorts by each bean's explicit priority, ascending; unset counts as `0`.
///
/// Stable: beans with equal priority keep their relative order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityOrder;

impl SortStrategy for PriorityOrder {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn sort(&self, beans: &mut [Bean]) -> SortResult<()> {
        beans.sort_by(|a, b| compare_priority(a, b));
        Ok(())
    }
}

/// Sorts by computed dependency weight, descending.
///
/// Each bean's `priority` is overwritten with its weight, so the most
/// depended-upon plugins come first. Stable for equal weights.
#[derive(Debug, Clone, Copy)]
pub struct DependencyOrder {
    allow_implicits: bool,
}

impl DependencyOrder {
    /// Creates the strategy; missing dependencies become implicit placeholders.
    pub fn new() -> Self {
        Self {
            allow_implicits: true,
        }
    }

    /// Makes a missing dependency a hard error.
    pub fn without_implicits() -> Self {
        Self {
            allow_implicits: false,
        }
    }

    /// Whether missing dependencies are synthesized.
    pub fn allows_implicits(&self) -> bool {
        self.allow_implicits
    }
}

impl Default for DependencyOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl SortStrategy for DependencyOrder {
    fn name(&self) -> &'static str {
        "dependencies"
    }

    fn sort(&self, beans: &mut [Bean]) -> SortResult<()> {
        sort_by_dependencies(beans, self.allow_implicits).map(|_| ())
    }
}

/// Assigns dependency weights to `beans` and sorts them, heaviest first.
///
/// Returns the computed [`WeightStack`], including any synthesized
/// implicit dependencies.
pub fn sort_by_dependencies(beans: &mut [Bean], allow_implicits: bool) -> SortResult<WeightStack> {
    let graph = DependencyGraph::from_beans(beans);
    let stack = compute_weights(&graph, allow_implicits)?;

    for implicit in stack.implicits() {
        warn!(
            dependency = %implicit.id,
            required_by = %implicit.required_by,
            "No plugin provides this dependency, treating it as implicit"
        );
    }

    for bean in beans.iter_mut() {
        bean.priority = Some(stack.priority(&bean.id).unwrap_or_default());
    }

    beans.sort_by(|a, b| compare_priority(b, a));

    debug!(
        order = ?beans.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
        "Plugins ordered by dependency weight"
    );

    Ok(stack)
}

fn compare_priority(a: &Bean, b: &Bean) -> Ordering {
    a.priority.unwrap_or(0).cmp(&b.priority.unwrap_or(0))
}

// ─── SortKind ─────────────────────────────────────────────────────────────────

/// Configuration-level choice of sort strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKind {
    /// [`PriorityOrder`].
    #[default]
    Priority,
    /// [`DependencyOrder`].
    #[serde(alias = "dependency")]
    Dependencies,
}

impl SortKind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Dependencies => "dependencies",
        }
    }

    /// Instantiates the strategy.
    pub fn strategy(self, allow_implicits: bool) -> Arc<dyn SortStrategy> {
        match self {
            Self::Priority => Arc::new(PriorityOrder),
            Self::Dependencies if allow_implicits => Arc::new(DependencyOrder::new()),
            Self::Dependencies => Arc::new(DependencyOrder::without_implicits()),
        }
    }
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "priority" => Ok(Self::Priority),
            "dependencies" | "dependency" => Ok(Self::Dependencies),
            other => Err(format!("unknown sort strategy: {other}")),
        }
    }
}
