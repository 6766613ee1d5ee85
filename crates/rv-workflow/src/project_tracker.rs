//! `ProjectList`'s external dependency: resolving a project/epic key to
//! a set of PR coordinates. Nothing in the pack names a concrete issue
//! tracker, so this crate only defines the seam; callers wire a real
//! implementation (or the no-op below) when building the `ProjectList`
//! workflow.

use async_trait::async_trait;
use log::warn;

/// Resolves a configured `project_key` to the PRs that belong to it.
#[async_trait]
pub trait ProjectTracker: Send + Sync {
    async fn resolve_pr_numbers(&self, project_key: &str) -> anyhow::Result<Vec<(String, String, u64)>>;
}

/// A tracker that resolves nothing. Used when no tracker integration is
/// configured; keeps `ProjectList` workflows a bounded-failure no-op
/// instead of a hard error.
pub struct NoopProjectTracker;

#[async_trait]
impl ProjectTracker for NoopProjectTracker {
    async fn resolve_pr_numbers(&self, project_key: &str) -> anyhow::Result<Vec<(String, String, u64)>> {
        warn!("no project tracker configured, project_key {project_key} resolves to nothing");
        Ok(Vec::new())
    }
}
