//! Schema for the `workflows` and `plugins` sections of the config file.
//!
//! These types only describe the TOML shape; resolving a `WorkflowConfig`
//! into a running workflow is `rv-workflow`'s job.

use serde::{Deserialize, Serialize};

/// One configured workflow recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub kind: WorkflowKind,

    /// Repositories this workflow operates over, as `"owner/repo"`.
    #[serde(default)]
    pub repos: Vec<String>,

    /// Filter names, e.g. `"FilterByLabel:needs-review"`.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Team slugs; if non-empty, a team filter is prepended automatically.
    #[serde(default)]
    pub teams: Vec<String>,

    pub section_title: String,

    #[serde(default)]
    pub prune: PrunePolicy,

    #[serde(default)]
    pub include_diff: bool,

    /// Optional shell command whose output becomes an extra detail field.
    pub release_check_command: Option<String>,

    /// `ListMyPRs`: remote state to list (`"open"`, `"closed"`, `"all"`).
    pub state: Option<String>,

    /// `ProjectList`: the external tracker key (epic/project) to resolve.
    pub project_key: Option<String>,
}

/// Workflow kinds, per the reconciliation pipeline's `Run` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    SyncReviewRequests,
    SingleRepoSyncReviewRequests,
    ListMyPrs,
    ProjectList,
}

/// Policy applied to items previously present in a section but absent
/// from the workflow's latest PR set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunePolicy {
    Delete,
    Archive,
    #[default]
    None,
}

/// One configured analyzer plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub include_diff: bool,
    #[serde(default)]
    pub include_headers: bool,
    #[serde(default)]
    pub include_comments: bool,
}
