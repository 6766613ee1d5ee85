//! Remote data transfer objects
//!
//! These types represent the data returned from a code-hosting
//! platform's API. They are intentionally separate from the store's
//! own record shapes (`rv-store`) to keep this crate pure and
//! reusable independent of how the workstation persists anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pull request from the remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 123)
    pub number: u64,

    /// PR title
    pub title: String,

    /// PR body/description
    pub body: Option<String>,

    /// Author's username
    pub author: String,

    /// Whether the PR is a draft
    pub draft: bool,

    /// Labels applied to the PR
    pub labels: Vec<String>,

    /// Number of comments on the PR
    pub comments: u64,

    /// HEAD commit SHA
    pub head_sha: String,

    /// Base branch name (e.g., "main")
    pub base_branch: String,

    /// HEAD branch name (e.g., "feature/foo")
    pub head_branch: String,

    /// Whether the PR is mergeable (null if not yet computed)
    pub mergeable: Option<bool>,

    /// Mergeable state as reported by the remote
    pub mergeable_state: Option<MergeableState>,

    /// When the PR was created
    pub created_at: DateTime<Utc>,

    /// When the PR was last updated
    pub updated_at: DateTime<Utc>,

    /// PR URL for opening in browser
    pub html_url: String,

    /// Number of lines added
    pub additions: u64,

    /// Number of lines deleted
    pub deletions: u64,
}

/// State filter used when listing pull requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    #[default]
    Open,
    Closed,
    All,
}

/// Mergeable state as reported by the remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    /// The merge is clean
    Clean,
    /// The head branch is behind the base branch
    Behind,
    /// The merge has conflicts
    Dirty,
    /// The merge is blocked (e.g., by required reviews)
    Blocked,
    /// CI checks are failing or pending
    Unstable,
    /// State is unknown or not yet computed
    #[default]
    Unknown,
}

/// Review event type for PR reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    /// Approve the PR
    Approve,
    /// Request changes
    RequestChanges,
    /// Comment only (no approval/rejection)
    Comment,
}

/// Aggregated CI status from check runs.
///
/// This represents the combined status of all CI check runs for a
/// commit, aggregated into a single overall state with counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiStatus {
    /// Overall CI state (aggregated from all check runs)
    pub state: CiState,
    /// Total number of check runs
    pub total_checks: usize,
    /// Number of passed checks
    pub passed: usize,
    /// Number of failed checks
    pub failed: usize,
    /// Number of pending/in-progress checks
    pub pending: usize,
}

/// Aggregated CI state.
///
/// - Any failure -> Failure
/// - Any pending (and no failure) -> Pending
/// - All success -> Success
/// - No checks -> Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiState {
    Success,
    Failure,
    Pending,
    Unknown,
}

/// A review comment on a pull request: a comment on a specific
/// GitHub-style anchor position within a file's diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Remote comment ID
    pub id: u64,
    /// File path the comment is on
    pub path: String,
    /// Anchor position within the file's diff (see `rv-diff`)
    pub position: Option<u32>,
    /// Id of the comment this one replies to, if any
    pub in_reply_to_id: Option<u64>,
    /// Comment body text
    pub body: String,
    /// Author's username
    pub author: String,
    /// When the comment was created
    pub created_at: DateTime<Utc>,
    /// When the comment was last updated
    pub updated_at: DateTime<Utc>,
}

/// A new top-level inline comment to bundle into a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReviewComment {
    pub path: String,
    pub position: u32,
    pub body: String,
}
