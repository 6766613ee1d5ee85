//! The `RemoteRepo` capability: the only way the rest of this
//! workstation talks to a code-hosting platform.
//!
//! All I/O here is coarse-grained and fallible, as `spec.md` §2
//! requires — callers never see partial results, only a full value or
//! an error. Implementations must be `Send + Sync` so a single client
//! can be shared across the workflow fan-out.

use crate::types::{CiStatus, NewReviewComment, PullRequest, PullRequestState, ReviewComment, ReviewEvent};
use async_trait::async_trait;

/// Capability for listing, fetching, and reviewing pull requests on a
/// remote code-hosting platform.
///
/// This is the system's only external boundary to the remote; every
/// other component (workflows, the reconciliation pipeline, the
/// comment submitter) depends on this trait, never on a concrete
/// client.
#[async_trait]
pub trait RemoteRepo: Send + Sync {
    /// List pull requests in the given state for a repository.
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: PullRequestState,
    ) -> anyhow::Result<Vec<PullRequest>>;

    /// Fetch a single pull request's full details.
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequest>;

    /// Fetch the unified diff text for a pull request.
    async fn fetch_pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<String>;

    /// Fetch all review comments (inline + top-level review bodies) on
    /// a pull request.
    async fn fetch_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<ReviewComment>>;

    /// Fetch the logins of users/teams currently requested to review.
    async fn fetch_requested_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<String>>;

    /// Fetch aggregated CI status for a commit.
    async fn fetch_ci_status(&self, owner: &str, repo: &str, sha: &str) -> anyhow::Result<CiStatus>;

    /// Fetch the member logins of a team, for `TeamFilter`.
    async fn fetch_team_members(&self, org: &str, team_slug: &str) -> anyhow::Result<Vec<String>>;

    /// Fetch the login of the authenticated user, for `ListMyPrs` and
    /// the "requested reviewer is me" / "not my PR" workflow filters.
    async fn fetch_viewer_login(&self) -> anyhow::Result<String>;

    /// Post a single reply to an existing review comment, preserving
    /// threading. Returns the new comment's id.
    async fn reply_to_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        in_reply_to: u64,
        body: &str,
    ) -> anyhow::Result<u64>;

    /// Create a review, bundling zero or more top-level inline
    /// comments in one call.
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        event: ReviewEvent,
        body: Option<&str>,
        comments: &[NewReviewComment],
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_state_default_is_open() {
        assert_eq!(PullRequestState::default(), PullRequestState::Open);
    }
}
