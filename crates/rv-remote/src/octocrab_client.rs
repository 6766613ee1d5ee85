//! Octocrab-based remote client
//!
//! Direct implementation of the `RemoteRepo` trait using the octocrab
//! library. This client makes real API calls with no caching of its
//! own — read-through caching of PR snapshots lives in `rv-store`.

use crate::client::RemoteRepo;
use crate::types::{
    CiState, CiStatus, MergeableState, NewReviewComment, PullRequest, PullRequestState,
    ReviewComment, ReviewEvent,
};
use async_trait::async_trait;
use log::debug;
use octocrab::Octocrab;
use std::sync::Arc;

/// Direct remote client using octocrab.
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
    /// API base URL (e.g., "https://api.github.com" or "https://ghe.example.com/api/v3")
    api_base_url: String,
}

impl OctocrabClient {
    /// Create a new client with the given octocrab instance (defaults to github.com)
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self {
            octocrab,
            api_base_url: "https://api.github.com".to_string(),
        }
    }

    /// Create a new client with a custom API base URL (for GitHub Enterprise)
    pub fn with_base_url(octocrab: Arc<Octocrab>, api_base_url: impl Into<String>) -> Self {
        Self {
            octocrab,
            api_base_url: api_base_url.into(),
        }
    }

    /// Get the API base URL
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

#[async_trait]
impl RemoteRepo for OctocrabClient {
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: PullRequestState,
    ) -> anyhow::Result<Vec<PullRequest>> {
        debug!("Listing PRs for {}/{} (state={:?})", owner, repo, state);

        let octocrab_state = match state {
            PullRequestState::Open => octocrab::params::State::Open,
            PullRequestState::Closed => octocrab::params::State::Closed,
            PullRequestState::All => octocrab::params::State::All,
        };

        let mut prs = Vec::new();
        let mut page_num = 1u32;
        const MAX_PRS: usize = 200;
        const PER_PAGE: u8 = 50;

        loop {
            let pulls = self.octocrab.pulls(owner, repo);
            let page = pulls
                .list()
                .state(octocrab_state)
                .per_page(PER_PAGE)
                .page(page_num)
                .send()
                .await?;

            let page_is_empty = page.items.is_empty();
            for pr in page.items {
                if prs.len() >= MAX_PRS {
                    break;
                }
                prs.push(convert_pull_request(&pr));
            }

            if prs.len() >= MAX_PRS || page_is_empty {
                break;
            }
            page_num += 1;
        }

        prs.sort_by(|a, b| b.number.cmp(&a.number));
        prs.dedup_by_key(|pr| pr.number);

        debug!("Listed {} PRs for {}/{}", prs.len(), owner, repo);
        Ok(prs)
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequest> {
        debug!("Fetching PR #{} for {}/{}", number, owner, repo);
        let pr = self.octocrab.pulls(owner, repo).get(number).await?;
        Ok(convert_pull_request(&pr))
    }

    async fn fetch_pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<String> {
        debug!("Fetching diff for PR #{} in {}/{}", number, owner, repo);
        let diff = self
            .octocrab
            .pulls(owner, repo)
            .get_diff(number)
            .await
            .map_err(format_octocrab_error)?;
        Ok(diff)
    }

    async fn fetch_review_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<ReviewComment>> {
        debug!(
            "Fetching review comments for PR #{} in {}/{}",
            number, owner, repo
        );

        let route = format!("/repos/{}/{}/pulls/{}/comments", owner, repo, number);
        let response: Vec<serde_json::Value> = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(format_octocrab_error)?;

        let comments = response
            .into_iter()
            .filter_map(|c| {
                let id = c["id"].as_u64()?;
                let path = c["path"].as_str()?.to_string();
                let body = c["body"].as_str()?.to_string();
                let author = c["user"]["login"].as_str()?.to_string();
                let created_at = c["created_at"]
                    .as_str()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc))?;
                let updated_at = c["updated_at"]
                    .as_str()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc))?;

                // position is null for comments on lines no longer in the diff (outdated)
                let position = c["position"].as_u64().map(|p| p as u32);
                let in_reply_to_id = c["in_reply_to_id"].as_u64();

                Some(ReviewComment {
                    id,
                    path,
                    position,
                    in_reply_to_id,
                    body,
                    author,
                    created_at,
                    updated_at,
                })
            })
            .collect();

        Ok(comments)
    }

    async fn fetch_requested_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<String>> {
        debug!(
            "Fetching requested reviewers for PR #{} in {}/{}",
            number, owner, repo
        );

        let route = format!(
            "/repos/{}/{}/pulls/{}/requested_reviewers",
            owner, repo, number
        );

        #[derive(serde::Deserialize)]
        struct RequestedReviewers {
            users: Vec<octocrab::models::Author>,
            teams: Vec<octocrab::models::teams::Team>,
        }

        let response: RequestedReviewers = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(format_octocrab_error)?;

        let mut logins: Vec<String> = response.users.into_iter().map(|u| u.login).collect();
        logins.extend(response.teams.into_iter().map(|t| t.slug));
        Ok(logins)
    }

    async fn fetch_ci_status(&self, owner: &str, repo: &str, sha: &str) -> anyhow::Result<CiStatus> {
        debug!("Fetching CI status for {}/{} @ {}", owner, repo, sha);

        let route = format!("/repos/{}/{}/commits/{}/check-runs", owner, repo, sha);

        #[derive(serde::Deserialize)]
        struct CheckRunsResponse {
            check_runs: Vec<CheckRunItem>,
        }

        #[derive(serde::Deserialize)]
        struct CheckRunItem {
            status: Option<String>,
            conclusion: Option<String>,
        }

        let response: CheckRunsResponse = self
            .octocrab
            .get(&route, None::<&()>)
            .await
            .map_err(format_octocrab_error)?;

        let mut passed = 0;
        let mut failed = 0;
        let mut pending = 0;

        for check in &response.check_runs {
            if let Some(conclusion) = &check.conclusion {
                match conclusion.as_str() {
                    "success" | "neutral" | "skipped" => passed += 1,
                    "failure" | "cancelled" | "timed_out" | "action_required" | "stale"
                    | "startup_failure" => failed += 1,
                    _ => pending += 1,
                }
            } else if let Some(status) = &check.status {
                if status == "in_progress" || status == "queued" {
                    pending += 1;
                }
            }
        }

        let total_checks = response.check_runs.len();
        let state = if failed > 0 {
            CiState::Failure
        } else if pending > 0 {
            CiState::Pending
        } else if passed > 0 {
            CiState::Success
        } else {
            CiState::Unknown
        };

        debug!(
            "CI status for {}/{} @ {}: {:?} (passed={}, failed={}, pending={})",
            owner, repo, sha, state, passed, failed, pending
        );

        Ok(CiStatus {
            state,
            total_checks,
            passed,
            failed,
            pending,
        })
    }

    async fn fetch_team_members(&self, org: &str, team_slug: &str) -> anyhow::Result<Vec<String>> {
        debug!("Fetching members of team {}/{}", org, team_slug);
        let route = format!("/orgs/{}/teams/{}/members", org, team_slug);
        let members: Vec<octocrab::models::Author> = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(format_octocrab_error)?;
        Ok(members.into_iter().map(|m| m.login).collect())
    }

    async fn fetch_viewer_login(&self) -> anyhow::Result<String> {
        debug!("Fetching authenticated user login");
        let user: octocrab::models::Author = self
            .octocrab
            .current()
            .user()
            .await
            .map_err(format_octocrab_error)?;
        Ok(user.login)
    }

    async fn reply_to_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        in_reply_to: u64,
        body: &str,
    ) -> anyhow::Result<u64> {
        debug!(
            "Replying to comment {} on PR #{} in {}/{}",
            in_reply_to, number, owner, repo
        );

        let route = format!("/repos/{}/{}/pulls/{}/comments", owner, repo, number);
        let payload = serde_json::json!({
            "body": body,
            "in_reply_to": in_reply_to,
        });

        let response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(format_octocrab_error)?;

        response["id"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("Missing comment ID in reply response"))
    }

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        event: ReviewEvent,
        body: Option<&str>,
        comments: &[NewReviewComment],
    ) -> anyhow::Result<()> {
        debug!(
            "Creating {:?} review for PR #{} in {}/{} with {} comment(s)",
            event,
            number,
            owner,
            repo,
            comments.len()
        );

        let route = format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, number);

        let event_str = match event {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        };

        let mut payload = serde_json::json!({ "event": event_str });

        if let Some(b) = body {
            payload["body"] = serde_json::Value::String(b.to_string());
        }

        if !comments.is_empty() {
            let comment_payloads: Vec<serde_json::Value> = comments
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "path": c.path,
                        "position": c.position,
                        "body": c.body,
                    })
                })
                .collect();
            payload["comments"] = serde_json::Value::Array(comment_payloads);
        }

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&payload))
            .await
            .map_err(format_octocrab_error)?;

        Ok(())
    }
}

fn convert_pull_request(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        body: pr.body.clone(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        draft: pr.draft.unwrap_or(false),
        labels: pr
            .labels
            .as_ref()
            .map(|ls| ls.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default(),
        comments: pr.comments.unwrap_or(0),
        head_sha: pr.head.sha.clone(),
        base_branch: pr.base.ref_field.clone(),
        head_branch: pr.head.ref_field.clone(),
        mergeable: pr.mergeable,
        mergeable_state: pr.mergeable_state.as_ref().map(convert_mergeable_state),
        created_at: pr.created_at.unwrap_or_else(chrono::Utc::now),
        updated_at: pr.updated_at.unwrap_or_else(chrono::Utc::now),
        html_url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
        additions: pr.additions.unwrap_or(0),
        deletions: pr.deletions.unwrap_or(0),
    }
}

fn convert_mergeable_state(state: &octocrab::models::pulls::MergeableState) -> MergeableState {
    use octocrab::models::pulls::MergeableState as OMS;
    match state {
        OMS::Clean => MergeableState::Clean,
        OMS::Behind => MergeableState::Behind,
        OMS::Dirty => MergeableState::Dirty,
        OMS::Blocked => MergeableState::Blocked,
        OMS::Unstable => MergeableState::Unstable,
        OMS::Unknown => MergeableState::Unknown,
        _ => MergeableState::Unknown,
    }
}

/// Format octocrab errors with useful message content.
///
/// The default Display for octocrab::Error only shows the variant name
/// (e.g., "GitHub") which is not helpful. This extracts the actual
/// error message.
fn format_octocrab_error(err: octocrab::Error) -> anyhow::Error {
    match &err {
        octocrab::Error::GitHub { source, .. } => {
            let msg = &source.message;
            let details = source
                .errors
                .as_ref()
                .map(|errs| {
                    errs.iter()
                        .filter_map(|e| e.as_str().or_else(|| e.get("message")?.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|s| !s.is_empty());

            match details {
                Some(d) => anyhow::anyhow!("{}: {}", msg, d),
                None => anyhow::anyhow!("{}", msg),
            }
        }
        _ => anyhow::anyhow!("{:?}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mergeable_state_unknown_variant_falls_back_to_unknown() {
        use octocrab::models::pulls::MergeableState as OMS;
        assert_eq!(convert_mergeable_state(&OMS::Unknown), MergeableState::Unknown);
    }
}
