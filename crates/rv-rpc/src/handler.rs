//! Dispatches one JSON-RPC method call against the Store, the remote,
//! and the plugin/comment capabilities. Handlers only read the Store
//! and optionally call the remote; none of them touch the
//! reconciliation pipeline, so RPC never blocks a cycle.

use crate::render::{parse_and_render, PrMetadata};
use crate::protocol::param;
use log::warn;
use rv_comments::{DraftStore, Submitter};
use rv_config::AppConfig;
use rv_plugin::PluginRunner;
use rv_remote::{PullRequest, RemoteRepo, ReviewEvent};
use rv_store::{PrKey, Store};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

pub struct RpcHandler {
    pub remote: Arc<dyn RemoteRepo>,
    pub store: Store,
    pub drafts: DraftStore,
    pub plugins: PluginRunner,
    pub repo_location: PathBuf,
}

impl RpcHandler {
    pub fn new(remote: Arc<dyn RemoteRepo>, store: Store, plugins: PluginRunner, config: &AppConfig) -> Self {
        Self {
            remote,
            drafts: DraftStore::new(store.clone()),
            store,
            plugins,
            repo_location: PathBuf::from(config.repo_location.clone()),
        }
    }

    pub async fn dispatch(&self, method: &str, params: &[Value]) -> Result<Value, String> {
        match method {
            "Hello" => self.hello(),
            "GetAllReviews" => self.get_all_reviews().await,
            "GetPR" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "SyncPR" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                self.get_pr(&owner, &repo, number, true).await
            }
            "AddComment" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                let filename: String = param(params, 3)?;
                let position: u32 = param(params, 4)?;
                let body: Option<String> = param(params, 5)?;
                let reply_to_id: Option<i64> = param(params, 6)?;
                let key = PrKey::new(owner.clone(), repo.clone(), number);
                self.drafts
                    .add_comment(&key, &filename, position, body.as_deref(), reply_to_id)
                    .await
                    .map_err(|err| err.to_string())?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "EditComment" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                let id: i64 = param(params, 3)?;
                let body: String = param(params, 4)?;
                self.drafts.edit_comment(id, &body).await.map_err(|err| err.to_string())?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "DeleteComment" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                let id: i64 = param(params, 3)?;
                self.drafts.delete_comment(id).await.map_err(|err| err.to_string())?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "SetFeedback" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                let body: String = param(params, 3)?;
                let key = PrKey::new(owner.clone(), repo.clone(), number);
                self.drafts.set_feedback(&key, &body).await.map_err(|err| err.to_string())?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "RemovePRComments" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                let key = PrKey::new(owner.clone(), repo.clone(), number);
                self.drafts.remove_pr_comments(&key).await.map_err(|err| err.to_string())?;
                self.get_pr(&owner, &repo, number, false).await
            }
            "SubmitReview" => self.submit_review(params).await,
            "ListPlugins" => self.list_plugins(),
            "GetPluginOutput" => {
                let (owner, repo, number) = pr_coordinate(params)?;
                self.get_plugin_output(&owner, &repo, number).await
            }
            "CheckRepoExists" => self.check_repo_exists(params).await,
            other => Err(format!("unknown method: {other}")),
        }
    }

    fn hello(&self) -> Result<Value, String> {
        Ok(json!({
            "name": "rv",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    async fn get_all_reviews(&self) -> Result<Value, String> {
        let sections = self.store.list_sections().await.map_err(|err| err.to_string())?;
        let mut payload = Vec::new();
        for section in sections {
            let items = self.store.list_items(section.id).await.map_err(|err| err.to_string())?;
            payload.push(json!({
                "name": section.name,
                "indent_level": section.indent_level,
                "items": items,
            }));
        }
        Ok(json!(payload))
    }

    async fn get_pr(&self, owner: &str, repo: &str, number: u64, force_refresh: bool) -> Result<Value, String> {
        let key = PrKey::new(owner, repo, number);

        let pr: PullRequest = self
            .remote
            .fetch_pull_request(owner, repo, number)
            .await
            .map_err(|err| err.to_string())?;

        let cached = self.store.get_pr_record(&key).await.map_err(|err| err.to_string())?;
        let cache_is_fresh = !force_refresh
            && cached
                .as_ref()
                .map(|record| record.latest_sha == pr.head_sha)
                .unwrap_or(false);

        let diff = if cache_is_fresh {
            self.store.get_diff_blob(&key).await.map_err(|err| err.to_string())?
        } else {
            None
        };
        let diff = match diff {
            Some(diff) => Some(diff),
            None => match self.remote.fetch_pull_request_diff(owner, repo, number).await {
                Ok(diff) => Some(diff),
                Err(err) => {
                    warn!("failed to fetch diff for {owner}/{repo}#{number}: {err}");
                    None
                }
            },
        };

        let comments = if cache_is_fresh {
            self.store
                .get_comments_blob(&key)
                .await
                .map_err(|err| err.to_string())?
                .and_then(|blob| serde_json::from_str(&blob).ok())
        } else {
            None
        };
        let comments = match comments {
            Some(comments) => comments,
            None => self.remote.fetch_review_comments(owner, repo, number).await.unwrap_or_else(|err| {
                warn!("failed to fetch review comments for {owner}/{repo}#{number}: {err}");
                Vec::new()
            }),
        };

        if !cache_is_fresh {
            if let Err(err) = self.store.put_pr_record(&key, &pr.head_sha, pr.body.as_deref().unwrap_or("")).await {
                warn!("failed to cache PR record for {owner}/{repo}#{number}: {err}");
            }
            if let Some(diff) = &diff {
                if let Err(err) = self.store.put_diff_blob(&key, diff).await {
                    warn!("failed to cache diff for {owner}/{repo}#{number}: {err}");
                }
            }
            if let Ok(blob) = serde_json::to_string(&comments) {
                if let Err(err) = self.store.put_comments_blob(&key, &blob).await {
                    warn!("failed to cache comments for {owner}/{repo}#{number}: {err}");
                }
            }
        }

        let (content, classified, reviews) = parse_and_render(diff.as_deref().unwrap_or(""), &comments);
        let metadata = PrMetadata::new(owner, repo, &pr);

        Ok(json!({
            "okay": true,
            "content": content,
            "metadata": metadata,
            "diff": diff,
            "comments": classified,
            "reviews": reviews,
        }))
    }

    async fn submit_review(&self, params: &[Value]) -> Result<Value, String> {
        let (owner, repo, number) = pr_coordinate(params)?;
        let event: ReviewEvent = param(params, 3)?;
        let body: Option<String> = param(params, 4)?;
        let key = PrKey::new(owner.clone(), repo.clone(), number);

        let submitter = Submitter { remote: self.remote.as_ref(), store: &self.store };
        submitter
            .submit_review(&key, event, body.as_deref())
            .await
            .map_err(|err| err.to_string())?;

        self.get_pr(&owner, &repo, number, true).await
    }

    fn list_plugins(&self) -> Result<Value, String> {
        Ok(json!(self.plugins.list_plugins()))
    }

    async fn get_plugin_output(&self, owner: &str, repo: &str, number: u64) -> Result<Value, String> {
        let key = PrKey::new(owner, repo, number);
        let results = self.plugins.get_plugin_output(&key).await.map_err(|err| err.to_string())?;
        Ok(json!(results))
    }

    async fn check_repo_exists(&self, params: &[Value]) -> Result<Value, String> {
        let repo: String = param(params, 0)?;
        let path = self.repo_location.join(&repo);
        let exists = tokio::fs::metadata(&path).await.map(|meta| meta.is_dir()).unwrap_or(false);
        Ok(json!(exists))
    }
}

fn pr_coordinate(params: &[Value]) -> Result<(String, String, u64), String> {
    let owner: String = param(params, 0)?;
    let repo: String = param(params, 1)?;
    let number: u64 = param(params, 2)?;
    Ok((owner, repo, number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rv_remote::{CiStatus, NewReviewComment, PullRequestState, ReviewComment};
    use std::sync::Mutex;

    struct FakeRemote {
        pr: PullRequest,
        diff: String,
        comments: Vec<ReviewComment>,
        created: Mutex<Option<(ReviewEvent, Option<String>, Vec<NewReviewComment>)>>,
    }

    fn sample_pr() -> PullRequest {
        PullRequest {
            number: 7,
            title: "Fix the thing".to_string(),
            body: Some("description".to_string()),
            author: "alice".to_string(),
            draft: false,
            labels: vec![],
            comments: 0,
            head_sha: "sha1".to_string(),
            base_branch: "main".to_string(),
            head_branch: "fix".to_string(),
            mergeable: Some(true),
            mergeable_state: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            html_url: String::new(),
            additions: 1,
            deletions: 1,
        }
    }

    #[async_trait]
    impl RemoteRepo for FakeRemote {
        async fn list_pull_requests(&self, _: &str, _: &str, _: PullRequestState) -> anyhow::Result<Vec<PullRequest>> {
            Ok(vec![])
        }
        async fn fetch_pull_request(&self, _: &str, _: &str, _: u64) -> anyhow::Result<PullRequest> {
            Ok(self.pr.clone())
        }
        async fn fetch_pull_request_diff(&self, _: &str, _: &str, _: u64) -> anyhow::Result<String> {
            Ok(self.diff.clone())
        }
        async fn fetch_review_comments(&self, _: &str, _: &str, _: u64) -> anyhow::Result<Vec<ReviewComment>> {
            Ok(self.comments.clone())
        }
        async fn fetch_requested_reviewers(&self, _: &str, _: &str, _: u64) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn fetch_ci_status(&self, _: &str, _: &str, _: &str) -> anyhow::Result<CiStatus> {
            unimplemented!()
        }
        async fn fetch_team_members(&self, _: &str, _: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec![])
        }
        async fn fetch_viewer_login(&self) -> anyhow::Result<String> {
            Ok("me".to_string())
        }
        async fn reply_to_review_comment(&self, _: &str, _: &str, _: u64, _: u64, _: &str) -> anyhow::Result<u64> {
            Ok(1)
        }
        async fn create_review(
            &self,
            _: &str,
            _: &str,
            _: u64,
            event: ReviewEvent,
            body: Option<&str>,
            comments: &[NewReviewComment],
        ) -> anyhow::Result<()> {
            *self.created.lock().unwrap() = Some((event, body.map(str::to_string), comments.to_vec()));
            Ok(())
        }
    }

    fn handler(remote: FakeRemote) -> RpcHandler {
        let store = Store::open_in_memory().unwrap();
        let config = AppConfig::default();
        RpcHandler::new(Arc::new(remote), store, PluginRunner::new(Store::open_in_memory().unwrap(), vec![]), &config)
    }

    #[tokio::test]
    async fn hello_reports_a_name_and_version() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: String::new(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let result = h.dispatch("Hello", &[]).await.unwrap();
        assert_eq!(result["name"], "rv");
    }

    #[tokio::test]
    async fn get_pr_refetches_on_a_cold_cache_then_serves_from_it() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: "diff --git a/f.rs b/f.rs\n--- a/f.rs\n+++ b/f.rs\n@@ -1 +1 @@\n-old\n+new\n".to_string(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let params = vec![json!("acme"), json!("widgets"), json!(7)];
        let result = h.dispatch("GetPR", &params).await.unwrap();
        assert_eq!(result["metadata"]["number"], 7);
        assert!(result["content"].as_str().unwrap().contains("+new"));

        let key = PrKey::new("acme", "widgets", 7);
        assert!(h.store.get_diff_blob(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn add_comment_round_trips_through_the_draft_store() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: String::new(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let params = vec![
            json!("acme"),
            json!("widgets"),
            json!(7),
            json!("a.rs"),
            json!(3u32),
            json!("nit"),
            json!(null),
        ];
        let result = h.dispatch("AddComment", &params).await.unwrap();
        assert_eq!(result["okay"], true);

        let key = PrKey::new("acme", "widgets", 7);
        assert_eq!(h.drafts.list_comments(&key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn check_repo_exists_reports_false_for_a_missing_directory() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: String::new(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let result = h.dispatch("CheckRepoExists", &[json!("definitely-not-here")]).await.unwrap();
        assert_eq!(result, json!(false));
    }

    #[tokio::test]
    async fn submit_review_clears_drafts_and_refreshes_the_pr() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: String::new(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let key = PrKey::new("acme", "widgets", 7);
        h.drafts.add_comment(&key, "a.rs", 3, Some("nit"), None).await.unwrap();

        let params = vec![json!("acme"), json!("widgets"), json!(7), json!("APPROVE"), json!(null)];
        let result = h.dispatch("SubmitReview", &params).await.unwrap();
        assert_eq!(result["okay"], true);
        assert!(h.drafts.list_comments(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_method_is_a_clean_error() {
        let h = handler(FakeRemote {
            pr: sample_pr(),
            diff: String::new(),
            comments: vec![],
            created: Mutex::new(None),
        });
        let err = h.dispatch("DoSomethingWeird", &[]).await.unwrap_err();
        assert!(err.contains("unknown method"));
    }
}
