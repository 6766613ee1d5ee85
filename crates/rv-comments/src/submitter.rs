//! `SubmitReview`: partitions drafts into threaded replies and
//! top-level comments, posts replies individually, then bundles the
//! top-levels into a single review creation.
//!
//! Resolves the reply-to-id ambiguity by restricting `reply_to_id` to
//! published remote comment ids only — a draft can't reply to another
//! unsubmitted draft. A `LocalComment` with a `reply_to_id` that isn't
//! a valid remote id simply fails to post as a reply (collected in
//! `failed_replies`, per the "failures don't abort" rule) rather than
//! being treated as ambiguous.

use log::warn;
use rv_remote::{NewReviewComment, RemoteRepo, ReviewEvent};
use rv_store::{PrKey, Store};

pub struct Submitter<'a> {
    pub remote: &'a dyn RemoteRepo,
    pub store: &'a Store,
}

/// The result of a `SubmitReview` call that reached the review-create
/// step (whether or not every reply posted).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub posted_replies: u32,
    pub failed_replies: Vec<(i64, String)>,
}

/// The only non-atomic failure boundary: some replies may already be
/// on the remote, but the bundled review was never created. Drafts are
/// preserved so the caller can retry.
#[derive(Debug)]
pub struct SubmitError {
    pub posted_replies: u32,
    pub failed_replies: Vec<(i64, String)>,
    pub review_error: String,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "review creation failed after {} repl{} posted: {}",
            self.posted_replies,
            if self.posted_replies == 1 { "y" } else { "ies" },
            self.review_error
        )
    }
}

impl std::error::Error for SubmitError {}

impl<'a> Submitter<'a> {
    pub async fn submit_review(
        &self,
        key: &PrKey,
        event: ReviewEvent,
        body: Option<&str>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let drafts = self.store.list_comments(key).await.map_err(|err| SubmitError {
            posted_replies: 0,
            failed_replies: Vec::new(),
            review_error: err.to_string(),
        })?;

        let (replies, top_levels): (Vec<_>, Vec<_>) =
            drafts.into_iter().partition(|draft| draft.reply_to_id.is_some());

        let mut posted_replies = 0u32;
        let mut failed_replies = Vec::new();
        for reply in &replies {
            let outcome = self.post_reply(key, reply).await;
            match outcome {
                Ok(()) => posted_replies += 1,
                Err(reason) => {
                    warn!("failed to post reply draft {}: {reason}", reply.id);
                    failed_replies.push((reply.id, reason));
                }
            }
        }

        let feedback = match self.store.get_feedback(key).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!("failed to read stored feedback for {}/{}#{}: {err}", key.owner, key.repo, key.number);
                None
            }
        };
        let review_body = body.map(str::to_string).or(feedback);

        let new_comments: Vec<NewReviewComment> = top_levels
            .iter()
            .map(|draft| NewReviewComment {
                path: draft.filename.clone(),
                position: draft.position,
                body: draft.body.clone().unwrap_or_default(),
            })
            .collect();

        match self
            .remote
            .create_review(&key.owner, &key.repo, key.number, event, review_body.as_deref(), &new_comments)
            .await
        {
            Ok(()) => {
                if let Err(err) = self.store.remove_pr_comments(key).await {
                    warn!("failed to clear drafts after successful submit: {err}");
                }
                if let Err(err) = self.store.clear_feedback(key).await {
                    warn!("failed to clear feedback after successful submit: {err}");
                }
                Ok(SubmitOutcome {
                    posted_replies,
                    failed_replies,
                })
            }
            Err(err) => Err(SubmitError {
                posted_replies,
                failed_replies,
                review_error: err.to_string(),
            }),
        }
    }

    async fn post_reply(&self, key: &PrKey, reply: &rv_store::LocalComment) -> Result<(), String> {
        let in_reply_to = reply
            .reply_to_id
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| format!("draft {} has no valid remote reply target", reply.id))?;
        let body = reply.body.clone().unwrap_or_default();
        self.remote
            .reply_to_review_comment(&key.owner, &key.repo, key.number, in_reply_to, &body)
            .await
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rv_remote::{CiStatus, PullRequest, PullRequestState, ReviewComment};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRemote {
        review_should_fail: bool,
        created: Mutex<Option<(ReviewEvent, Option<String>, Vec<NewReviewComment>)>>,
        replies: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl RemoteRepo for FakeRemote {
        async fn list_pull_requests(&self, _: &str, _: &str, _: PullRequestState) -> anyhow::Result<Vec<PullRequest>> {
            Ok(vec![])
        }
        async fn fetch_pull_request(&self, _: &str, _: &str, _: u64) -> anyhow::Result<PullRequest> {
            unimplemented!()
        }
        async fn fetch_pull_request_diff(&self, _: &str, _: &str, _: u64) -> anyhow::Result<String> {
            Ok(String::new())
        }
        async fn fetch_review_comments(&self, _: &str, _: &str, _: u64) -> anyhow::Result<Vec<ReviewComment>> {
            Ok(vec![])
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
        async fn reply_to_review_comment(&self, _: &str, _: &str, _: u64, in_reply_to: u64, _: &str) -> anyhow::Result<u64> {
            self.replies.lock().unwrap().push(in_reply_to);
            Ok(999)
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
            if self.review_should_fail {
                anyhow::bail!("simulated failure");
            }
            *self.created.lock().unwrap() = Some((event, body.map(str::to_string), comments.to_vec()));
            Ok(())
        }
    }

    fn key() -> PrKey {
        PrKey::new("acme", "widgets", 7)
    }

    #[tokio::test]
    async fn successful_submit_clears_drafts_and_feedback() {
        let store = Store::open_in_memory().unwrap();
        let key = key();
        store.add_comment(&key, "a.rs", 3, Some("nit"), None).await.unwrap();
        store.set_feedback(&key, "looks good").await.unwrap();

        let remote = FakeRemote::default();
        let submitter = Submitter { remote: &remote, store: &store };

        let outcome = submitter.submit_review(&key, ReviewEvent::Approve, None).await.unwrap();
        assert_eq!(outcome.posted_replies, 0);
        assert!(outcome.failed_replies.is_empty());

        assert!(store.list_comments(&key).await.unwrap().is_empty());
        assert!(store.get_feedback(&key).await.unwrap().is_none());

        let created = remote.created.lock().unwrap();
        let (event, body, comments) = created.as_ref().unwrap();
        assert_eq!(*event, ReviewEvent::Approve);
        assert_eq!(body.as_deref(), Some("looks good"));
        assert_eq!(comments.len(), 1);
    }

    #[tokio::test]
    async fn reply_drafts_post_individually_before_the_review() {
        let store = Store::open_in_memory().unwrap();
        let key = key();
        store.add_comment(&key, "a.rs", 3, Some("done"), Some(42)).await.unwrap();
        store.add_comment(&key, "b.rs", 5, Some("top level"), None).await.unwrap();

        let remote = FakeRemote::default();
        let submitter = Submitter { remote: &remote, store: &store };

        let outcome = submitter.submit_review(&key, ReviewEvent::Comment, None).await.unwrap();
        assert_eq!(outcome.posted_replies, 1);
        assert_eq!(*remote.replies.lock().unwrap(), vec![42]);

        let created = remote.created.lock().unwrap();
        let (_, _, comments) = created.as_ref().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].path, "b.rs");
    }

    #[tokio::test]
    async fn partial_failure_preserves_drafts() {
        let store = Store::open_in_memory().unwrap();
        let key = key();
        store.add_comment(&key, "a.rs", 3, Some("nit"), None).await.unwrap();

        let remote = FakeRemote { review_should_fail: true, ..Default::default() };
        let submitter = Submitter { remote: &remote, store: &store };

        let err = submitter.submit_review(&key, ReviewEvent::Comment, None).await.unwrap_err();
        assert!(err.review_error.contains("simulated failure"));

        assert_eq!(store.list_comments(&key).await.unwrap().len(), 1);
    }
}
