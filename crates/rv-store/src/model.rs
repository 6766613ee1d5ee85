//! Domain records owned by the Store. These are the Store's own
//! shapes — independent of `rv-remote`'s DTOs and `rv-diff`'s parser
//! output, though values flow from both into here.

use serde::{Deserialize, Serialize};

/// A named bucket of Items, corresponding to one workflow's output target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub indent_level: i64,
}

/// The Store's generic reconciliation unit, typically one per PR under
/// one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub section_id: i64,
    /// Derived from the source entity; for a PR: `"<owner>/<repo>-<number>"`.
    pub identifier: String,
    pub status: String,
    pub title: String,
    pub details: Vec<String>,
    pub tags: Vec<String>,
    pub archived: bool,
    pub ttl: Option<i64>,
}

/// A value ready to be upserted as an Item, without an assigned id or
/// section (the caller's section is resolved/created by name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub identifier: String,
    pub status: String,
    pub title: String,
    pub details: Vec<String>,
    pub tags: Vec<String>,
    pub archived: bool,
    pub ttl: Option<i64>,
}

/// A PR coordinate: the key shared by most cached-blob tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PrKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}

/// Cached view of the remote PR body, keyed by `(owner, repo, number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    pub key: PrKey,
    pub latest_sha: String,
    pub body: String,
}

/// A draft (unsubmitted) inline review comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalComment {
    pub id: i64,
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub filename: String,
    pub position: u32,
    pub body: Option<String>,
    /// References a published remote comment id or another LocalComment
    /// id; see the reply-to-id design note.
    pub reply_to_id: Option<i64>,
}

/// A top-level review body accumulated alongside drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub key: PrKey,
    pub body: String,
}

/// A recorded filesystem checkout of a PR's head ref.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worktree {
    pub key: PrKey,
    pub path: String,
    pub branch: String,
}

/// The status of one plugin's execution against one PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Pending,
    Success,
    Error,
}

/// One plugin's recorded result against one PR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResult {
    pub key: PrKey,
    pub plugin_name: String,
    pub status: PluginStatus,
    pub output: String,
}
