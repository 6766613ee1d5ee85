//! The review workstation's embedded Store.
//!
//! Holds sections, items, cached PR/comment/reviewer/CI blobs, local
//! comment drafts, feedback, worktree records, and plugin
//! configs/results, backed by a single SQLite file. Table ownership
//! follows the data model's lifecycle rules: sections/items are
//! reconciler-owned, blobs are written by any fetching handler,
//! local_comments/feedback are client (RPC) owned, and worktrees are
//! owned exclusively by the worktree manager.

pub mod error;
pub mod migrations;
pub mod model;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{
    Feedback, Item, LocalComment, NewItem, PluginResult, PluginStatus, PrKey, PrRecord, Section,
    Worktree,
};
pub use store::Store;
