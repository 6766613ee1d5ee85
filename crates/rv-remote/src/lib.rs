//! Remote code-hosting client
//!
//! This crate provides a trait-based client (`RemoteRepo`) for talking
//! to a code-hosting platform. It is the workstation's only external
//! network boundary — every other crate depends on the trait, never on
//! `octocrab` directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use rv_remote::{OctocrabClient, RemoteRepo, PullRequestState};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let octocrab = octocrab::Octocrab::builder()
//!     .personal_token("token".to_string())
//!     .build()?;
//!
//! let client = OctocrabClient::new(Arc::new(octocrab));
//! let prs = client
//!     .list_pull_requests("owner", "repo", PullRequestState::Open)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod client_manager;
pub mod octocrab_client;
pub mod types;

/// Default host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use client::RemoteRepo;
pub use client_manager::{ClientManager, TokenResolver};
pub use octocrab_client::OctocrabClient;
pub use types::{
    CiState, CiStatus, MergeableState, NewReviewComment, PullRequest, PullRequestState,
    ReviewComment, ReviewEvent,
};

// Re-export octocrab so consumers don't need to depend on it directly
pub use octocrab;

/// Re-exported octocrab types for convenience
pub mod octocrab_types {
    pub use octocrab::models;
    pub use octocrab::params;
    pub use octocrab::Octocrab;
}
