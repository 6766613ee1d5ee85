//! Local comment drafting and review submission.

pub mod draft_store;
pub mod submitter;

pub use draft_store::DraftStore;
pub use submitter::{SubmitError, SubmitOutcome, Submitter};
