//! Configuration schema and loading for the review workstation.
//!
//! This crate only defines the TOML schema and the `load()`/
//! `load_from_str()` entry points; watching the file for changes and
//! any editor-facing config UI are external collaborators.

pub mod app_config;
pub mod config_file;
pub mod paths;
pub mod workflow_config;

pub use app_config::AppConfig;
pub use config_file::load_config_file;
pub use workflow_config::{PluginConfig, PrunePolicy, WorkflowConfig, WorkflowKind};
