//! Third-party analyzer plugin execution and output caching.

pub mod runner;

pub use runner::{PluginInputs, PluginRunner};
