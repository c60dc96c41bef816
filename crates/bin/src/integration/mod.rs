//! Data acquisition and storage plumbing for the CLI.

pub(crate) mod data_pipeline;
pub(crate) mod store_manager;
