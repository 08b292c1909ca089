//! Command modules - one file per CLI command

pub mod completions;
pub mod pin;
pub mod resolve;
pub mod upload;
