pub mod api;
pub mod config;
pub mod confirm;
pub mod error;
pub mod prompt;
pub mod workflow;
