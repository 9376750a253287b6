//! Shared library for the anime search workspace.
//!
//! This crate provides common functionality used by the search library and
//! its terminal frontend:
//! - Configuration management
//! - Logging infrastructure
//! - Internal anime record shapes

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
