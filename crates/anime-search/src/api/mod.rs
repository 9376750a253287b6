//! Jikan API v4 client implementation.
//!
//! This module provides a paced, cancellable client for the Jikan API
//! (MyAnimeList unofficial API). It never retries on its own: every failure
//! is reported to the caller as a [`CatalogError`].

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod types;

pub use client::JikanClient;
pub use error::CatalogError;
pub use rate_limiter::RateLimiter;
