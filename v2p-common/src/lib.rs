//! # v2p Common Library
//!
//! Shared code for the v2p workspace:
//! - Data models (performances, artists, tracks, exclusion audit records)
//! - Common error type
//! - Configuration loading (ENV -> TOML)
//! - Rate limiting for external API clients

pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;

pub use error::{Error, Result};
