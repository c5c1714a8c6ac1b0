//! Common utilities and shared types for crossfed.
//!
//! This crate provides foundational components used across all crossfed
//! crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **URL helpers**: Domain extraction and origin comparison used by
//!   self-loop and blocklist checks

pub mod config;
pub mod error;
pub mod util;

pub use config::{BridgeConfig, Config, DatabaseConfig, FederationConfig, RedisConfig};
pub use error::{AppError, AppResult};
