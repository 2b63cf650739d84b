//! Common utilities and shared types for connect-rs.
//!
//! This crate provides foundational components used across all connect-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Retry**: The fetch retry policy via [`RetryPolicy`]
//!
//! # Example
//!
//! ```no_run
//! use connect_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let policy = config.sync.retry_policy();
//!     let id = IdGenerator::new().generate();
//!     println!("Generated ID: {id}, retry attempts: {}", policy.max_attempts);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod retry;

pub use config::{BackendKind, Config, DatabaseConfig, LoggingConfig, SyncConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use retry::{Backoff, RetryPolicy};
