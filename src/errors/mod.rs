//! Centralized error handling for epg-unifier
//!
//! Both batch jobs surface failures through [`AppError`]. Every variant is
//! fatal for the run that produced it; the binary maps each category onto its
//! own process exit code.
//!
//! # Error Categories
//!
//! - **Configuration**: missing credentials, unreadable config file
//! - **Fetch**: network failures, timeouts and non-2xx responses
//! - **Parse**: malformed XML, undecodable gzip, invalid UTF-8
//! - **GuideNotFound**: the unified guide is missing when the gap finder starts
//! - **Io**: local file system failures
//!
//! # Usage
//!
//! ```rust
//! use epg_unifier::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("USERNAME is not set"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
