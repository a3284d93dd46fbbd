//! hnvec Common Library
//!
//! Shared plumbing for the hnvec workspace members.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **Environment**: lenient parsing of boolean and positive-integer settings
//!
//! # Example
//!
//! ```no_run
//! use hnvec_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod env;
pub mod logging;

pub use env::{env_string, parse_bool, parse_positive};
