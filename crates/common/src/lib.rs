//! Shared types, config, and error definitions for the weather oracle core.

pub mod config;
pub mod error;
pub mod types;

pub use config::OracleConfig;
pub use error::{Error, SourceFailure};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
