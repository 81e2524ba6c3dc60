//! Error types for redis_prefix
//!
//! This module defines the single error type for the crate using `thiserror`.
//! Every fallible operation returns `Result<T, PrefixError>`.
//!
//! # Error Variants
//!
//! - [`PrefixError::EmptyDelimiter`]: `with_delimiter("")` was applied
//! - [`PrefixError::EmptyPrefix`]: `with_prefix("")` was applied
//! - [`PrefixError::Nil`]: the requested key does not exist
//! - [`PrefixError::Command`]: the server rejected a command
//! - [`PrefixError::Connection`]: the transport could not be reached
//! - [`PrefixError::Protocol`]: a reply had an unexpected shape
//!
//! Configuration errors are raised while a [`PrefixHook`](crate::PrefixHook)
//! is built. The remaining variants come from the transport and pass through
//! the hook untouched.
//!
//! # Example
//!
//! ```rust
//! use redis_prefix::error::PrefixError;
//! use redis_prefix::options::{with_delimiter, HookOptions};
//!
//! let mut options = HookOptions::new("TestFoo");
//! let err = with_delimiter("").apply(&mut options).unwrap_err();
//! assert_eq!(err, PrefixError::EmptyDelimiter);
//! ```

use thiserror::Error;

/// The main error type for all redis_prefix operations
///
/// The type is `Clone` so a command can keep its own copy of the error it
/// failed with, while the same error is returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrefixError {
    /// An empty delimiter was supplied through `with_delimiter`
    #[error("WithDelimiter: cannot be empty")]
    EmptyDelimiter,

    /// An empty prefix was supplied through `with_prefix`
    #[error("WithPrefix: cannot be empty")]
    EmptyPrefix,

    /// The key does not exist
    #[error("redis: nil")]
    Nil,

    /// The server rejected the command
    ///
    /// The text is the server's error line verbatim, e.g.
    /// `ERR value is not an integer or out of range`.
    #[error("{0}")]
    Command(String),

    /// The transport could not establish or use its connection
    #[error("connection failed: {0}")]
    Connection(String),

    /// A reply did not have the shape the caller asked for
    #[error("unexpected reply: {0}")]
    Protocol(String),
}

impl PrefixError {
    /// Whether this error was raised while validating hook options
    pub fn is_config(&self) -> bool {
        matches!(self, PrefixError::EmptyDelimiter | PrefixError::EmptyPrefix)
    }
}
