//! redis_prefix - per-test key namespacing for a hook-chained Redis client
//!
//! Parallel tests that share one store trample each other's keys. This crate
//! provides a hook that rewrites every command's key to
//! `prefix + delimiter + key` while the command is in flight, using the
//! running test's name as the prefix, and puts the original key back once the
//! call returns.
//!
//! # Overview
//!
//! - Single commands and pipelines are both intercepted
//! - Keys are restored on every exit path, including errors, panics and
//!   cancelled futures
//! - Which arguments are keys is pluggable (argument 1 by default)
//! - `#[prefix_test]` hands each test a [`TestName`] to build the hook from
//!
//! # Architecture
//!
//! - `hooks`: The `Hook` trait, the dispatch chain and `PrefixHook`
//! - `options`: Functional options for configuring a `PrefixHook`
//! - `key`: Locating key arguments within a command
//! - `scope`: Test identity and failure reporting
//! - `client`: A client that runs commands through its hooks
//! - `transport`: The end of the chain, plus an in-memory store
//! - `error`: Error types
//!
//! # Example
//!
//! ```
//! use redis_prefix::prelude::*;
//!
//! # async fn example() -> Result<(), PrefixError> {
//! let store = MemoryStore::new();
//! let mut client = Client::new(store.connection());
//! client.add_hook(PrefixHook::new(TestName::new("balance_is_isolated")));
//!
//! client.set("user:1:balance", "150").await?;
//! assert_eq!(client.get("user:1:balance").await?, "150");
//! assert_eq!(
//!     store.keys().await,
//!     vec!["balance_is_isolated:user:1:balance"]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! In a test, `#[prefix_test]` supplies the [`TestName`]:
//!
//! ```ignore
//! #[prefix_test]
//! async fn balance_is_isolated(t: TestName) {
//!     let mut client = Client::new(MemoryStore::new().connection());
//!     client.add_hook(PrefixHook::new(&t));
//! }
//! ```
//!
//! # License
//!
//! Licensed under MIT. See LICENSE file for details.

#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate self as redis_prefix;

pub use redis_prefix_macros::prefix_test;

pub mod client;
pub mod command;
pub mod error;
pub mod hooks;
pub mod key;
pub mod options;
pub mod scope;
pub mod transport;

pub use client::{Client, Pipeline};
pub use command::{Arg, Command, Value};
pub use error::PrefixError;
pub use hooks::PrefixHook;
pub use scope::{TestName, TestScope};

/// Prelude module for convenient imports
pub mod prelude {
    //! Common imports for redis_prefix users
    //!
    //! Use `use redis_prefix::prelude::*;` to import commonly used types.

    pub use crate::client::{Client, Pipeline};
    pub use crate::command::{Arg, Command, Value};
    pub use crate::error::PrefixError;
    pub use crate::hooks::{DispatchContext, Hook, Next, PrefixHook};
    pub use crate::key::{CommandKeys, KeyLocator, KeySpec, SecondArgument};
    pub use crate::options::{
        with_delimiter, with_key_locator, with_options, with_prefix, with_unique_suffix,
        HookOption, HookOptions, DEFAULT_DELIMITER,
    };
    pub use crate::prefix_test;
    pub use crate::scope::{TestName, TestScope};
    pub use crate::transport::{MemoryConnection, MemoryStore, Transport};
}
