//! Transport abstraction at the end of the dispatch chain
//!
//! This module provides the `Transport` trait: whatever actually executes
//! commands once every hook has run. The hooks in this crate never look
//! inside a transport; they only hand it commands and return what it returns.
//!
//! # Default Implementation
//!
//! [`MemoryConnection`] executes a small set of Redis commands against a
//! shared in-memory [`MemoryStore`]. It exists to verify hooks without a
//! server, the same role a fake server plays in other test suites.
//!
//! # Custom Transports
//!
//! Implement `Transport` to plug in a real client, a recording fake, or a
//! transport that injects failures.
//!
//! # Example
//!
//! ```
//! use redis_prefix::prelude::*;
//!
//! # async fn example() -> Result<(), PrefixError> {
//! let store = MemoryStore::new();
//! let conn = store.connection();
//! let ctx = DispatchContext::default();
//!
//! conn.dial(&ctx).await?;
//!
//! let mut cmd = Command::new("set").arg("k").arg("v");
//! conn.process(&ctx, &mut cmd).await?;
//! assert_eq!(cmd.to_string(), "set k v: OK");
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::command::Command;
use crate::error::PrefixError;
use crate::hooks::DispatchContext;

mod memory;

pub use memory::{MemoryConnection, MemoryStore};

/// Executes commands at the end of a dispatch chain
///
/// # Thread Safety
///
/// All methods take `&self` and may be called from many tasks at once.
/// Implementations handle their own synchronization.
///
/// # Replies
///
/// [`process`](Transport::process) stores the outcome on the command itself
/// (see [`Command::set_reply`] and [`Command::set_error`]) and also returns
/// the command's error, so callers can use either.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection
    ///
    /// # Errors
    ///
    /// - [`PrefixError::Connection`] if the store cannot be reached
    async fn dial(&self, ctx: &DispatchContext) -> Result<(), PrefixError>;

    /// Execute one command and record its reply
    ///
    /// # Errors
    ///
    /// The command's own error, e.g. [`PrefixError::Command`] when the store
    /// rejects it.
    async fn process(&self, ctx: &DispatchContext, cmd: &mut Command) -> Result<(), PrefixError>;

    /// Execute a batch in order
    ///
    /// The default runs [`process`](Transport::process) for every command,
    /// keeps going after failures and returns the first error.
    async fn process_pipeline(
        &self,
        ctx: &DispatchContext,
        cmds: &mut [Command],
    ) -> Result<(), PrefixError> {
        let mut first_err = None;
        for cmd in cmds.iter_mut() {
            if let Err(err) = self.process(ctx, cmd).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
