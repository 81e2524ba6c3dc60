//! Hook trait and dispatch chain.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::error::PrefixError;
use crate::hooks::DispatchContext;
use crate::transport::Transport;

/// Interception point registered with a [`Client`](crate::client::Client)
///
/// Each method receives the remainder of the chain as [`Next`]. A hook
/// decides what happens before and after it hands the call on. Every method
/// defaults to a plain pass-through, so a hook only overrides the stages it
/// cares about.
///
/// # Example
///
/// ```
/// use redis_prefix::prelude::*;
/// use async_trait::async_trait;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingHook {
///     seen: AtomicUsize,
/// }
///
/// #[async_trait]
/// impl Hook for CountingHook {
///     async fn process(
///         &self,
///         ctx: &DispatchContext,
///         cmd: &mut Command,
///         next: Next<'_>,
///     ) -> Result<(), PrefixError> {
///         self.seen.fetch_add(1, Ordering::Relaxed);
///         next.process(ctx, cmd).await
///     }
/// }
/// ```
#[async_trait]
pub trait Hook: Send + Sync {
    /// Intercept connection establishment
    async fn dial(&self, ctx: &DispatchContext, next: Next<'_>) -> Result<(), PrefixError> {
        next.dial(ctx).await
    }

    /// Intercept a single command
    async fn process(
        &self,
        ctx: &DispatchContext,
        cmd: &mut Command,
        next: Next<'_>,
    ) -> Result<(), PrefixError> {
        next.process(ctx, cmd).await
    }

    /// Intercept a batch of commands sent together
    async fn process_pipeline(
        &self,
        ctx: &DispatchContext,
        cmds: &mut [Command],
        next: Next<'_>,
    ) -> Result<(), PrefixError> {
        next.process_pipeline(ctx, cmds).await
    }
}

/// The rest of the dispatch chain: the hooks that have not run yet, then the
/// transport
#[derive(Clone, Copy)]
pub struct Next<'a> {
    hooks: &'a [Arc<dyn Hook>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    /// Chain that runs `hooks` in order and ends at `transport`
    pub fn new(hooks: &'a [Arc<dyn Hook>], transport: &'a dyn Transport) -> Self {
        Self { hooks, transport }
    }

    /// Number of hooks still ahead of the transport
    pub fn remaining(&self) -> usize {
        self.hooks.len()
    }

    /// Pass connection establishment on
    pub async fn dial(self, ctx: &DispatchContext) -> Result<(), PrefixError> {
        match self.hooks.split_first() {
            Some((hook, rest)) => hook.dial(ctx, Next::new(rest, self.transport)).await,
            None => self.transport.dial(ctx).await,
        }
    }

    /// Pass a single command on
    pub async fn process(self, ctx: &DispatchContext, cmd: &mut Command) -> Result<(), PrefixError> {
        match self.hooks.split_first() {
            Some((hook, rest)) => hook.process(ctx, cmd, Next::new(rest, self.transport)).await,
            None => self.transport.process(ctx, cmd).await,
        }
    }

    /// Pass a batch on
    pub async fn process_pipeline(
        self,
        ctx: &DispatchContext,
        cmds: &mut [Command],
    ) -> Result<(), PrefixError> {
        match self.hooks.split_first() {
            Some((hook, rest)) => {
                hook.process_pipeline(ctx, cmds, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.process_pipeline(ctx, cmds).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.hooks.len())
            .finish_non_exhaustive()
    }
}
