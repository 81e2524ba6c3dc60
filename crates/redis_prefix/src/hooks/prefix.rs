//! The key-prefixing hook.

use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

use crate::command::Command;
use crate::error::PrefixError;
use crate::hooks::{DispatchContext, Hook, Next};
use crate::key::KeyLocator;
use crate::options::{with_options, HookOption, HookOptions};
use crate::scope::TestScope;

/// Hook that namespaces every key with the name of the test it was built in
///
/// While a command is in flight, each key argument reads
/// `prefix + delimiter + key`; once the call returns the original key is put
/// back, so callers never see the rewritten command. Which arguments are keys
/// is decided by the configured [`KeyLocator`], by default argument 1.
/// Commands whose key position is missing or not a string pass through
/// untouched.
///
/// # Example
///
/// ```
/// use redis_prefix::prelude::*;
///
/// # async fn example() -> Result<(), PrefixError> {
/// let store = MemoryStore::new();
/// let mut client = Client::new(store.connection());
/// client.add_hook(PrefixHook::new("TestFoo"));
///
/// client.set("user:1", "150").await?;
/// assert_eq!(client.get("user:1").await?, "150");
/// assert_eq!(store.get("TestFoo:user:1").await.as_deref(), Some("150"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PrefixHook {
    prefix: String,
    delimiter: String,
    locator: Arc<dyn KeyLocator>,
}

impl PrefixHook {
    /// Build a hook prefixing keys with `scope`'s name and `":"`
    pub fn new(scope: impl TestScope) -> Self {
        Self::new_with(scope, Vec::new())
    }

    /// Build a hook from `scope`'s name and the given options
    ///
    /// An invalid option is reported to [`TestScope::fatal`], which stops the
    /// test; no hook is returned in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use redis_prefix::prelude::*;
    ///
    /// let hook = PrefixHook::new_with("TestFoo", [with_delimiter("|")]);
    /// assert_eq!(hook.namespaced("user:1:balance"), "TestFoo|user:1:balance");
    /// ```
    pub fn new_with(scope: impl TestScope, opts: impl IntoIterator<Item = HookOption>) -> Self {
        match Self::try_new(scope.name(), opts) {
            Ok(hook) => hook,
            Err(err) => scope.fatal(err),
        }
    }

    /// Build a hook, returning configuration errors instead of reporting them
    ///
    /// # Errors
    ///
    /// The first error raised by `opts`, unchanged.
    pub fn try_new(
        prefix: impl Into<String>,
        opts: impl IntoIterator<Item = HookOption>,
    ) -> Result<Self, PrefixError> {
        let mut options = HookOptions::new(prefix);
        with_options(opts).apply(&mut options)?;
        Ok(Self::from_options(options))
    }

    fn from_options(options: HookOptions) -> Self {
        Self {
            prefix: options.prefix,
            delimiter: options.delimiter,
            locator: options.locator,
        }
    }

    /// Namespace prepended to every key
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Separator between prefix and key
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The key as the store sees it while a command is in flight
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}{}{}", self.prefix, self.delimiter, key)
    }

    fn prefix_command(&self, cmd: &mut Command) -> usize {
        let positions = self.locator.key_positions(cmd.args());
        cmd.prefix_keys(&positions, &self.prefix, &self.delimiter)
    }
}

/// Something whose keys can be rewritten and later restored.
trait Rewrite {
    fn rewrite(&mut self, hook: &PrefixHook) -> usize;
    fn restore(&mut self);
}

impl Rewrite for Command {
    fn rewrite(&mut self, hook: &PrefixHook) -> usize {
        hook.prefix_command(self)
    }

    fn restore(&mut self) {
        self.restore_keys();
    }
}

impl Rewrite for [Command] {
    fn rewrite(&mut self, hook: &PrefixHook) -> usize {
        self.iter_mut().map(|cmd| hook.prefix_command(cmd)).sum()
    }

    fn restore(&mut self) {
        for cmd in self.iter_mut() {
            cmd.restore_keys();
        }
    }
}

/// Keeps keys rewritten for as long as it lives.
///
/// Dropping it restores them, which also happens when the wrapped call
/// panics or its future is dropped before completing.
struct Rewritten<'a, T: Rewrite + ?Sized> {
    target: &'a mut T,
}

impl<'a, T: Rewrite + ?Sized> Rewritten<'a, T> {
    fn new(target: &'a mut T, hook: &PrefixHook) -> Self {
        let count = target.rewrite(hook);
        trace!(prefix = %hook.prefix, count, "prefixed keys");
        Self { target }
    }
}

impl<T: Rewrite + ?Sized> Deref for Rewritten<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: Rewrite + ?Sized> DerefMut for Rewritten<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: Rewrite + ?Sized> Drop for Rewritten<'_, T> {
    fn drop(&mut self) {
        self.target.restore();
        trace!("restored keys");
    }
}

#[async_trait]
impl Hook for PrefixHook {
    /// Connections need no rewriting.
    async fn dial(&self, ctx: &DispatchContext, next: Next<'_>) -> Result<(), PrefixError> {
        next.dial(ctx).await
    }

    async fn process(
        &self,
        ctx: &DispatchContext,
        cmd: &mut Command,
        next: Next<'_>,
    ) -> Result<(), PrefixError> {
        let mut cmd = Rewritten::new(cmd, self);
        next.process(ctx, &mut *cmd).await
    }

    async fn process_pipeline(
        &self,
        ctx: &DispatchContext,
        cmds: &mut [Command],
        next: Next<'_>,
    ) -> Result<(), PrefixError> {
        let mut cmds = Rewritten::new(cmds, self);
        next.process_pipeline(ctx, &mut *cmds).await
    }
}
