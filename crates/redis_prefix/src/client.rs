//! Hook-chained client
//!
//! The `Client` owns a transport and an ordered list of hooks. Every call
//! builds a [`Next`] over the hooks and hands it the command; the last link
//! in the chain is the transport.
//!
//! # Architecture
//!
//! ```text
//! Client::set / get / execute        Pipeline::exec
//!            │                              │
//!            ▼                              ▼
//!      Hook::process              Hook::process_pipeline
//!            │   (registration order)       │
//!            ▼                              ▼
//!     Transport::process        Transport::process_pipeline
//! ```
//!
//! # Example
//!
//! ```
//! use redis_prefix::prelude::*;
//!
//! # async fn example() -> Result<(), PrefixError> {
//! let mut client = Client::new(MemoryStore::new().connection());
//! client.add_hook(PrefixHook::new("TestCounter"));
//! client.connect().await?;
//!
//! assert_eq!(client.incr("hits").await?, 1);
//! assert_eq!(client.incr("hits").await?, 2);
//!
//! let cmd = client.execute(vec!["get".into(), "hits".into()]).await;
//! assert_eq!(cmd.to_string(), "get hits: 2");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::command::{Arg, Command, Value};
use crate::error::PrefixError;
use crate::hooks::{DispatchContext, Hook, Next};
use crate::transport::Transport;

/// Client dispatching commands through registered hooks to a transport
///
/// Cloning shares the transport and the hooks registered so far.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    hooks: Vec<Arc<dyn Hook>>,
    ctx: DispatchContext,
}

impl Client {
    /// Create a client with no hooks
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            hooks: Vec::new(),
            ctx: DispatchContext::default(),
        }
    }

    /// Replace the context handed to hooks and the transport
    pub fn with_context(mut self, ctx: DispatchContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Register a hook
    ///
    /// Hooks run in registration order on the way in and in reverse on the
    /// way out.
    pub fn add_hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Arc::new(hook));
        debug!("Registered hook ({} total)", self.hooks.len());
    }

    /// Number of registered hooks
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn chain(&self) -> Next<'_> {
        Next::new(&self.hooks, self.transport.as_ref())
    }

    /// Dial the transport through the hook chain
    ///
    /// # Errors
    ///
    /// Whatever the chain returns, typically [`PrefixError::Connection`].
    pub async fn connect(&self) -> Result<(), PrefixError> {
        self.chain().dial(&self.ctx).await
    }

    /// Send one command through the hook chain
    ///
    /// The reply is stored on `cmd`. An error returned by the chain is
    /// recorded on `cmd` as well, unless a hook or the transport already
    /// recorded one.
    ///
    /// # Errors
    ///
    /// The command's error, if it failed.
    pub async fn process(&self, cmd: &mut Command) -> Result<(), PrefixError> {
        let result = self.chain().process(&self.ctx, cmd).await;
        if let Err(err) = &result {
            if cmd.err().is_none() {
                cmd.set_error(err.clone());
            }
        }
        result
    }

    /// Send a command built from `args` and return it with its reply
    ///
    /// Failures are recorded on the returned command rather than returned.
    pub async fn execute(&self, args: Vec<Arg>) -> Command {
        let mut cmd = Command::from_args(args);
        // process() has already recorded any error on the command.
        let _ = self.process(&mut cmd).await;
        cmd
    }

    async fn run(&self, cmd: Command) -> Result<Value, PrefixError> {
        let mut cmd = cmd;
        self.process(&mut cmd).await?;
        cmd.result().cloned()
    }

    /// `SET key value`
    ///
    /// # Errors
    ///
    /// Any error returned by the chain.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Arg>,
    ) -> Result<String, PrefixError> {
        let reply = self.run(Command::new("set").arg(key.into()).arg(value)).await?;
        text(reply)
    }

    /// `GET key`
    ///
    /// # Errors
    ///
    /// - [`PrefixError::Nil`] if the key does not exist
    /// - Any error returned by the chain
    pub async fn get(&self, key: impl Into<String>) -> Result<String, PrefixError> {
        let reply = self.run(Command::new("get").arg(key.into())).await?;
        text(reply)
    }

    /// `INCR key`
    ///
    /// # Errors
    ///
    /// Any error returned by the chain, e.g. when the value is not an integer.
    pub async fn incr(&self, key: impl Into<String>) -> Result<i64, PrefixError> {
        let reply = self.run(Command::new("incr").arg(key.into())).await?;
        int(reply)
    }

    /// `DEL key`, returning the number of keys removed
    ///
    /// # Errors
    ///
    /// Any error returned by the chain.
    pub async fn del(&self, key: impl Into<String>) -> Result<i64, PrefixError> {
        let reply = self.run(Command::new("del").arg(key.into())).await?;
        int(reply)
    }

    /// `EXISTS key`
    ///
    /// # Errors
    ///
    /// Any error returned by the chain.
    pub async fn exists(&self, key: impl Into<String>) -> Result<bool, PrefixError> {
        let reply = self.run(Command::new("exists").arg(key.into())).await?;
        Ok(int(reply)? > 0)
    }

    /// `COMMAND`, listing the operations the store supports
    ///
    /// # Errors
    ///
    /// Any error returned by the chain.
    pub async fn command(&self) -> Result<Vec<String>, PrefixError> {
        match self.run(Command::new("command")).await? {
            Value::Array(items) => items.into_iter().map(text).collect(),
            other => Err(PrefixError::Protocol(format!("expected array, got {}", other))),
        }
    }

    /// Start a batch of commands sent in one round trip
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            client: self,
            cmds: Vec::new(),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("hooks", &self.hooks.len())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

fn text(value: Value) -> Result<String, PrefixError> {
    match value {
        Value::Nil => Err(PrefixError::Nil),
        Value::Status(s) | Value::Bulk(s) => Ok(s),
        other => Err(PrefixError::Protocol(format!("expected string, got {}", other))),
    }
}

fn int(value: Value) -> Result<i64, PrefixError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(PrefixError::Protocol(format!("expected integer, got {}", other))),
    }
}

/// Commands queued for one batch dispatch
///
/// Nothing is sent until [`exec`](Pipeline::exec).
#[derive(Debug)]
pub struct Pipeline<'a> {
    client: &'a Client,
    cmds: Vec<Command>,
}

impl Pipeline<'_> {
    /// Queue an arbitrary command
    pub fn queue(&mut self, cmd: Command) -> &mut Self {
        self.cmds.push(cmd);
        self
    }

    /// Queue `SET key value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Arg>) -> &mut Self {
        self.queue(Command::new("set").arg(key.into()).arg(value))
    }

    /// Queue `GET key`
    pub fn get(&mut self, key: impl Into<String>) -> &mut Self {
        self.queue(Command::new("get").arg(key.into()))
    }

    /// Queue `INCR key`
    pub fn incr(&mut self, key: impl Into<String>) -> &mut Self {
        self.queue(Command::new("incr").arg(key.into()))
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    /// Whether nothing has been queued
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Send every queued command through the hook chain as one batch
    ///
    /// Returns the commands with their replies, in queue order. An empty
    /// pipeline is not dispatched.
    ///
    /// # Errors
    ///
    /// The first error in the batch.
    pub async fn exec(self) -> Result<Vec<Command>, PrefixError> {
        let Pipeline { client, mut cmds } = self;
        if cmds.is_empty() {
            return Ok(cmds);
        }
        client
            .chain()
            .process_pipeline(&client.ctx, &mut cmds)
            .await?;
        Ok(cmds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::PrefixHook;
    use crate::transport::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        single: AtomicUsize,
        batches: AtomicUsize,
    }

    #[async_trait]
    impl Hook for Arc<Counting> {
        async fn process(
            &self,
            ctx: &DispatchContext,
            cmd: &mut Command,
            next: Next<'_>,
        ) -> Result<(), PrefixError> {
            self.single.fetch_add(1, Ordering::SeqCst);
            next.process(ctx, cmd).await
        }

        async fn process_pipeline(
            &self,
            ctx: &DispatchContext,
            cmds: &mut [Command],
            next: Next<'_>,
        ) -> Result<(), PrefixError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            next.process_pipeline(ctx, cmds).await
        }
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let client = Client::new(MemoryStore::new().connection());

        assert_eq!(client.set("k", "v").await.unwrap(), "OK");
        assert_eq!(client.get("k").await.unwrap(), "v");
        assert!(client.exists("k").await.unwrap());
        assert_eq!(client.del("k").await.unwrap(), 1);
        assert!(!client.exists("k").await.unwrap());
        assert_eq!(client.get("k").await, Err(PrefixError::Nil));

        assert_eq!(client.incr("n").await.unwrap(), 1);
        assert!(client.command().await.unwrap().contains(&"incr".to_string()));
    }

    #[tokio::test]
    async fn test_execute_records_errors() {
        let client = Client::new(MemoryStore::new().connection());
        let cmd = client.execute(vec![Arg::from("bogus")]).await;
        assert_eq!(cmd.to_string(), "bogus: ERR unknown command 'bogus'");
    }

    /// Fails every command before it reaches the transport.
    struct Refusing;

    #[async_trait]
    impl Hook for Refusing {
        async fn process(
            &self,
            _ctx: &DispatchContext,
            _cmd: &mut Command,
            _next: Next<'_>,
        ) -> Result<(), PrefixError> {
            Err(PrefixError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_chain_error_recorded_on_command() {
        let store = MemoryStore::new();
        let mut client = Client::new(store.connection());
        client.add_hook(Refusing);

        let cmd = client.execute(vec!["get".into(), "k".into()]).await;
        assert_eq!(cmd.err(), Some(&PrefixError::Connection("refused".to_string())));
        assert_eq!(cmd.result(), Err(PrefixError::Connection("refused".to_string())));
        assert_eq!(cmd.to_string(), "get k: connection failed: refused");

        let mut cmd = Command::new("set").arg("k").arg("v");
        let result = client.process(&mut cmd).await;
        assert_eq!(result, Err(PrefixError::Connection("refused".to_string())));
        assert_eq!(cmd.err(), result.as_ref().err());
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_not_overwritten() {
        let client = Client::new(MemoryStore::new().connection());
        let mut cmd = Command::new("get");
        let result = client.process(&mut cmd).await;
        assert_eq!(
            cmd.err(),
            Some(&PrefixError::Command(
                "ERR wrong number of arguments for 'get' command".to_string()
            ))
        );
        assert_eq!(cmd.err(), result.as_ref().err());
    }

    #[tokio::test]
    async fn test_hooks_see_single_and_batch_calls() {
        let counting = Arc::new(Counting::default());
        let mut client = Client::new(MemoryStore::new().connection());
        client.add_hook(Arc::clone(&counting));
        assert_eq!(client.hook_count(), 1);

        client.set("a", 1).await.unwrap();
        let mut pipe = client.pipeline();
        pipe.incr("a").get("a");
        assert_eq!(pipe.len(), 2);
        let cmds = pipe.exec().await.unwrap();

        assert_eq!(cmds[0].to_string(), "incr a: 2");
        assert_eq!(cmds[1].to_string(), "get a: 2");
        assert_eq!(counting.single.load(Ordering::SeqCst), 1);
        assert_eq!(counting.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_not_dispatched() {
        let counting = Arc::new(Counting::default());
        let mut client = Client::new(MemoryStore::new().connection());
        client.add_hook(Arc::clone(&counting));

        let pipe = client.pipeline();
        assert!(pipe.is_empty());
        assert!(pipe.exec().await.unwrap().is_empty());
        assert_eq!(counting.batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pipeline_error() {
        let client = Client::new(MemoryStore::new().connection());
        let mut pipe = client.pipeline();
        pipe.set("s", "text").incr("s");
        assert_eq!(
            pipe.exec().await.unwrap_err(),
            PrefixError::Command("ERR value is not an integer or out of range".to_string())
        );
    }

    #[tokio::test]
    async fn test_connect_reaches_transport() {
        let store = MemoryStore::new();
        let mut client = Client::new(store.connection())
            .with_context(DispatchContext::with_client_name("c1"));
        client.add_hook(PrefixHook::new("TestDial"));
        client.connect().await.unwrap();
        assert_eq!(store.dial_count(), 1);
    }

    #[test]
    fn test_debug() {
        let client = Client::new(MemoryStore::new().connection());
        assert!(format!("{:?}", client).contains("hooks: 0"));
    }
}
