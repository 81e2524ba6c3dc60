//! Dispatch-chain hooks and the key-prefixing hook.
//!
//! Every command a [`Client`](crate::client::Client) sends passes through its
//! registered hooks in order before reaching the transport, and back through
//! them afterwards. A hook can inspect or modify the command on the way in,
//! then see the outcome on the way out.
//!
//! # Architecture
//!
//! - `Hook` - Trait with three interception points: dial, single command,
//!   pipeline
//! - `Next` - The remainder of the chain, handed to each hook
//! - `DispatchContext` - Per-call data carried through the chain
//! - `PrefixHook` - Namespaces keys with a per-test prefix
//!
//! # Examples
//!
//! ## Isolating a test
//!
//! ```
//! use redis_prefix::prelude::*;
//!
//! # async fn example() -> Result<(), PrefixError> {
//! let store = MemoryStore::new();
//! let mut client = Client::new(store.connection());
//! client.add_hook(PrefixHook::new("TestBalance"));
//!
//! client.set("user:1:balance", "150").await?;
//! assert_eq!(store.keys().await, vec!["TestBalance:user:1:balance"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Batches
//!
//! ```
//! use redis_prefix::prelude::*;
//!
//! # async fn example() -> Result<(), PrefixError> {
//! let mut client = Client::new(MemoryStore::new().connection());
//! client.add_hook(PrefixHook::new("TestCounter"));
//!
//! let mut pipe = client.pipeline();
//! pipe.incr("x").incr("x");
//! let cmds = pipe.exec().await?;
//! assert_eq!(cmds[1].to_string(), "incr x: 2");
//! # Ok(())
//! # }
//! ```

mod chain;
mod context;
mod prefix;

pub use chain::{Hook, Next};
pub use context::DispatchContext;
pub use prefix::PrefixHook;
