//! Key identification
//!
//! A [`KeyLocator`] decides which arguments of a command are store keys.
//! The hook only ever rewrites the positions a locator returns, and only when
//! the argument at that position exists and is string-typed.
//!
//! The default, [`SecondArgument`], treats argument 1 as the key for every
//! operation. That convention cannot see commands without keys, with several
//! keys, or with the key elsewhere. [`CommandKeys`] makes the choice per
//! operation name.
//!
//! # Example
//!
//! ```
//! use redis_prefix::command::Command;
//! use redis_prefix::key::{CommandKeys, KeyLocator, KeySpec, SecondArgument};
//!
//! let mset = Command::new("MSET").arg("a").arg("1").arg("b").arg("2");
//! assert_eq!(SecondArgument.key_positions(mset.args()), vec![1]);
//!
//! let keys = CommandKeys::new().with("mset", KeySpec::Every { first: 1, step: 2 });
//! assert_eq!(keys.key_positions(mset.args()), vec![1, 3]);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::command::Arg;

/// Locates the key arguments of a command
pub trait KeyLocator: Debug + Send + Sync {
    /// Candidate key positions for the given argument list
    ///
    /// Returned positions may be out of range; callers skip those.
    fn key_positions(&self, args: &[Arg]) -> Vec<usize>;
}

/// The positional convention: argument 1 is the key of every command
#[derive(Debug, Clone, Copy, Default)]
pub struct SecondArgument;

impl KeyLocator for SecondArgument {
    fn key_positions(&self, _args: &[Arg]) -> Vec<usize> {
        vec![1]
    }
}

/// Where the keys of one operation live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// The operation takes no key
    None,
    /// A single key at this position
    At(usize),
    /// Keys at `first`, `first + step`, ... up to the end of the arguments
    Every {
        /// Position of the first key
        first: usize,
        /// Distance between consecutive keys
        step: usize,
    },
}

impl KeySpec {
    fn positions(&self, len: usize) -> Vec<usize> {
        match *self {
            KeySpec::None => Vec::new(),
            KeySpec::At(pos) => vec![pos],
            KeySpec::Every { first, step } => (first..len).step_by(step.max(1)).collect(),
        }
    }
}

/// Per-operation key table with a fallback locator
///
/// Operation names are matched case-insensitively. Unknown operations, and
/// commands whose argument 0 is not a string, go to the fallback.
#[derive(Debug, Clone)]
pub struct CommandKeys {
    specs: HashMap<String, KeySpec>,
    fallback: Arc<dyn KeyLocator>,
}

impl Default for CommandKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandKeys {
    /// An empty table falling back to [`SecondArgument`]
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
            fallback: Arc::new(SecondArgument),
        }
    }

    /// A table covering common Redis commands whose keys are not just
    /// argument 1
    pub fn redis() -> Self {
        let all_from_one = KeySpec::Every { first: 1, step: 1 };
        Self::new()
            .with("MSET", KeySpec::Every { first: 1, step: 2 })
            .with("MSETNX", KeySpec::Every { first: 1, step: 2 })
            .with("MGET", all_from_one)
            .with("DEL", all_from_one)
            .with("UNLINK", all_from_one)
            .with("EXISTS", all_from_one)
            .with("TOUCH", all_from_one)
            .with("WATCH", all_from_one)
            .with("SDIFF", all_from_one)
            .with("SINTER", all_from_one)
            .with("SUNION", all_from_one)
            .with("RENAME", KeySpec::Every { first: 1, step: 1 })
            .with("RENAMENX", KeySpec::Every { first: 1, step: 1 })
            .with("PING", KeySpec::None)
            .with("ECHO", KeySpec::None)
            .with("SELECT", KeySpec::None)
            .with("COMMAND", KeySpec::None)
            .with("DBSIZE", KeySpec::None)
            .with("FLUSHALL", KeySpec::None)
            .with("FLUSHDB", KeySpec::None)
            .with("INFO", KeySpec::None)
    }

    /// Register the key layout of one operation
    pub fn with(mut self, name: impl AsRef<str>, spec: KeySpec) -> Self {
        self.specs.insert(name.as_ref().to_ascii_uppercase(), spec);
        self
    }

    /// Replace the locator used for unknown operations
    pub fn fallback(mut self, locator: impl KeyLocator + 'static) -> Self {
        self.fallback = Arc::new(locator);
        self
    }
}

impl KeyLocator for CommandKeys {
    fn key_positions(&self, args: &[Arg]) -> Vec<usize> {
        let spec = args
            .first()
            .and_then(Arg::as_str)
            .and_then(|name| self.specs.get(&name.to_ascii_uppercase()));
        match spec {
            Some(spec) => spec.positions(args.len()),
            None => self.fallback.key_positions(args),
        }
    }
}
