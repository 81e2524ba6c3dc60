//! Hook configuration
//!
//! A [`PrefixHook`](crate::PrefixHook) is built from a [`HookOptions`] record
//! that starts from defaults and is adjusted by zero or more [`HookOption`]s.
//! Options are applied in order and the first one that fails stops the build.
//!
//! # Example
//!
//! ```
//! use redis_prefix::options::{with_delimiter, with_options, HookOptions};
//!
//! let mut options = HookOptions::new("TestFoo");
//! assert_eq!(options.delimiter(), ":");
//!
//! with_options([with_delimiter("|")]).apply(&mut options).unwrap();
//! assert_eq!(options.delimiter(), "|");
//! ```
//!
//! # Composing options
//!
//! [`with_options`] bundles several options into one, which lets a helper
//! hand a single value down to a lower layer. A failing option inside a
//! bundle is returned as is, however deeply the bundles are nested:
//!
//! ```
//! use redis_prefix::error::PrefixError;
//! use redis_prefix::options::{with_delimiter, with_options, HookOptions};
//!
//! let nested = with_options([with_options([with_delimiter("")])]);
//! let err = nested.apply(&mut HookOptions::new("TestFoo")).unwrap_err();
//! assert_eq!(err.to_string(), "WithDelimiter: cannot be empty");
//! ```

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::PrefixError;
use crate::key::{KeyLocator, SecondArgument};

/// Delimiter placed between the prefix and the original key by default
pub const DEFAULT_DELIMITER: &str = ":";

/// Configuration record consumed by hook construction
#[derive(Debug, Clone)]
pub struct HookOptions {
    pub(crate) prefix: String,
    pub(crate) delimiter: String,
    pub(crate) locator: Arc<dyn KeyLocator>,
}

impl HookOptions {
    /// Defaults for the given prefix: delimiter `":"`, key at argument 1
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            locator: Arc::new(SecondArgument),
        }
    }

    /// Namespace prepended to every key
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Separator between the prefix and the original key
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Locator used to find key arguments
    pub fn locator(&self) -> &Arc<dyn KeyLocator> {
        &self.locator
    }
}

type ApplyFn = dyn Fn(&mut HookOptions) -> Result<(), PrefixError> + Send + Sync;

/// One named adjustment of [`HookOptions`]
///
/// Options are cheap to clone and can be applied any number of times.
#[derive(Clone)]
pub struct HookOption(Arc<ApplyFn>);

impl HookOption {
    fn new<F>(f: F) -> Self
    where
        F: Fn(&mut HookOptions) -> Result<(), PrefixError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply this option to a configuration record
    ///
    /// # Errors
    ///
    /// Returns the option's validation error; `options` may then be partially
    /// updated and should be discarded.
    pub fn apply(&self, options: &mut HookOptions) -> Result<(), PrefixError> {
        (self.0)(options)
    }
}

impl fmt::Debug for HookOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookOption")
    }
}

/// Override the default delimiter `":"`; cannot be empty
///
/// # Example
///
/// ```
/// use redis_prefix::options::{with_delimiter, HookOptions};
///
/// let mut options = HookOptions::new("T");
/// with_delimiter("|").apply(&mut options).unwrap();
/// assert_eq!(options.delimiter(), "|");
///
/// assert!(with_delimiter("").apply(&mut options).is_err());
/// ```
pub fn with_delimiter(delimiter: impl Into<String>) -> HookOption {
    let delimiter = delimiter.into();
    HookOption::new(move |options| {
        if delimiter.is_empty() {
            return Err(PrefixError::EmptyDelimiter);
        }
        options.delimiter = delimiter.clone();
        Ok(())
    })
}

/// Override the prefix supplied by the test scope; cannot be empty
pub fn with_prefix(prefix: impl Into<String>) -> HookOption {
    let prefix = prefix.into();
    HookOption::new(move |options| {
        if prefix.is_empty() {
            return Err(PrefixError::EmptyPrefix);
        }
        options.prefix = prefix.clone();
        Ok(())
    })
}

/// Append `-<random uuid>` to the prefix
///
/// Useful against a long-lived server, where a rerun of the same test would
/// otherwise see the keys a previous run left behind.
pub fn with_unique_suffix() -> HookOption {
    HookOption::new(|options| {
        options.prefix = format!("{}-{}", options.prefix, Uuid::new_v4());
        Ok(())
    })
}

/// Replace the positional key convention with a custom locator
///
/// # Example
///
/// ```
/// use redis_prefix::key::CommandKeys;
/// use redis_prefix::options::{with_key_locator, HookOptions};
///
/// let mut options = HookOptions::new("T");
/// with_key_locator(CommandKeys::redis()).apply(&mut options).unwrap();
/// ```
pub fn with_key_locator(locator: impl KeyLocator + 'static) -> HookOption {
    let locator: Arc<dyn KeyLocator> = Arc::new(locator);
    HookOption::new(move |options| {
        options.locator = Arc::clone(&locator);
        Ok(())
    })
}

/// Bundle several options into one
///
/// The bundled options run in order. The first failure is returned
/// unchanged: wrapping it here would stack one layer of text per nested
/// bundle.
pub fn with_options(opts: impl IntoIterator<Item = HookOption>) -> HookOption {
    let opts: Vec<HookOption> = opts.into_iter().collect();
    HookOption::new(move |options| {
        for opt in &opts {
            opt.apply(options)?;
        }
        Ok(())
    })
}
