//! Per-call dispatch context.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Context carried alongside every command through the dispatch chain
///
/// Hooks and transports may read it; the prefix hook passes it on untouched.
///
/// # Examples
///
/// ```
/// use redis_prefix::hooks::DispatchContext;
/// use serde_json::json;
///
/// let ctx = DispatchContext::with_client_name("worker-1")
///     .with_value("attempt", json!(2));
///
/// assert_eq!(ctx.client_name.as_deref(), Some("worker-1"));
/// assert_eq!(ctx.value("attempt"), Some(&json!(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchContext {
    /// Name of the client dispatching the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Additional caller-defined data
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl DispatchContext {
    /// Create a context for a named client
    pub fn with_client_name(name: impl Into<String>) -> Self {
        Self {
            client_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Attach a metadata value
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Look up a metadata value
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}
