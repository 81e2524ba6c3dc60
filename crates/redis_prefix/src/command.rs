//! Commands, arguments and reply values
//!
//! A [`Command`] is one store operation: an ordered list of [`Arg`]s where
//! argument 0 is the operation name and the rest are operands. After the
//! transport has executed it, the command also carries its reply.
//!
//! # Example
//!
//! ```
//! use redis_prefix::command::{Arg, Command, Value};
//!
//! let mut cmd = Command::new("set").arg("foo").arg("bar");
//! assert_eq!(cmd.name(), Some("set"));
//! assert_eq!(cmd.args()[1], Arg::from("foo"));
//!
//! cmd.set_reply(Value::Status("OK".to_string()));
//! assert_eq!(cmd.to_string(), "set foo bar: OK");
//! ```

use std::fmt;

use crate::error::PrefixError;

/// Keys saved by one interception layer: `(position, original key)` pairs.
type SavedKeys = Vec<(usize, String)>;

/// A single positional argument of a command
///
/// Only [`Arg::Str`] counts as string-typed when locating keys. Integers,
/// floats and raw bytes are never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// UTF-8 string argument
    Str(String),
    /// Integer argument
    Int(i64),
    /// Floating point argument
    Float(f64),
    /// Raw binary argument
    Bytes(Vec<u8>),
}

impl Arg {
    /// The string value, if this argument is string-typed
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => f.write_str(s),
            Arg::Int(n) => write!(f, "{}", n),
            Arg::Float(n) => write!(f, "{}", n),
            Arg::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Bytes(value)
    }
}

/// A reply returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing key
    Nil,
    /// Simple status reply such as `OK` or `PONG`
    Status(String),
    /// Integer reply
    Int(i64),
    /// Bulk string reply
    Bulk(String),
    /// Array of replies
    Array(Vec<Value>),
}

impl Value {
    /// The text of a status or bulk reply
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Status(s) | Value::Bulk(s) => Some(s),
            _ => None,
        }
    }

    /// The integer of an integer reply
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("<nil>"),
            Value::Status(s) | Value::Bulk(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// One store operation with an ordered argument list
///
/// Interception layers stash the keys they rewrite inside the command itself,
/// one frame per layer. Restoring pops that command's own frame, so a batch
/// can be reordered by the transport without keys ever crossing over between
/// commands.
///
/// The argument list is fixed once the command is built. Saved keys are put
/// back by position, so no stage of the chain may add or remove arguments.
#[derive(Debug, Clone, Default)]
pub struct Command {
    args: Vec<Arg>,
    reply: Option<Result<Value, PrefixError>>,
    saved: Vec<SavedKeys>,
}

impl Command {
    /// Create a command from its operation name
    pub fn new(name: impl Into<Arg>) -> Self {
        Self::from_args(vec![name.into()])
    }

    /// Create a command from a complete argument list
    ///
    /// An empty list is allowed; such a command is never rewritten.
    pub fn from_args(args: Vec<Arg>) -> Self {
        Self {
            args,
            reply: None,
            saved: Vec::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The operation name (argument 0), if string-typed
    pub fn name(&self) -> Option<&str> {
        self.args.first().and_then(Arg::as_str)
    }

    /// All arguments, operation name first
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// The reply, once the command has been executed
    pub fn reply(&self) -> Option<&Result<Value, PrefixError>> {
        self.reply.as_ref()
    }

    /// Record a successful reply
    pub fn set_reply(&mut self, value: Value) {
        self.reply = Some(Ok(value));
    }

    /// Record a failure
    pub fn set_error(&mut self, err: PrefixError) {
        self.reply = Some(Err(err));
    }

    /// The error this command failed with, if any
    pub fn err(&self) -> Option<&PrefixError> {
        match &self.reply {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// The reply value, or the error the command failed with
    ///
    /// # Errors
    ///
    /// - The command's own error if it failed
    /// - [`PrefixError::Protocol`] if it has not been executed yet
    pub fn result(&self) -> Result<&Value, PrefixError> {
        match &self.reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err.clone()),
            None => Err(PrefixError::Protocol(format!(
                "command '{}' was not executed",
                self.name().unwrap_or_default()
            ))),
        }
    }

    /// Rewrite the string arguments at `positions` to
    /// `prefix + delimiter + key` and push one frame with the originals.
    ///
    /// Positions that are out of range or not string-typed are skipped.
    /// A frame is pushed even when nothing was rewritten so that every call
    /// is balanced by exactly one [`restore_keys`](Self::restore_keys).
    pub(crate) fn prefix_keys(&mut self, positions: &[usize], prefix: &str, delimiter: &str) -> usize {
        let mut frame = SavedKeys::new();
        for &pos in positions {
            if frame.iter().any(|(saved, _)| *saved == pos) {
                continue;
            }
            if let Some(Arg::Str(key)) = self.args.get_mut(pos) {
                let namespaced = format!("{}{}{}", prefix, delimiter, key);
                frame.push((pos, std::mem::replace(key, namespaced)));
            }
        }
        let rewritten = frame.len();
        self.saved.push(frame);
        rewritten
    }

    /// Pop the most recent frame and put its original keys back.
    pub(crate) fn restore_keys(&mut self) {
        let Some(frame) = self.saved.pop() else {
            return;
        };
        for (pos, original) in frame.into_iter().rev() {
            if let Some(arg) = self.args.get_mut(pos) {
                *arg = Arg::Str(original);
            }
        }
    }

    /// Number of interception layers currently holding rewritten keys
    #[cfg(test)]
    pub(crate) fn pending_frames(&self) -> usize {
        self.saved.len()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        match &self.reply {
            Some(Ok(value)) => write!(f, ": {}", value),
            Some(Err(err)) => write!(f, ": {}", err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let cmd = Command::new("select").arg(2);
        assert_eq!(cmd.name(), Some("select"));
        assert_eq!(cmd.args(), &[Arg::from("select"), Arg::Int(2)]);
        assert!(cmd.reply().is_none());
    }

    #[test]
    fn test_empty_command() {
        let cmd = Command::from_args(Vec::new());
        assert_eq!(cmd.name(), None);
        assert_eq!(cmd.to_string(), "");
    }

    #[test]
    fn test_display_with_reply() {
        let mut cmd = Command::new("set").arg("foo").arg("bar");
        assert_eq!(cmd.to_string(), "set foo bar");

        cmd.set_reply(Value::Status("OK".to_string()));
        assert_eq!(cmd.to_string(), "set foo bar: OK");
    }

    #[test]
    fn test_display_with_error() {
        let mut cmd = Command::new("incr").arg("foo");
        cmd.set_error(PrefixError::Command(
            "ERR value is not an integer or out of range".to_string(),
        ));
        assert_eq!(
            cmd.to_string(),
            "incr foo: ERR value is not an integer or out of range"
        );
    }

    #[test]
    fn test_result() {
        let mut cmd = Command::new("get").arg("k");
        assert!(matches!(cmd.result(), Err(PrefixError::Protocol(_))));

        cmd.set_reply(Value::Bulk("v".to_string()));
        assert_eq!(cmd.result().unwrap().as_str(), Some("v"));
        assert!(cmd.err().is_none());

        cmd.set_error(PrefixError::Nil);
        assert_eq!(cmd.result(), Err(PrefixError::Nil));
        assert_eq!(cmd.err(), Some(&PrefixError::Nil));
    }

    #[test]
    fn test_value_display() {
        let value = Value::Array(vec![
            Value::Bulk("a".to_string()),
            Value::Int(2),
            Value::Nil,
        ]);
        assert_eq!(value.to_string(), "[a 2 <nil>]");
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Nil.as_str(), None);
    }

    #[test]
    fn test_prefix_and_restore() {
        let mut cmd = Command::new("set").arg("user:1").arg("v");
        let rewritten = cmd.prefix_keys(&[1], "TestFoo", ":");
        assert_eq!(rewritten, 1);
        assert_eq!(cmd.args()[1], Arg::from("TestFoo:user:1"));
        assert_eq!(cmd.pending_frames(), 1);

        cmd.restore_keys();
        assert_eq!(cmd.args()[1], Arg::from("user:1"));
        assert_eq!(cmd.pending_frames(), 0);
    }

    #[test]
    fn test_prefix_skips_non_string_and_missing() {
        let mut cmd = Command::new("select").arg(2);
        assert_eq!(cmd.prefix_keys(&[1, 5], "T", ":"), 0);
        assert_eq!(cmd.args(), &[Arg::from("select"), Arg::Int(2)]);
        assert_eq!(cmd.pending_frames(), 1);
        cmd.restore_keys();
        assert_eq!(cmd.pending_frames(), 0);
    }

    #[test]
    fn test_duplicate_positions_rewritten_once() {
        let mut cmd = Command::new("get").arg("k");
        assert_eq!(cmd.prefix_keys(&[1, 1], "T", ":"), 1);
        assert_eq!(cmd.args()[1], Arg::from("T:k"));
        cmd.restore_keys();
        assert_eq!(cmd.args()[1], Arg::from("k"));
    }

    #[test]
    fn test_frames_unwind_in_order() {
        let mut cmd = Command::new("get").arg("k");
        cmd.prefix_keys(&[1], "outer", ":");
        cmd.prefix_keys(&[1], "inner", "|");
        assert_eq!(cmd.args()[1], Arg::from("inner|outer:k"));

        cmd.restore_keys();
        assert_eq!(cmd.args()[1], Arg::from("outer:k"));
        cmd.restore_keys();
        assert_eq!(cmd.args()[1], Arg::from("k"));
    }

    #[test]
    fn test_restore_touches_only_saved_positions() {
        let mut cmd = Command::new("mset").arg("a").arg("1").arg("b").arg("2");
        cmd.prefix_keys(&[1, 3], "T", ":");
        assert_eq!(
            cmd.args(),
            &[
                Arg::from("mset"),
                Arg::from("T:a"),
                Arg::from("1"),
                Arg::from("T:b"),
                Arg::from("2")
            ]
        );

        cmd.set_reply(Value::Status("OK".to_string()));
        cmd.restore_keys();
        assert_eq!(cmd.to_string(), "mset a 1 b 2: OK");
    }

    #[test]
    fn test_restore_without_frame_is_noop() {
        let mut cmd = Command::new("get").arg("k");
        cmd.restore_keys();
        assert_eq!(cmd.args()[1], Arg::from("k"));
    }
}
