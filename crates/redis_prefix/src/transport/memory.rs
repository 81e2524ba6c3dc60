//! In-memory transport for verifying hooks without a server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::Transport;
use crate::command::{Arg, Command, Value};
use crate::error::PrefixError;
use crate::hooks::DispatchContext;

/// Number of logical databases, as on a default server
const DATABASES: usize = 16;

/// Commands understood by [`MemoryConnection`]
const SUPPORTED: &[&str] = &[
    "command", "dbsize", "decr", "del", "echo", "exists", "flushall", "get", "incr", "incrby",
    "mget", "mset", "ping", "select", "set",
];

type Database = HashMap<String, String>;

/// Shared in-memory key space
///
/// Cloning is cheap and every clone sees the same data, so any number of
/// clients (each with its own [`MemoryConnection`]) can share one store the
/// way parallel tests share one server.
///
/// [`get`](MemoryStore::get) and [`keys`](MemoryStore::keys) read database 0
/// directly, bypassing any hooks. Use them to check the literal keys a
/// hooked client wrote.
///
/// # Example
///
/// ```
/// use redis_prefix::prelude::*;
///
/// # async fn example() -> Result<(), PrefixError> {
/// let store = MemoryStore::new();
/// let client = Client::new(store.connection());
/// client.set("k", "v").await?;
/// assert_eq!(store.get("k").await.as_deref(), Some("v"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    databases: Arc<Mutex<Vec<Database>>>,
    dials: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            databases: Arc::new(Mutex::new(vec![Database::new(); DATABASES])),
            dials: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a new connection, starting on database 0
    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection {
            store: self.clone(),
            selected: AtomicUsize::new(0),
        }
    }

    /// Raw value of `key` in database 0
    pub async fn get(&self, key: &str) -> Option<String> {
        self.databases.lock().await[0].get(key).cloned()
    }

    /// All keys in database 0, sorted
    pub async fn keys(&self) -> Vec<String> {
        let databases = self.databases.lock().await;
        let mut keys: Vec<String> = databases[0].keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful dials across all connections
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

/// One client's connection to a [`MemoryStore`]
///
/// Tracks the database chosen with `SELECT`; everything else lives in the
/// shared store.
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    selected: AtomicUsize,
}

impl MemoryConnection {
    /// Database currently selected on this connection
    pub fn selected_db(&self) -> usize {
        self.selected.load(Ordering::SeqCst)
    }

    fn execute(&self, databases: &mut [Database], args: &[Arg]) -> Result<Value, PrefixError> {
        let Some(first) = args.first() else {
            return Err(PrefixError::Command("ERR empty command".to_string()));
        };
        let name = first.to_string().to_ascii_lowercase();
        let argv: Vec<String> = args[1..].iter().map(ToString::to_string).collect();
        let db = &mut databases[self.selected_db()];

        match (name.as_str(), argv.as_slice()) {
            ("ping", []) => Ok(Value::Status("PONG".to_string())),
            ("ping", [message]) | ("echo", [message]) => Ok(Value::Bulk(message.clone())),
            ("set", [key, value]) => {
                db.insert(key.clone(), value.clone());
                Ok(ok())
            }
            ("get", [key]) => Ok(db.get(key).cloned().map_or(Value::Nil, Value::Bulk)),
            ("incr", [key]) => incr_by(db, key, 1),
            ("decr", [key]) => incr_by(db, key, -1),
            ("incrby", [key, delta]) => incr_by(db, key, parse_int(delta)?),
            ("del", keys) if !keys.is_empty() => {
                let removed = keys.iter().filter(|key| db.remove(*key).is_some()).count();
                Ok(Value::Int(removed as i64))
            }
            ("exists", keys) if !keys.is_empty() => {
                let found = keys.iter().filter(|key| db.contains_key(*key)).count();
                Ok(Value::Int(found as i64))
            }
            ("mset", pairs) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                for pair in pairs.chunks(2) {
                    db.insert(pair[0].clone(), pair[1].clone());
                }
                Ok(ok())
            }
            ("mget", keys) if !keys.is_empty() => Ok(Value::Array(
                keys.iter()
                    .map(|key| db.get(key).cloned().map_or(Value::Nil, Value::Bulk))
                    .collect(),
            )),
            ("select", [index]) => {
                let index = parse_int(index)?;
                if !(0..DATABASES as i64).contains(&index) {
                    return Err(PrefixError::Command(
                        "ERR DB index is out of range".to_string(),
                    ));
                }
                self.selected.store(index as usize, Ordering::SeqCst);
                Ok(ok())
            }
            ("command", []) => Ok(Value::Array(
                SUPPORTED
                    .iter()
                    .map(|name| Value::Bulk(name.to_string()))
                    .collect(),
            )),
            ("dbsize", []) => Ok(Value::Int(db.len() as i64)),
            ("flushall", []) => {
                databases.iter_mut().for_each(Database::clear);
                Ok(ok())
            }
            (known, _) if SUPPORTED.contains(&known) => Err(PrefixError::Command(format!(
                "ERR wrong number of arguments for '{}' command",
                known
            ))),
            _ => Err(PrefixError::Command(format!(
                "ERR unknown command '{}'",
                first
            ))),
        }
    }

    fn record(&self, databases: &mut [Database], cmd: &mut Command) -> Result<(), PrefixError> {
        let result = match self.execute(databases, cmd.args()) {
            Ok(value) => {
                cmd.set_reply(value);
                Ok(())
            }
            Err(err) => {
                cmd.set_error(err.clone());
                Err(err)
            }
        };
        trace!("Executed: {}", cmd);
        result
    }
}

fn ok() -> Value {
    Value::Status("OK".to_string())
}

fn parse_int(value: &str) -> Result<i64, PrefixError> {
    value.parse().map_err(|_| {
        PrefixError::Command("ERR value is not an integer or out of range".to_string())
    })
}

fn incr_by(db: &mut Database, key: &str, delta: i64) -> Result<Value, PrefixError> {
    let current = match db.get(key) {
        Some(value) => parse_int(value)?,
        None => 0,
    };
    let next = current.checked_add(delta).ok_or_else(|| {
        PrefixError::Command("ERR increment or decrement would overflow".to_string())
    })?;
    db.insert(key.to_string(), next.to_string());
    Ok(Value::Int(next))
}

#[async_trait]
impl Transport for MemoryConnection {
    async fn dial(&self, ctx: &DispatchContext) -> Result<(), PrefixError> {
        self.store.dials.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Dialed in-memory store (client: {})",
            ctx.client_name.as_deref().unwrap_or("-")
        );
        Ok(())
    }

    async fn process(&self, _ctx: &DispatchContext, cmd: &mut Command) -> Result<(), PrefixError> {
        let mut databases = self.store.databases.lock().await;
        self.record(&mut databases, cmd)
    }

    async fn process_pipeline(
        &self,
        _ctx: &DispatchContext,
        cmds: &mut [Command],
    ) -> Result<(), PrefixError> {
        debug!("Executing pipeline of {} commands", cmds.len());
        let mut databases = self.store.databases.lock().await;
        let mut first_err = None;
        for cmd in cmds.iter_mut() {
            if let Err(err) = self.record(&mut databases, cmd) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(conn: &MemoryConnection, cmd: Command) -> Command {
        let mut cmd = cmd;
        let _ = conn.process(&DispatchContext::default(), &mut cmd).await;
        cmd
    }

    #[tokio::test]
    async fn test_set_get() {
        let store = MemoryStore::new();
        let conn = store.connection();

        let set = run(&conn, Command::new("SET").arg("k").arg("v")).await;
        assert_eq!(set.result(), Ok(&Value::Status("OK".to_string())));

        let get = run(&conn, Command::new("get").arg("k")).await;
        assert_eq!(get.result(), Ok(&Value::Bulk("v".to_string())));

        let missing = run(&conn, Command::new("get").arg("nope")).await;
        assert_eq!(missing.result(), Ok(&Value::Nil));

        assert_eq!(store.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_incr_family() {
        let conn = MemoryStore::new().connection();
        assert_eq!(run(&conn, Command::new("incr").arg("n")).await.to_string(), "incr n: 1");
        assert_eq!(
            run(&conn, Command::new("incrby").arg("n").arg(10)).await.to_string(),
            "incrby n 10: 11"
        );
        assert_eq!(run(&conn, Command::new("decr").arg("n")).await.to_string(), "decr n: 10");

        run(&conn, Command::new("set").arg("s").arg("abc")).await;
        let err = run(&conn, Command::new("incr").arg("s")).await;
        assert_eq!(
            err.err(),
            Some(&PrefixError::Command(
                "ERR value is not an integer or out of range".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_multi_key_commands() {
        let conn = MemoryStore::new().connection();
        run(&conn, Command::new("mset").arg("a").arg("1").arg("b").arg("2")).await;

        let mget = run(&conn, Command::new("mget").arg("a").arg("b").arg("c")).await;
        assert_eq!(mget.to_string(), "mget a b c: [1 2 <nil>]");

        let exists = run(&conn, Command::new("exists").arg("a").arg("c")).await;
        assert_eq!(exists.result(), Ok(&Value::Int(1)));

        let del = run(&conn, Command::new("del").arg("a").arg("b").arg("c")).await;
        assert_eq!(del.result(), Ok(&Value::Int(2)));

        let size = run(&conn, Command::new("dbsize")).await;
        assert_eq!(size.result(), Ok(&Value::Int(0)));
    }

    #[tokio::test]
    async fn test_select_is_per_connection() {
        let store = MemoryStore::new();
        let first = store.connection();
        let second = store.connection();

        let select = run(&first, Command::new("select").arg(2)).await;
        assert_eq!(select.to_string(), "select 2: OK");
        assert_eq!(first.selected_db(), 2);
        assert_eq!(second.selected_db(), 0);

        run(&first, Command::new("set").arg("k").arg("db2")).await;
        let get = run(&second, Command::new("get").arg("k")).await;
        assert_eq!(get.result(), Ok(&Value::Nil));
        assert!(store.keys().await.is_empty());

        let bad = run(&first, Command::new("select").arg(16)).await;
        assert_eq!(
            bad.err(),
            Some(&PrefixError::Command("ERR DB index is out of range".to_string()))
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let conn = MemoryStore::new().connection();

        let unknown = run(&conn, Command::new("NOPE").arg("x")).await;
        assert_eq!(unknown.err().unwrap().to_string(), "ERR unknown command 'NOPE'");

        let arity = run(&conn, Command::new("GET")).await;
        assert_eq!(
            arity.err().unwrap().to_string(),
            "ERR wrong number of arguments for 'get' command"
        );

        let empty = run(&conn, Command::from_args(Vec::new())).await;
        assert!(empty.err().is_some());
    }

    #[tokio::test]
    async fn test_misc_commands() {
        let store = MemoryStore::new();
        let conn = store.connection();

        assert_eq!(run(&conn, Command::new("ping")).await.to_string(), "ping: PONG");
        assert_eq!(
            run(&conn, Command::new("echo").arg("hi")).await.to_string(),
            "echo hi: hi"
        );

        let command = run(&conn, Command::new("command")).await;
        match command.result() {
            Ok(Value::Array(names)) => assert_eq!(names.len(), SUPPORTED.len()),
            other => panic!("unexpected reply: {:?}", other),
        }

        run(&conn, Command::new("set").arg("k").arg("v")).await;
        run(&conn, Command::new("flushall")).await;
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_returns_first_error() {
        let conn = MemoryStore::new().connection();
        let mut cmds = vec![
            Command::new("set").arg("k").arg("x"),
            Command::new("incr").arg("k"),
            Command::new("nope"),
            Command::new("get").arg("k"),
        ];

        let result = conn
            .process_pipeline(&DispatchContext::default(), &mut cmds)
            .await;

        assert_eq!(
            result,
            Err(PrefixError::Command(
                "ERR value is not an integer or out of range".to_string()
            ))
        );
        assert_eq!(cmds[0].to_string(), "set k x: OK");
        assert!(cmds[2].err().is_some());
        assert_eq!(cmds[3].to_string(), "get k: x");
    }

    #[tokio::test]
    async fn test_dial_counts() {
        let store = MemoryStore::new();
        let conn = store.connection();
        conn.dial(&DispatchContext::default()).await.unwrap();
        store.connection().dial(&DispatchContext::default()).await.unwrap();
        assert_eq!(store.dial_count(), 2);
    }
}
