//! # Stack Client
//!
//! Thin async wrapper over the Redis Stack instance.
//!
//! [`StackClient`] delegates every operation to the `redis` crate; the
//! wrapper only marshals parameters, parses replies, and maps errors. The
//! search and JSON module operations live in the [`search`] and [`json`]
//! submodules.
//!
//! # Examples
//!
//! ```ignore
//! use redis_stack_harness::{StackClient, StackConfig};
//!
//! let config = StackConfig::from_env()?;
//! let client = StackClient::connect(config).await?;
//! assert!(client.ping().await);
//! ```

pub mod json;
pub mod search;

pub use search::{SchemaField, SearchDoc, SearchReply};

use crate::config::StackConfig;
use crate::error::{StackError, StackResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// A module entry reported by `MODULE LIST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module name, e.g. `search` or `ReJSON`.
    pub name: String,
    /// Module version number.
    pub version: i64,
}

/// High-level client for the Redis Stack instance.
///
/// Cheap to clone; all clones share the underlying multiplexed connection.
#[derive(Clone)]
pub struct StackClient {
    config: StackConfig,
    conn: ConnectionManager,
}

impl std::fmt::Debug for StackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackClient")
            .field("addr", &self.config.addr())
            .finish_non_exhaustive()
    }
}

impl StackClient {
    /// Connects to the configured instance; single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] when no password is configured, or
    /// [`StackError::Command`] when the connection cannot be established.
    pub async fn connect(config: StackConfig) -> StackResult<Self> {
        config.require_password()?;
        let client = redis::Client::open(config.connection_info())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { config, conn })
    }

    /// Connects with a bounded retry loop: fixed attempt count, fixed delay.
    ///
    /// Each attempt connects and pings; the loop stops at the first
    /// answering instance.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] when no password is configured, or
    /// [`StackError::NotReady`] after exhausting the attempts.
    pub async fn connect_with_retry(
        config: &StackConfig,
        attempts: u32,
        delay: Duration,
    ) -> StackResult<Self> {
        config.require_password()?;
        for attempt in 1..=attempts {
            match Self::connect(config.clone()).await {
                Ok(client) => {
                    if client.ping().await {
                        return Ok(client);
                    }
                    warn!(attempt, attempts, "connected but PING went unanswered");
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "waiting for the stack to become reachable");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(StackError::not_ready(attempts, None))
    }

    /// Returns the configuration this client was built from.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Liveness probe. Returns `true` when the server answers `PONG`.
    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        matches!(pong.as_deref(), Ok("PONG"))
    }

    /// Fetches and parses the server `INFO` reply into a key/value map.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn server_info(&self) -> StackResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let raw: String = redis::cmd("INFO").query_async(&mut conn).await?;
        Ok(parse_info(&raw))
    }

    /// Returns the server version, or `"unknown"` when absent from `INFO`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn server_version(&self) -> StackResult<String> {
        let info = self.server_info().await?;
        Ok(info
            .get("redis_version")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()))
    }

    /// Lists the loaded server modules.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails, or
    /// [`StackError::Reply`] when the reply cannot be parsed.
    pub async fn modules(&self) -> StackResult<Vec<ModuleInfo>> {
        let mut conn = self.conn.clone();
        let raw: Value = redis::cmd("MODULE")
            .arg("LIST")
            .query_async(&mut conn)
            .await?;
        parse_modules(&raw)
    }

    /// Returns whether the named module is loaded (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails, or
    /// [`StackError::Reply`] when the reply cannot be parsed.
    pub async fn has_module(&self, name: &str) -> StackResult<bool> {
        Ok(self.modules().await?.iter().any(|m| m.name == name))
    }

    /// Sets a string value.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn set(&self, key: &str, value: &str) -> StackResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    /// Gets a string value. `None` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn get(&self, key: &str) -> StackResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    /// Deletes the given keys; returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn delete(&self, keys: &[&str]) -> StackResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del(keys).await?)
    }

    pub(crate) fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Parses an `INFO` reply: `key:value` lines, `#` section headers skipped.
fn parse_info(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Parses a `MODULE LIST` reply. RESP2 shape: an array of entries, each an
/// array of alternating field names and values (`name`, `ver`, ...); RESP3
/// servers reply with maps instead.
fn parse_modules(value: &Value) -> StackResult<Vec<ModuleInfo>> {
    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(StackError::reply(format!(
                "MODULE LIST did not return an array: {other:?}"
            )));
        }
    };

    entries.iter().map(parse_module_entry).collect()
}

fn parse_module_entry(entry: &Value) -> StackResult<ModuleInfo> {
    let mut name = None;
    let mut version = None;

    let mut visit = |field: &Value, value: &Value| {
        match value_to_string(field).as_deref() {
            Some("name") => name = value_to_string(value),
            Some("ver") => version = value_to_i64(value),
            _ => {}
        }
    };

    match entry {
        Value::Array(items) => {
            for pair in items.chunks(2) {
                if let [field, value] = pair {
                    visit(field, value);
                }
            }
        }
        Value::Map(pairs) => {
            for (field, value) in pairs {
                visit(field, value);
            }
        }
        other => {
            return Err(StackError::reply(format!(
                "unexpected MODULE LIST entry: {other:?}"
            )));
        }
    }

    let name =
        name.ok_or_else(|| StackError::reply("MODULE LIST entry without a name field"))?;
    Ok(ModuleInfo {
        name,
        version: version.unwrap_or_default(),
    })
}

/// Extracts a string from any scalar reply value.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Double(d) => Some(d.to_string()),
        _ => None,
    }
}

pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).parse().ok(),
        Value::SimpleString(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn value_to_u64(value: &Value) -> Option<u64> {
    value_to_i64(value).and_then(|i| u64::try_from(i).ok())
}

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Double(d) => Some(*d),
        Value::Int(i) => Some(*i as f64),
        Value::BulkString(bytes) => String::from_utf8_lossy(bytes).parse().ok(),
        Value::SimpleString(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_info_skips_sections_and_blank_lines() {
        let raw = "# Server\r\nredis_version:7.4.0\r\nredis_mode:standalone\r\n\r\n# Memory\r\nused_memory:1024\r\n";
        let info = parse_info(raw);
        assert_eq!(info.get("redis_version").map(String::as_str), Some("7.4.0"));
        assert_eq!(info.get("used_memory").map(String::as_str), Some("1024"));
        assert!(!info.contains_key("# Server"));
    }

    #[test]
    fn parse_modules_resp2_arrays() {
        let reply = Value::Array(vec![
            Value::Array(vec![
                Value::BulkString(b"name".to_vec()),
                Value::BulkString(b"search".to_vec()),
                Value::BulkString(b"ver".to_vec()),
                Value::Int(21005),
            ]),
            Value::Array(vec![
                Value::BulkString(b"name".to_vec()),
                Value::BulkString(b"ReJSON".to_vec()),
                Value::BulkString(b"ver".to_vec()),
                Value::Int(20811),
            ]),
        ]);

        let modules = parse_modules(&reply).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(
            modules.first().unwrap(),
            &ModuleInfo {
                name: "search".to_string(),
                version: 21005
            }
        );
        assert!(modules.iter().any(|m| m.name == "ReJSON"));
    }

    #[test]
    fn parse_modules_resp3_maps() {
        let reply = Value::Array(vec![Value::Map(vec![
            (
                Value::SimpleString("name".to_string()),
                Value::BulkString(b"search".to_vec()),
            ),
            (Value::SimpleString("ver".to_string()), Value::Int(21005)),
        ])]);

        let modules = parse_modules(&reply).unwrap();
        assert_eq!(modules.first().unwrap().name, "search");
    }

    #[test]
    fn parse_modules_rejects_scalar_reply() {
        assert!(parse_modules(&Value::Int(1)).is_err());
        assert!(parse_modules(&Value::Array(vec![Value::Int(1)])).is_err());
    }

    #[test]
    fn scalar_value_extraction() {
        assert_eq!(
            value_to_string(&Value::BulkString(b"hello".to_vec())).as_deref(),
            Some("hello")
        );
        assert_eq!(value_to_u64(&Value::Int(3)), Some(3));
        assert_eq!(value_to_u64(&Value::Int(-1)), None);
        assert_eq!(value_to_f64(&Value::BulkString(b"0.5".to_vec())), Some(0.5));
        assert_eq!(value_to_string(&Value::Nil), None);
    }
}
