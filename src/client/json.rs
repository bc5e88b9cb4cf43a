//! # JSON Document Operations
//!
//! RedisJSON storage and path queries.
//!
//! Commands are issued raw (`JSON.SET`, `JSON.GET`); documents travel as
//! `serde_json::Value`. Path queries use JSONPath (`$...`) and return
//! array-wrapped results, exactly as the module replies.

use crate::client::StackClient;
use crate::error::StackResult;

impl StackClient {
    /// Stores a JSON value at a path within a key. Use `"$"` for the root.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Json`](crate::error::StackError::Json) when
    /// the value cannot be serialized, or
    /// [`StackError::Command`](crate::error::StackError::Command) when the
    /// command fails.
    pub async fn json_set(
        &self,
        key: &str,
        path: &str,
        value: &serde_json::Value,
    ) -> StackResult<()> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.connection();
        let _: () = redis::cmd("JSON.SET")
            .arg(key)
            .arg(path)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Fetches a JSON value, optionally at a JSONPath. Returns `None` when
    /// the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`](crate::error::StackError::Command)
    /// when the command fails (including a path that does not exist), or
    /// [`StackError::Json`](crate::error::StackError::Json) when the reply
    /// is not valid JSON.
    pub async fn json_get(
        &self,
        key: &str,
        path: Option<&str>,
    ) -> StackResult<Option<serde_json::Value>> {
        let mut cmd = redis::cmd("JSON.GET");
        cmd.arg(key);
        if let Some(path) = path {
            cmd.arg(path);
        }

        let mut conn = self.connection();
        let raw: Option<String> = cmd.query_async(&mut conn).await?;
        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
