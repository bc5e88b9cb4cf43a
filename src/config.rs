//! # Stack Configuration
//!
//! Connection settings for the Redis Stack instance.
//!
//! Settings are sourced from `REDIS_HOST`, `REDIS_PORT` and `REDIS_PASSWORD`
//! environment variables, optionally loaded from a `.env` file first. Direct
//! builder overrides take precedence over environment values.
//!
//! # Examples
//!
//! ```no_run
//! use redis_stack_harness::config::StackConfig;
//!
//! let config = StackConfig::from_env()?
//!     .with_host("redis.internal")
//!     .with_port(6380);
//! # Ok::<(), redis_stack_harness::error::StackError>(())
//! ```

use crate::error::{StackError, StackResult};
use config::{Config, Environment};
use serde::Deserialize;
use std::path::Path;

/// Default host when `REDIS_HOST` is not set.
const DEFAULT_HOST: &str = "localhost";

/// Default port when `REDIS_PORT` is not set.
const DEFAULT_PORT: u16 = 6379;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Connection configuration for the Redis Stack instance.
///
/// Constructed once per process or test and discarded; owns no resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StackConfig {
    /// Server hostname.
    #[serde(default = "default_host")]
    host: String,
    /// Server port.
    #[serde(default = "default_port")]
    port: u16,
    /// Server password. `None` when unset; an empty value is treated as unset.
    #[serde(default)]
    password: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
        }
    }
}

impl StackConfig {
    /// Builds the configuration from `REDIS_*` environment variables.
    ///
    /// Missing variables fall back to the defaults (`localhost`, `6379`,
    /// no password).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] if a variable cannot be parsed,
    /// e.g. a non-numeric `REDIS_PORT`.
    pub fn from_env() -> StackResult<Self> {
        Self::from_env_source(Environment::with_prefix("REDIS").try_parsing(true))
    }

    /// Builds the configuration from the given environment source.
    ///
    /// Tests inject a synthetic variable map here; `from_env` passes the
    /// process environment.
    fn from_env_source(source: Environment) -> StackResult<Self> {
        let settings = Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| StackError::config(format!("failed to read environment: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| StackError::config(format!("invalid REDIS_* setting: {e}")))?;

        Ok(config.normalized())
    }

    /// Loads a `.env` file, then builds the configuration from the
    /// environment.
    ///
    /// Variables already present in the process environment keep precedence
    /// over the file's values.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] if the file does not exist, cannot be
    /// parsed, or a variable cannot be parsed afterwards.
    pub fn load(env_path: impl AsRef<Path>) -> StackResult<Self> {
        let env_path = env_path.as_ref();
        if !env_path.exists() {
            return Err(StackError::config(format!(
                ".env file not found at {}; copy .env.example and set your configuration",
                env_path.display()
            )));
        }

        dotenvy::from_path(env_path)
            .map_err(|e| StackError::config(format!("failed to load {}: {e}", env_path.display())))?;

        Self::from_env()
    }

    /// Sets the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password. An empty password is treated as unset.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self.normalized()
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the password, if set.
    #[inline]
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns `host:port` for log lines.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns a redacted password preview for logging: the first character
    /// followed by one `*` per remaining character, or `"None"` when unset.
    #[must_use]
    pub fn password_preview(&self) -> String {
        let Some(password) = self.password.as_deref() else {
            return "None".to_string();
        };
        let mut chars = password.chars();
        match chars.next() {
            Some(first) => {
                let masked: String = chars.map(|_| '*').collect();
                format!("{first}{masked}")
            }
            None => "None".to_string(),
        }
    }

    /// Checks the invariant that a password must be set before a connection
    /// is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] when no password is configured.
    pub fn require_password(&self) -> StackResult<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| StackError::config("REDIS_PASSWORD is not set"))
    }

    /// Builds the connection info consumed by the client library.
    #[must_use]
    pub fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: redis::RedisConnectionInfo {
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }

    /// Collapses an empty password into `None`.
    fn normalized(mut self) -> Self {
        if self.password.as_deref() == Some("") {
            self.password = None;
        }
        self
    }
}
