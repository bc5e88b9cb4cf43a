//! # Container Lifecycle
//!
//! Drives the containerized stack through `docker compose` and waits for
//! it to become reachable.
//!
//! The readiness check is a bounded-retry polling loop: fixed attempt
//! count, fixed delay, container logs captured on failure for diagnostics.

use crate::client::StackClient;
use crate::config::StackConfig;
use crate::error::{StackError, StackResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Default number of readiness attempts.
pub const DEFAULT_READY_ATTEMPTS: u32 = 5;

/// Default delay between readiness attempts.
pub const DEFAULT_READY_DELAY: Duration = Duration::from_secs(2);

/// Default compose file, resolved against the working directory.
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Default container name, matching `docker-compose.yml`.
const DEFAULT_CONTAINER: &str = "redis-stack";

/// Handle on the composed stack: which file describes it and which
/// container to pull logs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeStack {
    compose_file: PathBuf,
    container: String,
}

impl Default for ComposeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeStack {
    /// Creates a handle with the default compose file and container name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            container: DEFAULT_CONTAINER.to_string(),
        }
    }

    /// Sets the compose file path.
    #[must_use]
    pub fn with_compose_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.compose_file = path.into();
        self
    }

    /// Sets the container name used for log capture.
    #[must_use]
    pub fn with_container(mut self, name: impl Into<String>) -> Self {
        self.container = name.into();
        self
    }

    /// Returns the compose file path.
    #[inline]
    #[must_use]
    pub fn compose_file(&self) -> &Path {
        &self.compose_file
    }

    /// Returns the container name.
    #[inline]
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Starts the stack in the background (`docker compose up -d`).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Compose`] when the orchestrator cannot be run
    /// or exits non-zero.
    pub async fn start(&self) -> StackResult<()> {
        info!(file = %self.compose_file.display(), "starting the stack");
        self.run_compose(&["up", "-d"]).await
    }

    /// Stops the stack (`docker compose down`). Stopping a stack that is
    /// not running succeeds; compose treats it as nothing to do.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Compose`] when the orchestrator cannot be run
    /// or exits non-zero.
    pub async fn stop(&self) -> StackResult<()> {
        info!(file = %self.compose_file.display(), "stopping the stack");
        self.run_compose(&["down"]).await
    }

    /// Captures the container's output for diagnostics. Failure to fetch
    /// logs is reported but never fatal.
    pub async fn logs(&self) -> Option<String> {
        let output = match Command::new("docker")
            .arg("logs")
            .arg(&self.container)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(container = %self.container, error = %e, "could not fetch container logs");
                return None;
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr.trim_end());
        }

        if text.trim().is_empty() { None } else { Some(text) }
    }

    /// Polls the stack until it answers `PING`, then returns the connected
    /// client.
    ///
    /// Bounded retries with a fixed delay; each failed attempt logs the
    /// error and the container output.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Config`] when no password is configured, or
    /// [`StackError::NotReady`] (carrying the last captured logs) after
    /// exhausting the attempts.
    pub async fn wait_until_ready(
        &self,
        config: &StackConfig,
        attempts: u32,
        delay: Duration,
    ) -> StackResult<StackClient> {
        config.require_password()?;
        for attempt in 1..=attempts {
            match StackClient::connect(config.clone()).await {
                Ok(client) => {
                    if client.ping().await {
                        info!(addr = %config.addr(), attempt, "stack is ready");
                        return Ok(client);
                    }
                    warn!(attempt, attempts, "connected but PING went unanswered");
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "waiting for the stack to be ready");
                }
            }

            if attempt < attempts {
                if let Some(logs) = self.logs().await {
                    debug!(container = %self.container, %logs, "container output while waiting");
                }
                tokio::time::sleep(delay).await;
            }
        }

        Err(StackError::not_ready(attempts, self.logs().await))
    }

    async fn run_compose(&self, args: &[&str]) -> StackResult<()> {
        let output = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.compose_file)
            .args(args)
            .output()
            .await
            .map_err(|e| StackError::compose(format!("failed to run docker compose: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(StackError::compose(format!(
                "docker compose {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let stack = ComposeStack::new();
        assert_eq!(stack.compose_file(), Path::new("docker-compose.yml"));
        assert_eq!(stack.container(), "redis-stack");
    }

    #[test]
    fn builder_overrides() {
        let stack = ComposeStack::new()
            .with_compose_file("deploy/compose.yml")
            .with_container("redis-dev");
        assert_eq!(stack.compose_file(), Path::new("deploy/compose.yml"));
        assert_eq!(stack.container(), "redis-dev");
    }

    #[tokio::test]
    async fn wait_until_ready_requires_a_password() {
        let stack = ComposeStack::new();
        let config = StackConfig::default();
        let result = stack
            .wait_until_ready(&config, 1, Duration::from_millis(1))
            .await;
        assert!(matches!(result, Err(StackError::Config { .. })));
    }
}
