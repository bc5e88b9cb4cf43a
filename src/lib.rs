//! # Redis Stack Harness
//!
//! Development-environment harness for a containerized Redis Stack
//! instance with the RediSearch and RedisJSON modules.
//!
//! The store and its modules do the real work; this crate only configures,
//! starts, and calls them:
//!
//! - [`config`]: connection settings from `REDIS_*` environment variables.
//! - [`client`]: thin async wrapper over the store's client library for
//!   key-value, search-index, and JSON-document operations.
//! - [`compose`]: container lifecycle driver with a bounded-retry
//!   readiness check.
//! - [`samples`]: fixture schemas and documents for the self-test and
//!   tests.
//!
//! The `cli` feature builds the `redis-stack` binary with `start`, `stop`,
//! and `check` subcommands.

pub mod client;
pub mod compose;
pub mod config;
pub mod error;
pub mod samples;
pub mod telemetry;

pub use self::client::{ModuleInfo, SchemaField, SearchDoc, SearchReply, StackClient};
pub use self::compose::ComposeStack;
pub use self::config::StackConfig;
pub use self::error::{StackError, StackResult};
