//! Development-environment CLI for the containerized Redis Stack.
//!
//! `start` brings the stack up and waits until it answers, `stop` tears it
//! down, and `check` runs the connectivity and module self-test against a
//! running instance. All subcommands exit non-zero on failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, ensure};
use clap::{Parser, Subcommand};
use redis_stack_harness::compose::{ComposeStack, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_DELAY};
use redis_stack_harness::{StackClient, StackConfig, samples, telemetry};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "redis-stack")]
#[command(about = "Start, stop and check the containerized Redis Stack", version)]
struct Cli {
    /// Path to the .env file holding the REDIS_* settings.
    #[arg(long, default_value = ".env", global = true)]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the stack and wait until it answers PING.
    Start,
    /// Stop the stack. Stopping a stack that is not running is a no-op.
    Stop,
    /// Run the connectivity and module self-test.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init("info");
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start => start(&cli).await,
        Commands::Stop => stop().await,
        Commands::Check => check(&cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration, preferring the .env file when it exists.
fn load_config(env_file: &Path) -> anyhow::Result<StackConfig> {
    let config = if env_file.exists() {
        StackConfig::load(env_file)?
    } else {
        warn!(file = %env_file.display(), "no .env file found, using the process environment");
        StackConfig::from_env()?
    };
    Ok(config)
}

async fn start(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.env_file)?;
    config.require_password()?;

    let stack = ComposeStack::new();
    stack.start().await?;

    let client = stack
        .wait_until_ready(&config, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_DELAY)
        .await
        .map_err(|e| {
            if let Some(logs) = e.container_logs() {
                error!("container output:\n{logs}");
            }
            e
        })
        .context("the stack did not become ready")?;

    report_server(&client).await?;
    Ok(())
}

async fn stop() -> anyhow::Result<()> {
    ComposeStack::new().stop().await?;
    info!("stack stopped");
    Ok(())
}

async fn check(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.env_file)?;
    info!(addr = %config.addr(), password = %config.password_preview(), "checking the stack");

    let client =
        StackClient::connect_with_retry(&config, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_DELAY)
            .await
            .context("failed to connect after multiple attempts; is the stack running?")?;
    info!("connected");

    report_server(&client).await?;
    check_basic_ops(&client).await?;
    check_search(&client).await?;
    check_json(&client).await?;

    info!("all checks passed");
    Ok(())
}

/// Logs the server version and the loaded modules.
async fn report_server(client: &StackClient) -> anyhow::Result<()> {
    let version = client.server_version().await?;
    info!("server version: {version}");
    for module in client.modules().await? {
        info!("module {} version {}", module.name, module.version);
    }
    Ok(())
}

/// Round-trips a key-value pair through the store.
async fn check_basic_ops(client: &StackClient) -> anyhow::Result<()> {
    let key = "test:hello";
    let value = format!("Hello World! Timestamp: {}", chrono::Utc::now());

    client.set(key, &value).await?;
    let read_back = client.get(key).await?;
    ensure!(
        read_back.as_deref() == Some(value.as_str()),
        "read-back mismatch for {key}: {read_back:?}"
    );
    client.delete(&[key]).await?;

    info!("basic key-value operations succeeded");
    Ok(())
}

/// Creates a search index, stores a document, and queries it back.
async fn check_search(client: &StackClient) -> anyhow::Result<()> {
    ensure!(
        client.has_module("search").await?,
        "the search module is not loaded"
    );

    let index = "selftest-blog-idx";
    let prefix = "selftest:blog:";
    let doc_key = "selftest:blog:1";

    client.drop_search_index(index).await?;
    client
        .create_search_index(index, prefix, &samples::blog_schema())
        .await?;
    client.add_document(doc_key, &samples::sample_blog_post()).await?;

    let reply = client.search(index, "Redis").await?;
    ensure!(
        reply.total >= 1 && reply.contains_id(doc_key),
        "search did not return the inserted document (total {})",
        reply.total
    );

    client.drop_search_index(index).await?;
    client.delete(&[doc_key]).await?;

    info!("search test succeeded, found {} document(s)", reply.total);
    Ok(())
}

/// Stores a JSON document and queries sub-paths.
async fn check_json(client: &StackClient) -> anyhow::Result<()> {
    ensure!(
        client.has_module("ReJSON").await?,
        "the JSON module is not loaded"
    );

    let key = "selftest:user:1";
    client.json_set(key, "$", &samples::sample_user()).await?;

    let age = client.json_get(key, Some("$.profile.age")).await?;
    ensure!(
        age == Some(serde_json::json!([30])),
        "unexpected age at $.profile.age: {age:?}"
    );

    let interests = client.json_get(key, Some("$.profile.interests")).await?;
    info!("retrieved interests: {interests:?}");

    client.delete(&[key]).await?;
    info!("json test succeeded");
    Ok(())
}
