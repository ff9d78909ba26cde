//! ddbcache CLI entry point.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ddbcache::{Config, DynamoDbStore};
use ddbcache_core::cache::{LockProvider, Store};

/// Inspect and modify a DynamoDB-backed cache table.
#[derive(Debug, Parser)]
#[command(name = "ddbcache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Table name (overrides DYNAMODB_CACHE_TABLE).
    #[arg(long, global = true)]
    table: Option<String>,

    /// Key prefix (overrides CACHE_PREFIX).
    #[arg(long, global = true)]
    prefix: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Read a value.
    Get { key: String },
    /// Read several values.
    Many {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Store a value.
    Put {
        key: String,
        /// JSON value; anything that is not valid JSON is stored as a string.
        value: String,
        /// Time to live in seconds.
        #[arg(long, default_value = "300")]
        ttl: u64,
    },
    /// Store a value only if the key is missing or expired.
    Add {
        key: String,
        value: String,
        /// Time to live in seconds.
        #[arg(long, default_value = "300")]
        ttl: u64,
    },
    /// Store a value without a practical expiration.
    Forever { key: String, value: String },
    /// Add to a live numeric value.
    Increment {
        key: String,
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        by: i64,
    },
    /// Subtract from a live numeric value.
    Decrement {
        key: String,
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        by: i64,
    },
    /// Delete a value.
    Forget { key: String },
    /// Delete every value (not supported by DynamoDB).
    Flush,
    /// Try to acquire a lock and print its owner token.
    Lock {
        name: String,
        /// Lock duration in seconds. 0 holds the lock for a day.
        #[arg(long, default_value = "0")]
        ttl: u64,
        /// Owner token; random when omitted.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Release a lock held by the given owner token.
    Unlock { name: String, owner: String },
}

/// Parses a command line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ddbcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();
    if let Some(table) = cli.table {
        config.table_name = table;
    }
    if let Some(prefix) = cli.prefix {
        config.prefix = prefix;
    }

    tracing::debug!(table = %config.target_display(), "Using cache table");
    let store = DynamoDbStore::from_config(&config).await;

    let output = match cli.command {
        Commands::Get { key } => store.get(&key).await?.unwrap_or(Value::Null),
        Commands::Many { keys } => {
            let values: HashMap<String, Value> = store
                .many(&keys)
                .await?
                .into_iter()
                .map(|(key, value)| (key, value.unwrap_or(Value::Null)))
                .collect();
            json!(values)
        }
        Commands::Put { key, value, ttl } => {
            store
                .put(&key, &parse_value(&value), Duration::from_secs(ttl))
                .await?;
            json!(true)
        }
        Commands::Add { key, value, ttl } => {
            let added = store
                .add(&key, &parse_value(&value), Duration::from_secs(ttl))
                .await?;
            json!(added)
        }
        Commands::Forever { key, value } => {
            store.forever(&key, &parse_value(&value)).await?;
            json!(true)
        }
        Commands::Increment { key, by } => json!(store.increment(&key, by).await?),
        Commands::Decrement { key, by } => json!(store.decrement(&key, by).await?),
        Commands::Forget { key } => {
            store.forget(&key).await?;
            json!(true)
        }
        Commands::Flush => {
            store.flush().await?;
            json!(true)
        }
        Commands::Lock { name, ttl, owner } => {
            let lock = store.lock(&name, Duration::from_secs(ttl), owner);
            let acquired = lock.acquire().await?;
            json!({ "acquired": acquired, "owner": lock.owner() })
        }
        Commands::Unlock { name, owner } => {
            let released = store.restore_lock(&name, &owner).release().await?;
            json!(released)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
