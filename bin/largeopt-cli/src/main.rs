//! LargeOpt CLI - Admin Command Line Interface
//!
//! Reads and writes large options in a redb document store.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use largeopt_common::{Config, StorageStrategy};
use largeopt_registry::{LargeOptionRegistry, MapHostConfig};
use largeopt_store::{DocumentDb, MemoryCache};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "largeopt-cli")]
#[command(about = "LargeOpt Admin CLI")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "largeopt.toml", env = "LARGEOPT_CONFIG")]
    config: PathBuf,

    /// Document database path (overrides storage.path)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Storage strategy for new values (overrides registry.default_strategy)
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<StorageStrategy>,

    /// JSON object of host configuration values used as fallback
    #[arg(long)]
    host_config: Option<PathBuf>,

    /// Log level (overrides logging.level)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an option's value
    Get {
        /// Option name
        name: String,
        /// Printed when the option is missing
        #[arg(long)]
        default: Option<String>,
    },
    /// Add an option; fails if it already has a value
    Add {
        /// Option name
        name: String,
        /// Value as JSON
        value: String,
        /// Skip the existence check; a stored value is still kept
        #[arg(long)]
        force: bool,
    },
    /// Change an option's value; a falsy value deletes it
    Update {
        /// Option name
        name: String,
        /// Value as JSON
        value: String,
    },
    /// Delete an option
    Delete {
        /// Option name
        name: String,
    },
    /// List stored options
    List,
}

fn parse_strategy(s: &str) -> Result<StorageStrategy, String> {
    match s {
        "embedded" => Ok(StorageStrategy::Embedded),
        "attached" => Ok(StorageStrategy::Attached),
        other => Err(format!("unknown strategy '{other}', expected embedded or attached")),
    }
}

/// Parse a value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn load_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    Config::from_file(path).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config file: {e}");
        Config::default()
    })
}

fn load_host_config(path: &Path) -> Result<MapHostConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading host config {}", path.display()))?;
    let values: serde_json::Map<String, Value> =
        serde_json::from_str(&text).context("host config must be a JSON object")?;

    let host = MapHostConfig::new();
    for (name, value) in values {
        host.set(name, value);
    }
    Ok(host)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let mut config = load_config(&args.config);

    // CLI flags take precedence over the config file
    if let Some(db) = args.db {
        config.storage.path = db;
    }
    if let Some(strategy) = args.strategy {
        config.registry.default_strategy = strategy;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Config: {:?}", config);
    let store = Arc::new(
        DocumentDb::open(&config.storage.path)
            .with_context(|| format!("opening {}", config.storage.path.display()))?,
    );

    let mut builder = LargeOptionRegistry::builder(store)
        .with_cache(Arc::new(MemoryCache::new(config.cache.capacity)))
        .with_config(&config.registry);
    if let Some(path) = &args.host_config {
        builder = builder.with_host_config(Arc::new(load_host_config(path)?));
    }
    let registry = builder.build().context("registering document kind")?;

    match args.command {
        Commands::Get { name, default } => match registry.get(&name) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => match default {
                Some(default) => println!("{default}"),
                None => bail!("option '{name}' not found"),
            },
        },
        Commands::Add { name, value, force } => {
            if !registry.add(&name, parse_value(&value), !force) {
                bail!("option '{name}' was not added");
            }
            info!("Added option {}", name);
        }
        Commands::Update { name, value } => {
            if registry.update(&name, parse_value(&value)) {
                info!("Updated option {}", name);
            } else {
                println!("Option '{name}' unchanged");
            }
        }
        Commands::Delete { name } => {
            if !registry.delete(&name) {
                bail!("option '{name}' not found");
            }
            info!("Deleted option {}", name);
        }
        Commands::List => {
            let documents = registry.list()?;
            println!("Large Options ({})", registry.kind());
            println!("=============");
            if documents.is_empty() {
                println!("(none)");
            }
            for doc in documents {
                println!("{:>8}  {:<40}  {} bytes", doc.id, doc.name, doc.body_len);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use largeopt_registry::HostConfig;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(r#"{"a": [1, 2]}"#), json!({ "a": [1, 2] }));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("hello world"), json!("hello world"));
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("attached"), Ok(StorageStrategy::Attached));
        assert!(parse_strategy("inline").is_err());
    }

    #[test]
    fn test_cli_args() {
        let args = Args::try_parse_from([
            "largeopt-cli",
            "--db",
            "/tmp/x.redb",
            "--strategy",
            "attached",
            "add",
            "site_banner",
            "{}",
            "--force",
        ])
        .unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/x.redb")));
        assert!(matches!(args.command, Commands::Add { force: true, .. }));
    }

    #[test]
    fn test_load_host_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.json");
        std::fs::write(&path, r#"{"motd": "hi", "limits": {"max": 3}}"#).unwrap();

        let host = load_host_config(&path).unwrap();
        assert_eq!(host.get("motd"), Some(json!("hi")));
        assert_eq!(host.get("limits"), Some(json!({ "max": 3 })));

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_host_config(&path).is_err());
    }
}
