//! mailprobe - Email verification entry point

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mailprobe_common::config::{Config, LoggingConfig};
use mailprobe_common::types::ExecutionMode;
use mailprobe_core::Verifier;
use mailprobe_storage::{
    BlacklistRepository, DatabasePool, DbBlacklistRepository, DbSkipListRepository,
    MemoryBlacklistRepository, MemorySkipListRepository, SkipListRepository, UpsertSkipListEntry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mailprobe")]
#[command(version)]
#[command(about = "Email deliverability verification", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./mailprobe.toml or /etc/mailprobe/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify addresses and print one JSON result per line
    Verify {
        /// Fail with an error instead of skipping SMTP when a domain is rate limited
        #[arg(long)]
        retryable: bool,
        /// Addresses to verify
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Maintain the MX skip-list
    SkipList {
        #[command(subcommand)]
        command: SkipListCommands,
    },
}

#[derive(Subcommand)]
enum SkipListCommands {
    /// Delete expired automatic entries
    Cleanup,
    /// Exclude a host from probing until removed
    Add {
        host: String,
        #[arg(long, default_value = "manual")]
        reason: String,
    },
    /// Remove a host
    Remove { host: String },
    /// Print every entry as JSON
    List,
}

struct Stores {
    skip_list: Arc<dyn SkipListRepository>,
    blacklist: Arc<dyn BlacklistRepository>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.logging);

    if let Commands::SkipList { command } = &cli.command {
        require_database(&config, command)?;
    }
    let stores = open_stores(&config).await?;

    match cli.command {
        Commands::Verify {
            retryable,
            addresses,
        } => verify(&config, stores, retryable, &addresses).await,
        Commands::SkipList { command } => skip_list(stores.skip_list, command).await,
    }
}

async fn verify(config: &Config, stores: Stores, retryable: bool, addresses: &[String]) -> Result<()> {
    let verifier = Verifier::builder(config.clone())
        .skip_list(stores.skip_list)
        .blacklist(stores.blacklist)
        .build()?;

    let mode = if retryable {
        ExecutionMode::Retryable
    } else {
        ExecutionMode::Interactive
    };

    for address in addresses {
        match verifier.verify_with_mode(address, mode).await {
            Ok(result) => println!("{}", serde_json::to_string(&result)?),
            Err(e) => {
                warn!(address = %address, "Verification deferred: {}", e);
                let deferred = serde_json::json!({
                    "email": address,
                    "error": e.code(),
                    "retry_after_secs": e.retry_after(),
                });
                println!("{}", deferred);
            }
        }
    }
    Ok(())
}

async fn skip_list(repo: Arc<dyn SkipListRepository>, command: SkipListCommands) -> Result<()> {
    match command {
        SkipListCommands::Cleanup => {
            let removed = repo.cleanup_expired().await?;
            info!(removed, "Skip-list cleanup finished");
            println!("{}", removed);
        }
        SkipListCommands::Add { host, reason } => {
            let entry = repo.upsert(UpsertSkipListEntry::new(host, reason).manual()).await?;
            println!("{}", serde_json::to_string(&entry)?);
        }
        SkipListCommands::Remove { host } => {
            let removed = repo.remove(&host).await?;
            if !removed {
                warn!(mx_host = %host, "Host was not on the skip-list");
            }
        }
        SkipListCommands::List => {
            for entry in repo.list().await? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }
    Ok(())
}

/// Skip-list edits are discarded on exit unless they land in a database
fn require_database(config: &Config, command: &SkipListCommands) -> Result<()> {
    let edits = matches!(
        command,
        SkipListCommands::Add { .. } | SkipListCommands::Remove { .. }
    );
    if edits && config.database.is_none() {
        bail!("skip-list add/remove needs a [database] section; the in-memory store does not persist");
    }
    Ok(())
}

/// Postgres-backed stores when a database is configured, in-memory otherwise
async fn open_stores(config: &Config) -> Result<Stores> {
    let Some(database) = &config.database else {
        info!("No database configured, using in-memory stores");
        return Ok(Stores {
            skip_list: Arc::new(MemorySkipListRepository::new()),
            blacklist: Arc::new(MemoryBlacklistRepository::new()),
        });
    };

    let pool = DatabasePool::new(database).await?;
    pool.health_check().await?;
    pool.migrate().await?;
    Ok(Stores {
        skip_list: Arc::new(DbSkipListRepository::new(pool.clone())),
        blacklist: Arc::new(DbBlacklistRepository::new(pool)),
    })
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},mailprobe=debug", config.level)));

    // stdout carries results, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailprobe_common::config::DatabaseConfig;

    fn skip_list_command(args: &[&str]) -> SkipListCommands {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::SkipList { command } => command,
            Commands::Verify { .. } => panic!("expected a skip-list command"),
        }
    }

    #[test]
    fn test_skip_list_edits_need_a_database() {
        let config = Config::default();
        let add = skip_list_command(&["mailprobe", "skip-list", "add", "mx.acme.test"]);
        let remove = skip_list_command(&["mailprobe", "skip-list", "remove", "mx.acme.test"]);
        assert!(require_database(&config, &add).is_err());
        assert!(require_database(&config, &remove).is_err());

        let list = skip_list_command(&["mailprobe", "skip-list", "list"]);
        let cleanup = skip_list_command(&["mailprobe", "skip-list", "cleanup"]);
        assert!(require_database(&config, &list).is_ok());
        assert!(require_database(&config, &cleanup).is_ok());
    }

    #[test]
    fn test_skip_list_edits_with_database() {
        let mut config = Config::default();
        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/mailprobe".to_string(),
            max_connections: 5,
            min_connections: 1,
        });
        let add = skip_list_command(&["mailprobe", "skip-list", "add", "mx.acme.test", "--reason", "abuse"]);
        assert!(require_database(&config, &add).is_ok());
    }

    #[test]
    fn test_verify_requires_an_address() {
        assert!(Cli::try_parse_from(["mailprobe", "verify"]).is_err());
        assert!(Cli::try_parse_from(["mailprobe", "verify", "--retryable", "jane@acme.test"]).is_ok());
    }
}
