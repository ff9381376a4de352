mod cli;
mod config;
mod storage;

use std::io::Write;

use crate::{
    cli::{Command, ConfigCommand},
    config::Backend,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use color_eyre::Result;
use keystash_core::storage::SecretStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    run(cli::Cli::parse(), config::load).await
}

async fn run(cli: cli::Cli, load_config: impl FnOnce() -> Result<config::Config>) -> Result<()> {
    // Version must work even when the config file is broken.
    if cli.command == Command::Version {
        print_version();
        return Ok(());
    }

    let config = load_config()?.with_overrides(cli.backend, cli.prefix);
    if discards_changes(&config, &cli.command) {
        warn!("memory backend keeps nothing between runs; use --backend aws to persist");
    }

    match cli.command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Get { name, base64 } => {
            let store = storage::store_from_config(&config).await?;
            run_get(&store, &name, base64).await?
        }
        Command::Put {
            name,
            value,
            base64,
        } => {
            let store = storage::store_from_config(&config).await?;
            run_put(&store, &name, &value, base64).await?
        }
        Command::Delete { name } => {
            let store = storage::store_from_config(&config).await?;
            store.delete(&name).await?;
            info!(%name, "deleted secret");
        }
        Command::Health => {
            let store = storage::store_from_config(&config).await?;
            run_store_health(&store).await?;
            println!("Storage: ok");
        }
    }

    Ok(())
}

/// Mutations against the in-process store vanish when the command exits.
fn discards_changes(config: &config::Config, command: &Command) -> bool {
    config.backend == Backend::Memory
        && matches!(command, Command::Put { .. } | Command::Delete { .. })
}

fn init_tracing() {
    // Respect user-provided filters, default to info; logs go to stderr so payloads on stdout stay clean.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("keystash {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

async fn run_get<S: SecretStore + ?Sized>(store: &S, name: &str, base64: bool) -> Result<()> {
    let Some(payload) = store.read(name).await? else {
        info!(%name, "secret not found");
        return Ok(());
    };

    let mut stdout = std::io::stdout().lock();
    if base64 {
        writeln!(stdout, "{}", STANDARD.encode(&payload))?;
    } else {
        writeln!(stdout, "{}", String::from_utf8_lossy(&payload))?;
    }
    Ok(())
}

async fn run_put<S: SecretStore + ?Sized>(
    store: &S,
    name: &str,
    value: &str,
    base64: bool,
) -> Result<()> {
    let payload = decode_value(value, base64)?;
    store.write(name, &payload).await?;
    info!(%name, bytes = payload.len(), "stored secret");
    Ok(())
}

fn decode_value(value: &str, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        return STANDARD
            .decode(value.trim())
            .map_err(|e| color_eyre::eyre::eyre!("invalid base64 value: {e}"));
    }
    Ok(value.as_bytes().to_vec())
}

async fn run_store_health<S: SecretStore + ?Sized>(store: &S) -> Result<()> {
    let probe_key = "health/probe";
    let payload = b"ok";
    store.write(probe_key, payload).await?;
    let round_trip = store.read(probe_key).await?;
    store.delete(probe_key).await?;

    if round_trip.as_deref() != Some(&payload[..]) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    if store.read(probe_key).await?.is_some() {
        color_eyre::eyre::bail!("probe secret still present after delete");
    }
    Ok(())
}
