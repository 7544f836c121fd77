//! # mycloud
//!
//! Command line front end for the MyCloud storage service. The session
//! token is sealed and kept in the platform data directory, so commands
//! after `mycloud login` run as the signed-in account.

mod cli;
mod commands;
mod prompt;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use mycloud_client::{ClientConfig, FileStorage, Store, TokenVault};

use crate::cli::Cli;

fn build_store(cli: &Cli) -> anyhow::Result<Store> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url);
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    debug!(?config, "Loaded configuration");

    let data_dir = config.resolve_data_dir()?;
    let storage = FileStorage::open(&data_dir)?;
    let vault = TokenVault::new(Arc::new(storage), &config.crypto_secret);
    Ok(Store::from_config(&config, vault)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mycloud_cli=info,mycloud_client=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let store = match build_store(&cli) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel.cancel(),
                Err(e) => warn!(error = %e, "Could not listen for Ctrl+C"),
            }
        }
    });

    let result = commands::run(cli.command, &store, &cancel).await;
    ExitCode::from(exit_status(result, cancel.is_cancelled()))
}

/// Ctrl+C wins over the command's own result, even when it wound down cleanly.
fn exit_status(result: anyhow::Result<()>, cancelled: bool) -> u8 {
    match result {
        _ if cancelled => {
            eprintln!("Cancelled");
            130
        }
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}
