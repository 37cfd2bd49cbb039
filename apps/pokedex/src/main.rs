mod config;
mod console;
mod render;
mod shell;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{Pokedex, SpeciesLoader};
use storage::CacheStorage;
use tracing::{info, warn};
use url::Url;
use worker::{
    register, Fetcher, NotificationCenter, NotificationPermissions, OfflineNetwork,
    ReqwestNetwork, WorkerConfig, WorkerRegistration,
};

use crate::{
    config::{load_settings, Settings},
    console::{Console, ConsoleNotifier},
};

#[derive(Parser, Debug)]
#[command(about = "Browse the Pokédex from the terminal")]
struct Args {
    #[arg(long, default_value = "pokedex.toml")]
    config: PathBuf,
    #[arg(long)]
    api_base_url: Option<String>,
    /// Number of species requested from the listing endpoint.
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    cache_db: Option<String>,
    /// Origin the application shell is pre-cached from at install.
    #[arg(long)]
    shell_origin: Option<String>,
    /// Talk to the network directly without registering the worker.
    #[arg(long)]
    no_worker: bool,
    /// Fail every network request so only cached responses are served.
    #[arg(long)]
    offline: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.api_base_url {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = self.limit {
            settings.listing_limit = v;
        }
        if let Some(v) = &self.cache_db {
            settings.cache_database_url = v.clone();
        }
        if let Some(v) = &self.shell_origin {
            settings.shell_origin = Some(v.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut settings, config_error) = load_settings(&args.config);
    args.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    if let Some(err) = config_error {
        warn!(error = format!("{err:#}"), "ignoring config file, using defaults");
    }

    let network: Arc<dyn Fetcher> = if args.offline {
        Arc::new(OfflineNetwork)
    } else {
        Arc::new(ReqwestNetwork::new())
    };
    let permissions = NotificationPermissions::default();

    let registration = if args.no_worker {
        None
    } else {
        match start_worker(&settings, network.clone(), permissions.clone()).await {
            Ok(registration) => Some(registration),
            Err(err) => {
                warn!(error = %err, "worker registration failed, continuing without it");
                None
            }
        }
    };

    let worker = registration.as_ref().map(WorkerRegistration::handle);
    let fetcher: Arc<dyn Fetcher> = match &worker {
        Some(handle) => Arc::new(handle.clone()),
        None => network,
    };

    let loader = SpeciesLoader::new(fetcher, settings.loader_config());
    let mut pokedex = Pokedex::new(loader, worker, Arc::new(ConsoleNotifier), permissions);
    let console = Console::new(tokio::io::BufReader::new(tokio::io::stdin()), std::io::stdout());

    shell::run(&mut pokedex, &console).await?;

    if let Some(registration) = registration {
        registration.unregister();
    }
    Ok(())
}

async fn start_worker(
    settings: &Settings,
    network: Arc<dyn Fetcher>,
    permissions: NotificationPermissions,
) -> Result<WorkerRegistration> {
    let database_url = settings.database_url();
    let storage = CacheStorage::new(&database_url)
        .await
        .with_context(|| format!("failed to open cache database {database_url}"))?;

    let shell_origin = settings
        .shell_origin
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("invalid shell origin")?;

    let config = WorkerConfig {
        api_host: settings.api_host(),
        shell_origin,
        ..WorkerConfig::default()
    };
    let notifications = NotificationCenter::new(Arc::new(ConsoleNotifier), permissions);
    let registration = register(config, storage, network, notifications).await?;
    info!(%database_url, "worker registered");
    Ok(registration)
}
