// # gladnsd - Gladius DNS Daemon
//
// The gladnsd daemon is responsible for:
// 1. Parsing flags and environment variables
// 2. Initializing logging and the runtime
// 3. Building the connector registry
// 4. Connecting the selected backend
// 5. Running the sync engine until SIGTERM/SIGINT
//
// All reconciliation logic lives in gladns-core; this binary only wires the
// pieces together.
//
// ## Example
//
// ```bash
// export DO_API_KEY=your_token
// gladnsd --gateway_url http://127.0.0.1:3001 digitalocean --domain yourpool.com
//
// # Delete the record of one node and exit
// gladnsd digitalocean --domain yourpool.com --remove 0xabc
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use gladns_core::{Connector, ConnectorRegistry, GladnsConfig, SyncEngine};
use gladns_gateway::GatewayPoller;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::cli::{Cli, Command};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum GladnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure (including a failed connect)
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<GladnsExitCode> for ExitCode {
    fn from(code: GladnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Where a daemon run failed
enum Failure {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> GladnsExitCode {
        match self {
            Failure::Startup(_) => GladnsExitCode::ConfigError,
            Failure::Runtime(_) => GladnsExitCode::RuntimeError,
        }
    }

    fn error(&self) -> &anyhow::Error {
        match self {
            Failure::Startup(e) | Failure::Runtime(e) => e,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                GladnsExitCode::ConfigError.into()
            } else {
                GladnsExitCode::CleanShutdown.into()
            };
        }
    };

    let log_level = match cli.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return GladnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return GladnsExitCode::ConfigError.into();
    }

    let registry = build_registry();

    let config = match cli.command {
        Command::List => {
            for name in registry.list() {
                println!("{}", name);
            }
            return GladnsExitCode::CleanShutdown.into();
        }
        _ => cli.config(),
    };

    let Some(config) = config else {
        return GladnsExitCode::ConfigError.into();
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return GladnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return GladnsExitCode::RuntimeError.into();
        }
    };

    let removals = cli.removals().to_vec();
    let result = rt.block_on(async {
        if removals.is_empty() {
            run_daemon(config, &registry).await
        } else {
            remove_nodes(config, &registry, &removals).await
        }
    });

    match result {
        Ok(()) => GladnsExitCode::CleanShutdown.into(),
        Err(failure) => {
            error!("{:#}", failure.error());
            failure.exit_code().into()
        }
    }
}

/// Registry with every connector compiled into this binary
fn build_registry() -> ConnectorRegistry {
    #[allow(unused_mut)]
    let mut registry = ConnectorRegistry::new();

    #[cfg(feature = "digitalocean")]
    gladns_provider_digitalocean::register(&mut registry);

    #[cfg(feature = "powerdns")]
    gladns_provider_powerdns::register(&mut registry);

    registry
}

/// Create the configured connector and connect it
async fn connect(
    config: &GladnsConfig,
    registry: &ConnectorRegistry,
) -> Result<Box<dyn Connector>, Failure> {
    let connector = registry
        .create(&config.backend)
        .context("Failed to create connector")
        .map_err(Failure::Startup)?;

    info!("Connecting to {}", connector.name());
    connector
        .connect()
        .await
        .context("Failed to connect")
        .map_err(Failure::Startup)?;

    Ok(connector)
}

/// Connect, delete the records of the given addresses and return
async fn remove_nodes(
    config: GladnsConfig,
    registry: &ConnectorRegistry,
    addresses: &[String],
) -> Result<(), Failure> {
    let connector = connect(&config, registry).await?;

    let mut failed = 0;
    for address in addresses {
        match connector.remove_node(address).await {
            Ok(()) => info!("Removed record for {}", address),
            Err(e) => {
                error!("Failed to remove record for {}: {}", address, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Failure::Runtime(anyhow::anyhow!(
            "{} of {} removal(s) failed",
            failed,
            addresses.len()
        )));
    }

    Ok(())
}

/// Connect and run the sync engine until a shutdown signal
async fn run_daemon(config: GladnsConfig, registry: &ConnectorRegistry) -> Result<(), Failure> {
    info!("Starting gladnsd daemon");

    let source = GatewayPoller::from_config(&config.gateway)
        .context("Failed to create gateway poller")
        .map_err(Failure::Startup)?;

    let connector = connect(&config, registry).await?;

    let (engine, _event_rx) = SyncEngine::new(Box::new(source), connector, &config.engine)
        .context("Failed to create engine")
        .map_err(Failure::Startup)?;

    let shutdown = ShutdownSignals::install().map_err(Failure::Runtime)?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let signal = shutdown.recv().await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    engine
        .run_with_shutdown(Some(shutdown_rx))
        .await
        .context("Engine stopped")
        .map_err(Failure::Runtime)?;

    info!("Shutting down daemon");
    Ok(())
}

/// SIGTERM and SIGINT handlers
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
        let sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal and return its name
    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// CTRL-C handler for non-Unix platforms
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    }
}
