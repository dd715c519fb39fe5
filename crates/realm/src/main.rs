//! Realm game server entry point.
//!
//! Loads the configuration, wires the realm handlers and in-memory
//! collaborators into the network core and serves until a termination signal
//! arrives.

mod accounts;
mod cli;
mod config;
mod handlers;
mod logging;
mod session;
mod signals;
mod world;

use accounts::InMemoryAccounts;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Args;
use config::AppConfig;
use game_server::GameServer;
use handlers::Realm;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use world::InMemoryWorld;

/// Interval of the periodic status line.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// The assembled server and the collaborators it reports on.
struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
    realm: Arc<Realm>,
    world: Arc<InMemoryWorld>,
}

impl Application {
    async fn new(args: Args) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config).await?;
        config.apply_args(&args);
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

        logging::setup_logging(&config.logging)?;
        display_banner();

        let registry = Arc::new(realm_protocol::registry().context("Failed to build the message registry")?);
        let accounts = Arc::new(InMemoryAccounts::from_settings(&config.accounts));
        let world = Arc::new(InMemoryWorld::new());
        let realm = Arc::new(Realm::new(accounts, world.clone()));

        let server = GameServer::new(
            config.to_server_config()?,
            registry,
            handlers::dispatch_table(realm.clone()),
            world.clone(),
        )?;
        info!("📂 Config: {}", args.config.display());

        Ok(Self {
            config,
            server: Arc::new(server),
            realm,
            world,
        })
    }

    async fn run(self) -> Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!(
            "  ⏱️ Simulation step: {}ms (backlog {}ms)",
            self.config.simulation.step_ms, self.config.simulation.max_backlog_ms
        );

        let listener = self.server.bind()?;
        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let monitoring_handle = {
            let server = self.server.clone();
            let realm = self.realm.clone();
            let world = self.world.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(STATUS_INTERVAL);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    info!(
                        "📊 {} connections | {} sessions | {} entities | {} simulation steps",
                        server.context().connections().len(),
                        realm.session_count(),
                        world.len().await,
                        world.steps()
                    );
                }
            })
        };

        info!("✅ Realm server started. Press Ctrl+C to stop.");
        if let Err(e) = signals::wait_for_shutdown_signal().await {
            error!("❌ Signal handling failed: {}", e);
        }

        info!("🛑 Shutdown signal received, stopping the server...");
        monitoring_handle.abort();
        self.server.shutdown();

        match server_handle.await {
            Ok(Ok(())) => info!("✅ Realm server stopped"),
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => return Err(anyhow!("Server task failed: {e}")),
        }
        Ok(())
    }
}

fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║              🏰 REALM SERVER             ║");
    info!("║                  v{:<8}               ║", version);
    info!("╚══════════════════════════════════════════╝");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let app = Application::new(args).await?;
    app.run().await
}
