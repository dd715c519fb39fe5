//! Core game server implementation.
//!
//! This module contains the `GameServer` host: it owns the listening socket,
//! runs the accept loop and the simulation task, and coordinates graceful
//! shutdown of every live connection.

use crate::config::ServerConfig;
use crate::dispatch::DispatchTable;
use crate::error::ServerError;
use crate::server::handlers::handle_connection;
use crate::server::ServerContext;
use crate::simulation;
use crate::world::World;
use realm_codec::SchemaRegistry;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// The server host.
///
/// `GameServer` wires the schema registry, the dispatch table and the world
/// collaborator together behind a [`ServerContext`], accepts TCP clients and
/// drives the fixed-step simulation.
///
/// # Lifecycle
///
/// 1. [`GameServer::new`] validates the configuration and handler set
/// 2. [`GameServer::start`] (or [`bind`](Self::bind) + [`serve`](Self::serve))
///    runs until [`GameServer::shutdown`] is called
/// 3. On shutdown the accept loop and simulation stop, every connection is
///    asked to close and their teardown is awaited
pub struct GameServer {
    context: ServerContext,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,

    /// Set once shutdown was requested, even before `serve` subscribed
    stopping: AtomicBool,
}

impl GameServer {
    /// Creates a new game server.
    ///
    /// # Arguments
    ///
    /// * `config` - Network and simulation settings
    /// * `registry` - The frozen schema registry
    /// * `dispatch` - Handlers and lifecycle hooks
    /// * `world` - The world collaborator advanced by the simulation loop
    pub fn new(
        config: ServerConfig,
        registry: Arc<SchemaRegistry>,
        dispatch: DispatchTable,
        world: Arc<dyn World>,
    ) -> Result<Self, ServerError> {
        let context = ServerContext::new(config, registry, dispatch, world)?;
        let (shutdown_sender, _) = broadcast::channel(1);
        Ok(Self {
            context,
            shutdown_sender,
            stopping: AtomicBool::new(false),
        })
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates the listening socket with `socket2` and hands it to tokio.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let config = self.context.config();
        let domain = if config.bind_address.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        socket.set_reuse_address(true).ok();

        if config.use_reuse_port {
            #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "macos"))]
            {
                match socket.set_reuse_port(true) {
                    Ok(()) => info!("SO_REUSEPORT enabled"),
                    Err(e) => warn!("Failed to set SO_REUSEPORT: {}", e),
                }
            }
            #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "macos")))]
            {
                warn!("SO_REUSEPORT is not supported on this platform. Using SO_REUSEADDR only.");
            }
        }

        socket
            .bind(&config.bind_address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking mode: {e}")))?;

        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;

        info!("✅ Listener bound on {}", config.bind_address);
        Ok(listener)
    }

    /// Runs the accept loop and the simulation task on `listener` until
    /// shutdown is requested.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let context = self.context.clone();
        let config = context.config().clone();
        info!(
            "🚀 Starting game server on {}",
            listener.local_addr().map_err(ServerError::Io)?
        );

        // Subscribe before spawning anything so an early shutdown is not missed
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let simulation = tokio::spawn(simulation::run(
            context.world().clone(),
            config.simulation_step,
            config.max_backlog,
            self.shutdown_sender.subscribe(),
        ));
        if self.stopping.load(Ordering::SeqCst) {
            let _ = self.shutdown_sender.send(());
        }

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if connections.len() >= config.max_connections {
                            warn!("⚠️ Connection limit ({}) reached, dropping {}", config.max_connections, addr);
                            continue;
                        }
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let context = context.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, context).await {
                                error!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("🧹 Performing server cleanup...");
        drop(listener);

        context.connections().request_close_all();
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                error!("Connection task failed: {}", e);
            }
        }

        if let Err(e) = simulation.await {
            error!("Simulation task failed: {}", e);
        }

        info!("✅ Server cleanup completed");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Signals the accept loop and the simulation to stop; `serve` then
    /// closes every live connection before returning.
    pub fn shutdown(&self) {
        info!("🛑 Shutting down server...");
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown_sender.send(());
    }
}
