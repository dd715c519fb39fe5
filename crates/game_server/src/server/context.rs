//! Shared server state handed to connections, handlers and the simulation loop.

use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::dispatch::DispatchTable;
use crate::error::ServerError;
use crate::world::World;
use realm_codec::{Direction, SchemaRegistry};
use std::sync::Arc;
use tokio::time::Instant;

/// Cheap, cloneable handle to everything a handler may need.
///
/// There is no global server instance; every component receives a
/// `ServerContext` explicitly.
#[derive(Clone)]
pub struct ServerContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: ServerConfig,
    registry: Arc<SchemaRegistry>,
    dispatch: DispatchTable,
    connections: ConnectionManager,
    world: Arc<dyn World>,
    started_at: Instant,
}

impl ServerContext {
    /// Builds the context and checks it for startup errors.
    ///
    /// # Errors
    ///
    /// * A non-positive simulation step or a backlog smaller than one step
    /// * A handler registered for a packet type with no inbound schema
    pub fn new(
        config: ServerConfig,
        registry: Arc<SchemaRegistry>,
        dispatch: DispatchTable,
        world: Arc<dyn World>,
    ) -> Result<Self, ServerError> {
        if config.simulation_step.is_zero() {
            return Err(ServerError::Internal("simulation step must be positive".to_string()));
        }
        if config.max_backlog < config.simulation_step {
            return Err(ServerError::Internal(
                "max backlog must be at least one simulation step".to_string(),
            ));
        }

        for (type_id, name) in dispatch.handler_types() {
            let has_schema = registry
                .schemas(Direction::Inbound)
                .any(|schema| schema.type_id == type_id);
            if !has_schema {
                return Err(ServerError::Internal(format!(
                    "handler registered for {name}, which has no inbound schema"
                )));
            }
        }

        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                registry,
                dispatch,
                connections: ConnectionManager::new(),
                world,
                started_at: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.inner.registry
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.inner.dispatch
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.inner.connections
    }

    pub fn world(&self) -> &Arc<dyn World> {
        &self.inner.world
    }

    /// Milliseconds since the server context was created, wrapping at `u32`.
    pub fn server_time(&self) -> u32 {
        self.inner.started_at.elapsed().as_millis() as u32
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", &self.inner.config)
            .field("connections", &self.inner.connections.len())
            .field("dispatch", &self.inner.dispatch)
            .finish()
    }
}
