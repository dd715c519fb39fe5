//! The dispatch table: packet handlers, phase gating and lifecycle hooks.

use crate::connection::{Connection, Phase, PhaseSet};
use crate::dispatch::handler::{HandlerResult, PacketContext, PacketHandler, TypedPacketHandler};
use crate::error::HandlerError;
use crate::server::ServerContext;
use futures::future::BoxFuture;
use futures::FutureExt;
use realm_codec::{DecodedRecord, Packet};
use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

type NewConnectionHook = Arc<dyn Fn(&Connection) -> bool + Send + Sync>;
type LifecycleHook =
    Arc<dyn Fn(Arc<Connection>, ServerContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct HandlerEntry {
    phases: PhaseSet,
    handler: Arc<dyn PacketHandler>,
}

/// What happened to one inbound packet.
#[derive(Debug)]
pub enum Dispatch {
    /// The handler ran and returned this result
    Handled(HandlerResult),
    /// A handler exists but not for the connection's current phase
    WrongPhase(Phase),
    /// The packet type has a schema but no handler
    Unhandled,
}

/// Maps packet types to handlers and holds the connection lifecycle hooks.
///
/// Filled in before the server starts and frozen behind an `Arc` afterwards.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<TypeId, HandlerEntry>,
    new_connection: Vec<NewConnectionHook>,
    handshake_complete: Vec<LifecycleHook>,
    close: Vec<LifecycleHook>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the async handler for packets of type `P`.
    ///
    /// The handler only runs while the connection's phase is in `phases`.
    /// Registering a second handler for the same type replaces the first.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// table.register_handler(Phase::InWorld.into(), |ctx: PacketContext<ChatIncoming>| async move {
    ///     ctx.server.connections().broadcast(&reply, Phase::InWorld.into());
    ///     Ok(())
    /// });
    /// ```
    pub fn register_handler<P, F, Fut>(&mut self, phases: PhaseSet, handler: F) -> &mut Self
    where
        P: Packet,
        F: Fn(PacketContext<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = P::declaration().name;
        let entry = HandlerEntry {
            phases,
            handler: Arc::new(TypedPacketHandler::new(name, handler)),
        };
        if self.handlers.insert(TypeId::of::<P>(), entry).is_some() {
            warn!("⚠️ Handler for {} registered twice, keeping the latest", name);
        }
        self
    }

    /// Adds a filter run when a connection is accepted. Any hook returning
    /// `false` rejects the connection before it joins the live set.
    pub fn on_new_connection<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Connection) -> bool + Send + Sync + 'static,
    {
        self.new_connection.push(Arc::new(hook));
        self
    }

    /// Adds a hook run after the connection is admitted and before its first
    /// packet is read.
    pub fn on_handshake_complete<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Arc<Connection>, ServerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handshake_complete
            .push(Arc::new(move |connection, server| hook(connection, server).boxed()));
        self
    }

    /// Adds a hook run during connection teardown, after the linked entity is
    /// despawned and before the connection leaves the live set.
    pub fn on_close<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Arc<Connection>, ServerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.close
            .push(Arc::new(move |connection, server| hook(connection, server).boxed()));
        self
    }

    pub fn has_handler(&self, type_id: TypeId) -> bool {
        self.handlers.contains_key(&type_id)
    }

    /// Type ids and names of every registered handler.
    pub fn handler_types(&self) -> impl Iterator<Item = (TypeId, &str)> {
        self.handlers
            .values()
            .map(|entry| (entry.handler.expected_type_id(), entry.handler.handler_name()))
    }

    pub(crate) fn accepts(&self, connection: &Connection) -> bool {
        self.new_connection.iter().all(|hook| hook(connection))
    }

    /// Runs the handshake hooks in registration order. Stops at the first
    /// close request; other failures are logged.
    pub(crate) async fn run_handshake_complete(
        &self,
        connection: &Arc<Connection>,
        server: &ServerContext,
    ) -> HandlerResult {
        for hook in &self.handshake_complete {
            match hook(connection.clone(), server.clone()).await {
                Ok(()) => {}
                Err(e @ HandlerError::Close(_)) => return Err(e),
                Err(e) => warn!(connection = %connection.id(), "Handshake hook failed: {}", e),
            }
        }
        Ok(())
    }

    pub(crate) async fn run_close_hooks(&self, connection: &Arc<Connection>, server: &ServerContext) {
        for hook in &self.close {
            if let Err(e) = hook(connection.clone(), server.clone()).await {
                error!(connection = %connection.id(), "Close hook failed: {}", e);
            }
        }
    }

    /// Routes a decoded record to its handler if the connection's phase allows it.
    pub async fn dispatch(
        &self,
        connection: &Arc<Connection>,
        record: DecodedRecord,
        server: &ServerContext,
    ) -> Dispatch {
        let Some(entry) = self.handlers.get(&record.type_id) else {
            debug!(connection = %connection.id(), "No handler for {}", record.type_name);
            return Dispatch::Unhandled;
        };

        let phase = connection.phase();
        if !entry.phases.contains(phase) {
            return Dispatch::WrongPhase(phase);
        }

        Dispatch::Handled(
            entry
                .handler
                .handle(connection.clone(), record, server.clone())
                .await,
        )
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("handlers", &self.handlers.len())
            .field("new_connection_hooks", &self.new_connection.len())
            .field("handshake_hooks", &self.handshake_complete.len())
            .field("close_hooks", &self.close.len())
            .finish()
    }
}
