//! Per-client connection state.
//!
//! A [`Connection`] is shared between its receive task, its writer task, the
//! live set and any handler that sends to it. All mutable state sits behind
//! atomics or short-lived `parking_lot` locks that are never held across an
//! await point.

use crate::connection::phase::Phase;
use crate::connection::ConnectionId;
use crate::error::ServerError;
use crate::server::ServerContext;
use crate::world::EntityId;
use bytes::Bytes;
use parking_lot::Mutex;
use realm_codec::{codec, Direction, MessageSchema, Packet, SchemaRegistry};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Account a connection authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connected client.
pub struct Connection {
    id: ConnectionId,
    remote_addr: SocketAddr,
    phase: AtomicU8,
    identity: Mutex<Option<AccountId>>,
    entity: Mutex<Option<EntityId>>,
    /// Dropped on teardown, which ends the writer task and releases the socket
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    sequence: AtomicU8,
    close_requested: AtomicBool,
    torn_down: AtomicBool,
    close_signal: Notify,
    registry: Arc<SchemaRegistry>,
}

impl Connection {
    /// Creates a connection in the `Authenticating` phase.
    ///
    /// # Arguments
    ///
    /// * `id` - Live-set key, unique for the lifetime of the server
    /// * `remote_addr` - Peer address
    /// * `registry` - Schemas used to encode outbound packets
    /// * `outbound` - Queue drained by the connection's writer task
    pub fn new(
        id: ConnectionId,
        remote_addr: SocketAddr,
        registry: Arc<SchemaRegistry>,
        outbound: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            remote_addr,
            phase: AtomicU8::new(Phase::Authenticating.as_u8()),
            identity: Mutex::new(None),
            entity: Mutex::new(None),
            outbound: Mutex::new(Some(outbound)),
            sequence: AtomicU8::new(0),
            close_requested: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            close_signal: Notify::new(),
            registry,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire)).unwrap_or(Phase::Closing)
    }

    /// Moves the connection to `phase`. A closing connection stays closing.
    ///
    /// Returns `false` when the transition was refused.
    pub fn set_phase(&self, phase: Phase) -> bool {
        let result = self
            .phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != Phase::Closing.as_u8()).then_some(phase.as_u8())
            });
        match result {
            Ok(previous) => {
                debug!(
                    connection = %self.id,
                    "Phase {} -> {}",
                    Phase::from_u8(previous).unwrap_or(Phase::Closing),
                    phase
                );
                true
            }
            Err(_) => false,
        }
    }

    pub fn identity(&self) -> Option<AccountId> {
        *self.identity.lock()
    }

    pub fn set_identity(&self, account: AccountId) {
        *self.identity.lock() = Some(account);
    }

    pub fn entity(&self) -> Option<EntityId> {
        *self.entity.lock()
    }

    pub fn set_entity(&self, entity: EntityId) {
        *self.entity.lock() = Some(entity);
    }

    pub fn take_entity(&self) -> Option<EntityId> {
        self.entity.lock().take()
    }

    /// Encodes `packet` with its outbound schema and queues it, waiting for
    /// queue space if needed.
    pub async fn send<P: Packet>(&self, packet: &P) -> Result<(), ServerError> {
        let frame = self.encode(packet)?;
        let sender = self.sender()?;
        sender
            .send(frame)
            .await
            .map_err(|_| ServerError::ConnectionClosed(self.id))
    }

    /// Like [`send`](Self::send) but fails with [`ServerError::QueueFull`]
    /// instead of waiting. Usable from synchronous hooks.
    pub fn try_send<P: Packet>(&self, packet: &P) -> Result<(), ServerError> {
        let frame = self.encode(packet)?;
        self.sender()?.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ServerError::QueueFull(self.id),
            TrySendError::Closed(_) => ServerError::ConnectionClosed(self.id),
        })
    }

    fn encode<P: Packet>(&self, packet: &P) -> Result<Bytes, ServerError> {
        let schema: &MessageSchema = self
            .registry
            .schema_for::<P>(Direction::Outbound)
            .ok_or(ServerError::Unregistered(std::any::type_name::<P>()))?;
        let sequence = if schema.sequenced {
            self.sequence.fetch_add(1, Ordering::Relaxed)
        } else {
            0
        };
        Ok(Bytes::from(codec::encode_with_sequence(schema, packet, sequence)?))
    }

    fn sender(&self) -> Result<mpsc::Sender<Bytes>, ServerError> {
        self.outbound
            .lock()
            .clone()
            .ok_or(ServerError::ConnectionClosed(self.id))
    }

    /// Asks the receive task to stop. Any handler already running for this
    /// connection finishes first; teardown follows.
    pub fn request_close(&self) {
        if !self.close_requested.swap(true, Ordering::AcqRel) {
            debug!(connection = %self.id, "Close requested");
            self.close_signal.notify_one();
        }
    }

    pub fn is_closing(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    /// Resolves once [`request_close`](Self::request_close) has been called.
    pub async fn close_requested(&self) {
        while !self.is_closing() {
            self.close_signal.notified().await;
        }
    }

    /// Tears the connection down. Runs at most once; later calls return
    /// immediately.
    ///
    /// Steps, in order: despawn the linked entity and wait for it, run the
    /// close hooks, remove the connection from the live set, drop the send
    /// queue so the writer flushes and releases the socket. A failing step is
    /// logged and the rest still run.
    pub async fn close(self: &Arc<Self>, server: &ServerContext) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.request_close();
        self.phase.store(Phase::Closing.as_u8(), Ordering::Release);

        if let Some(entity) = self.take_entity() {
            if let Err(e) = server.world().despawn_entity(entity).await {
                error!(connection = %self.id, "Failed to despawn entity {}: {}", entity, e);
            }
        }

        server.dispatch().run_close_hooks(self, server).await;

        if server.connections().remove(self.id).is_none() {
            debug!(connection = %self.id, "Connection was not in the live set");
        }

        self.outbound.lock().take();

        info!("👋 Connection {} from {} closed", self.id, self.remote_addr);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("phase", &self.phase())
            .field("identity", &self.identity())
            .field("entity", &self.entity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_codec::{packet, SchemaRegistry};

    packet! {
        pub struct Pulse(tag = 0x30, direction = Outbound, sequenced = true) {
            0 => pub value: u8,
        }
    }

    packet! {
        pub struct Unlisted(tag = 0x31, direction = Outbound) {}
    }

    fn connection(capacity: usize) -> (Connection, mpsc::Receiver<Bytes>) {
        let mut builder = SchemaRegistry::builder();
        builder.register::<Pulse>().unwrap();
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Connection::new(
            ConnectionId(1),
            "127.0.0.1:4000".parse().unwrap(),
            Arc::new(builder.build()),
            tx,
        );
        (conn, rx)
    }

    #[tokio::test]
    async fn sequenced_sends_count_up() {
        let (conn, mut rx) = connection(4);
        conn.send(&Pulse { value: 9 }).await.unwrap();
        conn.send(&Pulse { value: 9 }).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_ref(), &[0x30, 0, 9]);
        assert_eq!(rx.recv().await.unwrap().as_ref(), &[0x30, 1, 9]);
    }

    #[tokio::test]
    async fn unregistered_packet_is_an_error() {
        let (conn, _rx) = connection(4);
        assert!(matches!(
            conn.send(&Unlisted {}).await,
            Err(ServerError::Unregistered(_))
        ));
    }

    #[test]
    fn try_send_fails_on_full_queue() {
        let (conn, _rx) = connection(1);
        conn.try_send(&Pulse { value: 1 }).unwrap();
        assert!(matches!(
            conn.try_send(&Pulse { value: 2 }),
            Err(ServerError::QueueFull(ConnectionId(1)))
        ));
    }

    #[test]
    fn closing_phase_is_terminal() {
        let (conn, _rx) = connection(1);
        assert_eq!(conn.phase(), Phase::Authenticating);
        assert!(conn.set_phase(Phase::LoggedIn));
        conn.phase.store(Phase::Closing.as_u8(), Ordering::Release);
        assert!(!conn.set_phase(Phase::InWorld));
        assert_eq!(conn.phase(), Phase::Closing);
    }

    #[tokio::test]
    async fn close_request_wakes_waiter() {
        let (conn, _rx) = connection(1);
        let conn = Arc::new(conn);
        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.close_requested().await })
        };
        conn.request_close();
        waiter.await.unwrap();
        assert!(conn.is_closing());
    }
}
