//! The live connection set.

use crate::connection::phase::PhaseSet;
use crate::connection::session::Connection;
use crate::connection::ConnectionId;
use crate::error::ServerError;
use dashmap::DashMap;
use realm_codec::Packet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks every admitted connection until its teardown removes it.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    next_id: AtomicU64,
    draining: AtomicBool,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh connection id.
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Adds a connection to the live set. Once the set is draining, newly
    /// inserted connections are asked to close right away.
    pub fn insert(&self, connection: Arc<Connection>) {
        self.connections.insert(connection.id(), connection.clone());
        if self.draining.load(Ordering::SeqCst) {
            connection.request_close();
        }
    }

    pub fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.remove(&id).map(|(_, connection)| connection)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Clones the current members out of the map so no shard lock is held
    /// while the caller awaits.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Queues `packet` for every live connection whose phase is in `phases`.
    ///
    /// Never waits on a send queue. A member whose queue is full misses the
    /// packet and is asked to close; other failed sends are logged and
    /// skipped. Returns the number of connections the packet was queued for.
    pub fn broadcast<P: Packet>(&self, packet: &P, phases: PhaseSet) -> usize {
        let mut delivered = 0;
        for connection in self.snapshot() {
            if !phases.contains(connection.phase()) {
                continue;
            }
            match connection.try_send(packet) {
                Ok(()) => delivered += 1,
                Err(ServerError::QueueFull(id)) => {
                    warn!(connection = %id, "🐢 Send queue full during broadcast, closing slow connection");
                    connection.request_close();
                }
                Err(e) => debug!(connection = %connection.id(), "Broadcast skipped: {}", e),
            }
        }
        delivered
    }

    /// Requests close on every live connection and on any admitted later.
    pub fn request_close_all(&self) {
        self.draining.store(true, Ordering::SeqCst);
        for entry in self.connections.iter() {
            entry.value().request_close();
        }
    }
}
