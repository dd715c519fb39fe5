//! Error types for the game server core.
//!
//! * [`ServerError`] covers the host, connections and outbound sends.
//! * [`HandlerError`] is what a packet handler or lifecycle hook returns.
//! * [`WorldError`] is reported by the world collaborator.

use crate::connection::ConnectionId;
use crate::world::EntityId;
use realm_codec::{CodecError, SchemaBuildError};
use thiserror::Error;

/// Errors raised by the server host and the connection machinery.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket creation, binding or accept failures
    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A message declaration could not be compiled
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaBuildError),

    /// A frame could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The peer sent a tag with no inbound schema
    #[error("Unknown inbound message tag 0x{tag:02x}")]
    UnknownMessage { tag: u8 },

    /// A typed send for a packet with no outbound schema
    #[error("No outbound schema registered for {0}")]
    Unregistered(&'static str),

    /// The connection's send queue is gone
    #[error("Connection {0} cannot accept more outbound frames")]
    ConnectionClosed(ConnectionId),

    /// The connection's send queue is at capacity
    #[error("Send queue of connection {0} is full")]
    QueueFull(ConnectionId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by packet handlers and lifecycle hooks.
///
/// Anything except [`HandlerError::Close`] is logged and the connection stays
/// open.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    /// The handler asks for its connection to be closed
    #[error("close requested: {0}")]
    Close(String),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    World(#[from] WorldError),
}

impl HandlerError {
    pub fn close(reason: impl Into<String>) -> Self {
        HandlerError::Close(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }
}

/// Errors from the world collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("Entity {0} does not exist")]
    EntityNotFound(EntityId),

    #[error("World error: {0}")]
    Internal(String),
}
