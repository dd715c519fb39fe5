//! Type-erased packet handlers.

use crate::connection::Connection;
use crate::error::HandlerError;
use crate::server::ServerContext;
use async_trait::async_trait;
use realm_codec::{DecodedRecord, Packet};
use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result type returned by packet handlers and lifecycle hooks.
pub type HandlerResult = Result<(), HandlerError>;

/// Everything a handler gets for one inbound packet.
pub struct PacketContext<P> {
    /// The connection the packet arrived on
    pub connection: Arc<Connection>,
    pub packet: P,
    /// Sequence byte for sequenced packets
    pub sequence: Option<u8>,
    pub server: ServerContext,
}

/// A handler for one packet type, callable with an undecoded record.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    /// Converts the record into the handler's packet type and runs it.
    async fn handle(
        &self,
        connection: Arc<Connection>,
        record: DecodedRecord,
        server: ServerContext,
    ) -> HandlerResult;

    /// The packet type this handler expects.
    fn expected_type_id(&self) -> TypeId;

    /// Human-readable name for diagnostics.
    fn handler_name(&self) -> &str;
}

/// Bridges a typed async closure to [`PacketHandler`].
///
/// # Type Parameters
///
/// * `P` - The packet type this handler processes
/// * `F` - The async function invoked for each packet
pub struct TypedPacketHandler<P, F> {
    handler: F,
    name: &'static str,
    _phantom: PhantomData<fn() -> P>,
}

impl<P, F> TypedPacketHandler<P, F> {
    pub fn new(name: &'static str, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut> PacketHandler for TypedPacketHandler<P, F>
where
    P: Packet,
    F: Fn(PacketContext<P>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(
        &self,
        connection: Arc<Connection>,
        record: DecodedRecord,
        server: ServerContext,
    ) -> HandlerResult {
        let sequence = record.sequence;
        let packet = record
            .into_packet::<P>()
            .map_err(|e| HandlerError::close(format!("malformed {}: {}", self.name, e)))?;

        (self.handler)(PacketContext {
            connection,
            packet,
            sequence,
            server,
        })
        .await
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<P>()
    }

    fn handler_name(&self) -> &str {
        self.name
    }
}
