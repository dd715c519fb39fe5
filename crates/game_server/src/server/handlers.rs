//! Per-connection tasks: the receive-and-dispatch loop and the writer.

use crate::connection::{Connection, FrameDecoder, InboundFrame};
use crate::dispatch::Dispatch;
use crate::error::{HandlerError, ServerError};
use crate::server::ServerContext;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Drives one client from admission to teardown.
///
/// Frames are handled strictly in arrival order and each handler is awaited
/// before the next frame is read, so a slow handler only delays its own
/// connection. When the loop ends for any reason the connection is closed
/// exactly once and its queued output is flushed.
///
/// # Returns
///
/// `Ok(())` when the peer disconnected or a close was requested, or the
/// protocol error that forced the connection closed.
pub async fn handle_connection<S>(
    stream: S,
    remote_addr: SocketAddr,
    server: ServerContext,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let (outbound_tx, outbound_rx) = mpsc::channel(server.config().send_queue_capacity);
    let connection = Arc::new(Connection::new(
        server.connections().next_id(),
        remote_addr,
        server.registry().clone(),
        outbound_tx,
    ));

    if !server.dispatch().accepts(&connection) {
        info!("🚫 Connection from {} rejected", remote_addr);
        return Ok(());
    }

    server.connections().insert(connection.clone());
    let writer_task = tokio::spawn(write_loop(connection.clone(), writer, outbound_rx));
    info!("🔗 Connection {} established from {}", connection.id(), remote_addr);

    let result = match server.dispatch().run_handshake_complete(&connection, &server).await {
        Ok(()) => receive_loop(&connection, reader, &server).await,
        Err(e) => {
            info!(connection = %connection.id(), "Closing after handshake: {}", e);
            Ok(())
        }
    };

    if let Err(e) = &result {
        warn!(connection = %connection.id(), "Closing connection after protocol error: {}", e);
    }

    connection.close(&server).await;

    if let Err(e) = writer_task.await {
        warn!(connection = %connection.id(), "Writer task failed: {}", e);
    }

    result
}

async fn receive_loop<R>(
    connection: &Arc<Connection>,
    reader: R,
    server: &ServerContext,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, FrameDecoder::new(server.registry().clone()));

    loop {
        if connection.is_closing() {
            return Ok(());
        }

        let frame = tokio::select! {
            frame = frames.next() => frame,
            _ = connection.close_requested() => return Ok(()),
        };

        match frame {
            None => {
                debug!(connection = %connection.id(), "Peer closed the stream");
                return Ok(());
            }
            Some(Err(e)) => return Err(e),
            Some(Ok(frame)) => dispatch_frame(connection, frame, server).await,
        }
    }
}

async fn dispatch_frame(connection: &Arc<Connection>, frame: InboundFrame, server: &ServerContext) {
    let tag = frame.schema.tag;
    let name = frame.schema.type_name;

    match server.dispatch().dispatch(connection, frame.record, server).await {
        Dispatch::Handled(Ok(())) => {}
        Dispatch::Handled(Err(HandlerError::Close(reason))) => {
            info!(connection = %connection.id(), "{} handler requested close: {}", name, reason);
            connection.request_close();
        }
        Dispatch::Handled(Err(e)) => {
            warn!(connection = %connection.id(), tag, "{} handler failed: {}", name, e);
        }
        Dispatch::WrongPhase(phase) => {
            debug!(connection = %connection.id(), tag, "Ignoring {} in phase {}", name, phase);
        }
        Dispatch::Unhandled => {}
    }
}

/// Drains the outbound queue into the socket until the queue is dropped.
async fn write_loop<W>(connection: Arc<Connection>, writer: W, mut outbound: mpsc::Receiver<Bytes>)
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, BytesCodec::new());

    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(frame).await {
            debug!(connection = %connection.id(), "Write failed: {}", e);
            connection.request_close();
            break;
        }
    }

    if let Err(e) = SinkExt::<Bytes>::close(&mut sink).await {
        debug!(connection = %connection.id(), "Shutdown of write half failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_codec::SchemaRegistry;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn writer_flushes_queue_then_shuts_down_write_half() {
        let (tx, rx) = mpsc::channel(4);
        let (own_tx, _own_rx) = mpsc::channel(1);
        let connection = Arc::new(Connection::new(
            crate::connection::ConnectionId(7),
            "127.0.0.1:4000".parse().unwrap(),
            Arc::new(SchemaRegistry::builder().build()),
            own_tx,
        ));
        let (client, server_side) = tokio::io::duplex(64);
        let writer = tokio::spawn(write_loop(connection, server_side, rx));

        tx.send(Bytes::from_static(&[1, 2])).await.unwrap();
        tx.send(Bytes::from_static(&[3])).await.unwrap();
        drop(tx);
        writer.await.unwrap();

        let mut received = Vec::new();
        let mut client = client;
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, vec![1, 2, 3]);
    }
}
