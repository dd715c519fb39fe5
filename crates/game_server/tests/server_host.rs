//! End-to-end tests of the TCP host
//!
//! A real listener is bound on an ephemeral port; clients connect over TCP.

use async_trait::async_trait;
use game_server::{
    DispatchTable, EntityId, GameServer, HandlerResult, PacketContext, Phase, PhaseSet,
    ServerConfig, World, WorldError,
};
use realm_codec::{packet, FixedStr, SchemaRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

packet! {
    pub struct Welcome(tag = 0x10, direction = Outbound) {
        0 => pub motd: FixedStr<8>,
    }
}

packet! {
    pub struct Say(tag = 0x11, direction = Inbound) {
        0 => pub text: FixedStr<8>,
    }
}

packet! {
    pub struct Heard(tag = 0x12, direction = Outbound, sequenced = true) {
        0 => pub text: FixedStr<8>,
    }
}

#[derive(Default)]
struct IdleWorld {
    steps: AtomicUsize,
}

#[async_trait]
impl World for IdleWorld {
    async fn despawn_entity(&self, _entity: EntityId) -> Result<(), WorldError> {
        Ok(())
    }

    async fn update_step(&self, _step: Duration) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }
}

async fn on_say(ctx: PacketContext<Say>) -> HandlerResult {
    let heard = Heard { text: ctx.packet.text.clone() };
    ctx.server.connections().broadcast(&heard, PhaseSet::ACTIVE);
    Ok(())
}

fn server(close_calls: Arc<AtomicUsize>) -> Arc<GameServer> {
    server_with_limit(close_calls, ServerConfig::default().max_connections)
}

fn server_with_limit(close_calls: Arc<AtomicUsize>, max_connections: usize) -> Arc<GameServer> {
    let mut builder = SchemaRegistry::builder();
    builder.register::<Welcome>().unwrap();
    builder.register::<Say>().unwrap();
    builder.register::<Heard>().unwrap();

    let mut dispatch = DispatchTable::new();
    dispatch
        .register_handler(PhaseSet::ACTIVE, on_say)
        .on_handshake_complete(|connection, _server| async move {
            connection.send(&Welcome { motd: "hello".into() }).await?;
            connection.set_phase(Phase::LoggedIn);
            Ok(())
        })
        .on_close(move |_connection, _server| {
            let close_calls = close_calls.clone();
            async move {
                close_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

    let config = ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        max_connections,
        ..Default::default()
    };
    Arc::new(
        GameServer::new(
            config,
            Arc::new(builder.build()),
            dispatch,
            Arc::new(IdleWorld::default()),
        )
        .unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn greets_broadcasts_and_shuts_down_cleanly() {
    let close_calls = Arc::new(AtomicUsize::new(0));
    let server = server(close_calls.clone());
    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();

    let serve = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    let mut alice = TcpStream::connect(addr).await.unwrap();
    let mut bob = TcpStream::connect(addr).await.unwrap();

    let mut welcome = [0u8; 9];
    alice.read_exact(&mut welcome).await.unwrap();
    assert_eq!(&welcome, b"\x10hello\0\0\0");
    bob.read_exact(&mut welcome).await.unwrap();

    alice.write_all(b"\x11hi\0\0\0\0\0\0").await.unwrap();

    let mut heard = [0u8; 10];
    bob.read_exact(&mut heard).await.unwrap();
    assert_eq!(heard[0], 0x12);
    assert_eq!(&heard[2..], b"hi\0\0\0\0\0\0");
    alice.read_exact(&mut heard).await.unwrap();
    assert_eq!(heard[0], 0x12);

    server.shutdown();
    timeout(Duration::from_secs(5), serve)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(close_calls.load(Ordering::SeqCst), 2);
    assert!(server.context().connections().is_empty());

    let mut rest = Vec::new();
    alice.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_tag_disconnects_only_the_offender() {
    let server = server(Arc::new(AtomicUsize::new(0)));
    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();
    let serve = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    let mut good = TcpStream::connect(addr).await.unwrap();
    let mut bad = TcpStream::connect(addr).await.unwrap();
    let mut welcome = [0u8; 9];
    good.read_exact(&mut welcome).await.unwrap();
    bad.read_exact(&mut welcome).await.unwrap();

    bad.write_all(&[0xEE]).await.unwrap();
    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), bad.read_to_end(&mut rest))
        .await
        .expect("offender was not disconnected")
        .unwrap();

    good.write_all(b"\x11ok\0\0\0\0\0\0").await.unwrap();
    let mut heard = [0u8; 10];
    good.read_exact(&mut heard).await.unwrap();
    assert_eq!(&heard[2..4], b"ok");

    server.shutdown();
    timeout(Duration::from_secs(5), serve).await.unwrap().unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_limit_holds_for_back_to_back_accepts() {
    let close_calls = Arc::new(AtomicUsize::new(0));
    let server = server_with_limit(close_calls.clone(), 1);
    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();
    let serve = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();

    let mut welcome = [0u8; 9];
    first.read_exact(&mut welcome).await.unwrap();
    assert_eq!(welcome[0], 0x10);

    let mut buf = [0u8; 9];
    let read = timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .expect("over-limit connection was not dropped")
        .unwrap_or(0);
    assert_eq!(read, 0);

    server.shutdown();
    timeout(Duration::from_secs(5), serve).await.unwrap().unwrap().unwrap();
    assert_eq!(close_calls.load(Ordering::SeqCst), 1);
}
