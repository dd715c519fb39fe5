//! Broadcast behaviour with peers that stop reading

use game_server::{Connection, ConnectionManager, Phase};
use realm_codec::{packet, SchemaRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

packet! {
    pub struct Shout(tag = 0x40, direction = Outbound) {
        0 => pub value: u8,
    }
}

fn registry() -> Arc<SchemaRegistry> {
    let mut builder = SchemaRegistry::builder();
    builder.register::<Shout>().unwrap();
    Arc::new(builder.build())
}

#[tokio::test]
async fn stalled_peer_does_not_block_broadcast() {
    let registry = registry();
    let manager = ConnectionManager::new();

    let (fast_tx, mut fast_rx) = mpsc::channel(16);
    let fast = Arc::new(Connection::new(
        manager.next_id(),
        "127.0.0.1:5001".parse().unwrap(),
        registry.clone(),
        fast_tx,
    ));
    let (slow_tx, _slow_rx) = mpsc::channel(1);
    let slow = Arc::new(Connection::new(
        manager.next_id(),
        "127.0.0.1:5002".parse().unwrap(),
        registry,
        slow_tx,
    ));
    for connection in [&fast, &slow] {
        connection.set_phase(Phase::InWorld);
        manager.insert(connection.clone());
    }

    assert_eq!(manager.broadcast(&Shout { value: 1 }, Phase::InWorld.into()), 2);
    assert!(!slow.is_closing());

    let delivered = timeout(Duration::from_millis(500), async {
        manager.broadcast(&Shout { value: 2 }, Phase::InWorld.into())
    })
    .await
    .expect("broadcast waited on a full queue");
    assert_eq!(delivered, 1);
    assert!(slow.is_closing());
    assert!(!fast.is_closing());

    assert_eq!(fast_rx.recv().await.unwrap().as_ref(), &[0x40, 1]);
    assert_eq!(fast_rx.recv().await.unwrap().as_ref(), &[0x40, 2]);
}
