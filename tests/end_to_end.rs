//! End-to-end exercises: the sender engine against a scripted peer, and a
//! full client/server session over loopback.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use courier_protocol::prelude::*;
use courier_protocol::wire;

async fn free_local_addr() -> SocketAddr {
    let held = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = held.local_addr().unwrap();
    drop(held);
    addr
}

/// Delivery sink collecting payloads behind a shared handle, so the test
/// can inspect them while the server owns the sink.
#[derive(Debug, Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl DeliverySink for SharedSink {
    fn deliver(&mut self, payload: &[u8]) -> io::Result<()> {
        self.0.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Window-of-four exchange against a scripted peer: the window fills at
/// four, acknowledgments arrive out of order, and the window drains to
/// admit a fifth packet.
#[tokio::test]
async fn sender_window_drains_on_out_of_order_acks() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer.local_addr().unwrap();
    let socket = CourierSocket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let engine_addr = socket.local_addr().unwrap();

    let config = SenderConfig {
        window_size: 4,
        poll_timeout: Duration::from_millis(200),
        ..SenderConfig::default()
    };
    let engine = SenderEngine::new(socket, peer_addr, config, NullStats);

    for (i, payload) in [b"m0", b"m1", b"m2", b"m3"].iter().enumerate() {
        let outcome = engine.send(*payload).await.unwrap();
        assert_eq!(outcome, SendOutcome::Admitted(i as u32));
    }
    assert_eq!(engine.in_flight().await, 4);
    assert_eq!(engine.send(b"m4").await.unwrap(), SendOutcome::WindowFull);

    // Drain the four DATA packets off the wire.
    let mut buf = [0u8; 2048];
    for _ in 0..4 {
        peer.recv_from(&mut buf).await.unwrap();
    }

    // Acknowledge out of order; each ack retires exactly one packet.
    for (i, acked_seq) in [1u32, 0, 3, 2].into_iter().enumerate() {
        let ack = wire::encode(&PacketHeader::ack(i as u32, acked_seq), &[]);
        peer.send_to(&ack, engine_addr).await.unwrap();

        let outcome = engine.poll_for_ack().await.unwrap();
        assert_eq!(outcome, PollOutcome::Acked(acked_seq));
        assert_eq!(engine.in_flight().await, 3 - i);
    }

    // The drained window admits the fifth packet.
    assert_eq!(engine.send(b"m4").await.unwrap(), SendOutcome::Admitted(4));
}

/// Full session over loopback: every message sent by the client comes out
/// of the server's sink exactly once and in order.
#[tokio::test]
async fn client_server_session_delivers_in_order() {
    let server_addr = free_local_addr().await;

    let sink = SharedSink::default();
    let delivered = Arc::clone(&sink.0);
    let server_config = ServerConfig {
        window_size: 5,
        poll_timeout: Duration::from_millis(50),
        ..ServerConfig::new(server_addr)
    };
    let shutdown = ShutdownToken::new();
    let server_shutdown = shutdown.clone();
    let server =
        tokio::spawn(async move { run_server(server_config, sink, server_shutdown).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages: Vec<Vec<u8>> = (0..20)
        .map(|i| format!("message number {i}").into_bytes())
        .collect();
    let (tx, rx) = mpsc::channel(8);
    let feeder = {
        let messages = messages.clone();
        tokio::spawn(async move {
            for message in messages {
                tx.send(message).await.unwrap();
            }
        })
    };

    let client_config = ClientConfig::builder(server_addr)
        .poll_timeout(Duration::from_millis(50))
        .build();
    let client_shutdown = ShutdownToken::new();
    run_client(client_config, rx, NullStats, client_shutdown)
        .await
        .unwrap();
    feeder.await.unwrap();

    shutdown.trigger();
    let summary = server.await.unwrap().unwrap();

    assert_eq!(*delivered.lock().unwrap(), messages);
    assert_eq!(summary.packets_delivered, messages.len() as u64);
    assert!(summary.acks_sent >= messages.len() as u64);
}

/// Forwarder sitting between client and server that drops some datagrams
/// and reorders others, in both directions. Deterministic: every fourth
/// datagram is dropped, and every fifth is held back one slot.
async fn run_lossy_forwarder(proxy: UdpSocket, server_addr: SocketAddr) {
    let mut client_addr: Option<SocketAddr> = None;
    let mut held: Option<(Vec<u8>, SocketAddr)> = None;
    let mut counter = 0u32;
    let mut buf = [0u8; 2048];

    loop {
        let Ok((len, from)) = proxy.recv_from(&mut buf).await else {
            return;
        };
        let target = if from == server_addr {
            match client_addr {
                Some(addr) => addr,
                None => continue,
            }
        } else {
            client_addr = Some(from);
            server_addr
        };

        counter += 1;
        if counter % 4 == 2 {
            continue;
        }

        let datagram = buf[..len].to_vec();
        if counter % 5 == 0 && held.is_none() {
            held = Some((datagram, target));
            continue;
        }
        let _ = proxy.send_to(&datagram, target).await;
        if let Some((delayed, delayed_target)) = held.take() {
            let _ = proxy.send_to(&delayed, delayed_target).await;
        }
    }
}

/// The full session through a channel that drops and reorders datagrams:
/// retransmission and the reorder stash still produce exactly-once,
/// in-order delivery.
#[tokio::test]
async fn session_recovers_over_lossy_reordering_channel() {
    let server_addr = free_local_addr().await;

    let sink = SharedSink::default();
    let delivered = Arc::clone(&sink.0);
    let server_config = ServerConfig {
        window_size: 5,
        poll_timeout: Duration::from_millis(50),
        ..ServerConfig::new(server_addr)
    };
    let shutdown = ShutdownToken::new();
    let server_shutdown = shutdown.clone();
    let server =
        tokio::spawn(async move { run_server(server_config, sink, server_shutdown).await });

    let proxy = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = proxy.local_addr().unwrap();
    let forwarder = tokio::spawn(run_lossy_forwarder(proxy, server_addr));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages: Vec<Vec<u8>> = (0..12)
        .map(|i| format!("lossy message {i}").into_bytes())
        .collect();
    let (tx, rx) = mpsc::channel(8);
    let feeder = {
        let messages = messages.clone();
        tokio::spawn(async move {
            for message in messages {
                tx.send(message).await.unwrap();
            }
        })
    };

    // Short poll timeout and a low age threshold so dropped packets are
    // retransmitted quickly.
    let client_config = ClientConfig::builder(proxy_addr)
        .retransmit_age(2)
        .poll_timeout(Duration::from_millis(30))
        .build();
    tokio::time::timeout(
        Duration::from_secs(30),
        run_client(client_config, rx, NullStats, ShutdownToken::new()),
    )
    .await
    .expect("client should drain despite losses")
    .unwrap();
    feeder.await.unwrap();

    shutdown.trigger();
    let summary = server.await.unwrap().unwrap();
    forwarder.abort();

    // Exactly once and in order, despite drops and reordering.
    assert_eq!(*delivered.lock().unwrap(), messages);
    assert_eq!(summary.packets_delivered, messages.len() as u64);
}

/// A client pointed at a dead port keeps retransmitting without erroring,
/// and shutdown stops it.
#[tokio::test]
async fn client_shutdown_interrupts_unacked_session() {
    let dead_addr = free_local_addr().await;

    let (tx, rx) = mpsc::channel(4);
    tx.send(b"never acked".to_vec()).await.unwrap();

    let config = ClientConfig::builder(dead_addr)
        .poll_timeout(Duration::from_millis(20))
        .build();
    let shutdown = ShutdownToken::new();
    let trigger = shutdown.clone();
    let client = tokio::spawn(async move { run_client(config, rx, NullStats, shutdown).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    trigger.trigger();

    let result = tokio::time::timeout(Duration::from_secs(2), client)
        .await
        .expect("client should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
    drop(tx);
}
