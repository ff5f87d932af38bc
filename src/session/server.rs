//! Server session driver: the receiving half of a Courier session.
//!
//! The server is a single loop, so unlike the client it spawns nothing:
//! each cycle waits (bounded) for a datagram, hands it to the
//! [`ReceiverEngine`], and checks the shutdown token. The same
//! [`SessionPhase`] machine frames the lifecycle.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::phase::{PhaseOutcome, SessionPhase};
use super::shutdown::ShutdownToken;
use crate::core::constants::{DEFAULT_POLL_TIMEOUT, DEFAULT_WINDOW_SIZE};
use crate::core::{CourierError, DeliverySink, SetupError};
use crate::receiver::ReceiverEngine;
use crate::transport::{CourierSocket, TransportError};

/// Server session configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local address to listen on.
    pub bind_addr: SocketAddr,
    /// Size of the receive reorder window.
    pub window_size: usize,
    /// Bound on a single receive wait; the shutdown token is re-checked
    /// after each wait.
    pub poll_timeout: Duration,
}

impl ServerConfig {
    /// Configuration with protocol defaults, listening on `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            window_size: DEFAULT_WINDOW_SIZE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    fn validate(&self) -> Result<(), SetupError> {
        if self.window_size < 1 {
            return Err(SetupError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(SetupError::InvalidConfig(
                "poll timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Counters reported when a server session tears down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerSummary {
    /// Payloads handed to the delivery sink, in order.
    pub packets_delivered: u64,
    /// Acknowledgments transmitted.
    pub acks_sent: u64,
}

/// Run a server session until `shutdown` is triggered.
///
/// Every in-order payload goes to `sink`; a sink failure is fatal and ends
/// the session. Returns the session counters on a clean stop.
pub async fn run_server<D: DeliverySink>(
    config: ServerConfig,
    sink: D,
    shutdown: ShutdownToken,
) -> Result<ServerSummary, CourierError> {
    let mut session = ServerSession {
        config,
        sink: Some(sink),
        engine: None,
        shutdown,
        summary: ServerSummary::default(),
        failure: None,
    };

    let mut phase = SessionPhase::Entry;
    while !phase.is_terminal() {
        let outcome = match phase {
            SessionPhase::Entry => PhaseOutcome::Ok,
            SessionPhase::ParseArgs => session.parse_args(),
            SessionPhase::Setup => session.setup().await,
            SessionPhase::Running => session.run().await,
            SessionPhase::FatalError => session.report_failure(),
            SessionPhase::Cleanup => session.cleanup(),
            SessionPhase::End => break,
        };
        let next = phase.next(outcome);
        debug!(from = ?phase, to = ?next, "server phase transition");
        phase = next;
    }

    match session.failure {
        Some(e) => Err(e),
        None => Ok(session.summary),
    }
}

struct ServerSession<D: DeliverySink> {
    config: ServerConfig,
    /// Taken by `setup` and handed to the engine.
    sink: Option<D>,
    engine: Option<ReceiverEngine<D>>,
    shutdown: ShutdownToken,
    summary: ServerSummary,
    failure: Option<CourierError>,
}

impl<D: DeliverySink> ServerSession<D> {
    fn parse_args(&mut self) -> PhaseOutcome {
        match self.config.validate() {
            Ok(()) => PhaseOutcome::Ok,
            Err(e) => {
                self.failure = Some(e.into());
                PhaseOutcome::Error
            }
        }
    }

    async fn setup(&mut self) -> PhaseOutcome {
        let socket = match CourierSocket::bind(self.config.bind_addr).await {
            Ok(socket) => socket,
            Err(source) => {
                self.failure = Some(
                    SetupError::BindFailed {
                        addr: self.config.bind_addr,
                        source,
                    }
                    .into(),
                );
                return PhaseOutcome::Error;
            }
        };

        let Some(sink) = self.sink.take() else {
            // Setup runs at most once, so the sink is always present here.
            return PhaseOutcome::Error;
        };

        if let Ok(local) = socket.local_addr() {
            info!(%local, window = self.config.window_size, "server session listening");
        }

        self.engine = Some(ReceiverEngine::new(
            Arc::new(socket),
            self.config.window_size,
            sink,
        ));
        PhaseOutcome::Ok
    }

    async fn run(&mut self) -> PhaseOutcome {
        loop {
            if self.shutdown.is_triggered() {
                info!("shutdown requested, stopping receive loop");
                return PhaseOutcome::Done;
            }

            let Some(engine) = self.engine.as_mut() else {
                return PhaseOutcome::Error;
            };

            let received = match engine.socket().recv_timed(self.config.poll_timeout).await {
                Ok(received) => received,
                Err(e) => match self.on_receive_error(e) {
                    Some(outcome) => return outcome,
                    None => continue,
                },
            };
            let Some((datagram, from)) = received else {
                continue;
            };

            if let Err(e) = engine.handle_datagram(&datagram, from).await {
                self.failure = Some(e);
                return PhaseOutcome::Error;
            }
        }
    }

    /// Classify a receive error: `Some(Error)` ends the session when the
    /// socket itself is gone, `None` keeps the loop alive.
    fn on_receive_error(&mut self, e: io::Error) -> Option<PhaseOutcome> {
        let e = TransportError::ReceiveFailed(e);
        if e.is_fatal() {
            error!(error = %e, "receive loop lost the socket");
            self.failure = Some(e.into());
            return Some(PhaseOutcome::Error);
        }
        warn!(error = %e, "receive error");
        None
    }

    fn report_failure(&mut self) -> PhaseOutcome {
        match &self.failure {
            Some(e) => error!(error = %e, "server session failed"),
            None => error!("server session failed without a recorded error"),
        }
        PhaseOutcome::Ok
    }

    fn cleanup(&mut self) -> PhaseOutcome {
        if let Some(engine) = &self.engine {
            self.summary = ServerSummary {
                packets_delivered: engine.packets_delivered(),
                acks_sent: engine.acks_sent(),
            };
        }
        info!(
            delivered = self.summary.packets_delivered,
            acks = self.summary.acks_sent,
            "server session closed"
        );
        PhaseOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{self, PacketHeader};
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn test_invalid_config_fails_before_io() {
        let config = ServerConfig {
            window_size: 0,
            ..ServerConfig::new("127.0.0.1:0".parse().unwrap())
        };

        let result = run_server(config, Vec::new(), ShutdownToken::new()).await;
        assert!(matches!(
            result,
            Err(CourierError::Setup(SetupError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_socket_loss_ends_the_receive_loop() {
        let mut session: ServerSession<Vec<Vec<u8>>> = ServerSession {
            config: ServerConfig::new("127.0.0.1:0".parse().unwrap()),
            sink: Some(Vec::new()),
            engine: None,
            shutdown: ShutdownToken::new(),
            summary: ServerSummary::default(),
            failure: None,
        };

        // Transient read errors keep the loop alive and record nothing.
        let transient = io::Error::new(io::ErrorKind::WouldBlock, "busy");
        assert_eq!(session.on_receive_error(transient), None);
        assert!(session.failure.is_none());

        // Losing the socket ends the session through the error path.
        let lost = io::Error::new(io::ErrorKind::NotConnected, "socket gone");
        assert_eq!(session.on_receive_error(lost), Some(PhaseOutcome::Error));
        assert!(matches!(
            session.failure,
            Some(CourierError::Transport(TransportError::ReceiveFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_yields_summary() {
        let config = ServerConfig {
            poll_timeout: Duration::from_millis(20),
            ..ServerConfig::new("127.0.0.1:0".parse().unwrap())
        };
        let shutdown = ShutdownToken::new();
        shutdown.trigger();

        let summary = run_server(config, Vec::new(), shutdown).await.unwrap();
        assert_eq!(summary, ServerSummary::default());
    }

    #[tokio::test]
    async fn test_delivers_and_counts() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            window_size: 4,
            poll_timeout: Duration::from_millis(20),
        };

        // Bind ahead of the session so the sender knows the port.
        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bind_addr = {
            let held = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let addr = held.local_addr().unwrap();
            drop(held);
            addr
        };
        let config = ServerConfig { bind_addr, ..config };

        let shutdown = ShutdownToken::new();
        let server_shutdown = shutdown.clone();
        let server =
            tokio::spawn(async move { run_server(config, Vec::new(), server_shutdown).await });

        // Give the server a moment to bind, then send one DATA packet.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let datagram = wire::encode(&PacketHeader::data(0), b"payload");
        probe.send_to(&datagram, bind_addr).await.unwrap();

        // The ack proves the packet was accepted.
        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), probe.recv_from(&mut buf))
            .await
            .expect("ack should arrive")
            .unwrap();
        let (header, _) = wire::decode(&buf[..len]).unwrap();
        assert!(header.flags.is_ack());
        assert_eq!(header.ack_number, 0);

        shutdown.trigger();
        let summary = server.await.unwrap().unwrap();
        assert_eq!(summary.packets_delivered, 1);
        assert_eq!(summary.acks_sent, 1);
    }
}
