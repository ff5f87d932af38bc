//! Client session driver: the sending half of a Courier session.
//!
//! The driver walks the [`SessionPhase`] machine and, while `Running`, owns
//! two activities sharing one [`SenderEngine`]: this task pulls payloads
//! from the message channel and admits them into the window, and a spawned
//! task polls for acknowledgments and runs retransmission passes. Both stop
//! on the shared shutdown token.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::phase::{PhaseOutcome, SessionPhase};
use super::shutdown::ShutdownToken;
use crate::core::constants::{
    DEFAULT_POLL_TIMEOUT, DEFAULT_RETRANSMIT_AGE, DEFAULT_WINDOW_SIZE, WINDOW_RETRY_DELAY,
};
use crate::core::{CourierError, SetupError, StatsSink};
use crate::sender::{SendOutcome, SenderConfig, SenderEngine};
use crate::transport::{CourierSocket, TransportError};

/// Client session configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the receiving peer.
    pub peer_addr: SocketAddr,
    /// Local address to bind. Defaults to an ephemeral port on all
    /// interfaces.
    pub bind_addr: SocketAddr,
    /// Bound on unacknowledged packets in flight.
    pub window_size: usize,
    /// Age (in aging cycles) at which an in-flight packet is retransmitted.
    pub retransmit_age: u32,
    /// Bound on a single acknowledgment wait.
    pub poll_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with protocol defaults, sending to `peer_addr`.
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            bind_addr: "0.0.0.0:0".parse().expect("static address"),
            window_size: DEFAULT_WINDOW_SIZE,
            retransmit_age: DEFAULT_RETRANSMIT_AGE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Start building a configuration for `peer_addr`.
    pub fn builder(peer_addr: SocketAddr) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::new(peer_addr),
        }
    }

    fn validate(&self) -> Result<(), SetupError> {
        if self.window_size < 1 {
            return Err(SetupError::InvalidConfig(
                "window size must be at least 1".into(),
            ));
        }
        if self.retransmit_age < 1 {
            return Err(SetupError::InvalidConfig(
                "retransmit age must be at least 1".into(),
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

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the local bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the window size.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the retransmission age threshold.
    pub fn retransmit_age(mut self, age: u32) -> Self {
        self.config.retransmit_age = age;
        self
    }

    /// Set the acknowledgment poll timeout.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout = timeout;
        self
    }

    /// Finish building.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Run a client session to completion.
///
/// Payloads arrive over `messages`; the channel closing means the input is
/// exhausted, and the session drains the window before tearing down. Each
/// acknowledged packet is reported to `stats`. Triggering `shutdown` stops
/// the session early without waiting for the drain.
pub async fn run_client<S>(
    config: ClientConfig,
    messages: mpsc::Receiver<Vec<u8>>,
    stats: S,
    shutdown: ShutdownToken,
) -> Result<(), CourierError>
where
    S: StatsSink + Send + 'static,
{
    let mut session = ClientSession {
        config,
        stats: Some(stats),
        engine: None,
        messages,
        shutdown,
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
            SessionPhase::Cleanup => session.cleanup().await,
            SessionPhase::End => break,
        };
        let next = phase.next(outcome);
        debug!(from = ?phase, to = ?next, "client phase transition");
        phase = next;
    }

    match session.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct ClientSession<S: StatsSink> {
    config: ClientConfig,
    /// Taken by `setup` and handed to the engine.
    stats: Option<S>,
    engine: Option<Arc<SenderEngine<S>>>,
    messages: mpsc::Receiver<Vec<u8>>,
    shutdown: ShutdownToken,
    failure: Option<CourierError>,
}

impl<S: StatsSink + Send + 'static> ClientSession<S> {
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

        let Some(stats) = self.stats.take() else {
            // Setup runs at most once, so the sink is always present here.
            return PhaseOutcome::Error;
        };

        if let Ok(local) = socket.local_addr() {
            info!(%local, peer = %self.config.peer_addr, "client session bound");
        }

        let sender_config = SenderConfig {
            window_size: self.config.window_size,
            retransmit_age: self.config.retransmit_age,
            poll_timeout: self.config.poll_timeout,
        };
        self.engine = Some(Arc::new(SenderEngine::new(
            socket,
            self.config.peer_addr,
            sender_config,
            stats,
        )));
        PhaseOutcome::Ok
    }

    async fn run(&mut self) -> PhaseOutcome {
        let Some(engine) = self.engine.clone() else {
            return PhaseOutcome::Error;
        };

        let ack_engine = Arc::clone(&engine);
        let ack_shutdown = self.shutdown.clone();
        let ack_task = tokio::spawn(async move {
            loop {
                if ack_shutdown.is_triggered() {
                    return None;
                }
                match ack_engine.poll_for_ack().await {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, "acknowledgment loop failed");
                        ack_shutdown.trigger();
                        return Some(e);
                    }
                    Err(e) => warn!(error = %e, "acknowledgment poll error"),
                }
            }
        });

        let probe = self.shutdown.clone();
        let mut waiter = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = waiter.wait_triggered() => {
                    info!("shutdown requested, stopping exchange");
                    break;
                }
                message = self.messages.recv() => match message {
                    Some(payload) => admit_payload(&engine, &probe, payload).await,
                    None => {
                        // Input exhausted: drain the window before teardown.
                        while engine.in_flight().await > 0 && !probe.is_triggered() {
                            sleep(WINDOW_RETRY_DELAY).await;
                        }
                        break;
                    }
                }
            }
        }

        // Stop the acknowledgment loop and collect its verdict.
        self.shutdown.trigger();
        match ack_task.await {
            Ok(Some(e)) => {
                self.failure = Some(e.into());
                PhaseOutcome::Error
            }
            Ok(None) => PhaseOutcome::Done,
            Err(e) => {
                error!(error = %e, "acknowledgment task panicked");
                PhaseOutcome::Error
            }
        }
    }

    fn report_failure(&mut self) -> PhaseOutcome {
        match &self.failure {
            Some(e) => error!(error = %e, "client session failed"),
            None => error!("client session failed without a recorded error"),
        }
        PhaseOutcome::Ok
    }

    async fn cleanup(&mut self) -> PhaseOutcome {
        if let Some(engine) = &self.engine {
            let unacked = engine.in_flight().await;
            if unacked > 0 {
                warn!(unacked, "closing with unacknowledged packets");
            }
        }
        info!("client session closed");
        PhaseOutcome::Ok
    }
}

/// Admit one payload, waiting out full-window and transient transmit
/// failures. Gives up only on shutdown or an oversized payload.
async fn admit_payload<S: StatsSink>(
    engine: &SenderEngine<S>,
    shutdown: &ShutdownToken,
    payload: Vec<u8>,
) {
    loop {
        if shutdown.is_triggered() {
            return;
        }
        match engine.send(&payload).await {
            Ok(SendOutcome::Admitted(_)) => return,
            Ok(SendOutcome::WindowFull) => sleep(WINDOW_RETRY_DELAY).await,
            Ok(SendOutcome::TransmitFailed) => sleep(WINDOW_RETRY_DELAY).await,
            Err(e @ TransportError::PayloadTooLarge { .. }) => {
                warn!(error = %e, "payload dropped");
                return;
            }
            Err(e) => {
                warn!(error = %e, "send error, payload dropped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let peer: SocketAddr = "127.0.0.1:4433".parse().unwrap();
        let config = ClientConfig::builder(peer)
            .window_size(8)
            .retransmit_age(5)
            .poll_timeout(Duration::from_millis(100))
            .build();

        assert_eq!(config.peer_addr, peer);
        assert_eq!(config.window_size, 8);
        assert_eq!(config.retransmit_age, 5);
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let peer: SocketAddr = "127.0.0.1:4433".parse().unwrap();
        let config = ClientConfig {
            window_size: 0,
            ..ClientConfig::new(peer)
        };
        assert!(matches!(
            config.validate(),
            Err(SetupError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_io() {
        let peer: SocketAddr = "127.0.0.1:4433".parse().unwrap();
        let config = ClientConfig {
            retransmit_age: 0,
            ..ClientConfig::new(peer)
        };
        let (_tx, rx) = mpsc::channel(1);

        let stats = Vec::<(u32, Duration)>::new();
        let result = run_client(config, rx, stats, ShutdownToken::new()).await;
        assert!(matches!(
            result,
            Err(CourierError::Setup(SetupError::InvalidConfig(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_input_completes_cleanly() {
        let peer: SocketAddr = "127.0.0.1:4433".parse().unwrap();
        let config = ClientConfig::new(peer);
        let (tx, rx) = mpsc::channel::<Vec<u8>>(1);
        drop(tx);

        let stats = Vec::<(u32, Duration)>::new();
        let result = run_client(config, rx, stats, ShutdownToken::new()).await;
        assert!(result.is_ok());
    }
}
