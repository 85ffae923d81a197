use std::time::{Duration, Instant};

use crate::channel::domain::transport::{
    DisconnectKind, Transport, TransportError, TransportFactory, TransportMode,
};
use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::shared::constants::{BACKOFF_BASE, BACKOFF_MAX, KEEPALIVE_INTERVAL, LIVENESS_TIMEOUT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Exponential reconnect backoff, reset on a successful connect.
struct Backoff {
    attempt: u32,
    retry_at: Option<Instant>,
}

impl Backoff {
    fn new() -> Self {
        Self {
            attempt: 0,
            retry_at: None,
        }
    }

    fn schedule(&mut self, now: Instant) {
        let delay = BACKOFF_BASE
            .saturating_mul(1u32 << self.attempt.min(5))
            .min(BACKOFF_MAX);
        self.retry_at = Some(now + delay);
        self.attempt = self.attempt.saturating_add(1);
    }

    fn due(&self, now: Instant) -> bool {
        self.retry_at.is_some_and(|t| now >= t)
    }

    fn reset(&mut self) {
        self.attempt = 0;
        self.retry_at = None;
    }
}

/// Owns the persistent channel: connect, transport fallback, reconnect
/// backoff, keepalive, and disconnect classification.
///
/// Connection attempts never fail hard on unreachability: the attempt
/// resolves with the manager left disconnected, a retry scheduled, and
/// the classification observable, so the caller can degrade gracefully.
pub struct ConnectionManager {
    factory: Box<dyn TransportFactory>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    mode: TransportMode,
    last_disconnect: Option<DisconnectKind>,
    last_ping: Option<Instant>,
    last_inbound: Option<Instant>,
    backoff: Backoff,
    keepalive_interval: Duration,
    liveness_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(factory: Box<dyn TransportFactory>) -> Self {
        Self {
            factory,
            transport: None,
            state: ConnectionState::Disconnected,
            mode: TransportMode::WebSocket,
            last_disconnect: None,
            last_ping: None,
            last_inbound: None,
            backoff: Backoff::new(),
            keepalive_interval: KEEPALIVE_INTERVAL,
            liveness_timeout: LIVENESS_TIMEOUT,
        }
    }

    /// Shortened timers for tests.
    #[cfg(test)]
    fn with_timers(mut self, keepalive: Duration, liveness: Duration) -> Self {
        self.keepalive_interval = keepalive;
        self.liveness_timeout = liveness;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn last_disconnect(&self) -> Option<DisconnectKind> {
        self.last_disconnect
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    /// Establishes the channel. Idempotent: a live channel is returned
    /// unchanged; a stale one is torn down before the new attempt.
    pub fn connect(&mut self, now: Instant) -> ConnectionState {
        if self.is_connected() {
            return self.state;
        }
        self.teardown();
        self.attempt(now)
    }

    /// Releases the channel and stops the keepalive probe. Safe to call
    /// when already disconnected.
    pub fn disconnect(&mut self) {
        self.teardown();
        self.state = ConnectionState::Disconnected;
        // A caller-initiated release is not a classified drop.
        self.last_disconnect = None;
        self.backoff.reset();
    }

    /// Advances timers: keepalive probe, liveness check, scheduled
    /// reconnects. Call once per cooperative tick.
    pub fn tick(&mut self, now: Instant) {
        if self.is_connected() {
            self.check_liveness(now);
        }
        if self.is_connected() {
            self.send_keepalive(now);
        } else if self.should_retry(now) {
            log::info!("reconnecting ({:?})", self.mode);
            self.attempt(now);
        }
    }

    /// The next inbound message, if any. Classifies and absorbs
    /// transport drops; the caller observes them via `last_disconnect`.
    pub fn poll(&mut self, now: Instant) -> Option<ServerMessage> {
        let transport = self.transport.as_mut()?;
        match transport.poll() {
            Ok(Some(msg)) => {
                self.last_inbound = Some(now);
                Some(msg)
            }
            Ok(None) => None,
            Err(TransportError::Closed(kind)) => {
                self.handle_drop(kind, now);
                None
            }
            Err(e) => {
                log::warn!("transport poll error: {e}");
                self.handle_drop(DisconnectKind::TransportClosed, now);
                None
            }
        }
    }

    /// Sends a message over the live channel. A send failure drops the
    /// channel (classified transient) and returns false.
    pub fn send(&mut self, message: &ClientMessage, now: Instant) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(message) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("transport send error: {e}");
                self.handle_drop(DisconnectKind::TransportClosed, now);
                false
            }
        }
    }

    fn attempt(&mut self, now: Instant) -> ConnectionState {
        self.state = ConnectionState::Connecting;
        match self.factory.open(self.mode) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = ConnectionState::Connected;
                self.last_disconnect = None;
                self.last_ping = Some(now);
                self.last_inbound = Some(now);
                self.backoff.reset();
                log::info!("connected via {:?}", self.mode);
            }
            Err(TransportError::Rejected(reason)) => {
                // An intermediary refused this mode; drop to a more
                // compatible one and let the retry machinery take over.
                if let Some(next) = self.mode.downgrade() {
                    log::warn!("{:?} rejected ({reason}), falling back to {next:?}", self.mode);
                    self.mode = next;
                } else {
                    log::warn!("{:?} rejected ({reason}), no fallback left", self.mode);
                }
                self.resolve_failed(now);
            }
            Err(TransportError::ConnectTimedOut) => {
                log::warn!("connection attempt timed out");
                self.resolve_failed(now);
            }
            Err(e) => {
                log::warn!("connection attempt failed: {e}");
                self.resolve_failed(now);
            }
        }
        self.state
    }

    /// A failed attempt resolves without error: disconnected, classified
    /// transient, retry scheduled.
    fn resolve_failed(&mut self, now: Instant) {
        self.state = ConnectionState::Disconnected;
        self.last_disconnect = Some(DisconnectKind::TransportClosed);
        self.backoff.schedule(now);
    }

    fn check_liveness(&mut self, now: Instant) {
        let silent_for = self
            .last_inbound
            .map(|t| now.duration_since(t))
            .unwrap_or_default();
        if silent_for >= self.liveness_timeout {
            log::warn!("no inbound traffic for {silent_for:?}, dropping channel");
            self.handle_drop(DisconnectKind::LivenessTimeout, now);
        }
    }

    fn send_keepalive(&mut self, now: Instant) {
        let due = self
            .last_ping
            .map_or(true, |t| now.duration_since(t) >= self.keepalive_interval);
        if due {
            self.last_ping = Some(now);
            self.send(&ClientMessage::Ping, now);
        }
    }

    fn should_retry(&self, now: Instant) -> bool {
        self.state == ConnectionState::Disconnected
            && self
                .last_disconnect
                .is_some_and(DisconnectKind::is_transient)
            && self.backoff.due(now)
    }

    fn handle_drop(&mut self, kind: DisconnectKind, now: Instant) {
        self.teardown();
        self.state = ConnectionState::Disconnected;
        self.last_disconnect = Some(kind);
        if kind.is_transient() {
            self.backoff.schedule(now);
        } else {
            // Terminal: retrying requires explicit user action.
            self.backoff.reset();
        }
    }

    fn teardown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.last_ping = None;
        self.last_inbound = None;
    }
}
