use std::time::{Duration, Instant};

use crate::protocol::messages::{ClientMessage, DetectionConfig, ServerConstraints, SessionAck};
use crate::shared::constants::{DEFAULT_MAX_RESOLUTION, HANDSHAKE_TIMEOUT, MAX_FRAME_RATE};

/// Caller-side handshake parameters.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub client_id: String,
    pub detection: DetectionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: format!("client-{:08x}", rand::random::<u32>()),
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Sent { at: Instant },
    Ready,
}

/// Handshake lifecycle on top of a connected channel.
///
/// A session that hears nothing for the timeout window self-resolves
/// with locally assumed defaults: a reachable-but-silent server must
/// not block the pipeline. Callers that depend on server-confirmed
/// constraints check `locally_resolved`.
pub struct Session {
    phase: Phase,
    session_id: Option<String>,
    constraints: Option<ServerConstraints>,
    locally_resolved: bool,
    timeout: Duration,
}

impl Session {
    pub fn new() -> Self {
        Self::with_timeout(HANDSHAKE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            session_id: None,
            constraints: None,
            locally_resolved: false,
            timeout,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn locally_resolved(&self) -> bool {
        self.locally_resolved
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn constraints(&self) -> Option<&ServerConstraints> {
        self.constraints.as_ref()
    }

    /// The `initialize` request to send, exactly once per connection.
    /// Subsequent calls are no-ops until `reset`.
    pub fn begin(&mut self, config: &SessionConfig, now: Instant) -> Option<ClientMessage> {
        if self.phase != Phase::Idle {
            return None;
        }
        self.phase = Phase::Sent { at: now };
        Some(ClientMessage::Initialize {
            client_id: config.client_id.clone(),
            config: config.detection.clone(),
        })
    }

    /// Applies a server acknowledgment. Returns true when the session
    /// became ready through this ack (late acks after local resolution
    /// still upgrade the stored constraints but return false).
    pub fn on_ack(&mut self, ack: SessionAck) -> bool {
        let newly_ready = self.phase != Phase::Ready;
        self.session_id = Some(ack.session_id);
        self.constraints = Some(ack.config);
        self.phase = Phase::Ready;
        self.locally_resolved = false;
        newly_ready
    }

    /// Forces local resolution once the silence window elapses. Returns
    /// true when the forced transition happened on this call.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Phase::Sent { at } = self.phase else {
            return false;
        };
        if now.duration_since(at) < self.timeout {
            return false;
        }
        log::warn!(
            "no handshake ack within {:?}, proceeding with assumed defaults",
            self.timeout
        );
        self.phase = Phase::Ready;
        self.constraints = Some(assumed_constraints());
        self.locally_resolved = true;
        true
    }

    /// Invalidates the session; the channel it rode on is gone.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.session_id = None;
        self.constraints = None;
        self.locally_resolved = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn assumed_constraints() -> ServerConstraints {
    ServerConstraints {
        max_frame_rate: MAX_FRAME_RATE,
        max_resolution: DEFAULT_MAX_RESOLUTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(id: &str) -> SessionAck {
        SessionAck {
            session_id: id.to_string(),
            timestamp: 0,
            config: ServerConstraints {
                max_frame_rate: 3.0,
                max_resolution: [640, 480],
            },
        }
    }

    #[test]
    fn test_begin_produces_initialize_once() {
        let mut session = Session::new();
        let config = SessionConfig::default();
        let now = Instant::now();

        let first = session.begin(&config, now);
        assert!(matches!(first, Some(ClientMessage::Initialize { .. })));

        // Handshake is idempotent per connection.
        assert!(session.begin(&config, now).is_none());
    }

    #[test]
    fn test_ack_initializes_with_server_constraints() {
        let mut session = Session::new();
        let now = Instant::now();
        session.begin(&SessionConfig::default(), now);

        assert!(session.on_ack(ack("sess-1")));
        assert!(session.is_initialized());
        assert!(!session.locally_resolved());
        assert_eq!(session.session_id(), Some("sess-1"));
        assert_eq!(session.constraints().unwrap().max_frame_rate, 3.0);
    }

    #[test]
    fn test_timeout_self_resolves_with_defaults() {
        let mut session = Session::with_timeout(Duration::from_secs(5));
        let t0 = Instant::now();
        session.begin(&SessionConfig::default(), t0);

        assert!(!session.tick(t0 + Duration::from_secs(4)));
        assert!(!session.is_initialized());

        assert!(session.tick(t0 + Duration::from_secs(5)));
        assert!(session.is_initialized());
        assert!(session.locally_resolved());
        assert_eq!(
            session.constraints().unwrap().max_frame_rate,
            MAX_FRAME_RATE
        );
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_tick_fires_at_most_once() {
        let mut session = Session::with_timeout(Duration::from_secs(5));
        let t0 = Instant::now();
        session.begin(&SessionConfig::default(), t0);

        assert!(session.tick(t0 + Duration::from_secs(6)));
        assert!(!session.tick(t0 + Duration::from_secs(7)));
    }

    #[test]
    fn test_late_ack_after_local_resolution_upgrades_constraints() {
        let mut session = Session::with_timeout(Duration::from_secs(5));
        let t0 = Instant::now();
        session.begin(&SessionConfig::default(), t0);
        session.tick(t0 + Duration::from_secs(6));

        // Already ready, so this is not a fresh transition...
        assert!(!session.on_ack(ack("sess-late")));
        // ...but the server-confirmed constraints replace the assumed ones.
        assert!(!session.locally_resolved());
        assert_eq!(session.session_id(), Some("sess-late"));
        assert_eq!(session.constraints().unwrap().max_frame_rate, 3.0);
    }

    #[test]
    fn test_tick_without_begin_is_noop() {
        let mut session = Session::new();
        assert!(!session.tick(Instant::now() + Duration::from_secs(60)));
        assert!(!session.is_initialized());
    }

    #[test]
    fn test_reset_allows_new_handshake() {
        let mut session = Session::new();
        let config = SessionConfig::default();
        let now = Instant::now();

        session.begin(&config, now);
        session.on_ack(ack("sess-1"));
        session.reset();

        assert!(!session.is_initialized());
        assert!(session.session_id().is_none());
        assert!(session.begin(&config, now).is_some());
    }

    #[test]
    fn test_default_config_generates_client_id() {
        let a = SessionConfig::default();
        let b = SessionConfig::default();
        assert!(a.client_id.starts_with("client-"));
        assert_ne!(a.client_id, b.client_id);
    }
}
