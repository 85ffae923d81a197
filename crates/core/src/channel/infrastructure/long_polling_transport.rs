use std::collections::VecDeque;
use std::time::{Duration, Instant};

use url::Url;

use crate::channel::domain::transport::{DisconnectKind, Transport, TransportError};
use crate::protocol::messages::{ClientMessage, ServerMessage};

/// Minimum spacing between poll requests.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Per-request timeout. Keeps a single cooperative tick bounded even
/// when the service is slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP long-polling fallback for intermediaries that reject WebSocket
/// upgrades.
///
/// Outbound messages are POSTed to `<base>/push`; queued server
/// messages are drained as a JSON array from `<base>/poll`.
pub struct LongPollingTransport {
    client: reqwest::blocking::Client,
    push_url: Url,
    poll_url: Url,
    pending: VecDeque<ServerMessage>,
    last_poll: Option<Instant>,
    open: bool,
}

impl LongPollingTransport {
    pub fn connect(base: &Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        let push_url = join(base, "push")?;
        let poll_url = join(base, "poll")?;

        // Probe once so an unreachable service fails the connect attempt
        // rather than every subsequent poll.
        let response = client.get(poll_url.clone()).send().map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                TransportError::ConnectTimedOut
            } else {
                TransportError::Rejected(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "poll endpoint returned {}",
                response.status()
            )));
        }

        let mut transport = Self {
            client,
            push_url,
            poll_url,
            pending: VecDeque::new(),
            last_poll: Some(Instant::now()),
            open: true,
        };
        if let Ok(body) = response.text() {
            transport.enqueue_body(&body);
        }
        log::debug!("long-polling transport connected");
        Ok(transport)
    }

    fn enqueue_body(&mut self, body: &str) {
        let values: Vec<serde_json::Value> = match serde_json::from_str(body) {
            Ok(values) => values,
            Err(e) => {
                log::debug!("ignoring unparseable poll body: {e}");
                return;
            }
        };
        for value in values {
            match serde_json::from_value::<ServerMessage>(value) {
                Ok(msg) => self.pending.push_back(msg),
                Err(e) => log::debug!("ignoring unparseable server message: {e}"),
            }
        }
    }

    fn poll_due(&self, now: Instant) -> bool {
        self.last_poll
            .map_or(true, |t| now.duration_since(t) >= POLL_INTERVAL)
    }

    fn mark_closed(&mut self) -> TransportError {
        self.open = false;
        TransportError::Closed(DisconnectKind::TransportClosed)
    }
}

impl Transport for LongPollingTransport {
    fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.push_url.clone())
            .json(message)
            .send()
            .map_err(|e| {
                log::debug!("push request failed: {e}");
                self.mark_closed()
            })?;
        if !response.status().is_success() {
            log::debug!("push endpoint returned {}", response.status());
            return Err(self.mark_closed());
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<ServerMessage>, TransportError> {
        if let Some(msg) = self.pending.pop_front() {
            return Ok(Some(msg));
        }

        let now = Instant::now();
        if !self.poll_due(now) {
            return Ok(None);
        }
        self.last_poll = Some(now);

        let response = self.client.get(self.poll_url.clone()).send().map_err(|e| {
            log::debug!("poll request failed: {e}");
            self.mark_closed()
        })?;
        if !response.status().is_success() {
            log::debug!("poll endpoint returned {}", response.status());
            return Err(self.mark_closed());
        }
        if let Ok(body) = response.text() {
            self.enqueue_body(&body);
        }
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

fn join(base: &Url, segment: &str) -> Result<Url, TransportError> {
    base.join(segment).map_err(|e| TransportError::Endpoint {
        url: base.to_string(),
        reason: e.to_string(),
    })
}
