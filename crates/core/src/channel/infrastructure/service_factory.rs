use std::time::Duration;

use url::Url;

use crate::channel::domain::transport::{Transport, TransportError, TransportFactory, TransportMode};
use crate::channel::infrastructure::long_polling_transport::LongPollingTransport;
use crate::channel::infrastructure::websocket_transport::WebSocketTransport;
use crate::shared::constants::CONNECT_TIMEOUT;

/// Builds transports for a single service endpoint.
///
/// Accepts a `ws://`/`wss://` URL and derives the `http`/`https` base
/// used by the long-polling fallback (or the reverse when given an
/// HTTP URL).
pub struct ServiceTransportFactory {
    ws_url: Url,
    http_base: Url,
    connect_timeout: Duration,
}

impl ServiceTransportFactory {
    pub fn new(url_str: &str) -> Result<Self, TransportError> {
        Self::with_timeout(url_str, CONNECT_TIMEOUT)
    }

    pub fn with_timeout(url_str: &str, connect_timeout: Duration) -> Result<Self, TransportError> {
        let url = Url::parse(url_str).map_err(|e| TransportError::Endpoint {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;

        let (ws_scheme, http_scheme) = match url.scheme() {
            "ws" | "http" => ("ws", "http"),
            "wss" | "https" => ("wss", "https"),
            other => {
                return Err(TransportError::Endpoint {
                    url: url_str.to_string(),
                    reason: format!("unsupported scheme: {other}"),
                })
            }
        };

        let ws_url = with_scheme(&url, ws_scheme)?;
        // Url::join replaces the last segment unless the base ends in a
        // slash, so the polling base keeps the stream path as a directory.
        let mut http_base = with_scheme(&url, http_scheme)?;
        if !http_base.path().ends_with('/') {
            http_base.set_path(&format!("{}/", http_base.path()));
        }

        Ok(Self {
            ws_url,
            http_base,
            connect_timeout,
        })
    }

}

impl TransportFactory for ServiceTransportFactory {
    fn open(&self, mode: TransportMode) -> Result<Box<dyn Transport>, TransportError> {
        match mode {
            TransportMode::WebSocket => Ok(Box::new(WebSocketTransport::connect(
                self.ws_url.as_str(),
                self.connect_timeout,
            )?)),
            TransportMode::LongPolling => Ok(Box::new(LongPollingTransport::connect(
                &self.http_base,
                self.connect_timeout,
            )?)),
        }
    }
}

fn with_scheme(url: &Url, scheme: &str) -> Result<Url, TransportError> {
    let mut rewritten = url.clone();
    rewritten
        .set_scheme(scheme)
        .map_err(|_| TransportError::Endpoint {
            url: url.to_string(),
            reason: format!("cannot rewrite scheme to {scheme}"),
        })?;
    Ok(rewritten)
}
