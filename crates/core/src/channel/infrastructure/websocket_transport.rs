use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use crate::channel::domain::transport::{DisconnectKind, Transport, TransportError};
use crate::protocol::messages::{ClientMessage, ServerMessage};

/// Read timeout applied after the handshake so `poll` stays cooperative.
const POLL_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// WebSocket link to the inference service over `ws://` or `wss://`.
///
/// The TCP connect uses a bounded timeout and the post-handshake stream
/// carries a near-zero read timeout, so neither connecting nor polling
/// can stall the single-threaded tick loop for long.
pub struct WebSocketTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    open: bool,
}

impl WebSocketTransport {
    pub fn connect(url_str: &str, timeout: Duration) -> Result<Self, TransportError> {
        let url = Url::parse(url_str).map_err(|e| TransportError::Endpoint {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::Endpoint {
                url: url_str.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_string();
        let use_tls = url.scheme() == "wss";
        let port = url.port().unwrap_or(if use_tls { 443 } else { 80 });

        let addr = (host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Endpoint {
                url: url_str.to_string(),
                reason: format!("unresolvable host: {host}"),
            })?;

        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                TransportError::ConnectTimedOut
            } else {
                TransportError::Io(e)
            }
        })?;
        tcp.set_nodelay(true)?;

        let stream = if use_tls {
            let connector =
                native_tls::TlsConnector::new().map_err(|e| TransportError::Rejected(e.to_string()))?;
            let tls = connector
                .connect(&host, tcp)
                .map_err(|e| TransportError::Rejected(e.to_string()))?;
            MaybeTlsStream::NativeTls(tls)
        } else {
            MaybeTlsStream::Plain(tcp)
        };

        let (socket, _response) = tungstenite::client::client(url_str, stream)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        set_read_timeout(socket.get_ref(), POLL_READ_TIMEOUT)?;

        log::debug!("websocket connected to {url_str}");
        Ok(Self { socket, open: true })
    }

    fn mark_closed(&mut self, kind: DisconnectKind) -> TransportError {
        self.open = false;
        TransportError::Closed(kind)
    }
}

impl Transport for WebSocketTransport {
    fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        let json = message.to_json()?;
        self.socket
            .write(Message::Text(json.into()))
            .and_then(|_| self.socket.flush())
            .map_err(|e| {
                log::debug!("websocket write failed: {e}");
                self.mark_closed(DisconnectKind::TransportClosed)
            })
    }

    fn poll(&mut self) -> Result<Option<ServerMessage>, TransportError> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(parse_lenient(text.as_str())),
            Ok(Message::Binary(data)) => match String::from_utf8(data.into()) {
                Ok(text) => Ok(parse_lenient(&text)),
                Err(_) => Ok(None),
            },
            // A close frame is the server ending the session on purpose.
            Ok(Message::Close(_)) => Err(self.mark_closed(DisconnectKind::ServerInitiated)),
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(ref e)) if is_would_block(e) => Ok(None),
            Err(e) => {
                log::debug!("websocket read failed: {e}");
                Err(self.mark_closed(DisconnectKind::TransportClosed))
            }
        }
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.socket.close(None);
            let _ = self.socket.flush();
            self.open = false;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Messages with an unrecognized `type` are skipped, not fatal: the
/// service may add message kinds this client predates.
fn parse_lenient(text: &str) -> Option<ServerMessage> {
    match ServerMessage::from_json(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            log::debug!("ignoring unparseable server message: {e}");
            None
        }
    }
}

fn is_would_block(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

fn set_read_timeout(
    stream: &MaybeTlsStream<TcpStream>,
    timeout: Duration,
) -> Result<(), TransportError> {
    match stream {
        MaybeTlsStream::Plain(s) => s.set_read_timeout(Some(timeout))?,
        MaybeTlsStream::NativeTls(s) => s.get_ref().set_read_timeout(Some(timeout))?,
        _ => {}
    }
    Ok(())
}
