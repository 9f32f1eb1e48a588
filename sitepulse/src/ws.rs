//! Host-stats stream: WebSocket connection lifecycle and frame ingestion.

use std::io::BufReader;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{future::BoxFuture, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, tungstenite::Message, Connector,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, DecodeError, Result};
use crate::frame;
use crate::history::SampleBuffer;
use crate::types::Sample;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const STREAM_PATH: &str = "/ws/host-stats";

/// Derive the stream endpoint from the REST base: `http(s)` becomes `ws(s)`
/// and [`STREAM_PATH`] is appended to the base path.
pub fn stream_url(api_base: &str) -> Result<Url> {
    let mut url = Url::parse(api_base).map_err(|e| ClientError::invalid_url(api_base, e))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::invalid_url(
                api_base,
                format!("unsupported scheme '{other}'"),
            ))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::invalid_url(api_base, "cannot change scheme"))?;
    let path = format!("{}{STREAM_PATH}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn tls_err(ca_path: &str, e: impl std::fmt::Display) -> ClientError {
    ClientError::Tls(format!("{ca_path}: {e}"))
}

fn tls_connector(ca_path: &str) -> Result<Connector> {
    let file = std::fs::File::open(ca_path).map_err(|e| tls_err(ca_path, e))?;
    let mut reader = BufReader::new(file);
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| tls_err(ca_path, e))?;
        roots.add(cert).map_err(|e| tls_err(ca_path, e))?;
    }
    if roots.is_empty() {
        return Err(tls_err(ca_path, "no certificates found"));
    }
    let cfg = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Connector::Rustls(Arc::new(cfg)))
}

// Connect to the stream, trusting `tls_ca` (PEM) for wss when given
pub async fn connect(url: &str, tls_ca: Option<&str>) -> Result<WsStream> {
    let ws = match tls_ca {
        Some(ca) if url.starts_with("wss://") => {
            let connector = tls_connector(ca)?;
            connect_async_tls_with_config(url, None, false, Some(connector))
                .await?
                .0
        }
        _ => connect_async(url).await?.0,
    };
    Ok(ws)
}

/// One-shot auth message sent right after the stream opens.
pub fn credentials_message(api_key: &str) -> Message {
    Message::Text(serde_json::json!({ "apiKey": api_key }).to_string())
}

// Connect and authenticate as one unit so the caller can drop it at any point.
async fn handshake(
    url: String,
    tls_ca: Option<String>,
    api_key: Option<String>,
) -> Result<WsStream> {
    let mut ws = connect(&url, tls_ca.as_deref()).await?;
    info!(url = %url, "host-stats stream open");
    if let Some(key) = api_key {
        ws.send(credentials_message(&key)).await?;
    }
    Ok(ws)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Open,
    Disconnected { reason: String },
}

/// One step of the session: connect outcome or one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Opened,
    Sample(Sample),
    Malformed(DecodeError),
    Closed(String),
    Ignored,
}

/// One dashboard's stream. Owns the sample history it feeds; both live
/// exactly as long as the dashboard does.
pub struct TelemetrySession {
    pending: Option<BoxFuture<'static, Result<WsStream>>>,
    ws: Option<WsStream>,
    buffer: SampleBuffer,
    status: SessionStatus,
    last_frame_error: Option<String>,
}

impl TelemetrySession {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: None,
            ws: None,
            buffer: SampleBuffer::new(capacity),
            status: SessionStatus::Connecting,
            last_frame_error: None,
        }
    }

    /// Wrap an already-open stream.
    pub fn with_stream(ws: WsStream, capacity: usize) -> Self {
        Self {
            ws: Some(ws),
            status: SessionStatus::Open,
            ..Self::new(capacity)
        }
    }

    /// Start connecting without waiting for it. The handshake is driven by
    /// [`next_event`](Self::next_event), which yields [`SessionEvent::Opened`]
    /// or [`SessionEvent::Closed`] once it settles; [`close`](Self::close)
    /// abandons it.
    pub fn begin_connect(&mut self, url: &str, tls_ca: Option<&str>, api_key: Option<&str>) {
        self.ws = None;
        self.status = SessionStatus::Connecting;
        self.pending = Some(Box::pin(handshake(
            url.to_string(),
            tls_ca.map(str::to_string),
            api_key.map(str::to_string),
        )));
    }

    /// Connect and wait for the outcome. Failures end up in
    /// [`SessionStatus::Disconnected`]; nothing is retried.
    pub async fn open(&mut self, url: &str, tls_ca: Option<&str>, api_key: Option<&str>) {
        self.begin_connect(url, tls_ca, api_key);
        self.next_event().await;
    }

    fn finish_connect(&mut self, result: Result<WsStream>) -> SessionEvent {
        match result {
            Ok(ws) => {
                self.ws = Some(ws);
                self.status = SessionStatus::Open;
                SessionEvent::Opened
            }
            Err(e) => {
                warn!(error = %e, "host-stats connect failed");
                let reason = e.to_string();
                self.disconnect(reason.clone());
                SessionEvent::Closed(reason)
            }
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Still connecting or open; [`next_event`](Self::next_event) has work to do.
    pub fn is_active(&self) -> bool {
        self.pending.is_some() || self.ws.is_some()
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Error from the most recent frame, cleared by the next good one.
    pub fn last_frame_error(&self) -> Option<&str> {
        self.last_frame_error.as_deref()
    }

    /// Drive a pending connect, or wait for and apply the next message.
    /// `None` once disconnected.
    /// Cancel safe: nothing is lost if the future is dropped before it resolves.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(pending) = self.pending.as_mut() {
            let result = pending.await;
            self.pending = None;
            return Some(self.finish_connect(result));
        }
        let ws = self.ws.as_mut()?;
        match ws.next().await {
            Some(Ok(msg)) if msg.is_close() => {
                // state first, so a cancelled flush loses nothing; tungstenite
                // has queued the close reply and flushing sends it
                let stream = self.ws.take();
                let event = self.handle_message(msg);
                if let Some(mut ws) = stream {
                    if let Err(e) = ws.flush().await {
                        debug!(error = %e, "close reply failed");
                    }
                }
                Some(event)
            }
            Some(Ok(msg)) => Some(self.handle_message(msg)),
            Some(Err(e)) => {
                warn!(error = %e, "host-stats transport error");
                let reason = e.to_string();
                self.disconnect(reason.clone());
                Some(SessionEvent::Closed(reason))
            }
            None => {
                let reason = "connection closed".to_string();
                self.disconnect(reason.clone());
                Some(SessionEvent::Closed(reason))
            }
        }
    }

    /// Apply one inbound message. A bad frame is dropped; the session and
    /// its history carry on.
    pub fn handle_message(&mut self, msg: Message) -> SessionEvent {
        match msg {
            Message::Binary(data) => match frame::decode(&data) {
                Ok(raw) => {
                    let sample = Sample::stamp(raw, Utc::now());
                    self.buffer.append(sample);
                    self.last_frame_error = None;
                    SessionEvent::Sample(sample)
                }
                Err(e) => {
                    warn!(len = data.len(), "dropping malformed host-stats frame");
                    self.last_frame_error = Some(e.to_string());
                    SessionEvent::Malformed(e)
                }
            },
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "server closed connection".into());
                info!(%reason, "host-stats stream closed by server");
                self.disconnect(reason.clone());
                SessionEvent::Closed(reason)
            }
            other => {
                debug!(kind = ?other, "ignoring non-binary message");
                SessionEvent::Ignored
            }
        }
    }

    // Terminal: keeps buffered samples, drops the transport.
    fn disconnect(&mut self, reason: String) {
        self.ws = None;
        self.status = SessionStatus::Disconnected { reason };
    }

    /// Close regardless of state. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.pending.take().is_some() {
            debug!("abandoning host-stats connect");
        }
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "close handshake failed");
            }
        }
        if !matches!(self.status, SessionStatus::Disconnected { .. }) {
            self.status = SessionStatus::Disconnected {
                reason: "closed".into(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawSample;
    use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};

    #[test]
    fn stream_url_swaps_scheme_and_appends_path() {
        assert_eq!(
            stream_url("http://localhost:8080").unwrap().as_str(),
            "ws://localhost:8080/ws/host-stats"
        );
        assert_eq!(
            stream_url("https://blog.example.com/api/?x=1").unwrap().as_str(),
            "wss://blog.example.com/api/ws/host-stats"
        );
        assert!(stream_url("ftp://example.com").is_err());
        assert!(stream_url("::nope").is_err());
    }

    #[test]
    fn bad_frame_keeps_history() {
        let mut s = TelemetrySession::new(4);
        let raw = RawSample {
            cpu_percent: 12.0,
            mem_total_bytes: 8,
            mem_free_bytes: 2,
        };
        assert!(matches!(
            s.handle_message(Message::Binary(raw.to_bytes().to_vec())),
            SessionEvent::Sample(_)
        ));
        assert!(matches!(
            s.handle_message(Message::Binary(vec![0; 19])),
            SessionEvent::Malformed(DecodeError::WrongLength { actual: 19, .. })
        ));
        assert_eq!(s.buffer().len(), 1);
        assert!(s.last_frame_error().is_some());

        s.handle_message(Message::Binary(raw.to_bytes().to_vec()));
        assert_eq!(s.buffer().len(), 2);
        assert!(s.last_frame_error().is_none());
        assert_eq!(s.handle_message(Message::Text("hi".into())), SessionEvent::Ignored);
    }

    #[test]
    fn server_close_is_terminal_but_keeps_samples() {
        let mut s = TelemetrySession::new(4);
        let raw = RawSample {
            cpu_percent: 1.0,
            mem_total_bytes: 1,
            mem_free_bytes: 0,
        };
        s.handle_message(Message::Binary(raw.to_bytes().to_vec()));
        let ev = s.handle_message(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "maintenance".into(),
        })));
        assert_eq!(ev, SessionEvent::Closed("maintenance".into()));
        assert_eq!(
            s.status(),
            &SessionStatus::Disconnected {
                reason: "maintenance".into()
            }
        );
        assert_eq!(s.buffer().len(), 1);
    }

    #[tokio::test]
    async fn close_is_unconditional_and_idempotent() {
        let mut s = TelemetrySession::new(4);
        assert_eq!(s.status(), &SessionStatus::Connecting);
        s.close().await;
        s.close().await;
        assert!(!s.is_open());
        assert!(s.next_event().await.is_none());
    }
}
