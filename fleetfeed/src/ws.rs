//! Channel transport: one persistent WebSocket connection at a time, with
//! heartbeat keep-alive and supervised reconnection.
//!
//! The client is an explicitly constructed, explicitly owned instance — no
//! process-wide singleton — so independent clients can coexist and tests can
//! run against isolated instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::events::FeedEvents;
use crate::heartbeat::start_heartbeat;
use crate::protocol::{decode_frame, FrameError, IncomingFrame, OutgoingFrame};
use crate::reconnect::ReconnectPolicy;
use crate::report::ErrorSink;
use crate::status::{AtomicStatus, ConnectionStats, TransportStatus};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tunables for the channel client.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket endpoint (`ws://.../ws-frontend`).
    pub url: Url,
    /// Ping cadence while the connection is open.
    pub heartbeat_interval: Duration,
    /// Bound on connection establishment; a socket stuck in the handshake
    /// fails the attempt instead of hanging `connecting` forever.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection attempt timed out")]
    Timeout,
}

/// How one serviced connection ended.
enum CloseReason {
    /// Remote close frame or end of stream.
    Remote,
    /// Read or write error.
    Error,
    /// Our own writer went away; `disconnect` is tearing things down.
    Local,
}

/// Client for the push channel.
pub struct ChannelClient {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    config: ChannelConfig,
    status: AtomicStatus,
    manual_close: AtomicBool,
    stats: Mutex<ConnectionStats>,
    outbound: Mutex<Option<mpsc::UnboundedSender<OutgoingFrame>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    events: Arc<FeedEvents>,
    sink: Arc<dyn ErrorSink>,
}

impl ChannelClient {
    pub fn new(config: ChannelConfig, events: Arc<FeedEvents>, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                config,
                status: AtomicStatus::new(TransportStatus::Idle),
                manual_close: AtomicBool::new(false),
                stats: Mutex::new(ConnectionStats::default()),
                outbound: Mutex::new(None),
                supervisor: Mutex::new(None),
                events,
                sink,
            }),
        }
    }

    /// Current transport status.
    pub fn status(&self) -> TransportStatus {
        self.inner.status.load()
    }

    pub fn is_open(&self) -> bool {
        self.status() == TransportStatus::Open
    }

    /// Snapshot of the connection statistics.
    pub fn stats(&self) -> ConnectionStats {
        self.inner.lock_stats().clone()
    }

    /// Open the channel. Resolves once the socket is ready to send and
    /// receive; errors if establishment fails or times out. Calling this on
    /// an already-open channel is a no-op.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        if self.is_open() {
            return Ok(());
        }
        // any supervisor left over from a failed or closed sequence is stale
        self.disarm_supervisor();
        self.inner.manual_close.store(false, Ordering::SeqCst);
        self.inner.set_status(TransportStatus::Connecting);

        let ws = match self.inner.open_socket().await {
            Ok(ws) => ws,
            Err(e) => {
                self.inner.set_status(TransportStatus::Failed);
                return Err(e);
            }
        };

        self.inner.lock_stats().connect_time = Some(Utc::now());
        self.inner.set_status(TransportStatus::Open);
        info!(url = %self.inner.config.url, "channel open");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.supervise(ws));
        *self
            .inner
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Queue a frame for sending. Fire-and-forget: when the channel is not
    /// open this logs and drops the frame instead of erroring.
    pub fn send(&self, frame: OutgoingFrame) {
        let guard = self
            .inner
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    warn!("channel closing; dropped outbound frame");
                }
            }
            None => warn!("channel not open; dropped outbound frame"),
        }
    }

    /// Close the channel on purpose: suppresses reconnection, cancels any
    /// pending attempt timer before returning, and resets statistics. Safe
    /// to call repeatedly and from any state; an already-closed channel
    /// emits no further status events.
    pub fn disconnect(&self) {
        self.inner.manual_close.store(true, Ordering::SeqCst);
        self.disarm_supervisor();
        *self.inner.lock_stats() = ConnectionStats::default();
        self.inner.set_status(TransportStatus::Closed);
    }

    fn disarm_supervisor(&self) {
        if let Some(handle) = self
            .inner
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        *self
            .inner
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.disarm_supervisor();
    }
}

impl ChannelInner {
    fn lock_stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new status, emitting a transition only on change. No internal
    /// lock is held while listeners run, so a listener may call back into
    /// this client.
    fn set_status(&self, next: TransportStatus) {
        let prev = self.status.swap(next);
        if prev != next {
            self.events.emit_status(next);
        }
    }

    async fn open_socket(&self) -> Result<WsStream, ChannelError> {
        match timeout(
            self.config.connect_timeout,
            connect_async(self.config.url.as_str()),
        )
        .await
        {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(ChannelError::Handshake(e)),
            Err(_) => Err(ChannelError::Timeout),
        }
    }

    /// Own the connection for its whole life: service it, and when it ends
    /// unexpectedly, run the reconnect schedule until it is re-established
    /// or the attempt budget runs out.
    async fn supervise(self: Arc<Self>, first: WsStream) {
        let mut stream = Some(first);
        'connection: while let Some(ws) = stream.take() {
            let reason = self.run_connection(ws).await;
            if self.manual_close.load(Ordering::SeqCst) || matches!(reason, CloseReason::Local) {
                return;
            }
            self.set_status(TransportStatus::Closed);

            let mut attempt = 0u32;
            loop {
                attempt += 1;
                if !self.config.reconnect.should_retry(attempt) {
                    warn!(
                        attempts = attempt - 1,
                        "reconnect budget exhausted; channel failed"
                    );
                    self.set_status(TransportStatus::Failed);
                    return;
                }
                self.set_status(TransportStatus::Reconnecting);
                let delay = self.config.reconnect.delay_for_attempt(attempt);
                info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                sleep(delay).await;
                if self.manual_close.load(Ordering::SeqCst) {
                    return;
                }
                match self.open_socket().await {
                    Ok(ws) => {
                        {
                            let mut stats = self.lock_stats();
                            stats.reconnect_count += 1;
                            stats.connect_time = Some(Utc::now());
                        }
                        self.set_status(TransportStatus::Open);
                        info!(attempt, "channel reconnected");
                        stream = Some(ws);
                        continue 'connection;
                    }
                    Err(e) => self.sink.report("channel reconnect", &e),
                }
            }
        }
    }

    /// Service one open connection until it ends; returns why it ended.
    async fn run_connection(&self, ws: WsStream) -> CloseReason {
        let (mut write, mut read) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<OutgoingFrame>();
        *self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tx.clone());
        let heartbeat = start_heartbeat(tx, self.config.heartbeat_interval);

        let reason = loop {
            tokio::select! {
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "remote closed the channel");
                        break CloseReason::Remote;
                    }
                    // protocol-level ping/pong and binary frames are not ours
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%e, "channel read error");
                        break CloseReason::Error;
                    }
                    None => break CloseReason::Remote,
                },
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        let payload = match serde_json::to_string(&frame) {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(%e, "could not encode outbound frame");
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Text(payload)).await {
                            warn!(%e, "channel write failed");
                            break CloseReason::Error;
                        }
                    }
                    None => break CloseReason::Local,
                },
            }
        };

        heartbeat.abort();
        *self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        reason
    }

    /// One inbound text frame: count it, decode it, route it.
    fn handle_text(&self, text: &str) {
        {
            let mut stats = self.lock_stats();
            stats.message_count += 1;
            stats.last_message_time = Some(Utc::now());
        }
        match decode_frame(text) {
            Ok(IncomingFrame::Pong) => debug!("heartbeat pong received"),
            Ok(IncomingFrame::ServerStatusUpdate { data }) => {
                debug!(servers = data.len(), "status update received");
                self.events.emit_snapshots(&data);
            }
            Err(FrameError::UnknownType(kind)) => {
                warn!(%kind, "dropping frame of unrecognized type");
            }
            Err(e) => {
                // malformed payload: report it, keep the connection
                self.sink.report("decode channel frame", &e);
            }
        }
    }
}
