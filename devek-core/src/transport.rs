//! Transport abstraction and the WebSocket implementation
//!
//! A [`Connector`] opens one transport per connection attempt. The transport
//! reports its lifecycle as [`TransportEvent`]s tagged with the
//! [`ConnectionId`] it was opened under, so the manager can discard events
//! from a transport it has already replaced.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::session::SessionEvent;

/// Normal closure
pub const CLOSE_NORMAL: u16 = 1000;
/// Close frame without a status code
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Identity of one transport instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle events reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished, the transport can send
    Open,
    /// A text frame arrived
    Message(String),
    /// The transport failed; no further events follow
    Error(String),
    /// The transport closed
    Close { code: u16, reason: String },
}

/// Channel a transport reports its events through.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl TransportEvents {
    pub(crate) fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { connection, tx }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Report an event. Returns false once the manager has stopped.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent::Transport {
                connection: self.connection,
                event,
            })
            .is_ok()
    }
}

/// Sending half of an open or opening transport.
///
/// Dropping the transport detaches it; the manager ignores anything it
/// reports afterwards.
pub trait Transport: Send {
    /// Queue a text frame. Does not wait for the write.
    fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the transport, or abandon it if it is still connecting.
    fn close(&mut self);
}

/// Opens transports to the server.
pub trait Connector: Send + Sync {
    /// Start opening a transport to `endpoint` and return immediately.
    ///
    /// An `Err` means the transport could not even be constructed; failures
    /// after that are reported through `events`.
    fn connect(
        &self,
        endpoint: &str,
        events: TransportEvents,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite.
///
/// tungstenite never negotiates permessage-deflate, so frames go out
/// uncompressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(
        &self,
        endpoint: &str,
        events: TransportEvents,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let opened = Arc::new(AtomicBool::new(false));

        debug!("Opening connection {} to {}", events.connection(), endpoint);
        let task = runtime.spawn(Self::connection_task(
            endpoint.to_string(),
            outgoing_rx,
            events,
            Arc::clone(&opened),
        ));

        Ok(Box::new(WsTransport {
            outgoing: outgoing_tx,
            opened,
            task,
        }))
    }
}

impl WsConnector {
    /// Task that owns the socket for one connection
    async fn connection_task(
        endpoint: String,
        mut outgoing: mpsc::UnboundedReceiver<Message>,
        events: TransportEvents,
        opened: Arc<AtomicBool>,
    ) {
        let config = WebSocketConfig::default();
        let (ws_stream, _response) =
            match connect_async_with_config(endpoint.as_str(), Some(config), false).await {
                Ok(connected) => connected,
                Err(e) => {
                    warn!("Connection {} failed: {}", events.connection(), e);
                    events.emit(TransportEvent::Error(e.to_string()));
                    return;
                }
            };

        opened.store(true, Ordering::Relaxed);
        events.emit(TransportEvent::Open);

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                outbound = outgoing.recv() => match outbound {
                    Some(message) => {
                        let closing = matches!(message, Message::Close(_));
                        if let Err(e) = ws_sender.send(message).await {
                            warn!("Failed to send WebSocket message: {}", e);
                            events.emit(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        if closing {
                            debug!("Close frame sent on connection {}", events.connection());
                        }
                    }
                    None => {
                        // Transport handle dropped
                        let _ = ws_sender.close().await;
                        break;
                    }
                },
                inbound = ws_receiver.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        events.emit(TransportEvent::Message(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                            .unwrap_or((CLOSE_NO_STATUS, String::new()));
                        events.emit(TransportEvent::Close { code, reason });
                        // Flush the close reply tungstenite queued
                        let _ = ws_sender.close().await;
                        break;
                    }
                    Some(Ok(_)) => {
                        // Pong replies are sent by tungstenite
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        events.emit(TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        events.emit(TransportEvent::Close {
                            code: CLOSE_ABNORMAL,
                            reason: String::new(),
                        });
                        break;
                    }
                },
            }
        }

        opened.store(false, Ordering::Relaxed);
        debug!("Connection {} task finished", events.connection());
    }
}

struct WsTransport {
    outgoing: mpsc::UnboundedSender<Message>,
    opened: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Transport for WsTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.opened.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        self.outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if self.opened.load(Ordering::Relaxed) {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Utf8Bytes::from_static(""),
            };
            let _ = self.outgoing.send(Message::Close(Some(frame)));
        } else {
            self.task.abort();
        }
    }
}
