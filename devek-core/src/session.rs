//! Session manager: the connection state machine
//!
//! [`SessionManager`] owns the single transport, the auth token cache, the
//! reconnect policy and every timer. All inputs (host commands, transport
//! events, timer expiries) arrive as [`SessionEvent`]s through
//! [`SessionManager::handle`], one at a time, so no locking is needed.
//! [`SessionManager::spawn`] runs the manager on its own task and returns a
//! [`SessionHandle`] for the host.
//!
//! ```text
//!   Initializing ──► Disconnected ◄──────────────┐
//!        │               │ login / reconnect     │ close 1000, auth rejected,
//!        ▼               ▼                       │ retry declined, logout
//!        └─────────► Connecting ──► Connected ───┤
//!                        ▲   │          │        │
//!                  retry │   ▼          ▼        │
//!                        └─ Error ◄─────┘ ───────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::collaborators::{StatusSink, UrlOpener};
use crate::config::{ConnectionConfig, DeviceInfo};
use crate::error::SessionError;
use crate::protocol::{AuthResult, ChangeData, InboundMessage, OutboundMessage, ResultStatus};
use crate::reconnect::ReconnectPolicy;
use crate::status::{ConnectionStatus, Notice, SessionSnapshot};
use crate::store::TokenStore;
use crate::transport::{
    CLOSE_NORMAL, ConnectionId, Connector, Transport, TransportEvent, TransportEvents,
};

/// Requests from the host
#[derive(Debug)]
pub enum SessionCommand {
    /// Load the stored token and connect if one exists
    Activate,
    /// Run the device pairing flow; the reply carries the outcome
    Login { reply: oneshot::Sender<bool> },
    Logout,
    /// Manual reconnect; also the "retry" answer to a retry/cancel choice
    Reconnect,
    /// The "cancel" answer to a retry/cancel choice
    DeclineRetry,
    /// Transmit one edit if the session is live
    SendChange(ChangeData),
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Close everything and stop the manager
    Dispose,
}

/// Everything the manager reacts to
#[derive(Debug)]
pub enum SessionEvent {
    Command(SessionCommand),
    Transport {
        connection: ConnectionId,
        event: TransportEvent,
    },
    PingDue {
        connection: ConnectionId,
    },
    HandshakeTimeout {
        connection: ConnectionId,
    },
    LoginTimeout {
        login: u64,
    },
    RetryDue {
        retry: u64,
    },
}

/// Host-provided collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub connector: Arc<dyn Connector>,
    pub store: Arc<dyn TokenStore>,
    pub sink: Arc<dyn StatusSink>,
    pub opener: Arc<dyn UrlOpener>,
}

/// A scheduled timer task; dropping it cancels the timer
struct Timer {
    id: u64,
    delay: Duration,
    handle: AbortHandle,
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct ActiveTransport {
    id: ConnectionId,
    transport: Box<dyn Transport>,
    open: bool,
    /// Sent on open when no token is held
    login_payload: Option<OutboundMessage>,
}

struct PendingLogin {
    id: u64,
    reply: oneshot::Sender<bool>,
}

/// Owner of the single connection to the devek server
pub struct SessionManager {
    config: ConnectionConfig,
    device: DeviceInfo,
    collaborators: Collaborators,
    events: mpsc::UnboundedSender<SessionEvent>,

    status: ConnectionStatus,
    detail: Option<String>,
    auth_token: Option<String>,
    transport: Option<ActiveTransport>,
    reconnect: ReconnectPolicy,
    pending_login: Option<PendingLogin>,
    awaiting_retry: bool,
    disposed: bool,
    next_id: u64,

    login_timer: Option<Timer>,
    ping_timer: Option<Timer>,
    handshake_timer: Option<Timer>,
    retry_timer: Option<Timer>,
}

impl SessionManager {
    /// Create a manager in the `Initializing` state.
    ///
    /// `events` must feed back into [`handle`](Self::handle); timers and
    /// transports report through it.
    pub fn new(
        config: ConnectionConfig,
        device: DeviceInfo,
        collaborators: Collaborators,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let reconnect = config.reconnect_policy();
        Self {
            config,
            device,
            collaborators,
            events,
            status: ConnectionStatus::Initializing,
            detail: None,
            auth_token: None,
            transport: None,
            reconnect,
            pending_login: None,
            awaiting_retry: false,
            disposed: false,
            next_id: 0,
            login_timer: None,
            ping_timer: None,
            handshake_timer: None,
            retry_timer: None,
        }
    }

    /// Run a manager on its own task.
    pub fn spawn(
        config: ConnectionConfig,
        device: DeviceInfo,
        collaborators: Collaborators,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self::new(config, device, collaborators, tx.clone());
        let task = tokio::spawn(manager.run(rx));
        (SessionHandle { tx }, task)
    }

    /// Process events until disposed or every sender is gone.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
            if self.disposed {
                break;
            }
        }
        debug!("Session manager stopped");
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Identity of the current transport, if any
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.transport.as_ref().map(|active| active.id)
    }

    pub fn is_transport_open(&self) -> bool {
        self.transport.as_ref().is_some_and(|active| active.open)
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    /// Delay of the pending automatic retry, if one is scheduled
    pub fn scheduled_retry(&self) -> Option<Duration> {
        self.retry_timer.as_ref().map(|timer| timer.delay)
    }

    pub fn has_pending_login(&self) -> bool {
        self.pending_login.is_some()
    }

    pub fn is_awaiting_retry(&self) -> bool {
        self.awaiting_retry
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            detail: self.detail.clone(),
            logged_in: self.auth_token.is_some(),
            transport_open: self.is_transport_open(),
            reconnect_attempts: self.reconnect.attempts(),
            awaiting_retry: self.awaiting_retry,
            device: self.device.clone(),
        }
    }

    /// Single dispatch entry point.
    pub async fn handle(&mut self, event: SessionEvent) {
        if self.disposed {
            debug!("Ignoring {:?} after dispose", event);
            return;
        }

        match event {
            SessionEvent::Command(command) => self.handle_command(command).await,
            SessionEvent::Transport { connection, event } => {
                if !self.is_current(connection) {
                    debug!(
                        "Ignoring {:?} from superseded connection {}",
                        event, connection
                    );
                    return;
                }
                match event {
                    TransportEvent::Open => self.on_open(),
                    TransportEvent::Message(text) => self.on_message(&text).await,
                    TransportEvent::Error(message) => self.on_error(&message),
                    TransportEvent::Close { code, reason } => self.on_close(code, &reason),
                }
            }
            SessionEvent::PingDue { connection } => self.on_ping_due(connection),
            SessionEvent::HandshakeTimeout { connection } => self.on_handshake_timeout(connection),
            SessionEvent::LoginTimeout { login } => self.on_login_timeout(login),
            SessionEvent::RetryDue { retry } => self.on_retry_due(retry),
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Activate => self.activate().await,
            SessionCommand::Login { reply } => self.login(reply),
            SessionCommand::Logout => self.logout().await,
            SessionCommand::Reconnect => self.reconnect(),
            SessionCommand::DeclineRetry => self.decline_retry(),
            SessionCommand::SendChange(change) => self.send_change(change),
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Dispose => self.dispose(),
        }
    }

    // ==================== Host operations ====================

    async fn activate(&mut self) {
        if self.status != ConnectionStatus::Initializing {
            debug!("Session already activated");
            return;
        }

        self.auth_token = self.collaborators.store.get(&self.config.token_key).await;
        if self.auth_token.is_some() {
            info!("Found stored auth token, connecting");
            self.connect(None, None);
        } else {
            self.set_status(ConnectionStatus::Disconnected, None);
            self.collaborators.sink.notify(&Notice::LoginRequired);
        }
    }

    fn login(&mut self, reply: oneshot::Sender<bool>) {
        let id = self.next_id();
        info!("Starting login");
        self.set_status(ConnectionStatus::Connecting, None);
        self.login_timer = Some(self.schedule(
            id,
            self.config.login_timeout,
            SessionEvent::LoginTimeout { login: id },
        ));
        self.connect(
            Some(OutboundMessage::PluginLogin),
            Some(PendingLogin { id, reply }),
        );
    }

    async fn logout(&mut self) {
        let had_token = self.auth_token.is_some();
        info!("Logging out");

        self.clear_token().await;
        self.teardown_transport();
        self.retry_timer = None;
        self.awaiting_retry = false;
        self.resolve_login(false);
        self.set_status(ConnectionStatus::Disconnected, None);

        if had_token {
            self.collaborators.sink.notify(&Notice::LoginRequired);
        }
    }

    fn reconnect(&mut self) {
        info!("Manual reconnect");
        self.reconnect.reset();
        self.connect(None, None);
    }

    fn decline_retry(&mut self) {
        if !self.awaiting_retry {
            debug!("No retry offer outstanding");
            return;
        }
        info!("Retry declined");
        self.awaiting_retry = false;
        self.retry_timer = None;
        self.teardown_transport();
        self.set_status(ConnectionStatus::Disconnected, None);
    }

    fn send_change(&mut self, change: ChangeData) {
        if self.auth_token.is_none() || !self.is_transport_open() {
            debug!("Dropping change to {} while offline", change.document_uri);
            return;
        }

        let message = OutboundMessage::Change { data: change };
        if let Err(e) = self.send(&message) {
            warn!("Failed to send code change: {}", e);
            self.collaborators.sink.notify(&Notice::EditSyncFailed {
                message: e.to_string(),
            });
        }
    }

    fn dispose(&mut self) {
        info!("Disposing session");
        self.teardown_transport();
        self.retry_timer = None;
        self.login_timer = None;
        self.pending_login = None;
        self.awaiting_retry = false;
        self.disposed = true;
    }

    // ==================== Connection ====================

    /// Replace the transport with a new one.
    fn connect(&mut self, login_payload: Option<OutboundMessage>, login: Option<PendingLogin>) {
        self.teardown_transport();
        self.retry_timer = None;
        self.awaiting_retry = false;

        if let Some(login) = login
            && self.pending_login.replace(login).is_some()
        {
            debug!("Superseded a pending login");
        }

        self.set_status(ConnectionStatus::Connecting, None);

        let id = ConnectionId::new(self.next_id());
        let events = TransportEvents::new(id, self.events.clone());
        match self
            .collaborators
            .connector
            .connect(&self.config.endpoint, events)
        {
            Ok(transport) => {
                info!("Connecting to {} (connection {})", self.config.endpoint, id);
                self.transport = Some(ActiveTransport {
                    id,
                    transport,
                    open: false,
                    login_payload,
                });
                self.handshake_timer = Some(self.schedule(
                    id.get(),
                    self.config.handshake_timeout,
                    SessionEvent::HandshakeTimeout { connection: id },
                ));
            }
            Err(e) => {
                let failure = SessionError::TransportConstruction(e.to_string());
                error!("{}", failure);
                self.set_status(ConnectionStatus::Error, Some(failure.to_string()));
                self.resolve_login(false);
                self.offer_retry(Notice::ConnectionFailed {
                    message: failure.to_string(),
                });
            }
        }
    }

    /// Detach and close the current transport and cancel its timers.
    fn teardown_transport(&mut self) {
        self.ping_timer = None;
        self.handshake_timer = None;
        if let Some(mut active) = self.transport.take() {
            debug!("Tearing down connection {}", active.id);
            active.transport.close();
        }
    }

    fn is_current(&self, connection: ConnectionId) -> bool {
        self.connection_id() == Some(connection)
    }

    fn send(&self, message: &OutboundMessage) -> Result<(), SessionError> {
        let active = self
            .transport
            .as_ref()
            .filter(|active| active.open)
            .ok_or(SessionError::NotConnected)?;
        let json = message
            .to_json()
            .map_err(|e| SessionError::SendFailed(e.to_string()))?;
        debug!("Sending {} on connection {}", message.kind(), active.id);
        active
            .transport
            .send(json)
            .map_err(|e| SessionError::SendFailed(e.to_string()))
    }

    fn send_or_warn(&self, message: &OutboundMessage) {
        if let Err(e) = self.send(message) {
            warn!("Failed to send {}: {}", message.kind(), e);
        }
    }

    // ==================== Transport events ====================

    fn on_open(&mut self) {
        self.handshake_timer = None;
        self.reconnect.reset();

        let Some(active) = self.transport.as_mut() else {
            return;
        };
        active.open = true;
        let id = active.id;
        let login_payload = active.login_payload.take();
        info!("Connected to server (connection {})", id);

        if let Some(token) = self.auth_token.clone() {
            self.send_or_warn(&OutboundMessage::auth(token));
        } else if let Some(payload) = login_payload {
            self.send_or_warn(&payload);
        }

        self.ping_timer = Some(self.schedule_interval(id.get(), self.config.ping_interval, move || {
            SessionEvent::PingDue { connection: id }
        }));
    }

    async fn on_message(&mut self, text: &str) {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                let failure = SessionError::MalformedMessage(e.to_string());
                warn!("Dropping server message: {}", failure);
                if !self.is_transport_open() {
                    self.set_status(ConnectionStatus::Error, Some(failure.to_string()));
                }
                self.resolve_login(false);
                return;
            }
        };

        match message {
            InboundMessage::Init => self.on_init(),
            InboundMessage::Pong { timestamp } => {
                debug!("Received pong: {:?}", timestamp);
            }
            InboundMessage::PluginLogin { url } => self.on_plugin_login(&url),
            InboundMessage::PluginAuth { token } => self.on_plugin_auth(token).await,
            InboundMessage::Result(result) => self.on_result(result).await,
        }
    }

    fn on_init(&mut self) {
        if self.auth_token.is_some() {
            self.set_status(ConnectionStatus::Connected, None);
            self.resolve_login(true);
        } else {
            self.set_status(ConnectionStatus::Disconnected, None);
            self.resolve_login(false);
        }
    }

    fn on_plugin_login(&self, url: &str) {
        info!("Server requested device login at {}", url);
        if let Err(e) = self.collaborators.opener.open(url) {
            warn!("{}", e);
            self.collaborators.sink.notify(&Notice::OpenUrlFailed {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    }

    async fn on_plugin_auth(&mut self, token: String) {
        info!("Device login approved");
        self.store_token(&token).await;
        self.send_or_warn(&OutboundMessage::auth(token));
    }

    async fn on_result(&mut self, result: AuthResult) {
        match result.status {
            ResultStatus::Success => {
                if let Some(token) = &result.token {
                    self.store_token(token).await;
                    self.send_or_warn(&OutboundMessage::auth(token.clone()));
                }
                if self.auth_token.is_some() {
                    self.set_status(ConnectionStatus::Connected, None);
                    self.resolve_login(true);
                } else {
                    warn!("Server reported success but no token is held");
                    self.set_status(ConnectionStatus::Disconnected, None);
                    self.resolve_login(false);
                }
            }
            ResultStatus::Error => {
                let message = result
                    .message
                    .clone()
                    .unwrap_or_else(|| "Unknown server error".to_string());
                error!("Server error: {}", message);

                if result.is_auth_rejection() {
                    self.clear_token().await;
                    let failure = SessionError::AuthRejected(message.clone());
                    self.set_status(ConnectionStatus::Disconnected, Some(failure.to_string()));
                    self.resolve_login(false);
                    self.collaborators
                        .sink
                        .notify(&Notice::AuthenticationFailed { message });
                } else {
                    self.set_status(ConnectionStatus::Error, Some(message.clone()));
                    self.resolve_login(false);
                    self.collaborators
                        .sink
                        .notify(&Notice::ServerError { message });
                }
            }
        }
    }

    fn on_error(&mut self, message: &str) {
        let failure = SessionError::from_transport_failure(message);
        warn!("Connection error: {}", message);

        self.teardown_transport();
        self.set_status(ConnectionStatus::Error, Some(failure.to_string()));
        self.resolve_login(false);

        match failure {
            SessionError::TerminalNetwork(_) => self.offer_retry(Notice::ConnectionFailed {
                message: failure.to_string(),
            }),
            _ => self.schedule_reconnect(),
        }
    }

    fn on_close(&mut self, code: u16, reason: &str) {
        info!("Connection closed (code {}) {}", code, reason);
        self.teardown_transport();

        if code == CLOSE_NORMAL {
            self.set_status(ConnectionStatus::Disconnected, None);
        } else if self.auth_token.is_some() && self.reconnect.can_retry() {
            let failure = SessionError::UnexpectedClose { code };
            self.set_status(ConnectionStatus::Error, Some(failure.to_string()));
            self.schedule_reconnect();
        } else if self.auth_token.is_some() {
            self.set_status(ConnectionStatus::Disconnected, None);
            self.offer_retry(Notice::ReconnectExhausted {
                attempts: self.reconnect.attempts(),
            });
        } else {
            self.set_status(ConnectionStatus::Disconnected, None);
        }

        self.resolve_login(false);
    }

    // ==================== Timers ====================

    fn on_ping_due(&mut self, connection: ConnectionId) {
        if !self.is_current(connection) {
            return;
        }
        if self.is_transport_open() {
            self.send_or_warn(&OutboundMessage::Ping);
        } else {
            self.ping_timer = None;
        }
    }

    fn on_handshake_timeout(&mut self, connection: ConnectionId) {
        if !self.is_current(connection) || self.is_transport_open() {
            return;
        }

        let failure = SessionError::HandshakeTimeout;
        warn!("{} (connection {})", failure, connection);
        self.teardown_transport();
        self.resolve_login(false);
        if self.auth_token.is_some() {
            self.set_status(ConnectionStatus::Error, Some(failure.to_string()));
            self.schedule_reconnect();
        } else {
            self.set_status(ConnectionStatus::Disconnected, Some(failure.to_string()));
        }
    }

    fn on_login_timeout(&mut self, login: u64) {
        if !self
            .pending_login
            .as_ref()
            .is_some_and(|pending| pending.id == login)
        {
            return;
        }

        warn!("Login attempt timed out");
        self.resolve_login(false);
        self.set_status(
            ConnectionStatus::Disconnected,
            Some("Login attempt timed out".to_string()),
        );
        self.collaborators.sink.notify(&Notice::LoginTimedOut);
    }

    fn on_retry_due(&mut self, retry: u64) {
        if !self.retry_timer.as_ref().is_some_and(|timer| timer.id == retry) {
            debug!("Ignoring superseded retry");
            return;
        }
        self.retry_timer = None;

        if self.auth_token.is_some() {
            info!(
                "Reconnecting (attempt {}/{})",
                self.reconnect.attempts(),
                self.reconnect.max_attempts()
            );
            self.connect(None, None);
        } else {
            self.set_status(ConnectionStatus::Disconnected, None);
        }
    }

    /// Schedule the next automatic retry, or ask the user once the budget is spent.
    ///
    /// Status stays `Error` until the retry fires and `connect` moves it to
    /// `Connecting`.
    fn schedule_reconnect(&mut self) {
        match self.reconnect.next_delay() {
            Some(delay) => {
                let detail = format!(
                    "Reconnecting in {}s (attempt {}/{})",
                    delay.as_secs(),
                    self.reconnect.attempts(),
                    self.reconnect.max_attempts()
                );
                info!("{}", detail);
                self.set_status(ConnectionStatus::Error, Some(detail));

                let id = self.next_id();
                self.retry_timer =
                    Some(self.schedule(id, delay, SessionEvent::RetryDue { retry: id }));
            }
            None => {
                warn!("Reconnection attempts exhausted");
                self.retry_timer = None;
                self.set_status(
                    ConnectionStatus::Error,
                    Some("Reconnection attempts exhausted".to_string()),
                );
                self.offer_retry(Notice::ReconnectExhausted {
                    attempts: self.reconnect.attempts(),
                });
            }
        }
    }

    fn offer_retry(&mut self, notice: Notice) {
        self.awaiting_retry = true;
        self.collaborators.sink.notify(&notice);
    }

    fn schedule(&self, id: u64, delay: Duration, event: SessionEvent) -> Timer {
        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        })
        .abort_handle();
        Timer { id, delay, handle }
    }

    fn schedule_interval<F>(&self, id: u64, period: Duration, event: F) -> Timer
    where
        F: Fn() -> SessionEvent + Send + 'static,
    {
        let tx = self.events.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if tx.send(event()).is_err() {
                    break;
                }
            }
        })
        .abort_handle();
        Timer {
            id,
            delay: period,
            handle,
        }
    }

    // ==================== State ====================

    fn set_status(&mut self, status: ConnectionStatus, detail: Option<String>) {
        if self.status == status && self.detail == detail {
            return;
        }
        debug!("Connection status: {} -> {}", self.status, status);
        self.status = status;
        self.detail = detail;
        self.collaborators
            .sink
            .status_changed(status, self.detail.as_deref());
    }

    fn resolve_login(&mut self, success: bool) {
        self.login_timer = None;
        if let Some(pending) = self.pending_login.take() {
            debug!("Login resolved: {}", success);
            let _ = pending.reply.send(success);
        }
    }

    async fn store_token(&mut self, token: &str) {
        self.auth_token = Some(token.to_string());
        if let Err(e) = self
            .collaborators
            .store
            .set(&self.config.token_key, token)
            .await
        {
            warn!("Failed to persist auth token: {}", e);
        }
    }

    async fn clear_token(&mut self) {
        self.auth_token = None;
        if let Err(e) = self.collaborators.store.clear(&self.config.token_key).await {
            warn!("Failed to clear stored auth token: {}", e);
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Cloneable front for a spawned [`SessionManager`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx
            .send(SessionEvent::Command(command))
            .map_err(|_| SessionError::ManagerStopped)
    }

    /// Load the stored token and connect if one exists
    pub fn activate(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Activate)
    }

    /// Start the pairing flow.
    ///
    /// The returned outcome resolves once the server accepts or rejects the
    /// login, or after the login timeout.
    pub fn login(&self) -> Result<LoginOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Login { reply })?;
        Ok(LoginOutcome {
            rx,
            tx: self.tx.clone(),
        })
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Logout)
    }

    /// Reconnect now with a fresh attempt budget
    pub fn reconnect(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Reconnect)
    }

    /// Answer a retry offer with "cancel"
    pub fn decline_retry(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::DeclineRetry)
    }

    pub fn send_change(&self, change: ChangeData) -> Result<(), SessionError> {
        self.command(SessionCommand::SendChange(change))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Snapshot { reply })?;
        rx.await.map_err(|_| SessionError::ManagerStopped)
    }

    pub fn dispose(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Dispose)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Deferred result of [`SessionHandle::login`]
#[derive(Debug)]
pub struct LoginOutcome {
    rx: oneshot::Receiver<bool>,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl LoginOutcome {
    /// Wait for the outcome: `true` once the session is authenticated.
    pub async fn wait(self) -> Result<bool, SessionError> {
        match self.rx.await {
            Ok(success) => Ok(success),
            Err(_) if self.tx.is_closed() => Err(SessionError::ManagerStopped),
            Err(_) => Err(SessionError::LoginSuperseded),
        }
    }
}
