//! Shared test utilities for devek-core integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use devek_core::{
    Collaborators, ConnectionConfig, ConnectionStatus, Connector, DeviceInfo, MemoryTokenStore,
    Notice, SessionCommand, SessionError, SessionEvent, SessionManager, StatusSink, TokenStore,
    Transport, TransportError, TransportEvent, TransportEvents, UrlOpener,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

pub const TOKEN_KEY: &str = "devekAuthToken";

/// One transport handed out by [`MockConnector`]
#[derive(Clone)]
pub struct MockConnection {
    pub events: TransportEvents,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockConnection {
    pub fn emit(&self, event: TransportEvent) {
        assert!(self.events.emit(event), "manager channel closed");
    }

    /// Frames written to this transport, parsed as JSON
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make the transport reject further sends
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector that records every transport it creates
#[derive(Default)]
pub struct MockConnector {
    connections: Mutex<Vec<MockConnection>>,
    endpoints: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl MockConnector {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn connection(&self, index: usize) -> MockConnection {
        self.connections.lock().unwrap()[index].clone()
    }

    pub fn latest(&self) -> MockConnection {
        self.connections
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no connection was made")
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        endpoint: &str,
        events: TransportEvents,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Connect("invalid endpoint".to_string()));
        }

        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.connections.lock().unwrap().push(MockConnection {
            events,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(MockTransport { sent, closed }))
    }
}

/// Sink recording every status change and notice
#[derive(Default)]
pub struct RecordingSink {
    statuses: Mutex<Vec<(ConnectionStatus, Option<String>)>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(status, _)| *status)
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSink {
    fn status_changed(&self, status: ConnectionStatus, detail: Option<&str>) {
        self.statuses
            .lock()
            .unwrap()
            .push((status, detail.map(str::to_string)));
    }

    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Opener recording requested URLs
#[derive(Default)]
pub struct RecordingOpener {
    urls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingOpener {
    pub fn failing() -> Self {
        let opener = Self::default();
        opener.fail.store(true, Ordering::SeqCst);
        opener
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<(), SessionError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::OpenUrl {
                url: url.to_string(),
                message: "no browser".to_string(),
            });
        }
        Ok(())
    }
}

/// A manager driven by hand, with its event channel exposed
pub struct Harness {
    pub manager: SessionManager,
    pub rx: mpsc::UnboundedReceiver<SessionEvent>,
    pub connector: Arc<MockConnector>,
    pub store: MemoryTokenStore,
    pub sink: Arc<RecordingSink>,
    pub opener: Arc<RecordingOpener>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(token: Option<&str>) -> Self {
        Self::with_opener(token, RecordingOpener::default())
    }

    pub fn with_opener(token: Option<&str>, opener: RecordingOpener) -> Self {
        let connector = Arc::new(MockConnector::default());
        let store = match token {
            Some(token) => MemoryTokenStore::with_value(TOKEN_KEY, token),
            None => MemoryTokenStore::new(),
        };
        let sink = Arc::new(RecordingSink::default());
        let opener = Arc::new(opener);

        let collaborators = Collaborators {
            connector: connector.clone(),
            store: Arc::new(store.clone()),
            sink: sink.clone(),
            opener: opener.clone(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = SessionManager::new(
            ConnectionConfig::default(),
            DeviceInfo::new("workstation", "devek-cli"),
            collaborators,
            tx,
        );

        Self {
            manager,
            rx,
            connector,
            store,
            sink,
            opener,
        }
    }

    pub async fn command(&mut self, command: SessionCommand) {
        self.manager.handle(SessionEvent::Command(command)).await;
        self.pump().await;
    }

    pub async fn activate(&mut self) {
        self.command(SessionCommand::Activate).await;
    }

    pub async fn login(&mut self) -> oneshot::Receiver<bool> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Login { reply }).await;
        rx
    }

    /// Handle every event already queued
    pub async fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.manager.handle(event).await;
        }
    }

    /// Wait for the next event (a timer, under paused time) and handle it
    pub async fn next_event(&mut self) {
        let event = self.rx.recv().await.expect("event channel closed");
        self.manager.handle(event).await;
    }

    pub async fn emit(&mut self, event: TransportEvent) {
        self.connector.latest().emit(event);
        self.pump().await;
    }

    pub async fn open(&mut self) {
        self.emit(TransportEvent::Open).await;
    }

    pub async fn server(&mut self, json: &str) {
        self.emit(TransportEvent::Message(json.to_string())).await;
    }

    pub async fn close(&mut self, code: u16) {
        self.emit(TransportEvent::Close {
            code,
            reason: String::new(),
        })
        .await;
    }

    /// Activate with the stored token and complete the handshake
    pub async fn connected(token: &str) -> Self {
        let mut harness = Self::new(Some(token));
        harness.activate().await;
        harness.open().await;
        harness.server(r#"{"type":"init"}"#).await;
        assert_eq!(harness.manager.status(), ConnectionStatus::Connected);
        harness
    }

    pub async fn stored_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).await
    }
}
