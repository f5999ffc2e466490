//! Session wiring for CLI commands

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use devek_core::{
    BrowserOpener, Collaborators, ConnectionStatus, DeviceInfo, FileTokenStore, Notice,
    SessionHandle, SessionManager, SessionSnapshot, StatusSink, WsConnector,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::DevekConfig;

/// What the session reported to the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Status {
        status: ConnectionStatus,
        detail: Option<String>,
    },
    Notice(Notice),
}

/// Status sink forwarding everything to the command loop
pub struct TerminalSink {
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl TerminalSink {
    pub fn new(updates: mpsc::UnboundedSender<SessionUpdate>) -> Self {
        Self { updates }
    }
}

impl StatusSink for TerminalSink {
    fn status_changed(&self, status: ConnectionStatus, detail: Option<&str>) {
        let _ = self.updates.send(SessionUpdate::Status {
            status,
            detail: detail.map(str::to_string),
        });
    }

    fn notify(&self, notice: &Notice) {
        let _ = self.updates.send(SessionUpdate::Notice(notice.clone()));
    }
}

/// A running session plus the updates it reports
pub struct CliSession {
    pub handle: SessionHandle,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
    pub device: DeviceInfo,
    task: JoinHandle<()>,
}

impl CliSession {
    /// Start a session against the configured endpoint with the on-disk token store.
    pub async fn start(config: &DevekConfig) -> Result<Self> {
        let connection = config.connection_config()?;
        let device = config.device_info();
        let store = FileTokenStore::load_default()
            .await
            .context("Failed to load session state")?;
        debug!("Session state at {}", store.path().display());

        let (tx, updates) = mpsc::unbounded_channel();
        let collaborators = Collaborators {
            connector: Arc::new(WsConnector),
            store: Arc::new(store),
            sink: Arc::new(TerminalSink::new(tx)),
            opener: Arc::new(BrowserOpener),
        };

        let (handle, task) = SessionManager::spawn(connection, device.clone(), collaborators);
        Ok(Self {
            handle,
            updates,
            device,
            task,
        })
    }

    /// Wait until the status leaves `Initializing`/`Connecting`, or `timeout` elapses.
    pub async fn settle(&mut self, timeout: Duration) -> Result<SessionSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.handle.snapshot().await?;
            if !is_transient(&snapshot) {
                return Ok(snapshot);
            }
            match tokio::time::timeout_at(deadline, self.updates.recv()).await {
                Ok(Some(update)) => print_update(&update),
                Ok(None) | Err(_) => return Ok(self.handle.snapshot().await?),
            }
        }
    }

    /// Dispose the session and wait for the manager to stop.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.dispose()?;
        self.task.await.context("Session task failed")?;
        Ok(())
    }
}

/// Still on the way to a settled status
fn is_transient(snapshot: &SessionSnapshot) -> bool {
    match snapshot.status {
        ConnectionStatus::Initializing | ConnectionStatus::Connecting => true,
        // A scheduled retry is still in flight
        ConnectionStatus::Error => snapshot.reconnect_attempts > 0 && !snapshot.awaiting_retry,
        ConnectionStatus::Connected | ConnectionStatus::Disconnected => false,
    }
}

pub fn print_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Status {
            status,
            detail: Some(detail),
        } => println!("[{}] {}", status, detail),
        SessionUpdate::Status {
            status,
            detail: None,
        } => println!("[{}] {}", status, status.presentation().tooltip),
        SessionUpdate::Notice(notice) => {
            println!("{}", notice);
            if notice.offers_retry() {
                println!(
                    r#"  Send {{"command":"retry"}} to try again or {{"command":"cancel"}} to stop."#
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: ConnectionStatus, attempts: u32, awaiting_retry: bool) -> SessionSnapshot {
        SessionSnapshot {
            status,
            detail: None,
            logged_in: true,
            transport_open: false,
            reconnect_attempts: attempts,
            awaiting_retry,
            device: DeviceInfo::new("box", "devek-cli"),
        }
    }

    #[test]
    fn test_connecting_is_transient() {
        assert!(is_transient(&snapshot(ConnectionStatus::Connecting, 0, false)));
        assert!(is_transient(&snapshot(ConnectionStatus::Initializing, 0, false)));
        assert!(!is_transient(&snapshot(ConnectionStatus::Connected, 0, false)));
    }

    #[test]
    fn test_pending_retry_is_transient() {
        assert!(is_transient(&snapshot(ConnectionStatus::Error, 2, false)));
        assert!(!is_transient(&snapshot(ConnectionStatus::Error, 5, true)));
        assert!(!is_transient(&snapshot(ConnectionStatus::Error, 0, false)));
    }

    #[test]
    fn test_sink_forwards_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TerminalSink::new(tx);

        sink.status_changed(ConnectionStatus::Connected, None);
        sink.notify(&Notice::LoginRequired);

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionUpdate::Status {
                status: ConnectionStatus::Connected,
                detail: None
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionUpdate::Notice(Notice::LoginRequired)
        );
    }
}
