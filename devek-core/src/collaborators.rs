//! Host-side collaborators called by the session manager

use tracing::{error, info, warn};

use crate::error::SessionError;
use crate::status::{ConnectionStatus, Notice};

/// Receives status transitions and user-facing notices.
///
/// Called from the manager's control task, so implementations must not block.
pub trait StatusSink: Send + Sync {
    fn status_changed(&self, status: ConnectionStatus, detail: Option<&str>);

    fn notify(&self, notice: &Notice);
}

/// Opens an external URL (the device pairing page)
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), SessionError>;
}

/// Opens URLs in the system browser
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserOpener;

impl UrlOpener for BrowserOpener {
    fn open(&self, url: &str) -> Result<(), SessionError> {
        info!("Opening {} in browser", url);
        webbrowser::open(url).map_err(|e| SessionError::OpenUrl {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Sink that only logs, for headless hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn status_changed(&self, status: ConnectionStatus, detail: Option<&str>) {
        match detail {
            Some(detail) => info!("Devek.dev {}: {}", status, detail),
            None => info!("Devek.dev {}", status),
        }
    }

    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::ConnectionFailed { .. }
            | Notice::ReconnectExhausted { .. }
            | Notice::AuthenticationFailed { .. } => error!("{}", notice),
            _ => warn!("{}", notice),
        }
    }
}
