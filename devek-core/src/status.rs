//! Connection status, user notices and session snapshots

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DeviceInfo;

/// Status of the single managed connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Manager constructed, stored token not yet inspected
    #[default]
    Initializing,
    /// No live session; user action required to connect
    Disconnected,
    /// Transport opening or handshake in progress
    Connecting,
    /// Authenticated and streaming
    Connected,
    /// Last attempt failed; a retry may be pending
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    /// How a status indicator should present this status.
    pub fn presentation(&self) -> StatusPresentation {
        match self {
            Self::Connected => StatusPresentation {
                icon: StatusIcon::Check,
                tooltip: "Connected to Devek.dev - Click to view options",
                action: StatusAction::ShowMenu,
            },
            Self::Connecting => StatusPresentation {
                icon: StatusIcon::Spinner,
                tooltip: "Connecting to Devek.dev...",
                action: StatusAction::None,
            },
            Self::Disconnected => StatusPresentation {
                icon: StatusIcon::Plug,
                tooltip: "Click to login to Devek.dev",
                action: StatusAction::Login,
            },
            Self::Error => StatusPresentation {
                icon: StatusIcon::Error,
                tooltip: "Connection error - Click to retry",
                action: StatusAction::Reconnect,
            },
            Self::Initializing => StatusPresentation {
                icon: StatusIcon::Spinner,
                tooltip: "Initializing Devek.dev...",
                action: StatusAction::None,
            },
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data describing a status indicator. Rendering is left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPresentation {
    pub icon: StatusIcon,
    pub tooltip: &'static str,
    /// What activating the indicator should do
    pub action: StatusAction,
}

impl StatusPresentation {
    pub const LABEL: &'static str = "Devek.dev";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Check,
    Spinner,
    Plug,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    None,
    Login,
    Reconnect,
    ShowMenu,
}

/// A user-facing message emitted by the session manager.
///
/// Notices with [`Notice::offers_retry`] expect the host to answer with
/// [`crate::SessionHandle::reconnect`] (retry) or
/// [`crate::SessionHandle::decline_retry`] (cancel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// No token is held; the user should log in
    LoginRequired,
    /// The pairing flow produced no outcome in time
    LoginTimedOut,
    /// The server rejected the token, which has been cleared
    AuthenticationFailed { message: String },
    /// The server reported an error unrelated to the token
    ServerError { message: String },
    /// A connection attempt failed and will not be retried automatically
    ConnectionFailed { message: String },
    /// Automatic reconnection gave up
    ReconnectExhausted { attempts: u32 },
    /// An edit could not be sent; the session is unaffected
    EditSyncFailed { message: String },
    /// The pairing URL could not be opened; the user may open it by hand
    OpenUrlFailed { url: String, message: String },
}

impl Notice {
    /// Whether the host should offer a retry/cancel choice.
    pub fn offers_retry(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ReconnectExhausted { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginRequired => write!(f, "Please login to use Devek.dev"),
            Self::LoginTimedOut => write!(f, "Login attempt timed out"),
            Self::AuthenticationFailed { .. } => {
                write!(f, "Authentication failed. Please log in again.")
            }
            Self::ServerError { message } => write!(f, "Server error: {}", message),
            Self::ConnectionFailed { message } => {
                write!(f, "Failed to connect to Devek.dev: {}", message)
            }
            Self::ReconnectExhausted { .. } => write!(
                f,
                "Failed to connect to Devek.dev. Would you like to try again?"
            ),
            Self::EditSyncFailed { .. } => write!(f, "Failed to sync code change"),
            Self::OpenUrlFailed { url, .. } => {
                write!(f, "Could not open a browser. Visit {} to log in", url)
            }
        }
    }
}

/// Point-in-time view of the session, answering "get current status".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    /// Explanation attached to the last status change
    pub detail: Option<String>,
    pub logged_in: bool,
    pub transport_open: bool,
    pub reconnect_attempts: u32,
    /// Waiting for the user to answer a retry/cancel choice
    pub awaiting_retry: bool,
    pub device: DeviceInfo,
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        if let Some(detail) = &self.detail {
            writeln!(f, "Detail: {}", detail)?;
        }
        writeln!(
            f,
            "Logged in: {}",
            if self.logged_in { "yes" } else { "no" }
        )?;
        writeln!(f, "Device: {}", self.device.computer_name)?;
        write!(f, "Environment: {}", self.device.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_initializing() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Initializing);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionStatus::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
    }

    #[test]
    fn presentation_actions_match_status() {
        assert_eq!(
            ConnectionStatus::Disconnected.presentation().action,
            StatusAction::Login
        );
        assert_eq!(
            ConnectionStatus::Error.presentation().action,
            StatusAction::Reconnect
        );
        assert_eq!(
            ConnectionStatus::Connected.presentation().action,
            StatusAction::ShowMenu
        );
        assert_eq!(
            ConnectionStatus::Connecting.presentation().action,
            StatusAction::None
        );
    }

    #[test]
    fn only_connection_failures_offer_retry() {
        assert!(Notice::ReconnectExhausted { attempts: 5 }.offers_retry());
        assert!(
            Notice::ConnectionFailed {
                message: "refused".to_string()
            }
            .offers_retry()
        );
        assert!(!Notice::LoginTimedOut.offers_retry());
        assert!(
            !Notice::EditSyncFailed {
                message: "closed".to_string()
            }
            .offers_retry()
        );
    }

    #[test]
    fn notice_serialization_is_tagged() {
        let notice = Notice::ServerError {
            message: "busy".to_string(),
        };
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("\"kind\":\"server_error\""));
        assert!(json.contains("busy"));
    }

    #[test]
    fn snapshot_display_includes_device() {
        let snapshot = SessionSnapshot {
            status: ConnectionStatus::Connected,
            detail: None,
            logged_in: true,
            transport_open: true,
            reconnect_attempts: 0,
            awaiting_retry: false,
            device: DeviceInfo::new("workstation", "devek-cli"),
        };
        let text = snapshot.to_string();
        assert!(text.contains("Status: connected"));
        assert!(text.contains("Device: workstation"));
        assert!(text.contains("Environment: devek-cli"));
    }
}
