//! Error types for devek-core

use thiserror::Error;

/// Failures surfaced by the session manager.
///
/// Transport-level failures never escape the manager as `Err`; they are
/// folded into a status transition and carried as the status detail. The
/// remaining variants are returned by [`crate::SessionHandle`] calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Failed to create connection: {0}")]
    TransportConstruction(String),

    #[error("Connection handshake timed out")]
    HandshakeTimeout,

    #[error("Malformed server message: {0}")]
    MalformedMessage(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Cannot reach server: {0}")]
    TerminalNetwork(String),

    #[error("Connection closed unexpectedly (code {code})")]
    UnexpectedClose { code: u16 },

    #[error("Not connected")]
    NotConnected,

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    #[error("Login attempt was superseded by a newer one")]
    LoginSuperseded,

    #[error("Session manager has stopped")]
    ManagerStopped,

    #[error("Failed to open {url}: {message}")]
    OpenUrl { url: String, message: String },
}

impl SessionError {
    /// Build the network error variant matching the classification of `message`.
    pub fn from_transport_failure(message: &str) -> Self {
        match classify_transport_error(message) {
            FailureClass::Terminal => Self::TerminalNetwork(message.to_string()),
            FailureClass::Transient => Self::TransientNetwork(message.to_string()),
        }
    }
}

/// Errors from encoding or decoding wire messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from a transport implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Transport is closed")]
    Closed,
}

/// Errors from a token store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from building a connection configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid server endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Unsupported endpoint scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
}

/// How a transport failure should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying automatically with backoff.
    Transient,
    /// The server is unreachable as configured; only a manual retry makes sense.
    Terminal,
}

const TERMINAL_MARKERS: &[&str] = &[
    "econnrefused",
    "connection refused",
    "enotfound",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
    "dns error",
    "closed before the connection was established",
    "closed before established",
];

/// Classify a transport error message.
///
/// Refused connections, name resolution failures and sockets closed before
/// the connection was established are terminal. Everything else is transient.
pub fn classify_transport_error(message: &str) -> FailureClass {
    let lower = message.to_ascii_lowercase();
    if TERMINAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
        FailureClass::Terminal
    } else {
        FailureClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_refused_is_terminal() {
        let message = "IO error: Connection refused (os error 111)";
        assert_eq!(classify_transport_error(message), FailureClass::Terminal);
    }

    #[test]
    fn node_style_errors_are_terminal() {
        assert_eq!(
            classify_transport_error("connect ECONNREFUSED 127.0.0.1:443"),
            FailureClass::Terminal
        );
        assert_eq!(
            classify_transport_error("getaddrinfo ENOTFOUND ws.devek.dev"),
            FailureClass::Terminal
        );
        assert_eq!(
            classify_transport_error(
                "WebSocket was closed before the connection was established"
            ),
            FailureClass::Terminal
        );
    }

    #[test]
    fn dns_lookup_failure_is_terminal() {
        let message = "IO error: failed to lookup address information: Name or service not known";
        assert_eq!(classify_transport_error(message), FailureClass::Terminal);
    }

    #[test]
    fn reset_and_timeouts_are_transient() {
        assert_eq!(
            classify_transport_error("IO error: Connection reset by peer (os error 104)"),
            FailureClass::Transient
        );
        assert_eq!(
            classify_transport_error("Opening handshake has timed out"),
            FailureClass::Transient
        );
    }

    #[test]
    fn from_transport_failure_picks_variant() {
        assert!(matches!(
            SessionError::from_transport_failure("Connection refused"),
            SessionError::TerminalNetwork(_)
        ));
        assert!(matches!(
            SessionError::from_transport_failure("broken pipe"),
            SessionError::TransientNetwork(_)
        ));
    }

    #[test]
    fn unexpected_close_displays_code() {
        let error = SessionError::UnexpectedClose { code: 1006 };
        assert!(error.to_string().contains("1006"));
    }
}
