//! WebSocket protocol message types
//!
//! Every frame is a single JSON text message. Outbound messages carry a
//! `type` tag. Inbound messages are either typed (`init`, `pong`,
//! `plugin_login`, `plugin_auth`) or a bare auth result keyed by `status`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Messages sent from the client to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Authenticate with a previously issued token
    Auth { token: String },
    /// Start the device pairing flow
    PluginLogin,
    /// Application-level keepalive
    Ping,
    /// A single text edit
    Change { data: ChangeData },
}

impl OutboundMessage {
    pub fn auth(token: impl Into<String>) -> Self {
        Self::Auth {
            token: token.into(),
        }
    }

    /// Serialize to the JSON text frame sent on the wire
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire name of this message, for logging without the payload
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::PluginLogin => "plugin_login",
            Self::Ping => "ping",
            Self::Change { .. } => "change",
        }
    }
}

/// Payload of a `change` message.
///
/// Lines and characters are 0-indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeData {
    pub document_uri: String,
    /// RFC 3339 UTC timestamp with millisecond precision
    pub timestamp: String,
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
    pub text: String,
    pub computer_name: String,
    pub environment: String,
}

/// Outcome carried by a `status` message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Auth result sent by the server without a `type` tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Phrases in an error result that mean the held token is no longer valid
const AUTH_REJECTION_MARKERS: &[&str] = &[
    "authentication failed",
    "invalid token",
    "token expired",
    "expired token",
];

impl AuthResult {
    /// Whether this is an error result rejecting the client's token.
    pub fn is_auth_rejection(&self) -> bool {
        if self.status != ResultStatus::Error {
            return false;
        }
        let Some(message) = &self.message else {
            return false;
        };
        let lower = message.to_ascii_lowercase();
        AUTH_REJECTION_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
    }
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Server accepted the connection; the session is live if a token is held
    Init,
    /// Reply to [`OutboundMessage::Ping`]
    Pong { timestamp: Option<serde_json::Value> },
    /// Pairing URL the user must open to approve this device
    PluginLogin { url: String },
    /// Token issued once the user approved the pairing
    PluginAuth { token: String },
    /// Result of an `auth` request or a server-side error
    Result(AuthResult),
}

impl InboundMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_str(text)?;
        Ok(wire.into())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Typed(TypedMessage),
    Result(AuthResult),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TypedMessage {
    Init,
    Pong {
        #[serde(default)]
        data: Option<PongData>,
    },
    PluginLogin {
        data: UrlData,
    },
    PluginAuth {
        data: TokenData,
    },
}

#[derive(Deserialize)]
struct PongData {
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct UrlData {
    url: String,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

impl From<WireMessage> for InboundMessage {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::Typed(TypedMessage::Init) => Self::Init,
            WireMessage::Typed(TypedMessage::Pong { data }) => Self::Pong {
                timestamp: data.and_then(|d| d.timestamp),
            },
            WireMessage::Typed(TypedMessage::PluginLogin { data }) => {
                Self::PluginLogin { url: data.url }
            }
            WireMessage::Typed(TypedMessage::PluginAuth { data }) => {
                Self::PluginAuth { token: data.token }
            }
            WireMessage::Result(result) => Self::Result(result),
        }
    }
}
