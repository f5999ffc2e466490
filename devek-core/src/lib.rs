//! devek-core: Session core for the devek edit streamer
//!
//! This crate keeps one authenticated WebSocket session to the devek server
//! alive and streams editor changes over it:
//!
//! - **Session management** - [`SessionManager`] owns the connection state machine,
//!   timers and auth token; [`SessionHandle`] drives it from the host
//! - **Transport** - [`Connector`] / [`Transport`] seam with the tokio-tungstenite
//!   backed [`WsConnector`]
//! - **Wire protocol** - [`OutboundMessage`] and [`InboundMessage`] JSON frames
//! - **Reconnection** - [`ReconnectPolicy`] with bounded, linearly growing delays
//! - **Edit streaming** - [`EditStreamer`] turns [`EditBatch`]es into `change` frames
//! - **Storage** - [`TokenStore`] with in-memory and JSON file implementations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use devek_core::{
//!     BrowserOpener, Collaborators, ConnectionConfig, DeviceInfo, FileTokenStore,
//!     SessionManager, TracingStatusSink, WsConnector,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let collaborators = Collaborators {
//!         connector: Arc::new(WsConnector),
//!         store: Arc::new(FileTokenStore::load_default().await?),
//!         sink: Arc::new(TracingStatusSink),
//!         opener: Arc::new(BrowserOpener),
//!     };
//!     let (session, _task) = SessionManager::spawn(
//!         ConnectionConfig::from_env()?,
//!         DeviceInfo::default(),
//!         collaborators,
//!     );
//!
//!     session.activate()?;
//!     if !session.snapshot().await?.logged_in {
//!         let logged_in = session.login()?.wait().await?;
//!         println!("Logged in: {}", logged_in);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!  editor ──► EditStreamer ──► SessionHandle ──► SessionManager ──► Transport ──► server
//!                                                   │    ▲
//!                      TokenStore / StatusSink ◄────┘    └──── TransportEvent / timers
//! ```

pub mod collaborators;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reconnect;
pub mod session;
pub mod status;
pub mod store;
pub mod streamer;
pub mod transport;

// Re-export key types for convenience
pub use collaborators::{BrowserOpener, StatusSink, TracingStatusSink, UrlOpener};
pub use config::{APP_URL, ConnectionConfig, DOCS_URL, DeviceInfo};
pub use error::{
    ConfigError, FailureClass, ProtocolError, SessionError, StoreError, TransportError,
    classify_transport_error,
};
pub use protocol::{AuthResult, ChangeData, InboundMessage, OutboundMessage, ResultStatus};
pub use reconnect::ReconnectPolicy;
pub use session::{
    Collaborators, LoginOutcome, SessionCommand, SessionEvent, SessionHandle, SessionManager,
};
pub use status::{
    ConnectionStatus, Notice, SessionSnapshot, StatusAction, StatusIcon, StatusPresentation,
};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use streamer::{EditBatch, EditEvent, EditStreamer, Position, TextChange};
pub use transport::{
    ConnectionId, Connector, Transport, TransportEvent, TransportEvents, WsConnector,
};
