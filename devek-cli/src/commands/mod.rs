pub mod config;
pub mod connect;
pub mod login;
pub mod logout;
pub mod open;
pub mod reconnect;
pub mod status;

use std::time::Duration;

/// How long one-shot commands wait for the session to settle
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(20);
