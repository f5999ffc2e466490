//! Line protocol for `devek connect`
//!
//! Each stdin line is one JSON object: either an [`EditBatch`] or a control
//! line such as `{"command":"reconnect"}`. Blank lines are skipped.

use anyhow::{Context, Result};
use devek_core::EditBatch;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Login,
    Logout,
    Reconnect,
    Status,
    /// Answer a retry offer with "try again"
    Retry,
    /// Answer a retry offer with "cancel"
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    Control { command: Control },
    Edit(EditBatch),
}

pub fn parse_line(line: &str) -> Result<Option<InputLine>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed = serde_json::from_str(line)
        .with_context(|| format!("Unrecognized input line: {}", line))?;
    Ok(Some(parsed))
}
