//! Edit streaming
//!
//! Turns editor content changes into `change` messages and hands them to the
//! session. Edits are never buffered: the session drops anything that arrives
//! while it is offline.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::DeviceInfo;
use crate::error::SessionError;
use crate::protocol::ChangeData;
use crate::session::SessionHandle;

/// Zero-indexed document position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// One content change in one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEvent {
    pub document_uri: String,
    pub range_start: Position,
    pub range_end: Position,
    pub inserted_text: String,
}

impl EditEvent {
    /// An empty range with no inserted text changes nothing
    pub fn is_noop(&self) -> bool {
        self.range_start == self.range_end && self.inserted_text.is_empty()
    }
}

/// A single range replacement inside an [`EditBatch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub range_start: Position,
    pub range_end: Position,
    #[serde(default)]
    pub text: String,
}

/// All content changes from one editor notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditBatch {
    pub document_uri: String,
    pub changes: Vec<TextChange>,
}

impl EditBatch {
    pub fn events(&self) -> impl Iterator<Item = EditEvent> + '_ {
        self.changes.iter().map(|change| EditEvent {
            document_uri: self.document_uri.clone(),
            range_start: change.range_start,
            range_end: change.range_end,
            inserted_text: change.text.clone(),
        })
    }
}

/// Builds `change` payloads stamped with this device's identity.
#[derive(Debug, Clone)]
pub struct EditStreamer {
    device: DeviceInfo,
}

impl EditStreamer {
    pub fn new(device: DeviceInfo) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Payload for one edit, or `None` for a no-op.
    pub fn change_data(&self, edit: &EditEvent, at: DateTime<Utc>) -> Option<ChangeData> {
        if edit.is_noop() {
            return None;
        }

        Some(ChangeData {
            document_uri: normalize_document_path(&edit.document_uri),
            timestamp: format_timestamp(at),
            start_line: edit.range_start.line,
            start_character: edit.range_start.character,
            end_line: edit.range_end.line,
            end_character: edit.range_end.character,
            text: edit.inserted_text.clone(),
            computer_name: self.device.computer_name.clone(),
            environment: self.device.environment.clone(),
        })
    }

    /// Payloads for a batch, all sharing the timestamp `at`
    pub fn batch_data(&self, batch: &EditBatch, at: DateTime<Utc>) -> Vec<ChangeData> {
        batch
            .events()
            .filter_map(|edit| self.change_data(&edit, at))
            .collect()
    }

    /// Forward batches to the session until the source closes or the
    /// session stops.
    pub async fn run(self, mut batches: mpsc::Receiver<EditBatch>, session: SessionHandle) {
        info!("Streaming edits from {}", self.device.computer_name);

        while let Some(batch) = batches.recv().await {
            let changes = self.batch_data(&batch, Utc::now());
            debug!(
                "{} change(s) for {}",
                changes.len(),
                normalize_document_path(&batch.document_uri)
            );

            for change in changes {
                match session.send_change(change) {
                    Ok(()) => {}
                    Err(SessionError::ManagerStopped) => {
                        warn!("Session stopped, no longer streaming edits");
                        return;
                    }
                    Err(e) => warn!("Failed to queue change: {}", e),
                }
            }
        }

        debug!("Edit source closed");
    }
}

/// Use forward slashes regardless of the host platform
pub fn normalize_document_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn streamer() -> EditStreamer {
        EditStreamer::new(DeviceInfo::new("workstation", "devek-cli"))
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    fn edit(start: (u32, u32), end: (u32, u32), text: &str) -> EditEvent {
        EditEvent {
            document_uri: "/src/main.rs".to_string(),
            range_start: Position::new(start.0, start.1),
            range_end: Position::new(end.0, end.1),
            inserted_text: text.to_string(),
        }
    }

    #[test]
    fn empty_range_without_text_is_dropped() {
        assert!(streamer().change_data(&edit((3, 4), (3, 4), ""), at()).is_none());
    }

    #[test]
    fn deletion_is_kept() {
        let data = streamer()
            .change_data(&edit((1, 0), (2, 5), ""), at())
            .unwrap();
        assert_eq!(data.start_line, 1);
        assert_eq!(data.end_line, 2);
        assert_eq!(data.end_character, 5);
        assert_eq!(data.text, "");
    }

    #[test]
    fn insertion_carries_device_and_timestamp() {
        let data = streamer()
            .change_data(&edit((0, 2), (0, 2), "fn"), at())
            .unwrap();
        assert_eq!(data.text, "fn");
        assert_eq!(data.computer_name, "workstation");
        assert_eq!(data.environment, "devek-cli");
        assert_eq!(data.timestamp, "2024-03-01T12:30:00.000Z");
    }

    #[test]
    fn windows_paths_use_forward_slashes() {
        let mut windows = edit((0, 0), (0, 0), "x");
        windows.document_uri = r"C:\work\src\lib.rs".to_string();
        let data = streamer().change_data(&windows, at()).unwrap();
        assert_eq!(data.document_uri, "C:/work/src/lib.rs");
    }

    #[test]
    fn batch_skips_noops_and_shares_timestamp() {
        let batch = EditBatch {
            document_uri: "/a.rs".to_string(),
            changes: vec![
                TextChange {
                    range_start: Position::new(0, 0),
                    range_end: Position::new(0, 0),
                    text: "a".to_string(),
                },
                TextChange {
                    range_start: Position::new(1, 1),
                    range_end: Position::new(1, 1),
                    text: String::new(),
                },
                TextChange {
                    range_start: Position::new(2, 0),
                    range_end: Position::new(2, 3),
                    text: String::new(),
                },
            ],
        };

        let data = streamer().batch_data(&batch, at());
        assert_eq!(data.len(), 2);
        assert!(data.iter().all(|d| d.timestamp == data[0].timestamp));
        assert!(data.iter().all(|d| d.document_uri == "/a.rs"));
    }

    #[test]
    fn batch_deserializes_without_text() {
        let json = r#"{"document_uri":"/a.rs","changes":[{"range_start":{"line":0,"character":0},"range_end":{"line":0,"character":4}}]}"#;
        let batch: EditBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.changes[0].text, "");
        assert!(!batch.events().next().unwrap().is_noop());
    }
}
