//! Tests for the spawned manager and its handle

mod common;

use std::sync::Arc;

use common::{MockConnector, RecordingOpener, RecordingSink, TOKEN_KEY};
use devek_core::{
    Collaborators, ConnectionConfig, ConnectionStatus, DeviceInfo, EditBatch, EditStreamer,
    MemoryTokenStore, Position, SessionError, SessionManager, TextChange, TransportEvent,
};
use tokio::sync::mpsc;

fn collaborators(
    connector: &Arc<MockConnector>,
    store: MemoryTokenStore,
) -> Collaborators {
    Collaborators {
        connector: connector.clone(),
        store: Arc::new(store),
        sink: Arc::new(RecordingSink::default()),
        opener: Arc::new(RecordingOpener::default()),
    }
}

#[tokio::test]
async fn snapshot_after_activate() {
    let connector = Arc::new(MockConnector::default());
    let (session, _task) = SessionManager::spawn(
        ConnectionConfig::default(),
        DeviceInfo::new("workstation", "devek-cli"),
        collaborators(&connector, MemoryTokenStore::new()),
    );

    session.activate().unwrap();
    let snapshot = session.snapshot().await.unwrap();

    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert!(!snapshot.logged_in);
    assert_eq!(connector.count(), 0);
}

#[tokio::test]
async fn superseded_login_reports_error() {
    let connector = Arc::new(MockConnector::default());
    let (session, _task) = SessionManager::spawn(
        ConnectionConfig::default(),
        DeviceInfo::default(),
        collaborators(&connector, MemoryTokenStore::new()),
    );

    let first = session.login().unwrap();
    let _second = session.login().unwrap();

    assert_eq!(first.wait().await, Err(SessionError::LoginSuperseded));
}

#[tokio::test]
async fn dispose_stops_manager() {
    let connector = Arc::new(MockConnector::default());
    let (session, task) = SessionManager::spawn(
        ConnectionConfig::default(),
        DeviceInfo::default(),
        collaborators(&connector, MemoryTokenStore::with_value(TOKEN_KEY, "t1")),
    );

    session.activate().unwrap();
    let pending = session.login().unwrap();
    session.dispose().unwrap();
    task.await.unwrap();

    assert!(session.is_closed());
    assert_eq!(session.reconnect(), Err(SessionError::ManagerStopped));
    assert_eq!(pending.wait().await, Err(SessionError::ManagerStopped));
    assert!(connector.latest().is_closed());
}

#[tokio::test]
async fn streamer_forwards_changes_to_session() {
    let connector = Arc::new(MockConnector::default());
    let (session, _task) = SessionManager::spawn(
        ConnectionConfig::default(),
        DeviceInfo::new("workstation", "devek-cli"),
        collaborators(&connector, MemoryTokenStore::with_value(TOKEN_KEY, "t1")),
    );

    session.activate().unwrap();
    session.snapshot().await.unwrap();
    let connection = connector.latest();
    connection.emit(TransportEvent::Open);
    connection.emit(TransportEvent::Message(r#"{"type":"init"}"#.to_string()));
    assert_eq!(
        session.snapshot().await.unwrap().status,
        ConnectionStatus::Connected
    );

    let (tx, rx) = mpsc::channel(8);
    let streamer = EditStreamer::new(DeviceInfo::new("workstation", "devek-cli"));
    let streaming = tokio::spawn(streamer.run(rx, session.clone()));

    tx.send(EditBatch {
        document_uri: r"C:\src\lib.rs".to_string(),
        changes: vec![
            TextChange {
                range_start: Position::new(4, 0),
                range_end: Position::new(4, 0),
                text: "let x = 1;".to_string(),
            },
            TextChange {
                range_start: Position::new(9, 2),
                range_end: Position::new(9, 2),
                text: String::new(),
            },
        ],
    })
    .await
    .unwrap();
    drop(tx);
    streaming.await.unwrap();

    // Commands are handled in order, so the snapshot reply follows the change.
    session.snapshot().await.unwrap();
    let changes: Vec<_> = connection
        .sent()
        .into_iter()
        .filter(|frame| frame["type"] == "change")
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["data"]["document_uri"], "C:/src/lib.rs");
    assert_eq!(changes[0]["data"]["start_line"], 4);
}
