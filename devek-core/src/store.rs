//! Persistent key/value storage for session state
//!
//! The session manager keeps its auth token in memory and mirrors every
//! change into a [`TokenStore`], which is the durable copy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Abstract persistent key to string store
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, for tests and hosts that persist elsewhere
#[derive(Debug, Default, Clone)]
pub struct MemoryTokenStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one key
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// JSON-file backed store
pub struct FileTokenStore {
    values: RwLock<HashMap<String, String>>,
    file_path: PathBuf,
}

impl FileTokenStore {
    /// Load the store from `file_path`, starting empty if it is missing.
    ///
    /// A corrupt file is treated as empty and overwritten on the next write.
    pub async fn load(file_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let file_path = file_path.into();

        let values = match fs::read_to_string(&file_path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(
                    "Ignoring unreadable session state at {}: {}",
                    file_path.display(),
                    e
                );
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded session state from {}", file_path.display());

        Ok(Self {
            values: RwLock::new(values),
            file_path,
        })
    }

    /// Load the store from the default location in the devek data directory
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(devek_paths::state_file()).await
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.file_path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values).await
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.persist(&values).await?;
        }
        Ok(())
    }
}
