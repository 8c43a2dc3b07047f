//! Key-value persistence for dashboard state.
//!
//! Three collections are stored, each as a JSON list under its own key:
//! `<namespace>_statuses`, `<namespace>_logs` and `<namespace>_agents`.
//! Each is loaded on its own; a missing or unreadable collection falls back
//! to its generated default without affecting the others.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use checklist::Catalog;
use devstatus_agent::{default_roster, AgentInfo};

use crate::activity::ActivityLog;
use crate::ids::Clock;
use crate::store::StatusStore;
use crate::types::{ActivityLogEntry, StatusRecord};

/// Error types for persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be used as a storage name
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Minimal string key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StorageError>;
}

/// In-process store, lost on exit.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// The three persisted collections.
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    pub records: Vec<StatusRecord>,
    pub activity: Vec<ActivityLogEntry>,
    pub agents: Vec<AgentInfo>,
}

/// State ready for the engine, after fallbacks.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub store: StatusStore,
    pub activity: ActivityLog,
    pub agents: Vec<AgentInfo>,
}

/// Reads and writes dashboard state under a namespace.
#[derive(Clone)]
pub struct StatePersistence {
    kv: Arc<dyn KvStore>,
    namespace: String,
}

impl StatePersistence {
    pub fn new(kv: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    pub fn statuses_key(&self) -> String {
        format!("{}_statuses", self.namespace)
    }

    pub fn logs_key(&self) -> String {
        format!("{}_logs", self.namespace)
    }

    pub fn agents_key(&self) -> String {
        format!("{}_agents", self.namespace)
    }

    /// Load all three collections, falling back per collection.
    pub async fn load(
        &self,
        catalog: Arc<Catalog>,
        project_id: &str,
        activity_capacity: usize,
        clock: &dyn Clock,
    ) -> LoadedState {
        let store = match self.read::<Vec<StatusRecord>>(&self.statuses_key()).await {
            Some(records) => match StatusStore::from_records(catalog.clone(), records) {
                Ok(store) => store,
                Err(e) => {
                    warn!(key = %self.statuses_key(), error = %e, "Persisted statuses rejected, using generated snapshot");
                    StatusStore::initial(catalog, project_id, clock.now())
                }
            },
            None => StatusStore::initial(catalog, project_id, clock.now()),
        };

        let activity = self
            .read::<Vec<ActivityLogEntry>>(&self.logs_key())
            .await
            .map(|entries| ActivityLog::from_entries(entries, activity_capacity))
            .unwrap_or_else(|| ActivityLog::with_capacity(activity_capacity));

        let agents = self
            .read::<Vec<AgentInfo>>(&self.agents_key())
            .await
            .unwrap_or_else(|| default_roster(clock.now()));

        debug!(
            records = store.all().len(),
            activity = activity.len(),
            agents = agents.len(),
            "Dashboard state loaded"
        );

        LoadedState {
            store,
            activity,
            agents,
        }
    }

    /// Read one collection. Absent, unreadable or malformed data is `None`.
    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read persisted collection, using default");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Malformed persisted collection, using default");
                None
            }
        }
    }

    /// Rewrite all three collections.
    pub async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        self.kv
            .put(&self.statuses_key(), serde_json::to_string(&state.records)?)
            .await?;
        self.kv
            .put(&self.logs_key(), serde_json::to_string(&state.activity)?)
            .await?;
        self.kv
            .put(&self.agents_key(), serde_json::to_string(&state.agents)?)
            .await?;
        Ok(())
    }
}
