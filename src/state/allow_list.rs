use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{BotError, Result};

/// Persisted allow-list file:
/// `{"servers": {"<guild_id>": {"like_channels": ["<channel_id>", ...]}}}`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AllowListConfig {
    /// Per-guild settings (guild ID -> settings)
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,

    /// Keys we don't manage are written back untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Settings for a single guild
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerConfig {
    /// Channels where `/like` may be used, kept sorted; empty means everywhere
    #[serde(default)]
    pub like_channels: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,

    /// Entry was stored with an empty list, so emptying it again keeps it
    #[serde(skip)]
    stored_empty: bool,
}

impl ServerConfig {
    fn is_prunable(&self) -> bool {
        self.like_channels.is_empty() && self.extra.is_empty() && !self.stored_empty
    }
}

/// What a toggle did to the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl AllowListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse stored JSON. Channel lists come back sorted and deduplicated.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(content)?;
        for server in config.servers.values_mut() {
            server.like_channels.sort();
            server.like_channels.dedup();
            server.stored_empty = server.like_channels.is_empty();
        }
        Ok(config)
    }

    /// Allowed if outside a guild, if the guild has no restriction,
    /// or if the channel is listed
    pub fn is_channel_allowed(&self, guild_id: Option<&str>, channel_id: &str) -> bool {
        let Some(guild_id) = guild_id else {
            return true;
        };

        match self.servers.get(guild_id) {
            None => true,
            Some(server) => {
                server.like_channels.is_empty()
                    || server.like_channels.iter().any(|c| c == channel_id)
            }
        }
    }

    /// Flip the channel's membership in the guild's allow-list.
    ///
    /// The list stays sorted, so removing and re-adding a channel puts it
    /// back where it was. A guild entry emptied by a removal is dropped
    /// unless it was stored empty or carries other keys.
    pub fn toggle_channel(&mut self, guild_id: &str, channel_id: &str) -> ToggleOutcome {
        let server = self.servers.entry(guild_id.to_string()).or_default();

        match server
            .like_channels
            .binary_search_by(|c| c.as_str().cmp(channel_id))
        {
            Ok(pos) => {
                server.like_channels.remove(pos);
                if server.is_prunable() {
                    self.servers.remove(guild_id);
                }
                ToggleOutcome::Removed
            }
            Err(pos) => {
                server.like_channels.insert(pos, channel_id.to_string());
                ToggleOutcome::Added
            }
        }
    }

    /// Allowed channel IDs for a guild (empty when unrestricted)
    pub fn channels_for(&self, guild_id: &str) -> &[String] {
        self.servers
            .get(guild_id)
            .map(|s| s.like_channels.as_slice())
            .unwrap_or(&[])
    }
}

/// Where the allow-list lives between restarts
#[async_trait]
pub trait AllowListPersistence: Send + Sync {
    /// Stored config. Missing or corrupt storage is reset to an empty
    /// config rather than reported.
    async fn load(&self) -> AllowListConfig;

    /// Replace the stored config. Must not leave a half-written copy behind.
    async fn save(&self, config: &AllowListConfig) -> Result<()>;

    /// Human readable location for logs
    fn location(&self) -> String;
}

/// Allow-list kept in a JSON file, written via temp file + rename
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the file. `Ok(None)` when it does not exist.
    pub async fn read(&self) -> Result<Option<AllowListConfig>> {
        let path = &self.path;
        match tokio::fs::read_to_string(path).await {
            Ok(content) => AllowListConfig::from_json(&content)
                .map(Some)
                .map_err(|e| BotError::ConfigParse {
                    path: path.display().to_string(),
                    source: e,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BotError::ConfigLoad {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }
}

#[async_trait]
impl AllowListPersistence for JsonFilePersistence {
    async fn load(&self) -> AllowListConfig {
        match self.read().await {
            Ok(Some(config)) => {
                info!(
                    "Loaded like channel allow-list for {} servers from {}",
                    config.servers.len(),
                    self.path.display()
                );
                return config;
            }
            Ok(None) => {
                info!("{} not found, creating an empty allow-list", self.path.display());
            }
            Err(e) => {
                warn!("{}. Resetting to default configuration.", e);
            }
        }

        let config = AllowListConfig::new();
        if let Err(e) = self.save(&config).await {
            error!("Could not write default allow-list: {}", e);
        }
        config
    }

    async fn save(&self, config: &AllowListConfig) -> Result<()> {
        let path = &self.path;
        let content = serde_json::to_string_pretty(config)?;

        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.display().to_string(),
                source: e,
            })?;

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                debug!("Could not remove {}: {}", temp_path.display(), cleanup);
            }
            return Err(BotError::StateSave {
                path: path.display().to_string(),
                source: e,
            });
        }

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Allow-list with its persistence.
///
/// Reads go through the `RwLock` only. Toggles additionally hold
/// `persist_lock` across mutate + write so writes land in the
/// same order as the mutations.
pub struct AllowListStore {
    persistence: Box<dyn AllowListPersistence>,
    config: tokio::sync::RwLock<AllowListConfig>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl AllowListStore {
    pub fn new(persistence: impl AllowListPersistence + 'static, config: AllowListConfig) -> Self {
        Self {
            persistence: Box::new(persistence),
            config: tokio::sync::RwLock::new(config),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load through `persistence`, resetting missing or corrupt storage
    pub async fn open(persistence: impl AllowListPersistence + 'static) -> Self {
        let config = persistence.load().await;
        Self::new(persistence, config)
    }

    pub fn location(&self) -> String {
        self.persistence.location()
    }

    pub async fn is_channel_allowed(&self, guild_id: Option<u64>, channel_id: u64) -> bool {
        let guild_id = guild_id.map(|g| g.to_string());
        let config = self.config.read().await;
        config.is_channel_allowed(guild_id.as_deref(), &channel_id.to_string())
    }

    /// Toggle and persist before returning. On a failed write the
    /// in-memory change is rolled back so memory matches storage.
    pub async fn toggle_channel(&self, guild_id: u64, channel_id: u64) -> Result<ToggleOutcome> {
        let _persist = self.persist_lock.lock().await;

        let guild_id = guild_id.to_string();
        let channel_id = channel_id.to_string();

        let (outcome, snapshot, previous) = {
            let mut config = self.config.write().await;
            let previous = config.clone();
            let outcome = config.toggle_channel(&guild_id, &channel_id);
            (outcome, config.clone(), previous)
        };

        if let Err(e) = self.persistence.save(&snapshot).await {
            error!("Failed to persist allow-list change for guild {}: {}", guild_id, e);
            *self.config.write().await = previous;
            return Err(e);
        }

        debug!(
            "Channel {} in guild {}: {:?} (now {} allowed)",
            channel_id,
            guild_id,
            outcome,
            snapshot.channels_for(&guild_id).len()
        );

        Ok(outcome)
    }

    pub async fn channels_for(&self, guild_id: u64) -> Vec<String> {
        let config = self.config.read().await;
        config.channels_for(&guild_id.to_string()).to_vec()
    }
}

/// Shared allow-list type
pub type SharedAllowList = Arc<AllowListStore>;

pub fn create_shared_allow_list(store: AllowListStore) -> SharedAllowList {
    Arc::new(store)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// In-memory persistence for tests
#[cfg(test)]
pub struct MemoryPersistence {
    pub saved: Arc<tokio::sync::Mutex<Vec<AllowListConfig>>>,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemoryPersistence {
    pub fn new() -> Self {
        Self {
            saved: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            fail_writes: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl AllowListPersistence for MemoryPersistence {
    async fn load(&self) -> AllowListConfig {
        self.saved.lock().await.last().cloned().unwrap_or_default()
    }

    async fn save(&self, config: &AllowListConfig) -> Result<()> {
        if self.fail_writes {
            return Err(BotError::StateSave {
                path: self.location(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "read-only"),
            });
        }
        self.saved.lock().await.push(config.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
