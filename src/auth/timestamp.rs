// Refresh timestamp tracking
// Records when the credential was last issued and decides when a refresh is due

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// On-disk form of the timestamp
#[derive(Debug, Serialize, Deserialize)]
struct StoredTimestamp {
    refreshed_at: DateTime<Utc>,
}

/// Process-wide record of the last successful login or refresh
///
/// Optionally mirrored to a JSON file so it survives restarts, the same
/// way the browser app keeps it in local storage.
pub struct TokenTimestamp {
    value: RwLock<Option<DateTime<Utc>>>,
    path: Option<PathBuf>,
}

impl TokenTimestamp {
    /// Timestamp kept in memory only
    pub fn in_memory() -> Self {
        Self {
            value: RwLock::new(None),
            path: None,
        }
    }

    /// Load a file-backed timestamp, starting empty if the file is missing or unreadable
    pub fn load(path: PathBuf) -> Self {
        let value = match read_stored(&path) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring stored refresh timestamp: {:#}", e);
                None
            }
        };

        if let Some(at) = value {
            tracing::debug!("Loaded refresh timestamp {}", at.to_rfc3339());
        }

        Self {
            value: RwLock::new(value),
            path: Some(path),
        }
    }

    pub async fn get(&self) -> Option<DateTime<Utc>> {
        *self.value.read().await
    }

    pub async fn set(&self, at: DateTime<Utc>) {
        *self.value.write().await = Some(at);
        self.persist(Some(at)).await;
    }

    /// Record a refresh that happened just now
    pub async fn touch(&self) {
        self.set(Utc::now()).await;
    }

    pub async fn clear(&self) {
        *self.value.write().await = None;
        self.persist(None).await;
    }

    /// True once more than `window` has elapsed since the last refresh
    /// With no timestamp there is no credential to refresh.
    pub async fn should_refresh(&self, window: Duration) -> bool {
        match *self.value.read().await {
            None => false,
            Some(at) => refresh_due(at, Utc::now(), window),
        }
    }

    async fn persist(&self, value: Option<DateTime<Utc>>) {
        let Some(ref path) = self.path else {
            return;
        };

        if let Err(e) = write_stored(path, value).await {
            tracing::warn!("Failed to persist refresh timestamp: {:#}", e);
        }
    }
}

fn read_stored(path: &Path) -> Result<Option<DateTime<Utc>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stored: StoredTimestamp = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(stored.refreshed_at))
}

async fn write_stored(path: &Path, value: Option<DateTime<Utc>>) -> Result<()> {
    match value {
        Some(refreshed_at) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let content = serde_json::to_string(&StoredTimestamp { refreshed_at })?;
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            if path.exists() {
                tokio::fs::remove_file(path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
    }

    Ok(())
}

fn refresh_due(at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - at > window
}
