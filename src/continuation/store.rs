//! Continuation store
//!
//! File-backed persistence of continuations per resource, with atomic
//! writes. This is what the CLI uses as its host-side state.

use super::types::Continuation;
use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// On-disk layout: one continuation per resource key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredContinuations {
    #[serde(default)]
    pub resources: HashMap<String, Continuation>,
}

/// Persists continuations between slices
#[derive(Debug)]
pub struct ContinuationStore {
    /// Path to the state file (empty for in-memory)
    path: PathBuf,
    state: Arc<RwLock<StoredContinuations>>,
    /// Whether to save on every update
    auto_save: bool,
}

impl ContinuationStore {
    /// Create a store writing to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(StoredContinuations::default())),
            auto_save: true,
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(StoredContinuations::default())),
            auto_save: false,
        }
    }

    /// Create a store from a file, loading existing state if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::Continuation {
                message: format!("Failed to read state file: {e}"),
            })?;
            serde_json::from_str(&contents).map_err(|e| Error::Continuation {
                message: format!("Failed to parse state file: {e}"),
            })?
        } else {
            StoredContinuations::default()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            auto_save: true,
        })
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let state = self.state.read().await;
        let contents = serde_json::to_string_pretty(&*state).map_err(|e| Error::Continuation {
            message: format!("Failed to serialize state: {e}"),
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .with_context(|| format!("Failed to write state file '{}'", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace state file '{}'", self.path.display()))?;

        Ok(())
    }

    /// Continuation stored for a resource
    pub async fn get(&self, resource: &str) -> Option<Continuation> {
        self.state.read().await.resources.get(resource).cloned()
    }

    /// Store the continuation returned by a slice; `None` ends the sync
    pub async fn set(&self, resource: &str, continuation: Option<Continuation>) -> Result<()> {
        {
            let mut state = self.state.write().await;
            match continuation {
                Some(c) => {
                    state.resources.insert(resource.to_string(), c);
                }
                None => {
                    state.resources.remove(resource);
                }
            }
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Resources with a sync in progress
    pub async fn pending(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.read().await.resources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Clear all state
    pub async fn clear(&self) -> Result<()> {
        self.state.write().await.resources.clear();
        if self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for ContinuationStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
            auto_save: self.auto_save,
        }
    }
}
