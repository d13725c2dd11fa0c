//! The server registry, persisted as a JSON file.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rigwatch_types::{now_ms, Source};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The request was rejected before touching storage.
    #[error("{0}")]
    Validation(String),

    #[error("server {0} not found")]
    NotFound(i64),

    #[error("registry storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    next_id: i64,
    servers: Vec<Source>,
}

/// Registered sources. Ids are assigned in increasing order and never reused.
#[derive(Debug)]
pub struct Registry {
    path: Option<PathBuf>,
    state: Mutex<RegistryFile>,
}

impl Registry {
    /// A registry that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(RegistryFile {
                next_id: 1,
                servers: Vec::new(),
            }),
        }
    }

    /// Open the registry at `path`, creating an empty one if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let mut file = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str::<RegistryFile>(&content)?
        } else {
            RegistryFile::default()
        };

        file.servers.sort_by_key(|s| s.id);
        let highest = file.servers.last().map_or(0, |s| s.id);
        file.next_id = file.next_id.max(highest + 1).max(1);

        let registry = Self {
            path: Some(path),
            state: Mutex::new(file),
        };
        registry.save(&registry.state.lock())?;

        info!(
            servers = registry.len(),
            path = ?registry.path,
            "registry opened"
        );
        Ok(registry)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All sources, ascending by id.
    pub fn list(&self) -> Vec<Source> {
        self.state.lock().servers.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: i64) -> Result<Source, RegistryError> {
        self.state
            .lock()
            .servers
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Register a new source.
    ///
    /// Both fields are trimmed and must be non-empty; the URL must be http or
    /// https.
    pub fn create(&self, name: &str, endpoint_url: &str) -> Result<Source, RegistryError> {
        let name = name.trim();
        let endpoint_url = endpoint_url.trim();
        if name.is_empty() || endpoint_url.is_empty() {
            return Err(RegistryError::Validation(
                "Name and URL are required".to_string(),
            ));
        }
        if !(endpoint_url.starts_with("http://") || endpoint_url.starts_with("https://")) {
            return Err(RegistryError::Validation(format!(
                "url_api must be an http(s) URL, got `{endpoint_url}`"
            )));
        }

        let mut state = self.state.lock();
        let source = Source::new(state.next_id, name, endpoint_url).with_created_at_ms(now_ms());
        state.next_id += 1;
        state.servers.push(source.clone());

        if let Err(err) = self.save(&state) {
            state.servers.pop();
            state.next_id -= 1;
            return Err(err);
        }

        info!(id = source.id, name = %source.name, "server registered");
        Ok(source)
    }

    pub fn delete(&self, id: i64) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let index = state
            .servers
            .iter()
            .position(|s| s.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        let removed = state.servers.remove(index);

        if let Err(err) = self.save(&state) {
            state.servers.insert(index, removed);
            return Err(err);
        }

        info!(id, name = %removed.name, "server removed");
        Ok(())
    }

    fn save(&self, state: &RegistryFile) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
