//! Save-Value Store
//!
//! The persistence collaborator: named string values keyed by quest and
//! criterion names. `MemoryStore` backs tests; `FileStore` keeps the whole
//! map as one JSON file on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Named-value persistence, as exposed by the platform save system
pub trait SaveStore {
    fn save_value(&mut self, key: &str, value: &str);

    fn load_value(&self, key: &str) -> Option<String>;
}

/// In-memory store for tests and embedders with their own persistence
#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SaveStore for MemoryStore {
    fn save_value(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn load_value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// JSON-file-backed store, flushed on every write
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    /// Open a store file, starting empty when it is missing or unreadable.
    /// A missing file is a normal first run; any other read failure warns.
    pub fn open(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Failed to parse save store {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read save store {:?}: {}", path, e);
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    fn flush(&self) {
        let json = match serde_json::to_string_pretty(&self.values) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize save store: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("Failed to write save store {:?}: {}", self.path, e);
        }
    }
}

impl SaveStore for FileStore {
    fn save_value(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn load_value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
