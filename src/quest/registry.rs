//! Quest Registry
//!
//! Loads, caches, and validates quest definitions from TOML files.
//! Supports hot-reloading during development.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use super::definition::{QuestDef, RawQuestFile};

/// Registry for all quest definitions
pub struct QuestRegistry {
    /// Loaded quest definitions
    quests: RwLock<HashMap<String, Arc<QuestDef>>>,
    /// Base directory for quest data
    data_dir: PathBuf,
}

impl QuestRegistry {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            quests: RwLock::new(HashMap::new()),
            data_dir: data_dir.join("quests"),
        }
    }

    /// Load all quest definitions from the data directory. Files that fail
    /// to read or parse are skipped with a warning; the rest still load.
    pub fn load_all(&self) -> Result<(), String> {
        info!("Loading quests from {:?}", self.data_dir);

        if !self.data_dir.exists() {
            warn!("Quest directory does not exist: {:?}", self.data_dir);
            return Ok(());
        }

        let mut paths = Vec::new();
        self.collect_toml_files(&self.data_dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            if let Err(e) = self.load_quest_file(&path) {
                warn!("Failed to load quest {:?}: {}", path, e);
            } else {
                count += 1;
            }
        }
        info!("Loaded {} quest definitions", count);

        Ok(())
    }

    /// Recursively collect quest TOML files
    fn collect_toml_files(&self, dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), String> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.is_dir() {
                self.collect_toml_files(&path, paths)?;
            } else if path.extension().map_or(false, |ext| ext == "toml") {
                paths.push(path);
            }
        }

        Ok(())
    }

    /// Load a single quest file
    fn load_quest_file(&self, path: &Path) -> Result<(), String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let raw: RawQuestFile = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        let def = QuestDef::from_raw(&raw.quest)?;
        let quest_name = def.name.clone();

        info!("Loaded quest: {} ({} criteria)", quest_name, def.criteria.len());

        let mut quests = self.quests.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if quests.insert(quest_name.clone(), Arc::new(def)).is_some() {
            warn!("Quest '{}' defined more than once; last file wins", quest_name);
        }

        Ok(())
    }

    /// Get a quest definition by name
    pub fn get(&self, quest_name: &str) -> Option<Arc<QuestDef>> {
        let quests = self.quests.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        quests.get(quest_name).cloned()
    }

    /// Get all quest names
    pub fn all_names(&self) -> Vec<String> {
        let quests = self.quests.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut names: Vec<String> = quests.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get count of loaded quests
    pub fn count(&self) -> usize {
        self.quests.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Start a file watcher over the quest data directory.
    ///
    /// The watcher thread only forwards change notifications; the engine
    /// polls the receiver each tick and calls [`load_all`](Self::load_all).
    pub fn watch(&self) -> Result<mpsc::Receiver<HotReloadEvent>, String> {
        use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
        use std::time::Duration;

        if !self.data_dir.exists() {
            return Err(format!("Quest directory does not exist: {:?}", self.data_dir));
        }

        let (tx, rx) = mpsc::channel();
        let data_dir = self.data_dir.clone();

        std::thread::spawn(move || {
            let (notify_tx, notify_rx) = mpsc::channel();

            let mut watcher = match RecommendedWatcher::new(
                move |res: Result<notify::Event, notify::Error>| {
                    if let Ok(event) = res {
                        let _ = notify_tx.send(event);
                    }
                },
                Config::default().with_poll_interval(Duration::from_secs(1)),
            ) {
                Ok(w) => w,
                Err(e) => {
                    tracing::error!("Failed to create file watcher: {}", e);
                    return;
                }
            };

            if let Err(e) = watcher.watch(&data_dir, RecursiveMode::Recursive) {
                tracing::error!("Failed to watch quest directory: {}", e);
                return;
            }

            info!("Quest hot-reload watcher started for {:?}", data_dir);

            loop {
                match notify_rx.recv() {
                    Ok(event) => {
                        use notify::EventKind;
                        match event.kind {
                            EventKind::Modify(_) | EventKind::Create(_) => {
                                for path in &event.paths {
                                    if path.extension().map_or(false, |ext| ext == "toml") {
                                        if tx.send(HotReloadEvent::Changed(path.clone())).is_err() {
                                            // Receiver dropped, stop watching
                                            return;
                                        }
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(rx)
    }
}

/// Events from the hot-reload watcher
#[derive(Debug, Clone)]
pub enum HotReloadEvent {
    /// A quest definition file was modified or created
    Changed(PathBuf),
}
