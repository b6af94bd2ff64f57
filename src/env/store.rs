// ABOUTME: Persistence of environment aggregates: a JSON file store and an in-memory store.
// ABOUTME: Saves are all-or-nothing and assign identities to unsaved entities.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Environment;
use crate::types::EnvName;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("environment '{0}' not found")]
    NotFound(EnvName),

    #[error("failed to read environment store {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write environment store {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt environment store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode environment store: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("environment store unavailable: {0}")]
    Unavailable(String),
}

/// Reads and writes whole environment aggregates.
pub trait EnvironmentStore: Send + Sync {
    fn load(&self, name: &EnvName) -> Result<Option<Environment>, StoreError>;

    /// Persist `environment` and its children in one step.
    ///
    /// Returns the saved aggregate with identities assigned. On error nothing
    /// is written.
    fn save(&self, environment: &Environment) -> Result<Environment, StoreError>;

    fn list(&self) -> Result<Vec<EnvName>, StoreError>;
}

/// Everything the store knows, as persisted.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    environments: BTreeMap<String, Environment>,
}

impl Document {
    /// Assign identities and replace the stored copy. Returns the stored copy.
    fn put(&mut self, environment: &Environment) -> Environment {
        let mut saved = environment.clone();
        let mut next_id = self.next_id;
        saved.assign_identities(&mut || {
            next_id += 1;
            next_id
        });
        self.next_id = next_id;
        self.environments
            .insert(saved.name().to_string(), saved.clone());
        saved
    }

    fn names(&self) -> Vec<EnvName> {
        self.environments
            .values()
            .map(|env| env.name().clone())
            .collect()
    }
}

/// Single JSON document on disk, replaced atomically on every save.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Document, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::default()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, document: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        // Write beside the target, then rename over it.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl EnvironmentStore for FileStore {
    fn load(&self, name: &EnvName) -> Result<Option<Environment>, StoreError> {
        let _guard = self.guard.lock();
        Ok(self.read()?.environments.remove(name.as_str()))
    }

    fn save(&self, environment: &Environment) -> Result<Environment, StoreError> {
        let _guard = self.guard.lock();
        let mut document = self.read()?;
        let saved = document.put(environment);
        self.write(&document)?;
        tracing::debug!(
            "Saved environment '{}' to {}",
            saved.name(),
            self.path.display()
        );
        Ok(saved)
    }

    fn list(&self) -> Result<Vec<EnvName>, StoreError> {
        let _guard = self.guard.lock();
        Ok(self.read()?.names())
    }
}

/// Store kept in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    document: Document,
    fail_next_save: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an environment as if it had been saved earlier.
    pub fn insert(&self, environment: &Environment) -> Environment {
        self.state.lock().document.put(environment)
    }

    /// Make the next `save` fail without writing anything.
    pub fn fail_next_save(&self) {
        self.state.lock().fail_next_save = true;
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.state.lock().saves
    }
}

impl EnvironmentStore for MemoryStore {
    fn load(&self, name: &EnvName) -> Result<Option<Environment>, StoreError> {
        Ok(self
            .state
            .lock()
            .document
            .environments
            .get(name.as_str())
            .cloned())
    }

    fn save(&self, environment: &Environment) -> Result<Environment, StoreError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_save) {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        state.saves += 1;
        Ok(state.document.put(environment))
    }

    fn list(&self) -> Result<Vec<EnvName>, StoreError> {
        Ok(self.state.lock().document.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplicationVm;

    fn env(name: &str) -> Environment {
        Environment::new(EnvName::new(name).unwrap())
    }

    #[test]
    fn file_store_round_trips_and_assigns_identities() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("db/environments.json"));

        let mut blue = env("blue");
        blue.attach_vm(ApplicationVm::new("host1", "10.0.0.5"));
        let saved = store.save(&blue).unwrap();
        assert!(saved.id().is_assigned());
        assert!(saved.application_vms()[0].id().is_assigned());

        let loaded = store.load(saved.name()).unwrap().unwrap();
        assert_eq!(loaded.id(), saved.id());
        assert_eq!(loaded.application_vms()[0].hostname(), "host1");
        assert_eq!(store.list().unwrap(), vec![EnvName::new("blue").unwrap()]);
    }

    #[test]
    fn identities_are_unique_across_environments() {
        let store = MemoryStore::new();
        let blue = store.save(&env("blue")).unwrap();
        let green = store.save(&env("green")).unwrap();
        assert_ne!(blue.id().get(), green.id().get());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("none.json"));
        assert!(store.load(&EnvName::new("blue").unwrap()).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(
            store.list(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn injected_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.fail_next_save();
        assert!(store.save(&env("blue")).is_err());
        assert!(store.load(&EnvName::new("blue").unwrap()).unwrap().is_none());
        assert_eq!(store.saves(), 0);

        store.save(&env("blue")).unwrap();
        assert_eq!(store.saves(), 1);
    }
}
