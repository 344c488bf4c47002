//! Arena templates and where they are kept.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mglib_player::StoreError;
use mglib_types::{Bounds, Codec, JsonCodec, Location};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named, persisted spatial template for rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaData {
    pub world: String,
    /// Ordered spawn points, all in `world`.
    pub spawns: Vec<Location>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

/// Storage for arena templates, keyed by arena name.
pub trait ArenaStore: Send + 'static {
    fn load(&self, name: &str) -> Result<Option<ArenaData>, StoreError>;

    /// Inserts or replaces an arena.
    fn save(&mut self, name: &str, arena: &ArenaData) -> Result<(), StoreError>;

    /// Returns `false` if there was nothing to remove.
    fn remove(&mut self, name: &str) -> Result<bool, StoreError>;

    fn names(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory [`ArenaStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryArenaStore {
    arenas: BTreeMap<String, ArenaData>,
}

impl MemoryArenaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used to seed arenas in tests and demos.
    pub fn with_arena(mut self, name: impl Into<String>, arena: ArenaData) -> Self {
        self.arenas.insert(name.into(), arena);
        self
    }
}

impl ArenaStore for MemoryArenaStore {
    fn load(&self, name: &str) -> Result<Option<ArenaData>, StoreError> {
        Ok(self.arenas.get(name).cloned())
    }

    fn save(&mut self, name: &str, arena: &ArenaData) -> Result<(), StoreError> {
        self.arenas.insert(name.to_string(), arena.clone());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.arenas.remove(name).is_some())
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.arenas.keys().cloned().collect())
    }
}

/// [`ArenaStore`] backed by a single JSON document.
///
/// The whole document is held in memory and rewritten on every change.
/// Arenas change rarely (an admin command), so this stays cheap.
#[derive(Debug)]
pub struct JsonArenaStore {
    path: PathBuf,
    arenas: BTreeMap<String, ArenaData>,
}

impl JsonArenaStore {
    /// Opens the document at `path`, starting empty if it does not
    /// exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let arenas = match fs::read(&path) {
            Ok(bytes) => JsonCodec.decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), arenas = arenas.len(), "arena store opened");
        Ok(Self { path, arenas })
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = JsonCodec.encode(&self.arenas)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ArenaStore for JsonArenaStore {
    fn load(&self, name: &str) -> Result<Option<ArenaData>, StoreError> {
        Ok(self.arenas.get(name).cloned())
    }

    fn save(&mut self, name: &str, arena: &ArenaData) -> Result<(), StoreError> {
        self.arenas.insert(name.to_string(), arena.clone());
        self.flush()
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        if self.arenas.remove(name).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.arenas.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaData {
        ArenaData {
            world: "arena".into(),
            spawns: vec![Location::new("arena", 0.0, 64.0, 0.0)],
            bounds: Some(Bounds::from_corners((-10.0, 0.0, -10.0), (10.0, 100.0, 10.0))),
        }
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("mglib-arenas-{}", std::process::id()))
            .join("arenas.json");
        let _ = std::fs::remove_file(&path);
        {
            let mut store = JsonArenaStore::open(&path).unwrap();
            store.save("field", &arena()).unwrap();
            store.save("pit", &arena()).unwrap();
            assert!(store.remove("pit").unwrap());
            assert!(!store.remove("pit").unwrap());
        }
        let store = JsonArenaStore::open(&path).unwrap();
        assert_eq!(store.names().unwrap(), vec!["field".to_string()]);
        assert_eq!(store.load("field").unwrap(), Some(arena()));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_memory_store_builder() {
        let store = MemoryArenaStore::new().with_arena("a", arena());
        assert_eq!(store.load("a").unwrap(), Some(arena()));
        assert_eq!(store.load("b").unwrap(), None);
    }
}
