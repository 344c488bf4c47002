//! File-backed [`PlayerStore`].
//!
//! Layout under the data directory:
//!
//! ```text
//! <dir>/inventories/<player-id>.json   pre-round snapshots
//! <dir>/offline/<player-id>.json       pending restores
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mglib_types::{Codec, JsonCodec, Location, PlayerId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::{PlayerSnapshot, PlayerStore, StoreError};

/// A [`PlayerStore`] keeping one small file per player and record kind.
///
/// Every write replaces the whole file, going through a temporary file
/// and a rename so a crash never leaves a half-written snapshot behind.
#[derive(Debug)]
pub struct JsonPlayerStore<C: Codec = JsonCodec> {
    inventories: PathBuf,
    offline: PathBuf,
    codec: C,
}

impl JsonPlayerStore<JsonCodec> {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_codec(dir, JsonCodec)
    }
}

impl<C: Codec> JsonPlayerStore<C> {
    pub fn with_codec(dir: impl AsRef<Path>, codec: C) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let inventories = dir.join("inventories");
        let offline = dir.join("offline");
        fs::create_dir_all(&inventories)?;
        fs::create_dir_all(&offline)?;
        debug!(dir = %dir.display(), "player store opened");
        Ok(Self {
            inventories,
            offline,
            codec,
        })
    }

    fn file(dir: &Path, player: PlayerId) -> PathBuf {
        dir.join(format!("{}.json", player.0))
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let bytes = self.codec.encode(value)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl<C: Codec> PlayerStore for JsonPlayerStore<C> {
    fn save_snapshot(
        &mut self,
        player: PlayerId,
        snapshot: &PlayerSnapshot,
    ) -> Result<(), StoreError> {
        self.write(&Self::file(&self.inventories, player), snapshot)
    }

    fn load_snapshot(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StoreError> {
        self.read(&Self::file(&self.inventories, player))
    }

    fn remove_snapshot(&mut self, player: PlayerId) -> Result<(), StoreError> {
        Self::remove(&Self::file(&self.inventories, player))
    }

    fn queue_restore(&mut self, player: PlayerId, exit: &Location) -> Result<(), StoreError> {
        self.write(&Self::file(&self.offline, player), exit)
    }

    fn pending_restore(&self, player: PlayerId) -> Result<Option<Location>, StoreError> {
        self.read(&Self::file(&self.offline, player))
    }

    fn clear_restore(&mut self, player: PlayerId) -> Result<(), StoreError> {
        Self::remove(&Self::file(&self.offline, player))
    }
}
