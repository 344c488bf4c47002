//! Durable change logs: one JSON-lines file per arena.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mglib_types::{Codec, JsonCodec};
use tracing::{debug, warn};

use crate::{ChangeRecord, RollbackError, RollbackStore};

/// A [`RollbackStore`] writing `<dir>/<arena>.log`.
///
/// Each record is one encoded line appended to the arena's file, so an
/// append costs one small write regardless of log length. A torn last
/// line, left by a crash in the middle of an append, is skipped on
/// load; the mutation it described had not been applied yet.
#[derive(Debug)]
pub struct JsonRollbackStore<C: Codec = JsonCodec> {
    dir: PathBuf,
    codec: C,
}

impl JsonRollbackStore<JsonCodec> {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RollbackError> {
        Self::with_codec(dir, JsonCodec)
    }
}

impl<C: Codec> JsonRollbackStore<C> {
    pub fn with_codec(dir: impl AsRef<Path>, codec: C) -> Result<Self, RollbackError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "rollback store opened");
        Ok(Self { dir, codec })
    }

    fn log_path(&self, arena: &str) -> Result<PathBuf, RollbackError> {
        if arena.is_empty()
            || arena.starts_with('.')
            || arena.contains(['/', '\\', '\0'])
        {
            return Err(RollbackError::InvalidArenaName(arena.to_string()));
        }
        Ok(self.dir.join(format!("{arena}.log")))
    }
}

impl<C: Codec> RollbackStore for JsonRollbackStore<C> {
    fn append(&mut self, arena: &str, record: &ChangeRecord) -> Result<(), RollbackError> {
        let path = self.log_path(arena)?;
        let mut line = self.codec.encode(record)?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&line)?;
        Ok(())
    }

    fn load(&self, arena: &str) -> Result<Vec<ChangeRecord>, RollbackError> {
        let path = self.log_path(arena)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&[u8]> = bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .collect();
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match self.codec.decode::<ChangeRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) if i + 1 == lines.len() => {
                    warn!(arena, error = %e, "skipping torn record at end of rollback log");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(records)
    }

    fn clear(&mut self, arena: &str) -> Result<(), RollbackError> {
        match fs::remove_file(self.log_path(arena)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn pending_arenas(&self) -> Result<Vec<String>, RollbackError> {
        let mut arenas = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "log") {
                continue;
            }
            if entry.metadata()?.len() == 0 {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                arenas.push(stem.to_string());
            }
        }
        arenas.sort();
        Ok(arenas)
    }
}
