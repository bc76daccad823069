use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::ports::{CacheKey, SubtitleCache};
use crate::error::{MatchError, Result};

/// Downloaded reference subtitles, one file per remote subtitle file.
///
/// Entries are written to a temp file in the same directory and renamed into
/// place, so a reader never sees a partial payload.
#[derive(Debug, Clone)]
pub struct FsSubtitleCache {
    dir: PathBuf,
}

impl FsSubtitleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!(
            "tmdb_{}_s{}_e{}_file_{}.bin",
            key.show_id, key.season_number, key.episode_number, key.file_id
        ))
    }
}

impl SubtitleCache for FsSubtitleCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Subtitle cache hit path={}", path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MatchError::Cache(format!(
                "read {} failed: {e}",
                path.display()
            ))),
        }
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(key);
        let cache_error =
            |e: std::io::Error| MatchError::Cache(format!("write {} failed: {e}", path.display()));

        fs::create_dir_all(&self.dir).map_err(cache_error)?;
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(cache_error)?;
        temp.write_all(bytes).map_err(cache_error)?;
        temp.as_file().sync_all().map_err(cache_error)?;
        temp.persist(&path).map_err(|e| cache_error(e.error))?;
        Ok(())
    }
}
