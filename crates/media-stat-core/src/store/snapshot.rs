use bincode::{deserialize, serialize};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use crate::error::{StoreError, StoreResult};
use crate::store::memory::{CatalogState, CatalogStore};

/// Persists the catalog between runs as gzip-compressed bincode
pub struct SnapshotStorage {
    path: PathBuf,
}

impl SnapshotStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the catalog, or an empty one when no snapshot exists yet
    ///
    /// A snapshot that no longer decodes is copied to `.bin.bak` and replaced by
    /// an empty catalog so a schema change never blocks a run.
    pub fn load(&self) -> StoreResult<CatalogStore> {
        if !self.path.exists() {
            debug!("Catalog snapshot does not exist, starting with an empty catalog");
            return Ok(CatalogStore::new());
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(&self.path)?;

        let state = match decode(&data) {
            Ok(state) => state,
            Err(e) => {
                let backup_path = self.path.with_extension("bin.bak");
                if let Err(backup_err) = std::fs::copy(&self.path, &backup_path) {
                    warn!(
                        "Failed to back up unreadable catalog snapshot: {}. Starting with an empty catalog.",
                        backup_err
                    );
                } else {
                    info!(
                        "Catalog snapshot unreadable ({}). Backed up to {:?}, starting with an empty catalog.",
                        e, backup_path
                    );
                }
                return Ok(CatalogStore::new());
            }
        };

        info!(
            "Loaded catalog: {} libraries, {} movies, {} shows, {} episodes, {} statistics in {:?}",
            state.libraries.len(),
            state.movies.len(),
            state.shows.len(),
            state.episodes.len(),
            state.statistics.len(),
            start.elapsed()
        );
        Ok(CatalogStore::from_state(state))
    }

    /// Write the catalog atomically (temp file, then rename)
    pub fn save(&self, store: &CatalogStore) -> StoreResult<()> {
        let start = std::time::Instant::now();
        let state = store.snapshot()?;

        let serialized = serialize(&state).map_err(|e| StoreError::Encode(e.to_string()))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        let encoded = encoder.finish()?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)?;
        std::fs::rename(&temp_path, &self.path)?;

        info!(
            "Saved catalog snapshot: {} movies, {} shows in {:?}",
            state.movies.len(),
            state.shows.len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Remove the snapshot file if present
    pub fn clear(&self) -> StoreResult<bool> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn size(&self) -> StoreResult<u64> {
        if self.path.exists() {
            Ok(std::fs::metadata(&self.path)?.len())
        } else {
            Ok(0)
        }
    }
}

fn decode(data: &[u8]) -> StoreResult<CatalogState> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    deserialize(&decompressed).map_err(|e| StoreError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::repository::{MovieRepository, ShowRepository, WatermarkRepository};
    use crate::testing::{disk_episode, movie, season, show};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_missing_file_gives_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SnapshotStorage::new(dir.path().join("catalog.bin"));
        let store = storage.load().unwrap();
        assert!(store.movies(&[]).unwrap().is_empty());
        assert!(!storage.exists());
    }

    #[test]
    fn test_save_then_load_preserves_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SnapshotStorage::new(dir.path().join("data").join("catalog.bin"));

        let store = CatalogStore::new();
        store.upsert_movies(&[movie("m1", "lib1")]).unwrap();
        store.insert_seasons(&[season("s1", "s1-1", 1)]).unwrap();
        store.insert_episodes(&[disk_episode("s1", "s1-1", "e1", 1, None)]).unwrap();
        store.insert_show(&show("s1", "lib2", Some("42"))).unwrap();
        let watermark = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.set_last_update(Some(watermark)).unwrap();

        storage.save(&store).unwrap();
        assert!(storage.size().unwrap() > 0);
        assert!(!dir.path().join("data").join("catalog.tmp").exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.movies(&[]).unwrap().len(), 1);
        let shows = loaded.shows(&[]).unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].episodes.len(), 1);
        assert_eq!(loaded.last_update().unwrap(), Some(watermark));
    }

    #[test]
    fn test_corrupt_snapshot_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.bin");
        std::fs::write(&path, b"not a catalog").unwrap();

        let storage = SnapshotStorage::new(&path);
        let store = storage.load().unwrap();
        assert!(store.movies(&[]).unwrap().is_empty());
        assert!(dir.path().join("catalog.bin.bak").exists());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SnapshotStorage::new(dir.path().join("catalog.bin"));
        storage.save(&CatalogStore::new()).unwrap();
        assert!(storage.clear().unwrap());
        assert!(!storage.clear().unwrap());
    }
}
