//! A file-per-key store with atomic rename-on-commit: writes land in
//! `<key>.tmp` and only become visible to `load` once `commit` renames that
//! file over `<key>`, so a reader never observes a partial write.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to set up the store directory: {0}")]
    Setup(#[source] io::Error),

    #[error("io error for key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Root directory for a flat key→bytes store. One writer at a time per
/// store instance — `write_lock` serializes `start` calls so two concurrent
/// writers for the same key can't clobber each other's temp file.
pub struct FileBackedStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the backing directory if it doesn't already exist. Call once
    /// before the first `start`/`load`.
    pub async fn init(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.root).await.map_err(PersistError::Setup)
    }

    fn final_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.tmp"))
    }

    /// Begins a write for `key`. The caller streams bytes into the returned
    /// [`PendingWrite`], then either `commit`s it or `cancel`s it.
    pub async fn start(&self, key: &str) -> Result<PendingWrite, PersistError> {
        let _guard = self.write_lock.lock().await;
        let tmp_path = self.tmp_path(key);
        let file = fs::File::create(&tmp_path)
            .await
            .map_err(|source| PersistError::Io { key: key.to_string(), source })?;
        Ok(PendingWrite {
            final_path: self.final_path(key),
            tmp_path,
            file,
            key: key.to_string(),
        })
    }

    /// Reads back the last value committed for `key`, or `None` if it was
    /// never committed (or only ever cancelled).
    pub async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match fs::read(self.final_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistError::Io { key: key.to_string(), source }),
        }
    }
}

/// An in-progress write, started by [`FileBackedStore::start`]. Dropping
/// this without calling `commit` or `cancel` leaves the temp file behind —
/// callers are expected to always follow through one or the other, same as
/// a `Bookmark`'s `save`/`destroy` contract.
pub struct PendingWrite {
    final_path: PathBuf,
    tmp_path: PathBuf,
    file: fs::File,
    key: String,
}

impl PendingWrite {
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|source| PersistError::Io { key: self.key.clone(), source })
    }

    /// Flushes the temp file and atomically renames it into place. `rename`
    /// within a single directory is atomic on every platform `tokio::fs`
    /// targets, so a concurrent `load` either sees the old value or the new
    /// one, never a partial one.
    pub async fn commit(mut self) -> Result<(), PersistError> {
        self.file
            .flush()
            .await
            .map_err(|source| PersistError::Io { key: self.key.clone(), source })?;
        fs::rename(&self.tmp_path, &self.final_path)
            .await
            .map_err(|source| PersistError::Io { key: self.key.clone(), source })
    }

    /// Discards the write; any previously committed value for this key is
    /// left untouched.
    pub async fn cancel(self) -> Result<(), PersistError> {
        match fs::remove_file(&self.tmp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistError::Io { key: self.key.clone(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> FileBackedStore {
        let dir = std::env::temp_dir().join(format!("ack-persist-state-test-{:x}", std::process::id()));
        let store = FileBackedStore::new(dir);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn commit_makes_the_value_visible_to_load() {
        let store = temp_store().await;
        let mut write = store.start("offset-0").await.unwrap();
        write.write_all(b"hello").await.unwrap();
        write.commit().await.unwrap();

        assert_eq!(store.load("offset-0").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn cancel_leaves_no_committed_value_behind() {
        let store = temp_store().await;
        let mut write = store.start("offset-1").await.unwrap();
        write.write_all(b"discarded").await.unwrap();
        write.cancel().await.unwrap();

        assert_eq!(store.load("offset-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn commit_overwrites_a_previously_committed_value() {
        let store = temp_store().await;

        let mut first = store.start("offset-2").await.unwrap();
        first.write_all(b"v1").await.unwrap();
        first.commit().await.unwrap();

        let mut second = store.start("offset-2").await.unwrap();
        second.write_all(b"v2").await.unwrap();
        second.commit().await.unwrap();

        assert_eq!(store.load("offset-2").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn load_of_an_unwritten_key_is_none() {
        let store = temp_store().await;
        assert_eq!(store.load("never-written").await.unwrap(), None);
    }
}
