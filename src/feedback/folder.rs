use crate::feedback::types::SnapshotEntry;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

/// The local feedback folder and the lock every writer and snapshot shares.
///
/// Cloning is cheap and every clone guards the same folder.
#[derive(Debug, Clone)]
pub struct FeedbackFolder {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FeedbackFolder {
    /// Open the folder, creating it (and parents) when absent
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for exclusive access to the folder's files
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Like `lock`, but the guard can move into a spawned task
    pub async fn lock_owned(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }

    /// List regular files and their current lengths while holding the lock.
    ///
    /// Appends finish under the same lock, so the first `len` bytes of each
    /// entry only ever contain complete lines.
    pub async fn snapshot(&self) -> io::Result<Vec<SnapshotEntry>> {
        let _guard = self.lock().await;
        self.list_files().await
    }

    /// Listing without taking the lock; callers must already hold it
    pub(crate) async fn list_files(&self) -> io::Result<Vec<SnapshotEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                log::warn!("skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            entries.push(SnapshotEntry {
                path: entry.path(),
                name,
                len: meta.len(),
                modified: meta.modified().ok(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Read exactly the snapshotted prefix of a file; no lock needed since
    /// the prefix of an append-only file never changes
    pub async fn read_prefix(entry: &SnapshotEntry) -> io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(&entry.path).await?;
        let mut buf = Vec::with_capacity(entry.len as usize);
        file.take(entry.len).read_to_end(&mut buf).await?;
        if (buf.len() as u64) < entry.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} shrank below its snapshot length", entry.path.display()),
            ));
        }
        Ok(buf)
    }
}
