use crate::feedback::FeedbackError;
use async_trait::async_trait;
use std::path::PathBuf;

/// A file's snapshotted content, named relative to the feedback folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Remote sink for the feedback folder.
///
/// `Ok` must mean every file in the batch is durably stored remotely; the
/// scheduler removes local copies only on that basis.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, files: &[PublishFile]) -> Result<(), FeedbackError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(&self, files: &[PublishFile]) -> Result<(), FeedbackError> {
        (**self).publish(files).await
    }
}

/// Mirrors published files into another directory, replacing each file
/// atomically. Useful for shared mounts and offline runs.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    target: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(&self, files: &[PublishFile]) -> Result<(), FeedbackError> {
        let mirror_err =
            |e: std::io::Error| FeedbackError::Publish(format!("{}: {e}", self.target.display()));

        tokio::fs::create_dir_all(&self.target)
            .await
            .map_err(mirror_err)?;
        for file in files {
            let dest = self.target.join(&file.name);
            let tmp = self.target.join(format!(".{}.partial", file.name));
            tokio::fs::write(&tmp, &file.contents)
                .await
                .map_err(mirror_err)?;
            tokio::fs::rename(&tmp, &dest).await.map_err(mirror_err)?;
        }
        Ok(())
    }
}
