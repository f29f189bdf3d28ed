use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Abstracts JSONL appends so the recorder can be tested without a disk
#[async_trait]
pub trait FileWriter: Send + Sync {
    /// Append one line (without its terminator) and flush it to disk
    async fn write_jsonl(&self, line: &str) -> io::Result<()>;
}

#[async_trait]
impl<W: FileWriter + ?Sized> FileWriter for std::sync::Arc<W> {
    async fn write_jsonl(&self, line: &str) -> io::Result<()> {
        (**self).write_jsonl(line).await
    }
}

/// Appends to a single JSONL file, opening it per write so the file may be
/// created lazily and never holds a handle between appends
#[derive(Debug, Clone)]
pub struct JsonlFile {
    path: PathBuf,
}

impl JsonlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileWriter for JsonlFile {
    async fn write_jsonl(&self, line: &str) -> io::Result<()> {
        if line.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "JSONL line must not contain a newline",
            ));
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}
