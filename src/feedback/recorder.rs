use crate::feedback::types::{EVENT_ID_FIELD, FeedbackError, SESSION_ID_FIELD};
use crate::feedback::{FeedbackFolder, FileWriter, JsonlFile};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Appends feedback records to the session's JSONL log.
///
/// One recorder per session; share it by `Arc` (or `&`) with every caller.
pub struct FeedbackRecorder<W = JsonlFile>
where
    W: FileWriter + 'static,
{
    folder: FeedbackFolder,
    file_writer: Arc<W>,
    session_id: String,
    log_path: PathBuf,
}

impl FeedbackRecorder<JsonlFile> {
    /// Create the folder if needed and start a new session logging to
    /// `data_<session_id>.json` inside it
    pub async fn initialize(folder_path: impl Into<PathBuf>) -> Result<Self, FeedbackError> {
        let folder = FeedbackFolder::open(folder_path).await?;
        let session_id = Uuid::new_v4().to_string();
        let log_path = folder.path().join(log_file_name(&session_id));
        log::info!(
            "feedback session {} logging to {}",
            session_id,
            log_path.display()
        );
        Ok(Self::with_writer(
            folder,
            session_id,
            log_path.clone(),
            JsonlFile::new(log_path),
        ))
    }
}

impl<W> FeedbackRecorder<W>
where
    W: FileWriter + 'static,
{
    /// Create a recorder with an injected writer
    pub fn with_writer(
        folder: FeedbackFolder,
        session_id: impl Into<String>,
        log_path: PathBuf,
        file_writer: W,
    ) -> Self {
        Self {
            folder,
            file_writer: Arc::new(file_writer),
            session_id: session_id.into(),
            log_path,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The session's log file; it exists only after the first append
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Folder handle sharing this recorder's lock
    pub fn folder(&self) -> &FeedbackFolder {
        &self.folder
    }

    /// Persist one record as a single JSONL line.
    ///
    /// `session_id` and a fresh `event_id` overwrite any caller fields of the
    /// same name. Failures are returned, never retried.
    ///
    /// Safe to cancel: the write runs in its own task that keeps the folder
    /// lock until the line is flushed, so a timed-out caller never leaves a
    /// write in progress outside the lock.
    pub async fn append<R>(&self, record: &R) -> Result<(), FeedbackError>
    where
        R: Serialize + ?Sized,
    {
        let mut obj = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            other => {
                return Err(FeedbackError::Validation(format!(
                    "feedback record must be an object, got {}",
                    kind(&other)
                )));
            }
        };
        let event_id = Uuid::new_v4().to_string();
        obj.insert(SESSION_ID_FIELD.into(), Value::String(self.session_id.clone()));
        obj.insert(EVENT_ID_FIELD.into(), Value::String(event_id.clone()));
        let line = serde_json::to_string(&obj)?;

        let guard = self.folder.lock_owned().await;
        let file_writer = self.file_writer.clone();
        let write = tokio::spawn(async move {
            let _guard = guard;
            file_writer.write_jsonl(&line).await
        });
        write.await.map_err(std::io::Error::other)??;

        log::debug!("recorded feedback event {}", event_id);
        Ok(())
    }
}

pub fn log_file_name(session_id: &str) -> String {
    format!("data_{session_id}.json")
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
