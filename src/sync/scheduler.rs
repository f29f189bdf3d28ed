use crate::feedback::{
    FeedbackError, FeedbackFolder, FeedbackRecorder, FileWriter, RetentionPolicy, SnapshotEntry,
};
use crate::sync::{PublishFile, Publisher};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Result of one publish attempt
#[derive(Debug)]
pub enum TickOutcome {
    /// These files were committed remotely
    Published { files: Vec<String> },
    /// Nothing changed since the last successful publish
    Idle,
    /// Another publish was still in flight
    Skipped,
    Failed(FeedbackError),
}

impl TickOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TickOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl From<&SnapshotEntry> for Fingerprint {
    fn from(e: &SnapshotEntry) -> Self {
        Self {
            len: e.len,
            modified: e.modified,
        }
    }
}

/// Periodically publishes the feedback folder; publishes never overlap.
pub struct SyncScheduler<P: Publisher + 'static> {
    folder: FeedbackFolder,
    publisher: Arc<P>,
    every: Duration,
    retention: RetentionPolicy,
    protected: Option<String>,
    // Held for the whole publish; doubles as the in-flight flag
    published: Mutex<HashMap<String, Fingerprint>>,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl<P: Publisher + 'static> SyncScheduler<P> {
    pub fn new(folder: FeedbackFolder, publisher: P, every: Duration) -> Self {
        Self {
            folder,
            publisher: Arc::new(publisher),
            every,
            retention: RetentionPolicy::Keep,
            protected: None,
            published: Mutex::new(HashMap::new()),
            last_success: Mutex::new(None),
        }
    }

    /// Scheduler sharing the recorder's folder lock; the recorder's active
    /// log is never removed by retention
    pub fn for_recorder<W: FileWriter + 'static>(
        recorder: &FeedbackRecorder<W>,
        publisher: P,
        every: Duration,
    ) -> Self {
        let mut scheduler = Self::new(recorder.folder().clone(), publisher, every);
        scheduler.protected = recorder
            .log_path()
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned);
        scheduler
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub async fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().await
    }

    /// Publish unless a publish is already running, in which case `Skipped`
    pub async fn tick(&self) -> TickOutcome {
        match self.published.try_lock() {
            Ok(mut published) => self.publish_changes(&mut published).await,
            Err(_) => {
                log::debug!("feedback sync still running, skipping tick");
                TickOutcome::Skipped
            }
        }
    }

    /// Publish, waiting for any in-flight publish to finish first
    pub async fn flush(&self) -> TickOutcome {
        let mut published = self.published.lock().await;
        self.publish_changes(&mut published).await
    }

    async fn publish_changes(&self, published: &mut HashMap<String, Fingerprint>) -> TickOutcome {
        let entries = match self.folder.snapshot().await {
            Ok(entries) => entries,
            Err(e) => return self.failed(e.into()),
        };
        let changed: Vec<&SnapshotEntry> = entries
            .iter()
            .filter(|e| published.get(&e.name) != Some(&Fingerprint::from(*e)))
            .collect();
        if changed.is_empty() {
            log::debug!("feedback folder unchanged, nothing to publish");
            return TickOutcome::Idle;
        }

        let mut batch = Vec::with_capacity(changed.len());
        for entry in &changed {
            match FeedbackFolder::read_prefix(entry).await {
                Ok(contents) => batch.push(PublishFile {
                    name: entry.name.clone(),
                    contents,
                }),
                Err(e) => return self.failed(e.into()),
            }
        }

        if let Err(e) = self.publisher.publish(&batch).await {
            return self.failed(e);
        }

        for entry in &changed {
            published.insert(entry.name.clone(), Fingerprint::from(*entry));
        }
        *self.last_success.lock().await = Some(Utc::now());
        let files: Vec<String> = changed.iter().map(|e| e.name.clone()).collect();
        log::info!(
            "published {} feedback file(s) from {}",
            files.len(),
            self.folder.path().display()
        );

        if self.retention == RetentionPolicy::RemoveConfirmed {
            self.remove_confirmed(&changed, published).await;
        }
        TickOutcome::Published { files }
    }

    /// Delete files whose on-disk length still equals what was just published
    async fn remove_confirmed(
        &self,
        confirmed: &[&SnapshotEntry],
        published: &mut HashMap<String, Fingerprint>,
    ) {
        let _guard = self.folder.lock().await;
        let current = match self.folder.list_files().await {
            Ok(current) => current,
            Err(e) => {
                log::warn!("cannot list feedback folder for cleanup: {}", e);
                return;
            }
        };
        for entry in confirmed {
            if self.protected.as_deref() == Some(entry.name.as_str()) {
                continue;
            }
            let unchanged = current
                .iter()
                .any(|c| c.name == entry.name && c.len == entry.len);
            if !unchanged {
                continue;
            }
            match tokio::fs::remove_file(&entry.path).await {
                Ok(()) => {
                    published.remove(&entry.name);
                    log::debug!("removed published feedback file {}", entry.name);
                }
                Err(e) => log::warn!("cannot remove {}: {}", entry.path.display(), e),
            }
        }
    }

    fn failed(&self, e: FeedbackError) -> TickOutcome {
        log::warn!("feedback sync failed, retrying next tick: {}", e);
        TickOutcome::Failed(e)
    }

    /// Spawn the periodic loop. The first publish happens one period after
    /// start; stopping the handle runs a final flush.
    pub fn start(self: Arc<Self>) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let this = self;
        let task = tokio::spawn(async move {
            let mut intv = interval(this.every);
            intv.set_missed_tick_behavior(MissedTickBehavior::Skip);
            intv.tick().await;
            log::info!(
                "feedback sync every {:?} for {}",
                this.every,
                this.folder.path().display()
            );
            loop {
                tokio::select! {
                    _ = intv.tick() => {
                        this.tick().await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            let outcome = this.flush().await;
            if let TickOutcome::Failed(e) = &outcome {
                log::error!("final feedback sync failed, files kept locally: {}", e);
            }
            outcome
        });

        SyncHandle { shutdown_tx, task }
    }
}

/// Controls a running scheduler loop. Dropping it also stops the loop.
pub struct SyncHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<TickOutcome>,
}

impl SyncHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop after its current tick and return the final flush outcome
    pub async fn stop(self) -> TickOutcome {
        let _ = self.shutdown_tx.send(());
        let outcome = match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => TickOutcome::Failed(FeedbackError::Publish(format!(
                "sync task aborted: {e}"
            ))),
        };
        log::info!("feedback sync stopped");
        outcome
    }
}
