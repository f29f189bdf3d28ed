use crate::feedback::{FeedbackError, FeedbackRecorder, FileWriter};
use crate::sync::{SyncHandle, TickOutcome};
use serde_json::Value;
use std::future::Future;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counts of what an input stream produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub recorded: usize,
    pub skipped: usize,
}

/// How an ingestion run ended: the input side and the final publish
#[derive(Debug)]
pub struct IngestReport {
    pub input: io::Result<IngestSummary>,
    pub final_sync: TickOutcome,
}

/// Record one JSON object per input line until EOF or `shutdown` resolves.
///
/// Lines that are not UTF-8, not JSON, or not objects are logged and skipped.
/// Only a read error ends the run early.
pub async fn ingest_until<R, W, S>(
    mut reader: R,
    recorder: &FeedbackRecorder<W>,
    shutdown: S,
) -> io::Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
    W: FileWriter + 'static,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut summary = IngestSummary::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    break;
                }
            }
            _ = &mut shutdown => {
                log::info!("input interrupted after {} line(s)", line_no);
                break;
            }
        }
        line_no += 1;

        let Ok(text) = std::str::from_utf8(&buf) else {
            log::warn!("skipping input line {}: not valid UTF-8", line_no);
            summary.skipped += 1;
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let record = match serde_json::from_str::<Value>(text) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("skipping malformed input line {}: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };
        match recorder.append(&record).await {
            Ok(()) => summary.recorded += 1,
            Err(e @ FeedbackError::Validation(_)) => {
                log::warn!("skipping input line {}: {}", line_no, e);
                summary.skipped += 1;
            }
            Err(e) => {
                log::error!("feedback on line {} not recorded: {}", line_no, e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

/// Ingest until EOF or shutdown, then stop the scheduler whatever happened
/// to the input, so the final publish always runs.
pub async fn ingest_and_stop<R, W, S>(
    reader: R,
    recorder: &FeedbackRecorder<W>,
    sync: SyncHandle,
    shutdown: S,
) -> IngestReport
where
    R: AsyncBufRead + Unpin,
    W: FileWriter + 'static,
    S: Future<Output = ()>,
{
    let input = ingest_until(reader, recorder, shutdown).await;
    if let Err(e) = &input {
        log::error!("reading input failed: {}", e);
    }
    let final_sync = sync.stop().await;
    IngestReport { input, final_sync }
}
