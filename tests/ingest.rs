use feedback_sync::FeedbackRecorder;
use feedback_sync::ingest::{IngestSummary, ingest_and_stop, ingest_until};
use feedback_sync::sync::{DirectoryPublisher, SyncScheduler, TickOutcome};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

const HOUR: Duration = Duration::from_secs(3600);

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Input that fails on every read
struct BrokenInput;

impl AsyncRead for BrokenInput {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "input closed",
        )))
    }
}

#[tokio::test]
async fn invalid_utf8_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = FeedbackRecorder::initialize(dir.path()).await.unwrap();
    let input: &[u8] = b"{\"text\":\"kept\"}\n\xff\xfe\n{\"text\":\"after\"}\n";

    let summary = ingest_until(input, &recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary, IngestSummary { recorded: 2, skipped: 1 });
    let lines = read_lines(recorder.log_path());
    assert_eq!(lines[0]["text"], "kept");
    assert_eq!(lines[1]["text"], "after");
}

#[tokio::test]
async fn bad_json_and_non_objects_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = FeedbackRecorder::initialize(dir.path()).await.unwrap();
    let input: &[u8] = b"{\"text\":\n\n   \n[1,2]\n\"just a string\"\r\n\
        {\"text\":\"ok\"}\r\n{\"last\":true}";

    let summary = ingest_until(input, &recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary, IngestSummary { recorded: 2, skipped: 3 });
    let lines = read_lines(recorder.log_path());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["text"], "ok");
    assert_eq!(lines[1]["last"], true);
}

#[tokio::test]
async fn eof_runs_final_publish() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = tempfile::tempdir().unwrap();
    let recorder = FeedbackRecorder::initialize(dir.path()).await.unwrap();
    let sync = Arc::new(SyncScheduler::for_recorder(
        &recorder,
        DirectoryPublisher::new(mirror.path()),
        HOUR,
    ))
    .start();
    let input: &[u8] = b"{\"text\":\"hello\"}\n\xff\n{\"text\":\"world\"}\n";

    let report = ingest_and_stop(input, &recorder, sync, std::future::pending()).await;

    assert_eq!(report.input.unwrap().recorded, 2);
    assert!(matches!(report.final_sync, TickOutcome::Published { .. }));
    let name = recorder.log_path().file_name().unwrap();
    assert_eq!(read_lines(&mirror.path().join(name)).len(), 2);
}

#[tokio::test]
async fn read_error_still_publishes() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = tempfile::tempdir().unwrap();
    let recorder = FeedbackRecorder::initialize(dir.path()).await.unwrap();
    let sync = Arc::new(SyncScheduler::for_recorder(
        &recorder,
        DirectoryPublisher::new(mirror.path()),
        HOUR,
    ))
    .start();
    let input = BufReader::new((&b"{\"text\":\"saved\"}\n"[..]).chain(BrokenInput));

    let report = ingest_and_stop(input, &recorder, sync, std::future::pending()).await;

    assert!(report.input.is_err());
    assert!(matches!(report.final_sync, TickOutcome::Published { .. }));
    let name = recorder.log_path().file_name().unwrap();
    let mirrored = read_lines(&mirror.path().join(name));
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0]["text"], "saved");
}

// Shutdown ends ingestion even while the input has nothing to read
#[tokio::test]
async fn shutdown_interrupts_stalled_input() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = tempfile::tempdir().unwrap();
    let recorder = FeedbackRecorder::initialize(dir.path()).await.unwrap();
    let sync = Arc::new(SyncScheduler::for_recorder(
        &recorder,
        DirectoryPublisher::new(mirror.path()),
        HOUR,
    ))
    .start();
    let (reader, mut writer) = tokio::io::duplex(1024);
    tokio::io::AsyncWriteExt::write_all(&mut writer, b"{\"text\":\"before\"}\n")
        .await
        .unwrap();

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        ingest_and_stop(
            BufReader::new(reader),
            &recorder,
            sync,
            tokio::time::sleep(Duration::from_millis(100)),
        ),
    )
    .await
    .unwrap();

    assert_eq!(report.input.unwrap().recorded, 1);
    assert!(matches!(report.final_sync, TickOutcome::Published { .. }));
    drop(writer);
}
