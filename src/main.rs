use feedback_sync::ingest::ingest_and_stop;
use feedback_sync::{FeedbackConfig, FeedbackRecorder, SyncScheduler, TickOutcome};
use std::io::Read;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};

// Reads one JSON object per stdin line and records it until EOF or Ctrl-C.
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), feedback_sync::FeedbackError> {
    let config = FeedbackConfig::from_env()?;
    let recorder = FeedbackRecorder::initialize(&config.folder).await?;
    let scheduler = SyncScheduler::for_recorder(&recorder, config.publisher()?, config.every())
        .with_retention(config.retention);
    let sync = Arc::new(scheduler).start();

    let input = match stdin_pipe() {
        Ok(input) => input,
        Err(e) => {
            sync.stop().await;
            return Err(e.into());
        }
    };
    let report = ingest_and_stop(BufReader::new(input), &recorder, sync, interrupted()).await;

    match report.final_sync {
        TickOutcome::Failed(e) => {
            log::error!("feedback left in {}: {}", config.folder.display(), e)
        }
        outcome => log::info!("final sync: {:?}", outcome),
    }
    let summary = report.input?;
    log::info!(
        "recorded {} feedback record(s), skipped {}",
        summary.recorded,
        summary.skipped
    );
    Ok(())
}

/// Resolves on the first Ctrl-C; a second one exits without waiting for the
/// final publish
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    log::info!("interrupted, publishing before exit (Ctrl-C again to abort)");
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("aborted before final publish");
            std::process::exit(130);
        }
    });
}

/// Stdin read on a plain thread: a blocked read there never holds up runtime
/// shutdown the way a blocking-pool read does
fn stdin_pipe() -> std::io::Result<DuplexStream> {
    let (reader, mut writer) = tokio::io::duplex(64 * 1024);
    let handle = tokio::runtime::Handle::current();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut chunk = [0u8; 8192];
            loop {
                let n = match stdin.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::error!("stdin read failed: {}", e);
                        break;
                    }
                };
                if handle.block_on(writer.write_all(&chunk[..n])).is_err() {
                    break;
                }
            }
        })?;
    Ok(reader)
}
