use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufWriter, Stdout};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use connector::prelude::*;

const DEFAULT_CHECKPOINT_FILE: &str = "checkpoints.json";
const DEFAULT_PARTITIONS: usize = 2;

#[tokio::main]
async fn main() {
    CliApp::new("connector").run(run_consumer).await
}

/// Command-line arguments
struct Args {
    records: PathBuf,
    checkpoints: PathBuf,
    partitions: usize,
}

/// Parse and validate command-line arguments
fn parse_args(args: &[String]) -> Result<Args, AppError> {
    let usage = || {
        AppError::InvalidArguments(
            "Usage: connector <records.txt> [checkpoints.json] [partitions]".to_string(),
        )
    };

    if args.len() < 2 || args.len() > 4 {
        return Err(usage());
    }

    let partitions = match args.get(3) {
        Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(usage)?,
        None => DEFAULT_PARTITIONS,
    };

    Ok(Args {
        records: PathBuf::from(&args[1]),
        checkpoints: PathBuf::from(args.get(2).map_or(DEFAULT_CHECKPOINT_FILE, String::as_str)),
        partitions,
    })
}

/// Writes every record of a batch to stdout, one line per record
struct StdoutHandler {
    out: Mutex<BufWriter<Stdout>>,
}

#[async_trait]
impl Handler for StdoutHandler {
    async fn handle_records(&self, batch: &Buffer) -> Result<(), HandlerError> {
        let mut out = self.out.lock().await;
        for record in batch.records() {
            let line = format!(
                "{}\t{}\t{}\n",
                batch.partition_id(),
                record.sequence_number(),
                String::from_utf8_lossy(record.data())
            );
            out.write_all(line.as_bytes())
                .await
                .map_err(|e| HandlerError::Other(Box::new(e)))?;
        }
        out.flush()
            .await
            .map_err(|e| HandlerError::Other(Box::new(e)))
    }
}

/// Load the input file into the in-process stream, one record per non-empty line
async fn produce(stream: &MemoryStream, path: &Path) -> Result<usize, AppError> {
    let content = tokio::fs::read_to_string(path).await?;
    let mut count = 0;
    for (i, line) in content.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        stream.put_record(line.to_string(), &i.to_string())?;
        count += 1;
    }
    Ok(count)
}

/// Main application logic - seeds the stream and consumes it until shutdown
async fn run_consumer(shutdown: CancellationToken) -> Result<(), AppError> {
    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;
    let config = ConsumerConfig::from_env()?;

    let stream = Arc::new(MemoryStream::new(&config.stream_name, args.partitions));
    let produced = produce(&stream, &args.records).await?;
    info!(records = produced, partitions = args.partitions, "stream seeded");

    let checkpoints = Arc::new(
        FileCheckpoint::open(&args.checkpoints, &config.app_name, &config.stream_name).await?,
    );

    let handler = StdoutHandler {
        out: Mutex::new(BufWriter::new(tokio::io::stdout())),
    };

    let handle = StreamConsumer::new(config, stream, checkpoints)
        .start_with_shutdown(handler, shutdown.clone())
        .await?;

    // Workers only return on shutdown or after exhausting their retries
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if handle.is_finished() {
                    break;
                }
            }
        }
    }

    let results = handle.join().await;
    for report in results.reports() {
        info!(
            partition = %report.partition,
            batches = report.batches_flushed,
            records = report.records_processed,
            checkpoint = ?report.last_checkpoint,
            "worker finished"
        );
    }

    match results.worker_results.into_iter().find_map(Result::err) {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_applies_defaults() {
        let parsed = parse_args(&args(&["connector", "users.txt"])).unwrap();
        assert_eq!(parsed.records, PathBuf::from("users.txt"));
        assert_eq!(parsed.checkpoints, PathBuf::from(DEFAULT_CHECKPOINT_FILE));
        assert_eq!(parsed.partitions, DEFAULT_PARTITIONS);
    }

    #[test]
    fn parse_args_reads_all_positions() {
        let parsed = parse_args(&args(&["connector", "in.txt", "cp.json", "4"])).unwrap();
        assert_eq!(parsed.checkpoints, PathBuf::from("cp.json"));
        assert_eq!(parsed.partitions, 4);
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&["connector"])).is_err());
        assert!(parse_args(&args(&["connector", "in.txt", "cp.json", "0"])).is_err());
        assert!(parse_args(&args(&["connector", "in.txt", "cp.json", "x"])).is_err());
    }
}
