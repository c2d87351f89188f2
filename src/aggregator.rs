//! Single-consumer drain of the event queue: applies output policy, tracks
//! counters, and enforces the result `limit`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::early_stop::EarlyStop;
use crate::events::ScanEvent;
use crate::query::Query;
use crate::status::{self, CLEAR_LINE};

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub files_processed: u64,
    pub records_matched: u64,
    pub bytes_scanned: u64,
    pub bytes_returned: u64,
}

pub struct ResultAggregator {
    event_rx: tokio::sync::mpsc::Receiver<ScanEvent>,
    query: Arc<Query>,
    worker_count: usize,
    verbose: bool,
    with_filename: bool,
    estimate_cost: bool,
    queue_timeout: Duration,
    early_stop: EarlyStop,
    discovered: Arc<AtomicU64>,
}

impl ResultAggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_rx: tokio::sync::mpsc::Receiver<ScanEvent>,
        query: Arc<Query>,
        worker_count: usize,
        verbose: bool,
        with_filename: bool,
        estimate_cost: bool,
        queue_timeout: Duration,
        early_stop: EarlyStop,
        discovered: Arc<AtomicU64>,
    ) -> Self {
        Self {
            event_rx,
            query,
            worker_count,
            verbose,
            with_filename,
            estimate_cost,
            queue_timeout,
            early_stop,
            discovered,
        }
    }

    /// Drains events until every worker has exited and the queue is empty,
    /// an event carries a fatal error, or `queue_timeout` elapses with
    /// nothing arriving.
    pub async fn run(mut self) -> anyhow::Result<RunSummary> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut stderr = io::stderr();

        let mut summary = RunSummary::default();
        let mut exited_workers = 0usize;

        while exited_workers < self.worker_count {
            if self.early_stop.is_set() {
                break;
            }
            let event = match tokio::time::timeout(self.queue_timeout, self.event_rx.recv()).await
            {
                Ok(Some(event)) => event,
                // All senders dropped without every worker reporting exit;
                // treat as a clean end of stream.
                Ok(None) => break,
                Err(_elapsed) => {
                    anyhow::bail!(
                        "no progress for {:?}; aborting (queue_timeout exceeded)",
                        self.queue_timeout
                    );
                }
            };

            self.apply(event, &mut out, &mut summary, &mut exited_workers)?;

            if self.verbose {
                status::render_status_line(
                    &mut stderr,
                    summary.files_processed,
                    self.discovered.load(Ordering::SeqCst),
                    summary.records_matched,
                    summary.bytes_scanned,
                );
            }
        }

        if self.query.is_counting() {
            if self.verbose {
                let _ = write!(stderr, "{CLEAR_LINE}");
            }
            println!("{}", summary.records_matched);
        }

        if self.verbose {
            status::render_status_line(
                &mut stderr,
                summary.files_processed,
                self.discovered.load(Ordering::SeqCst),
                summary.records_matched,
                summary.bytes_scanned,
            );
            if self.estimate_cost {
                let estimate = status::CostEstimate::compute(
                    summary.bytes_scanned,
                    summary.bytes_returned,
                    self.discovered.load(Ordering::SeqCst),
                );
                estimate.print(&mut stderr);
            }
        }

        Ok(summary)
    }

    fn apply(
        &mut self,
        event: ScanEvent,
        out: &mut impl Write,
        summary: &mut RunSummary,
        exited_workers: &mut usize,
    ) -> anyhow::Result<()> {
        match event {
            ScanEvent::WorkerExit => {
                *exited_workers += 1;
            }
            ScanEvent::Stats {
                bytes_scanned,
                bytes_returned,
            } => {
                summary.bytes_scanned += bytes_scanned.max(0) as u64;
                summary.bytes_returned += bytes_returned.max(0) as u64;
            }
            ScanEvent::FileDone { .. } => {
                summary.files_processed += 1;
            }
            ScanEvent::Error {
                error,
                fatal,
                s3_path,
            } => {
                if fatal {
                    let where_ = s3_path.unwrap_or_else(|| "<listing>".to_string());
                    return Err(anyhow::Error::new(error).context(format!("fatal error for {where_}")));
                }
                if self.verbose {
                    eprintln!(
                        "{CLEAR_LINE}exception caught while processing {} (will retry). exception: {error}",
                        s3_path.as_deref().unwrap_or("<unknown>")
                    );
                } else {
                    warn!(%error, s3_path = s3_path.as_deref().unwrap_or("<unknown>"), "retrying after transient error");
                }
            }
            ScanEvent::Records { records, s3_path } => {
                for record in records {
                    if self.query.is_counting() {
                        summary.records_matched += record.trim().parse::<u64>().unwrap_or(0);
                        continue;
                    }

                    summary.records_matched += 1;
                    if self.verbose {
                        let _ = write!(io::stderr(), "{CLEAR_LINE}");
                    }
                    if self.with_filename {
                        writeln!(out, "{s3_path}\t{record}")?;
                    } else {
                        writeln!(out, "{record}")?;
                    }

                    if self.query.limit > 0 && summary.records_matched >= self.query.limit {
                        self.early_stop.trigger();
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Projection, RecordFormat};

    fn query(limit: u64, counting: bool) -> Arc<Query> {
        Arc::new(Query {
            projection: if counting { Projection::Count } else { Projection::Star },
            where_clause: None,
            limit,
            format: RecordFormat::Json,
            max_retries: 20,
        })
    }

    #[tokio::test]
    async fn stops_after_limit_even_mid_event() {
        // B4: limit = 3 across records delivered in one event batch.
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let early_stop = EarlyStop::new();
        let aggregator = ResultAggregator::new(
            rx,
            query(3, false),
            1,
            false,
            false,
            false,
            Duration::from_secs(5),
            early_stop.clone(),
            Arc::new(AtomicU64::new(0)),
        );

        tx.send(ScanEvent::Records {
            records: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            s3_path: "s3://b/k1".into(),
        })
        .await
        .unwrap();
        tx.send(ScanEvent::WorkerExit).await.unwrap();
        drop(tx);

        let summary = aggregator.run().await.unwrap();
        assert_eq!(summary.records_matched, 3);
        assert!(early_stop.is_set());
    }

    #[tokio::test]
    async fn stops_after_limit_even_across_events_already_queued() {
        // B4, cross-event race: a sibling worker's Records event was already
        // sitting in the bounded queue before EarlyStop was observed. The
        // outer drain loop must not process it once the limit-triggering
        // event before it has been applied.
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let early_stop = EarlyStop::new();
        let aggregator = ResultAggregator::new(
            rx,
            query(3, false),
            2,
            false,
            false,
            false,
            Duration::from_secs(5),
            early_stop.clone(),
            Arc::new(AtomicU64::new(0)),
        );

        tx.send(ScanEvent::Records {
            records: vec!["a".into(), "b".into(), "c".into()],
            s3_path: "s3://b/k1".into(),
        })
        .await
        .unwrap();
        // Queued before either worker could have observed EarlyStop.
        tx.send(ScanEvent::Records {
            records: vec!["x".into(), "y".into()],
            s3_path: "s3://b/k2".into(),
        })
        .await
        .unwrap();
        tx.send(ScanEvent::WorkerExit).await.unwrap();
        tx.send(ScanEvent::WorkerExit).await.unwrap();
        drop(tx);

        let summary = aggregator.run().await.unwrap();
        assert_eq!(summary.records_matched, 3);
        assert!(early_stop.is_set());
    }

    #[tokio::test]
    async fn counting_mode_sums_record_values() {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let aggregator = ResultAggregator::new(
            rx,
            query(0, true),
            1,
            false,
            false,
            false,
            Duration::from_secs(5),
            EarlyStop::new(),
            Arc::new(AtomicU64::new(0)),
        );

        tx.send(ScanEvent::Records {
            records: vec!["2".into()],
            s3_path: "s3://b/k1".into(),
        })
        .await
        .unwrap();
        tx.send(ScanEvent::Records {
            records: vec!["3".into()],
            s3_path: "s3://b/k2".into(),
        })
        .await
        .unwrap();
        tx.send(ScanEvent::WorkerExit).await.unwrap();
        drop(tx);

        let summary = aggregator.run().await.unwrap();
        assert_eq!(summary.records_matched, 5);
    }

    #[tokio::test]
    async fn fatal_error_propagates_as_run_error() {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let aggregator = ResultAggregator::new(
            rx,
            query(0, false),
            1,
            false,
            false,
            false,
            Duration::from_secs(5),
            EarlyStop::new(),
            Arc::new(AtomicU64::new(0)),
        );

        tx.send(ScanEvent::Error {
            error: crate::error::ScanError::MissingEndMarker,
            fatal: true,
            s3_path: Some("s3://b/k1".into()),
        })
        .await
        .unwrap();
        drop(tx);

        assert!(aggregator.run().await.is_err());
    }

    #[tokio::test]
    async fn dequeue_timeout_aborts_run() {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let aggregator = ResultAggregator::new(
            rx,
            query(0, false),
            1,
            false,
            false,
            false,
            Duration::from_millis(20),
            EarlyStop::new(),
            Arc::new(AtomicU64::new(0)),
        );
        // Keep the sender alive without sending anything, so recv() blocks
        // until the timeout fires rather than observing a closed channel.
        let _tx = tx;

        assert!(aggregator.run().await.is_err());
    }
}
