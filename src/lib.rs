//! `s3select` runs a single SQL-like projection/filter against every object
//! beneath one or more object-storage prefixes, using the storage service's
//! server-side record-scan primitive, and streams matched records to
//! stdout.
//!
//! The pipeline is: [`lister::Lister`] discovers keys and feeds a bounded
//! work queue; a pool of [`worker::ScanWorker`]s drain it, each issuing one
//! remote select call per key and decoding its framed response; and
//! [`aggregator::ResultAggregator`] drains the resulting event queue,
//! applies output policy, and enforces the result limit via
//! [`early_stop::EarlyStop`].

pub mod aggregator;
pub mod cli;
pub mod decode;
pub mod early_stop;
pub mod error;
pub mod events;
pub mod lister;
pub mod logging;
pub mod prefix;
pub mod query;
pub mod status;
pub mod worker;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::info;

use crate::aggregator::{ResultAggregator, RunSummary};
use crate::cli::{Cli, RunConfig};
use crate::early_stop::EarlyStop;
use crate::lister::Lister;
use crate::worker::ScanWorker;

/// Queue capacity for both the work queue and the event queue.
const QUEUE_CAPACITY: usize = 20_000;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    let summary = run_with_config(config).await?;
    info!(
        files_processed = summary.files_processed,
        records_matched = summary.records_matched,
        bytes_scanned = summary.bytes_scanned,
        bytes_returned = summary.bytes_returned,
        "run complete"
    );
    Ok(())
}

async fn run_with_config(config: RunConfig) -> anyhow::Result<RunSummary> {
    let client = build_client(config.profile.as_deref()).await;

    let query = Arc::new(config.query);
    let early_stop = EarlyStop::new();
    let discovered = Arc::new(AtomicU64::new(0));

    let (work_tx, work_rx) = async_channel::bounded(QUEUE_CAPACITY);
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(QUEUE_CAPACITY);

    // One lister, the rest of the thread budget is scan workers.
    let worker_count = config.thread_count.saturating_sub(1).max(1);

    let mut tasks = JoinSet::new();

    let lister = Lister::new(
        client.clone(),
        config.prefixes,
        work_tx,
        event_tx.clone(),
        early_stop.clone(),
        discovered.clone(),
    );
    tasks.spawn(lister.run());

    for _ in 0..worker_count {
        let worker = ScanWorker::new(
            client.clone(),
            work_rx.clone(),
            event_tx.clone(),
            query.clone(),
            early_stop.clone(),
        );
        tasks.spawn(worker.run());
    }
    // Drop our own clone so the event channel closes once every worker and
    // the lister have finished, rather than waiting on this handle too.
    drop(event_tx);

    let aggregator = ResultAggregator::new(
        event_rx,
        query,
        worker_count,
        config.verbose,
        config.with_filename,
        config.estimate_cost,
        config.queue_timeout,
        early_stop,
        discovered,
    );

    let result = aggregator.run().await;

    // Whether the aggregator finished cleanly or bailed out (limit reached,
    // timeout, or fatal error), any lister/worker tasks still running are no
    // longer useful; JoinSet aborts them on drop.
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}

    result
}

async fn build_client(profile: Option<&str>) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::v2024_03_28());
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;
    aws_sdk_s3::Client::new(&sdk_config)
}
