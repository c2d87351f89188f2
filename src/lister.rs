//! Paginates object listings under each configured prefix and feeds
//! `WorkItem`s to the scan workers.
//!
//! Only one `Lister` runs per process. It owns the sending half of the work
//! channel; when it returns, that sender is dropped, closing the channel
//! for every worker still receiving from it (see DESIGN.md for why this
//! replaces the put-back-a-sentinel scheme).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, warn};

use crate::early_stop::EarlyStop;
use crate::error::ScanError;
use crate::events::{ScanEvent, WorkItem};
use crate::prefix::PrefixUri;

pub struct Lister {
    client: aws_sdk_s3::Client,
    prefixes: Vec<PrefixUri>,
    work_tx: async_channel::Sender<WorkItem>,
    event_tx: tokio::sync::mpsc::Sender<ScanEvent>,
    early_stop: EarlyStop,
    discovered: Arc<AtomicU64>,
}

impl Lister {
    pub fn new(
        client: aws_sdk_s3::Client,
        prefixes: Vec<PrefixUri>,
        work_tx: async_channel::Sender<WorkItem>,
        event_tx: tokio::sync::mpsc::Sender<ScanEvent>,
        early_stop: EarlyStop,
        discovered: Arc<AtomicU64>,
    ) -> Self {
        Self {
            client,
            prefixes,
            work_tx,
            event_tx,
            early_stop,
            discovered,
        }
    }

    pub async fn run(self) {
        for prefix in self.prefixes.clone() {
            if self.early_stop.is_set() {
                return;
            }
            if let Err(err) = self.list_prefix(&prefix).await {
                error!(bucket = %prefix.bucket, prefix = %prefix.key_prefix, %err, "listing failed");
                let _ = self
                    .event_tx
                    .send(ScanEvent::Error {
                        error: ScanError::Listing(err),
                        fatal: true,
                        s3_path: None,
                    })
                    .await;
                self.early_stop.trigger();
                return;
            }
        }
    }

    async fn list_prefix(&self, prefix: &PrefixUri) -> anyhow::Result<()> {
        let mut continuation_token: Option<String> = None;
        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&prefix.bucket)
                .prefix(&prefix.key_prefix)
                .set_continuation_token(continuation_token.clone())
                .send()
                .await?;

            for object in output.contents() {
                // Zero-byte objects are skipped: the remote record-scan
                // primitive errors on them, and they carry no records.
                if object.size().unwrap_or(0) == 0 {
                    continue;
                }
                let Some(key) = object.key() else { continue };

                self.discovered.fetch_add(1, Ordering::SeqCst);
                let item = WorkItem {
                    bucket: prefix.bucket.clone(),
                    key: key.to_string(),
                };
                if self.work_tx.send(item).await.is_err() {
                    // Every worker has gone away (shouldn't normally happen
                    // before EarlyStop, but is not itself an error).
                    warn!("work queue has no receivers left; stopping listing early");
                    return Ok(());
                }
            }

            continuation_token = output.next_continuation_token().map(str::to_string);
            if !output.is_truncated().unwrap_or(false) || continuation_token.is_none() {
                return Ok(());
            }
            if self.early_stop.is_set() {
                return Ok(());
            }
        }
    }
}
