//! Consumes `WorkItem`s and issues one `select_object_content` call per
//! key, translating the remote framed event stream into `ScanEvent`s.

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::types::{ExpressionType, SelectObjectContentEventStream};

use crate::decode::RecordDecoder;
use crate::early_stop::EarlyStop;
use crate::error::ScanError;
use crate::events::{ScanEvent, WorkItem};
use crate::query::{Compression, Query};

const RETRY_DELAY: Duration = Duration::from_millis(400);

pub struct ScanWorker {
    client: aws_sdk_s3::Client,
    work_rx: async_channel::Receiver<WorkItem>,
    event_tx: tokio::sync::mpsc::Sender<ScanEvent>,
    query: Arc<Query>,
    early_stop: EarlyStop,
}

impl ScanWorker {
    pub fn new(
        client: aws_sdk_s3::Client,
        work_rx: async_channel::Receiver<WorkItem>,
        event_tx: tokio::sync::mpsc::Sender<ScanEvent>,
        query: Arc<Query>,
        early_stop: EarlyStop,
    ) -> Self {
        Self {
            client,
            work_rx,
            event_tx,
            query,
            early_stop,
        }
    }

    pub async fn run(self) {
        loop {
            if self.early_stop.is_set() {
                break;
            }
            let item = match self.work_rx.recv().await {
                Ok(item) => item,
                // Lister dropped its sender: no more work will ever arrive.
                Err(_closed) => break,
            };
            if self.early_stop.is_set() {
                break;
            }
            self.scan_one(item).await;
        }
        let _ = self.event_tx.send(ScanEvent::WorkerExit).await;
    }

    async fn scan_one(&self, item: WorkItem) {
        let s3_path = item.s3_path();
        let compression = Compression::for_key(&item.key);
        let sql = self.query.build_sql();

        let mut attempts = 0u32;
        let output = loop {
            attempts += 1;
            let request = self
                .client
                .select_object_content()
                .bucket(&item.bucket)
                .key(&item.key)
                .expression_type(ExpressionType::Sql)
                .expression(&sql)
                .input_serialization(self.query.input_serialization(compression))
                .output_serialization(self.query.output_serialization());

            match request.send().await {
                Ok(output) => break output,
                Err(err) => {
                    let exhausted = attempts >= self.query.max_retries.max(1);
                    let scan_error = if exhausted {
                        ScanError::RetriesExhausted {
                            attempts,
                            source: err.into(),
                        }
                    } else {
                        ScanError::Request(err.into())
                    };
                    let fatal = scan_error.is_fatal();
                    let _ = self
                        .event_tx
                        .send(ScanEvent::Error {
                            error: scan_error,
                            fatal,
                            s3_path: Some(s3_path.clone()),
                        })
                        .await;
                    if fatal {
                        // Per-key retry budget exhausted; abandon this key.
                        return;
                    }
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        };

        self.drain_event_stream(output, s3_path).await;
    }

    async fn drain_event_stream(
        &self,
        output: aws_sdk_s3::operation::select_object_content::SelectObjectContentOutput,
        s3_path: String,
    ) {
        let mut decoder = RecordDecoder::new(self.query.record_delimiter().to_string());
        let mut end_received = false;
        let mut stream = output.payload;

        loop {
            if self.early_stop.is_set() {
                return;
            }
            match stream.recv().await {
                Ok(Some(SelectObjectContentEventStream::Records(records_event))) => {
                    if let Some(payload) = records_event.payload() {
                        let records = decoder.push(payload.as_ref());
                        if !records.is_empty() {
                            let _ = self
                                .event_tx
                                .send(ScanEvent::Records {
                                    records,
                                    s3_path: s3_path.clone(),
                                })
                                .await;
                        }
                    }
                }
                Ok(Some(SelectObjectContentEventStream::Stats(stats_event))) => {
                    if let Some(details) = stats_event.details() {
                        let _ = self
                            .event_tx
                            .send(ScanEvent::Stats {
                                bytes_scanned: details.bytes_scanned().unwrap_or(0),
                                bytes_returned: details.bytes_returned().unwrap_or(0),
                            })
                            .await;
                    }
                }
                Ok(Some(SelectObjectContentEventStream::End(_))) => {
                    end_received = true;
                }
                // Continuation keep-alives and progress frames are part of
                // the wire protocol but carry nothing this engine surfaces.
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) => {
                    let _ = self
                        .event_tx
                        .send(ScanEvent::Error {
                            error: ScanError::EventStream(anyhow::anyhow!(err.to_string())),
                            fatal: true,
                            s3_path: Some(s3_path.clone()),
                        })
                        .await;
                    return;
                }
            }
        }

        if end_received {
            let _ = self.event_tx.send(ScanEvent::FileDone { s3_path }).await;
        } else {
            let _ = self
                .event_tx
                .send(ScanEvent::Error {
                    error: ScanError::MissingEndMarker,
                    fatal: true,
                    s3_path: Some(s3_path),
                })
                .await;
        }
    }
}
