//! The two message types that flow through the pipeline: `WorkItem` from the
//! lister to the scan workers, and `ScanEvent` from the scan workers to the
//! aggregator.

use crate::error::ScanError;

/// One object discovered by the lister, queued for a scan worker to pick up.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub bucket: String,
    pub key: String,
}

impl WorkItem {
    pub fn s3_path(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// An event a scan worker reports back to the aggregator.
///
/// Kept as an explicit sum type (rather than a struct with optional fields,
/// which was how the original prototype's event object was shaped) so every
/// consumer match is exhaustive.
#[derive(Debug)]
pub enum ScanEvent {
    /// Zero or more fully delimiter-terminated records decoded from one or
    /// more `Records` frames.
    Records { records: Vec<String>, s3_path: String },
    /// Remote-reported byte counters for one object.
    Stats { bytes_scanned: i64, bytes_returned: i64 },
    /// A failure. `fatal` mirrors `error.is_fatal()` at the time it was
    /// raised; `s3_path` is `None` only for listing failures, which are not
    /// scoped to a single key.
    Error {
        error: ScanError,
        fatal: bool,
        s3_path: Option<String>,
    },
    /// The remote "End" marker was observed for this key's response stream.
    FileDone { s3_path: String },
    /// A worker has drained its input (or observed `EarlyStop`) and is
    /// leaving. Used by the aggregator to recognize when every worker has
    /// exited.
    WorkerExit,
}
