//! Typed errors for the scan engine.
//!
//! The original prototype this engine is modelled on threaded a bare
//! exception plus a `max_retries_reached` boolean through its event queue.
//! Here the fatal/non-fatal distinction is a property of the error type
//! itself, so the aggregator never has to re-derive it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("listing objects failed: {0}")]
    Listing(#[source] anyhow::Error),

    #[error("select_object_content request failed: {0}")]
    Request(#[source] anyhow::Error),

    #[error("select_object_content failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("End event not received; data corrupted; please retry")]
    MissingEndMarker,

    #[error("error reading event stream: {0}")]
    EventStream(#[source] anyhow::Error),
}

impl ScanError {
    /// Whether this error exhausts the per-key retry budget (or otherwise
    /// can never be recovered from within this run) and must therefore end
    /// the whole process.
    pub fn is_fatal(&self) -> bool {
        match self {
            ScanError::Listing(_) => true,
            ScanError::Request(_) => false,
            ScanError::RetriesExhausted { .. } => true,
            ScanError::MissingEndMarker => true,
            ScanError::EventStream(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_matches_kind() {
        assert!(!ScanError::Request(anyhow::anyhow!("boom")).is_fatal());
        assert!(ScanError::MissingEndMarker.is_fatal());
        assert!(ScanError::Listing(anyhow::anyhow!("boom")).is_fatal());
        assert!(ScanError::RetriesExhausted {
            attempts: 3,
            source: anyhow::anyhow!("boom")
        }
        .is_fatal());
    }
}
