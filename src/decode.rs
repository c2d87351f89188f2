//! Reassembles whole records out of the arbitrarily-chunked byte payloads
//! carried by `Records` frames.
//!
//! A single remote record can straddle two frames (or more, for a very long
//! row), so the decoder keeps the trailing partial fragment from one push
//! and prepends it to the next. It is owned by a scan worker for the
//! lifetime of exactly one object's response stream, then discarded.

pub struct RecordDecoder {
    delimiter: String,
    carry_over: String,
}

impl RecordDecoder {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            carry_over: String::new(),
        }
    }

    /// Feeds one frame's payload in, returning every fully terminated
    /// record contained in `carry_over + payload`. The new trailing partial
    /// fragment (possibly empty) becomes the carry-over for the next push.
    pub fn push(&mut self, payload: &[u8]) -> Vec<String> {
        let mut combined = std::mem::take(&mut self.carry_over);
        combined.push_str(&String::from_utf8_lossy(payload));

        let mut parts: Vec<String> = combined
            .split(self.delimiter.as_str())
            .map(str::to_string)
            .collect();
        self.carry_over = parts.pop().unwrap_or_default();
        parts
    }
}
