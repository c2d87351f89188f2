//! The plain-text progress line and cost estimate written to stderr in
//! verbose mode. Kept separate from the structured `tracing` logging in
//! `logging.rs`: this output's exact byte-for-byte shape is part of the
//! external contract, not an operational log.

use std::io::Write;

pub const CLEAR_LINE: &str = "\r\x1b[K";

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 10u64.pow(3) {
        format!("{bytes} B")
    } else if bytes < 10u64.pow(6) {
        format!("{} KB", bytes / 10u64.pow(3))
    } else if bytes < 10u64.pow(9) {
        format!("{} MB", bytes / 10u64.pow(6))
    } else {
        format!("{} GB", bytes / 10u64.pow(9))
    }
}

pub fn render_status_line(
    out: &mut impl Write,
    files_processed: u64,
    total_files: u64,
    records_matched: u64,
    bytes_scanned: u64,
) {
    let _ = write!(
        out,
        "{CLEAR_LINE}Files processed: {files_processed}/{total_files}  Records matched: {records_matched}  Bytes scanned: {}",
        format_bytes(bytes_scanned)
    );
}

pub struct CostEstimate {
    pub scan_cost: f64,
    pub return_cost: f64,
    pub request_cost: f64,
    pub total: f64,
}

impl CostEstimate {
    pub fn compute(bytes_scanned: u64, bytes_returned: u64, total_files: u64) -> Self {
        let scan_cost = 0.002 * bytes_scanned as f64 / 2f64.powi(30);
        let return_cost = 0.0007 * bytes_returned as f64 / 2f64.powi(30);
        let request_cost = 0.0004 * total_files as f64 / 1000.0;
        Self {
            scan_cost,
            return_cost,
            request_cost,
            total: scan_cost + return_cost + request_cost,
        }
    }

    pub fn print(&self, out: &mut impl Write) {
        let _ = writeln!(out, "\nCost for data scanned: ${:.2}", self.scan_cost);
        let _ = writeln!(out, "Cost for data returned: ${:.2}", self.return_cost);
        let _ = writeln!(out, "Cost for SELECT requests: ${:.2}", self.request_cost);
        let _ = writeln!(out, "Total cost: ${:.2}", self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(5_000), "5 KB");
        assert_eq!(format_bytes(5_000_000), "5 MB");
        assert_eq!(format_bytes(5_000_000_000), "5 GB");
    }

    #[test]
    fn status_line_uses_clear_line_prefix() {
        let mut buf = Vec::new();
        render_status_line(&mut buf, 1, 2, 3, 4096);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(CLEAR_LINE));
        assert!(text.contains("Files processed: 1/2"));
        assert!(text.contains("Records matched: 3"));
    }

    #[test]
    fn cost_estimate_matches_formula() {
        let est = CostEstimate::compute(1024 * 1024 * 1024, 1024 * 1024 * 1024, 1000);
        assert!((est.scan_cost - 0.002).abs() < 1e-9);
        assert!((est.return_cost - 0.0007).abs() < 1e-9);
        assert!((est.request_cost - 0.0004).abs() < 1e-9);
        assert!((est.total - (0.002 + 0.0007 + 0.0004)).abs() < 1e-9);
    }
}
