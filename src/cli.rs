//! Command-line surface. Translates flags into a `RunConfig` the engine in
//! `lib.rs` drives directly.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use crate::prefix::PrefixUri;
use crate::query::{Projection, Query, RecordFormat};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an S3-select query across every object beneath one or more prefixes")]
pub struct Cli {
    /// S3 prefix (or more) beneath which all objects are queried.
    #[arg(required = true)]
    pub prefixes: Vec<String>,

    #[arg(short = 'w', long = "where")]
    pub where_clause: Option<String>,

    #[arg(short = 'd', long = "field_delimiter")]
    pub field_delimiter: Option<String>,

    #[arg(short = 'D', long = "record_delimiter")]
    pub record_delimiter: Option<String>,

    #[arg(short = 'l', long = "limit", default_value_t = 0)]
    pub limit: u64,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[arg(short = 'c', long = "count")]
    pub count: bool,

    #[arg(short = 'H', long = "with_filename")]
    pub with_filename: bool,

    #[arg(short = 'o', long = "output_fields")]
    pub output_fields: Option<String>,

    #[arg(short = 't', long = "thread_count", default_value_t = 150)]
    pub thread_count: usize,

    #[arg(long = "profile")]
    pub profile: Option<String>,

    #[arg(short = 'M', long = "max_retries", default_value_t = 20)]
    pub max_retries: u32,

    #[arg(short = 'e', long = "estimate_cost")]
    pub estimate_cost: bool,

    #[arg(short = 'T', long = "queue_timeout", default_value_t = 10)]
    pub queue_timeout: u64,
}

/// Everything the engine needs, derived once from `Cli` and never mutated
/// again.
pub struct RunConfig {
    pub prefixes: Vec<PrefixUri>,
    pub query: Query,
    pub verbose: bool,
    pub with_filename: bool,
    pub thread_count: usize,
    pub profile: Option<String>,
    pub estimate_cost: bool,
    pub queue_timeout: Duration,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        anyhow::ensure!(self.thread_count > 0, "thread_count must be at least 1");

        let prefixes = self
            .prefixes
            .iter()
            .map(|p| PrefixUri::parse(p))
            .collect::<anyhow::Result<Vec<_>>>()
            .context("parsing prefix arguments")?;

        // Specifying `\t` from a shell is awkward with all its escaping, so
        // the literal two-character sequence is translated to an actual tab.
        let field_delimiter = self.field_delimiter.map(|d| untabify(&d));
        let record_delimiter = self.record_delimiter.map(|d| untabify(&d));

        let format = if field_delimiter.is_some() || record_delimiter.is_some() {
            RecordFormat::Csv {
                field_delimiter: field_delimiter.unwrap_or_else(|| ",".to_string()),
                record_delimiter: record_delimiter.unwrap_or_else(|| "\n".to_string()),
            }
        } else {
            RecordFormat::Json
        };

        let projection = if self.count {
            Projection::Count
        } else if let Some(fields) = self.output_fields {
            Projection::Fields(fields)
        } else {
            Projection::Star
        };

        let query = Query {
            projection,
            where_clause: self.where_clause,
            limit: self.limit,
            format,
            max_retries: self.max_retries,
        };

        Ok(RunConfig {
            prefixes,
            query,
            verbose: self.verbose,
            with_filename: self.with_filename,
            thread_count: self.thread_count,
            profile: self.profile,
            estimate_cost: self.estimate_cost,
            queue_timeout: Duration::from_secs(self.queue_timeout),
        })
    }
}

fn untabify(delimiter: &str) -> String {
    delimiter.replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from(["s3select", "s3://bucket/prefix"]);
        assert_eq!(cli.prefixes, vec!["s3://bucket/prefix".to_string()]);
        assert_eq!(cli.limit, 0);
        assert_eq!(cli.thread_count, 150);
        assert_eq!(cli.max_retries, 20);
        assert_eq!(cli.queue_timeout, 10);
        assert!(!cli.verbose);
    }

    #[test]
    fn backslash_t_becomes_tab() {
        assert_eq!(untabify("\\t"), "\t");
        assert_eq!(untabify(","), ",");
    }

    #[test]
    fn csv_is_selected_when_any_delimiter_flag_is_present() {
        let cli = Cli::parse_from(["s3select", "-d", "\\t", "s3://bucket/prefix"]);
        let config = cli.into_config().unwrap();
        match config.query.format {
            RecordFormat::Csv {
                field_delimiter,
                record_delimiter,
            } => {
                assert_eq!(field_delimiter, "\t");
                assert_eq!(record_delimiter, "\n");
            }
            RecordFormat::Json => panic!("expected CSV format"),
        }
    }

    #[test]
    fn count_flag_overrides_output_fields_for_projection() {
        let cli = Cli::parse_from(["s3select", "-c", "-o", "a,b", "s3://bucket/prefix"]);
        let config = cli.into_config().unwrap();
        assert!(config.query.is_counting());
    }

    #[test]
    fn defaults_to_json_and_star_projection() {
        let cli = Cli::parse_from(["s3select", "s3://bucket/prefix"]);
        let config = cli.into_config().unwrap();
        assert!(matches!(config.query.format, RecordFormat::Json));
        assert!(matches!(config.query.projection, Projection::Star));
    }
}
