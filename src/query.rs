//! The immutable query configuration built once per run, and the
//! translation from it to the remote service's SQL expression and
//! input/output serialization descriptors.

use aws_sdk_s3::types::{
    CompressionType, CsvInput, CsvOutput, FileHeaderInfo, InputSerialization, JsonInput,
    JsonOutput, JsonType, OutputSerialization,
};

#[derive(Debug, Clone)]
pub enum Projection {
    Star,
    Fields(String),
    Count,
}

#[derive(Debug, Clone)]
pub enum RecordFormat {
    Json,
    Csv {
        field_delimiter: String,
        record_delimiter: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// GZIP is inferred from a case-insensitive `.gz` suffix on the key; it
    /// is never configured explicitly.
    pub fn for_key(key: &str) -> Self {
        if key.to_ascii_lowercase().ends_with(".gz") {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    pub projection: Projection,
    pub where_clause: Option<String>,
    pub limit: u64,
    pub format: RecordFormat,
    pub max_retries: u32,
}

impl Query {
    pub fn is_counting(&self) -> bool {
        matches!(self.projection, Projection::Count)
    }

    /// `SELECT <projection> FROM s3object s [WHERE <predicate>] [LIMIT <n>]`
    pub fn build_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        match &self.projection {
            Projection::Count => sql.push_str("count(*) "),
            Projection::Fields(fields) => {
                sql.push_str(fields);
                sql.push(' ');
            }
            Projection::Star => sql.push_str("* "),
        }
        sql.push_str("FROM s3object s");
        if let Some(predicate) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        if self.limit > 0 {
            sql.push_str(" LIMIT ");
            sql.push_str(&self.limit.to_string());
        }
        sql
    }

    /// The delimiter used to split `Records` frame payloads into whole
    /// records: newline for JSON, the configured record delimiter for CSV.
    pub fn record_delimiter(&self) -> &str {
        match &self.format {
            RecordFormat::Json => "\n",
            RecordFormat::Csv { record_delimiter, .. } => record_delimiter.as_str(),
        }
    }

    pub fn input_serialization(&self, compression: Compression) -> InputSerialization {
        let builder = match &self.format {
            RecordFormat::Json => {
                InputSerialization::builder().json(JsonInput::builder().r#type(JsonType::Document).build())
            }
            RecordFormat::Csv {
                field_delimiter,
                record_delimiter,
            } => InputSerialization::builder().csv(
                CsvInput::builder()
                    .field_delimiter(field_delimiter.clone())
                    .record_delimiter(record_delimiter.clone())
                    .file_header_info(FileHeaderInfo::None)
                    .quote_character("")
                    .build(),
            ),
        };
        let builder = match compression {
            Compression::Gzip => builder.compression_type(CompressionType::Gzip),
            Compression::None => builder,
        };
        builder.build()
    }

    /// When counting, output is always CSV with a single-space field
    /// delimiter, so the aggregator sees one decimal integer per record
    /// fragment regardless of the input format.
    pub fn output_serialization(&self) -> OutputSerialization {
        if self.is_counting() {
            return OutputSerialization::builder()
                .csv(CsvOutput::builder().field_delimiter(" ").build())
                .build();
        }
        match &self.format {
            RecordFormat::Json => {
                OutputSerialization::builder().json(JsonOutput::builder().build()).build()
            }
            RecordFormat::Csv {
                field_delimiter,
                record_delimiter,
            } => OutputSerialization::builder()
                .csv(
                    CsvOutput::builder()
                        .field_delimiter(field_delimiter.clone())
                        .record_delimiter(record_delimiter.clone())
                        .build(),
                )
                .build(),
        }
    }
}
