//! Parses a `scheme://bucket/key-prefix` positional argument into its
//! bucket and key-prefix parts.

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixUri {
    pub bucket: String,
    pub key_prefix: String,
}

impl PrefixUri {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(raw).with_context(|| format!("invalid prefix URI '{raw}'"))?;
        let bucket = url
            .host_str()
            .with_context(|| format!("prefix URI '{raw}' has no bucket"))?
            .to_string();
        let key_prefix = url.path().trim_start_matches('/').to_string();
        Ok(Self { bucket, key_prefix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_prefix() {
        let p = PrefixUri::parse("s3://my-bucket/some/prefix").unwrap();
        assert_eq!(p.bucket, "my-bucket");
        assert_eq!(p.key_prefix, "some/prefix");
    }

    #[test]
    fn parses_bucket_with_no_prefix() {
        let p = PrefixUri::parse("s3://my-bucket").unwrap();
        assert_eq!(p.bucket, "my-bucket");
        assert_eq!(p.key_prefix, "");
    }

    #[test]
    fn rejects_schemeless_input() {
        assert!(PrefixUri::parse("my-bucket/prefix").is_err());
    }
}
