//! `sample-metadata:` comment blocks
//!
//! ```text
//! # sample-metadata:
//! #   title: Activate HMAC SA Key.
//! #   usage: node hmacKeyActivate.js <hmacKeyAccessId>
//! ```
//!
//! Only `#` and `//` line comments are recognised. The block ends at the first
//! empty line or the first line that does not start with the same comment
//! marker.

use crate::error::ExtractionError;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#|//) sample-metadata:$").expect("valid sample-metadata regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleMetadata {
    #[serde(rename = "sample-metadata", default, deserialize_with = "null_as_default")]
    pub meta: SampleMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippets: Vec<SnippetMetaRef>,
}

/// Per-tag override of the file-wide description and usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SnippetMetaRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub region_tag: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Find and parse the metadata block in `content`.
///
/// Returns `Ok(None)` when the file has no block; malformed YAML is an error.
pub fn parse_sample_metadata(content: &str) -> Result<Option<SampleMetadata>, ExtractionError> {
    let mut marker: Option<&str> = None;
    let mut yaml = String::new();

    for line in content.lines() {
        if marker.is_none() {
            marker = BLOCK_START
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str());
        }

        if let Some(marker) = marker {
            if line.is_empty() || !line.starts_with(marker) {
                break;
            }
            yaml.push_str(&line.replacen(marker, "", 1));
            yaml.push('\n');
        }
    }

    if marker.is_none() {
        return Ok(None);
    }

    let metadata: Option<SampleMetadata> = serde_yaml::from_str(&yaml)?;
    Ok(Some(metadata.unwrap_or_default()))
}
