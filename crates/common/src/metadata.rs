//! Ballot metadata embedded as base64 JSON
//!
//! Ballots carry their descriptive JSON inline as a
//! `data:application/json;base64,` URI, sometimes wrapped behind the
//! backend's metadata host. Decoding never fails loudly: anything that does
//! not decode is logged and reported as `None`, and callers fall back to
//! placeholder display.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use crate::gateway::IPFS_SCHEME;

pub const DATA_URI_PREFIX: &str = "data:application/json;base64,";

const DEFAULT_NAME: &str = "Ballot";
const SYNTHESIZED_DESCRIPTION: &str = "Ballot media stored on IPFS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Six hex digits, no leading `#`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
}

impl DecodedMetadata {
    fn validated(mut self) -> Self {
        self.background_color = self.background_color.take().and_then(|color| {
            let trimmed = color.trim_start_matches('#');
            if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
                Some(trimmed.to_string())
            } else {
                tracing::warn!(color = %color, "dropping invalid background_color");
                None
            }
        });
        self
    }
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "attribute value must be a scalar, got {}",
            other
        ))),
    }
}

/// Render `metadata` as the data URI that [`MetadataDecoder::decode`] accepts.
pub fn encode(metadata: &DecodedMetadata) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(metadata)?;
    Ok(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(json)))
}

#[derive(Debug, Clone, Default)]
pub struct MetadataDecoder {
    /// Backend URL prefixes that may wrap a data URI
    host_prefixes: Vec<String>,
}

impl MetadataDecoder {
    pub fn new<I, S>(host_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host_prefixes: host_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn decode(&self, uri: &str) -> Option<DecodedMetadata> {
        self.decode_with_name(uri, DEFAULT_NAME)
    }

    /// Decode `uri`; `name` is used when a bare IPFS reference has to be
    ///  turned into a minimal record.
    pub fn decode_with_name(&self, uri: &str, name: &str) -> Option<DecodedMetadata> {
        let uri = uri.trim();
        if uri.is_empty() {
            return None;
        }

        if let Some(payload) = uri.strip_prefix(DATA_URI_PREFIX) {
            return decode_payload(payload);
        }

        if let Some(payload) = self
            .strip_host(uri)
            .and_then(|nested| nested.strip_prefix(DATA_URI_PREFIX))
        {
            return decode_payload(payload);
        }

        if looks_like_base64(uri) {
            if let Some(metadata) = decode_payload(uri) {
                return Some(metadata);
            }
        }

        if uri.starts_with(IPFS_SCHEME) {
            return Some(DecodedMetadata {
                name: name.to_string(),
                description: SYNTHESIZED_DESCRIPTION.to_string(),
                image: uri.to_string(),
                ..Default::default()
            });
        }

        tracing::debug!(uri, "no metadata payload found");
        None
    }

    fn strip_host<'a>(&self, uri: &'a str) -> Option<&'a str> {
        self.host_prefixes
            .iter()
            .find(|prefix| uri.starts_with(prefix.as_str()))
            .map(|prefix| &uri[prefix.len()..])
    }
}

/// Line breaks are allowed so MIME-wrapped blobs qualify.
fn looks_like_base64(candidate: &str) -> bool {
    let mut significant = 0;
    for b in candidate.bytes() {
        if b.is_ascii_whitespace() {
            continue;
        }
        if !(b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')) {
            return false;
        }
        significant += 1;
    }
    significant >= 4
}

fn decode_payload(payload: &str) -> Option<DecodedMetadata> {
    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = match STANDARD
        .decode(&payload)
        .or_else(|_| STANDARD_NO_PAD.decode(&payload))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "metadata payload is not base64");
            return None;
        }
    };

    match serde_json::from_slice::<DecodedMetadata>(&bytes) {
        Ok(metadata) => Some(metadata.validated()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse metadata json");
            None
        }
    }
}
