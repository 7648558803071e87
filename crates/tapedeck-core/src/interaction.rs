//! Cassette data model
//!
//! The on-disk layout is the version 2 VCR cassette format, so cassettes
//! recorded by other VCR tooling load unchanged.

use crate::duration;
use crate::error::{Error, Result};
use crate::headers::Headers;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

pub const CASSETTE_VERSION: u32 = 2;

fn default_version() -> u32 {
    CASSETTE_VERSION
}

/// Raw body bytes
///
/// Bodies are written to YAML as text. Captured bodies may briefly hold
/// compressed bytes until sanitization decodes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body(v)
    }
}

impl From<&[u8]> for Body {
    fn from(v: &[u8]) -> Self {
        Body(v.to_vec())
    }
}

impl From<String> for Body {
    fn from(v: String) -> Self {
        Body(v.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(v: &str) -> Self {
        Body(v.as_bytes().to_vec())
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(Body::from(text.unwrap_or_default()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    #[serde(default)]
    pub content_length: i64,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub body: Body,
    #[serde(default)]
    pub headers: Headers,
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResponse {
    #[serde(default)]
    pub content_length: i64,
    #[serde(default)]
    pub body: Body,
    #[serde(default)]
    pub headers: Headers,
    /// Status line text, e.g. `200 OK`
    #[serde(default)]
    pub status: String,
    pub code: u16,
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl RecordedResponse {
    /// Whether this response was captured from a server-sent event stream
    pub fn is_event_stream(&self) -> bool {
        self.headers
            .has_value_containing("Content-Type", "text/event-stream")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub id: usize,
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

/// A named, ordered list of interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cassette {
    /// Relative path of the cassette without the `.yaml` suffix
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: CASSETTE_VERSION,
            interactions: Vec::new(),
        }
    }

    pub fn from_yaml(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut cassette: Cassette =
            serde_yaml::from_str(text).map_err(|e| Error::InvalidCassette(e.to_string()))?;
        cassette.name = name.into();
        Ok(cassette)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::InvalidCassette(e.to_string()))
    }

    /// File name of this cassette relative to the cassettes directory
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.name)
    }

    /// Append an interaction, assigning the next id
    pub fn push(&mut self, mut interaction: Interaction) {
        interaction.id = self.interactions.len();
        self.interactions.push(interaction);
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}
