//! Header multimaps and the fixed header name sets
//!
//! Recorded headers keep the case they were captured with (canonical
//! `Title-Case` for live captures) so cassettes stay readable, but every
//! lookup is case-insensitive.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Header naming the cassette a request should be matched against
pub const CASSETTE_NAME_HEADER: &str = "X-Cassette-Name";

/// Header marking a response as produced by Tapedeck itself rather than upstream
pub const ERROR_MARKER_HEADER: &str = "X-Tapedeck-Error";

/// Prefix of every diagnostic body Tapedeck writes
pub const ERROR_TAG: &str = "Tapedeck Error: ";

static REQUEST_REDACTIONS: Lazy<HeaderSet> = Lazy::new(|| {
    HeaderSet::new([
        "Authorization",
        "Api-Key",
        "Cookie",
        "Openai-Organization",
        "Openai-Project",
    ])
});

static RESPONSE_REDACTIONS: Lazy<HeaderSet> =
    Lazy::new(|| HeaderSet::new(["Set-Cookie", "Openai-Organization", "Openai-Project"]));

static MATCH_IGNORED: Lazy<HeaderSet> = Lazy::new(|| {
    REQUEST_REDACTIONS
        .clone()
        .with([
            "b3",
            "traceparent",
            "tracestate",
            "x-b3-traceid",
            "x-b3-spanid",
            "x-b3-sampled",
            "x-b3-parentspanid",
            "x-b3-flags",
        ])
        .with([
            "host",
            "content-length",
            "connection",
            "transfer-encoding",
            CASSETTE_NAME_HEADER,
        ])
});

/// Canonicalize a header name the way it is written into cassettes
///
/// `content-type` becomes `Content-Type`, `x-b3-traceid` becomes `X-B3-Traceid`.
pub fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// An immutable, case-insensitive set of header names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(BTreeSet<String>);

impl HeaderSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Return a copy of this set extended with more names
    pub fn with<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0
            .extend(names.into_iter().map(|n| n.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Credential and session headers stripped from captured requests
    pub fn request_redactions() -> &'static HeaderSet {
        &REQUEST_REDACTIONS
    }

    /// Session and organization headers stripped from captured responses
    pub fn response_redactions() -> &'static HeaderSet {
        &RESPONSE_REDACTIONS
    }

    /// Headers excluded from request equality during matching
    pub fn match_ignored() -> &'static HeaderSet {
        &MATCH_IGNORED
    }
}

/// Header multimap as stored in a cassette
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert an `http` header map, canonicalizing names
    ///
    /// Values that are not valid UTF-8 cannot be stored in a cassette and are skipped.
    pub fn from_http(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            match value.to_str() {
                Ok(v) => headers.append(&canonical_name(name.as_str()), v),
                Err(_) => warn!("Skipping header with non-UTF8 value: {}", name),
            }
        }
        headers
    }

    fn key_for(&self, name: &str) -> Option<&String> {
        self.0.keys().find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Append a value, reusing an existing key that differs only in case
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let key = self
            .key_for(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.0.entry(key).or_default().push(value.into());
    }

    /// Replace every value of `name` with a single value
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let key = self
            .key_for(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.remove(name);
        self.0.insert(key, vec![value.into()]);
    }

    /// Remove every key matching `name` case-insensitively, returning the removed values
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let keys: Vec<String> = self
            .0
            .keys()
            .filter(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.0.remove(&k))
            .flatten()
            .collect()
    }

    /// Remove every header named in `set`
    pub fn remove_all(&mut self, set: &HeaderSet) {
        self.0.retain(|k, _| !set.contains(k));
    }

    /// First value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .flat_map(|(_, v)| v.iter())
            .map(String::as_str)
            .next()
    }

    /// All values of `name`, across keys that differ only in case
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .flat_map(|(_, v)| v.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.key_for(name).is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("Content-Type")
    }

    /// Whether any value of `name` contains `needle` (case-insensitive)
    pub fn has_value_containing(&self, name: &str, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.get_all(name)
            .iter()
            .any(|v| v.to_ascii_lowercase().contains(&needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lower-cased view of these headers without the names in `ignored`
    ///
    /// Keys differing only in case are merged and each key's values are
    /// collected as a set, so value order does not affect equality.
    pub fn comparable(&self, ignored: &HeaderSet) -> BTreeMap<String, BTreeSet<String>> {
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (k, v) in &self.0 {
            if ignored.contains(k) {
                continue;
            }
            out.entry(k.to_ascii_lowercase())
                .or_default()
                .extend(v.iter().cloned());
        }
        out
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k.as_ref(), v);
        }
        headers
    }
}
