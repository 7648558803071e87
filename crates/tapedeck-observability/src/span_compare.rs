//! Normalized comparison of exported telemetry spans
//!
//! Spans are read in the OTLP JSON shape. Normalization removes everything
//! that differs between two runs of the same replayed call (ids, timestamps,
//! stack traces, provider-specific error wording) so that the remaining
//! structure can be compared with `==`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static ERROR_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Error code: \d+").unwrap_or_else(|e| panic!("invalid error code pattern: {}", e))
});

const EXCEPTION_EVENT: &str = "exception";
const EXCEPTION_TYPE: &str = "exception.type";
const EXCEPTION_MESSAGE: &str = "exception.message";
const MODEL_NAME: &str = "llm.model_name";
const DROPPED_KEYS: [&str; 2] = ["exception.stacktrace", "exception.escaped"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub parent_span_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: i32,
    /// OTLP JSON encodes 64-bit integers as strings; either form is accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_unix_nano: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_unix_nano: Option<Value>,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: AnyValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_value: Option<ArrayValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvlist_value: Option<KeyValueList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<AnyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValueList {
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unix_nano: Option<Value>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i32,
}

impl AnyValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn int(value: i64) -> Self {
        Self {
            int_value: Some(Value::from(value)),
            ..Self::default()
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self.int_value.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// True for the zero value of whichever variant is set, or no variant at all
    pub fn is_zero(&self) -> bool {
        if let Some(s) = &self.string_value {
            return s.is_empty();
        }
        if let Some(b) = self.bool_value {
            return !b;
        }
        if self.int_value.is_some() {
            return self.as_i64() == Some(0);
        }
        if let Some(d) = self.double_value {
            return d == 0.0;
        }
        if let Some(a) = &self.array_value {
            return a.values.is_empty();
        }
        if let Some(kv) = &self.kvlist_value {
            return kv.values.is_empty();
        }
        if let Some(b) = &self.bytes_value {
            return b.is_empty();
        }
        true
    }
}

/// Keep only the `Error code: N` token of a provider error, if there is one
pub fn normalize_error_message(message: &str) -> String {
    let message = message.replace('\'', "\"");
    match ERROR_CODE.find(&message) {
        Some(m) => m.as_str().to_string(),
        None => message,
    }
}

/// Compact JSON with zero-valued members removed, for strings that look like JSON
fn normalize_json_string(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    let value: Value = serde_json::from_str(raw).ok()?;
    serde_json::to_string(&strip_zero_values(value)).ok()
}

fn is_zero_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn strip_zero_values(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let kept: serde_json::Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, strip_zero_values(v)))
                .filter(|(_, v)| !is_zero_json(v))
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(kept)
            }
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().map(strip_zero_values).collect();
            if items.iter().all(is_zero_json) {
                Value::Null
            } else {
                Value::Array(items)
            }
        }
        other => other,
    }
}

fn normalize_attribute_value(key: &str, mut value: AnyValue) -> AnyValue {
    if let Some(s) = value.string_value.take() {
        let s = match key {
            EXCEPTION_TYPE => s.strip_prefix("openai.").unwrap_or(&s).to_string(),
            EXCEPTION_MESSAGE => normalize_error_message(&s),
            _ => normalize_json_string(&s).unwrap_or(s),
        };
        value.string_value = Some(s);
    }
    if let Some(i) = value.as_i64() {
        value.int_value = Some(Value::from(i));
    }
    value
}

fn normalize_attributes(attributes: Vec<KeyValue>, drop_model: bool) -> Vec<KeyValue> {
    let mut attributes: Vec<KeyValue> = attributes
        .into_iter()
        .filter(|kv| !DROPPED_KEYS.contains(&kv.key.as_str()))
        .filter(|kv| !(drop_model && kv.key == MODEL_NAME))
        .map(|kv| KeyValue {
            value: normalize_attribute_value(&kv.key, kv.value),
            key: kv.key,
        })
        .filter(|kv| !kv.value.is_zero())
        .collect();
    attributes.sort_by(|a, b| a.key.cmp(&b.key));
    attributes
}

/// Strip run-specific detail from a span
pub fn normalize_span(mut span: Span) -> Span {
    span.trace_id.clear();
    span.span_id.clear();
    span.parent_span_id.clear();
    span.start_time_unix_nano = None;
    span.end_time_unix_nano = None;

    // the model name is absent from spans of calls that failed before a response
    let failed = span.events.iter().any(|e| e.name == EXCEPTION_EVENT);

    span.events = std::mem::take(&mut span.events)
        .into_iter()
        .map(|event| Event {
            time_unix_nano: None,
            attributes: normalize_attributes(event.attributes, false),
            name: event.name,
        })
        .collect();

    span.links = std::mem::take(&mut span.links)
        .into_iter()
        .map(|link| Link {
            trace_id: String::new(),
            span_id: String::new(),
            attributes: normalize_attributes(link.attributes, false),
        })
        .collect();

    span.attributes = normalize_attributes(std::mem::take(&mut span.attributes), failed);
    span.status.message = normalize_error_message(&span.status.message);
    span
}

/// Whether two spans are the same once normalized
pub fn spans_equivalent(expected: &Span, actual: &Span) -> bool {
    normalize_span(expected.clone()) == normalize_span(actual.clone())
}
