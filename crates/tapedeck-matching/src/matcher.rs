//! Live-versus-recorded request comparison

use crate::live::LiveRequest;
use serde::{Deserialize, Serialize};
use tapedeck_core::json::{is_json_content_type, semantically_equal};
use tapedeck_core::provider::is_deployment_url;
use tapedeck_core::{HeaderSet, Interaction, RecordedRequest};
use tracing::debug;

/// How headers take part in matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// Multimap equality after dropping `ignored` names from both sides
    Compare { ignored: HeaderSet },
    /// Headers never affect matching
    Ignore,
}

impl Default for HeaderRule {
    fn default() -> Self {
        HeaderRule::Compare {
            ignored: HeaderSet::match_ignored().clone(),
        }
    }
}

/// How bodies take part in matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyRule {
    /// Structural comparison when either side is JSON, byte equality otherwise
    #[default]
    SemanticJson,
    /// Byte equality
    Exact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatcherConfig {
    pub headers: HeaderRule,
    pub body: BodyRule,
}

/// First check a candidate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    Method,
    Url,
    Headers,
    Body,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mismatch::Method => "method",
            Mismatch::Url => "url",
            Mismatch::Headers => "headers",
            Mismatch::Body => "body",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn matches(&self, live: &LiveRequest, recorded: &RecordedRequest) -> bool {
        self.check(live, recorded).is_ok()
    }

    /// Run every check in order, reporting the first that fails
    pub fn check(&self, live: &LiveRequest, recorded: &RecordedRequest) -> Result<(), Mismatch> {
        if live.method.as_str() != recorded.method {
            return Err(Mismatch::Method);
        }
        if !urls_match(live, &recorded.url) {
            return Err(Mismatch::Url);
        }
        if let HeaderRule::Compare { ignored } = &self.config.headers
            && live.headers.comparable(ignored) != recorded.headers.comparable(ignored)
        {
            return Err(Mismatch::Headers);
        }
        if !self.bodies_match(live, recorded) {
            return Err(Mismatch::Body);
        }
        Ok(())
    }

    /// The first interaction, in iteration order, whose request matches
    pub fn first_match<'a, I>(&self, live: &LiveRequest, interactions: I) -> Option<&'a Interaction>
    where
        I: IntoIterator<Item = &'a Interaction>,
    {
        interactions.into_iter().find(|interaction| {
            match self.check(live, &interaction.request) {
                Ok(()) => true,
                Err(mismatch) => {
                    debug!(
                        "Interaction {} differs from {} {} on {}",
                        interaction.id,
                        live.method,
                        live.path(),
                        mismatch
                    );
                    false
                }
            }
        })
    }

    fn bodies_match(&self, live: &LiveRequest, recorded: &RecordedRequest) -> bool {
        let live_body = live.body.as_ref();
        let recorded_body = recorded.body.as_bytes();
        match self.config.body {
            BodyRule::Exact => live_body == recorded_body,
            BodyRule::SemanticJson => {
                let json = live.headers.content_type().is_some_and(is_json_content_type)
                    || recorded
                        .headers
                        .content_type()
                        .is_some_and(is_json_content_type);
                if json {
                    semantically_equal(live_body, recorded_body)
                } else {
                    live_body == recorded_body
                }
            }
        }
    }
}

/// Compare the live target against a stored absolute URL, ignoring scheme and host
///
/// Deployment-style URLs are stored without a query, so the live query is
/// dropped before comparing them.
fn urls_match(live: &LiveRequest, stored: &str) -> bool {
    let Ok(stored_uri) = stored.parse::<http::Uri>() else {
        debug!("Recorded URL {:?} does not parse", stored);
        return false;
    };
    let stored_target = stored_uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    if is_deployment_url(stored) {
        live.path() == stored_target
    } else {
        live.path_and_query() == stored_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tapedeck_core::{Body, Headers, RecordedResponse};

    fn live(method: &str, uri: &str, headers: &[(&str, &str)], body: &str) -> LiveRequest {
        LiveRequest::new(
            method.parse().unwrap(),
            uri.parse().unwrap(),
            headers.iter().copied().collect(),
            Bytes::from(body.to_string()),
        )
    }

    fn recorded(url: &str, headers: &[(&str, &str)], body: &str) -> RecordedRequest {
        RecordedRequest {
            content_length: body.len() as i64,
            host: String::new(),
            body: Body::from(body),
            headers: headers.iter().copied().collect::<Headers>(),
            url: url.to_string(),
            method: "POST".to_string(),
        }
    }

    const JSON: (&str, &str) = ("Content-Type", "application/json");

    #[test]
    fn test_method_checked_first() {
        let m = Matcher::default();
        let l = live("GET", "/v1/models", &[], "");
        let r = recorded("https://api.openai.com/v1/chat/completions", &[], "x");
        assert_eq!(m.check(&l, &r), Err(Mismatch::Method));
    }

    #[test]
    fn test_url_ignores_host() {
        let m = Matcher::default();
        let l = live("POST", "http://127.0.0.1:1234/v1/chat/completions", &[JSON], "{}");
        let r = recorded("https://api.openai.com/v1/chat/completions", &[JSON], "{}");
        assert!(m.matches(&l, &r));
    }

    #[test]
    fn test_url_query_must_match_for_plain_urls() {
        let m = Matcher::default();
        let r = recorded("https://api.openai.com/v1/files?purpose=x", &[], "");
        assert!(m.matches(&live("POST", "/v1/files?purpose=x", &[], ""), &r));
        assert_eq!(
            m.check(&live("POST", "/v1/files?purpose=y", &[], ""), &r),
            Err(Mismatch::Url)
        );
    }

    #[test]
    fn test_deployment_url_drops_live_query() {
        let m = Matcher::default();
        let l = live(
            "POST",
            "/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21",
            &[JSON],
            r#"{"model":"gpt-4o"}"#,
        );
        let r = recorded(
            "https://resource-name.cognitiveservices.azure.com/openai/deployments/gpt-4o/chat/completions",
            &[JSON],
            r#"{"model":"gpt-4o"}"#,
        );
        assert!(m.matches(&l, &r));
    }

    #[test]
    fn test_ignored_headers_do_not_matter() {
        let m = Matcher::default();
        let l = live(
            "POST",
            "/v1/embeddings",
            &[
                JSON,
                ("traceparent", "00-aaa-bbb-01"),
                ("Authorization", "Bearer sk-live"),
                ("X-Cassette-Name", "embeddings"),
                ("Content-Length", "2"),
            ],
            "{}",
        );
        let r = recorded(
            "https://api.openai.com/v1/embeddings",
            &[JSON, ("Traceparent", "00-ccc-ddd-01"), ("Content-Length", "4")],
            "{\n}",
        );
        assert!(m.matches(&l, &r));
    }

    #[test]
    fn test_extra_header_is_a_mismatch() {
        let m = Matcher::default();
        let l = live("POST", "/v1/embeddings", &[JSON, ("X-Tenant", "a")], "{}");
        let r = recorded("https://api.openai.com/v1/embeddings", &[JSON], "{}");
        assert_eq!(m.check(&l, &r), Err(Mismatch::Headers));

        let lenient = Matcher::new(MatcherConfig {
            headers: HeaderRule::Ignore,
            body: BodyRule::SemanticJson,
        });
        assert!(lenient.matches(&l, &r));
    }

    #[test]
    fn test_header_names_compare_case_insensitively() {
        let m = Matcher::default();
        let l = live("POST", "/v1/embeddings", &[("content-type", "application/json")], "{}");
        let r = recorded("https://api.openai.com/v1/embeddings", &[JSON], "{}");
        assert!(m.matches(&l, &r));
    }

    #[test]
    fn test_multi_value_header_order_ignored() {
        let m = Matcher::default();
        let l = live(
            "POST",
            "/v1/embeddings",
            &[JSON, ("Accept", "text/plain"), ("Accept", "application/json")],
            "{}",
        );
        let r = recorded(
            "https://api.openai.com/v1/embeddings",
            &[JSON, ("Accept", "application/json"), ("Accept", "text/plain")],
            "{}",
        );
        assert!(m.matches(&l, &r));

        let missing = recorded(
            "https://api.openai.com/v1/embeddings",
            &[JSON, ("Accept", "application/json")],
            "{}",
        );
        assert_eq!(m.check(&l, &missing), Err(Mismatch::Headers));
    }

    #[test]
    fn test_json_body_key_order_ignored() {
        let m = Matcher::default();
        let l = live(
            "POST",
            "/chat/completions",
            &[JSON],
            r#"{"model":"m","messages":[{"role":"user","content":"Hello!"}]}"#,
        );
        let r = recorded(
            "https://api.openai.com/chat/completions",
            &[JSON],
            r#"{"messages":[{"content":"Hello!","role":"user"}],"model":"m"}"#,
        );
        assert!(m.matches(&l, &r));

        let exact = Matcher::new(MatcherConfig {
            headers: HeaderRule::default(),
            body: BodyRule::Exact,
        });
        assert_eq!(exact.check(&l, &r), Err(Mismatch::Body));
    }

    #[test]
    fn test_json_detected_from_recorded_side() {
        let m = Matcher::default();
        let l = live("POST", "/v1/embeddings", &[], r#"{"a":1,"b":2}"#);
        let r = recorded("https://api.openai.com/v1/embeddings", &[], r#"{"b":2,"a":1}"#);
        // neither side declares JSON: byte comparison
        assert_eq!(m.check(&l, &r), Err(Mismatch::Body));
    }

    #[test]
    fn test_non_json_body_exact() {
        let m = Matcher::default();
        let l = live("POST", "/v1/audio", &[("Content-Type", "text/plain")], "hello");
        let r = recorded("https://api.openai.com/v1/audio", &[("Content-Type", "text/plain")], "hello");
        assert!(m.matches(&l, &r));
    }

    #[test]
    fn test_first_match_wins() {
        let m = Matcher::default();
        let response = RecordedResponse {
            content_length: 0,
            body: Body::default(),
            headers: Headers::new(),
            status: "200 OK".to_string(),
            code: 200,
            duration: None,
        };
        let interactions = vec![
            Interaction {
                id: 0,
                request: recorded("https://x/v1/embeddings", &[JSON, ("X-Variant", "a")], "{}"),
                response: response.clone(),
            },
            Interaction {
                id: 1,
                request: recorded("https://x/v1/embeddings", &[JSON, ("X-Variant", "b")], "{}"),
                response: response.clone(),
            },
            Interaction {
                id: 2,
                request: recorded("https://x/v1/embeddings", &[JSON, ("X-Variant", "b")], "{}"),
                response,
            },
        ];

        let l = live("POST", "/v1/embeddings", &[JSON, ("X-Variant", "b")], "{}");
        assert_eq!(m.first_match(&l, &interactions).map(|i| i.id), Some(1));

        let none = live("POST", "/v1/embeddings", &[JSON, ("X-Variant", "c")], "{}");
        assert!(m.first_match(&none, &interactions).is_none());
    }
}
