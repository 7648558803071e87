//! Property-based tests for the sanitizer

use proptest::prelude::*;
use tapedeck_core::{
    Body, HeaderSet, Headers, Interaction, RecordedRequest, RecordedResponse,
};
use tapedeck_sanitize::{InteractionSanitizer, StandardSanitizer};

const SENSITIVE: &[&str] = &[
    "Authorization",
    "Api-Key",
    "Cookie",
    "Openai-Organization",
    "Openai-Project",
    "Set-Cookie",
];

/// A sensitive header name with randomized letter case
fn sensitive_name() -> impl Strategy<Value = String> {
    (prop::sample::select(SENSITIVE), any::<u64>()).prop_map(|(name, mask)| {
        name.chars()
            .enumerate()
            .map(|(i, c)| {
                if mask & (1 << (i % 64)) != 0 {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    })
}

fn header_list() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            prop_oneof![sensitive_name(), "X-[A-Z][a-z]{1,8}".prop_map(String::from)],
            "[a-zA-Z0-9=;_ -]{1,16}",
        ),
        0..10,
    )
}

fn interaction(req: Vec<(String, String)>, resp: Vec<(String, String)>, body: String) -> Interaction {
    Interaction {
        id: 0,
        request: RecordedRequest {
            content_length: 0,
            host: "api.openai.com".to_string(),
            body: Body::from(body.clone()),
            headers: req.into_iter().chain([("Content-Type".to_string(), "application/json".to_string())]).collect(),
            url: "https://api.openai.com/v1/embeddings".to_string(),
            method: "POST".to_string(),
        },
        response: RecordedResponse {
            content_length: 0,
            body: Body::from(body),
            headers: resp.into_iter().chain([("Content-Type".to_string(), "application/json".to_string())]).collect::<Headers>(),
            status: "200 OK".to_string(),
            code: 200,
            duration: None,
        },
    }
}

fn json_body() -> impl Strategy<Value = String> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z<>& ]{0,8}", 0..6)
        .prop_map(|m| serde_json::to_string(&m).unwrap())
}

proptest! {
    #[test]
    fn redaction_is_total(req in header_list(), resp in header_list(), body in json_body()) {
        let out = StandardSanitizer::default()
            .sanitize(interaction(req, resp, body))
            .unwrap();

        for name in HeaderSet::request_redactions().iter() {
            prop_assert!(!out.request.headers.contains(name));
        }
        for name in HeaderSet::response_redactions().iter() {
            prop_assert!(!out.response.headers.contains(name));
        }
    }

    #[test]
    fn deployment_scrub_is_a_fixed_point(
        model in "[a-z0-9][a-z0-9.-]{0,15}",
        deployment in "[a-z0-9-]{1,12}",
    ) {
        let body = format!(r#"{{"model":"{}","input":"hi"}}"#, model);
        let mut captured = interaction(Vec::new(), Vec::new(), body);
        captured.request.url = format!(
            "https://acct.openai.azure.com/openai/deployments/{}/embeddings?api-version=2024-10-21",
            deployment
        );

        let sanitizer = StandardSanitizer::default();
        let once = sanitizer.sanitize(captured).unwrap();
        let twice = sanitizer.sanitize(once.clone()).unwrap();
        prop_assert!(
            once.request.url.ends_with(&format!("/deployments/{}/embeddings", model)),
            "url {} should name the deployment after model {}",
            once.request.url,
            model
        );
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_is_a_fixed_point(req in header_list(), resp in header_list(), body in json_body()) {
        let sanitizer = StandardSanitizer::default();
        let once = sanitizer.sanitize(interaction(req, resp, body)).unwrap();
        let twice = sanitizer.sanitize(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
    }
}
