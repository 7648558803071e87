//! Round trips that produce an interaction as a side effect

use crate::Result;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};
use tapedeck_core::{Body, Headers, Interaction, RecordedRequest, RecordedResponse};
use tracing::{debug, warn};

/// The upstream response exactly as received
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: http::StatusCode,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

/// Result of a captured round trip
#[derive(Debug, Clone)]
pub struct CapturedExchange {
    /// The raw, unsanitized interaction
    pub interaction: Interaction,
    pub response: UpstreamResponse,
    pub elapsed: Duration,
}

/// Executes requests and records each exchange
#[derive(Debug, Clone)]
pub struct CapturingTransport {
    client: Client,
}

impl CapturingTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send a request and capture both sides of the exchange
    ///
    /// `headers` are sent as given and recorded as given; the response body is
    /// read to completion without decoding.
    pub async fn round_trip(
        &self,
        method: http::Method,
        url: &str,
        headers: &Headers,
        body: Bytes,
    ) -> Result<CapturedExchange> {
        let mut builder = self
            .client
            .request(method.clone(), url)
            .body(body.clone());
        for (name, values) in headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let response_body = response.bytes().await?;
        let elapsed = started.elapsed();

        debug!(
            "Upstream {} {} -> {} ({} bytes in {:?})",
            method,
            url,
            status,
            response_body.len(),
            elapsed
        );
        if !status.is_success() {
            warn!("Upstream returned {} for {} {}", status, method, url);
        }

        let host = url
            .parse::<http::Uri>()
            .ok()
            .and_then(|u| u.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let interaction = Interaction {
            id: 0,
            request: RecordedRequest {
                content_length: body.len() as i64,
                host,
                body: Body::from(body.as_ref()),
                headers: headers.clone(),
                url: url.to_string(),
                method: method.to_string(),
            },
            response: RecordedResponse {
                content_length: response_body.len() as i64,
                body: Body::from(response_body.as_ref()),
                headers: Headers::from_http(&response_headers),
                status: status_line(status),
                code: status.as_u16(),
                duration: Some(elapsed),
            },
        };

        Ok(CapturedExchange {
            interaction,
            response: UpstreamResponse {
                status,
                headers: response_headers,
                body: response_body,
            },
            elapsed,
        })
    }
}

/// `200 OK` style status text
fn status_line(status: http::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
