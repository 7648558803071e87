//! Cassette-addressed requests
//!
//! A request names the cassette it expects to be answered from. Azure
//! cassettes (`azure-` prefix) are sent to the deployment path built from the
//! request's model; every other cassette goes to the `/v1` OpenAI path.

use crate::Result;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use tapedeck_core::provider::build_provider_path;
use tapedeck_core::{CASSETTE_NAME_HEADER, Provider, RequestBody};

#[derive(Debug, Clone)]
pub struct CassetteRequest {
    base_url: String,
    cassette_name: String,
    body: RequestBody,
}

impl CassetteRequest {
    pub fn new(
        base_url: impl Into<String>,
        cassette_name: impl Into<String>,
        body: RequestBody,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cassette_name: cassette_name.into(),
            body,
        }
    }

    pub fn cassette_name(&self) -> &str {
        &self.cassette_name
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn provider(&self) -> Provider {
        Provider::for_cassette(&self.cassette_name)
    }

    /// Request path for this cassette's provider
    pub fn path(&self) -> String {
        match self.provider() {
            Provider::AzureOpenAI => build_provider_path(self.body.endpoint(), self.body.model()),
            Provider::OpenAI => format!("/v1{}", self.body.endpoint()),
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path())
    }

    /// The request as a plain `http::Request`
    pub fn to_http(&self) -> Result<http::Request<Bytes>> {
        let body = Bytes::from(self.body.to_json()?);
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(self.url())
            .header(CONTENT_TYPE, "application/json")
            .header(CASSETTE_NAME_HEADER, self.cassette_name.as_str())
            .body(body)?;
        Ok(request)
    }

    /// The request ready to send with `client`
    pub fn to_reqwest(&self, client: &reqwest::Client) -> Result<reqwest::RequestBuilder> {
        let body = self.body.to_json()?;
        Ok(client
            .post(self.url())
            .header(CONTENT_TYPE, "application/json")
            .header(CASSETTE_NAME_HEADER, self.cassette_name.as_str())
            .body(body))
    }

    pub async fn send(&self, client: &reqwest::Client) -> Result<reqwest::Response> {
        Ok(self.to_reqwest(client)?.send().await?)
    }
}
