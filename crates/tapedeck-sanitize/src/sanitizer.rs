//! Post-capture interaction sanitizer

use crate::error::{SanitizeError, SanitizeResult};
use flate2::read::GzDecoder;
use std::io::Read;
use tapedeck_core::json::{is_json_content_type, pretty_print};
use tapedeck_core::provider::{SCRUBBED_HOST, is_deployment_url, scrub_provider_url};
use tapedeck_core::{Body, HeaderSet, Headers, Interaction, extract_model};
use tracing::debug;

/// Trait for making captured interactions safe to persist
pub trait InteractionSanitizer: Send + Sync {
    /// Sanitize a captured interaction
    ///
    /// Either every step succeeds or an error is returned; callers must not
    /// persist the input after an error.
    fn sanitize(&self, interaction: Interaction) -> SanitizeResult<Interaction>;
}

#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    /// Removed from captured requests
    pub request_redactions: HeaderSet,
    /// Removed from captured responses
    pub response_redactions: HeaderSet,
    /// Re-indent JSON bodies
    pub pretty_print_json: bool,
    /// Rewrite deployment-style URLs to their model-addressed form
    pub scrub_deployment_urls: bool,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            request_redactions: HeaderSet::request_redactions().clone(),
            response_redactions: HeaderSet::response_redactions().clone(),
            pretty_print_json: true,
            scrub_deployment_urls: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandardSanitizer {
    config: SanitizerConfig,
}

impl StandardSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    fn pretty_json_body(&self, headers: &Headers, body: &mut Body) {
        if !self.config.pretty_print_json {
            return;
        }
        let is_json = headers
            .get_all("Content-Type")
            .iter()
            .any(|ct| is_json_content_type(ct));
        if !is_json {
            return;
        }
        // Bodies that do not parse are kept unchanged
        if let Some(pretty) = pretty_print(body.as_bytes()) {
            *body = Body::from(pretty);
        }
    }

    fn decompress_response(headers: &mut Headers, body: &mut Body) -> SanitizeResult<()> {
        if !headers.has_value_containing("Content-Encoding", "gzip") {
            return Ok(());
        }
        let mut decoded = Vec::new();
        GzDecoder::new(body.as_bytes())
            .read_to_end(&mut decoded)
            .map_err(SanitizeError::Decompression)?;
        debug!(
            "Decompressed gzip response body: {} -> {} bytes",
            body.len(),
            decoded.len()
        );
        *body = Body::from(decoded);
        headers.remove("Content-Encoding");
        Ok(())
    }

    fn scrub_url(interaction: &mut Interaction) -> SanitizeResult<()> {
        let url = &interaction.request.url;
        if !is_deployment_url(url) {
            return Ok(());
        }
        let scrubbed = extract_model(interaction.request.body.as_bytes())
            .and_then(|model| scrub_provider_url(url, &model))
            .map_err(|source| SanitizeError::UrlScrub {
                url: url.clone(),
                source,
            })?;
        debug!("Scrubbed deployment URL to {}", scrubbed);
        interaction.request.url = scrubbed;
        interaction.request.host = SCRUBBED_HOST.to_string();
        Ok(())
    }
}

/// Overwrite the stored length and any `Content-Length` header with the body length
fn sync_content_length(content_length: &mut i64, headers: &mut Headers, body: &Body) {
    *content_length = body.len() as i64;
    if headers.contains("Content-Length") {
        headers.insert("Content-Length", body.len().to_string());
    }
}

impl InteractionSanitizer for StandardSanitizer {
    fn sanitize(&self, mut interaction: Interaction) -> SanitizeResult<Interaction> {
        let request = &mut interaction.request;
        request.headers.remove_all(&self.config.request_redactions);
        self.pretty_json_body(&request.headers, &mut request.body);
        sync_content_length(&mut request.content_length, &mut request.headers, &request.body);

        let response = &mut interaction.response;
        response.headers.remove_all(&self.config.response_redactions);
        Self::decompress_response(&mut response.headers, &mut response.body)?;
        self.pretty_json_body(&response.headers, &mut response.body);
        sync_content_length(
            &mut response.content_length,
            &mut response.headers,
            &response.body,
        );

        if self.config.scrub_deployment_urls {
            Self::scrub_url(&mut interaction)?;
        }
        Ok(interaction)
    }
}
