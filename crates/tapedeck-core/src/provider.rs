//! Provider identification and URL normalization
//!
//! Azure OpenAI addresses a model through a deployment path segment
//! (`/openai/deployments/{deployment}/...`) and an `api-version` query. Before
//! a recording is saved the host, the deployment and the query are replaced
//! with stable values so the cassette does not depend on the account that
//! recorded it.

use crate::error::{Error, Result};

/// Anchor preceding the deployment segment in Azure URLs
pub const DEPLOYMENTS_PREFIX: &str = "/openai/deployments/";

/// Host written into every scrubbed Azure URL
pub const SCRUBBED_HOST: &str = "resource-name.cognitiveservices.azure.com";

/// Cassette name prefix selecting Azure recording and request paths
pub const AZURE_CASSETTE_PREFIX: &str = "azure-";

/// Upstream provider a cassette is recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    AzureOpenAI,
}

impl Provider {
    /// Select the provider from a cassette name
    pub fn for_cassette(name: &str) -> Self {
        if name.starts_with(AZURE_CASSETTE_PREFIX) {
            Provider::AzureOpenAI
        } else {
            Provider::OpenAI
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::AzureOpenAI => "azure",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build an Azure deployment path for `endpoint`, e.g.
/// `("/chat/completions", "gpt-4o")` -> `/openai/deployments/gpt-4o/chat/completions`
pub fn build_provider_path(endpoint: &str, model: &str) -> String {
    format!(
        "{}{}/{}",
        DEPLOYMENTS_PREFIX,
        model,
        endpoint.trim_start_matches('/')
    )
}

/// A path split around its deployment segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPath<'a> {
    /// Everything up to and including `/openai/deployments/`
    pub prefix: &'a str,
    pub deployment: &'a str,
    /// Everything after the deployment segment, starting with `/`
    pub rest: &'a str,
}

/// Locate the deployment segment in a path
///
/// The segment must be non-empty and followed by another `/`.
pub fn parse_deployment_path(path: &str) -> Option<DeploymentPath<'_>> {
    for (idx, _) in path.match_indices(DEPLOYMENTS_PREFIX) {
        let start = idx + DEPLOYMENTS_PREFIX.len();
        let tail = &path[start..];
        if let Some(slash) = tail.find('/')
            && slash > 0
        {
            return Some(DeploymentPath {
                prefix: &path[..start],
                deployment: &tail[..slash],
                rest: &tail[slash..],
            });
        }
    }
    None
}

/// Whether a URL or path uses the deployment-style layout
pub fn is_deployment_url(url: &str) -> bool {
    let path = match url.parse::<http::Uri>() {
        Ok(uri) => uri.path().to_string(),
        Err(_) => url.to_string(),
    };
    parse_deployment_path(&path).is_some()
}

/// Rewrite a deployment-style URL to its stable form
///
/// The host becomes [`SCRUBBED_HOST`], the deployment segment becomes `model`
/// and the query is dropped. URLs without a deployment segment are returned
/// unchanged. A model that would not stay a single path segment is rejected.
pub fn scrub_provider_url(raw: &str, model: &str) -> Result<String> {
    let uri: http::Uri = raw.parse().map_err(|e: http::uri::InvalidUri| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let Some(parts) = parse_deployment_path(uri.path()) else {
        return Ok(raw.to_string());
    };
    if model.is_empty()
        || model
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
    {
        return Err(Error::InvalidDeploymentModel(model.to_string()));
    }

    let scheme = uri.scheme_str().unwrap_or("https");
    Ok(format!(
        "{}://{}{}{}{}",
        scheme, SCRUBBED_HOST, parts.prefix, model, parts.rest
    ))
}
