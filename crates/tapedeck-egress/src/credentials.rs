//! Upstream credentials and target URLs
//!
//! Credentials are resolved once from the environment and handed to the
//! recorder; nothing here is read per request.

use crate::{EgressError, Result};
use tapedeck_core::Provider;
use tapedeck_core::provider::parse_deployment_path;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const AZURE_API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_DEPLOYMENT_ENV: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const AZURE_API_VERSION_ENV: &str = "OPENAI_API_VERSION";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAITarget {
    pub api_key: String,
    /// Base URL without a trailing `/`, e.g. `https://api.openai.com/v1`
    pub base_url: String,
}

impl OpenAITarget {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Self {
            api_key: api_key.into(),
            base_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureTarget {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

/// Credentials available for recording, by provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamCredentials {
    pub openai: Option<OpenAITarget>,
    pub azure: Option<AzureTarget>,
}

/// A resolved credential and target for one provider
#[derive(Debug, Clone, Copy)]
pub enum UpstreamTarget<'a> {
    OpenAI(&'a OpenAITarget),
    Azure(&'a AzureTarget),
}

impl UpstreamCredentials {
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through `lookup`, treating empty values as unset
    ///
    /// Azure credentials count only when key, endpoint, deployment and API
    /// version are all present.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai = get(OPENAI_API_KEY_ENV).map(|key| {
            let base = get(OPENAI_BASE_URL_ENV);
            OpenAITarget::new(key, base.as_deref())
        });

        let azure = match (
            get(AZURE_API_KEY_ENV),
            get(AZURE_ENDPOINT_ENV),
            get(AZURE_DEPLOYMENT_ENV),
            get(AZURE_API_VERSION_ENV),
        ) {
            (Some(api_key), Some(endpoint), Some(deployment), Some(api_version)) => {
                Some(AzureTarget {
                    api_key,
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    deployment,
                    api_version,
                })
            }
            _ => None,
        };

        Self { openai, azure }
    }

    pub fn target(&self, provider: Provider) -> Option<UpstreamTarget<'_>> {
        match provider {
            Provider::OpenAI => self.openai.as_ref().map(UpstreamTarget::OpenAI),
            Provider::AzureOpenAI => self.azure.as_ref().map(UpstreamTarget::Azure),
        }
    }

    pub fn has(&self, provider: Provider) -> bool {
        self.target(provider).is_some()
    }

    /// Environment variable holding the API key for `provider`
    pub fn api_key_env(provider: Provider) -> &'static str {
        match provider {
            Provider::OpenAI => OPENAI_API_KEY_ENV,
            Provider::AzureOpenAI => AZURE_API_KEY_ENV,
        }
    }

    /// Instruction naming every variable needed to record for `provider`
    pub fn setup_hint(provider: Provider) -> String {
        match provider {
            Provider::OpenAI => format!(
                "To record OpenAI cassettes, set {} environment variable",
                OPENAI_API_KEY_ENV
            ),
            Provider::AzureOpenAI => format!(
                "To record Azure cassettes, set {}, {}, {}, and {} environment variables",
                AZURE_API_KEY_ENV, AZURE_ENDPOINT_ENV, AZURE_DEPLOYMENT_ENV, AZURE_API_VERSION_ENV
            ),
        }
    }
}

impl UpstreamTarget<'_> {
    pub fn provider(&self) -> Provider {
        match self {
            UpstreamTarget::OpenAI(_) => Provider::OpenAI,
            UpstreamTarget::Azure(_) => Provider::AzureOpenAI,
        }
    }

    /// Outbound URL for a live request target
    ///
    /// OpenAI: a leading `/v1` is dropped and the rest appended to the base URL.
    /// Azure: the deployment segment is replaced by the configured deployment
    /// and `api-version` is appended to the query.
    pub fn build_url(&self, path: &str, query: Option<&str>) -> Result<String> {
        let query = query.filter(|q| !q.is_empty());
        match self {
            UpstreamTarget::OpenAI(t) => {
                let path = path.strip_prefix("/v1").unwrap_or(path);
                Ok(match query {
                    Some(q) => format!("{}{}?{}", t.base_url, path, q),
                    None => format!("{}{}", t.base_url, path),
                })
            }
            UpstreamTarget::Azure(t) => {
                let parts = parse_deployment_path(path).ok_or_else(|| {
                    EgressError::InvalidUpstreamUrl(format!(
                        "{} is not a deployment path",
                        path
                    ))
                })?;
                let version = format!("api-version={}", t.api_version);
                Ok(format!(
                    "{}{}{}{}?{}",
                    t.endpoint,
                    parts.prefix,
                    t.deployment,
                    parts.rest,
                    match query {
                        Some(q) => format!("{}&{}", q, version),
                        None => version,
                    }
                ))
            }
        }
    }

    /// Credential header to attach to the outbound request
    pub fn auth_header(&self) -> (&'static str, String) {
        match self {
            UpstreamTarget::OpenAI(t) => ("Authorization", format!("Bearer {}", t.api_key)),
            UpstreamTarget::Azure(t) => ("Api-Key", t.api_key.clone()),
        }
    }
}
