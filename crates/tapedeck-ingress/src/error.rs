//! Harness diagnostics returned at the HTTP boundary

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tapedeck_core::{ERROR_TAG, Provider};
use tapedeck_egress::{EgressError, UpstreamCredentials};
use thiserror::Error;

/// Lowercase form of [`tapedeck_core::ERROR_MARKER_HEADER`]
pub(crate) static ERROR_MARKER: HeaderName = HeaderName::from_static("x-tapedeck-error");

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(
        "No cassette found for {method} {path}. To record a new cassette, include the X-Cassette-Name header with the cassette name.\n{details}"
    )]
    NoCassetteMatch {
        method: String,
        path: String,
        details: String,
    },

    #[error(
        "Interaction out of date for {method} {path}. To re-record, delete {cassette_file} and re-run with {api_key_env} set."
    )]
    InteractionOutOfDate {
        method: String,
        path: String,
        cassette_file: String,
        api_key_env: &'static str,
    },

    #[error("No cassette found for {method} {path}. {hint} and provide X-Cassette-Name header.")]
    MissingCredentials {
        method: String,
        path: String,
        hint: String,
    },

    #[error(
        "Invalid cassette name {cassette:?} in X-Cassette-Name header. Use a relative path such as chat-basic or azure/chat-basic."
    )]
    InvalidCassetteName { cassette: String },

    #[error("Failed to prepare cassette directory: {0}")]
    CassetteDirUnavailable(String),

    #[error("Failed to record interaction: {0}")]
    UpstreamCallFailed(String),

    #[error("Failed to persist recorded interaction: {0}")]
    SanitizationFailed(String),

    #[error("Cassette {cassette} is already being recorded or already exists on disk")]
    RecordingConflict { cassette: String },

    #[error("Recorded response in cassette {cassette} is invalid: {reason}")]
    InvalidRecording { cassette: String, reason: String },

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request body exceeds the {limit} byte limit. Raise replay.max_body_bytes to accept larger requests.")]
    BodyTooLarge { limit: usize },
}

pub type ReplayResult<T> = Result<T, ReplayError>;

impl ReplayError {
    /// Map a failed recording attempt for `method path`
    pub fn from_recording(err: EgressError, method: &str, path: &str) -> Self {
        match err {
            EgressError::MissingCredentials { provider } => Self::missing_credentials(provider, method, path),
            EgressError::InvalidCassetteName(cassette) => Self::InvalidCassetteName { cassette },
            EgressError::RecordingConflict { cassette } => Self::RecordingConflict { cassette },
            EgressError::UpstreamCallFailed(e) => Self::UpstreamCallFailed(e.to_string()),
            EgressError::InvalidUpstreamUrl(url) => {
                Self::UpstreamCallFailed(format!("invalid upstream URL {}", url))
            }
            EgressError::ConfigError(msg) => Self::UpstreamCallFailed(msg),
            EgressError::SanitizationFailed(e) => Self::SanitizationFailed(e.to_string()),
            EgressError::Storage(e) => Self::CassetteDirUnavailable(e.to_string()),
            EgressError::PersistFailed(msg) => Self::SanitizationFailed(msg),
        }
    }

    pub fn missing_credentials(provider: Provider, method: &str, path: &str) -> Self {
        Self::MissingCredentials {
            method: method.to_string(),
            path: path.to_string(),
            hint: UpstreamCredentials::setup_hint(provider),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InteractionOutOfDate { .. } | Self::RecordingConflict { .. } => StatusCode::CONFLICT,
            Self::InvalidCassetteName { .. } => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NoCassetteMatch { .. }
            | Self::MissingCredentials { .. }
            | Self::CassetteDirUnavailable(_)
            | Self::UpstreamCallFailed(_)
            | Self::SanitizationFailed(_)
            | Self::InvalidRecording { .. }
            | Self::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label for this kind of miss
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCassetteMatch { .. } => "no_cassette_match",
            Self::InteractionOutOfDate { .. } => "interaction_out_of_date",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::InvalidCassetteName { .. } => "invalid_cassette_name",
            Self::CassetteDirUnavailable(_) => "cassette_dir_unavailable",
            Self::UpstreamCallFailed(_) => "upstream_call_failed",
            Self::SanitizationFailed(_) => "sanitization_failed",
            Self::RecordingConflict { .. } => "recording_conflict",
            Self::InvalidRecording { .. } => "invalid_recording",
            Self::BodyRead(_) => "body_read",
            Self::BodyTooLarge { .. } => "body_too_large",
        }
    }
}

impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = format!("{}{}\n", ERROR_TAG, self);

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(ERROR_MARKER.clone(), HeaderValue::from_static("true"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapedeck_core::ERROR_MARKER_HEADER;

    #[test]
    fn test_marker_header_name() {
        assert!(ERROR_MARKER.as_str().eq_ignore_ascii_case(ERROR_MARKER_HEADER));
    }

    #[test]
    fn test_status_mapping() {
        let out_of_date = ReplayError::InteractionOutOfDate {
            method: "POST".into(),
            path: "/v1/chat/completions".into(),
            cassette_file: "cassettes/chat.yaml".into(),
            api_key_env: "OPENAI_API_KEY",
        };
        assert_eq!(out_of_date.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ReplayError::RecordingConflict { cassette: "c".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ReplayError::missing_credentials(Provider::OpenAI, "POST", "/v1/embeddings").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ReplayError::SanitizationFailed("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_recording_errors_map_by_stage() {
        let invalid = ReplayError::from_recording(
            EgressError::InvalidCassetteName("../x".into()),
            "POST",
            "/v1/chat/completions",
        );
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert!(invalid.to_string().contains("\"../x\""));

        let setup = ReplayError::from_recording(
            EgressError::Storage(tapedeck_storage::StorageError::Io(std::io::Error::other(
                "read-only filesystem",
            ))),
            "POST",
            "/v1/chat/completions",
        );
        assert!(matches!(setup, ReplayError::CassetteDirUnavailable(_)));
        assert_eq!(setup.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let persist = ReplayError::from_recording(
            EgressError::PersistFailed("cassette writer task failed: panicked".into()),
            "POST",
            "/v1/chat/completions",
        );
        assert_eq!(
            persist.to_string(),
            "Failed to persist recorded interaction: cassette writer task failed: panicked"
        );

        assert_eq!(
            ReplayError::BodyTooLarge { limit: 16 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_missing_credentials_messages() {
        let openai = ReplayError::missing_credentials(Provider::OpenAI, "POST", "/v1/embeddings");
        assert_eq!(
            openai.to_string(),
            "No cassette found for POST /v1/embeddings. To record OpenAI cassettes, set OPENAI_API_KEY environment variable and provide X-Cassette-Name header."
        );

        let azure = ReplayError::missing_credentials(
            Provider::AzureOpenAI,
            "POST",
            "/openai/deployments/gpt-4/chat/completions",
        );
        assert!(azure.to_string().contains(
            "set AZURE_OPENAI_API_KEY, AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_DEPLOYMENT, and OPENAI_API_VERSION environment variables and provide X-Cassette-Name header."
        ));
    }

    #[tokio::test]
    async fn test_into_response_marks_harness_errors() {
        let response = ReplayError::BodyRead("connection reset".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[&ERROR_MARKER], "true");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            body.as_ref(),
            b"Tapedeck Error: Failed to read request body: connection reset\n"
        );
    }
}
