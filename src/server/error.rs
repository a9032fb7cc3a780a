use crate::infra::{FilterStartError, ResolveArtifactError, ScanError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use thiserror::Error;

/// Failures detected before a response is committed. Anything after that point is
/// only logged, since the status line is already on the wire.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    InvalidTraceId(#[from] ResolveArtifactError),

    #[error("artifact unavailable: {path}: {source}")]
    ArtifactUnavailable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("filter unavailable: {0}")]
    FilterUnavailable(#[from] FilterStartError),

    #[error("session discovery unavailable: {0}")]
    DiscoveryUnavailable(#[from] ScanError),

    #[error("session discovery task failed: {0}")]
    DiscoveryTask(#[from] tokio::task::JoinError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidTraceId(_) => StatusCode::BAD_REQUEST,
            Self::ArtifactUnavailable { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            Self::ArtifactUnavailable { .. }
            | Self::FilterUnavailable(_)
            | Self::DiscoveryUnavailable(_)
            | Self::DiscoveryTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidTraceId(_) => "invalid trace id",
            Self::ArtifactUnavailable { .. } => "artifact unavailable",
            Self::FilterUnavailable(_) => "filter unavailable",
            Self::DiscoveryUnavailable(_) | Self::DiscoveryTask(_) => "trace list unavailable",
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::InvalidTraceId(_) => tracing::debug!(error = %self, "rejected request"),
            Self::ArtifactUnavailable { .. } => tracing::warn!(error = %self, "request failed"),
            _ => tracing::error!(error = %self, "request failed"),
        }
        (status, self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_failures_to_statuses() {
        let invalid = RequestError::from(ResolveArtifactError::InvalidTraceId("..".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing = RequestError::ArtifactUnavailable {
            path: "logs/20230115-093000/perf.log".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let denied = RequestError::ArtifactUnavailable {
            path: "logs/20230115-093000/perf.log".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(denied.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unspawnable = RequestError::from(FilterStartError::Spawn {
            program: "./kataribe".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(unspawnable.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let discovery = RequestError::from(ScanError::LogsDirUnreadable("./logs".to_string()));
        assert_eq!(discovery.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
