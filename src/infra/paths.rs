use crate::domain::{Artifact, TraceId};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ResolveArtifactError {
    #[error("invalid trace id: {0:?}")]
    InvalidTraceId(String),
}

/// Maps an untrusted id to `<logs_dir>/<id>/<artifact>`.
///
/// Rejection happens on the string alone; the filesystem is not consulted either way.
pub fn resolve_artifact_path(
    logs_dir: &Path,
    trace_id: &str,
    artifact: Artifact,
) -> Result<PathBuf, ResolveArtifactError> {
    let Some(trace_id) = TraceId::parse(trace_id) else {
        return Err(ResolveArtifactError::InvalidTraceId(trace_id.to_string()));
    };
    Ok(trace_artifact_path(logs_dir, &trace_id, artifact))
}

pub fn trace_artifact_path(logs_dir: &Path, trace_id: &TraceId, artifact: Artifact) -> PathBuf {
    logs_dir.join(trace_id.as_str()).join(artifact.file_name())
}
