use crate::domain::{Artifact, TraceId, TraceSession, decode_exec_at};
use crate::infra::trace_artifact_path;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot list logs directory: {0}")]
    LogsDirUnreadable(String),

    #[error("logs directory is not a directory: {0}")]
    LogsDirNotDirectory(String),
}

/// Lists trace sessions under `logs_dir`, newest first.
///
/// Entries whose name is not a trace id are skipped silently, as are entries that
/// cannot be inspected. Only the logs directory itself being unreadable is an error.
pub fn scan_trace_sessions(logs_dir: &Path) -> Result<Vec<TraceSession>, ScanError> {
    let mut sessions: Vec<TraceSession> = Vec::new();

    let walker = WalkDir::new(logs_dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                return Err(ScanError::LogsDirUnreadable(format!(
                    "{}: {error}",
                    logs_dir.display()
                )));
            }
            Err(error) => {
                tracing::debug!(%error, "skipping unreadable logs entry");
                continue;
            }
        };

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(ScanError::LogsDirNotDirectory(
                    logs_dir.display().to_string(),
                ));
            }
            continue;
        }
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(trace_id) = entry.file_name().to_str().and_then(TraceId::parse) else {
            continue;
        };

        sessions.push(TraceSession {
            exec_at: decode_exec_at(&trace_id),
            access_log_size: artifact_size(logs_dir, &trace_id, Artifact::AccessLog),
            sql_log_size: artifact_size(logs_dir, &trace_id, Artifact::SqlLog),
            perf_log_size: artifact_size(logs_dir, &trace_id, Artifact::PerfLog),
            id: trace_id,
        });
    }

    sessions.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(sessions)
}

/// Size in bytes, or 0 when the artifact is missing or cannot be inspected.
fn artifact_size(logs_dir: &Path, trace_id: &TraceId, artifact: Artifact) -> u64 {
    fs::metadata(trace_artifact_path(logs_dir, trace_id, artifact))
        .ok()
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .unwrap_or(0)
}
