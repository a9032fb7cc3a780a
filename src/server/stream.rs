use crate::domain::Artifact;
use crate::infra::{FilterExit, FilterProgram, FilterRun, resolve_artifact_path};
use crate::server::RequestError;
use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt as _;
use futures_util::future::BoxFuture;
use futures_util::stream::Stream;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Responds with the artifact's bytes verbatim.
///
/// Nothing is sent unless the file opens. A read error after that truncates the body
/// and is logged.
pub async fn stream_artifact(
    logs_dir: &Path,
    trace_id: &str,
    artifact: Artifact,
) -> Result<Response, RequestError> {
    let path = resolve_artifact_path(logs_dir, trace_id, artifact)?;
    let file = open_artifact(&path).await?;

    let body = relay_body(ReaderStream::new(file), path.display().to_string());
    Ok(plain_text(body))
}

/// Pipes the artifact through `program` and relays its stdout as the body.
///
/// The artifact is the program's stdin; the response starts as soon as the program
/// is running and ends when it closes stdout. Its exit status is reaped and logged in
/// the background, so a client going away neither blocks nor leaks the child.
pub async fn run_filter(
    logs_dir: &Path,
    trace_id: &str,
    artifact: Artifact,
    program: &dyn FilterProgram,
) -> Result<Response, RequestError> {
    let path = resolve_artifact_path(logs_dir, trace_id, artifact)?;
    let input = open_artifact(&path).await?.into_std().await;

    let FilterRun { output, exit } = program.start(input)?;
    let name = program.name();
    tokio::spawn(log_filter_exit(
        name.clone(),
        trace_id.to_string(),
        artifact,
        exit,
    ));

    Ok(plain_text(relay_body(ReaderStream::new(output), name)))
}

async fn open_artifact(path: &Path) -> Result<File, RequestError> {
    let unavailable = |source: io::Error| RequestError::ArtifactUnavailable {
        path: path.display().to_string(),
        source,
    };

    let file = File::open(path).await.map_err(unavailable)?;
    let metadata = file.metadata().await.map_err(unavailable)?;
    if !metadata.is_file() {
        return Err(unavailable(io::Error::other("not a regular file")));
    }
    Ok(file)
}

fn relay_body<S>(stream: S, source: String) -> Body
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    Body::from_stream(stream.inspect_err(move |error| {
        tracing::warn!(%error, source = %source, "response relay interrupted");
    }))
}

fn plain_text(body: Body) -> Response {
    ([(header::CONTENT_TYPE, PLAIN_TEXT)], body).into_response()
}

async fn log_filter_exit(
    program: String,
    trace_id: String,
    artifact: Artifact,
    exit: BoxFuture<'static, io::Result<FilterExit>>,
) {
    let artifact = artifact.file_name();
    match exit.await {
        Ok(FilterExit::Success) => {
            tracing::debug!(%program, %trace_id, artifact, "filter finished");
        }
        Ok(FilterExit::Failed { code }) => {
            tracing::warn!(%program, %trace_id, artifact, ?code, "filter exited unsuccessfully");
        }
        Ok(FilterExit::TimedOut { after }) => {
            tracing::warn!(%program, %trace_id, artifact, ?after, "filter killed after timeout");
        }
        Err(error) => {
            tracing::warn!(%program, %trace_id, artifact, %error, "failed to wait for filter");
        }
    }
}
