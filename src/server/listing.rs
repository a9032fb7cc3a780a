use crate::domain::{Artifact, FilterKind, TraceSession};
use crate::infra::scan_trace_sessions;
use crate::server::{AppState, RequestError, filter_view_path, raw_view_path};
use axum::Json;
use axum::extract::State;
use axum::response::Html;
use humansize::{DECIMAL, format_size};
use serde::Serialize;
use std::fmt::Write as _;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TraceSessionView {
    pub id: String,
    pub exec_at: String,
    pub access_log_size: u64,
    pub sql_log_size: u64,
    pub perf_log_size: u64,
}

impl From<&TraceSession> for TraceSessionView {
    fn from(session: &TraceSession) -> Self {
        Self {
            id: session.id.to_string(),
            exec_at: session
                .exec_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| session.id.to_string()),
            access_log_size: session.access_log_size,
            sql_log_size: session.sql_log_size,
            perf_log_size: session.perf_log_size,
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, RequestError> {
    let sessions = load_sessions(&state).await?;
    Ok(Html(render_index(&sessions)))
}

pub async fn traces_json(
    State(state): State<AppState>,
) -> Result<Json<Vec<TraceSessionView>>, RequestError> {
    let sessions = load_sessions(&state).await?;
    Ok(Json(sessions.iter().map(TraceSessionView::from).collect()))
}

async fn load_sessions(state: &AppState) -> Result<Vec<TraceSession>, RequestError> {
    let logs_dir = state.logs_dir.clone();
    let sessions = tokio::task::spawn_blocking(move || scan_trace_sessions(&logs_dir)).await??;
    Ok(sessions)
}

pub fn render_index(sessions: &[TraceSession]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>traces</title>\n<link rel=\"stylesheet\" href=\"/static/style.css\">\n\
         </head>\n<body>\n<h1>traces</h1>\n",
    );

    if sessions.is_empty() {
        html.push_str("<p>no traces yet</p>\n</body>\n</html>\n");
        return html;
    }

    html.push_str(
        "<table>\n<tr><th>id</th><th>executed at (JST)</th><th>access.log</th>\
         <th>sql.log</th><th>perf.log</th><th>views</th></tr>\n",
    );
    for session in sessions {
        let _ = writeln!(
            html,
            "<tr><td>{id}</td><td>{exec_at}</td><td>{access}</td><td>{sql}</td><td>{perf}</td><td>{links}</td></tr>",
            id = session.id,
            exec_at = format_exec_at(session),
            access = format_size(session.access_log_size, DECIMAL),
            sql = format_size(session.sql_log_size, DECIMAL),
            perf = format_size(session.perf_log_size, DECIMAL),
            links = render_links(session),
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn format_exec_at(session: &TraceSession) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    session
        .exec_at
        .format(format)
        .unwrap_or_else(|_| session.id.to_string())
}

fn render_links(session: &TraceSession) -> String {
    let filters = FilterKind::ALL.iter().map(|kind| {
        let path = filter_view_path(*kind);
        format!("<a href=\"{path}?id={}\">{}</a>", session.id, kind.label())
    });
    let raws = Artifact::ALL.iter().map(|artifact| {
        let path = raw_view_path(*artifact);
        format!("<a href=\"{path}?id={}\">{}</a>", session.id, artifact.file_name())
    });
    filters.chain(raws).collect::<Vec<_>>().join(" ")
}
