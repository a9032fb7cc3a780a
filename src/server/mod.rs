mod error;
mod listing;
mod stream;

pub use error::*;
pub use listing::*;
pub use stream::*;

use crate::domain::{Artifact, FilterKind};
use crate::infra::{FilterProgram, ProcessFilter};
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub logs_dir: PathBuf,
    pub static_dir: PathBuf,
    pub kataribe_program: PathBuf,
    pub alp_program: PathBuf,
    pub parse_log_program: PathBuf,
    pub filter_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            logs_dir: PathBuf::from("./logs"),
            static_dir: PathBuf::from("./static"),
            kataribe_program: PathBuf::from("./kataribe"),
            alp_program: PathBuf::from("./alp.sh"),
            parse_log_program: PathBuf::from("./parse_log.py"),
            filter_timeout: None,
        }
    }
}

/// The programs behind each filtered view. SQL and perf logs share one parser.
#[derive(Clone)]
pub struct FilterPrograms {
    pub kataribe: Arc<dyn FilterProgram>,
    pub alp: Arc<dyn FilterProgram>,
    pub parse_log: Arc<dyn FilterProgram>,
}

impl FilterPrograms {
    pub fn from_config(config: &ServerConfig) -> Self {
        let process = |program: &Path| -> Arc<dyn FilterProgram> {
            Arc::new(ProcessFilter::new(program, config.filter_timeout))
        };
        Self {
            kataribe: process(config.kataribe_program.as_path()),
            alp: process(config.alp_program.as_path()),
            parse_log: process(config.parse_log_program.as_path()),
        }
    }

    pub fn program(&self, kind: FilterKind) -> &dyn FilterProgram {
        match kind {
            FilterKind::Kataribe => self.kataribe.as_ref(),
            FilterKind::Alp => self.alp.as_ref(),
            FilterKind::SqlParse | FilterKind::PerfParse => self.parse_log.as_ref(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub logs_dir: Arc<Path>,
    pub filters: FilterPrograms,
}

#[derive(Debug, Default, Deserialize)]
pub struct TraceQuery {
    pub id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

pub fn raw_view_path(artifact: Artifact) -> &'static str {
    match artifact {
        Artifact::AccessLog => "/accesslog/",
        Artifact::SqlLog => "/sqllog/",
        Artifact::PerfLog => "/perflog/",
        Artifact::VmStat => "/vmstat/",
    }
}

pub fn filter_view_path(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Kataribe => "/kataribe/",
        FilterKind::Alp => "/alp/",
        FilterKind::SqlParse => "/sqlparse/",
        FilterKind::PerfParse => "/perfparse/",
    }
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/api/traces", get(traces_json));

    for artifact in Artifact::ALL {
        router = router.route(
            raw_view_path(artifact),
            get(
                move |State(state): State<AppState>, Query(query): Query<TraceQuery>| async move {
                    raw_view(state, query, artifact).await
                },
            ),
        );
    }
    for kind in FilterKind::ALL {
        router = router.route(
            filter_view_path(kind),
            get(
                move |State(state): State<AppState>, Query(query): Query<TraceQuery>| async move {
                    filter_view(state, query, kind).await
                },
            ),
        );
    }

    router
        .nest_service("/static", ServeDir::new(static_dir))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn raw_view(state: AppState, query: TraceQuery, artifact: Artifact) -> Response {
    let trace_id = query.id.unwrap_or_default();
    stream_artifact(&state.logs_dir, &trace_id, artifact)
        .await
        .into_response()
}

async fn filter_view(state: AppState, query: TraceQuery, kind: FilterKind) -> Response {
    let trace_id = query.id.unwrap_or_default();
    let program = state.filters.program(kind);
    run_filter(&state.logs_dir, &trace_id, kind.artifact(), program)
        .await
        .into_response()
}

pub async fn run_http_server(config: ServerConfig) -> Result<(), ServeError> {
    run_http_server_on(SocketAddr::from(([0, 0, 0, 0], config.port)), config).await
}

pub async fn run_http_server_on(addr: SocketAddr, config: ServerConfig) -> Result<(), ServeError> {
    let state = AppState {
        logs_dir: Arc::from(config.logs_dir.as_path()),
        filters: FilterPrograms::from_config(&config),
    };
    let app = build_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!(
        %addr,
        logs_dir = %config.logs_dir.display(),
        filter_timeout = ?config.filter_timeout,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
