mod cli;
mod domain;
mod infra;
mod server;

use crate::cli::CliInvocation;
use std::io::{self, Write};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Debug, Error)]
enum MainError {
    #[error("failed to start runtime: {0}")]
    Runtime(io::Error),

    #[error(transparent)]
    Serve(#[from] crate::server::ServeError),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let port_env = std::env::var("PORT").ok();
    let invocation = match crate::cli::parse_invocation(&args, port_env.as_deref()) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            let _ = write!(err, "{}", crate::cli::help_text());
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            let mut out = io::stdout().lock();
            let _ = write!(out, "{}", crate::cli::help_text());
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Serve(config) => {
            init_tracing();
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(MainError::Runtime)?;
            rt.block_on(crate::server::run_http_server(config))?;
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracebox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
