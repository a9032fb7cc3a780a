use crate::server::ServerConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Serve(ServerConfig),
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("invalid value for environment variable {name}: {value}")]
    InvalidEnvValue { name: String, value: String },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

/// Parses `args` (including the program name) into an invocation.
///
/// `port_env` is the raw `PORT` variable; flags win over it and an empty value counts
/// as unset.
pub fn parse_invocation(
    args: &[String],
    port_env: Option<&str>,
) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut config = ServerConfig::default();
    if let Some(raw) = port_env.map(str::trim).filter(|raw| !raw.is_empty()) {
        config.port = raw.parse::<u16>().map_err(|_| CliParseError::InvalidEnvValue {
            name: "PORT".to_string(),
            value: raw.to_string(),
        })?;
    }

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .ok_or_else(|| CliParseError::MissingFlagValue(flag.to_string()))
        };
        match arg.as_str() {
            "--port" | "-p" => {
                let value = value_for("--port")?;
                config.port = parse_number_flag("--port", value)?;
            }
            "--logs-dir" => {
                config.logs_dir = PathBuf::from(value_for("--logs-dir")?);
            }
            "--static-dir" => {
                config.static_dir = PathBuf::from(value_for("--static-dir")?);
            }
            "--kataribe" => {
                config.kataribe_program = PathBuf::from(value_for("--kataribe")?);
            }
            "--alp" => {
                config.alp_program = PathBuf::from(value_for("--alp")?);
            }
            "--parse-log" => {
                config.parse_log_program = PathBuf::from(value_for("--parse-log")?);
            }
            "--filter-timeout-secs" => {
                let value = value_for("--filter-timeout-secs")?;
                let secs: u64 = parse_number_flag("--filter-timeout-secs", value)?;
                if secs == 0 {
                    return Err(CliParseError::InvalidFlagValue {
                        flag: "--filter-timeout-secs".to_string(),
                        value: value.to_string(),
                    });
                }
                config.filter_timeout = Some(Duration::from_secs(secs));
            }
            _ if arg.starts_with('-') => {
                return Err(CliParseError::UnknownFlag(arg.to_string()));
            }
            _ => {
                return Err(CliParseError::UnexpectedArgument(arg.to_string()));
            }
        }
    }

    Ok(CliInvocation::Serve(config))
}

fn parse_number_flag<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, CliParseError> {
    value
        .parse::<T>()
        .map_err(|_| CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}

pub fn help_text() -> String {
    format!(
        "tracebox {version}\n\
         Browse benchmark trace sessions and run log summarizers over them.\n\
         \n\
         USAGE:\n  tracebox [FLAGS]\n\
         \n\
         FLAGS:\n\
         \x20 -p, --port <PORT>              listen port (env PORT, default 8080)\n\
         \x20     --logs-dir <DIR>           trace sessions root (default ./logs)\n\
         \x20     --static-dir <DIR>         static assets (default ./static)\n\
         \x20     --kataribe <PATH>          access.log summarizer (default ./kataribe)\n\
         \x20     --alp <PATH>               access.log summarizer (default ./alp.sh)\n\
         \x20     --parse-log <PATH>         sql.log / perf.log parser (default ./parse_log.py)\n\
         \x20     --filter-timeout-secs <N>  kill filters running longer than N seconds\n\
         \x20 -h, --help                     print this help\n\
         \x20 -V, --version                  print version\n\
         \n\
         Logging is controlled by RUST_LOG (default: tracebox=info,tower_http=info).\n",
        version = env!("CARGO_PKG_VERSION"),
    )
}
