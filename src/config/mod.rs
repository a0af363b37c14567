//! Configuration module - command line and environment parsing

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::time::{BROADCAST_INTERVAL_MS, TICK_INTERVAL_MS};

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Directory holding index.html, style.css and main.js
    pub static_root: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Simulation tick interval
    pub tick_interval: Duration,
    /// Snapshot broadcast interval
    pub broadcast_interval: Duration,
}

impl Config {
    /// Load configuration from `<port> <root>` positional arguments and the
    /// process environment. `args` excludes the program name.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        Self::from_sources(args, |key| env::var(key).ok())
    }

    /// Same as [`Config::from_args`] with an explicit environment lookup
    pub fn from_sources<I, F>(args: I, var: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter();

        let port: u16 = args
            .next()
            .ok_or(ConfigError::MissingArg("port"))?
            .parse()
            .map_err(|_| ConfigError::Invalid("port"))?;

        let root = args.next().ok_or(ConfigError::MissingArg("root"))?;
        // Relative roots resolve against the working directory
        let static_root = env::current_dir()
            .map(|cwd| cwd.join(&root))
            .unwrap_or_else(|_| PathBuf::from(&root));

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        Ok(Self {
            server_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            static_root,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            tick_interval: interval_ms(&var, "TICK_INTERVAL_MS", TICK_INTERVAL_MS)?,
            broadcast_interval: interval_ms(&var, "BROADCAST_INTERVAL_MS", BROADCAST_INTERVAL_MS)?,
        })
    }
}

fn interval_ms<F>(var: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ms = match var(key) {
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid(key))?,
        None => default,
    };
    if ms == 0 {
        return Err(ConfigError::Invalid(key));
    }
    Ok(Duration::from_millis(ms))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required argument: <{0}>")]
    MissingArg(&'static str),

    #[error("Invalid value for {0}")]
    Invalid(&'static str),
}
