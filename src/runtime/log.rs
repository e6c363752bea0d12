use std::fs::OpenOptions;
use std::path::PathBuf;

use env_logger::{Builder, Env, Target};

use crate::runtime::{Error, Result};

#[derive(Clone, Copy, Debug)]
pub struct LogLevel(pub log::LevelFilter);
impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let level = match s.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" | "warning" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" | "none" => log::LevelFilter::Off,
            _ => return Err(format!("Invalid log level: {}", s)),
        };
        Ok(LogLevel(level))
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    Path,
    Terminal,
    Discard,
}
impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mode = match s.to_lowercase().as_str() {
            "path" | "file" => LogMode::Path,
            "terminal" | "term" | "cli" => LogMode::Terminal,
            "discard" | "none" => LogMode::Discard,
            _ => return Err(format!("Invalid log mode: {}", s)),
        };
        Ok(mode)
    }
}

///////////////////////////////
/// Install the global logger. RUST_LOG, when set, takes precedence over `log_level`
pub fn setup_global_logger(
    log_level: LogLevel,
    log_mode: LogMode,
    log_path: Option<PathBuf>,
) -> Result<()> {
    let env = Env::default().default_filter_or(log_level.0.to_string());
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_secs();

    match log_mode {
        LogMode::Discard => {
            builder.filter_level(log::LevelFilter::Off);
        }
        LogMode::Terminal => {
            builder.target(Target::Stderr);
        }
        LogMode::Path => {
            let path = log_path
                .ok_or_else(|| Error::invalid_config("log mode 'path' requires --log-path"))?;
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.target(Target::Pipe(Box::new(file)));
            builder.write_style(env_logger::WriteStyle::Never);
        }
    }

    builder
        .try_init()
        .map_err(|e| Error::invalid_config(format!("logger already initialised: {}", e)))
}
