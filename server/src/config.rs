/*
Server settings. A key=value file (parsed as an ini file without sections) is
layered under environment variables, so LINE_SERVER_PORT=9000 overrides PORT
from the file. Every key is optional.
*/

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

use config::{Config, Environment, File, FileFormat};
use line_server_net::data_types::PortNumber;
use log::LevelFilter;

pub const DEFAULT_CONFIG_FILE: &str = "config.txt";
pub const ENVIRONMENT_PREFIX: &str = "LINE_SERVER";

pub const DEFAULT_PORT: PortNumber = 8080;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_BACKLOG: i32 = 100;

const KEY_PORT: &str = "port";
const KEY_WORKER_COUNT: &str = "thread_pool_size";
const KEY_BACKLOG: &str = "max_connections";
const KEY_LOG_LEVEL: &str = "log_level";
const KEY_LOG_FILE: &str = "log_file";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: PortNumber,
    pub worker_count: usize,
    /// Length of the queue of connections waiting to be accepted
    pub backlog: i32,
    pub log_level: LevelFilter,
    /// When set, log records are appended to this file as well as stdout
    pub log_file: Option<PathBuf>,
}

/// Where the settings came from, so that it can be logged once logging is running
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

#[derive(Debug, PartialEq)]
pub enum ConfigErr {
    Load { msg: String },
    InvalidValue { key: String, value: String },
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigErr::Load { msg } => write!(f, "failed to load configuration: {msg}"),
            ConfigErr::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for {}", key.to_uppercase())
            }
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigErr>;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            worker_count: DEFAULT_WORKER_COUNT,
            backlog: DEFAULT_BACKLOG,
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }
}

impl ServerConfig {
    /// Reads the file if it exists, then applies LINE_SERVER_* environment variables
    pub fn load(path: &Path) -> ConfigResult<(Self, ConfigSource)> {
        Self::load_with_prefix(path, ENVIRONMENT_PREFIX)
    }

    fn load_with_prefix(path: &Path, prefix: &str) -> ConfigResult<(Self, ConfigSource)> {
        let mut builder = Config::builder();

        let source = if path.is_file() {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini));
            ConfigSource::File(path.to_path_buf())
        } else {
            ConfigSource::Defaults
        };

        let settings = builder
            .add_source(Environment::with_prefix(prefix))
            .build()
            .and_then(|config| config.try_deserialize::<HashMap<String, String>>())
            .map_err(|e| ConfigErr::Load { msg: e.to_string() })?;

        let settings: HashMap<String, String> = settings
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        Ok((Self::from_settings(&settings)?, source))
    }

    /// Builds a configuration from lower case keys, using defaults for missing keys
    pub fn from_settings(settings: &HashMap<String, String>) -> ConfigResult<Self> {
        let defaults = Self::default();

        let log_file = settings
            .get(KEY_LOG_FILE)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let backlog = parse_number(settings, KEY_BACKLOG, defaults.backlog)?;
        if backlog <= 0 {
            return Err(invalid_value(KEY_BACKLOG, &backlog.to_string()));
        }

        Ok(Self {
            port: parse_number(settings, KEY_PORT, defaults.port)?,
            worker_count: parse_number(settings, KEY_WORKER_COUNT, defaults.worker_count)?,
            backlog,
            log_level: settings
                .get(KEY_LOG_LEVEL)
                .map(|value| parse_log_level(value))
                .unwrap_or(defaults.log_level),
            log_file,
        })
    }
}

fn parse_number<T: FromStr>(settings: &HashMap<String, String>, key: &str, default: T) -> ConfigResult<T> {
    match settings.get(key) {
        Some(value) => value.trim().parse().map_err(|_| invalid_value(key, value)),
        None => Ok(default),
    }
}

/// Unrecognized levels fall back to INFO
pub fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_uppercase().as_str() {
        "TRACE" => LevelFilter::Trace,
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigErr {
    ConfigErr::InvalidValue {
        key: String::from(key),
        value: String::from(value),
    }
}
