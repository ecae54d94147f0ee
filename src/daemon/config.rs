//! The configuration of the daemon.

use std::{env, fmt, fs, io};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use log::{LevelFilter, error, info};
use serde::de;
use serde::{Deserialize, Deserializer};
use url::Url;
use crate::constants::{
    CMSADMIN_ENV_ADMIN_TOKEN, CMSADMIN_ENV_LOG_LEVEL, CMSADMIN_SERVER_APP,
    HTTP_POST_LIMIT_API,
};


//------------ ConfigDefaults ------------------------------------------------

pub struct ConfigDefaults;

impl ConfigDefaults {
    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    fn port() -> u16 {
        3080
    }

    fn storage_uri() -> Url {
        // A literal that is known to parse.
        Url::parse("local:///var/lib/cmsadmin/cs.json").expect("valid url")
    }

    fn admin_token() -> String {
        env::var(CMSADMIN_ENV_ADMIN_TOKEN).unwrap_or_default()
    }

    fn log_level() -> LevelFilter {
        match env::var(CMSADMIN_ENV_LOG_LEVEL) {
            Ok(level) => match LevelFilter::from_str(&level) {
                Ok(level) => level,
                Err(_) => {
                    eprintln!(
                        "Unrecognized value for log level in env var {}, \
                         using 'info'",
                        CMSADMIN_ENV_LOG_LEVEL
                    );
                    LevelFilter::Info
                }
            },
            _ => LevelFilter::Info,
        }
    }

    fn log_type() -> LogType {
        LogType::File
    }

    fn log_file() -> PathBuf {
        PathBuf::from("./cmsadmin.log")
    }

    fn syslog_facility() -> String {
        "daemon".into()
    }

    fn post_limit_api() -> u64 {
        HTTP_POST_LIMIT_API
    }
}


//------------ Config --------------------------------------------------------

/// Global configuration for the daemon.
///
/// This is read from a TOML file. Settings missing from the file use the
/// defaults from [`ConfigDefaults`], some of which come from the
/// environment.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "ConfigDefaults::ip")]
    pub ip: IpAddr,

    #[serde(default = "ConfigDefaults::port")]
    pub port: u16,

    #[serde(default = "ConfigDefaults::storage_uri")]
    pub storage_uri: Url,

    #[serde(default = "ConfigDefaults::admin_token")]
    pub admin_token: String,

    #[serde(
        default = "ConfigDefaults::log_level",
        deserialize_with = "de_level_filter"
    )]
    pub log_level: LevelFilter,

    #[serde(default = "ConfigDefaults::log_type")]
    pub log_type: LogType,

    #[serde(default = "ConfigDefaults::log_file")]
    pub log_file: PathBuf,

    #[serde(default = "ConfigDefaults::syslog_facility")]
    pub syslog_facility: String,

    #[serde(default = "ConfigDefaults::post_limit_api")]
    pub post_limit_api: u64,

    pub pid_file: Option<PathBuf>,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Creates a config for testing.
    ///
    /// It listens on an ephemeral port and logs to stderr.
    pub fn test(storage_uri: Url, admin_token: &str) -> Self {
        Config {
            ip: ConfigDefaults::ip(),
            port: 0,
            storage_uri,
            admin_token: admin_token.into(),
            log_level: LevelFilter::Debug,
            log_type: LogType::Stderr,
            log_file: ConfigDefaults::log_file(),
            syslog_facility: ConfigDefaults::syslog_facility(),
            post_limit_api: ConfigDefaults::post_limit_api(),
            pid_file: None,
        }
    }
}

/// # Reading and checking
impl Config {
    /// Creates the config at startup.
    ///
    /// Reads the file, initializes logging and verifies the result.
    pub fn create(config_file: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_config(config_file).map_err(|err| {
            ConfigError::Other(format!(
                "Error parsing config file: {}, error: {}",
                config_file.display(), err
            ))
        })?;
        config.init_logging()?;
        info!(
            "{} uses configuration file: {}",
            CMSADMIN_SERVER_APP, config_file.display()
        );
        config.verify().map_err(|err| {
            ConfigError::Other(format!(
                "Error in config file: {}, error: {}",
                config_file.display(), err
            ))
        })?;
        Ok(config)
    }

    pub fn read_config(file: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(file)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        if self.admin_token.is_empty() {
            return Err(ConfigError::Other(format!(
                "missing admin_token, set it in the config file or in \
                 the {CMSADMIN_ENV_ADMIN_TOKEN} environment variable"
            )))
        }
        if self.post_limit_api == 0 {
            return Err(ConfigError::other("post_limit_api must not be 0"))
        }
        match self.storage_uri.scheme() {
            "local" | "file" | "memory" => { }
            scheme => {
                return Err(ConfigError::Other(format!(
                    "unsupported storage_uri scheme '{scheme}'"
                )))
            }
        }
        Ok(())
    }
}

/// # Logging
impl Config {
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_type {
            LogType::File => self.file_logger(&self.log_file),
            LogType::Stderr => self.stderr_logger(),
            LogType::Syslog => self.syslog_logger(),
        }
    }

    /// Creates a stderr logger.
    fn stderr_logger(&self) -> Result<(), ConfigError> {
        self.fern_logger()
            .chain(io::stderr())
            .apply()
            .map_err(|err| {
                ConfigError::Other(
                    format!("Failed to init stderr logging: {err}")
                )
            })
    }

    /// Creates a file logger using the file provided by `path`.
    fn file_logger(&self, path: &Path) -> Result<(), ConfigError> {
        let file = match fern::log_file(path) {
            Ok(file) => file,
            Err(err) => {
                let error_string = format!(
                    "Failed to open log file '{}': {}", path.display(), err
                );
                error!("{}", error_string.as_str());
                return Err(ConfigError::Other(error_string));
            }
        };
        self.fern_logger()
            .chain(file)
            .apply()
            .map_err(|err| {
                ConfigError::Other(
                    format!("Failed to init file logging: {err}")
                )
            })
    }

    /// Creates a syslog logger.
    #[cfg(unix)]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        let facility = syslog::Facility::from_str(
            &self.syslog_facility
        ).map_err(|_| ConfigError::other("Invalid syslog_facility"))?;
        let process = env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_name()
                    .and_then(std::ffi::OsStr::to_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| String::from("cmsadmind"));
        let formatter = syslog::Formatter3164 {
            facility,
            hostname: None,
            process,
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter.clone())
            .or_else(|_| {
                syslog::tcp(formatter.clone(), ("127.0.0.1", 601))
            })
            .or_else(|_| {
                syslog::udp(formatter, ("127.0.0.1", 0), ("127.0.0.1", 514))
            });
        match logger {
            Ok(logger) => {
                self.fern_logger()
                    .chain(logger)
                    .apply()
                    .map_err(|err| {
                        ConfigError::Other(
                            format!("Failed to init syslog: {err}")
                        )
                    })
            }
            Err(err) => {
                Err(ConfigError::Other(
                    format!("Cannot connect to syslog: {err}")
                ))
            }
        }
    }

    #[cfg(not(unix))]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        Err(ConfigError::other("syslog is only supported on Unix systems"))
    }

    /// Creates and returns a fern logger with log level tweaks.
    fn fern_logger(&self) -> fern::Dispatch {
        // Suppress overly noisy logging.
        let framework_level = self.log_level.min(LevelFilter::Warn);
        let store_level = self.log_level.min(LevelFilter::Debug);

        let show_target = self.log_level == LevelFilter::Trace
                       || self.log_level == LevelFilter::Debug;
        fern::Dispatch::new()
            .format(move |out, message, record| {
                if show_target {
                    out.finish(format_args!(
                        "{} [{}] [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                }
                else {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        message
                    ))
                }
            })
            .level(self.log_level)
            .level_for("hyper", framework_level)
            .level_for("hyper_util", framework_level)
            .level_for("mio", framework_level)
            .level_for("reqwest", framework_level)
            .level_for("want", framework_level)
            .level_for("cmsadmin::commons::confstore", store_level)
            .level_for("cmsadmin::commons::file", store_level)
    }
}


//------------ LogType -------------------------------------------------------

/// The target to log to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogType {
    Stderr,
    File,
    Syslog,
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(d: D) -> Result<LogType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(d)?;
        match string.as_str() {
            "stderr" => Ok(LogType::Stderr),
            "file" => Ok(LogType::File),
            "syslog" => Ok(LogType::Syslog),
            _ => Err(de::Error::custom(format!(
                "expected \"stderr\", \"file\", or \"syslog\", \
                 found: \"{string}\""
            ))),
        }
    }
}

fn de_level_filter<'de, D>(d: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let string = String::deserialize(d)?;
    LevelFilter::from_str(&string).map_err(de::Error::custom)
}


//------------ ConfigError ---------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    TomlError(toml::de::Error),
    Other(String),
}

impl ConfigError {
    pub fn other(s: &str) -> ConfigError {
        ConfigError::Other(s.to_string())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(err) => err.fmt(f),
            ConfigError::TomlError(err) => err.fmt(f),
            ConfigError::Other(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for ConfigError { }

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err)
    }
}


//============ Tests =========================================================
