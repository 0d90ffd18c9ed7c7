//! INI-style configuration reader.
//!
//! Sections: `[server]` (`port`, `ip`, `html_path`, `name`),
//! `[response-headers]` (arbitrary keys, joined in file order into one
//! `Key: Value\r\n` block), `[SSL]` (`certificate`, `key`, `enabled`), and
//! `[logging]` (`file`, `level`, `pid`). Section and key names are
//! case-insensitive; `#` and `;` start comment lines.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;

const SERVER_PORT_DEFAULT: u16 = 80;
const SERVER_SSL_PORT_DEFAULT: u16 = 443;
const SERVER_IP_DEFAULT: &str = "any";
const SERVER_NAME_DEFAULT: &str = "nvhttpd";
const HTML_PATH_DEFAULT: &str = "html";
const PID_FILE_DEFAULT: &str = "/var/run/nvhttpd.pid";

/// Where log output goes, from `[logging] file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
    File(PathBuf),
}

/// Minimum level that gets logged, from `[logging] level`. `all` is an
/// alias for `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub enabled: bool,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// Validated server settings the core runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// IPv4 literal, or `any` for the unspecified address.
    pub bind_address: String,
    /// 0 means "not configured"; see [`effective_port`](Self::effective_port).
    pub port: u16,
    pub html_root: PathBuf,
    pub server_name: String,
    pub pid_file: PathBuf,
    /// Pre-joined `Key: Value\r\n` block appended to every response.
    pub extra_headers: String,
    pub tls: TlsSettings,
    pub log_level: LogLevel,
    pub log_sink: LogSink,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SERVER_IP_DEFAULT.to_string(),
            port: 0,
            html_root: PathBuf::from(HTML_PATH_DEFAULT),
            server_name: SERVER_NAME_DEFAULT.to_string(),
            pid_file: PathBuf::from(PID_FILE_DEFAULT),
            extra_headers: String::new(),
            tls: TlsSettings::default(),
            log_level: LogLevel::Debug,
            log_sink: LogSink::Stdout,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Open(PathBuf, std::io::Error),
    Syntax { line: usize, reason: &'static str },
    UnrecognizedSection { line: usize, section: String },
    UnrecognizedKey { line: usize, section: String, key: String },
    UnexpectedValue { line: usize, key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Open(path, e) => {
                write!(f, "unable to open config file {}: {}", path.display(), e)
            }
            ConfigError::Syntax { line, reason } => {
                write!(f, "line {line}: {reason}")
            }
            ConfigError::UnrecognizedSection { line, section } => {
                write!(f, "line {line}: unknown section: {section}")
            }
            ConfigError::UnrecognizedKey { line, section, key } => {
                write!(f, "line {line}: unrecognized {section} option: {key}")
            }
            ConfigError::UnexpectedValue { line, key, value } => {
                write!(f, "line {line}: invalid value for {key}: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Reads an INI-style configuration file and applies it over the
    /// built-in defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Open(path.to_path_buf(), e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut section = String::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or(ConfigError::Syntax {
                    line,
                    reason: "unterminated section header",
                })?;
                section = name.trim().to_ascii_lowercase();
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or(ConfigError::Syntax {
                line,
                reason: "expected key = value",
            })?;
            config.apply(&section, key.trim(), value.trim(), line)?;
        }

        Ok(config)
    }

    fn apply(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        line: usize,
    ) -> Result<(), ConfigError> {
        let lower_key = key.to_ascii_lowercase();
        match section {
            "server" => match lower_key.as_str() {
                "port" => {
                    self.port = value.parse().map_err(|_| ConfigError::UnexpectedValue {
                        line,
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                }
                "ip" => self.bind_address = value.to_string(),
                "html_path" => self.html_root = PathBuf::from(value),
                "name" => self.server_name = value.to_string(),
                _ => {}
            },
            "response-headers" => {
                self.extra_headers.push_str(key);
                self.extra_headers.push_str(": ");
                self.extra_headers.push_str(value);
                self.extra_headers.push_str("\r\n");
            }
            "ssl" => match lower_key.as_str() {
                "certificate" => self.tls.certificate = Some(PathBuf::from(value)),
                "key" => self.tls.key = Some(PathBuf::from(value)),
                "enabled" => {
                    self.tls.enabled =
                        parse_bool(value).ok_or(ConfigError::UnexpectedValue {
                            line,
                            key: key.to_string(),
                            value: value.to_string(),
                        })?;
                }
                _ => {
                    return Err(ConfigError::UnrecognizedKey {
                        line,
                        section: section.to_string(),
                        key: key.to_string(),
                    })
                }
            },
            "logging" => match lower_key.as_str() {
                "level" => {
                    self.log_level =
                        parse_level(value).ok_or(ConfigError::UnexpectedValue {
                            line,
                            key: key.to_string(),
                            value: value.to_string(),
                        })?;
                }
                "file" => {
                    self.log_sink = if value.eq_ignore_ascii_case("stdout") {
                        LogSink::Stdout
                    } else if value.eq_ignore_ascii_case("stderr") {
                        LogSink::Stderr
                    } else {
                        LogSink::File(PathBuf::from(value))
                    };
                }
                "pid" => self.pid_file = PathBuf::from(value),
                _ => {}
            },
            _ => {
                return Err(ConfigError::UnrecognizedSection {
                    line,
                    section: section.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Explicitly configured port, else 443 with TLS enabled, else 80.
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 {
            self.port
        } else if self.tls.enabled {
            SERVER_SSL_PORT_DEFAULT
        } else {
            SERVER_PORT_DEFAULT
        }
    }

    /// Resolves the listen address; `any` maps to the unspecified IPv4
    /// address, anything else must be a dotted-quad literal.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip = if self.bind_address.eq_ignore_ascii_case(SERVER_IP_DEFAULT) {
            Ipv4Addr::UNSPECIFIED
        } else {
            self.bind_address
                .parse::<Ipv4Addr>()
                .with_context(|| format!("invalid listen address {}", self.bind_address))?
        };
        Ok(SocketAddr::from((ip, self.effective_port())))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

fn parse_level(value: &str) -> Option<LogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" | "all" => Some(LogLevel::Trace),
        _ => None,
    }
}
