use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::intake::normalizer::DEFAULT_CONTROL_FIELD;

const DEFAULT_RECIPIENT: &str = "info@jslawgroup.net";
const DEFAULT_SENDER: &str = "Intake Desk <no-reply@jslawgroup.net>";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match environment {
            AppEnvironment::Production => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let intake = IntakeConfig {
            submissions_dir: env::var("INTAKE_SUBMISSIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("submissions")),
            control_field: env::var("INTAKE_CONTROL_FIELD")
                .unwrap_or_else(|_| DEFAULT_CONTROL_FIELD.to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            intake,
            mail: MailConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where submissions land and which form field is never persisted.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub submissions_dir: PathBuf,
    pub control_field: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub recipients: Vec<String>,
    pub sender: String,
    /// `None` when no relay is configured.
    pub smtp: Option<SmtpConfig>,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let recipients = parse_recipients(
            &env::var("INTAKE_NOTIFY_TO").unwrap_or_else(|_| DEFAULT_RECIPIENT.to_string()),
        );
        if recipients.is_empty() {
            return Err(ConfigError::MissingRecipients);
        }

        let sender = env::var("INTAKE_MAIL_FROM").unwrap_or_else(|_| DEFAULT_SENDER.to_string());

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig::from_env(host.trim())?),
            _ => None,
        };

        Ok(Self {
            recipients,
            sender,
            smtp,
        })
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl SmtpConfig {
    fn from_env(host: &str) -> Result<Self, ConfigError> {
        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;
        let timeout_secs = env::var("SMTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        Ok(Self {
            host: host.to_string(),
            port,
            username: env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty()),
            password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSmtpPort,
    InvalidTimeout,
    MissingRecipients,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidTimeout => {
                write!(f, "SMTP_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::MissingRecipients => {
                write!(f, "INTAKE_NOTIFY_TO must list at least one address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::InvalidTimeout
            | ConfigError::MissingRecipients => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 13] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "INTAKE_SUBMISSIONS_DIR",
        "INTAKE_CONTROL_FIELD",
        "INTAKE_NOTIFY_TO",
        "INTAKE_MAIL_FROM",
        "SMTP_HOST",
        "SMTP_PORT",
        "SMTP_USERNAME",
        "SMTP_PASSWORD",
        "SMTP_TIMEOUT_SECS",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.intake.submissions_dir, PathBuf::from("submissions"));
        assert_eq!(config.intake.control_field, "csrf_token");
        assert_eq!(config.mail.recipients, vec![DEFAULT_RECIPIENT.to_string()]);
        assert!(config.mail.smtp.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5000));
    }

    #[test]
    fn reads_relay_and_distribution_list() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("INTAKE_NOTIFY_TO", "intake@example.com, partner@example.com,");
        env::set_var("SMTP_HOST", "smtp.example.com");
        env::set_var("SMTP_PASSWORD", "hunter2");
        env::set_var("SMTP_TIMEOUT_SECS", "10");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.telemetry.format, LogFormat::Json);
        assert_eq!(
            config.mail.recipients,
            vec!["intake@example.com".to_string(), "partner@example.com".to_string()]
        );
        let smtp = config.mail.smtp.expect("relay configured");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.timeout, Duration::from_secs(10));
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }

    #[test]
    fn rejects_zero_timeout_and_empty_recipients() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SMTP_HOST", "smtp.example.com");
        env::set_var("SMTP_TIMEOUT_SECS", "0");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidTimeout)));

        reset_env();
        env::set_var("INTAKE_NOTIFY_TO", " , ");
        assert!(matches!(AppConfig::load(), Err(ConfigError::MissingRecipients)));
        reset_env();
    }
}
