/// Validated, immutable runtime configuration for the watchdog.
///
/// All validation happens here, once, before the loop starts. The loop
/// trusts every field.
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_VOLUME_LEVEL: u8 = 15;
pub const DEFAULT_WATCH_URL: &str = "https://www.google.com";
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 1;
pub const DEFAULT_POLL_PERIOD_SECS: u64 = 60;

/// CLI log verbosity. `critical` is accepted for compatibility and
/// collapses into `error` (tracing has no level above it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directive string understood by the `tracing-subscriber` env filter.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

#[derive(Debug)]
pub struct WatchdogConfig {
    pub alarm_file: PathBuf,
    pub volume_level: u8,
    pub watch_url: String,
    pub max_failed_attempts: u32,
    pub poll_period: Duration,
    pub log_level: LogLevel,
}

impl WatchdogConfig {
    /// Validate operator-supplied values into a config the loop can trust.
    ///
    /// The volume bound (0-100) is already enforced by the argument parser.
    pub fn validate(
        alarm_file: PathBuf,
        volume_level: u8,
        watch_url: String,
        max_failed_attempts: u32,
        poll_period_secs: u64,
        log_level: LogLevel,
    ) -> Result<Self, ConfigError> {
        if !alarm_file.exists() {
            return Err(ConfigError::AlarmFileMissing { path: alarm_file });
        }
        if !alarm_file.is_file() {
            return Err(ConfigError::AlarmFileNotAFile { path: alarm_file });
        }
        if let Err(e) = reqwest::Url::parse(&watch_url) {
            return Err(ConfigError::InvalidUrl {
                url: watch_url,
                reason: e.to_string(),
            });
        }
        if max_failed_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if poll_period_secs == 0 {
            return Err(ConfigError::ZeroPeriod);
        }

        Ok(Self {
            alarm_file,
            volume_level,
            watch_url,
            max_failed_attempts,
            poll_period: Duration::from_secs(poll_period_secs),
            log_level,
        })
    }
}

/// Errors rejected at the configuration boundary. All of them are fatal
/// before the first probe.
#[derive(Debug)]
pub enum ConfigError {
    AlarmFileMissing { path: PathBuf },
    AlarmFileNotAFile { path: PathBuf },
    InvalidUrl { url: String, reason: String },
    ZeroAttempts,
    ZeroPeriod,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::AlarmFileMissing { path } => {
                write!(f, "alarm file {} does not exist", path.display())
            }
            ConfigError::AlarmFileNotAFile { path } => {
                write!(f, "alarm file {} is not a regular file", path.display())
            }
            ConfigError::InvalidUrl { url, reason } => {
                write!(f, "invalid watch URL {url}: {reason}")
            }
            ConfigError::ZeroAttempts => {
                write!(f, "--attempts must be at least 1 for the alarm to ever fire")
            }
            ConfigError::ZeroPeriod => write!(f, "--period must be at least 1 second"),
        }
    }
}

impl std::error::Error for ConfigError {}
