mod alarm;
mod config;
mod probe;
mod watchdog;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{LogLevel, WatchdogConfig};
use probe::HttpProber;
use watchdog::Watchdog;

/// Connectivity watchdog: probe a URL on a fixed period and sound a local
/// alarm while it stays unreachable.
#[derive(Parser, Debug)]
#[command(name = "netalarm", version, about)]
pub struct Cli {
    /// Path to the alarm audio file
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Alarm volume (0-100)
    #[arg(
        short,
        long,
        default_value_t = config::DEFAULT_VOLUME_LEVEL,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    volume: u8,

    /// URL probed to test connectivity
    #[arg(short, long, default_value = config::DEFAULT_WATCH_URL)]
    url: String,

    /// Consecutive failed probes before the alarm fires
    #[arg(short, long, default_value_t = config::DEFAULT_MAX_FAILED_ATTEMPTS)]
    attempts: u32,

    /// Seconds between probes
    #[arg(short, long, default_value_t = config::DEFAULT_POLL_PERIOD_SECS)]
    period: u64,

    /// Log verbosity (RUST_LOG overrides when set)
    #[arg(short = 'l', long, value_enum, ignore_case = true, default_value = "info")]
    loglevel: LogLevel,

    /// Fire the alarm once to verify the audio path, then exit
    #[arg(long)]
    test_alarm: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.loglevel.as_directive())),
        )
        .with_target(false)
        .init();

    let config = match WatchdogConfig::validate(
        cli.file,
        cli.volume,
        cli.url,
        cli.attempts,
        cli.period,
        cli.loglevel,
    ) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let os = std::env::consts::OS;
    let Some(alerter) = alarm::platform_alerter(os) else {
        error!(os, "unsupported platform, exiting");
        return ExitCode::FAILURE;
    };
    tracing::debug!(alerter = alerter.name(), "platform alerter selected");

    info!(version = env!("CARGO_PKG_VERSION"), os, "netalarm starting");
    info!(url = %config.watch_url, "watching URL");
    info!(
        file = %config.alarm_file.display(),
        volume = config.volume_level,
        attempts = config.max_failed_attempts,
        period_secs = config.poll_period.as_secs(),
        "alarm configuration"
    );

    if cli.test_alarm {
        info!("test mode, firing the alarm once");
        let outcome = alerter
            .alert(&config.alarm_file, config.volume_level)
            .await;
        return if outcome.fully_succeeded() {
            info!("alarm test succeeded");
            ExitCode::SUCCESS
        } else {
            error!(
                volume_set = outcome.volume_set,
                playback_started = outcome.playback_started,
                "alarm test failed"
            );
            ExitCode::FAILURE
        };
    }

    let prober = match HttpProber::new() {
        Ok(prober) => prober,
        Err(e) => {
            error!(error = %e, "failed to build the HTTP client");
            return ExitCode::from(2);
        }
    };

    Watchdog::new(config, prober, alerter).run().await;
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["netalarm", "--file", "alarm.wav"]).unwrap();
        assert_eq!(cli.volume, 15);
        assert_eq!(cli.url, "https://www.google.com");
        assert_eq!(cli.attempts, 1);
        assert_eq!(cli.period, 60);
        assert_eq!(cli.loglevel, LogLevel::Info);
        assert!(!cli.test_alarm);
    }

    #[test]
    fn test_cli_rejects_volume_above_range() {
        assert!(Cli::try_parse_from(["netalarm", "-f", "alarm.wav", "-v", "101"]).is_err());
        assert!(Cli::try_parse_from(["netalarm", "-f", "alarm.wav", "-v", "100"]).is_ok());
    }

    #[test]
    fn test_cli_loglevel_is_case_insensitive() {
        let cli = Cli::try_parse_from(["netalarm", "-f", "alarm.wav", "-l", "WARNING"]).unwrap();
        assert_eq!(cli.loglevel, LogLevel::Warning);
    }

    #[test]
    fn test_cli_requires_the_alarm_file() {
        assert!(Cli::try_parse_from(["netalarm"]).is_err());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::try_parse_from([
            "netalarm", "-f", "a.wav", "-v", "30", "-u", "https://example.com", "-a", "3", "-p",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.volume, 30);
        assert_eq!(cli.url, "https://example.com");
        assert_eq!(cli.attempts, 3);
        assert_eq!(cli.period, 10);
    }
}
