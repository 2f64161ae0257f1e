/// The watchdog loop and its failure-counting state machine.
///
/// One tick = probe, state update, optional alarm, optional delay. Ticks
/// are strictly sequential; each completes fully before the next probe.
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::alarm::AudioAlerter;
use crate::config::WatchdogConfig;
use crate::probe::{HttpProber, ProbeOutcome};

/// What one tick decided, given the probe outcome and the running count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// Reachable while already healthy: nothing to do.
    Idle,
    /// Reachable after one or more failures: connection re-established.
    Recovered,
    /// Unreachable but still below the alarm threshold.
    Warn { failures: u32 },
    /// Unreachable at or past the threshold: sound the alarm.
    Alarm { failures: u32 },
}

impl TickAction {
    /// The inter-poll delay is skipped exactly on alarm ticks: while the
    /// network stays down the alarm repeats back-to-back until recovery.
    pub fn pauses(&self) -> bool {
        !matches!(self, TickAction::Alarm { .. })
    }
}

/// Failure-counting state machine. Owned exclusively by the loop.
///
/// The counter equals the length of the current run of consecutive failed
/// probes: +1 per failure, reset to 0 on any success, never decremented
/// otherwise.
pub struct FailureTracker {
    threshold: u32,
    consecutive_failures: u32,
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
        }
    }

    /// Apply one probe outcome and decide the tick's action.
    ///
    /// The alarm fires on every tick where the counter is at or past the
    /// threshold, not only on the crossing tick.
    pub fn observe(&mut self, outcome: &ProbeOutcome) -> TickAction {
        match outcome {
            ProbeOutcome::Reachable => {
                let was_degraded = self.consecutive_failures > 0;
                self.consecutive_failures = 0;
                if was_degraded {
                    TickAction::Recovered
                } else {
                    TickAction::Idle
                }
            }
            ProbeOutcome::Unreachable { .. } => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.threshold {
                    TickAction::Alarm {
                        failures: self.consecutive_failures,
                    }
                } else {
                    TickAction::Warn {
                        failures: self.consecutive_failures,
                    }
                }
            }
        }
    }

    #[allow(dead_code)]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// The watchdog itself: prober, alerter, and the failure counter.
pub struct Watchdog {
    config: WatchdogConfig,
    prober: HttpProber,
    alerter: Box<dyn AudioAlerter>,
    tracker: FailureTracker,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig, prober: HttpProber, alerter: Box<dyn AudioAlerter>) -> Self {
        let tracker = FailureTracker::new(config.max_failed_attempts);
        Self {
            config,
            prober,
            alerter,
            tracker,
        }
    }

    /// One full tick: probe, update state, fire the alarm if due.
    /// Pacing is the caller's job.
    async fn tick(&mut self) -> TickAction {
        let outcome = self.prober.probe(&self.config.watch_url).await;
        if let ProbeOutcome::Unreachable { reason } = &outcome {
            error!("{reason}");
        }

        let action = self.tracker.observe(&outcome);
        match &action {
            TickAction::Idle => {}
            TickAction::Recovered => info!("connection established"),
            TickAction::Warn { failures } => {
                warn!(failures, "network is down");
            }
            TickAction::Alarm { failures } => {
                warn!(failures, "network is down");
                error!("failed to establish internet connection, starting the alarm");
                let outcome = self
                    .alerter
                    .alert(&self.config.alarm_file, self.config.volume_level)
                    .await;
                if !outcome.fully_succeeded() {
                    error!(
                        volume_set = outcome.volume_set,
                        playback_started = outcome.playback_started,
                        "alarm did not fully run"
                    );
                }
            }
        }
        action
    }

    /// Run until the process is terminated. There is no graceful-shutdown
    /// path; the only transient resources are the per-call audio children.
    pub async fn run(mut self) {
        loop {
            let action = self.tick().await;
            if action.pauses() {
                sleep(self.config.poll_period).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlertOutcome;
    use crate::config::LogLevel;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn unreachable_outcome() -> ProbeOutcome {
        ProbeOutcome::Unreachable {
            reason: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_counter_tracks_consecutive_failures() {
        let mut tracker = FailureTracker::new(10);
        assert_eq!(tracker.consecutive_failures(), 0);

        tracker.observe(&unreachable_outcome());
        tracker.observe(&unreachable_outcome());
        tracker.observe(&unreachable_outcome());
        assert_eq!(tracker.consecutive_failures(), 3);

        tracker.observe(&ProbeOutcome::Reachable);
        assert_eq!(tracker.consecutive_failures(), 0);

        tracker.observe(&unreachable_outcome());
        assert_eq!(tracker.consecutive_failures(), 1);
    }

    #[test]
    fn test_idle_while_healthy() {
        let mut tracker = FailureTracker::new(3);
        assert_eq!(tracker.observe(&ProbeOutcome::Reachable), TickAction::Idle);
        assert_eq!(tracker.observe(&ProbeOutcome::Reachable), TickAction::Idle);
    }

    #[test]
    fn test_recovered_only_after_failures() {
        let mut tracker = FailureTracker::new(3);
        tracker.observe(&unreachable_outcome());
        assert_eq!(
            tracker.observe(&ProbeOutcome::Reachable),
            TickAction::Recovered
        );
        // Already reset; the next success is plain idle
        assert_eq!(tracker.observe(&ProbeOutcome::Reachable), TickAction::Idle);
    }

    #[test]
    fn test_warn_below_threshold() {
        let mut tracker = FailureTracker::new(3);
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Warn { failures: 1 }
        );
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Warn { failures: 2 }
        );
    }

    #[test]
    fn test_alarm_at_threshold_and_every_tick_after() {
        let mut tracker = FailureTracker::new(3);
        tracker.observe(&unreachable_outcome());
        tracker.observe(&unreachable_outcome());
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Alarm { failures: 3 }
        );
        // Still down: keeps alarming, not just on the crossing tick
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Alarm { failures: 4 }
        );
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Alarm { failures: 5 }
        );
    }

    #[test]
    fn test_threshold_one_alarms_immediately() {
        let mut tracker = FailureTracker::new(1);
        assert_eq!(
            tracker.observe(&unreachable_outcome()),
            TickAction::Alarm { failures: 1 }
        );
    }

    #[test]
    fn test_threshold_three_recovery_sequence() {
        // [Unreachable, Unreachable, Unreachable, Reachable]:
        // alarm on tick 3 only, reset after tick 4.
        let mut tracker = FailureTracker::new(3);
        let actions = [
            tracker.observe(&unreachable_outcome()),
            tracker.observe(&unreachable_outcome()),
            tracker.observe(&unreachable_outcome()),
            tracker.observe(&ProbeOutcome::Reachable),
        ];
        assert_eq!(actions[0], TickAction::Warn { failures: 1 });
        assert_eq!(actions[1], TickAction::Warn { failures: 2 });
        assert_eq!(actions[2], TickAction::Alarm { failures: 3 });
        assert_eq!(actions[3], TickAction::Recovered);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn test_pause_skipped_exactly_on_alarm_ticks() {
        assert!(TickAction::Idle.pauses());
        assert!(TickAction::Recovered.pauses());
        assert!(TickAction::Warn { failures: 2 }.pauses());
        assert!(!TickAction::Alarm { failures: 1 }.pauses());
        assert!(!TickAction::Alarm { failures: 7 }.pauses());
    }

    /// Alerter stub counting invocations, for loop-level tests.
    struct RecordingAlerter {
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl AudioAlerter for RecordingAlerter {
        fn name(&self) -> &str {
            "recording"
        }

        async fn alert(&self, _sound_path: &Path, _volume_level: u8) -> AlertOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AlertOutcome {
                volume_set: true,
                playback_started: true,
            }
        }
    }

    fn test_config(watch_url: String, max_failed_attempts: u32) -> WatchdogConfig {
        WatchdogConfig {
            alarm_file: PathBuf::from("alarm.wav"),
            volume_level: 15,
            watch_url,
            max_failed_attempts,
            poll_period: Duration::from_secs(60),
            log_level: LogLevel::Info,
        }
    }

    fn watchdog_with_counter(
        watch_url: String,
        max_failed_attempts: u32,
    ) -> (Watchdog, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let alerter = RecordingAlerter {
            calls: Arc::clone(&calls),
        };
        let watchdog = Watchdog::new(
            test_config(watch_url, max_failed_attempts),
            HttpProber::new().unwrap(),
            Box::new(alerter),
        );
        (watchdog, calls)
    }

    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_tick_alarms_on_unreachable_target() {
        let (mut watchdog, calls) = watchdog_with_counter(dead_url().await, 1);

        assert_eq!(watchdog.tick().await, TickAction::Alarm { failures: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Still down: alarms again on the very next tick
        assert_eq!(watchdog.tick().await, TickAction::Alarm { failures: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tick_below_threshold_does_not_alarm() {
        let (mut watchdog, calls) = watchdog_with_counter(dead_url().await, 2);

        assert_eq!(watchdog.tick().await, TickAction::Warn { failures: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tick_is_idle_while_target_answers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
                .await;
        });

        let (mut watchdog, calls) = watchdog_with_counter(format!("http://{addr}/"), 1);
        assert_eq!(watchdog.tick().await, TickAction::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
