pub mod linux;
pub mod windows;

use std::path::Path;

pub use linux::LinuxAlerter;
pub use windows::WindowsAlerter;

/// Per-step result of one alarm invocation.
///
/// The steps fail independently: a rejected volume call must not suppress
/// the playback attempt, and neither failure reaches the caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertOutcome {
    pub volume_set: bool,
    pub playback_started: bool,
}

impl AlertOutcome {
    pub fn fully_succeeded(&self) -> bool {
        self.volume_set && self.playback_started
    }
}

/// Drives the platform audio output for one alarm: set the output volume,
/// then play the sound file.
///
/// Implementations are best-effort. Failures are logged and recorded in the
/// outcome; control always returns to the watchdog loop.
#[async_trait::async_trait]
pub trait AudioAlerter: Send + Sync {
    /// Platform name used in logs (e.g. "linux").
    fn name(&self) -> &str;

    async fn alert(&self, sound_path: &Path, volume_level: u8) -> AlertOutcome;
}

/// Select the alerter for an OS identity, once at startup.
///
/// `os` is `std::env::consts::OS` in production. `None` means the platform
/// is unsupported, which is fatal for the caller.
pub fn platform_alerter(os: &str) -> Option<Box<dyn AudioAlerter>> {
    match os {
        "linux" => Some(Box::new(LinuxAlerter::new())),
        "windows" => Some(Box::new(WindowsAlerter::new())),
        _ => None,
    }
}

/// Run one alarm step as a child process and report whether it succeeded.
///
/// The child handle is scoped to this call: spawned, awaited, dropped.
pub(crate) async fn run_step(step: &str, program: &str, args: &[String]) -> bool {
    match tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
    {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            tracing::error!(
                step,
                program,
                exit_code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "alarm step exited with an error"
            );
            false
        }
        Err(e) => {
            tracing::error!(
                step,
                program,
                error = %e,
                "failed to launch alarm step; is the tool installed and in PATH?"
            );
            false
        }
    }
}
