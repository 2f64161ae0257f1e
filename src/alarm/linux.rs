/// Linux alarm path: ALSA mixer for volume, PulseAudio for playback.
use std::path::Path;

use super::{run_step, AlertOutcome, AudioAlerter};

pub struct LinuxAlerter {
    mixer_program: String,
    player_program: String,
}

impl LinuxAlerter {
    pub fn new() -> Self {
        Self {
            mixer_program: "amixer".to_string(),
            player_program: "paplay".to_string(),
        }
    }

    #[cfg(test)]
    fn with_programs(mixer: &str, player: &str) -> Self {
        Self {
            mixer_program: mixer.to_string(),
            player_program: player.to_string(),
        }
    }
}

impl Default for LinuxAlerter {
    fn default() -> Self {
        Self::new()
    }
}

/// `amixer sset Master {volume}%`
fn volume_args(volume_level: u8) -> Vec<String> {
    vec![
        "sset".to_string(),
        "Master".to_string(),
        format!("{volume_level}%"),
    ]
}

/// `paplay {file}` — blocks until playback completes.
fn playback_args(sound_path: &Path) -> Vec<String> {
    vec![sound_path.display().to_string()]
}

#[async_trait::async_trait]
impl AudioAlerter for LinuxAlerter {
    fn name(&self) -> &str {
        "linux"
    }

    async fn alert(&self, sound_path: &Path, volume_level: u8) -> AlertOutcome {
        let volume_set =
            run_step("set-volume", &self.mixer_program, &volume_args(volume_level)).await;
        if volume_set {
            tracing::info!(volume_level, "volume set");
        }

        // Playback is attempted whether or not the volume call worked
        tracing::info!(file = %sound_path.display(), "playing alarm sound");
        let playback_started =
            run_step("playback", &self.player_program, &playback_args(sound_path)).await;

        AlertOutcome {
            volume_set,
            playback_started,
        }
    }
}
