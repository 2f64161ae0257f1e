/// Windows alarm path: Core Audio endpoint volume via PowerShell, playback
/// through the default file association.
use std::path::Path;

use super::{run_step, AlertOutcome, AudioAlerter};

pub struct WindowsAlerter {
    shell_program: String,
    launcher_program: String,
}

impl WindowsAlerter {
    pub fn new() -> Self {
        Self {
            shell_program: "powershell".to_string(),
            launcher_program: "cmd".to_string(),
        }
    }

    #[cfg(test)]
    fn with_programs(shell: &str, launcher: &str) -> Self {
        Self {
            shell_program: shell.to_string(),
            launcher_program: launcher.to_string(),
        }
    }
}

impl Default for WindowsAlerter {
    fn default() -> Self {
        Self::new()
    }
}

/// PowerShell shim over the Core Audio endpoint-volume interface. The
/// 0-100 level is mapped onto the 0.0-1.0 master scalar before formatting.
const SET_VOLUME_TEMPLATE: &str = r#"
Add-Type -TypeDefinition @'
using System;
using System.Runtime.InteropServices;
[Guid("5CDF2C82-841E-4546-9722-0CF74078229A"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IAudioEndpointVolume {
    int _0(); int _1(); int _2(); int _3();
    int SetMasterVolumeLevelScalar(float level, Guid eventContext);
}
[Guid("D666063F-1587-4E43-81F1-B948E807363F"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IMMDevice {
    int Activate(ref Guid iid, int clsCtx, IntPtr activationParams, out IAudioEndpointVolume endpointVolume);
}
[Guid("A95664D2-9614-4F35-A746-DE8DB63617E6"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IMMDeviceEnumerator {
    int _0();
    int GetDefaultAudioEndpoint(int dataFlow, int role, out IMMDevice device);
}
[ComImport, Guid("BCDE0395-E52F-467C-8E3D-C4579291692E")]
class MMDeviceEnumerator { }
public static class MasterVolume {
    public static void Set(float level) {
        var enumerator = (IMMDeviceEnumerator)(new MMDeviceEnumerator());
        IMMDevice device;
        Marshal.ThrowExceptionForHR(enumerator.GetDefaultAudioEndpoint(0, 1, out device));
        IAudioEndpointVolume volume;
        var iid = typeof(IAudioEndpointVolume).GUID;
        Marshal.ThrowExceptionForHR(device.Activate(ref iid, 23, IntPtr.Zero, out volume));
        Marshal.ThrowExceptionForHR(volume.SetMasterVolumeLevelScalar(level, Guid.Empty));
    }
}
'@
[MasterVolume]::Set({scalar})
"#;

/// `powershell -NoProfile -NonInteractive -Command <script>`
fn volume_args(volume_level: u8) -> Vec<String> {
    let scalar = f32::from(volume_level) / 100.0;
    vec![
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-Command".to_string(),
        SET_VOLUME_TEMPLATE.replace("{scalar}", &format!("{scalar:.2}")),
    ]
}

/// `cmd /C start "" <file>` — hands the file to its default association
/// and returns without waiting for playback to finish.
fn playback_args(sound_path: &Path) -> Vec<String> {
    vec![
        "/C".to_string(),
        "start".to_string(),
        String::new(),
        sound_path.display().to_string(),
    ]
}

#[async_trait::async_trait]
impl AudioAlerter for WindowsAlerter {
    fn name(&self) -> &str {
        "windows"
    }

    async fn alert(&self, sound_path: &Path, volume_level: u8) -> AlertOutcome {
        let volume_set = run_step(
            "set-volume",
            &self.shell_program,
            &volume_args(volume_level),
        )
        .await;
        if volume_set {
            tracing::info!(volume_level, "volume set");
        }

        // Playback is attempted whether or not the volume call worked
        tracing::info!(file = %sound_path.display(), "playing alarm sound");
        let playback_started = run_step(
            "playback",
            &self.launcher_program,
            &playback_args(sound_path),
        )
        .await;

        AlertOutcome {
            volume_set,
            playback_started,
        }
    }
}
