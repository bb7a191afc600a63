use crate::audio::AudioFormat;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};

/// Outcome of the microphone gate. Re-evaluated on every launch, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
    /// No input device is enumerable at all; nothing the user could grant
    /// from inside this application would change that.
    PermanentlyDenied,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }

    pub fn needs_settings(self) -> bool {
        matches!(
            self,
            PermissionState::Denied | PermissionState::PermanentlyDenied
        )
    }
}

/// Cold check: granted when the default input device already exposes a
/// usable configuration, without opening a stream.
pub fn check() -> PermissionState {
    let Some(device) = cpal::default_host().default_input_device() else {
        return PermissionState::Unknown;
    };
    match device.default_input_config() {
        Ok(_) => PermissionState::Granted,
        Err(_) => PermissionState::Unknown,
    }
}

/// Actively request access by opening a short-lived input stream. On
/// platforms with a microphone consent prompt (macOS) this is what raises
/// it; elsewhere it verifies the device can actually be captured from.
pub fn request() -> PermissionState {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        return PermissionState::PermanentlyDenied;
    };

    match open_probe_stream(&device) {
        Ok(_stream) => PermissionState::Granted,
        Err(e) => {
            tracing::warn!("microphone probe failed: {e:#}");
            PermissionState::Denied
        }
    }
}

/// The gate: an already-granted check resolves immediately; otherwise one
/// request is made. A denial is final for this session, there is no retry
/// loop and no re-check after a settings round-trip.
pub fn check_and_request() -> PermissionState {
    match check() {
        PermissionState::Granted => PermissionState::Granted,
        _ => request(),
    }
}

fn open_probe_stream(device: &cpal::Device) -> Result<cpal::Stream> {
    let format = AudioFormat::SPEECH;
    let config = StreamConfig {
        channels: format.channels,
        sample_rate: SampleRate(format.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &config,
            |_data: &[f32], _info: &cpal::InputCallbackInfo| {},
            |err| {
                tracing::debug!("probe stream error: {err}");
            },
            None,
        )
        .context("failed to build probe stream")?;

    // Some hosts only surface consent errors once the stream runs.
    stream.play().context("probe stream refused to start")?;

    Ok(stream)
}

/// Open the platform's sound/privacy settings, the place where microphone
/// access is granted back to the application.
pub fn open_sound_settings() -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        open::that("x-apple.systempreferences:com.apple.preference.security?Privacy_Microphone")
            .context("failed to open the privacy settings pane")
    }

    #[cfg(target_os = "windows")]
    {
        open::that("ms-settings:privacy-microphone")
            .context("failed to open the privacy settings page")
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::process::Command::new("gnome-control-center")
            .arg("sound")
            .spawn()
            .context("failed to launch the sound settings panel")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_granted_unblocks_the_screen() {
        assert!(PermissionState::Granted.is_granted());
        assert!(!PermissionState::Unknown.is_granted());
        assert!(!PermissionState::Denied.is_granted());
        assert!(!PermissionState::PermanentlyDenied.is_granted());
    }

    #[test]
    fn test_denials_route_to_settings() {
        assert!(PermissionState::Denied.needs_settings());
        assert!(PermissionState::PermanentlyDenied.needs_settings());
        assert!(!PermissionState::Granted.needs_settings());
        assert!(!PermissionState::Unknown.needs_settings());
    }
}
