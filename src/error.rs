use std::path::PathBuf;
use thiserror::Error;

/// Failures of the recording path.
///
/// Every variant is surfaced in the status line as well as logged; a failed
/// start leaves the session idle.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("no input device available")]
    NoDevice,

    #[error("cannot open destination {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start capture: {0}")]
    Capture(String),

    #[error("cannot encode audio: {0}")]
    Encode(String),

    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("recorder service is not running")]
    ChannelClosed,
}
