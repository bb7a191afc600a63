use crate::error::RecordingError;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Commands for the recorder service.
pub enum RecorderCommand {
    Start {
        path: PathBuf,
        reply: oneshot::Sender<Result<(), RecordingError>>,
    },
    /// Replies with the finished file, or `None` when no session was active.
    Stop {
        reply: oneshot::Sender<Result<Option<PathBuf>, RecordingError>>,
    },
}

/// Commands for the player service.
pub enum PlayerCommand {
    Play { path: PathBuf },
}

/// Events reported back by the player service.
pub enum PlayerEvent {
    Started,
    Finished,
    Failed(String),
}
