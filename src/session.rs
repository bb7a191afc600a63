use std::fmt;

/// Recording side of the session: `Idle -> Recording -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Idle,
    Recording,
}

/// Playback side of the session: `Idle -> Preparing -> Playing -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Idle,
    Preparing,
    Playing,
}

/// Reason a requested transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    AlreadyRecording,
    PlaybackPreparing,
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denied::AlreadyRecording => write!(f, "Already recording"),
            Denied::PlaybackPreparing => write!(f, "Playback is still starting"),
        }
    }
}

/// Explicit session state machine.
///
/// Recording and playback are independent: the screen can play a file while a
/// capture is running. Conflicting requests are rejected, never queued: a
/// second start while recording, or a play while a decoder is still being
/// prepared. Playing while already playing is accepted and replaces the
/// current session.
#[derive(Debug)]
pub struct Session {
    record: RecordState,
    play: PlayState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            record: RecordState::Idle,
            play: PlayState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.record == RecordState::Recording
    }

    pub fn begin_recording(&mut self) -> Result<(), Denied> {
        if self.record == RecordState::Recording {
            return Err(Denied::AlreadyRecording);
        }
        self.record = RecordState::Recording;
        Ok(())
    }

    /// Always lands in `Idle`, whether or not a session was active.
    pub fn end_recording(&mut self) {
        self.record = RecordState::Idle;
    }

    pub fn begin_playback(&mut self) -> Result<(), Denied> {
        if self.play == PlayState::Preparing {
            return Err(Denied::PlaybackPreparing);
        }
        self.play = PlayState::Preparing;
        Ok(())
    }

    pub fn playback_started(&mut self) {
        self.play = PlayState::Playing;
    }

    pub fn playback_finished(&mut self) {
        self.play = PlayState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_start_is_rejected() {
        let mut session = Session::new();
        assert!(session.begin_recording().is_ok());
        assert_eq!(session.begin_recording(), Err(Denied::AlreadyRecording));
        assert!(session.is_recording());
    }

    #[test]
    fn test_end_recording_without_start_is_harmless() {
        let mut session = Session::new();
        session.end_recording();
        assert!(!session.is_recording());
        assert!(session.begin_recording().is_ok());
    }

    #[test]
    fn test_play_while_preparing_is_rejected() {
        let mut session = Session::new();
        assert!(session.begin_playback().is_ok());
        assert_eq!(session.begin_playback(), Err(Denied::PlaybackPreparing));
    }

    #[test]
    fn test_play_while_playing_replaces() {
        let mut session = Session::new();
        session.begin_playback().unwrap();
        session.playback_started();
        assert!(session.begin_playback().is_ok());
    }

    #[test]
    fn test_recording_and_playback_are_independent() {
        let mut session = Session::new();
        session.begin_recording().unwrap();
        assert!(session.begin_playback().is_ok());
        session.playback_started();
        session.playback_finished();
        assert!(session.is_recording());
    }
}
