use crate::audio::{AudioCapture, AudioFormat, AudioSink, WavSink};
use crate::error::RecordingError;
use crate::messages::RecorderCommand;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Owns the single active recording session.
///
/// The service:
/// - creates the destination WAV file (the catalog entry) before capture,
/// - manages the cpal stream lifecycle,
/// - streams captured chunks into the sink,
/// - rejects a start while a session is active.
///
/// Holds a `cpal::Stream`, which is `!Send`, so it must be spawned on a
/// `LocalSet` with `tokio::task::spawn_local`.
pub struct Recorder {
    format: AudioFormat,
    cmd_rx: mpsc::Receiver<RecorderCommand>,
    audio_rx: mpsc::Receiver<Vec<f32>>,
    audio_tx: mpsc::Sender<Vec<f32>>,
    sink: Option<Box<dyn AudioSink + Send>>,
    stream: Option<cpal::Stream>,
    destination: Option<PathBuf>,
    recording: bool,
}

impl Recorder {
    pub fn new(
        format: AudioFormat,
        cmd_rx: mpsc::Receiver<RecorderCommand>,
        audio_rx: mpsc::Receiver<Vec<f32>>,
        audio_tx: mpsc::Sender<Vec<f32>>,
    ) -> Self {
        Self {
            format,
            cmd_rx,
            audio_rx,
            audio_tx,
            sink: None,
            stream: None,
            destination: None,
            recording: false,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.cmd_rx.recv() => {
                    self.handle_command(cmd).await;
                }

                Some(chunk) = self.audio_rx.recv(), if self.recording => {
                    if let Err(e) = self.write_chunk(chunk) {
                        tracing::error!("failed to write audio chunk: {e}");
                        self.recording = false;
                    }
                }

                else => break,
            }
        }
    }

    fn write_chunk(&mut self, chunk: Vec<f32>) -> Result<(), RecordingError> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_chunk(chunk),
            None => Ok(()),
        }
    }

    async fn handle_command(&mut self, cmd: RecorderCommand) {
        match cmd {
            RecorderCommand::Start { path, reply } => {
                let _ = reply.send(self.start_session(path));
            }
            RecorderCommand::Stop { reply } => {
                let _ = reply.send(self.stop_session().await);
            }
        }
    }

    fn start_session(&mut self, path: PathBuf) -> Result<(), RecordingError> {
        if self.recording {
            return Err(RecordingError::AlreadyRecording);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RecordingError::Destination {
                path: path.clone(),
                source,
            })?;
        }

        // The destination exists on disk from here on; a capture failure
        // leaves an empty entry behind, mirroring the register-then-write
        // order of the storage contract.
        let sink = WavSink::create(&path, self.format)?;

        let stream = AudioCapture::start(self.format, self.audio_tx.clone())?;

        self.sink = Some(Box::new(sink));
        self.stream = Some(stream);
        self.destination = Some(path);
        self.recording = true;
        tracing::info!("recording session started");
        Ok(())
    }

    async fn stop_session(&mut self) -> Result<Option<PathBuf>, RecordingError> {
        if self.sink.is_none() {
            // No session: a stop is a no-op, the caller still refreshes.
            self.recording = false;
            return Ok(None);
        }

        self.recording = false;

        // Dropping the stream stops the device callback.
        self.stream = None;

        // Drain chunks already in flight so the tail of the recording lands
        // in the file.
        while let Ok(chunk) = self.audio_rx.try_recv() {
            if let Err(e) = self.write_chunk(chunk) {
                tracing::error!("failed to write audio chunk during drain: {e}");
                break;
            }
        }

        // Fresh channel for the next session. Dropping the old receiver makes
        // the capture pump's send fail, which is its exit signal.
        let (new_audio_tx, new_audio_rx) = mpsc::channel(64);
        self.audio_tx = new_audio_tx;
        self.audio_rx = new_audio_rx;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let destination = self.destination.take();
        let finalized = match self.sink.take() {
            Some(mut sink) => sink.finalize().await,
            None => Ok(()),
        };

        tracing::info!("recording session stopped");
        finalized.map(|()| destination)
    }
}

/// Handle for communicating with the recorder service.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderCommand>,
}

impl RecorderHandle {
    pub fn new(tx: mpsc::Sender<RecorderCommand>) -> Self {
        Self { tx }
    }

    pub async fn start(&self, path: PathBuf) -> Result<(), RecordingError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(RecorderCommand::Start { path, reply })
            .await
            .map_err(|_| RecordingError::ChannelClosed)?;

        rx.await.map_err(|_| RecordingError::ChannelClosed)?
    }

    pub async fn stop(&self) -> Result<Option<PathBuf>, RecordingError> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(RecorderCommand::Stop { reply })
            .await
            .map_err(|_| RecordingError::ChannelClosed)?;

        rx.await.map_err(|_| RecordingError::ChannelClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_recorder() -> RecorderHandle {
        let (audio_tx, audio_rx) = mpsc::channel(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let recorder = Recorder::new(AudioFormat::SPEECH, cmd_rx, audio_rx, audio_tx);
        tokio::task::spawn_local(recorder.run());
        RecorderHandle::new(cmd_tx)
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_noop() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let handle = spawn_recorder();
                let stopped = handle.stop().await.unwrap();
                assert_eq!(stopped, None);
                // And again: still a no-op, still no error.
                assert_eq!(handle.stop().await.unwrap(), None);
            })
            .await;
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_surfaced() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let dir = tempfile::tempdir().unwrap();
                let blocker = dir.path().join("blocker");
                std::fs::write(&blocker, b"not a directory").unwrap();

                let handle = spawn_recorder();
                let err = handle
                    .start(blocker.join("sub").join("note.wav"))
                    .await
                    .unwrap_err();
                assert!(matches!(err, RecordingError::Destination { .. }));

                // The failed start left no session behind.
                assert_eq!(handle.stop().await.unwrap(), None);
            })
            .await;
    }
}
