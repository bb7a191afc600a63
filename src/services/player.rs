use crate::messages::{PlayerCommand, PlayerEvent};
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// How often an active sink is checked for exhaustion.
const FINISH_POLL: Duration = Duration::from_millis(200);

/// Owns the single active playback session.
///
/// Playing a file stops and replaces whatever was playing before. The
/// preparation outcome and the end of playback are reported through the
/// event channel.
///
/// Holds a rodio `OutputStream`, which is `!Send`, so it must be spawned on
/// a `LocalSet` with `tokio::task::spawn_local`.
pub struct Player {
    cmd_rx: mpsc::Receiver<PlayerCommand>,
    event_tx: mpsc::Sender<PlayerEvent>,
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl Player {
    pub fn new(cmd_rx: mpsc::Receiver<PlayerCommand>, event_tx: mpsc::Sender<PlayerEvent>) -> Self {
        Self {
            cmd_rx,
            event_tx,
            stream: None,
            sink: None,
        }
    }

    pub async fn run(mut self) {
        let mut poll = tokio::time::interval(FINISH_POLL);

        loop {
            tokio::select! {
                Some(cmd) = self.cmd_rx.recv() => match cmd {
                    PlayerCommand::Play { path } => self.start_playback(&path).await,
                },

                _ = poll.tick(), if self.sink.is_some() => {
                    if self.sink.as_ref().is_some_and(Sink::empty) {
                        self.reset();
                        let _ = self.event_tx.send(PlayerEvent::Finished).await;
                    }
                }

                else => break,
            }
        }
    }

    async fn start_playback(&mut self, path: &Path) {
        // Replace any prior session before touching the new file.
        self.reset();

        match Self::open(path) {
            Ok((stream, sink)) => {
                tracing::info!(path = %path.display(), "playback started");
                self.stream = Some(stream);
                self.sink = Some(sink);
                let _ = self.event_tx.send(PlayerEvent::Started).await;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "playback failed: {e:#}");
                let _ = self.event_tx.send(PlayerEvent::Failed(format!("{e}"))).await;
            }
        }
    }

    fn open(path: &Path) -> Result<(OutputStream, Sink)> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let stream =
            OutputStreamBuilder::open_default_stream().context("failed to open output stream")?;
        let sink = rodio::play(stream.mixer(), BufReader::new(file))
            .context("failed to start decoding")?;

        Ok((stream, sink))
    }

    fn reset(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.stream = None;
    }
}

/// Handle for communicating with the player service.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    pub fn new(tx: mpsc::Sender<PlayerCommand>) -> Self {
        Self { tx }
    }

    pub async fn play(&self, path: PathBuf) {
        if self
            .tx
            .send(PlayerCommand::Play { path })
            .await
            .is_err()
        {
            tracing::error!("player service is not running");
        }
    }
}
