use crate::audio::AudioFormat;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::messages::PlayerEvent;
use crate::permission;
use crate::services::{Player, PlayerHandle, Recorder, RecorderHandle};
use crate::session::Session;
use crate::ui;

use anyhow::Result;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

const STATUS_IDLE: &str = "Not recording";

pub struct App {
    catalog: Catalog,
    session: Session,
    recorder: RecorderHandle,
    player: PlayerHandle,
    input_rx: mpsc::Receiver<Event>,
    player_rx: mpsc::Receiver<PlayerEvent>,
    list_state: ListState,
    status: String,
    should_quit: bool,
}

impl App {
    /// Must be called inside a `LocalSet`: the recorder and player services
    /// own `!Send` platform resources and are spawned with `spawn_local`.
    pub fn new(config: Config) -> Self {
        let catalog = Catalog::new(config.recordings_dir.clone());
        let recorder = Self::spawn_recorder();
        let (player, player_rx) = Self::spawn_player();
        let input_rx = Self::spawn_input_reader();

        Self {
            catalog,
            session: Session::new(),
            recorder,
            player,
            input_rx,
            player_rx,
            list_state: ListState::default(),
            status: STATUS_IDLE.to_string(),
            should_quit: false,
        }
    }

    fn spawn_recorder() -> RecorderHandle {
        let (audio_tx, audio_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let recorder = Recorder::new(AudioFormat::SPEECH, cmd_rx, audio_rx, audio_tx);
        tokio::task::spawn_local(recorder.run());
        RecorderHandle::new(cmd_tx)
    }

    fn spawn_player() -> (PlayerHandle, mpsc::Receiver<PlayerEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let player = Player::new(cmd_rx, event_tx);
        tokio::task::spawn_local(player.run());
        (PlayerHandle::new(cmd_tx), event_rx)
    }

    /// Terminal input on a plain thread: `event::read` blocks, and the
    /// thread must not keep the runtime alive on shutdown.
    fn spawn_input_reader() -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(64);
        std::thread::spawn(move || {
            loop {
                match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        rx
    }

    pub async fn run(mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;

        let granted = self.run_gate(&mut terminal).await;
        if !matches!(granted, Ok(true)) {
            ui::restore_terminal()?;
            return granted.map(|_| ());
        }

        self.catalog.refresh();
        self.clamp_selection();

        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal()?;
        result
    }

    /// Resolve the microphone gate under a splash screen. Returns whether
    /// the application should proceed to the main screen.
    async fn run_gate(&mut self, terminal: &mut ui::Screen) -> Result<bool> {
        terminal.draw(ui::draw_gate_splash)?;

        let state = tokio::task::spawn_blocking(permission::check_and_request).await?;
        if state.is_granted() {
            tracing::info!("microphone access granted");
            return Ok(true);
        }

        tracing::warn!(?state, "microphone access unavailable");
        debug_assert!(state.needs_settings());
        terminal.draw(ui::draw_permission_modal)?;

        // The modal ends the application however it is dismissed; `s` opens
        // the system settings on the way out. No re-check in this session.
        while let Some(ev) = self.input_rx.recv().await {
            let Event::Key(key) = ev else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('s') {
                if let Err(e) = permission::open_sound_settings() {
                    tracing::warn!("failed to open sound settings: {e:#}");
                }
            }
            break;
        }
        Ok(false)
    }

    async fn event_loop(&mut self, terminal: &mut ui::Screen) -> Result<()> {
        loop {
            terminal.draw(|frame| {
                ui::draw(
                    frame,
                    &self.status,
                    self.session.is_recording(),
                    self.catalog.entries(),
                    &mut self.list_state,
                )
            })?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(ev) = self.input_rx.recv() => self.handle_input(ev).await,
                Some(ev) = self.player_rx.recv() => self.handle_player_event(ev),
                else => break,
            }
        }

        // Finalize an in-flight recording so the file on disk is complete.
        if self.session.is_recording() {
            if let Err(e) = self.recorder.stop().await {
                tracing::error!("failed to stop recording on exit: {e}");
            }
        }
        Ok(())
    }

    async fn handle_input(&mut self, ev: Event) {
        let Event::Key(key) = ev else { return };
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => self.toggle_recording().await,
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Enter => self.play_selected().await,
            _ => {}
        }
    }

    async fn toggle_recording(&mut self) {
        if self.session.is_recording() {
            let stopped = self.recorder.stop().await;
            self.session.end_recording();
            match stopped {
                Ok(Some(path)) => {
                    tracing::info!(path = %path.display(), "recording stopped");
                    self.status = "Recording stopped".to_string();
                }
                Ok(None) => self.status = STATUS_IDLE.to_string(),
                Err(e) => {
                    tracing::error!("failed to stop recording: {e}");
                    self.status = format!("Stop failed: {e}");
                }
            }
            // The catalog is refreshed after every stop, including the no-op
            // and error paths.
            self.catalog.refresh();
            self.clamp_selection();
            return;
        }

        if let Err(denied) = self.session.begin_recording() {
            self.status = denied.to_string();
            return;
        }

        let name = self.catalog.new_display_name();
        let path = self.catalog.dir().join(&name);
        match self.recorder.start(path).await {
            Ok(()) => {
                tracing::info!(%name, "recording started");
                self.status = "Recording...".to_string();
            }
            Err(e) => {
                // Surfaced, not swallowed: the failure reaches the status
                // line and the session stays idle.
                self.session.end_recording();
                tracing::error!("failed to start recording: {e}");
                self.status = format!("Recording failed: {e}");
            }
        }
    }

    async fn play_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let Some(name) = self.catalog.entries().get(index).cloned() else {
            return;
        };

        // A name with no backing file is a silent no-op: no session is
        // created and nothing is reported.
        let Some(path) = self.catalog.resolve(&name) else {
            tracing::debug!(%name, "playback target no longer present");
            return;
        };

        if let Err(denied) = self.session.begin_playback() {
            self.status = denied.to_string();
            return;
        }

        self.player.play(path).await;
        self.status = format!("Playing {name}");
    }

    fn handle_player_event(&mut self, ev: PlayerEvent) {
        match ev {
            PlayerEvent::Started => self.session.playback_started(),
            PlayerEvent::Finished => {
                self.session.playback_finished();
                if !self.session.is_recording() {
                    self.status = STATUS_IDLE.to_string();
                }
            }
            PlayerEvent::Failed(reason) => {
                self.session.playback_finished();
                tracing::error!("playback failed: {reason}");
                self.status = format!("Playback failed: {reason}");
            }
        }
    }

    fn select_previous(&mut self) {
        if self.catalog.entries().is_empty() {
            return;
        }
        let index = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(index.saturating_sub(1)));
    }

    fn select_next(&mut self) {
        let len = self.catalog.entries().len();
        if len == 0 {
            return;
        }
        let index = self.list_state.selected().map_or(0, |i| i + 1);
        self.list_state.select(Some(index.min(len - 1)));
    }

    /// Keep the selection valid across refreshes.
    fn clamp_selection(&mut self) {
        let len = self.catalog.entries().len();
        if len == 0 {
            self.list_state.select(None);
        } else {
            let index = self.list_state.selected().unwrap_or(0).min(len - 1);
            self.list_state.select(Some(index));
        }
    }
}
