use anyhow::{Context, Result};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

pub type Screen = Terminal<CrosstermBackend<Stdout>>;

pub fn setup_terminal() -> Result<Screen> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")
}

pub fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen).context("failed to leave alternate screen")?;
    Ok(())
}

/// The one screen: status, record toggle hint, and the recording list.
pub fn draw(
    frame: &mut Frame,
    status: &str,
    recording: bool,
    entries: &[String],
    list_state: &mut ListState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(frame.area());

    let status_style = if recording {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let status_line = Paragraph::new(Line::styled(format!("Status: {status}"), status_style))
        .block(Block::default().borders(Borders::ALL).title("voxnote"));
    frame.render_widget(status_line, chunks[0]);

    let toggle = if recording {
        "stop recording"
    } else {
        "start recording"
    };
    let hints = Paragraph::new(format!(
        " space {toggle}   \u{2191}/\u{2193} select   enter play   q quit"
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, chunks[1]);

    let list_block = Block::default().borders(Borders::ALL).title("Recordings");
    if entries.is_empty() {
        let empty = Paragraph::new("No recordings yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(list_block);
        frame.render_widget(empty, chunks[2]);
        return;
    }

    let items: Vec<ListItem> = entries.iter().map(|name| ListItem::new(name.as_str())).collect();
    let list = List::new(items)
        .block(list_block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[2], list_state);
}

/// Shown while the microphone gate is still being resolved.
pub fn draw_gate_splash(frame: &mut Frame) {
    let area = centered_rect(40, 3, frame.area());
    let splash = Paragraph::new("Checking microphone...")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("voxnote"));
    frame.render_widget(splash, area);
}

/// Modal for the denied path. Any key dismisses it and ends the
/// application; `s` opens the system sound settings first.
pub fn draw_permission_modal(frame: &mut Frame) {
    let area = centered_rect(56, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from("Microphone access is unavailable."),
        Line::from("Grant it in the system sound settings, then relaunch."),
        Line::from(""),
        Line::from(Span::styled(
            " s  open settings and quit    any other key  quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let modal = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Permission required"),
        );
    frame.render_widget(modal, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_centered() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(60, 10, area);
        assert_eq!(rect, Rect::new(20, 15, 60, 10));
    }

    #[test]
    fn test_centered_rect_clamps_to_small_areas() {
        let area = Rect::new(0, 0, 20, 5);
        let rect = centered_rect(60, 10, area);
        assert_eq!(rect, Rect::new(0, 0, 20, 5));
    }
}
