//! Top header with connection status, and the footer for stream errors.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ws::SessionStatus;

pub fn status_text(status: &SessionStatus) -> (String, Color) {
    match status {
        SessionStatus::Connecting => ("connecting...".into(), Color::Yellow),
        SessionStatus::Open => ("live".into(), Color::Green),
        SessionStatus::Disconnected { .. } => ("disconnected".into(), Color::Red),
    }
}

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, host: &str, status: &SessionStatus) {
    let (text, color) = status_text(status);
    let line = Line::from(vec![
        Span::raw(format!("sitepulse — {host} | ")),
        Span::styled(text, Style::default().fg(color)),
        Span::raw("  (press 'r' to refresh, 'q' to quit)"),
    ]);
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}

/// Shown next to the charts, never instead of them.
pub fn draw_footer(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    status: &SessionStatus,
    frame_error: Option<&str>,
) {
    let line = match (status, frame_error) {
        (SessionStatus::Disconnected { reason }, _) => Line::from(Span::styled(
            format!("stream lost: {reason} (showing last known data)"),
            Style::default().fg(Color::Red),
        )),
        (_, Some(err)) => Line::from(Span::styled(
            format!("dropped frame: {err}"),
            Style::default().fg(Color::Yellow),
        )),
        _ => Line::default(),
    };
    f.render_widget(Paragraph::new(line), area);
}
