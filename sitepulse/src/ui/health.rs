//! Server health panel: live uptime plus the snapshot's counters.

use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::types::HealthSnapshot;
use crate::ui::util::or_pending;
use crate::uptime::{format_age, UptimeDisplay};

pub fn health_lines(
    uptime: &UptimeDisplay,
    snap: Option<&HealthSnapshot>,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    vec![
        ("Uptime", uptime.to_string()),
        ("Requests", or_pending(snap.and_then(|s| s.total_requests))),
        ("Sessions", or_pending(snap.and_then(|s| s.active_sessions))),
        ("Latency", or_pending(snap.and_then(|s| s.latency.as_deref()))),
        ("Version", or_pending(snap.and_then(|s| s.version.as_deref()))),
        ("Processed in", or_pending(snap.and_then(|s| s.time_to_process.as_deref()))),
        (
            "Updated",
            or_pending(snap.map(|s| format_age(s.timestamp, now))),
        ),
    ]
}

pub fn draw_health(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    uptime: &UptimeDisplay,
    snap: Option<&HealthSnapshot>,
    now: DateTime<Utc>,
) {
    let lines: Vec<Line> = health_lines(uptime, snap, now)
        .into_iter()
        .map(|(k, v)| {
            Line::from(vec![
                Span::styled(format!("{k:<13}"), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(v),
            ])
        })
        .collect();
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Server"));
    f.render_widget(p, area);
}
