//! Memory gauge and used-memory history.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge, Sparkline},
};

use crate::history::{mem_used_series, SampleBuffer};
use crate::types::Sample;
use crate::ui::util::{human, spark_data, window_width};

/// `(label, percent)`; placeholders before data and for inconsistent samples.
pub fn mem_label(latest: Option<&Sample>) -> (String, u16) {
    let Some(s) = latest else {
        return ("--/--".into(), 0);
    };
    match s.mem_used_bytes() {
        Some(used) if s.mem_total_bytes > 0 => {
            let pct = (used as f64 / s.mem_total_bytes as f64 * 100.0) as u16;
            (format!("{} / {}", human(used), human(s.mem_total_bytes)), pct.min(100))
        }
        _ => ("--/--".into(), 0),
    }
}

pub fn draw_mem(f: &mut ratatui::Frame<'_>, area: Rect, buf: &SampleBuffer) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let (label, pct) = mem_label(buf.latest());
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Memory"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(pct)
        .label(label);
    f.render_widget(g, rows[0]);

    let width = window_width(rows[1].width, buf.capacity());
    let data = spark_data(&mem_used_series(buf, width));
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title("Memory used (%)"))
        .data(&data)
        .max(100)
        .style(Style::default().fg(Color::Magenta));
    f.render_widget(spark, rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawSample;
    use chrono::Utc;

    #[test]
    fn labels_and_placeholders() {
        assert_eq!(mem_label(None), ("--/--".to_string(), 0));
        let s = Sample::stamp(
            RawSample { cpu_percent: 0.0, mem_total_bytes: 4096, mem_free_bytes: 1024 },
            Utc::now(),
        );
        assert_eq!(mem_label(Some(&s)), ("3.0KB / 4.0KB".to_string(), 75));
        let bad = Sample { mem_free_bytes: 5000, ..s };
        assert_eq!(mem_label(Some(&bad)).0, "--/--");
    }
}
