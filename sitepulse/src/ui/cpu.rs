//! CPU sparkline over the rolling sample window.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

use crate::history::{cpu_series, SampleBuffer};
use crate::ui::util::{spark_data, window_width};

pub fn cpu_title(buf: &SampleBuffer) -> String {
    match buf.latest().map(|s| s.cpu_percent).filter(|v| v.is_finite()) {
        Some(v) => format!("CPU (now: {v:>5.1}%)"),
        None => "CPU (now: --%)".into(),
    }
}

pub fn draw_cpu_graph(f: &mut ratatui::Frame<'_>, area: Rect, buf: &SampleBuffer) {
    let width = window_width(area.width, buf.capacity());
    let data = spark_data(&cpu_series(buf, width));
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(cpu_title(buf)))
        .data(&data)
        .max(100)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(spark, area);
}
