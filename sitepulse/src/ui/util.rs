//! Small UI helpers: human-readable sizes, sparkline data.

pub fn human(b: u64) -> String {
    const K: f64 = 1024.0;
    let b = b as f64;
    if b < K { return format!("{b:.0}B"); }
    let kb = b / K;
    if kb < K { return format!("{kb:.1}KB"); }
    let mb = kb / K;
    if mb < K { return format!("{mb:.1}MB"); }
    let gb = mb / K;
    if gb < K { return format!("{gb:.1}GB"); }
    let tb = gb / K;
    format!("{tb:.2}TB")
}

/// Sparklines have no notion of a gap; an empty slot draws as a zero bar.
pub fn spark_data(series: &[Option<f64>]) -> Vec<u64> {
    series
        .iter()
        .map(|v| v.map(|x| x.round().max(0.0) as u64).unwrap_or(0))
        .collect()
}

/// Chart window for a panel: the rightmost slots that fit inside the borders.
pub fn window_width(area_width: u16, capacity: usize) -> usize {
    (area_width.saturating_sub(2) as usize).min(capacity)
}

/// Placeholder-aware value text.
pub fn or_pending<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string())
        .unwrap_or_else(|| crate::uptime::PENDING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human(512), "512B");
        assert_eq!(human(1536), "1.5KB");
        assert_eq!(human(8 * 1024 * 1024 * 1024), "8.0GB");
    }

    #[test]
    fn gaps_draw_as_zero() {
        assert_eq!(spark_data(&[None, Some(42.4), Some(99.6)]), vec![0, 42, 100]);
        assert_eq!(window_width(10, 60), 8);
        assert_eq!(window_width(200, 60), 60);
        assert_eq!(or_pending::<u64>(None), "…");
    }
}
