//! Uptime display between health polls.
//!
//! The server reports uptime once per poll. Between polls the dashboard keeps
//! it moving: take the reported duration as a baseline, pin it to the instant
//! it was true, and add however much client time has passed since.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::types::HealthSnapshot;

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Placeholder while no usable snapshot exists.
pub const PENDING: &str = "…";

fn unit_ms(unit: &str) -> Option<u64> {
    match unit {
        "d" | "day" | "days" => Some(DAY_MS),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(HOUR_MS),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(MINUTE_MS),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(SECOND_MS),
        "ms" | "msec" | "millisecond" | "milliseconds" => Some(1),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Number,
    Word,
}

fn piece_of(c: char) -> Option<Piece> {
    if c.is_ascii_digit() || c == '.' {
        Some(Piece::Number)
    } else if c.is_ascii_alphabetic() {
        Some(Piece::Word)
    } else {
        None
    }
}

// "1h30m, 2 days." -> ["1", "h", "30", "m", "2", "days", "."]
fn lex(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut run: Option<(usize, Piece)> = None;
    for (i, c) in s.char_indices() {
        let kind = piece_of(c);
        if let Some((start, current)) = run {
            if kind == Some(current) {
                continue;
            }
            out.push(&s[start..i]);
        }
        run = kind.map(|k| (i, k));
    }
    if let Some((start, _)) = run {
        out.push(&s[start..]);
    }
    out
}

/// Parse the server's human uptime ("2 days, 3 hours, 5 minutes, 10 seconds")
/// into milliseconds. Case-insensitive; units may be glued to their number
/// ("1h30m") and punctuation is ignored. Fragments that do not parse are
/// skipped. `None` when nothing at all was recognised.
pub fn parse_duration(s: &str) -> Option<u64> {
    let lower = s.to_ascii_lowercase();
    let pieces = lex(&lower);
    let mut total: u64 = 0;
    let mut matched = false;

    let mut i = 0;
    while i < pieces.len() {
        let value = pieces[i].parse::<f64>().ok();
        let unit = pieces.get(i + 1).and_then(|u| unit_ms(u));
        match (value, unit) {
            (Some(value), Some(ms)) if value.is_finite() && value >= 0.0 => {
                total = total.saturating_add((value * ms as f64).round() as u64);
                matched = true;
                i += 2;
            }
            _ => i += 1,
        }
    }

    matched.then_some(total)
}

/// Largest-unit-first breakdown: `2d 3h 5m 10s`, `3h 0m 4s`, `5m 10s`, `10s`.
pub fn format_duration(ms: u64) -> String {
    let days = ms / DAY_MS;
    let hours = (ms % DAY_MS) / HOUR_MS;
    let minutes = (ms % HOUR_MS) / MINUTE_MS;
    let seconds = (ms % MINUTE_MS) / SECOND_MS;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// "1m 30s ago" style age. Future or missing timestamps read "just now".
pub fn format_age(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "just now".into();
    };
    // sign first: num_seconds() truncates sub-second futures to 0
    if ts > now {
        return "just now".into();
    }
    let delta = now.signed_duration_since(ts).num_seconds();
    let (m, s) = (delta / 60, delta % 60);
    if m > 0 {
        format!("{m}m {s}s ago")
    } else {
        format!("{s}s ago")
    }
}

/// The duration that was true at `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub duration_ms: u64,
    pub at: DateTime<Utc>,
}

impl Baseline {
    /// Prefer the server's numeric baseline; otherwise parse the uptime text.
    /// The instant defaults to the snapshot's own timestamp, then to `received_at`.
    pub fn from_snapshot(snap: &HealthSnapshot, received_at: DateTime<Utc>) -> Option<Self> {
        let duration_ms = snap.baseline_ms.or_else(|| parse_duration(&snap.uptime))?;
        let at = snap
            .baseline_timestamp
            .or(snap.timestamp)
            .unwrap_or(received_at);
        Some(Self { duration_ms, at })
    }

    /// Baseline plus elapsed client time; negative elapsed counts as zero.
    pub fn extrapolate(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = now.signed_duration_since(self.at).num_milliseconds().max(0) as u64;
        self.duration_ms.saturating_add(elapsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Polling,
    Snapshotted,
    Ticking,
}

/// What the uptime panel should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UptimeDisplay {
    /// No snapshot yet, or the last poll failed.
    Pending,
    /// Baseline known; value advances with the client clock.
    Live(u64),
    /// Uptime text could not be parsed; shown as the server sent it.
    Verbatim(String),
}

impl std::fmt::Display for UptimeDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UptimeDisplay::Pending => f.write_str(PENDING),
            UptimeDisplay::Live(ms) => f.write_str(&format_duration(*ms)),
            UptimeDisplay::Verbatim(s) => f.write_str(s),
        }
    }
}

/// Per-view reconciler. Holds the latest snapshot and the baseline derived
/// from it; the view calls [`UptimeClock::tick`] once per clock advance.
#[derive(Debug)]
pub struct UptimeClock {
    state: ClockState,
    snapshot: Option<Arc<HealthSnapshot>>,
    baseline: Option<Baseline>,
    // highest value shown for the current baseline
    shown_ms: u64,
}

impl UptimeClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            snapshot: None,
            baseline: None,
            shown_ms: 0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&HealthSnapshot> {
        self.snapshot.as_deref()
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// A refresh was requested (navigation or periodic trigger).
    pub fn begin_poll(&mut self) {
        self.state = ClockState::Polling;
    }

    /// Replace the snapshot wholesale. `None` means the poll failed and the
    /// dashboard falls back to placeholders. Ignored once stopped.
    pub fn apply(&mut self, snapshot: Option<Arc<HealthSnapshot>>, received_at: DateTime<Utc>) {
        if self.state == ClockState::Idle {
            return;
        }
        self.baseline = snapshot
            .as_deref()
            .and_then(|s| Baseline::from_snapshot(s, received_at));
        self.shown_ms = 0;
        self.state = if snapshot.is_some() {
            ClockState::Snapshotted
        } else {
            ClockState::Polling
        };
        self.snapshot = snapshot;
    }

    /// Recompute for `now`. Returns `None` once stopped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<UptimeDisplay> {
        match self.state {
            ClockState::Idle => return None,
            ClockState::Snapshotted => self.state = ClockState::Ticking,
            ClockState::Polling | ClockState::Ticking => {}
        }
        Some(self.current(now))
    }

    fn current(&mut self, now: DateTime<Utc>) -> UptimeDisplay {
        let Some(snap) = self.snapshot.as_deref() else {
            return UptimeDisplay::Pending;
        };
        match self.baseline {
            Some(b) => {
                self.shown_ms = self.shown_ms.max(b.extrapolate(now));
                UptimeDisplay::Live(self.shown_ms)
            }
            None => UptimeDisplay::Verbatim(snap.uptime.clone()),
        }
    }

    /// View went away: stop computing.
    pub fn stop(&mut self) {
        self.state = ClockState::Idle;
    }
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn snapshot(uptime: &str) -> HealthSnapshot {
        HealthSnapshot {
            uptime: uptime.into(),
            timestamp: Some(t0()),
            baseline_ms: None,
            baseline_timestamp: None,
            total_requests: None,
            active_sessions: None,
            latency: None,
            version: None,
            time_to_process: None,
        }
    }

    #[test]
    fn parses_server_uptime() {
        assert_eq!(
            parse_duration("2 days, 3 hours, 5 minutes, 10 seconds"),
            Some(191_110_000)
        );
        assert_eq!(parse_duration("45 seconds"), Some(45_000));
        assert_eq!(parse_duration("1 Hour, 1 MINUTE"), Some(3_660_000));
        assert_eq!(parse_duration("250 milliseconds"), Some(250));
        assert_eq!(parse_duration("1 day, banana, 2 seconds"), Some(86_402_000));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("up for a while"), None);
        assert_eq!(parse_duration("2 days, 3 hours."), Some(183_600_000));
        assert_eq!(parse_duration("1h30m"), Some(5_400_000));
        assert_eq!(parse_duration("1.5 hours"), Some(5_400_000));
    }

    #[test]
    fn formats_by_largest_unit() {
        assert_eq!(format_duration(191_110_000), "2d 3h 5m 10s");
        assert_eq!(format_duration(3 * HOUR_MS + 4_000), "3h 0m 4s");
        assert_eq!(format_duration(5 * MINUTE_MS + 10_000), "5m 10s");
        assert_eq!(format_duration(999), "0s");
    }

    #[test]
    fn formatted_duration_parses_back() {
        for ms in [191_110_000, 45_000, 3_600_000, 0] {
            assert_eq!(parse_duration(&format_duration(ms)), Some(ms));
        }
    }

    #[test]
    fn age_formatting() {
        let now = t0();
        assert_eq!(format_age(Some(now), now), "0s ago");
        assert_eq!(format_age(Some(now - Duration::seconds(90)), now), "1m 30s ago");
        assert_eq!(format_age(Some(now + Duration::seconds(5)), now), "just now");
        assert_eq!(format_age(Some(now + Duration::milliseconds(500)), now), "just now");
        assert_eq!(format_age(Some(now - Duration::milliseconds(500)), now), "0s ago");
        assert_eq!(format_age(None, now), "just now");
    }

    #[test]
    fn extrapolates_from_snapshot_timestamp() {
        let mut clock = UptimeClock::new();
        clock.begin_poll();
        clock.apply(Some(Arc::new(snapshot("45 seconds"))), t0());
        assert_eq!(clock.state(), ClockState::Snapshotted);

        let first = clock.tick(t0() + Duration::milliseconds(2_000));
        assert_eq!(first, Some(UptimeDisplay::Live(47_000)));
        assert_eq!(clock.state(), ClockState::Ticking);
        let second = clock.tick(t0() + Duration::milliseconds(3_000));
        assert_eq!(second, Some(UptimeDisplay::Live(48_000)));
    }

    #[test]
    fn never_runs_backwards() {
        let mut clock = UptimeClock::new();
        clock.begin_poll();
        clock.apply(Some(Arc::new(snapshot("10 seconds"))), t0());

        // client clock behind the server: elapsed floors at zero
        assert_eq!(
            clock.tick(t0() - Duration::seconds(30)),
            Some(UptimeDisplay::Live(10_000))
        );
        assert_eq!(
            clock.tick(t0() + Duration::seconds(5)),
            Some(UptimeDisplay::Live(15_000))
        );
        // skew backwards after ticking forward
        assert_eq!(
            clock.tick(t0() + Duration::seconds(2)),
            Some(UptimeDisplay::Live(15_000))
        );
    }

    #[test]
    fn numeric_baseline_wins_over_text() {
        let mut snap = snapshot("garbage");
        snap.baseline_ms = Some(1_000);
        snap.baseline_timestamp = Some(t0() - Duration::seconds(1));
        let b = Baseline::from_snapshot(&snap, t0()).unwrap();
        assert_eq!(b.extrapolate(t0()), 2_000);
    }

    #[test]
    fn unparseable_uptime_is_shown_verbatim() {
        let mut clock = UptimeClock::new();
        clock.begin_poll();
        clock.apply(Some(Arc::new(snapshot("since tuesday"))), t0());
        assert_eq!(
            clock.tick(t0()).map(|d| d.to_string()),
            Some("since tuesday".to_string())
        );
    }

    #[test]
    fn failed_poll_clears_to_pending_and_stop_halts() {
        let mut clock = UptimeClock::new();
        clock.begin_poll();
        assert_eq!(clock.tick(t0()), Some(UptimeDisplay::Pending));
        clock.apply(Some(Arc::new(snapshot("5 minutes"))), t0());
        clock.apply(None, t0());
        assert_eq!(clock.tick(t0()), Some(UptimeDisplay::Pending));
        assert!(clock.snapshot().is_none());

        clock.stop();
        assert_eq!(clock.tick(t0()), None);
        // late result after stop is ignored
        clock.apply(Some(Arc::new(snapshot("1 second"))), t0());
        assert_eq!(clock.state(), ClockState::Idle);
        assert!(clock.snapshot().is_none());
    }
}
