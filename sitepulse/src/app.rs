//! Dashboard view and main loop: input handling, stream ingestion, uptime
//! ticking, and drawing.
//!
//! The view owns its stream session and sample history; both are created on
//! mount and torn down on unmount. Health snapshots and the clock come from
//! process-wide state it only reads.

use std::{io, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::{sync::watch, time::sleep};
use tracing::{debug, info};

use crate::state::{ClientClock, HealthState, SharedSnapshot};
use crate::ui::{
    cpu::draw_cpu_graph,
    header::{draw_footer, draw_header},
    health::draw_health,
    mem::draw_mem,
};
use crate::uptime::{UptimeClock, UptimeDisplay};
use crate::ws::{SessionEvent, TelemetrySession};

/// Where to connect; resolved from flags and profiles.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub stream_url: String,
    pub api_key: Option<String>,
    pub tls_ca: Option<String>,
}

pub struct App {
    session: TelemetrySession,
    uptime: UptimeClock,
    uptime_text: UptimeDisplay,

    health: Arc<HealthState>,
    health_rx: watch::Receiver<SharedSnapshot>,
    clock_rx: watch::Receiver<DateTime<Utc>>,
    now: DateTime<Utc>,

    host: String,
    should_quit: bool,
}

impl App {
    pub fn new(health: Arc<HealthState>, clock: &ClientClock, capacity: usize) -> Self {
        Self {
            session: TelemetrySession::new(capacity),
            uptime: UptimeClock::new(),
            uptime_text: UptimeDisplay::Pending,
            health_rx: health.subscribe(),
            health,
            clock_rx: clock.subscribe(),
            now: clock.now(),
            host: String::new(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self, endpoints: &Endpoints) -> anyhow::Result<()> {
        self.host = url::Url::parse(&endpoints.api_base)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| endpoints.api_base.clone());

        // Terminal setup
        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        self.mount();
        terminal.draw(|f| self.draw(f))?;
        // the handshake runs inside the event loop so input stays live
        self.session.begin_connect(
            &endpoints.stream_url,
            endpoints.tls_ca.as_deref(),
            endpoints.api_key.as_deref(),
        );

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        self.unmount().await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    fn mount(&mut self) {
        info!("dashboard mounted");
        self.uptime.begin_poll();
        // a snapshot already published by the poller is still valid
        let current = self.health_rx.borrow_and_update().clone();
        if current.is_some() {
            self.apply_snapshot(current);
        }
        self.health.request_refresh();
        self.recompute();
    }

    async fn unmount(&mut self) {
        self.uptime.stop();
        self.session.close().await;
        info!("dashboard unmounted");
    }

    // Receipt time is the real clock, not the last display tick: it stands in
    // for the server timestamp when the snapshot has none.
    fn apply_snapshot(&mut self, snapshot: SharedSnapshot) {
        self.uptime.apply(snapshot, Utc::now());
        self.recompute();
    }

    fn recompute(&mut self) {
        if let Some(display) = self.uptime.tick(self.now) {
            self.uptime_text = display;
        }
    }

    fn refresh(&mut self) {
        self.uptime.begin_poll();
        self.health.request_refresh();
    }

    fn handle_input(&mut self) -> anyhow::Result<()> {
        while event::poll(Duration::from_millis(0))? {
            let Event::Key(k) = event::read()? else {
                continue;
            };
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match k.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true
                }
                KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
                _ => {}
            }
        }
        Ok(())
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            self.handle_input()?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                ev = self.session.next_event(), if self.session.is_active() => {
                    match ev {
                        Some(SessionEvent::Opened) => debug!("stream open"),
                        Some(SessionEvent::Closed(reason)) => {
                            debug!(%reason, "stream ended; keeping last samples")
                        }
                        _ => {}
                    }
                }
                res = self.clock_rx.changed() => {
                    if res.is_ok() {
                        self.now = *self.clock_rx.borrow_and_update();
                        self.recompute();
                    }
                }
                res = self.health_rx.changed() => {
                    if res.is_ok() {
                        let snap = self.health_rx.borrow_and_update().clone();
                        self.apply_snapshot(snap);
                    }
                }
                // keep input responsive while the stream is quiet
                _ = sleep(Duration::from_millis(50)) => {}
            }

            terminal.draw(|f| self.draw(f))?;
        }
        Ok(())
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, charts, footer
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // header
                Constraint::Min(8),    // cpu + mem (left), server (right)
                Constraint::Length(1), // footer
            ])
            .split(area);

        draw_header(f, rows[0], &self.host, self.session.status());

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
            .split(rows[1]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(cols[0]);

        let buf = self.session.buffer();
        draw_cpu_graph(f, left[0], buf);
        draw_mem(f, left[1], buf);
        draw_health(
            f,
            cols[1],
            &self.uptime_text,
            self.uptime.snapshot(),
            self.now,
        );

        draw_footer(
            f,
            rows[2],
            self.session.status(),
            self.session.last_frame_error(),
        );
    }
}
