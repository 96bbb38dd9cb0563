//! # Terminal Dashboard
//!
//! Live line chart of the per-CPU packet counters, drawn with `ratatui`.
//!
//! Snapshots arrive over a `crossbeam_channel` from the async side; the
//! dashboard runs on its own thread and never touches the map itself.
//!
//! ## Keys
//!
//! - `q` / `Esc` / `Ctrl+C` - quit
//! - `c` - clear the plotted series
//!
//! ## Sub-Modules
//!
//! - `history` - bounded per-CPU series
//! - `theme` - chrome colors and the per-series palette

#![allow(clippy::cast_precision_loss, clippy::needless_pass_by_value)]

use anyhow::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

pub mod history;
pub mod theme;

use crate::counter::Snapshot;
use history::History;
use theme::{Palette, CAUTION_AMBER, HUD_GREEN, INFO_DIM};

const STYLE_HEADING: Style = Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD);
const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
const STYLE_TEXT: Style = Style::new().fg(Color::White);
const STYLE_BORDER: Style = Style::new().fg(HUD_GREEN);

/// How long to wait for a key before checking the channel again
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Dashboard state, independent of the terminal
pub struct Dashboard {
    source: String,
    history: History,
    palette: Palette,
    should_quit: bool,
}

impl Dashboard {
    #[must_use]
    pub fn new(source: impl Into<String>, max_series: usize) -> Self {
        Self {
            source: source.into(),
            history: History::new(max_series),
            palette: Palette::new(),
            should_quit: false,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.history.push(snapshot);
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Returns true if the view needs a redraw
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc | KeyCode::Char('q' | 'Q') => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('c' | 'C') => {
                self.history.clear();
                true
            }
            _ => false,
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Chart + legend
                Constraint::Length(3), // Key hints
            ])
            .split(f.area());

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(26)])
            .split(outer[1]);

        self.render_header(f, outer[0]);
        self.render_chart(f, main[0]);
        self.render_legend(f, main[1]);
        render_keys(f, outer[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let total = self.history.latest().map_or(0, Snapshot::total);
        let cpus = self.history.latest().map_or(0, Snapshot::cpus);
        let header = Paragraph::new(Line::from(vec![
            Span::styled("IP-HIST", STYLE_HEADING),
            Span::styled(" | ", STYLE_DIM),
            Span::styled(self.source.as_str(), STYLE_TEXT),
            Span::styled(" | ", STYLE_DIM),
            Span::styled(format!("{cpus} CPUs"), STYLE_TEXT),
            Span::styled(" | total ", STYLE_DIM),
            Span::styled(total.to_string(), STYLE_HEADING),
            Span::styled(" | samples ", STYLE_DIM),
            Span::styled(self.history.received().to_string(), STYLE_TEXT),
        ]))
        .block(Block::default().borders(Borders::ALL).border_style(STYLE_BORDER));
        f.render_widget(header, area);
    }

    fn render_chart(&mut self, f: &mut Frame, area: Rect) {
        let points: Vec<Vec<(f64, f64)>> =
            (0..self.history.cpus()).map(|cpu| self.history.points(cpu)).collect();
        let colors: Vec<Color> = (0..points.len()).map(|cpu| self.palette.color_for(cpu)).collect();

        let datasets: Vec<Dataset> = points
            .iter()
            .zip(&colors)
            .enumerate()
            .map(|(cpu, (data, color))| {
                Dataset::default()
                    .name(format!("CPU#{cpu}"))
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::new().fg(*color))
                    .data(data)
            })
            .collect();

        let x_max = (self.history.max_len().saturating_sub(1)).max(1) as f64;
        let y_max = self.history.max_value().max(1);

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(STYLE_BORDER)
                    .title(Span::styled(" PACKETS PER CPU ", STYLE_HEADING)),
            )
            .legend_position(None)
            .x_axis(Axis::default().style(STYLE_DIM).bounds([0.0, x_max]))
            .y_axis(
                Axis::default()
                    .style(STYLE_DIM)
                    .bounds([0.0, y_max as f64])
                    .labels(["0".to_string(), y_max.to_string()]),
            );
        f.render_widget(chart, area);
    }

    fn render_legend(&mut self, f: &mut Frame, area: Rect) {
        let lines: Vec<Line> = match self.history.latest() {
            Some(snapshot) => snapshot
                .iter()
                .map(|(cpu, value)| {
                    let color = self.palette.color_for(cpu.0 as usize);
                    Line::from(vec![
                        Span::styled("■ ", Style::new().fg(color)),
                        Span::styled(format!("{cpu}:{value}"), STYLE_TEXT),
                    ])
                })
                .collect(),
            None => vec![Line::from(Span::styled("waiting for data", STYLE_DIM))],
        };

        let legend = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(STYLE_BORDER)
                .title(Span::styled(" LEGEND ", STYLE_HEADING)),
        );
        f.render_widget(legend, area);
    }
}

fn render_keys(f: &mut Frame, area: Rect) {
    let keys = Paragraph::new(Line::from(vec![
        Span::styled("Q", STYLE_KEY),
        Span::styled(":Quit ", STYLE_DIM),
        Span::styled("C", STYLE_KEY),
        Span::styled(":Clear", STYLE_DIM),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(STYLE_BORDER));
    f.render_widget(keys, area);
}

/// Run the dashboard until the user quits or the snapshot channel closes
///
/// # Errors
/// Returns an error if terminal setup or rendering fails
pub fn run_dashboard(
    rx: Receiver<Snapshot>,
    source: impl Into<String>,
    max_series: usize,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &rx, Dashboard::new(source, max_series));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    rx: &Receiver<Snapshot>,
    mut dashboard: Dashboard,
) -> Result<()> {
    let mut dirty = true;
    loop {
        match drain(rx, &mut dashboard) {
            Drained::Closed => {
                log::debug!("snapshot channel closed, leaving dashboard");
                return Ok(());
            }
            Drained::Updated => dirty = true,
            Drained::Idle => {}
        }

        if dirty {
            terminal.draw(|f| dashboard.render(f))?;
            dirty = false;
        }

        if event::poll(INPUT_POLL)? {
            match event::read()? {
                // Raw mode swallows SIGINT, so Ctrl+C arrives as a key
                Event::Key(key)
                    if key.kind == KeyEventKind::Press
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c') =>
                {
                    return Ok(());
                }
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    dirty |= dashboard.handle_key(key.code);
                }
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }

        if dashboard.should_quit() {
            return Ok(());
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Drained {
    Idle,
    Updated,
    Closed,
}

/// Move everything queued on the channel into the dashboard
fn drain(rx: &Receiver<Snapshot>, dashboard: &mut Dashboard) -> Drained {
    let mut state = Drained::Idle;
    loop {
        match rx.try_recv() {
            Ok(snapshot) => {
                dashboard.push(snapshot);
                state = Drained::Updated;
            }
            Err(TryRecvError::Empty) => return state,
            Err(TryRecvError::Disconnected) => return Drained::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_quit_keys() {
        for key in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut dashboard = Dashboard::new("pin", 10);
            dashboard.handle_key(key);
            assert!(dashboard.should_quit());
        }
    }

    #[test]
    fn test_clear_key_empties_series() {
        let mut dashboard = Dashboard::new("pin", 10);
        dashboard.push(Snapshot::from(vec![1, 2]));
        assert!(dashboard.handle_key(KeyCode::Char('c')));
        assert_eq!(dashboard.history().cpus(), 0);
        assert!(!dashboard.should_quit());
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut dashboard = Dashboard::new("pin", 10);
        assert!(!dashboard.handle_key(KeyCode::Char('x')));
        assert!(!dashboard.should_quit());
    }

    #[test]
    fn test_drain_reports_closed_channel() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut dashboard = Dashboard::new("pin", 10);

        assert_eq!(drain(&rx, &mut dashboard), Drained::Idle);
        tx.send(Snapshot::from(vec![1])).unwrap();
        tx.send(Snapshot::from(vec![2])).unwrap();
        assert_eq!(drain(&rx, &mut dashboard), Drained::Updated);
        assert_eq!(dashboard.history().received(), 2);

        drop(tx);
        assert_eq!(drain(&rx, &mut dashboard), Drained::Closed);
    }

    #[test]
    fn test_event_loop_exits_when_channel_closes() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(Snapshot::from(vec![3, 4])).unwrap();
        drop(tx);

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        event_loop(&mut terminal, &rx, Dashboard::new("pin", 10)).unwrap();
    }

    #[test]
    fn test_render_shows_legend_values() {
        let mut dashboard = Dashboard::new("/sys/fs/bpf/pin", 10);
        dashboard.push(Snapshot::from(vec![12, 34]));

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| dashboard.render(f)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(ratatui::buffer::Cell::symbol).collect();
        assert!(text.contains("CPU#0:12"));
        assert!(text.contains("CPU#1:34"));
        assert!(text.contains("IP-HIST"));
    }
}
