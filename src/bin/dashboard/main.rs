mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

use app::{format_price, format_time_secs, truncate, AppState, ConnectionStatus};

/// How often the player set is re-pulled from the service.
const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = REFRESH_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if app.search_mode {
                    match key.code {
                        KeyCode::Enter | KeyCode::Esc => app.search_mode = false,
                        KeyCode::Backspace => app.pop_search(),
                        KeyCode::Char(c) => app.push_search(c),
                        _ => {}
                    }
                    table_state.select(None);
                    continue;
                }

                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        app.refresh(client).await;
                        last_tick = std::time::Instant::now();
                    }
                    KeyCode::Char('/') => app.search_mode = true,
                    KeyCode::Char('t') => app.cycle_team(true),
                    KeyCode::Char('T') => app.cycle_team(false),
                    KeyCode::Char('p') => app.cycle_position(true),
                    KeyCode::Char('P') => app.cycle_position(false),
                    KeyCode::Char('s') => app.cycle_sort(true),
                    KeyCode::Char('S') => app.cycle_sort(false),
                    KeyCode::Char('c') => app.clear_filters(),
                    KeyCode::Down | KeyCode::Char('j') => {
                        let max = app.visible().len().saturating_sub(1);
                        let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                        table_state.select(Some(next));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                        table_state.select(Some(prev));
                    }
                    _ => {}
                }

                if matches!(key.code, KeyCode::Char('t' | 'T' | 'p' | 'P' | 's' | 'S' | 'c')) {
                    table_state.select(None);
                }
            }
        }

        if last_tick.elapsed() >= REFRESH_INTERVAL {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // filters
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_filters(f, app, chunks[1]);
    render_body(f, app, table_state, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let last_ingest = app
        .health
        .last_success_at
        .map_or("never".to_string(), |t| format!("{} UTC", format_time_secs(t)));
    let ingest_color = if app.health.ingest_in_flight { Color::Yellow } else { Color::White };

    let spans = vec![
        Span::styled(
            " ⚽ FPL Player Database  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} players", app.players.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(format!("last ingest: {last_ingest}"), Style::default().fg(ingest_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("runs ok/failed: {}/{}", app.health.runs_ok, app.health.runs_failed),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("refreshed {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_filters(f: &mut Frame, app: &AppState, area: Rect) {
    let search_style = if app.search_mode {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if app.search_mode { "▏" } else { "" };

    let line = Line::from(vec![
        Span::styled(" Search: ", Style::default().fg(Color::Yellow)),
        Span::styled(format!("{}{cursor}", app.search_text()), search_style),
        Span::raw("   "),
        Span::styled("Team: ", Style::default().fg(Color::Yellow)),
        Span::raw(app.team_label().to_string()),
        Span::raw("   "),
        Span::styled("Position: ", Style::default().fg(Color::Yellow)),
        Span::raw(app.position_label().to_string()),
        Span::raw("   "),
        Span::styled("Sort: ", Style::default().fg(Color::Yellow)),
        Span::raw(app.sort_label()),
    ]);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_players_table(f, app, table_state, halves[0]);

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(halves[1]);

    render_top_scorers(f, app, charts[0]);
    render_team_values(f, app, charts[1]);
}

fn render_players_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Name", "Team", "Position", "Price", "Pts", "G", "A", "Min"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let visible = app.visible();
    let rows: Vec<Row> = visible
        .iter()
        .map(|p| {
            let team_color = if p.team == fpl_dashboard::ingest::UNKNOWN {
                Color::DarkGray
            } else {
                Color::White
            };
            Row::new(vec![
                Cell::from(truncate(&p.name, 26)),
                Cell::from(truncate(&p.team, 16)).style(Style::default().fg(team_color)),
                Cell::from(truncate(&p.position, 11)),
                Cell::from(format_price(p.price)).style(Style::default().fg(Color::Green)),
                Cell::from(p.total_points.to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(p.goals_scored.to_string()),
                Cell::from(p.assists.to_string()),
                Cell::from(p.minutes.to_string()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(16),
            Constraint::Length(11),
            Constraint::Length(7),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" PLAYERS ({}) ", visible.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_top_scorers(f: &mut Frame, app: &AppState, area: Rect) {
    let bars: Vec<Bar> = app
        .top_scorers()
        .into_iter()
        .map(|p| {
            Bar::default()
                .value(p.goals_scored.max(0) as u64)
                .label(Line::from(truncate(&p.name, 18)))
                .text_value(p.goals_scored.to_string())
                .style(Style::default().fg(Color::Green))
        })
        .collect();

    let chart = BarChart::default()
        .block(chart_block(" TOP GOAL SCORERS "))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

fn render_team_values(f: &mut Frame, app: &AppState, area: Rect) {
    // Bars take integers; chart tenths of a unit and label with the real value.
    let bars: Vec<Bar> = app
        .team_values()
        .into_iter()
        .map(|t| {
            Bar::default()
                .value((t.total * 10.0).round().max(0.0) as u64)
                .label(Line::from(truncate(&t.group, 18)))
                .text_value(format_price(t.total))
                .style(Style::default().fg(Color::Magenta))
        })
        .collect();

    let chart = BarChart::default()
        .block(chart_block(" SQUAD VALUE BY TEAM "))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

fn chart_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let line = if app.search_mode {
        Line::from(vec![
            key(" [type] "),
            Span::raw("search name  "),
            key("[⌫] "),
            Span::raw("delete  "),
            key("[enter/esc] "),
            Span::raw("done"),
        ])
    } else {
        Line::from(vec![
            key(" [q] "),
            Span::raw("quit  "),
            key("[r] "),
            Span::raw("refresh  "),
            key("[/] "),
            Span::raw("search  "),
            key("[t/T] "),
            Span::raw("team  "),
            key("[p/P] "),
            Span::raw("position  "),
            key("[s/S] "),
            Span::raw("sort  "),
            key("[c] "),
            Span::raw("clear  "),
            key("[↑↓ / j k] "),
            Span::raw("scroll  "),
            Span::styled(
                format!("auto-refresh: {}s", REFRESH_INTERVAL.as_secs()),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    };
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
