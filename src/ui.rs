// 🖥️ Terminal Month View - Leave bars drawn over a week grid
//
// Each week block is one day-number line, one line per bar row, and a
// separator. Block heights come from the same calculator the HTTP layout
// uses, measured in terminal lines instead of pixels.

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use leave_calendar::{
    group_overlapping, leave_segments, sort_for_display, CalendarGrid, EventColor,
    EventQualityEngine, FilterSession, GridCache, HeightSettings, LayoutConfig, LeaveEvent,
    LeaveSource, MonthLayout, SearchOutcome, SearchParams, WeekHeightCalculator, YearMonth,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;

/// Week block in lines: day numbers + trailing separator, then one per bar row
const LINE_HEIGHTS: HeightSettings = HeightSettings { base: 2, per_row: 1 };

const MIN_CELL_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Bars,
    Ranges,
}

pub struct App {
    source: Box<dyn LeaveSource>,
    layout_config: LayoutConfig,
    session: FilterSession,
    grids: GridCache,
    grid: CalendarGrid,
    events: Vec<LeaveEvent>,
    dropped: usize,
    pub view: View,
    pub selected: Option<usize>,
    pub show_detail: bool,
    pub status: Option<String>,
}

impl App {
    pub fn new(source: Box<dyn LeaveSource>, layout_config: LayoutConfig) -> Self {
        Self {
            source,
            layout_config,
            session: FilterSession::new(),
            grids: GridCache::new(),
            grid: CalendarGrid::default(),
            events: Vec::new(),
            dropped: 0,
            view: View::Bars,
            selected: None,
            show_detail: false,
            status: None,
        }
    }

    /// Commit filters and replace the displayed events with the response
    pub fn search(&mut self, params: SearchParams) {
        let month = params.month;
        let outcome = self.session.search(self.source.as_ref(), params);

        // Unusable events are reported once here rather than on every redraw
        let (mut events, summary) = EventQualityEngine::new().usable_events(self.session.events());
        self.dropped = summary.dropped;
        if self.layout_config.sort_events {
            sort_for_display(&mut events);
        }
        self.events = events;
        self.grid = self.grids.grid(month, self.layout_config.week_start).clone();
        self.selected = None;
        self.show_detail = false;

        self.status = match outcome {
            SearchOutcome::Applied { count } => Some(format!("{} leave records", count)),
            SearchOutcome::Failed { .. } => self.session.take_notification(),
            SearchOutcome::Stale => None,
        };
    }

    pub fn month(&self) -> YearMonth {
        self.session.view_month()
    }

    pub fn layout(&self) -> MonthLayout<'_> {
        MonthLayout::from_grid(self.month(), self.grid.clone(), &self.events, LINE_HEIGHTS)
    }

    pub fn next_month(&mut self) {
        if let Some(params) = self.session.next_month() {
            self.search(params);
        }
    }

    pub fn previous_month(&mut self) {
        if let Some(params) = self.session.previous_month() {
            self.search(params);
        }
    }

    pub fn today(&mut self) {
        if let Some(params) = self.session.go_to_today(YearMonth::current()) {
            self.search(params);
        }
    }

    pub fn reload(&mut self) {
        if let Some(params) = self.session.current().cloned() {
            self.search(params);
        }
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Bars => View::Ranges,
            View::Ranges => View::Bars,
        };
        self.show_detail = false;
    }

    pub fn select_next(&mut self) {
        let count = self.layout().bars.len();
        if count == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < count => i + 1,
            Some(_) => 0,
            None => 0,
        });
    }

    pub fn select_previous(&mut self) {
        let count = self.layout().bars.len();
        if count == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        });
    }

    pub fn toggle_detail(&mut self) {
        if self.selected.is_some() {
            self.show_detail = !self.show_detail;
        }
    }

    fn selected_event(&self) -> Option<&LeaveEvent> {
        let index = self.selected?;
        self.layout().bars.get(index).map(|bar| bar.event)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Left | KeyCode::Char('h') => app.previous_month(),
                KeyCode::Right | KeyCode::Char('l') => app.next_month(),
                KeyCode::Char('t') => app.today(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Char('v') => app.toggle_view(),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
                KeyCode::Enter => app.toggle_detail(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Month header
            Constraint::Min(0),    // Calendar
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.view {
        View::Bars if app.show_detail => {
            let content = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(chunks[1]);
            render_month(f, content[0], app);
            render_detail_panel(f, content[1], app);
        }
        View::Bars => render_month(f, chunks[1], app),
        View::Ranges => render_ranges(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let group = app
        .session
        .current()
        .map(|p| p.business_group.clone())
        .unwrap_or_default();

    let mut spans = vec![
        Span::styled(
            format!(" 📅 {} ", app.month()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            if group.is_empty() { "all groups".to_string() } else { group },
            Style::default().fg(Color::White),
        ),
        Span::raw(" │ "),
        Span::styled(
            format!("{} events", app.events.len()),
            Style::default().fg(Color::Green),
        ),
    ];
    if app.dropped > 0 {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!("{} unplaceable", app.dropped),
            Style::default().fg(Color::Red),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Leave Calendar "),
    );

    f.render_widget(header, area);
}

fn render_month(f: &mut Frame, area: Rect, app: &App) {
    let layout = app.layout();
    let inner_width = area.width.saturating_sub(2) as usize;
    let cell_width = (inner_width / 7).max(MIN_CELL_WIDTH);
    let today = Local::now().date_naive();

    let mut lines = vec![Line::from(
        app.layout_config
            .week_start
            .day_labels()
            .iter()
            .map(|label| {
                Span::styled(
                    format!("{:^width$}", label, width = cell_width),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )
            })
            .collect::<Vec<_>>(),
    )];

    let calc = WeekHeightCalculator::new(&layout.bars, LINE_HEIGHTS);
    for week_index in 0..layout.grid.len() {
        lines.extend(week_lines(&layout, &calc, week_index, cell_width, app.selected, today));
    }

    let calendar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(calendar, area);
}

/// Lines of one week block; always `calc.height_for(week_index)` long
fn week_lines(
    layout: &MonthLayout<'_>,
    calc: &WeekHeightCalculator,
    week_index: usize,
    cell_width: usize,
    selected: Option<usize>,
    today: NaiveDate,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let Some(week) = layout.grid.week(week_index) else {
        return lines;
    };

    let days: Vec<Span<'static>> = week
        .days()
        .iter()
        .map(|day| {
            let style = if *day == today {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if layout.month.contains(*day) {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(format!("{:<width$}", day.day(), width = cell_width), style)
        })
        .collect();
    lines.push(Line::from(days));

    for row in 0..calc.rows_in_week(week_index) {
        let mut starts: [Option<usize>; 7] = [None; 7];
        for (index, bar) in layout.bars.iter().enumerate() {
            if bar.week_index == week_index && bar.row == row {
                starts[bar.start_col] = Some(index);
            }
        }

        let mut spans = Vec::new();
        let mut col = 0;
        while col < 7 {
            match starts[col] {
                Some(index) => {
                    let bar = &layout.bars[index];
                    let mut style = Style::default().fg(Color::Black).bg(bar_color(bar.event.color));
                    if selected == Some(index) {
                        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
                    }
                    spans.push(Span::styled(fit(&bar.event.title, bar.span * cell_width), style));
                    col += bar.span;
                }
                None => {
                    spans.push(Span::raw(" ".repeat(cell_width)));
                    col += 1;
                }
            }
        }
        lines.push(Line::from(spans));
    }

    let height = calc.height_for(week_index) as usize;
    while lines.len() + 1 < height {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "─".repeat(cell_width * 7),
        Style::default().fg(Color::DarkGray),
    )));

    lines
}

/// Title padded or cut to exactly `width` characters, with a leading space
fn fit(title: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let text: String = title.chars().take(width - 1).collect();
    format!(" {:<width$}", text, width = width - 1)
}

fn bar_color(color: EventColor) -> Color {
    match color {
        EventColor::Purple => Color::Magenta,
        EventColor::Cyan => Color::Cyan,
        EventColor::Yellow => Color::Yellow,
        EventColor::Gray => Color::Gray,
    }
}

fn render_ranges(f: &mut Frame, area: Rect, app: &App) {
    let month = app.month();
    let in_month: Vec<LeaveEvent> = app
        .events
        .iter()
        .filter(|e| {
            e.date_range()
                .is_some_and(|(start, end)| !(end < month.first_day() || start > month.last_day()))
        })
        .cloned()
        .collect();

    let mut lines = Vec::new();
    for range in group_overlapping(&in_month) {
        lines.push(Line::from(Span::styled(
            format!(
                " {}/{} ~ {}/{}",
                range.start.month(),
                range.start.day(),
                range.end.month(),
                range.end.day()
            ),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for event in &range.events {
            lines.push(Line::from(vec![
                Span::raw("   "),
                Span::styled("■ ", Style::default().fg(bar_color(event.color))),
                Span::raw(format!("{}  {} ~ {}", event.title, event.start_date, event.end_date)),
            ]));
        }
        lines.push(Line::from(""));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            " No leave this month",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Overlapping Leave "),
    );

    f.render_widget(list, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Leave Details ");

    let Some(event) = app.selected_event() else {
        f.render_widget(Paragraph::new("No leave selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Name: ", label), Span::raw(event.title.clone())]),
        Line::from(vec![
            Span::styled("  Dates: ", label),
            Span::raw(format!("{} ~ {}", event.start_date, event.end_date)),
        ]),
    ];

    if let Some(days) = event.duration_days() {
        content.push(Line::from(vec![
            Span::styled("  Days: ", label),
            Span::raw(days.to_string()),
        ]));
    }
    if let Some(time) = event.time_display() {
        content.push(Line::from(vec![Span::styled("  Time: ", label), Span::raw(time)]));
    }

    if let Some(meta) = &event.meta {
        let segments = leave_segments(meta);
        if !segments.is_empty() {
            content.push(Line::from(""));
            content.push(Line::from("  ─────────────────────────────"));
            for segment in segments {
                content.push(Line::from(format!("  {}", segment)));
            }
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    if let Some(status) = &app.status {
        let color = if app.events.is_empty() && status.contains("failed") {
            Color::Red
        } else {
            Color::Green
        };
        spans.push(Span::styled(format!(" {} ", status), Style::default().fg(color)));
        spans.push(Span::raw("│ "));
    }

    for (key, action) in [
        ("←/→", "Month"),
        ("t", "Today"),
        ("j/k", "Select"),
        ("Enter", "Detail"),
        ("v", "View"),
        ("r", "Reload"),
    ] {
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}  ", action)));
    }
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status, area);
}
