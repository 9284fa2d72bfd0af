use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use log::{info, warn};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use mo_core::{
    Category, Clock, CoreError, CoreResult, Engine, IdentityList, IdentityPatch, LogStatus, SystemClock, Tab,
    Task, TaskKind, XP_PER_LEVEL,
};
use mo_focus::{FocusEvent, FocusTimer};
use mo_fs::FsStore;

const TICK_RATE: Duration = Duration::from_millis(200);
const WATER_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    None,
    Vision,
    AddItem(IdentityList),
    SleepTime,
}

#[derive(Debug, Default, Clone)]
struct TextInput {
    content: String,
    cursor: usize,
}

impl TextInput {
    fn from(content: String) -> Self {
        let cursor = content.len();
        Self { content, cursor }
    }

    fn insert(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn delete_back(&mut self) {
        if let Some(c) = self.content[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.content.remove(self.cursor);
        }
    }

    fn move_left(&mut self) {
        if let Some(c) = self.content[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    fn move_right(&mut self) {
        if let Some(c) = self.content[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.content.len();
    }

    fn reset(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn cursor_column(&self) -> usize {
        self.content[..self.cursor].chars().count()
    }
}

struct App<C: Clock> {
    engine: Engine<FsStore, C>,
    timer: FocusTimer,
    focus_events: UnboundedReceiver<FocusEvent>,
    task_state: ListState,
    identity_list: IdentityList,
    identity_state: ListState,
    input_mode: InputMode,
    input: TextInput,
    status: Option<String>,
    show_help: bool,
    sessions_completed: u32,
}

impl<C: Clock> App<C> {
    fn new(engine: Engine<FsStore, C>, runtime: Handle) -> Self {
        let (timer, focus_events) = FocusTimer::new(runtime);
        let mut task_state = ListState::default();
        task_state.select(Some(0));
        let mut identity_state = ListState::default();
        identity_state.select(Some(0));
        Self {
            engine,
            timer,
            focus_events,
            task_state,
            identity_list: IdentityList::CoreValues,
            identity_state,
            input_mode: InputMode::None,
            input: TextInput::default(),
            status: None,
            show_help: false,
            sessions_completed: 0,
        }
    }

    fn tab(&self) -> Tab {
        self.engine.active_tab()
    }

    fn select_tab(&mut self, tab: Tab) {
        if tab == self.tab() {
            return;
        }
        let result = self.engine.set_tab(tab);
        self.report(result, None);
    }

    fn selected_task(&self) -> Option<Task> {
        let index = self.task_state.selected()?;
        self.engine.current_day().tasks.get(index).cloned()
    }

    fn identity_len(&self) -> usize {
        self.engine.identity().list(self.identity_list).len()
    }

    fn cycle_identity_list(&mut self, forward: bool) {
        let lists = IdentityList::ALL;
        let position = lists
            .iter()
            .position(|list| *list == self.identity_list)
            .unwrap_or(0);
        let next = if forward {
            (position + 1) % lists.len()
        } else {
            (position + lists.len() - 1) % lists.len()
        };
        self.identity_list = lists[next];
        self.identity_state.select(Some(0));
    }

    /// Apply pending countdown events. A completed session credits deep work.
    fn drain_focus_events(&mut self) {
        while let Ok(event) = self.focus_events.try_recv() {
            if event == FocusEvent::Completed {
                self.sessions_completed += 1;
                let result = self.engine.record_focus_session();
                let message = format!(
                    "Focus session complete. Deep work today: {} min",
                    self.engine.current_day().deep_work_minutes
                );
                self.report(result, Some(message));
            }
        }
    }

    fn report(&mut self, result: CoreResult<()>, success: Option<String>) {
        match result {
            Ok(()) => {
                if success.is_some() {
                    self.status = success;
                }
            }
            Err(err) => {
                warn!("event=tui_action status=error error={err}");
                self.status = Some(format!("Error: {err}"));
            }
        }
    }

    fn select_next(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(i) => {
                if i + 1 >= len {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        list_state.select(Some(i));
    }

    fn select_prev(list_state: &mut ListState, len: usize) {
        let i = match list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len.saturating_sub(1)
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        list_state.select(Some(i));
    }
}

pub fn run(store: FsStore) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize runtime")?;
    let engine = Engine::open(store, SystemClock);
    let mut app = App::new(engine, runtime.handle().clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    info!("event=tui_start tab={}", app.tab());

    let mut last_tick = Instant::now();
    let outcome: Result<()> = loop {
        app.drain_focus_events();
        if let Err(err) = terminal.draw(|frame| render_app(frame, &app)) {
            break Err(err.into());
        }

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        match poll_key(timeout) {
            Ok(Some(key)) => match handle_key(&mut app, key) {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(err) => break Err(err),
            },
            Ok(None) => {}
            Err(err) => break Err(err),
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    };

    app.timer.reset();
    restore_terminal(terminal)?;
    info!("event=tui_stop");
    outcome
}

fn poll_key(timeout: Duration) -> Result<Option<KeyEvent>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(Some(key));
            }
        }
    }
    Ok(None)
}

fn handle_key<C: Clock>(app: &mut App<C>, key: KeyEvent) -> Result<bool> {
    if app.input_mode != InputMode::None {
        return Ok(handle_text_input(app, key));
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(true);
    }
    if app.show_help {
        app.show_help = false;
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Right | KeyCode::Tab => app.select_tab(app.tab().next()),
        KeyCode::Left | KeyCode::BackTab => app.select_tab(app.tab().prev()),
        KeyCode::Char('1') => app.select_tab(Tab::Dashboard),
        KeyCode::Char('2') => app.select_tab(Tab::Focus),
        KeyCode::Char('3') => app.select_tab(Tab::Identity),
        KeyCode::Char('e') => handle_export(app)?,
        _ => match app.tab() {
            Tab::Dashboard => handle_dashboard_key(app, key),
            Tab::Focus => handle_focus_key(app, key),
            Tab::Identity => handle_identity_key(app, key),
        },
    }
    Ok(false)
}

fn handle_dashboard_key<C: Clock>(app: &mut App<C>, key: KeyEvent) {
    let len = app.engine.current_day().tasks.len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => App::<C>::select_next(&mut app.task_state, len),
        KeyCode::Char('k') | KeyCode::Up => App::<C>::select_prev(&mut app.task_state, len),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let Some(task) = app.selected_task() else {
                return;
            };
            match app.engine.toggle_task(&task.id) {
                Ok(LogStatus::Completed) => {
                    app.status = Some(format!("+10 XP  {}", task.label));
                }
                Ok(LogStatus::Uncompleted) => {
                    app.status = Some(format!("-10 XP  {}", task.label));
                }
                Err(err) => app.report(Err(err), None),
            }
        }
        KeyCode::Char('+' | '=') => adjust_selected_value(app, 1.0),
        KeyCode::Char('-') => adjust_selected_value(app, -1.0),
        KeyCode::Char('w') => {
            let result = app.engine.adjust_water(WATER_STEP);
            app.report(result, None);
        }
        KeyCode::Char('W') => {
            let result = app.engine.adjust_water(-WATER_STEP);
            app.report(result, None);
        }
        KeyCode::Char('s') => {
            let current = app.engine.current_day().sleep_time.unwrap_or_default();
            app.input = TextInput::from(current);
            app.input_mode = InputMode::SleepTime;
        }
        _ => {}
    }
}

fn adjust_selected_value<C: Clock>(app: &mut App<C>, step: f64) {
    let Some(task) = app.selected_task() else {
        return;
    };
    if task.kind == TaskKind::Boolean {
        app.status = Some(format!("{} has no value to adjust", task.label));
        return;
    }
    let value = task.value.unwrap_or_default() + step;
    let result = app.engine.set_task_value(&task.id, value);
    app.report(result, None);
}

fn handle_focus_key<C: Clock>(app: &mut App<C>, key: KeyEvent) {
    match key.code {
        KeyCode::Char(' ' | 's') | KeyCode::Enter => app.timer.toggle(),
        KeyCode::Char('r') => {
            app.timer.reset();
            app.status = Some("Timer reset".into());
        }
        _ => {}
    }
}

fn handle_identity_key<C: Clock>(app: &mut App<C>, key: KeyEvent) {
    let len = app.identity_len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => App::<C>::select_next(&mut app.identity_state, len),
        KeyCode::Char('k') | KeyCode::Up => App::<C>::select_prev(&mut app.identity_state, len),
        KeyCode::Char('l') => app.cycle_identity_list(true),
        KeyCode::Char('h') => app.cycle_identity_list(false),
        KeyCode::Char('v') => {
            app.input = TextInput::from(app.engine.identity().vision.clone());
            app.input_mode = InputMode::Vision;
        }
        KeyCode::Char('a') => {
            app.input.reset();
            app.input_mode = InputMode::AddItem(app.identity_list);
        }
        KeyCode::Char('x' | 'd') => {
            let Some(index) = app.identity_state.selected() else {
                return;
            };
            if index >= len {
                return;
            }
            let list = app.identity_list;
            let items = app.engine.identity().with_item_removed(list, index);
            let result = app.engine.update_identity(IdentityPatch::list(list, items));
            app.report(result, Some(format!("Removed item from {}", list.title())));
            let remaining = app.identity_len();
            app.identity_state.select(Some(index.min(remaining.saturating_sub(1))));
        }
        _ => {}
    }
}

fn handle_text_input<C: Clock>(app: &mut App<C>, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('a') => app.input.move_home(),
            KeyCode::Char('e') => app.input.move_end(),
            _ => {}
        }
        return false;
    }
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::None;
            app.input.reset();
        }
        KeyCode::Enter => {
            submit_input(app);
            app.input_mode = InputMode::None;
            app.input.reset();
        }
        KeyCode::Char(c) => app.input.insert(c),
        KeyCode::Backspace => app.input.delete_back(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        _ => {}
    }
    false
}

fn submit_input<C: Clock>(app: &mut App<C>) {
    let text = app.input.content.trim().to_string();
    match app.input_mode {
        InputMode::None => {}
        InputMode::Vision => {
            if text.is_empty() {
                app.status = Some("Vision cannot be empty".into());
                return;
            }
            let result = app.engine.update_identity(IdentityPatch::vision(text));
            app.report(result, Some("Vision updated".into()));
        }
        InputMode::AddItem(list) => {
            if text.is_empty() {
                return;
            }
            let items = app.engine.identity().with_item_added(list, &text);
            let result = app.engine.update_identity(IdentityPatch::list(list, items));
            app.report(result, Some(format!("Added to {}", list.title())));
        }
        InputMode::SleepTime => {
            let result = app.engine.set_sleep_time(Some(text));
            app.report(result, None);
        }
    }
}

fn handle_export<C: Clock>(app: &mut App<C>) -> Result<()> {
    let payload = match app.engine.export() {
        Ok(payload) => payload,
        Err(CoreError::EmptyLog) => {
            app.status = Some(CoreError::EmptyLog.to_string());
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to export log"),
    };
    match app.engine.repository().write_export(None, &payload) {
        Ok(path) => {
            app.status = Some(format!("Exported {} rows to {}", payload.rows, path.display()));
        }
        Err(err) => app.report(Err(err), None),
    }
    Ok(())
}

fn render_app<C: Clock>(frame: &mut Frame, app: &App<C>) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(size);

    let titles = ["Dashboard", "Focus", "Identity"]
        .iter()
        .map(|title| Line::from(Span::styled(*title, Style::default())))
        .collect::<Vec<_>>();

    let tabs = Tabs::new(titles)
        .select(app.tab().index())
        .block(Block::default().borders(Borders::ALL).title("MasteryOS"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow));
    frame.render_widget(tabs, chunks[0]);

    match app.tab() {
        Tab::Dashboard => render_dashboard(frame, chunks[1], app),
        Tab::Focus => render_focus(frame, chunks[1], app),
        Tab::Identity => render_identity(frame, chunks[1], app),
    }

    render_guide_bar(frame, chunks[2], app);

    if app.input_mode != InputMode::None {
        render_input_popup(frame, size, input_title(app.input_mode), &app.input);
    }
    if app.show_help {
        render_help_popup(frame, size);
    }
}

fn render_dashboard<C: Clock>(frame: &mut Frame, area: Rect, app: &App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);
    let summary_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(chunks[0]);

    let day = app.engine.current_day();
    let identity = app.engine.identity();

    let level = Paragraph::new(format!(
        "Level {}\n{}/{XP_PER_LEVEL} XP",
        identity.level(),
        identity.xp_into_level()
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Progress"))
    .style(Style::default().fg(Color::Cyan));

    let streak = app.engine.streak();
    let streak = Paragraph::new(format!("{streak} days"))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Streak"))
        .style(Style::default().fg(if streak > 0 { Color::Green } else { Color::Red }));

    let done = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(day.date.to_string()))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(u16::from(day.completion_percent()));

    let sleep = day.sleep_time.as_deref().unwrap_or("-");
    let vitals = Paragraph::new(format!(
        "Water {:.2} L\nDeep work {} min  Sleep {sleep}",
        day.water_intake, day.deep_work_minutes
    ))
    .block(Block::default().borders(Borders::ALL).title("Vitals"));

    frame.render_widget(level, summary_chunks[0]);
    frame.render_widget(streak, summary_chunks[1]);
    frame.render_widget(done, summary_chunks[2]);
    frame.render_widget(vitals, summary_chunks[3]);

    let items = day
        .tasks
        .iter()
        .map(|task| {
            let mark = if task.completed { "[x] " } else { "[ ] " };
            let mut spans = vec![
                Span::styled(mark, Style::default().fg(category_color(task.category))),
                Span::raw(task.label.clone()),
            ];
            if task.kind != TaskKind::Boolean {
                let value = task.value.unwrap_or_default();
                let value = match task.target {
                    Some(target) => format!("  {value}/{target}"),
                    None => format!("  {value}"),
                };
                spans.push(Span::styled(value, Style::default().fg(Color::Yellow)));
            }
            spans.push(Span::styled(
                format!("  {}", task.category),
                Style::default().fg(Color::DarkGray),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect::<Vec<_>>();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Today"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, chunks[1], &mut app.task_state.clone());
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Body => Color::Green,
        Category::Mind => Color::Cyan,
        Category::Deen => Color::Yellow,
        Category::Career => Color::Magenta,
        Category::Social => Color::Blue,
    }
}

fn render_focus<C: Clock>(frame: &mut Frame, area: Rect, app: &App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let state = if app.timer.is_running() { "Running" } else { "Paused" };
    let clock = Paragraph::new(vec![
        Line::from(Span::styled(
            app.timer.display(),
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow),
        )),
        Line::from(state),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Deep Work"));
    frame.render_widget(clock, chunks[0]);

    let total = mo_focus::FOCUS_SESSION_SECS;
    let elapsed = total - app.timer.remaining_secs().min(total);
    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Session"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(f64::from(elapsed) / f64::from(total));
    frame.render_widget(progress, chunks[1]);

    let today = Paragraph::new(format!(
        "Deep work today: {} min\nSessions this run: {}",
        app.engine.current_day().deep_work_minutes,
        app.sessions_completed
    ))
    .block(Block::default().borders(Borders::ALL).title("Today"));
    frame.render_widget(today, chunks[2]);
}

fn render_identity<C: Clock>(frame: &mut Frame, area: Rect, app: &App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);
    let identity = app.engine.identity();

    let vision = Paragraph::new(identity.vision.as_str())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Vision  (Level {}, {} XP)", identity.level(), identity.xp())),
        );
    frame.render_widget(vision, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(chunks[1]);

    for (list, column) in IdentityList::ALL.into_iter().zip(columns.iter()) {
        let selected = list == app.identity_list;
        let items = identity
            .list(list)
            .iter()
            .map(|item| ListItem::new(item.as_str()))
            .collect::<Vec<_>>();
        let border_style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let widget = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(list.title()),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        if selected {
            frame.render_stateful_widget(widget, *column, &mut app.identity_state.clone());
        } else {
            frame.render_widget(widget, *column);
        }
    }
}

fn input_title(mode: InputMode) -> &'static str {
    match mode {
        InputMode::None => "",
        InputMode::Vision => "Vision",
        InputMode::AddItem(list) => list.title(),
        InputMode::SleepTime => "Sleep time (HH:MM)",
    }
}

fn render_input_popup(frame: &mut Frame, area: Rect, title: &str, input: &TextInput) {
    let popup_area = centered_rect(60, 20, area);
    frame.render_widget(Clear, popup_area);
    let widget = Paragraph::new(input.content.as_str())
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, popup_area);

    let inner_width = popup_area.width.saturating_sub(2).max(1);
    let column = u16::try_from(input.cursor_column()).unwrap_or(u16::MAX);
    frame.set_cursor(popup_area.x + 1 + column.min(inner_width - 1), popup_area.y + 1);
}

fn render_guide_bar<C: Clock>(frame: &mut Frame, area: Rect, app: &App<C>) {
    let spans = key_hints(app)
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(
                    format!(" [{key}] "),
                    Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
                ),
                Span::raw(format!("{desc} ")),
            ]
        })
        .collect::<Vec<_>>();
    let title = app.status.as_deref().unwrap_or("Guide");
    let guide = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(guide, area);
}

fn key_hints<C: Clock>(app: &App<C>) -> Vec<(&'static str, &'static str)> {
    if app.input_mode != InputMode::None {
        return vec![("Enter", "Save"), ("Esc", "Cancel")];
    }
    if app.show_help {
        return vec![("any", "Close Help")];
    }
    let mut hints = vec![("q", "Quit"), ("?", "Help"), ("←/→", "Tabs"), ("e", "Export")];
    match app.tab() {
        Tab::Dashboard => hints.extend_from_slice(&[
            ("↑/↓", "Nav"),
            ("Space", "Toggle"),
            ("+/-", "Value"),
            ("w/W", "Water"),
            ("s", "Sleep"),
        ]),
        Tab::Focus => {
            let start = if app.timer.is_running() { "Pause" } else { "Start" };
            hints.extend_from_slice(&[("Space", start), ("r", "Reset")]);
        }
        Tab::Identity => hints.extend_from_slice(&[
            ("h/l", "List"),
            ("↑/↓", "Nav"),
            ("a", "Add"),
            ("x", "Remove"),
            ("v", "Vision"),
        ]),
    }
    hints
}

fn render_help_popup(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup_area);
    let help = Paragraph::new(HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, popup_area);
}

const HELP_TEXT: &str = "Dashboard: Space toggles a task (+10 XP), +/- adjusts Khushu, w/W adds or removes half a litre of water, s records bedtime.\n\
Focus: Space starts or pauses the 25 minute timer, r resets it. A finished session adds 25 deep-work minutes.\n\
Identity: h/l picks a list, a adds, x removes, v edits the vision.\n\
e exports the activity log as CSV into the data directory.";

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn restore_terminal(mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
