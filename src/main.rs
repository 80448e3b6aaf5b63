pub mod config;
pub mod exercise;
pub mod gaze;
pub mod progress;
pub mod runtime;
pub mod sched;
pub mod store;
pub mod ui;

use crate::config::{Config, ConfigStore, FileConfigStore, Goals, Reminder};
use crate::gaze::{
    parse_target_rounds, GazeAssistController, GazeDirection, DEFAULT_TARGET_ROUNDS,
};
use crate::progress::{daily_progress, DailyProgress};
use crate::runtime::{AppEvent, CrosstermEventSource, Runner};
use crate::sched::{MonotonicClock, TickScheduler};
use crate::store::{ExerciseEntry, ExerciseRecord, GazeProgress, RecordsDb};
use chrono::{Local, NaiveTime};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// terminal rehabilitation exercise tracker
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal rehabilitation tracker for stroke recovery: log daily walking, fist-raise and eye-gaze exercises, follow progress against your goals, and run a guided on-screen eye-gaze session."
)]
pub struct Cli {
    /// default number of rounds for the guided eye-gaze exercise
    #[clap(short = 'r', long, default_value_t = DEFAULT_TARGET_ROUNDS)]
    rounds: u32,

    /// side the guided target moves toward
    #[clap(short = 'd', long, value_enum, default_value_t = GazeSide::Left)]
    direction: GazeSide,

    /// write all records as CSV to PATH and exit without starting the TUI
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum GazeSide {
    Left,
    Right,
}

impl GazeSide {
    fn as_direction(&self) -> GazeDirection {
        match self {
            GazeSide::Left => GazeDirection::Left,
            GazeSide::Right => GazeDirection::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Home,
    Record,
    Statistics,
    Settings,
    GazeAssist,
}

/// Numeric entry form for the record screen
#[derive(Debug, Default)]
pub struct RecordForm {
    pub fields: [String; 4],
    pub focus: usize,
}

impl RecordForm {
    pub const LABELS: [&'static str; 4] = [
        "Walking minutes",
        "Fist-raise sets",
        "Fist-raise reps",
        "Eye-gaze reps",
    ];

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.fields[self.focus].len() < 4 {
            self.fields[self.focus].push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.fields[self.focus].pop();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Empty fields are skipped; the record carries only what was logged
    pub fn to_entry(&self) -> ExerciseEntry {
        let num = |i: usize| self.fields[i].trim().parse::<u32>().ok();
        ExerciseEntry {
            walking_minutes: num(0),
            fist_raise_sets: num(1),
            fist_raise_reps: num(2),
            eye_gaze_count: num(3),
        }
    }
}

/// Goal and reminder editor for the settings screen
#[derive(Debug)]
pub struct SettingsForm {
    pub goal_fields: [String; 4],
    pub reminder_enabled: bool,
    pub reminder_time: String,
    pub focus: usize,
}

impl SettingsForm {
    pub const FIELD_COUNT: usize = 6;
    pub const TOGGLE_INDEX: usize = 4;
    pub const TIME_INDEX: usize = 5;

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            goal_fields: [
                cfg.goals.walking_minutes.to_string(),
                cfg.goals.fist_raise_sets.to_string(),
                cfg.goals.fist_raise_reps.to_string(),
                cfg.goals.eye_gaze_count.to_string(),
            ],
            reminder_enabled: cfg.reminder.enabled,
            reminder_time: cfg.reminder.time.clone(),
            focus: 0,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Self::FIELD_COUNT;
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Self::FIELD_COUNT - 1) % Self::FIELD_COUNT;
    }

    pub fn push(&mut self, c: char) {
        match self.focus {
            Self::TOGGLE_INDEX => {}
            Self::TIME_INDEX => {
                if (c.is_ascii_digit() || c == ':') && self.reminder_time.len() < 5 {
                    self.reminder_time.push(c);
                }
            }
            i => {
                if c.is_ascii_digit() && self.goal_fields[i].len() < 4 {
                    self.goal_fields[i].push(c);
                }
            }
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Self::TOGGLE_INDEX => {}
            Self::TIME_INDEX => {
                self.reminder_time.pop();
            }
            i => {
                self.goal_fields[i].pop();
            }
        }
    }

    pub fn toggle_reminder(&mut self) {
        self.reminder_enabled = !self.reminder_enabled;
    }

    /// Fields that fail to parse keep their current configured value
    pub fn to_config(&self, current: &Config) -> Config {
        let parse_or = |raw: &str, fallback: u32| raw.trim().parse::<u32>().unwrap_or(fallback);
        let time = if NaiveTime::parse_from_str(&self.reminder_time, "%H:%M").is_ok() {
            self.reminder_time.clone()
        } else {
            current.reminder.time.clone()
        };
        Config {
            goals: Goals {
                walking_minutes: parse_or(&self.goal_fields[0], current.goals.walking_minutes),
                fist_raise_sets: parse_or(&self.goal_fields[1], current.goals.fist_raise_sets),
                fist_raise_reps: parse_or(&self.goal_fields[2], current.goals.fist_raise_reps),
                eye_gaze_count: parse_or(&self.goal_fields[3], current.goals.eye_gaze_count),
            },
            reminder: Reminder {
                enabled: self.reminder_enabled,
                time,
            },
        }
    }
}

pub type GazeController =
    GazeAssistController<MonotonicClock, TickScheduler<MonotonicClock>, GazeProgress>;

#[derive(Debug)]
pub struct App {
    pub screen: Screen,
    pub db: Option<RecordsDb>,
    pub config_store: FileConfigStore,
    pub config: Config,
    pub records: Vec<ExerciseRecord>,
    pub gaze: GazeController,
    pub rounds_input: String,
    pub direction: GazeDirection,
    pub record_form: RecordForm,
    pub settings_form: SettingsForm,
    pub stats_scroll: usize,
    pub status: Option<String>,
    pub pending_clear: bool,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let db = RecordsDb::new().ok();
        let config_store = FileConfigStore::new();
        let config = config_store.load();
        let clock = MonotonicClock::new();
        let gaze = GazeAssistController::new(clock, TickScheduler::new(clock), GazeProgress::new());
        let records = db
            .as_ref()
            .and_then(|db| db.all_records().ok())
            .unwrap_or_default();
        let settings_form = SettingsForm::from_config(&config);

        Self {
            screen: Screen::Home,
            db,
            config_store,
            config,
            records,
            gaze,
            rounds_input: cli.rounds.to_string(),
            direction: cli.direction.as_direction(),
            record_form: RecordForm::default(),
            settings_form,
            stats_scroll: 0,
            status: None,
            pending_clear: false,
        }
    }

    pub fn today_progress(&self) -> DailyProgress {
        daily_progress(&self.records, &self.config.goals, Local::now().date_naive())
    }

    pub fn reminder_due(&self) -> bool {
        let today = Local::now().date_naive();
        let has_records_today = self.records.iter().any(|r| r.date == today);
        !has_records_today && self.config.reminder.is_due(Local::now().time())
    }

    fn refresh_records(&mut self) {
        self.records = self
            .db
            .as_ref()
            .and_then(|db| db.all_records().ok())
            .unwrap_or_default();
    }

    fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.status = None;
        self.pending_clear = false;
        if matches!(screen, Screen::Home | Screen::Statistics) {
            self.refresh_records();
        }
    }

    fn save_record(&mut self) {
        let entry = self.record_form.to_entry();
        if entry.is_empty() {
            self.status = Some("Nothing to save: fill in at least one exercise".to_string());
            return;
        }
        match self.db.as_ref().map(|db| db.save_entry(&entry)) {
            Some(Ok(_)) => {
                self.record_form.clear();
                self.set_screen(Screen::Home);
                self.status = Some("Record saved".to_string());
            }
            Some(Err(e)) => self.status = Some(format!("Could not save record: {e}")),
            None => self.status = Some("No database available, record not saved".to_string()),
        }
    }

    fn save_settings(&mut self) {
        self.config = self.settings_form.to_config(&self.config);
        self.settings_form = SettingsForm::from_config(&self.config);
        match self.config_store.save(&self.config) {
            Ok(()) => self.status = Some("Settings saved".to_string()),
            Err(e) => self.status = Some(format!("Could not save settings: {e}")),
        }
    }

    fn clear_records(&mut self) {
        if !self.pending_clear {
            self.pending_clear = true;
            self.status = Some("This deletes every record. Press x again to confirm".to_string());
            return;
        }
        self.pending_clear = false;
        match self.db.as_ref().map(|db| db.clear_all()) {
            Some(Ok(())) => {
                self.refresh_records();
                self.status = Some("All records cleared".to_string());
            }
            Some(Err(e)) => self.status = Some(format!("Could not clear records: {e}")),
            None => self.status = Some("No database available".to_string()),
        }
    }

    fn export_records(&mut self) {
        let Some(db) = self.db.as_ref() else {
            self.status = Some("No database available".to_string());
            return;
        };
        let path = format!("reha-records-{}.csv", Local::now().date_naive());
        let result = File::create(&path).and_then(|file| db.export_csv(file));
        match result {
            Ok(()) => self.status = Some(format!("Exported to {path}")),
            Err(e) => self.status = Some(format!("Export failed: {e}")),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = cli.export.as_ref() {
        let db = RecordsDb::new()?;
        let file = File::create(path)?;
        db.export_csv(file)?;
        println!("records exported to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    start_tui(&mut terminal, &mut app)?;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                let was_running = app.gaze.is_running();
                app.gaze.pump();

                if was_running && !app.gaze.is_running() {
                    // Session finished naturally: pick up the record it wrote
                    app.refresh_records();
                    app.status = Some(format!(
                        "Session complete: {} rounds saved",
                        app.gaze.completed_rounds()
                    ));
                }

                // Redraw on ticks only while the animation needs it
                if app.screen == Screen::GazeAssist && (was_running || app.gaze.is_running()) {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

/// Apply one key event; returns true when the app should exit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.screen {
        Screen::Home => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Char('r') => app.set_screen(Screen::Record),
            KeyCode::Char('s') => app.set_screen(Screen::Statistics),
            KeyCode::Char('c') => app.set_screen(Screen::Settings),
            KeyCode::Char('g') => app.set_screen(Screen::GazeAssist),
            _ => {}
        },
        Screen::Record => match key.code {
            KeyCode::Esc => {
                app.record_form.clear();
                app.set_screen(Screen::Home);
            }
            KeyCode::Tab | KeyCode::Down => app.record_form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => app.record_form.focus_prev(),
            KeyCode::Backspace => app.record_form.backspace(),
            KeyCode::Enter => app.save_record(),
            KeyCode::Char(c) => app.record_form.push(c),
            _ => {}
        },
        Screen::Statistics => match key.code {
            KeyCode::Esc => app.set_screen(Screen::Home),
            KeyCode::Up => app.stats_scroll = app.stats_scroll.saturating_sub(1),
            KeyCode::Down => app.stats_scroll += 1,
            KeyCode::Home => app.stats_scroll = 0,
            _ => {}
        },
        Screen::Settings => match key.code {
            KeyCode::Esc => app.set_screen(Screen::Home),
            KeyCode::Tab | KeyCode::Down => app.settings_form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => app.settings_form.focus_prev(),
            KeyCode::Backspace => app.settings_form.backspace(),
            KeyCode::Enter => app.save_settings(),
            KeyCode::Char(' ') => app.settings_form.toggle_reminder(),
            KeyCode::Char('x') => app.clear_records(),
            KeyCode::Char('e') => app.export_records(),
            KeyCode::Char(c) => app.settings_form.push(c),
            _ => {}
        },
        Screen::GazeAssist => match key.code {
            KeyCode::Esc => {
                // Leaving the screen tears the exercise down
                app.gaze.reset();
                app.set_screen(Screen::Home);
            }
            KeyCode::Enter => {
                let rounds = parse_target_rounds(&app.rounds_input);
                app.gaze.start(rounds, app.direction);
            }
            KeyCode::Char('x') => app.gaze.reset(),
            KeyCode::Left => {
                if !app.gaze.is_running() {
                    app.direction = GazeDirection::Left;
                }
            }
            KeyCode::Right => {
                if !app.gaze.is_running() {
                    app.direction = GazeDirection::Right;
                }
            }
            KeyCode::Backspace => {
                if !app.gaze.is_running() {
                    app.rounds_input.pop();
                }
            }
            KeyCode::Char(c) => {
                if !app.gaze.is_running() && c.is_ascii_digit() && app.rounds_input.len() < 3 {
                    app.rounds_input.push(c);
                }
            }
            _ => {}
        },
    }

    false
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}
