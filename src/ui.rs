use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::exercise::ExerciseType;
use crate::gaze::{AnimationPhase, GazeDirection};
use crate::progress::ratio;
use crate::store::ExerciseRecord;
use crate::{App, RecordForm, Screen, SettingsForm};
use chrono::Local;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn accent() -> Style {
    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
}

fn status_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Home => render_home(self, area, buf),
            Screen::Record => render_record(self, area, buf),
            Screen::Statistics => render_statistics(self, area, buf),
            Screen::Settings => render_settings(self, area, buf),
            Screen::GazeAssist => render_gaze(self, area, buf),
        }
    }
}

fn render_home(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title + date
            Constraint::Length(1), // status / reminder banner
            Constraint::Length(3), // walking
            Constraint::Length(3), // fist raise
            Constraint::Length(3), // eye gaze
            Constraint::Length(1), // padding
            Constraint::Length(1), // encouragement
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ])
        .split(area);

    let today = Local::now().format("%A, %B %e %Y");
    let title = Paragraph::new(vec![
        Line::from(Span::styled("Welcome back", bold())),
        Line::from(Span::styled(today.to_string(), dim())),
    ]);
    title.render(chunks[0], buf);

    let banner = if let Some(status) = app.status.as_deref() {
        Some(Span::styled(status.to_string(), status_style()))
    } else if app.reminder_due() {
        Some(Span::styled(
            "Reminder: time for today's training!",
            status_style(),
        ))
    } else {
        None
    };
    if let Some(banner) = banner {
        Paragraph::new(banner).render(chunks[1], buf);
    }

    let progress = app.today_progress();

    let walking = progress_gauge(
        ExerciseType::Walking,
        format!(
            "{} / {} min",
            progress.walking.completed, progress.walking.target
        ),
        ratio(progress.walking.completed, progress.walking.target),
        progress.walking.achieved,
    );
    walking.render(chunks[2], buf);

    let fist = &progress.fist_raise;
    let fist_ratio = (ratio(fist.completed_sets, fist.target_sets)
        + ratio(fist.completed_reps, fist.target_reps))
        / 2.0;
    let fist_raise = progress_gauge(
        ExerciseType::FistRaise,
        format!(
            "{}x{} / {}x{} sets",
            fist.completed_sets, fist.completed_reps, fist.target_sets, fist.target_reps
        ),
        fist_ratio,
        fist.achieved,
    );
    fist_raise.render(chunks[3], buf);

    let eye_gaze = progress_gauge(
        ExerciseType::EyeGaze,
        format!(
            "{} / {} reps",
            progress.eye_gaze.completed, progress.eye_gaze.target
        ),
        ratio(progress.eye_gaze.completed, progress.eye_gaze.target),
        progress.eye_gaze.achieved,
    );
    eye_gaze.render(chunks[4], buf);

    let encouragement = Paragraph::new(Span::styled(
        crate::progress::encouragement(&progress),
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    encouragement.render(chunks[6], buf);

    hints("(r)ecord   (s)tatistics   (g)aze assist   settings (c)   (q)uit").render(chunks[8], buf);
}

fn progress_gauge(exercise: ExerciseType, label: String, ratio: f64, achieved: bool) -> Gauge<'static> {
    let info = exercise.info();
    let style = if achieved {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Magenta)
    };
    let title = format!("{} {}", info.icon, info.name);
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(style)
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label)
}

fn render_record(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(1), // status
            Constraint::Length(8), // form
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ])
        .split(area);

    Paragraph::new(Span::styled("Log today's training", bold())).render(chunks[0], buf);

    if let Some(status) = app.status.as_deref() {
        Paragraph::new(Span::styled(status.to_string(), status_style())).render(chunks[1], buf);
    }

    let mut lines = Vec::new();
    for (i, label) in RecordForm::LABELS.iter().enumerate() {
        let value = &app.record_form.fields[i];
        let focused = i == app.record_form.focus;
        let cursor = if focused { "_" } else { "" };
        let style = if focused {
            bold().add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{:<18} {}{}", format!("{label}:"), value, cursor),
            style,
        )));
        lines.push(Line::default());
    }
    Paragraph::new(lines).render(chunks[2], buf);

    hints("Enter save   Tab next field   Backspace delete   Esc cancel").render(chunks[4], buf);
}

fn render_statistics(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(3), // summary tiles
            Constraint::Length(1), // padding
            Constraint::Min(2),    // recent records
            Constraint::Length(1), // hints
        ])
        .split(area);

    Paragraph::new(Span::styled("Training statistics", bold())).render(chunks[0], buf);

    let summary = crate::progress::summarize(&app.records, Local::now().date_naive());
    let tiles = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(chunks[1]);

    summary_tile("Training days", summary.training_days).render(tiles[0], buf);
    summary_tile("Total records", summary.total_records).render(tiles[1], buf);
    summary_tile("Last 7 days", summary.last_week_records).render(tiles[2], buf);

    render_record_list(app, chunks[3], buf);

    hints("Up/Down scroll   Esc back").render(chunks[4], buf);
}

fn summary_tile(title: &str, value: usize) -> Paragraph<'static> {
    Paragraph::new(Span::styled(value.to_string(), accent()))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .alignment(Alignment::Center)
}

fn render_record_list(app: &App, area: Rect, buf: &mut Buffer) {
    if app.records.is_empty() {
        Paragraph::new(Span::styled("No training records yet", dim()))
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    }

    // Two lines per record; clamp the scroll so the last page stays full
    let visible = (area.height as usize / 2).max(1);
    let max_scroll = app.records.len().saturating_sub(visible);
    let scroll = app.stats_scroll.min(max_scroll);

    let mut lines = Vec::new();
    for record in app.records.iter().skip(scroll).take(visible) {
        lines.push(Line::from(Span::styled(record_heading(record), bold())));
        lines.push(Line::from(Span::styled(record_details(record), dim())));
    }
    Paragraph::new(lines).render(area, buf);
}

fn record_heading(record: &ExerciseRecord) -> String {
    let elapsed = Local::now().signed_duration_since(record.timestamp);
    let age = HumanTime::from(std::time::Duration::from_secs(
        elapsed.num_seconds().max(0) as u64,
    ))
    .to_text_en(Accuracy::Rough, Tense::Past);
    format!("{}  ({})", record.date.format("%B %e"), age)
}

fn record_details(record: &ExerciseRecord) -> String {
    let mut parts = Vec::new();
    if let Some(minutes) = record.entry.walking_minutes {
        parts.push(format!("walking {minutes} min"));
    }
    match (record.entry.fist_raise_sets, record.entry.fist_raise_reps) {
        (Some(sets), Some(reps)) => parts.push(format!("fist raises {sets}x{reps}")),
        (Some(sets), None) => parts.push(format!("fist raises {sets} sets")),
        (None, Some(reps)) => parts.push(format!("fist raises {reps} reps")),
        (None, None) => {}
    }
    if let Some(count) = record.entry.eye_gaze_count {
        parts.push(format!("eye gaze {count} reps"));
    }
    if parts.is_empty() {
        "empty record".to_string()
    } else {
        parts.join("   ")
    }
}

fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),  // title
            Constraint::Length(1),  // status
            Constraint::Length(12), // form
            Constraint::Min(0),
            Constraint::Length(2), // hints
        ])
        .split(area);

    Paragraph::new(Span::styled("Goals and reminder", bold())).render(chunks[0], buf);

    if let Some(status) = app.status.as_deref() {
        Paragraph::new(Span::styled(status.to_string(), status_style())).render(chunks[1], buf);
    }

    let form = &app.settings_form;
    let goal_labels = [
        "Walking goal (min/day)",
        "Fist-raise sets goal",
        "Fist-raise reps goal",
        "Eye-gaze goal (reps/day)",
    ];

    let mut lines = Vec::new();
    for (i, label) in goal_labels.iter().enumerate() {
        lines.push(settings_line(label, &form.goal_fields[i], form.focus == i));
        lines.push(Line::default());
    }
    let toggle = if form.reminder_enabled { "[x]" } else { "[ ]" };
    lines.push(settings_line(
        "Reminder enabled",
        toggle,
        form.focus == SettingsForm::TOGGLE_INDEX,
    ));
    lines.push(Line::default());
    lines.push(settings_line(
        "Reminder time (HH:MM)",
        &form.reminder_time,
        form.focus == SettingsForm::TIME_INDEX,
    ));
    Paragraph::new(lines).render(chunks[2], buf);

    hints("Enter save   Space toggle reminder   (e)xport csv   (x) clear records   Esc back")
        .render(chunks[4], buf);
}

fn settings_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let cursor = if focused { "_" } else { "" };
    let style = if focused {
        bold().add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default()
    };
    Line::from(Span::styled(
        format!("{:<26} {}{}", format!("{label}:"), value, cursor),
        style,
    ))
}

fn render_gaze(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // instruction
            Constraint::Min(5),    // stage
            Constraint::Length(6), // control panel
        ])
        .split(area);

    let instruction = Paragraph::new(Span::styled(
        "Keep your head still and follow the ball with your eyes",
        accent(),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    instruction.render(chunks[0], buf);

    render_gaze_stage(app, chunks[1], buf);
    render_gaze_panel(app, chunks[2], buf);
}

fn render_gaze_stage(app: &App, stage: Rect, buf: &mut Buffer) {
    if stage.width == 0 || stage.height == 0 {
        return;
    }

    let ball_y = stage.y + stage.height / 2;
    let span = stage.width.saturating_sub(1);
    let ball_x = stage.x + (app.gaze.position() * span as f64).round() as u16;
    buf.set_string(ball_x, ball_y, app.gaze.glyph().to_string(), accent());

    if app.gaze.is_running() && ball_y + 2 < stage.y + stage.height {
        let caption = format!(
            "round {} / {}",
            app.gaze.completed_rounds() + 1,
            app.gaze.target_rounds()
        );
        let width = caption.chars().count() as u16;
        if stage.width > width {
            let right_edge = stage.x + stage.width - width;
            let x = ball_x
                .saturating_sub(width / 2)
                .clamp(stage.x, right_edge);
            buf.set_string(x, ball_y + 2, caption, dim());
        }
    }
}

fn render_gaze_panel(app: &App, area: Rect, buf: &mut Buffer) {
    let running = app.gaze.is_running();
    let direction = match app.direction {
        GazeDirection::Left => "left",
        GazeDirection::Right => "right",
    };
    let phase = match app.gaze.phase() {
        AnimationPhase::Idle => "ready when you are",
        AnimationPhase::MovingOut => "follow the ball outward",
        AnimationPhase::PausedAtExtreme => "hold your gaze",
        AnimationPhase::MovingBack => "follow the ball back",
        AnimationPhase::PausedAtCenter => "rest a moment",
    };

    let rounds_cursor = if running { "" } else { "_" };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("rounds: {}{}", app.rounds_input, rounds_cursor),
                if running { dim() } else { bold() },
            ),
            Span::raw("   "),
            Span::styled(format!("direction: {direction}"), bold()),
            Span::raw("   "),
            Span::styled(
                format!("completed today: {}", app.gaze.completed_today()),
                accent(),
            ),
        ]),
        Line::from(Span::styled(phase.to_string(), Style::default().add_modifier(Modifier::ITALIC))),
    ];
    if let Some(status) = app.status.as_deref() {
        lines.push(Line::from(Span::styled(status.to_string(), status_style())));
    } else {
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        "Enter start   x reset   Left/Right direction   digits rounds   Esc back",
        dim(),
    )));

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::TOP))
        .render(area, buf);
}

fn hints(text: &str) -> Paragraph<'static> {
    Paragraph::new(Span::styled(text.to_string(), dim()))
}
