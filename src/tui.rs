use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};
use sinelab::lesson::{FrameSnapshot, Stage, SubStage};
use sinelab::render::{ghost_color, glow_color, ACCENT};
use sinelab::{Effect, Event, LabSession, Parameter, PollableState, WaveParameters};
use std::f64::consts::PI;
use std::io::{self, Stdout, Write};
use std::time::Duration;

const PLOT_ROWS: u16 = 15;
const CIRCLE_COLUMNS: u16 = 18;
const Y_LIMIT: f64 = 2.2;
const PHASE_STEP: f64 = PI / 20.0;
const LINEAR_STEP: f64 = 0.05;

const LABEL: Color = Color::Grey;
const MUTED: Color = Color::DarkGrey;
const LEARNING: Color = Color::Rgb { r: 0xf5, g: 0xa6, b: 0x23 };

/// How the terminal lab ended.
pub enum Outcome {
    Quit,
    Exited(WaveParameters),
}

/// Puts the terminal in raw mode on an alternate screen and restores it when dropped.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        queue!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
        stdout.flush()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = queue!(stdout, ResetColor, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = stdout.flush();
        let _ = terminal::disable_raw_mode();
    }
}

/// What the keyboard currently points at.
struct View {
    selected: Parameter,
    fps: u16,
}

impl View {
    /// The selected parameter, or the first adjustable one when the selection is locked.
    fn focus(&self, snapshot: &FrameSnapshot) -> Option<Parameter> {
        if snapshot.adjustable.contains(&self.selected) {
            return Some(self.selected);
        }
        snapshot.adjustable.first().copied()
    }

    fn cycle(&mut self, snapshot: &FrameSnapshot, forward: bool) {
        let adjustable = &snapshot.adjustable;
        if adjustable.is_empty() {
            return;
        }
        let index = adjustable.iter().position(|p| *p == self.selected).unwrap_or(0);
        let next = if forward { (index + 1) % adjustable.len() } else { (index + adjustable.len() - 1) % adjustable.len() };
        self.selected = adjustable[next];
    }
}

enum KeyOutcome {
    Continue,
    Quit,
    Exited(WaveParameters),
}

pub fn run(session: &LabSession, fps: u16) -> anyhow::Result<Outcome> {
    let _guard = TerminalGuard::new()?;
    let mut stdout = io::stdout();
    let mut pollable = session.pollable();
    let mut view = View { selected: Parameter::Amplitude, fps };
    let frame = Duration::from_millis(1000 / u64::from(fps.max(1)));
    tracing::info!(fps, "terminal lab started");

    loop {
        if pollable.poll() != PollableState::Unmodified {
            draw(&mut stdout, &session.snapshot(), &session.trail(), &view)?;
        }
        if !event::poll(frame)? {
            continue;
        }
        let TermEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match handle_key(session, &mut view, key) {
            KeyOutcome::Continue => draw(&mut stdout, &session.snapshot(), &session.trail(), &view)?,
            KeyOutcome::Quit => return Ok(Outcome::Quit),
            KeyOutcome::Exited(values) => return Ok(Outcome::Exited(values)),
        }
    }
}

fn handle_key(session: &LabSession, view: &mut View, key: KeyEvent) -> KeyOutcome {
    let snapshot = session.snapshot();
    let event = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return KeyOutcome::Quit,
        KeyCode::Left | KeyCode::Right => {
            let Some(parameter) = view.focus(&snapshot) else {
                return KeyOutcome::Continue;
            };
            let step = match parameter {
                Parameter::Phase => PHASE_STEP,
                _ => LINEAR_STEP,
            };
            let delta = if key.code == KeyCode::Left { -step } else { step };
            Some(Event::set(parameter, snapshot.params.get(parameter) + delta))
        }
        KeyCode::Up => {
            view.cycle(&snapshot, false);
            None
        }
        KeyCode::Down => {
            view.cycle(&snapshot, true);
            None
        }
        KeyCode::Char(digit @ '1'..='4') => answer_event(&snapshot, digit as usize - '1' as usize),
        KeyCode::Enter => Some(Event::Continue),
        KeyCode::Char('t') => Some(Event::TryAgain),
        KeyCode::Char('n') => Some(Event::NewChallenge),
        KeyCode::Char('r') => Some(Event::Restart),
        KeyCode::Char('x') => Some(Event::Exit),
        KeyCode::Char('p') => {
            session.toggle_pause();
            None
        }
        _ => None,
    };
    let Some(event) = event else {
        return KeyOutcome::Continue;
    };
    for effect in session.dispatch(event) {
        if let Effect::Exit(values) = effect {
            return KeyOutcome::Exited(values);
        }
    }
    KeyOutcome::Continue
}

fn answer_event(snapshot: &FrameSnapshot, index: usize) -> Option<Event> {
    if let Some(question) = snapshot.question {
        return question.choices.get(index).map(|choice| Event::SelectAnswer(choice.value));
    }
    let diagnose = snapshot.diagnose?;
    diagnose.choices.get(index).map(|(_, diagnosis)| Event::SelectDiagnosis(*diagnosis))
}

fn row_for(y: f64, top: u16) -> Option<u16> {
    let half = f64::from(PLOT_ROWS - 1) / 2.0;
    let row = (half - y / Y_LIMIT * half).round();
    (0.0..f64::from(PLOT_ROWS)).contains(&row).then(|| top + row as u16)
}

fn put(stdout: &mut Stdout, column: u16, row: u16, color: Color, text: &str) -> io::Result<()> {
    queue!(stdout, cursor::MoveTo(column, row), SetForegroundColor(color), Print(text))
}

fn draw(stdout: &mut Stdout, snapshot: &FrameSnapshot, trail: &[f64], view: &View) -> io::Result<()> {
    let (width, _) = terminal::size()?;
    queue!(stdout, terminal::Clear(terminal::ClearType::All))?;

    let progress = snapshot.progress;
    let header = format!("Signal Lab · {} ({}/{})", snapshot.stage, progress.current, progress.total);
    put(stdout, 0, 0, LABEL, &header)?;
    if let Some(prompt) = snapshot.prompt {
        put(stdout, 0, 1, Color::White, prompt.text)?;
        if let Some(subtext) = prompt.subtext {
            put(stdout, prompt.text.chars().count() as u16 + 2, 1, MUTED, subtext)?;
        }
    }

    let top = 3;
    let axis = top + (PLOT_ROWS - 1) / 2;
    let wave_start = CIRCLE_COLUMNS + 2;
    let columns = width.saturating_sub(wave_start) as usize;
    put(stdout, wave_start, axis, MUTED, &"─".repeat(columns))?;

    // unit circle: the user's rotating point, horizontally stretched for terminal cells
    let center = CIRCLE_COLUMNS / 2;
    let (cx, cy) = snapshot.circle;
    let column = (f64::from(center) + cx / Y_LIMIT * f64::from(center)).round().max(0.0) as u16;
    if let Some(row) = row_for(cy, top) {
        put(stdout, column, row, glow_color(snapshot.glow).into(), "●")?;
    }

    if let Some(ghost) = &snapshot.ghost {
        let color: Color = ghost_color(ghost.opacity).into();
        let dt = 1.0 / f64::from(view.fps);
        for offset in 0..columns {
            let t = snapshot.wave_time - offset as f64 * dt;
            if let Some(row) = row_for(ghost.params.sample(t), top) {
                put(stdout, wave_start + offset as u16, row, color, "·")?;
            }
        }
    }

    let wave: Color = glow_color(snapshot.glow).into();
    for (offset, y) in trail.iter().take(columns).enumerate() {
        if let Some(row) = row_for(*y, top) {
            put(stdout, wave_start + offset as u16, row, wave, "•")?;
        }
    }

    let mut line = top + PLOT_ROWS + 1;
    let focus = view.focus(snapshot);
    for parameter in [Parameter::Amplitude, Parameter::Frequency, Parameter::Phase] {
        let marker = if focus == Some(parameter) { "›" } else { " " };
        let value = snapshot.params.get(parameter);
        let value = match parameter {
            Parameter::Phase => sinelab::formula::format_phase(value),
            _ => format!("{value:.2}"),
        };
        let (color, suffix) = if snapshot.locked.contains(&parameter) {
            (MUTED, " (locked)")
        } else if snapshot.adjustable.contains(&parameter) {
            (Color::White, "")
        } else {
            (MUTED, "")
        };
        put(stdout, 0, line, color, &format!("{marker} {parameter:<10} {value}{suffix}"))?;
        line += 1;
    }

    line += 1;
    if let Some(meter) = &snapshot.meter {
        let color: Color = glow_color(snapshot.glow).into();
        put(stdout, 0, line, color, &format!("Match {}% ({})", meter.percent, meter.tier))?;
        line += 1;
    }
    if let Some(formula) = &snapshot.formula {
        let color: Color = if snapshot.stage == Stage::Reveal { ACCENT.into() } else { LABEL };
        put(stdout, 0, line, color, formula)?;
        line += 1;
    }

    line += 1;
    if let Some(question) = snapshot.question {
        put(stdout, 0, line, LEARNING, question.prompt)?;
        line += 1;
        for (index, choice) in question.choices.iter().enumerate() {
            put(stdout, 2, line, Color::White, &format!("{}) {}", index + 1, choice.label))?;
            line += 1;
        }
    } else if let Some(diagnose) = snapshot.diagnose {
        put(stdout, 0, line, LEARNING, diagnose.prompt)?;
        line += 1;
        for (index, (label, _)) in diagnose.choices.iter().enumerate() {
            put(stdout, 2, line, Color::White, &format!("{}) {label}", index + 1))?;
            line += 1;
        }
    }
    if let Some(feedback) = &snapshot.feedback {
        let (color, verdict) = if feedback.correct { (Color::Green, "Correct!") } else { (LEARNING, "Not quite.") };
        put(stdout, 0, line, color, verdict)?;
        put(stdout, 0, line + 1, LABEL, feedback.explanation)?;
        line += 2;
    }

    line += 1;
    put(stdout, 0, line, MUTED, &help_line(snapshot))?;
    queue!(stdout, ResetColor)?;
    stdout.flush()
}

fn help_line(snapshot: &FrameSnapshot) -> String {
    let mut keys = vec!["←/→ adjust", "↑/↓ select"];
    match (snapshot.stage, snapshot.sub_stage) {
        (Stage::Observe, _) if snapshot.continue_available => keys.push("enter continue"),
        (_, SubStage::Question | SubStage::Diagnose) => keys.push("1-4 answer"),
        (_, SubStage::Feedback) if snapshot.feedback.as_ref().is_some_and(|f| f.correct) => keys.push("enter continue"),
        (_, SubStage::Feedback) => keys.push("t try again"),
        (Stage::Reveal, _) => keys.extend(["n new challenge", "x exit"]),
        _ => {}
    }
    keys.extend(["r restart", "p pause", "q quit"]);
    keys.join(" · ")
}
