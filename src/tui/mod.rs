//! Terminal User Interface for moa-console

mod colors;
pub mod markup;
mod render;

use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tracing::debug;

use crate::controller::Controller;
use crate::view::SharedView;

/// Pane receiving key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Model toggles.
    Models,
    /// Prompt editor.
    Prompt,
    /// Output tabs.
    Output,
    /// Aggregate panel.
    Aggregate,
}

impl Focus {
    const fn next(self) -> Self {
        match self {
            Self::Models => Self::Prompt,
            Self::Prompt => Self::Output,
            Self::Output => Self::Aggregate,
            Self::Aggregate => Self::Models,
        }
    }
}

/// Lines moved by PageUp / PageDown.
const SCROLL_PAGE: usize = 10;

/// Interactive state around the controller.
#[derive(Debug)]
pub struct App {
    controller: Controller,
    view: SharedView,
    prompt: String,
    focus: Focus,
    cursor: usize,
    response_scroll: usize,
    aggregate_scroll: usize,
    ticks: usize,
    should_quit: bool,
}

impl App {
    /// Wrap a controller whose handles write into `view`.
    #[must_use]
    pub fn new(controller: Controller, view: SharedView) -> Self {
        Self {
            controller,
            view,
            prompt: String::new(),
            focus: Focus::Prompt,
            cursor: 0,
            response_scroll: 0,
            aggregate_scroll: 0,
            ticks: 0,
            should_quit: false,
        }
    }

    /// The controller.
    #[must_use]
    pub const fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Regions written by the controller.
    #[must_use]
    pub const fn view(&self) -> &SharedView {
        &self.view
    }

    /// Prompt being edited.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Focused pane.
    #[must_use]
    pub const fn focus(&self) -> Focus {
        self.focus
    }

    /// Index of the highlighted selection control.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// First visible line of the active response. Clamped when drawn.
    #[must_use]
    pub const fn response_scroll(&self) -> usize {
        self.response_scroll
    }

    /// First visible line of the aggregate panel. Clamped when drawn.
    #[must_use]
    pub const fn aggregate_scroll(&self) -> usize {
        self.aggregate_scroll
    }

    /// Whether the user asked to quit.
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Apply finished tasks and advance the spinner.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        self.controller.process_pending();
        let controls = self.controller.controls().len();
        if self.cursor >= controls {
            self.cursor = controls.saturating_sub(1);
        }
    }

    /// Spinner frame for the busy indicator.
    #[must_use]
    pub fn spinner(&self) -> char {
        const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
        FRAMES[self.ticks % FRAMES.len()]
    }

    /// Handle one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::Left => self.previous_tab(),
            KeyCode::Right => self.next_tab(),
            _ => match self.focus {
                Focus::Models => self.handle_models_key(key.code),
                Focus::Prompt => self.handle_prompt_key(key.code),
                Focus::Output => self.handle_output_key(key.code),
                Focus::Aggregate => scroll(&mut self.aggregate_scroll, key.code),
            },
        }
    }

    fn next_tab(&mut self) {
        self.controller.next_tab();
        self.response_scroll = 0;
    }

    fn previous_tab(&mut self) {
        self.controller.previous_tab();
        self.response_scroll = 0;
    }

    fn handle_models_key(&mut self, code: KeyCode) {
        let controls = self.controller.controls();
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < controls.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(control) = controls.get(self.cursor) {
                    self.controller.activate_control(control);
                }
            }
            KeyCode::Char('r') => self.controller.refresh_catalog(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => match self.controller.generate(&self.prompt) {
                Ok(()) => {
                    self.response_scroll = 0;
                    self.aggregate_scroll = 0;
                }
                Err(e) => debug!("Generate rejected: {e}"),
            },
            KeyCode::Backspace => {
                self.prompt.pop();
            }
            KeyCode::Char(c) => self.prompt.push(c),
            _ => {}
        }
    }

    fn handle_output_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('h') => self.previous_tab(),
            KeyCode::Char('l') => self.next_tab(),
            KeyCode::Char('r') => self.controller.refresh_catalog(),
            _ => scroll(&mut self.response_scroll, code),
        }
    }
}

/// Apply a scroll key to `offset`; other keys are ignored.
const fn scroll(offset: &mut usize, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => *offset = offset.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *offset = offset.saturating_add(1),
        KeyCode::PageUp => *offset = offset.saturating_sub(SCROLL_PAGE),
        KeyCode::PageDown => *offset = offset.saturating_add(SCROLL_PAGE),
        KeyCode::Home | KeyCode::Char('g') => *offset = 0,
        _ => {}
    }
}

enum Event {
    /// Poll interval elapsed, or a non-key event arrived
    Tick,
    Key(KeyEvent),
}

/// Wait up to `timeout` for a key press.
fn next_event(timeout: Duration) -> Result<Event> {
    if !event::poll(timeout)? {
        return Ok(Event::Tick);
    }
    match event::read()? {
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
        _ => Ok(Event::Tick),
    }
}

/// Run the TUI application
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to
pub fn run(mut app: App, poll_interval_ms: u64) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, Duration::from_millis(poll_interval_ms));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poll_interval: Duration,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        match next_event(poll_interval)? {
            Event::Tick => app.tick(),
            Event::Key(key) => {
                app.handle_key(key);
                app.controller.process_pending();
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
