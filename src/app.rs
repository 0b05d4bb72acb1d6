//! App: terminal init, main loop, triggers and key handling.

use crate::game::{GameState, MoveOutcome};
use crate::input::{Action, key_to_action};
use crate::piece::Cell;
use crate::scores::{ScoreEntry, ScoreLog};
use crate::theme::Theme;
use crate::timer::Trigger;
use crate::ui::Hud;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Elapsed-time read-out period.
const CLOCK_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound on one wait for input, so effects keep animating.
const FRAME_DURATION: Duration = Duration::from_millis(16);
/// Longest name kept in the field.
const MAX_NAME_LEN: usize = 24;

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    username: String,
    score_log: ScoreLog,
    best_points: u32,
    fall_trigger: Trigger,
    clock_trigger: Trigger,
    /// Squares of the last locked piece while its flash plays.
    flash_cells: Option<[Cell; 4]>,
    lock_flash: Option<Effect>,
    lock_flash_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(&config);
        let score_log = ScoreLog::new(&args.score_file);
        let best_points = score_log.best_points();
        Self {
            username: args.name.clone(),
            fall_trigger: Trigger::new(Duration::from_millis(config.initial_interval_ms)),
            clock_trigger: Trigger::new(CLOCK_INTERVAL),
            args,
            config,
            theme,
            state,
            score_log,
            best_points,
            flash_cells: None,
            lock_flash: None,
            lock_flash_time: None,
        }
    }

    /// Begin a new session: reset the core, restart both triggers.
    fn start_game(&mut self, now: Instant) {
        self.state.start();
        self.fall_trigger
            .set_interval(Duration::from_millis(self.state.fall_interval_ms), now);
        self.fall_trigger.start(now);
        self.clock_trigger.start(now);
        self.clear_flash();
        tracing::info!(
            username = %self.username,
            columns = self.config.columns,
            rows = self.config.rows,
            "game started"
        );
    }

    /// Stop both triggers and append the session to the score log. A failed write is logged
    /// and otherwise ignored.
    fn end_game(&mut self) {
        self.fall_trigger.stop();
        self.clock_trigger.stop();
        let summary = self.state.summary();
        tracing::info!(
            username = %self.username,
            points = summary.points,
            game_time = summary.game_time,
            log = %self.score_log.path().display(),
            "game over"
        );
        let entry = ScoreEntry::new(&self.username, summary);
        if let Err(e) = self.score_log.append(&entry) {
            tracing::warn!(error = %e, "score not saved");
        }
        self.best_points = self.best_points.max(summary.points);
    }

    /// Apply a validator outcome to the triggers and effects.
    fn after_move(&mut self, outcome: MoveOutcome, now: Instant) {
        match outcome {
            MoveOutcome::Accepted | MoveOutcome::Rejected => {}
            MoveOutcome::Locked => {
                let interval = Duration::from_millis(self.state.fall_interval_ms);
                if interval != self.fall_trigger.interval() {
                    self.fall_trigger.set_interval(interval, now);
                }
                let locked = self.state.last_lock.take();
                if !self.args.no_animation {
                    self.clear_flash();
                    self.flash_cells = locked.map(|p| p.cells);
                }
            }
            MoveOutcome::GameOver => self.end_game(),
        }
    }

    fn clear_flash(&mut self) {
        self.flash_cells = None;
        self.lock_flash = None;
        self.lock_flash_time = None;
    }

    /// Handle one action. Returns false when the app should exit.
    fn apply_action(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return false,
            Action::MoveLeft => {
                let outcome = self.state.move_left();
                self.after_move(outcome, now);
            }
            Action::MoveRight => {
                let outcome = self.state.move_right();
                self.after_move(outcome, now);
            }
            Action::MoveDown => {
                let outcome = self.state.soft_drop();
                self.after_move(outcome, now);
            }
            Action::Start if !self.state.is_running() => self.start_game(now),
            Action::Type(c) if !self.state.is_running() => {
                if self.username.chars().count() < MAX_NAME_LEN {
                    self.username.push(c);
                }
            }
            Action::Erase if !self.state.is_running() => {
                self.username.pop();
            }
            Action::Start | Action::Type(_) | Action::Erase | Action::None => {}
        }
        true
    }

    /// Fire whichever triggers are due.
    fn tick(&mut self, now: Instant) {
        if self.clock_trigger.fire(now) {
            self.state.tick_clock();
        }
        if self.fall_trigger.fire(now) {
            let outcome = self.state.fall();
            self.after_move(outcome, now);
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
            },
        };

        // Shrink the field if the terminal cannot show it; the bounds are fixed once play starts.
        let (term_cols, term_rows) = size()?;
        let (fit_w, fit_h) = crate::ui::max_playfield_for_terminal(term_cols, term_rows);
        let width = self.config.columns.min(fit_w).max(crate::MIN_COLUMNS);
        let height = self.config.rows.min(fit_h).max(1);
        if (width, height) != (self.config.columns, self.config.rows) {
            tracing::warn!(
                requested_columns = self.config.columns,
                requested_rows = self.config.rows,
                columns = width,
                rows = height,
                "playfield clamped to terminal size"
            );
            self.config.columns = width;
            self.config.rows = height;
            self.state = GameState::new(&self.config);
        }

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                let area = f.area();
                let hud = Hud {
                    state: &self.state,
                    theme: &self.theme,
                    username: &self.username,
                    best_points: self.best_points,
                };
                crate::ui::draw(
                    f,
                    &hud,
                    area,
                    self.flash_cells.as_ref(),
                    &mut self.lock_flash,
                    &mut self.lock_flash_time,
                    now,
                );
            })?;

            if self.lock_flash.as_ref().is_some_and(|e| e.done()) {
                self.clear_flash();
            }

            let timeout = [
                self.fall_trigger.remaining(now),
                self.clock_trigger.remaining(now),
            ]
            .into_iter()
            .flatten()
            .fold(FRAME_DURATION, |a, b| a.min(b))
            .saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key, self.state.is_running());
                        if !self.apply_action(action, Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }

            self.tick(Instant::now());
        }
    }
}
