//! Stackfall: a falling-block stacking puzzle in the terminal.

mod app;
mod game;
mod input;
mod piece;
mod scores;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result, bail};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;

/// Options derived from CLI that shape a session (field size, starting speed, seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub columns: u16,
    pub rows: u16,
    pub initial_interval_ms: u64,
    /// Seed for the piece generator; `None` draws one from the OS.
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path, args.log_level)?;
    }
    if args.width < MIN_COLUMNS {
        bail!("--width must be at least {MIN_COLUMNS} columns");
    }
    if args.height == 0 {
        bail!("--height must be at least 1 row");
    }
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "theme not loaded, using defaults");
            theme::Theme::load(None, args.palette).unwrap_or_default()
        }
    };
    let config = GameConfig {
        columns: args.width,
        rows: args.height,
        initial_interval_ms: args.interval_ms,
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme);
    app.run()?;
    Ok(())
}

/// Structured logs go to a file; the terminal belongs to the game.
fn init_logging(path: &Path, level: LevelFilter) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Shapes are up to four squares wide.
const MIN_COLUMNS: u16 = 4;

/// Falling-block stacking puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stackfall",
    version,
    about = "Falling-block stacking puzzle in the terminal. Stack as many pieces as you can before the pile reaches the top.",
    long_about = "Stackfall drops one of seven four-square shapes at a random column. Steer it \
        left and right and speed it down; it locks as soon as it lands on the floor or on the \
        pile. Every locked piece is a point and makes the next one fall faster. The game ends \
        when a new piece collides with the pile before it has fully entered the field.\n\n\
        CONTROLS:\n  A / Left    Move left     S / Down   Move down     D / Right  Move right\n  \
        Enter       Start         Backspace  Edit name     Esc        Quit\n\n\
        Each finished game is appended to the score log as `<name>, <points> points, <secs> sec`."
)]
pub struct Args {
    /// Playfield width in columns.
    #[arg(long, default_value = "12", value_name = "COLS")]
    pub width: u16,

    /// Playfield height in rows.
    #[arg(long, default_value = "24", value_name = "ROWS")]
    pub height: u16,

    /// Fall interval at the start of a game, in ms. Each lock shortens it by 50 ms down to 100 ms.
    #[arg(long, default_value_t = game::INITIAL_FALL_INTERVAL_MS, value_name = "MS")]
    pub interval_ms: u64,

    /// Seed for piece shapes and spawn columns (reproducible games).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Score log file; one line is appended per finished game.
    #[arg(long, default_value = scores::DEFAULT_SCORE_FILE, value_name = "FILE")]
    pub score_file: PathBuf,

    /// Player name to pre-fill.
    #[arg(short, long, default_value = "", value_name = "NAME")]
    pub name: String,

    /// Path to theme file (`theme[key]="#RRGGBB"` lines).
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette for the shapes.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the flash on locked pieces.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log verbosity when --log-file is set (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,
}
