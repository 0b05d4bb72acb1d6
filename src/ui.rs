//! Layout and drawing: playfield, name field, read-outs, start control, game-over label.

use crate::game::{GameState, Phase};
use crate::piece::{Bounds, Cell, SQUARE_SIDE, Shape};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per square, so squares look roughly square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 26;
/// Duration of the flash over a freshly locked piece.
const LOCK_FLASH_MS: u32 = 250;

/// Everything the frame shows besides the game state itself.
pub struct Hud<'a> {
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub username: &'a str,
    pub best_points: u32,
}

/// Playfield size in terminal cells (border included) for a grid of `columns` x `rows`.
pub const fn playfield_size(columns: u16, rows: u16) -> (u16, u16) {
    (columns * CELL_WIDTH + 2, rows + 2)
}

/// Largest grid that fits in a terminal of the given size next to the sidebar.
pub fn max_playfield_for_terminal(term_cols: u16, term_rows: u16) -> (u16, u16) {
    let columns = term_cols.saturating_sub(2 + SIDEBAR_WIDTH) / CELL_WIDTH;
    let rows = term_rows.saturating_sub(2);
    (columns, rows)
}

/// Terminal position of the top-left half of a square, if it is visible.
fn cell_position(board: Rect, bounds: Bounds, cell: Cell) -> Option<(u16, u16)> {
    if !bounds.contains(cell) {
        return None;
    }
    let (col, row) = cell.offset(-bounds.left, -bounds.top).grid();
    let col = u16::try_from(col).ok()?;
    let row = u16::try_from(row).ok()?;
    let x = board.x + col * CELL_WIDTH;
    let y = board.y + row;
    (x + CELL_WIDTH <= board.x + board.width && y < board.y + board.height).then_some((x, y))
}

/// Draw the whole screen. While `flash` holds a locked piece and animation is on, fades
/// its squares in from white through `lock_flash`.
pub fn draw(
    frame: &mut Frame,
    hud: &Hud,
    area: Rect,
    flash: Option<&[Cell; 4]>,
    lock_flash: &mut Option<Effect>,
    lock_flash_time: &mut Option<Instant>,
    now: Instant,
) {
    let bounds = hud.state.bounds;
    let (pw, ph) = playfield_size(bounds.columns() as u16, bounds.rows() as u16);
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board = draw_playfield(frame, hud, inner[0]);
    draw_sidebar(frame, hud, inner[1]);

    if let Some(cells) = flash {
        apply_lock_flash(frame, bounds, board, cells, lock_flash, lock_flash_time, now);
    }
}

/// Returns the board rect inside the border.
fn draw_playfield(frame: &mut Frame, hud: &Hud, area: Rect) -> Rect {
    let theme = hud.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" stackfall ", Style::default().fg(theme.title)));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for y in board.y..board.y + board.height {
        for x in board.x..board.x + board.width {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(theme.bg));
        }
    }

    let bounds = hud.state.bounds;
    let settled = hud.state.settled.iter().map(|b| (b.cell, b.shape));
    let falling = hud
        .state
        .piece
        .iter()
        .flat_map(|p| p.cells.iter().map(move |c| (*c, p.shape)));
    for (cell, shape) in settled.chain(falling) {
        if let Some((x, y)) = cell_position(board, bounds, cell) {
            draw_square(frame, x, y, theme, shape);
        }
    }
    board
}

/// One square: outline glyphs over the shape's fill.
fn draw_square(frame: &mut Frame, x: u16, y: u16, theme: &Theme, shape: Shape) {
    let style = Style::default().fg(theme.outline).bg(theme.shape_color(shape));
    let buf = frame.buffer_mut();
    buf[(x, y)].set_symbol("[").set_style(style);
    buf[(x + 1, y)].set_symbol("]").set_style(style);
}

fn apply_lock_flash(
    frame: &mut Frame,
    bounds: Bounds,
    board: Rect,
    cells: &[Cell; 4],
    lock_flash: &mut Option<Effect>,
    lock_flash_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = lock_flash_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *lock_flash_time = Some(now);

    if lock_flash.is_none() {
        let positions: HashSet<(u16, u16)> = cells
            .iter()
            .filter_map(|c| cell_position(board, bounds, *c))
            .flat_map(|(x, y)| (0..CELL_WIDTH).map(move |dx| (x + dx, y)))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (LOCK_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board);
        *lock_flash = Some(effect);
    }

    if let Some(effect) = lock_flash {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_sidebar(frame: &mut Frame, hud: &Hud, area: Rect) {
    let theme = hud.theme;
    let state = hud.state;
    let running = state.is_running();
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // name
            Constraint::Length(1),
            Constraint::Length(5), // time, score, best
            Constraint::Length(1),
            Constraint::Length(3), // start
            Constraint::Length(1),
            Constraint::Length(3), // status
            Constraint::Length(1),
            Constraint::Min(0), // help
        ])
        .split(area);

    // Name: editable only between sessions.
    let (name_style, cursor) = if running {
        (Style::default().fg(theme.inactive_fg), "")
    } else {
        (fg_style, "_")
    };
    Paragraph::new(Line::from(vec![
        Span::styled(hud.username.to_string(), name_style),
        Span::styled(cursor, title_style),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(" Name ", title_style)),
    )
    .render(chunks[0], frame.buffer_mut());

    let stats = vec![
        Line::from(vec![
            Span::styled("Time:  ", title_style),
            Span::styled(format!("{} sec", state.elapsed_secs), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(hud.best_points.max(state.score).to_string(), fg_style),
        ]),
    ];
    Paragraph::new(stats)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[2], frame.buffer_mut());

    let start_style = if running {
        Style::default().fg(theme.inactive_fg)
    } else {
        Style::default().fg(Color::Black).bg(theme.title).bold()
    };
    Paragraph::new(Line::from(Span::styled(" [ START ] ", start_style)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[4], frame.buffer_mut());

    let status = match state.phase {
        Phase::Ended => Span::styled(" Game Over! ", Style::default().fg(Color::White).bg(Color::Red)),
        Phase::Running => Span::styled(
            format!("Speed: {} ms", state.fall_interval_ms),
            fg_style,
        ),
        Phase::Idle => Span::styled("Type a name", Style::default().fg(theme.inactive_fg)),
    };
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(border_style))
        .render(chunks[6], frame.buffer_mut());

    let key = |k: &'static str| Span::styled(k, title_style);
    let help = if running {
        vec![
            Line::from(vec![key(" A/← "), Span::styled("left", fg_style)]),
            Line::from(vec![key(" S/↓ "), Span::styled("down", fg_style)]),
            Line::from(vec![key(" D/→ "), Span::styled("right", fg_style)]),
            Line::from(vec![key(" Esc "), Span::styled("quit", fg_style)]),
        ]
    } else {
        vec![
            Line::from(vec![key(" Enter "), Span::styled("start", fg_style)]),
            Line::from(vec![key(" Esc   "), Span::styled("quit", fg_style)]),
        ]
    };
    Paragraph::new(help).render(chunks[8], frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn config() -> crate::GameConfig {
        crate::GameConfig {
            columns: 12,
            rows: 24,
            initial_interval_ms: 1000,
            seed: Some(3),
        }
    }

    fn render(state: &GameState, username: &str) -> String {
        let theme = Theme::classic();
        let hud = Hud {
            state,
            theme: &theme,
            username,
            best_points: 17,
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                draw(f, &hud, area, None, &mut None, &mut None, Instant::now());
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn playfield_size_includes_border() {
        assert_eq!(playfield_size(12, 24), (26, 26));
    }

    #[test]
    fn terminal_fit_leaves_room_for_sidebar() {
        assert_eq!(max_playfield_for_terminal(80, 30), (26, 28));
        assert_eq!(max_playfield_for_terminal(10, 1), (0, 0));
    }

    #[test]
    fn cells_above_the_top_are_hidden() {
        let bounds = Bounds::from_grid(12, 24);
        let board = Rect::new(1, 1, 24, 24);
        assert_eq!(cell_position(board, bounds, Cell::new(60, -20)), None);
        assert_eq!(cell_position(board, bounds, Cell::new(60, 0)), Some((7, 1)));
        assert_eq!(cell_position(board, bounds, Cell::new(220, 460)), Some((23, 24)));
    }

    #[test]
    fn idle_screen_offers_start_and_name() {
        let state = GameState::new(&config());
        let screen = render(&state, "ada");
        assert!(screen.contains("[ START ]"));
        assert!(screen.contains("ada_"));
        assert!(screen.contains("Best:  17"));
        assert!(!screen.contains("Game Over!"));
    }

    #[test]
    fn running_screen_shows_squares_and_readouts() {
        let mut state = GameState::new(&config());
        state.start();
        let mut piece = Piece::spawn(Shape::Square, 0, state.bounds);
        piece.translate(0, 2 * SQUARE_SIDE);
        state.piece = Some(piece);
        state.elapsed_secs = 5;
        let screen = render(&state, "ada");
        assert!(screen.contains("[][]"));
        assert!(screen.contains("Time:  5 sec"));
        assert!(screen.contains("Score: 0"));
        assert!(!screen.contains("ada_"));
    }

    #[test]
    fn ended_screen_shows_game_over() {
        let mut state = GameState::new(&config());
        state.start();
        state.phase = Phase::Ended;
        let screen = render(&state, "");
        assert!(screen.contains("Game Over!"));
    }
}
