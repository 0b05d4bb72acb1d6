//! Game state: settled stack, move validation, locking, session bookkeeping.

use crate::piece::{Bounds, Cell, Piece, PieceGenerator, SQUARE_SIDE, Shape};

/// Fall interval at session start unless overridden on the command line.
pub const INITIAL_FALL_INTERVAL_MS: u64 = 1000;
/// A lock speeds the game up only while the interval is at least this long.
pub const SPEEDUP_THRESHOLD_MS: u64 = 150;
/// Amount shaved off the fall interval per lock.
pub const SPEEDUP_STEP_MS: u64 = 50;

/// What the validator decided about a proposed displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Legal: the piece moves.
    Accepted,
    /// Illegal, nothing changes.
    Rejected,
    /// The piece stays where it is, joins the stack and a new piece spawns.
    Locked,
    /// A still-spawning piece ran into the stack.
    GameOver,
}

/// A locked square. The shape is kept only for its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub cell: Cell,
    pub shape: Shape,
}

/// Every square that has locked this session, in lock order.
#[derive(Debug, Clone, Default)]
pub struct SettledCells {
    blocks: Vec<Block>,
}

impl SettledCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.blocks.iter().any(|b| b.cell == cell)
    }

    pub fn absorb(&mut self, piece: &Piece) {
        self.blocks.extend(piece.cells.iter().map(|&cell| Block {
            cell,
            shape: piece.shape,
        }));
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}

/// Decide the fate of moving `piece` by (`dx`, `dy`). Pure: nothing is mutated.
///
/// A piece with all four squares inside the field locks when the step would hit the
/// floor or the stack, except that a purely sideways bump into the stack is just
/// refused. A piece that is still partly above the top never locks on the floor,
/// but any contact with the stack ends the game, whichever way it was moving.
/// Leaving the field sideways is always refused before anything else is considered.
pub fn attempt_move(
    piece: &Piece,
    settled: &SettledCells,
    bounds: Bounds,
    dx: i32,
    dy: i32,
) -> MoveOutcome {
    let fully_inside = piece.cells_inside(bounds) == piece.cells.len();

    let mut vertical_blocked = false;
    let mut collision = false;
    for cell in piece.cells {
        let next = cell.offset(dx, dy);
        if next.x < bounds.left || next.x >= bounds.right {
            return MoveOutcome::Rejected;
        }
        vertical_blocked |= next.y >= bounds.bottom;
        collision |= settled.contains(next);
    }

    if fully_inside {
        if collision && dy == 0 {
            MoveOutcome::Rejected
        } else if vertical_blocked || collision {
            MoveOutcome::Locked
        } else {
            MoveOutcome::Accepted
        }
    } else if collision {
        MoveOutcome::GameOver
    } else {
        MoveOutcome::Accepted
    }
}

/// Next fall interval after a lock: one step faster, never below the floor.
pub const fn sped_up(interval_ms: u64) -> u64 {
    if interval_ms >= SPEEDUP_THRESHOLD_MS {
        interval_ms - SPEEDUP_STEP_MS
    } else {
        interval_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started yet.
    Idle,
    Running,
    Ended,
}

/// Final numbers of a finished session, as written to the score log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub points: u32,
    pub game_time: u32,
}

/// Playfield plus session bookkeeping.
#[derive(Debug)]
pub struct GameState {
    pub bounds: Bounds,
    pub piece: Option<Piece>,
    pub settled: SettledCells,
    pub score: u32,
    pub elapsed_secs: u32,
    pub fall_interval_ms: u64,
    pub phase: Phase,
    /// Squares of the most recent lock, until the UI has shown them.
    pub last_lock: Option<Piece>,
    initial_interval_ms: u64,
    generator: PieceGenerator,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        Self {
            bounds: Bounds::from_grid(config.columns, config.rows),
            piece: None,
            settled: SettledCells::new(),
            score: 0,
            elapsed_secs: 0,
            fall_interval_ms: config.initial_interval_ms,
            phase: Phase::Idle,
            last_lock: None,
            initial_interval_ms: config.initial_interval_ms,
            generator: PieceGenerator::new(config.seed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Start or restart: empty stack, zeroed read-outs, initial speed, first piece.
    pub fn start(&mut self) {
        self.settled.clear();
        self.score = 0;
        self.elapsed_secs = 0;
        self.fall_interval_ms = self.initial_interval_ms;
        self.last_lock = None;
        self.piece = Some(self.generator.spawn(self.bounds));
        self.phase = Phase::Running;
    }

    /// One-second clock tick.
    pub fn tick_clock(&mut self) {
        if self.is_running() {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    /// Periodic fall step.
    pub fn fall(&mut self) -> MoveOutcome {
        self.step(0, SQUARE_SIDE)
    }

    pub fn move_left(&mut self) -> MoveOutcome {
        self.step(-SQUARE_SIDE, 0)
    }

    pub fn move_right(&mut self) -> MoveOutcome {
        self.step(SQUARE_SIDE, 0)
    }

    pub fn soft_drop(&mut self) -> MoveOutcome {
        self.step(0, SQUARE_SIDE)
    }

    /// Validate a displacement of the active piece and apply whatever it implies.
    pub fn step(&mut self, dx: i32, dy: i32) -> MoveOutcome {
        if !self.is_running() {
            return MoveOutcome::Rejected;
        }
        let Some(piece) = self.piece.as_mut() else {
            return MoveOutcome::Rejected;
        };
        let outcome = attempt_move(piece, &self.settled, self.bounds, dx, dy);
        match outcome {
            MoveOutcome::Accepted => piece.translate(dx, dy),
            MoveOutcome::Rejected => {}
            MoveOutcome::Locked => self.lock(),
            MoveOutcome::GameOver => self.phase = Phase::Ended,
        }
        outcome
    }

    fn lock(&mut self) {
        let Some(piece) = self.piece.take() else {
            return;
        };
        self.settled.absorb(&piece);
        self.score += 1;
        self.piece = Some(self.generator.spawn(self.bounds));
        self.fall_interval_ms = sped_up(self.fall_interval_ms);
        tracing::debug!(
            shape = ?piece.shape,
            score = self.score,
            fall_interval_ms = self.fall_interval_ms,
            "piece locked"
        );
        self.last_lock = Some(piece);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            points: self.score,
            game_time: self.elapsed_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: Bounds = Bounds::from_grid(12, 24);
    const S: i32 = SQUARE_SIDE;

    fn config() -> crate::GameConfig {
        crate::GameConfig {
            columns: 12,
            rows: 24,
            initial_interval_ms: INITIAL_FALL_INTERVAL_MS,
            seed: Some(9),
        }
    }

    fn running_state() -> GameState {
        let mut state = GameState::new(&config());
        state.start();
        state
    }

    fn horizontal_at(column: i32, row: i32) -> Piece {
        let mut piece = Piece::spawn(Shape::Horizontal, column, FIELD);
        piece.translate(0, (row + 1) * S);
        piece
    }

    fn settled_at(cells: &[(i32, i32)]) -> SettledCells {
        let mut settled = SettledCells::new();
        for chunk in cells.chunks(4) {
            let mut piece = Piece::spawn(Shape::Square, 0, FIELD);
            for (slot, &(col, row)) in piece.cells.iter_mut().zip(chunk) {
                *slot = Cell::new(col * S, row * S);
            }
            settled.absorb(&piece);
        }
        settled
    }

    #[test]
    fn sideways_out_of_field_is_rejected_everywhere() {
        let settled = SettledCells::new();
        let left_edge = horizontal_at(0, 5);
        let right_edge = horizontal_at(8, 5);
        assert_eq!(attempt_move(&left_edge, &settled, FIELD, -S, 0), MoveOutcome::Rejected);
        assert_eq!(attempt_move(&right_edge, &settled, FIELD, S, 0), MoveOutcome::Rejected);

        // Still spawning: the side check wins over everything else.
        let spawning = horizontal_at(0, -1);
        assert_eq!(attempt_move(&spawning, &settled, FIELD, -S, 0), MoveOutcome::Rejected);
    }

    #[test]
    fn side_check_short_circuits_a_stack_collision() {
        // Would touch the stack on the way down, but also leaves the field.
        let piece = horizontal_at(8, 10);
        let settled = settled_at(&[(9, 11), (10, 11), (11, 11), (0, 23)]);
        assert_eq!(attempt_move(&piece, &settled, FIELD, S, S), MoveOutcome::Rejected);
    }

    #[test]
    fn stepping_onto_the_floor_locks() {
        let piece = horizontal_at(3, 23);
        let outcome = attempt_move(&piece, &SettledCells::new(), FIELD, 0, S);
        assert_eq!(outcome, MoveOutcome::Locked);
    }

    #[test]
    fn landing_on_the_stack_locks() {
        let piece = horizontal_at(3, 20);
        let settled = settled_at(&[(5, 21)]);
        assert_eq!(attempt_move(&piece, &settled, FIELD, 0, S), MoveOutcome::Locked);
    }

    #[test]
    fn sideways_into_the_stack_is_refused_without_locking() {
        let piece = horizontal_at(3, 20);
        let settled = settled_at(&[(7, 20)]);
        assert_eq!(attempt_move(&piece, &settled, FIELD, S, 0), MoveOutcome::Rejected);
    }

    #[test]
    fn free_moves_are_accepted() {
        let piece = horizontal_at(3, 10);
        let settled = settled_at(&[(0, 23)]);
        assert_eq!(attempt_move(&piece, &settled, FIELD, 0, S), MoveOutcome::Accepted);
        assert_eq!(attempt_move(&piece, &settled, FIELD, -S, 0), MoveOutcome::Accepted);
        assert_eq!(attempt_move(&piece, &settled, FIELD, S, 0), MoveOutcome::Accepted);
    }

    #[test]
    fn collision_while_spawning_ends_the_game_in_any_direction() {
        let spawning = horizontal_at(3, -1);
        let below = settled_at(&[(4, 0)]);
        assert_eq!(attempt_move(&spawning, &below, FIELD, 0, S), MoveOutcome::GameOver);

        // Partly inside (two rows tall, lower row visible) bumping sideways.
        let mut corner = Piece::spawn(Shape::LeftCorner, 3, FIELD);
        corner.translate(0, S);
        assert_eq!(corner.cells_inside(FIELD), 3);
        let beside = settled_at(&[(6, 0)]);
        assert_eq!(attempt_move(&corner, &beside, FIELD, S, 0), MoveOutcome::GameOver);
    }

    #[test]
    fn spawning_piece_never_locks_on_the_floor() {
        // One-row field: a two-row shape is never fully inside.
        let shallow = Bounds::from_grid(12, 1);
        let mut corner = Piece::spawn(Shape::LeftCorner, 0, shallow);
        corner.translate(0, S);
        assert_eq!(corner.cells_inside(shallow), 3);
        let outcome = attempt_move(&corner, &SettledCells::new(), shallow, 0, S);
        assert_eq!(outcome, MoveOutcome::Accepted);
    }

    #[test]
    fn attempt_move_does_not_mutate() {
        let piece = horizontal_at(3, 23);
        let settled = settled_at(&[(0, 23)]);
        let before = piece.clone();
        let _ = attempt_move(&piece, &settled, FIELD, 0, S);
        assert_eq!(piece, before);
        assert_eq!(settled.len(), 4);
    }

    #[test]
    fn sped_up_steps_down_to_the_floor() {
        assert_eq!(sped_up(1000), 950);
        assert_eq!(sped_up(150), 100);
        assert_eq!(sped_up(100), 100);
        assert_eq!(sped_up(149), 149);
        let mut interval = INITIAL_FALL_INTERVAL_MS;
        for _ in 0..100 {
            let next = sped_up(interval);
            assert!(next <= interval);
            interval = next;
        }
        assert_eq!(interval, 100);
    }

    #[test]
    fn steps_are_ignored_before_start() {
        let mut state = GameState::new(&config());
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.fall(), MoveOutcome::Rejected);
        state.tick_clock();
        assert_eq!(state.elapsed_secs, 0);
    }

    #[test]
    fn horizontal_piece_falls_to_the_floor_and_locks() {
        let mut state = running_state();
        state.piece = Some(Piece::spawn(Shape::Horizontal, 3, FIELD));
        let mut falls = 0;
        loop {
            match state.fall() {
                MoveOutcome::Accepted => falls += 1,
                MoveOutcome::Locked => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        // From y = -20 down to y = 460.
        assert_eq!(falls, 24);
        let locked: Vec<Cell> = state.settled.iter().map(|b| b.cell).collect();
        assert_eq!(
            locked,
            vec![
                Cell::new(60, 460),
                Cell::new(80, 460),
                Cell::new(100, 460),
                Cell::new(120, 460)
            ]
        );
        assert_eq!(state.score, 1);
        assert_eq!(state.fall_interval_ms, 950);
        let next = state.piece.as_ref().expect("new piece spawned");
        assert!(next.cells.iter().all(|c| c.y < 0));
        assert!(next.cells.iter().any(|c| c.y == -S));
        assert_eq!(state.last_lock.as_ref().map(|p| p.shape), Some(Shape::Horizontal));
    }

    #[test]
    fn landing_on_stack_behaves_like_the_floor() {
        let mut state = running_state();
        state.settled = settled_at(&[(3, 23), (4, 23), (5, 23), (6, 23)]);
        let mut piece = Piece::spawn(Shape::Horizontal, 3, FIELD);
        piece.translate(0, 23 * S);
        state.piece = Some(piece);
        assert_eq!(state.soft_drop(), MoveOutcome::Locked);
        assert_eq!(state.settled.len(), 8);
        assert_eq!(state.score, 1);
        assert!(state.settled.contains(Cell::new(60, 440)));
    }

    #[test]
    fn sideways_bump_keeps_piece_falling() {
        let mut state = running_state();
        state.settled = settled_at(&[(7, 10)]);
        state.piece = Some(horizontal_at(3, 10));
        let before = state.piece.clone();
        assert_eq!(state.move_right(), MoveOutcome::Rejected);
        assert_eq!(state.piece, before);
        assert_eq!(state.score, 0);
        assert_eq!(state.settled.len(), 4);
        assert_eq!(state.fall_interval_ms, INITIAL_FALL_INTERVAL_MS);
    }

    #[test]
    fn accepted_and_rejected_moves_leave_score_and_speed_alone() {
        let mut state = running_state();
        state.piece = Some(horizontal_at(0, 5));
        assert_eq!(state.move_left(), MoveOutcome::Rejected);
        assert_eq!(state.move_right(), MoveOutcome::Accepted);
        assert_eq!(state.fall(), MoveOutcome::Accepted);
        assert_eq!(state.score, 0);
        assert_eq!(state.fall_interval_ms, INITIAL_FALL_INTERVAL_MS);
        assert_eq!(state.piece.as_ref().map(|p| p.cells[0]), Some(Cell::new(20, 120)));
    }

    #[test]
    fn early_collision_ends_the_session() {
        let mut state = running_state();
        state.settled = settled_at(&[(3, 0), (4, 0), (5, 0), (6, 0)]);
        state.piece = Some(Piece::spawn(Shape::Horizontal, 3, FIELD));
        state.score = 7;
        state.elapsed_secs = 42;
        assert_eq!(state.fall(), MoveOutcome::GameOver);
        assert_eq!(state.phase, Phase::Ended);
        assert_eq!(state.settled.len(), 4);
        assert_eq!(
            state.summary(),
            SessionSummary {
                points: 7,
                game_time: 42
            }
        );
        assert_eq!(state.fall(), MoveOutcome::Rejected);
        state.tick_clock();
        assert_eq!(state.elapsed_secs, 42);
    }

    #[test]
    fn stacking_a_column_eventually_ends_the_game() {
        let mut state = running_state();
        let mut locks = 0;
        loop {
            match state.fall() {
                MoveOutcome::Locked => locks += 1,
                MoveOutcome::GameOver => break,
                MoveOutcome::Accepted => {}
                MoveOutcome::Rejected => panic!("falls are never refused"),
            }
            assert!(locks < 500, "game never ended");
        }
        assert_eq!(state.score, locks);
        assert_eq!(state.settled.len(), 4 * locks as usize);
        for block in state.settled.iter() {
            assert!(FIELD.contains(block.cell));
        }
    }

    #[test]
    fn restart_clears_the_previous_session() {
        let mut state = running_state();
        state.settled = settled_at(&[(3, 0), (4, 0), (5, 0), (6, 0)]);
        state.piece = Some(Piece::spawn(Shape::Horizontal, 3, FIELD));
        state.fall_interval_ms = 300;
        state.elapsed_secs = 12;
        assert_eq!(state.fall(), MoveOutcome::GameOver);

        state.start();
        assert_eq!(state.phase, Phase::Running);
        assert!(state.settled.is_empty());
        assert_eq!(state.score, 0);
        assert_eq!(state.elapsed_secs, 0);
        assert_eq!(state.fall_interval_ms, INITIAL_FALL_INTERVAL_MS);
        assert!(state.last_lock.is_none());
        let piece = state.piece.as_ref().expect("first piece");
        assert!(piece.cells_inside(FIELD) < 4);
        assert_eq!(state.fall(), MoveOutcome::Accepted);
    }

    #[test]
    fn clock_counts_seconds_while_running() {
        let mut state = running_state();
        for _ in 0..3 {
            state.tick_clock();
        }
        assert_eq!(state.elapsed_secs, 3);
    }
}
