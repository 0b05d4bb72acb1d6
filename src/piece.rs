//! Shapes, cells and the piece generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Side of one square in scene units. Every cell coordinate is a multiple of this.
pub const SQUARE_SIDE: i32 = 20;

/// Width of every shape's offset table, in columns. Spawn columns leave room for it.
const SPAWN_SPAN: i32 = 4;

/// A square's top-left corner in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Column and row in grid units. Rows above the top are negative.
    #[inline]
    pub const fn grid(self) -> (i32, i32) {
        (
            self.x.div_euclid(SQUARE_SIDE),
            self.y.div_euclid(SQUARE_SIDE),
        )
    }
}

/// Playfield rectangle in scene units; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Field of `columns` x `rows` squares anchored at the origin.
    pub const fn from_grid(columns: u16, rows: u16) -> Self {
        Self {
            left: 0,
            top: 0,
            right: columns as i32 * SQUARE_SIDE,
            bottom: rows as i32 * SQUARE_SIDE,
        }
    }

    pub const fn columns(&self) -> i32 {
        (self.right - self.left) / SQUARE_SIDE
    }

    pub const fn rows(&self) -> i32 {
        (self.bottom - self.top) / SQUARE_SIDE
    }

    #[inline]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.left && cell.x < self.right && cell.y >= self.top && cell.y < self.bottom
    }
}

/// The seven falling shapes. No rotation, so each has exactly one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Horizontal,
    LeftCorner,
    RightCorner,
    Square,
    StepUpRight,
    Pyramid,
    StepUpLeft,
}

impl Shape {
    pub const ALL: [Self; 7] = [
        Self::Horizontal,
        Self::LeftCorner,
        Self::RightCorner,
        Self::Square,
        Self::StepUpRight,
        Self::Pyramid,
        Self::StepUpLeft,
    ];

    /// (column, row) offsets from the spawn origin. Rows are negative: pieces start above the top.
    pub const fn offsets(self) -> &'static [(i32, i32); 4] {
        match self {
            Self::Horizontal => &[(0, -1), (1, -1), (2, -1), (3, -1)],
            Self::LeftCorner => &[(0, -2), (0, -1), (1, -1), (2, -1)],
            Self::RightCorner => &[(0, -1), (1, -1), (2, -1), (2, -2)],
            Self::Square => &[(0, -2), (1, -2), (0, -1), (1, -1)],
            Self::StepUpRight => &[(0, -1), (1, -1), (1, -2), (2, -2)],
            Self::Pyramid => &[(0, -1), (1, -1), (1, -2), (2, -1)],
            Self::StepUpLeft => &[(0, -2), (1, -2), (1, -1), (2, -1)],
        }
    }

    /// Index into the theme's shape palette.
    pub const fn color_index(self) -> usize {
        self as usize
    }
}

/// The falling tetromino: a shape and its four squares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub shape: Shape,
    pub cells: [Cell; 4],
}

impl Piece {
    /// Place `shape` with its origin at `column`, row 0.
    pub fn spawn(shape: Shape, column: i32, bounds: Bounds) -> Self {
        let origin_x = bounds.left + column * SQUARE_SIDE;
        let origin_y = bounds.top;
        let cells = shape
            .offsets()
            .map(|(cx, cy)| Cell::new(origin_x + cx * SQUARE_SIDE, origin_y + cy * SQUARE_SIDE));
        Self { shape, cells }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        for cell in &mut self.cells {
            *cell = cell.offset(dx, dy);
        }
    }

    pub fn cells_inside(&self, bounds: Bounds) -> usize {
        self.cells.iter().filter(|c| bounds.contains(**c)).count()
    }
}

/// Draws shapes and spawn columns from one generator seeded at construction.
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: StdRng,
}

impl PieceGenerator {
    /// Seeded generator for reproducible runs; `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_shape(&mut self) -> Shape {
        Shape::ALL[self.rng.gen_range(0..Shape::ALL.len())]
    }

    /// New piece of `shape` at a random column in `[0, columns - 4]`.
    pub fn generate(&mut self, shape: Shape, bounds: Bounds) -> Piece {
        let last_column = (bounds.columns() - SPAWN_SPAN).max(0);
        let column = self.rng.gen_range(0..=last_column);
        Piece::spawn(shape, column, bounds)
    }

    /// Random shape at a random column.
    pub fn spawn(&mut self, bounds: Bounds) -> Piece {
        let shape = self.next_shape();
        self.generate(shape, bounds)
    }
}
