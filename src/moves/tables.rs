use crate::bitboard::{Bitboard, PLAYABLE};
use crate::board::Color;
use crate::square::{BOARD_DIM, NUM_SQUARES, Square};
use once_cell::sync::OnceCell;

/// The eight ray directions. "North" points toward row 0 (Yellow's edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Dir {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
    NorthEast = 4,
    NorthWest = 5,
    SouthEast = 6,
    SouthWest = 7,
}

impl Dir {
    pub const ALL: [Dir; 8] = [
        Dir::North,
        Dir::South,
        Dir::East,
        Dir::West,
        Dir::NorthEast,
        Dir::NorthWest,
        Dir::SouthEast,
        Dir::SouthWest,
    ];

    pub const ORTHOGONAL: [Dir; 4] = [Dir::North, Dir::South, Dir::East, Dir::West];
    pub const DIAGONAL: [Dir; 4] = [Dir::NorthEast, Dir::NorthWest, Dir::SouthEast, Dir::SouthWest];

    #[inline(always)]
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Dir::North => (-1, 0),
            Dir::South => (1, 0),
            Dir::East => (0, 1),
            Dir::West => (0, -1),
            Dir::NorthEast => (-1, 1),
            Dir::NorthWest => (-1, -1),
            Dir::SouthEast => (1, 1),
            Dir::SouthWest => (1, -1),
        }
    }

    /// Whether stepping in this direction increases the linear index.
    /// Decides which end of a blocker set is nearest the ray source.
    #[inline(always)]
    pub const fn increasing(self) -> bool {
        matches!(self, Dir::South | Dir::East | Dir::SouthEast | Dir::SouthWest)
    }

    #[inline(always)]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Dir::NorthEast | Dir::NorthWest | Dir::SouthEast | Dir::SouthWest
        )
    }

    #[inline(always)]
    pub const fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::South => Dir::North,
            Dir::East => Dir::West,
            Dir::West => Dir::East,
            Dir::NorthEast => Dir::SouthWest,
            Dir::NorthWest => Dir::SouthEast,
            Dir::SouthEast => Dir::NorthWest,
            Dir::SouthWest => Dir::NorthEast,
        }
    }
}

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_DELTAS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// All precomputed movement geometry. Rays terminate at board edges and
/// at the boundary of the corner holes, so sliding attacks never leak
/// into or across a hole.
pub struct MoveTables {
    pub rays: Box<[[Bitboard; 8]; NUM_SQUARES]>,
    pub knight: Box<[Bitboard; NUM_SQUARES]>,
    pub king: Box<[Bitboard; NUM_SQUARES]>,
    /// Squares a pawn of `[color]` standing on `[square]` attacks.
    pub pawn_attacks: Box<[[Bitboard; NUM_SQUARES]; 4]>,
    /// Promotion zone per color: the three enemy home bands plus the
    /// first full line past the board midline in the advance direction.
    pub promotion: [Bitboard; 4],
    /// Double-push source line per color.
    pub pawn_home: [Bitboard; 4],
    /// Two-deep home band per color (back rank plus pawn rank).
    pub home_zone: [Bitboard; 4],
}

pub fn tables() -> &'static MoveTables {
    static TABLES: OnceCell<MoveTables> = OnceCell::new();
    TABLES.get_or_init(build_tables)
}

fn leaper_targets(sq: Square, deltas: &[(i8, i8)]) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(dr, dc) in deltas {
        if let Some(to) = sq.offset(dr, dc)
            && to.is_playable()
        {
            bb.set(to);
        }
    }
    bb
}

fn ray_from(sq: Square, dir: Dir) -> Bitboard {
    let (dr, dc) = dir.delta();
    let mut bb = Bitboard::EMPTY;
    let mut cur = sq;
    loop {
        match cur.offset(dr, dc) {
            Some(next) if next.is_playable() => {
                bb.set(next);
                cur = next;
            }
            _ => return bb,
        }
    }
}

fn playable_row(row: u8) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for col in 0..BOARD_DIM {
        let sq = Square::from_coords(row, col);
        if sq.is_playable() {
            bb.set(sq);
        }
    }
    bb
}

fn playable_col(col: u8) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for row in 0..BOARD_DIM {
        let sq = Square::from_coords(row, col);
        if sq.is_playable() {
            bb.set(sq);
        }
    }
    bb
}

fn home_zone(color: Color) -> Bitboard {
    match color {
        Color::Red => playable_row(12) | playable_row(13),
        Color::Yellow => playable_row(0) | playable_row(1),
        Color::Blue => playable_col(0) | playable_col(1),
        Color::Green => playable_col(12) | playable_col(13),
    }
}

// First full row/column strictly past the midline in the color's advance
// direction.
fn mid_axis(color: Color) -> Bitboard {
    match color {
        Color::Red => playable_row(6),
        Color::Yellow => playable_row(7),
        Color::Blue => playable_col(7),
        Color::Green => playable_col(6),
    }
}

fn build_tables() -> MoveTables {
    let mut rays = Box::new([[Bitboard::EMPTY; 8]; NUM_SQUARES]);
    let mut knight = Box::new([Bitboard::EMPTY; NUM_SQUARES]);
    let mut king = Box::new([Bitboard::EMPTY; NUM_SQUARES]);
    let mut pawn_attacks = Box::new([[Bitboard::EMPTY; NUM_SQUARES]; 4]);

    for idx in 0..NUM_SQUARES {
        let sq = Square::from_index(idx as u8);
        if !sq.is_playable() {
            continue;
        }
        for dir in Dir::ALL {
            rays[idx][dir as usize] = ray_from(sq, dir);
        }
        knight[idx] = leaper_targets(sq, &KNIGHT_DELTAS);
        king[idx] = leaper_targets(sq, &KING_DELTAS);
        for color in Color::ALL {
            let (fr, fc) = color.forward();
            // Forward-diagonals relative to the advance direction.
            let deltas = if fc == 0 {
                [(fr, -1), (fr, 1)]
            } else {
                [(-1, fc), (1, fc)]
            };
            pawn_attacks[color as usize][idx] = leaper_targets(sq, &deltas);
        }
    }

    let mut promotion = [Bitboard::EMPTY; 4];
    for color in Color::ALL {
        let mut zone = mid_axis(color);
        for other in Color::ALL {
            if other != color {
                zone |= home_zone(other);
            }
        }
        promotion[color as usize] = zone & PLAYABLE;
    }

    let pawn_home = [
        playable_row(12),
        playable_col(1),
        playable_row(1),
        playable_col(12),
    ];
    let home_zone = [
        home_zone(Color::Red),
        home_zone(Color::Blue),
        home_zone(Color::Yellow),
        home_zone(Color::Green),
    ];

    MoveTables {
        rays,
        knight,
        king,
        pawn_attacks,
        promotion,
        pawn_home,
        home_zone,
    }
}

/// Direction from `a` to `b` when both lie on one ray, else `None`.
pub fn dir_between(a: Square, b: Square) -> Option<Dir> {
    let dr = b.row() as i16 - a.row() as i16;
    let dc = b.col() as i16 - a.col() as i16;
    if dr == 0 && dc == 0 {
        return None;
    }
    let dir = if dr == 0 {
        if dc > 0 { Dir::East } else { Dir::West }
    } else if dc == 0 {
        if dr > 0 { Dir::South } else { Dir::North }
    } else if dr.abs() == dc.abs() {
        match (dr > 0, dc > 0) {
            (true, true) => Dir::SouthEast,
            (true, false) => Dir::SouthWest,
            (false, true) => Dir::NorthEast,
            (false, false) => Dir::NorthWest,
        }
    } else {
        return None;
    };
    // The ray may be cut short by a corner hole before reaching b.
    if tables().rays[a.index() as usize][dir as usize].contains(b) {
        Some(dir)
    } else {
        None
    }
}

/// Squares strictly between two ray-aligned squares.
pub fn between(a: Square, b: Square) -> Bitboard {
    match dir_between(a, b) {
        Some(dir) => {
            let t = tables();
            t.rays[a.index() as usize][dir as usize]
                & t.rays[b.index() as usize][dir.opposite() as usize]
        }
        None => Bitboard::EMPTY,
    }
}
