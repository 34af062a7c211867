use crate::bitboard::Bitboard;
use crate::square::{NUM_SQUARES, Square};
use arrayvec::ArrayVec;
use std::fmt;

pub mod castle_bits;
pub use castle_bits::*;

// Empty square value; no packed (color, piece) code collides with it.
pub(crate) const EMPTY_SQ: u8 = 0xFF;

/// The four players, in turn order Red -> Blue -> Yellow -> Green.
/// Red sits at the bottom edge, Blue left, Yellow top, Green right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Blue = 1,
    Yellow = 2,
    Green = 3,
}

/// Piece kinds shared by all four colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Blue, Color::Yellow, Color::Green];

    /// Next color in turn order, ignoring eliminations.
    #[inline(always)]
    pub fn next(self) -> Color {
        Color::from_u8((self as u8 + 1) & 3)
    }

    #[inline(always)]
    pub(crate) fn from_u8(v: u8) -> Color {
        match v {
            0 => Color::Red,
            1 => Color::Blue,
            2 => Color::Yellow,
            3 => Color::Green,
            _ => panic!("invalid Color encoding: {}", v),
        }
    }

    /// Pawn advance direction as a `(drow, dcol)` step.
    #[inline(always)]
    pub const fn forward(self) -> (i8, i8) {
        match self {
            Color::Red => (-1, 0),
            Color::Yellow => (1, 0),
            Color::Blue => (0, 1),
            Color::Green => (0, -1),
        }
    }

    pub const fn code(self) -> char {
        match self {
            Color::Red => 'r',
            Color::Blue => 'b',
            Color::Yellow => 'y',
            Color::Green => 'g',
        }
    }

    pub fn from_code(c: char) -> Option<Color> {
        match c {
            'r' => Some(Color::Red),
            'b' => Some(Color::Blue),
            'y' => Some(Color::Yellow),
            'g' => Some(Color::Green),
            _ => None,
        }
    }
}

impl Piece {
    pub const ALL: [Piece; 6] = [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ];

    #[inline(always)]
    pub(crate) fn from_u8(v: u8) -> Piece {
        match v {
            0 => Piece::Pawn,
            1 => Piece::Knight,
            2 => Piece::Bishop,
            3 => Piece::Rook,
            4 => Piece::Queen,
            5 => Piece::King,
            _ => panic!("invalid Piece encoding: {}", v),
        }
    }

    /// Evaluation value in centipawns. Kings carry a sentinel zero; the
    /// evaluator adds a separate live-king constant.
    pub const fn value(self) -> i32 {
        match self {
            Piece::Pawn => 100,
            Piece::Knight => 300,
            Piece::Bishop => 500,
            Piece::Rook => 500,
            Piece::Queen => 900,
            Piece::King => 0,
        }
    }

    /// Points awarded for capturing this piece.
    pub const fn capture_award(self) -> u32 {
        match self {
            Piece::Pawn => 1,
            Piece::Knight => 3,
            Piece::Bishop => 5,
            Piece::Rook => 5,
            Piece::Queen => 9,
            Piece::King => 0,
        }
    }

    /// Tie-break ordering for least-valuable-attacker scans.
    pub const fn attacker_value(self) -> i32 {
        match self {
            Piece::Pawn => 1,
            Piece::Knight => 2,
            Piece::Bishop => 3,
            Piece::Rook => 4,
            Piece::Queen => 5,
            Piece::King => 6,
        }
    }

    pub const fn code(self) -> char {
        match self {
            Piece::Pawn => 'P',
            Piece::Knight => 'N',
            Piece::Bishop => 'B',
            Piece::Rook => 'R',
            Piece::Queen => 'Q',
            Piece::King => 'K',
        }
    }

    pub fn from_code(c: char) -> Option<Piece> {
        match c {
            'P' => Some(Piece::Pawn),
            'N' => Some(Piece::Knight),
            'B' => Some(Piece::Bishop),
            'R' => Some(Piece::Rook),
            'Q' => Some(Piece::Queen),
            'K' => Some(Piece::King),
            _ => None,
        }
    }
}

/// Two-character piece code like `rK` or `yP`, as used on the wire.
pub fn piece_code(color: Color, piece: Piece) -> String {
    let mut s = String::with_capacity(2);
    s.push(color.code());
    s.push(piece.code());
    s
}

pub fn parse_piece_code(code: &str) -> Option<(Color, Piece)> {
    let mut chars = code.chars();
    let color = Color::from_code(chars.next()?)?;
    let piece = Piece::from_code(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some((color, piece))
}

/// Small set of colors backed by a nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ColorSet(pub u8);

impl ColorSet {
    pub const EMPTY: ColorSet = ColorSet(0);

    #[inline(always)]
    pub fn contains(self, c: Color) -> bool {
        self.0 & (1 << c as u8) != 0
    }

    #[inline(always)]
    pub fn insert(&mut self, c: Color) {
        self.0 |= 1 << c as u8;
    }

    #[inline(always)]
    pub fn remove(&mut self, c: Color) {
        self.0 &= !(1 << c as u8);
    }

    #[inline(always)]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |&c| self.contains(c))
    }
}

/// A pending en-passant capture window. Up to four may be live at once,
/// one per color; each closes when its creator's next turn begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpTarget {
    /// The square the double-pushing pawn skipped over.
    pub square: Square,
    /// Color whose pawn double-pushed.
    pub creator: Color,
    /// Committed-move counter at creation time.
    pub creator_ply: u32,
}

pub type EpTargets = ArrayVec<EpTarget, 4>;

/// The complete authoritative position: per-piece bitboards plus every
/// derived cache the move generator and searcher read. Mutation goes
/// through `moves::execute`; after each committed mutation the derived
/// fields agree with the piece boards again.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    /// Live pieces, `[color][piece]`. Eliminated colors are all-empty.
    pub(crate) piece_bb: [[Bitboard; 6]; 4],
    /// Frozen boards of eliminated players, kept for display only.
    pub(crate) eliminated_bb: [[Bitboard; 6]; 4],
    pub(crate) occ_color: [Bitboard; 4],
    pub(crate) occ_all: Bitboard,
    /// Per-square lookup: 0xFF empty, else `(color << 3) | piece`.
    pub(crate) piece_on_sq: [u8; NUM_SQUARES],
    pub(crate) turn: Color,
    pub(crate) eliminated: ColorSet,
    pub(crate) moved: CastleBits,
    pub(crate) ep_targets: EpTargets,
    /// Squares attacked by each color; empty for eliminated colors.
    pub(crate) attack_maps: [Bitboard; 4],
    pub(crate) check_status: [bool; 4],
    /// Absolutely pinned pieces of the side to move.
    pub(crate) pinned_mask: Bitboard,
    pub(crate) zobrist: u64,
    /// Committed move counter; stamps en-passant windows.
    pub(crate) ply: u32,
    /// Optimistic-concurrency counter, bumped on every committed mutation.
    pub(crate) version: u64,
}

// Back-rank piece order along axis coordinates 3..=10: the king sits at
// coordinate 7 and the queen at 6 for every color.
const BACK_RANK: [Piece; 8] = [
    Piece::Rook,
    Piece::Knight,
    Piece::Bishop,
    Piece::Queen,
    Piece::King,
    Piece::Bishop,
    Piece::Knight,
    Piece::Rook,
];

impl Position {
    pub fn empty() -> Self {
        Position {
            piece_bb: [[Bitboard::EMPTY; 6]; 4],
            eliminated_bb: [[Bitboard::EMPTY; 6]; 4],
            occ_color: [Bitboard::EMPTY; 4],
            occ_all: Bitboard::EMPTY,
            piece_on_sq: [EMPTY_SQ; NUM_SQUARES],
            turn: Color::Red,
            eliminated: ColorSet::EMPTY,
            moved: CastleBits::default(),
            ep_targets: EpTargets::new(),
            attack_maps: [Bitboard::EMPTY; 4],
            check_status: [false; 4],
            pinned_mask: Bitboard::EMPTY,
            zobrist: 0,
            ply: 0,
            version: 0,
        }
    }

    /// The standard four-player starting position: each color's back rank
    /// along coordinates 3..=10 of its home edge, pawns one step in.
    pub fn initial() -> Self {
        let mut pos = Position::empty();
        for color in Color::ALL {
            for (i, &piece) in BACK_RANK.iter().enumerate() {
                let coord = 3 + i as u8;
                let sq = match color {
                    Color::Red => Square::from_coords(13, coord),
                    Color::Yellow => Square::from_coords(0, coord),
                    Color::Blue => Square::from_coords(coord, 0),
                    Color::Green => Square::from_coords(coord, 13),
                };
                pos.place(color, piece, sq);
            }
            for coord in 3..=10u8 {
                let sq = match color {
                    Color::Red => Square::from_coords(12, coord),
                    Color::Yellow => Square::from_coords(1, coord),
                    Color::Blue => Square::from_coords(coord, 1),
                    Color::Green => Square::from_coords(coord, 12),
                };
                pos.place(color, Piece::Pawn, sq);
            }
        }
        pos.zobrist = pos.compute_zobrist_full();
        pos.refresh_derived();
        pos
    }

    #[inline(always)]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.piece_bb[color as usize][piece as usize]
    }

    #[inline(always)]
    pub fn eliminated_pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.eliminated_bb[color as usize][piece as usize]
    }

    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.occ_all
    }

    #[inline(always)]
    pub fn occupancy(&self, color: Color) -> Bitboard {
        self.occ_color[color as usize]
    }

    /// Union of all active colors' occupancy except `color`.
    #[inline(always)]
    pub fn enemy_occupancy(&self, color: Color) -> Bitboard {
        self.occ_all ^ self.occ_color[color as usize]
    }

    #[inline(always)]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[inline(always)]
    pub fn eliminated(&self) -> ColorSet {
        self.eliminated
    }

    #[inline(always)]
    pub fn is_active(&self, color: Color) -> bool {
        !self.eliminated.contains(color)
    }

    pub fn active_colors(&self) -> impl Iterator<Item = Color> + '_ {
        Color::ALL.into_iter().filter(move |&c| self.is_active(c))
    }

    /// Next non-eliminated color after `from` in turn order, or `None`
    /// when nobody else is left standing.
    pub fn next_active_after(&self, from: Color) -> Option<Color> {
        let mut c = from.next();
        for _ in 0..3 {
            if self.is_active(c) {
                return Some(c);
            }
            c = c.next();
        }
        None
    }

    #[inline(always)]
    pub fn castle_bits(&self) -> CastleBits {
        self.moved
    }

    #[inline(always)]
    pub fn ep_targets(&self) -> &[EpTarget] {
        &self.ep_targets
    }

    #[inline(always)]
    pub fn attack_map(&self, color: Color) -> Bitboard {
        self.attack_maps[color as usize]
    }

    /// Union of attack maps of every active color except `color`.
    pub fn enemy_attacks(&self, color: Color) -> Bitboard {
        let mut acc = Bitboard::EMPTY;
        for c in Color::ALL {
            if c != color {
                acc |= self.attack_maps[c as usize];
            }
        }
        acc
    }

    #[inline(always)]
    pub fn in_check(&self, color: Color) -> bool {
        self.check_status[color as usize]
    }

    #[inline(always)]
    pub fn pinned_mask(&self) -> Bitboard {
        self.pinned_mask
    }

    #[inline(always)]
    pub fn zobrist(&self) -> u64 {
        self.zobrist
    }

    #[inline(always)]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline(always)]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let val = self.piece_on_sq[sq.index() as usize];
        if val == EMPTY_SQ {
            None
        } else {
            Some((Color::from_u8(val >> 3), Piece::from_u8(val & 0b111)))
        }
    }

    /// King square of an active color. Eliminated colors have none.
    #[inline(always)]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color, Piece::King).lsb()
    }

    /// Add a piece, updating occupancy, the square table and the hash.
    #[inline(always)]
    pub(crate) fn place(&mut self, color: Color, piece: Piece, sq: Square) {
        debug_assert!(sq.is_playable());
        debug_assert_eq!(self.piece_on_sq[sq.index() as usize], EMPTY_SQ);
        let bb = Bitboard::single(sq);
        self.piece_bb[color as usize][piece as usize] |= bb;
        self.occ_color[color as usize] |= bb;
        self.occ_all |= bb;
        self.piece_on_sq[sq.index() as usize] = (color as u8) << 3 | piece as u8;
        self.zobrist ^= crate::hash::zobrist::keys().piece(color, piece, sq);
    }

    /// Remove a piece, updating occupancy, the square table and the hash.
    #[inline(always)]
    pub(crate) fn remove(&mut self, color: Color, piece: Piece, sq: Square) {
        debug_assert!(self.pieces(color, piece).contains(sq));
        let bb = Bitboard::single(sq);
        self.piece_bb[color as usize][piece as usize] ^= bb;
        self.occ_color[color as usize] ^= bb;
        self.occ_all ^= bb;
        self.piece_on_sq[sq.index() as usize] = EMPTY_SQ;
        self.zobrist ^= crate::hash::zobrist::keys().piece(color, piece, sq);
    }

    /// Recompute the attack maps, check flags and the pin mask of the
    /// side to move. Called at the end of every committed mutation.
    pub(crate) fn refresh_derived(&mut self) {
        use crate::moves::square_control;
        for c in Color::ALL {
            self.attack_maps[c as usize] = if self.is_active(c) {
                square_control::attack_map(self, c)
            } else {
                Bitboard::EMPTY
            };
        }
        for c in Color::ALL {
            self.check_status[c as usize] = match self.king_square(c) {
                Some(k) if self.is_active(c) => self.enemy_attacks(c).contains(k),
                _ => false,
            };
        }
        self.pinned_mask = square_control::pinned_mask(self, self.turn);
    }

    /// Full hash recomputation; the incremental hash must match this at
    /// all times.
    pub fn compute_zobrist_full(&self) -> u64 {
        let keys = crate::hash::zobrist::keys();
        let mut hash = 0u64;
        for color in Color::ALL {
            for piece in Piece::ALL {
                for sq in self.pieces(color, piece) {
                    hash ^= keys.piece(color, piece, sq);
                }
            }
        }
        hash ^= keys.turn(self.turn);
        for (i, flag) in self.moved.flags().into_iter().enumerate() {
            if flag {
                hash ^= keys.moved_flag(i);
            }
        }
        for c in self.eliminated.iter() {
            hash ^= keys.eliminated(c);
        }
        for ep in &self.ep_targets {
            hash ^= keys.ep(ep.square);
        }
        hash
    }

    #[inline]
    pub(crate) fn assert_hash(&self) {
        #[cfg(any(debug_assertions, feature = "paranoid_hash"))]
        {
            let full = self.compute_zobrist_full();
            debug_assert_eq!(
                self.zobrist, full,
                "zobrist parity mismatch: stored={:#018x}, full={:#018x}",
                self.zobrist, full
            );
        }
    }

    /// Check every structural invariant: disjoint piece boards inside the
    /// playable mask, aggregate agreement, derived-cache agreement, and
    /// en-passant windows owned by live colors.
    pub fn validate(&self) -> Result<(), String> {
        use crate::bitboard::PLAYABLE;
        use crate::moves::square_control;

        let mut seen = Bitboard::EMPTY;
        for color in Color::ALL {
            let mut color_acc = Bitboard::EMPTY;
            for piece in Piece::ALL {
                let bb = self.pieces(color, piece);
                if (bb & !PLAYABLE).any() {
                    return Err(format!("{} outside playable mask", piece_code(color, piece)));
                }
                if (seen & bb).any() {
                    return Err(format!("{} overlaps another board", piece_code(color, piece)));
                }
                seen |= bb;
                color_acc |= bb;
            }
            if color_acc != self.occ_color[color as usize] {
                return Err(format!("occupancy aggregate stale for {:?}", color));
            }
            if self.eliminated.contains(color) && color_acc.any() {
                return Err(format!("eliminated {:?} still has live pieces", color));
            }
        }
        if seen != self.occ_all {
            return Err("total occupancy disagrees with piece union".to_string());
        }
        for idx in 0..NUM_SQUARES as u8 {
            let sq = Square::from_index(idx);
            let table = self.piece_at(sq);
            let boards = Color::ALL.into_iter().find_map(|c| {
                Piece::ALL
                    .into_iter()
                    .find(|&p| self.pieces(c, p).contains(sq))
                    .map(|p| (c, p))
            });
            if table != boards {
                return Err(format!("square table stale at {}", sq));
            }
        }
        for c in Color::ALL {
            let expect = if self.is_active(c) {
                square_control::attack_map(self, c)
            } else {
                Bitboard::EMPTY
            };
            if expect != self.attack_maps[c as usize] {
                return Err(format!("attack map stale for {:?}", c));
            }
            let expect_check = match self.king_square(c) {
                Some(k) if self.is_active(c) => self.enemy_attacks(c).contains(k),
                _ => false,
            };
            if expect_check != self.check_status[c as usize] {
                return Err(format!("check status stale for {:?}", c));
            }
        }
        if self.pinned_mask != square_control::pinned_mask(self, self.turn) {
            return Err("pin mask stale".to_string());
        }
        if let Some(ep) = self.ep_targets.iter().find(|t| !self.is_active(t.creator)) {
            return Err(format!("en-passant window owned by eliminated {:?}", ep.creator));
        }
        if self.zobrist != self.compute_zobrist_full() {
            return Err("zobrist stale".to_string());
        }
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::initial()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..14u8 {
            for col in 0..14u8 {
                let sq = Square::from_coords(row, col);
                if !sq.is_playable() {
                    write!(f, "   ")?;
                    continue;
                }
                match self.piece_at(sq) {
                    Some((c, p)) => write!(f, "{}{} ", c.code(), p.code())?,
                    None => write!(f, " . ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "turn: {:?}  ply: {}  version: {}", self.turn, self.ply, self.version)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_position_is_valid() {
        let pos = Position::initial();
        pos.validate().unwrap();
        assert_eq!(pos.occupied().count(), 64);
        for color in Color::ALL {
            assert_eq!(pos.pieces(color, Piece::Pawn).count(), 8);
            assert_eq!(pos.pieces(color, Piece::King).count(), 1);
            assert_eq!(pos.occupancy(color).count(), 16);
            assert!(!pos.in_check(color));
        }
        assert_eq!(pos.turn(), Color::Red);
    }

    #[test]
    fn kings_sit_on_the_spec_squares() {
        let pos = Position::initial();
        assert_eq!(pos.king_square(Color::Red), Some(Square::from_coords(13, 7)));
        assert_eq!(pos.king_square(Color::Yellow), Some(Square::from_coords(0, 7)));
        assert_eq!(pos.king_square(Color::Blue), Some(Square::from_coords(7, 0)));
        assert_eq!(pos.king_square(Color::Green), Some(Square::from_coords(7, 13)));
    }

    #[test]
    fn rooks_sit_on_their_castle_homes() {
        let pos = Position::initial();
        for color in Color::ALL {
            for side in CastleSide::BOTH {
                let home = rook_home(color, side);
                assert!(pos.pieces(color, Piece::Rook).contains(home));
            }
        }
    }

    #[test]
    fn turn_order_skips_nobody_at_start() {
        let pos = Position::initial();
        assert_eq!(pos.next_active_after(Color::Red), Some(Color::Blue));
        assert_eq!(pos.next_active_after(Color::Green), Some(Color::Red));
    }

    #[test]
    fn piece_codes_round_trip() {
        for color in Color::ALL {
            for piece in Piece::ALL {
                let code = piece_code(color, piece);
                assert_eq!(parse_piece_code(&code), Some((color, piece)));
            }
        }
        assert_eq!(parse_piece_code("xx"), None);
    }
}
