use std::fmt;
use std::str::FromStr;

/// Board side length. The board is a 14x14 grid with the four 3x3 corner
/// blocks removed, leaving 160 playable squares.
pub const BOARD_DIM: u8 = 14;

/// Number of linear square indices (including the corner holes).
pub const NUM_SQUARES: usize = (BOARD_DIM as usize) * (BOARD_DIM as usize);

/// A square on the 14x14 cross board, stored as `row * 14 + col`.
/// Row 0 is the top edge (Yellow's back rank), column 0 the left edge
/// (Blue's back rank).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    #[inline(always)]
    pub const fn from_index(idx: u8) -> Self {
        debug_assert!((idx as usize) < NUM_SQUARES);
        Square(idx)
    }

    #[inline(always)]
    pub const fn from_coords(row: u8, col: u8) -> Self {
        debug_assert!(row < BOARD_DIM && col < BOARD_DIM);
        Square(row * BOARD_DIM + col)
    }

    #[inline(always)]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn row(self) -> u8 {
        self.0 / BOARD_DIM
    }

    #[inline(always)]
    pub const fn col(self) -> u8 {
        self.0 % BOARD_DIM
    }

    /// True iff the square lies outside the four 3x3 corner holes.
    #[inline(always)]
    pub const fn is_playable(self) -> bool {
        let r = self.row();
        let c = self.col();
        let edge_r = r < 3 || r > 10;
        let edge_c = c < 3 || c > 10;
        !(edge_r && edge_c)
    }

    /// Step by `(drow, dcol)`, returning `None` when the step leaves the
    /// 14x14 grid. Playability is the caller's concern.
    #[inline(always)]
    pub fn offset(self, drow: i8, dcol: i8) -> Option<Square> {
        let r = self.row() as i16 + drow as i16;
        let c = self.col() as i16 + dcol as i16;
        if (0..BOARD_DIM as i16).contains(&r) && (0..BOARD_DIM as i16).contains(&c) {
            Some(Square::from_coords(r as u8, c as u8))
        } else {
            None
        }
    }

    /// Manhattan distance to the board center, doubled to stay integral
    /// (the center of a 14-wide board falls between squares).
    #[inline(always)]
    pub const fn center_distance2(self) -> i32 {
        let r = self.row() as i32;
        let c = self.col() as i32;
        (2 * r - 13).abs() + (2 * c - 13).abs()
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Files are a..n left to right, ranks 1..14 bottom to top, so Red's back
/// rank (row 13) is rank 1.
impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.col()) as char;
        let rank = BOARD_DIM - self.row();
        write!(f, "{}{}", file, rank)
    }
}

impl FromStr for Square {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let file = chars.next().ok_or_else(|| format!("empty square: {s:?}"))?;
        if !('a'..='n').contains(&file) {
            return Err(format!("bad file in {s:?}"));
        }
        let rank: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| format!("bad rank in {s:?}"))?;
        if !(1..=BOARD_DIM).contains(&rank) {
            return Err(format!("rank out of range in {s:?}"));
        }
        let col = file as u8 - b'a';
        let row = BOARD_DIM - rank;
        Ok(Square::from_coords(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip() {
        for idx in 0..NUM_SQUARES as u8 {
            let sq = Square::from_index(idx);
            assert_eq!(sq, Square::from_coords(sq.row(), sq.col()));
            assert_eq!(sq.index(), idx);
        }
    }

    #[test]
    fn corner_holes_are_unplayable() {
        assert!(!Square::from_coords(0, 0).is_playable());
        assert!(!Square::from_coords(2, 12).is_playable());
        assert!(!Square::from_coords(11, 1).is_playable());
        assert!(!Square::from_coords(13, 13).is_playable());
        assert!(Square::from_coords(0, 3).is_playable());
        assert!(Square::from_coords(7, 0).is_playable());
        assert!(Square::from_coords(13, 7).is_playable());
    }

    #[test]
    fn playable_count_is_160() {
        let n = (0..NUM_SQUARES as u8)
            .filter(|&i| Square::from_index(i).is_playable())
            .count();
        assert_eq!(n, 160);
    }

    #[test]
    fn display_parse_round_trip() {
        for idx in 0..NUM_SQUARES as u8 {
            let sq = Square::from_index(idx);
            let parsed: Square = sq.to_string().parse().unwrap();
            assert_eq!(parsed, sq);
        }
        // Red king home square is h1.
        assert_eq!(Square::from_coords(13, 7).to_string(), "h1");
    }
}
