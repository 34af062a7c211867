use crate::board::{Color, Piece};
use crate::square::{NUM_SQUARES, Square};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

fn make_zobrist_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

/// Random keys for every hashed position component: (color, piece,
/// square) triples, the color to move, the twelve castling has-moved
/// flags, the four eliminated flags, and en-passant target squares.
pub struct ZobristKeys {
    piece: Box<[[[u64; NUM_SQUARES]; 6]; 4]>,
    turn: [u64; 4],
    moved: [u64; 12],
    eliminated: [u64; 4],
    ep: Box<[u64; NUM_SQUARES]>,
}

impl ZobristKeys {
    #[inline(always)]
    pub fn piece(&self, color: Color, piece: Piece, sq: Square) -> u64 {
        self.piece[color as usize][piece as usize][sq.index() as usize]
    }

    #[inline(always)]
    pub fn turn(&self, color: Color) -> u64 {
        self.turn[color as usize]
    }

    #[inline(always)]
    pub fn moved_flag(&self, idx: usize) -> u64 {
        self.moved[idx]
    }

    #[inline(always)]
    pub fn eliminated(&self, color: Color) -> u64 {
        self.eliminated[color as usize]
    }

    #[inline(always)]
    pub fn ep(&self, sq: Square) -> u64 {
        self.ep[sq.index() as usize]
    }
}

/// Global keys, generated on first use.
pub fn keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_keys(make_zobrist_rng()))
}

fn generate_keys(mut rng: StdRng) -> ZobristKeys {
    #[inline]
    fn non_zero(r: &mut StdRng) -> u64 {
        // zero keys would hash like absent components
        let mut v = r.next_u64();
        while v == 0 {
            v = r.next_u64();
        }
        v
    }

    let mut piece = Box::new([[[0u64; NUM_SQUARES]; 6]; 4]);
    for color in piece.iter_mut() {
        for kind in color.iter_mut() {
            for key in kind.iter_mut() {
                *key = non_zero(&mut rng);
            }
        }
    }

    let mut ep = Box::new([0u64; NUM_SQUARES]);
    for key in ep.iter_mut() {
        *key = non_zero(&mut rng);
    }

    let mut turn = [0u64; 4];
    for key in turn.iter_mut() {
        *key = non_zero(&mut rng);
    }
    let mut moved = [0u64; 12];
    for key in moved.iter_mut() {
        *key = non_zero(&mut rng);
    }
    let mut eliminated = [0u64; 4];
    for key in eliminated.iter_mut() {
        *key = non_zero(&mut rng);
    }

    ZobristKeys {
        piece,
        turn,
        moved,
        eliminated,
        ep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_within_a_process() {
        let a = keys().piece(Color::Red, Piece::Pawn, Square::from_index(42));
        let b = keys().piece(Color::Red, Piece::Pawn, Square::from_index(42));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_components_get_distinct_keys() {
        let k = keys();
        assert_ne!(k.turn(Color::Red), k.turn(Color::Blue));
        assert_ne!(
            k.piece(Color::Red, Piece::Pawn, Square::from_index(0)),
            k.piece(Color::Blue, Piece::Pawn, Square::from_index(0)),
        );
        assert_ne!(k.eliminated(Color::Yellow), k.eliminated(Color::Green));
    }
}
