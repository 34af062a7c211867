use crate::bitboard::Bitboard;
use crate::board::{Color, Piece};
use crate::moves::tables::{Dir, tables};
use crate::square::Square;

/// Attack set along one ray under `occ`: the full ray when nothing
/// blocks, otherwise the ray truncated just past the nearest blocker
/// (the blocker square itself stays in the set).
#[inline]
pub fn sliding_attack(sq: Square, dir: Dir, occ: Bitboard) -> Bitboard {
    let t = tables();
    let ray = t.rays[sq.index() as usize][dir as usize];
    let blockers = ray & occ;
    if blockers.is_empty() {
        return ray;
    }
    let nearest = if dir.increasing() {
        blockers.lsb().unwrap()
    } else {
        blockers.msb().unwrap()
    };
    ray & !t.rays[nearest.index() as usize][dir as usize]
}

#[inline]
pub fn rook_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    let mut acc = Bitboard::EMPTY;
    for dir in Dir::ORTHOGONAL {
        acc |= sliding_attack(sq, dir, occ);
    }
    acc
}

#[inline]
pub fn bishop_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    let mut acc = Bitboard::EMPTY;
    for dir in Dir::DIAGONAL {
        acc |= sliding_attack(sq, dir, occ);
    }
    acc
}

#[inline]
pub fn queen_attacks(sq: Square, occ: Bitboard) -> Bitboard {
    rook_attacks(sq, occ) | bishop_attacks(sq, occ)
}

/// Squares a piece of the given kind and color attacks from `sq` with
/// `occ` as blockers.
pub fn attacks_from(piece: Piece, color: Color, sq: Square, occ: Bitboard) -> Bitboard {
    let t = tables();
    match piece {
        Piece::Pawn => t.pawn_attacks[color as usize][sq.index() as usize],
        Piece::Knight => t.knight[sq.index() as usize],
        Piece::King => t.king[sq.index() as usize],
        Piece::Bishop => bishop_attacks(sq, occ),
        Piece::Rook => rook_attacks(sq, occ),
        Piece::Queen => queen_attacks(sq, occ),
    }
}
