use crate::bitboard::{Bitboard, PLAYABLE};
use crate::board::{Color, Piece, Position};
use crate::moves::attacks::{attacks_from, bishop_attacks, rook_attacks};
use crate::moves::tables::{Dir, tables};
use crate::square::Square;

/// Recompute the full attack map of one color under current occupancy.
pub fn attack_map(pos: &Position, color: Color) -> Bitboard {
    let occ = pos.occupied();
    let mut acc = Bitboard::EMPTY;
    for piece in Piece::ALL {
        for sq in pos.pieces(color, piece) {
            acc |= attacks_from(piece, color, sq, occ);
        }
    }
    acc
}

/// Does `attacker` attack `sq` under occupancy `occ`? Reverse lookups
/// throughout: a pawn of color c attacks `sq` iff a c-pawn sits on a
/// square that `sq` "attacks" with c's directions reversed, which is
/// exactly the paired opposite color's attack table.
pub fn is_square_attacked_with_occ(
    pos: &Position,
    sq: Square,
    attacker: Color,
    occ: Bitboard,
) -> bool {
    let t = tables();
    let idx = sq.index() as usize;

    let reverse = reverse_pawn_color(attacker);
    if (t.pawn_attacks[reverse as usize][idx] & pos.pieces(attacker, Piece::Pawn)).any() {
        return true;
    }
    if (t.knight[idx] & pos.pieces(attacker, Piece::Knight)).any() {
        return true;
    }
    if (t.king[idx] & pos.pieces(attacker, Piece::King)).any() {
        return true;
    }

    let rook_like = rook_attacks(sq, occ);
    if (rook_like & (pos.pieces(attacker, Piece::Rook) | pos.pieces(attacker, Piece::Queen))).any()
    {
        return true;
    }
    let bishop_like = bishop_attacks(sq, occ);
    if (bishop_like & (pos.pieces(attacker, Piece::Bishop) | pos.pieces(attacker, Piece::Queen)))
        .any()
    {
        return true;
    }
    false
}

#[inline(always)]
pub fn is_square_attacked(pos: &Position, sq: Square, attacker: Color) -> bool {
    is_square_attacked_with_occ(pos, sq, attacker, pos.occupied())
}

/// Advance directions are paired Red/Yellow and Blue/Green, so the
/// reverse pawn-attack table of a color is its partner's forward table.
#[inline(always)]
fn reverse_pawn_color(color: Color) -> Color {
    match color {
        Color::Red => Color::Yellow,
        Color::Yellow => Color::Red,
        Color::Blue => Color::Green,
        Color::Green => Color::Blue,
    }
}

/// Is `color` attacked by any other active color at `sq`?
pub fn attacked_by_enemies(pos: &Position, sq: Square, color: Color) -> bool {
    Color::ALL
        .into_iter()
        .filter(|&c| c != color && pos.is_active(c))
        .any(|c| is_square_attacked(pos, sq, c))
}

/// Recompute whether a color's king stands attacked. The cached
/// `Position::in_check` serves readers; this one serves the mutation
/// path before caches are refreshed.
pub fn in_check_now(pos: &Position, color: Color) -> bool {
    match pos.king_square(color) {
        Some(k) => attacked_by_enemies(pos, k, color),
        None => false,
    }
}

/// Squares the king of `color` may not step onto: every enemy attack
/// recomputed with this king removed from occupancy, so a slider held
/// off only by the king still denies the squares behind it.
pub fn danger_squares(pos: &Position, color: Color) -> Bitboard {
    let Some(king) = pos.king_square(color) else {
        return Bitboard::EMPTY;
    };
    let occ = pos.occupied() ^ Bitboard::single(king);
    let mut acc = Bitboard::EMPTY;
    for enemy in Color::ALL {
        if enemy == color || !pos.is_active(enemy) {
            continue;
        }
        for piece in Piece::ALL {
            for sq in pos.pieces(enemy, piece) {
                acc |= attacks_from(piece, enemy, sq, occ);
            }
        }
    }
    acc
}

/// Constraint on non-king replies while in check: the full playable mask
/// when no one checks, the block-or-capture set for a single checker,
/// and the empty set (king moves only) for two or more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckConstraint {
    pub checkers: u32,
    pub mask: Bitboard,
}

pub fn check_constraint(pos: &Position, color: Color) -> CheckConstraint {
    let Some(king) = pos.king_square(color) else {
        return CheckConstraint {
            checkers: 0,
            mask: PLAYABLE,
        };
    };
    let t = tables();
    let occ = pos.occupied();
    let kidx = king.index() as usize;

    let mut checkers_bb = Bitboard::EMPTY;
    let mut slider_rays = Bitboard::EMPTY;

    for enemy in Color::ALL {
        if enemy == color || !pos.is_active(enemy) {
            continue;
        }
        let reverse = reverse_pawn_color(enemy);
        checkers_bb |= t.pawn_attacks[reverse as usize][kidx] & pos.pieces(enemy, Piece::Pawn);
        checkers_bb |= t.knight[kidx] & pos.pieces(enemy, Piece::Knight);

        let rook_like = rook_attacks(king, occ)
            & (pos.pieces(enemy, Piece::Rook) | pos.pieces(enemy, Piece::Queen));
        let bishop_like = bishop_attacks(king, occ)
            & (pos.pieces(enemy, Piece::Bishop) | pos.pieces(enemy, Piece::Queen));
        for checker in rook_like | bishop_like {
            checkers_bb.set(checker);
            slider_rays |= crate::moves::tables::between(king, checker);
        }
    }

    let count = checkers_bb.count();
    let mask = match count {
        0 => PLAYABLE,
        1 => checkers_bb | slider_rays,
        _ => Bitboard::EMPTY,
    };
    CheckConstraint {
        checkers: count,
        mask,
    }
}

/// Absolutely pinned pieces of `color`: for each ray from the king, if
/// the first blocker is friendly and the second is an enemy slider that
/// moves along that ray, the first is pinned.
pub fn pinned_mask(pos: &Position, color: Color) -> Bitboard {
    let Some(king) = pos.king_square(color) else {
        return Bitboard::EMPTY;
    };
    let t = tables();
    let occ = pos.occupied();
    let own = pos.occupancy(color);
    let mut pinned = Bitboard::EMPTY;

    for dir in Dir::ALL {
        let ray = t.rays[king.index() as usize][dir as usize];
        let blockers = ray & occ;
        let Some(first) = nearest(blockers, dir) else {
            continue;
        };
        if !own.contains(first) {
            continue;
        }
        let beyond = ray & t.rays[first.index() as usize][dir as usize];
        let Some(second) = nearest(beyond & occ, dir) else {
            continue;
        };
        let Some((enemy, piece)) = pos.piece_at(second) else {
            continue;
        };
        if enemy == color {
            continue;
        }
        let pins = if dir.is_diagonal() {
            matches!(piece, Piece::Bishop | Piece::Queen)
        } else {
            matches!(piece, Piece::Rook | Piece::Queen)
        };
        if pins {
            pinned.set(first);
        }
    }
    pinned
}

/// The ray a pinned piece is confined to: every square of the king's ray
/// through the piece (pinner included).
pub fn pin_line(king: Square, pinned_sq: Square) -> Bitboard {
    match crate::moves::tables::dir_between(king, pinned_sq) {
        Some(dir) => tables().rays[king.index() as usize][dir as usize],
        None => Bitboard::EMPTY,
    }
}

#[inline(always)]
fn nearest(blockers: Bitboard, dir: Dir) -> Option<Square> {
    if dir.increasing() {
        blockers.lsb()
    } else {
        blockers.msb()
    }
}

/// Every piece of every color attacking `sq` under `occ`, for exchange
/// evaluation.
pub fn attackers_to(pos: &Position, sq: Square, occ: Bitboard) -> Bitboard {
    let t = tables();
    let idx = sq.index() as usize;
    let mut acc = Bitboard::EMPTY;

    for color in Color::ALL {
        let reverse = reverse_pawn_color(color);
        acc |= t.pawn_attacks[reverse as usize][idx] & pos.pieces(color, Piece::Pawn);
        acc |= t.knight[idx] & pos.pieces(color, Piece::Knight);
        acc |= t.king[idx] & pos.pieces(color, Piece::King);
    }

    let mut rook_like = Bitboard::EMPTY;
    let mut bishop_like = Bitboard::EMPTY;
    for color in Color::ALL {
        rook_like |= pos.pieces(color, Piece::Rook) | pos.pieces(color, Piece::Queen);
        bishop_like |= pos.pieces(color, Piece::Bishop) | pos.pieces(color, Piece::Queen);
    }
    acc |= rook_attacks(sq, occ) & rook_like;
    acc |= bishop_attacks(sq, occ) & bishop_like;

    acc & occ
}
