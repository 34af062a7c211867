use crate::bitboard::Bitboard;
use crate::board::{Color, ColorSet, Piece, Position};
use crate::moves::square_control::attackers_to;
use crate::moves::types::Move;
use crate::square::Square;

/// King value for exchange purposes only: capturing with the king is
/// fine until something could recapture.
#[inline(always)]
fn see_value(piece: Piece) -> i32 {
    match piece {
        Piece::King => 20_000,
        other => other.value(),
    }
}

/// Static exchange evaluation on the destination square of `mv`, as a
/// signed material delta for the mover's side. `allies` is the mover's
/// coalition (itself, plus teammates in team mode); everyone else
/// recaptures as one bloc, least valuable attacker first, and either
/// side may stand pat.
pub fn see(pos: &Position, mv: &Move, allies: ColorSet) -> i32 {
    let to = mv.to;

    // First victim. Quiet moves trade nothing.
    let first_victim = if mv.is_en_passant() {
        Some(Piece::Pawn)
    } else {
        pos.piece_at(to).map(|(_, p)| p)
    };
    let Some(first_victim) = first_victim else {
        return 0;
    };

    let mut gain = [0i32; 36];
    let mut d = 0usize;
    gain[0] = see_value(first_victim);

    // Promotion on the capture square upgrades both the haul and the
    // piece standing there for the rest of the exchange.
    let mut next_victim = match mv.promotion {
        Some(promo) => {
            gain[0] += see_value(promo) - see_value(Piece::Pawn);
            promo
        }
        None => mv.piece,
    };

    let mut occ = pos.occupied() ^ Bitboard::single(mv.from);
    if mv.is_en_passant() {
        // The en-passant victim stands off the target square.
        if let Some((victim_color, _)) = ep_victim(pos, mv) {
            let (fr, fc) = victim_color.forward();
            if let Some(vsq) = to.offset(fr, fc) {
                occ ^= Bitboard::single(vsq);
            }
        }
    }

    let mut side_is_ally = false; // enemies recapture first
    loop {
        let attackers = attackers_to(pos, to, occ);
        let Some(att_sq) = least_valuable(pos, attackers, allies, side_is_ally) else {
            break;
        };
        let att_piece = pos.piece_at(att_sq).map(|(_, p)| p).unwrap_or(Piece::Pawn);

        d += 1;
        if d >= gain.len() {
            break;
        }
        gain[d] = see_value(next_victim) - gain[d - 1];
        next_victim = att_piece;
        occ ^= Bitboard::single(att_sq);
        side_is_ally = !side_is_ally;
    }

    // Back-propagate with the stand-pat option at every step.
    while d > 0 {
        gain[d - 1] = -std::cmp::max(-gain[d - 1], gain[d]);
        d -= 1;
    }
    gain[0]
}

/// Convenience form for pruning decisions.
#[inline(always)]
pub fn see_ge(pos: &Position, mv: &Move, allies: ColorSet, threshold: i32) -> bool {
    see(pos, mv, allies) >= threshold
}

fn ep_victim(pos: &Position, mv: &Move) -> Option<(Color, Piece)> {
    pos.ep_targets()
        .iter()
        .find(|t| t.square == mv.to)
        .map(|t| (t.creator, Piece::Pawn))
}

/// Least valuable attacker currently on the board for the given side of
/// the exchange.
fn least_valuable(
    pos: &Position,
    attackers: Bitboard,
    allies: ColorSet,
    side_is_ally: bool,
) -> Option<Square> {
    let mut best: Option<(i32, Square)> = None;
    for sq in attackers {
        let Some((color, piece)) = pos.piece_at(sq) else {
            continue;
        };
        if allies.contains(color) != side_is_ally {
            continue;
        }
        let rank = piece.attacker_value();
        if best.is_none_or(|(b, _)| rank < b) {
            best = Some((rank, sq));
        }
    }
    best.map(|(_, sq)| sq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::types::{CAPTURE, QUIET_MOVE};

    fn sq(r: u8, c: u8) -> Square {
        Square::from_coords(r, c)
    }

    fn kings(p: &mut Position) {
        p.place(Color::Red, Piece::King, sq(13, 7));
        p.place(Color::Blue, Piece::King, sq(7, 0));
        p.place(Color::Yellow, Piece::King, sq(0, 7));
        p.place(Color::Green, Piece::King, sq(7, 13));
    }

    fn capture(from: Square, to: Square, piece: Piece) -> Move {
        Move {
            from,
            to,
            piece,
            promotion: None,
            flags: CAPTURE,
        }
    }

    fn red_allies() -> ColorSet {
        let mut s = ColorSet::EMPTY;
        s.insert(Color::Red);
        s
    }

    #[test]
    fn free_capture_wins_the_victim() {
        let mut p = Position::empty();
        kings(&mut p);
        p.place(Color::Red, Piece::Rook, sq(9, 4));
        p.place(Color::Yellow, Piece::Pawn, sq(5, 4));
        p.zobrist = p.compute_zobrist_full();
        p.refresh_derived();
        let mv = capture(sq(9, 4), sq(5, 4), Piece::Rook);
        assert_eq!(see(&p, &mv, red_allies()), Piece::Pawn.value());
    }

    #[test]
    fn defended_victim_costs_the_attacker() {
        let mut p = Position::empty();
        kings(&mut p);
        p.place(Color::Red, Piece::Rook, sq(9, 4));
        p.place(Color::Yellow, Piece::Pawn, sq(5, 4));
        p.place(Color::Yellow, Piece::Rook, sq(2, 4));
        p.zobrist = p.compute_zobrist_full();
        p.refresh_derived();
        let mv = capture(sq(9, 4), sq(5, 4), Piece::Rook);
        // RxP, RxR: pawn gained, rook lost.
        assert_eq!(
            see(&p, &mv, red_allies()),
            Piece::Pawn.value() - Piece::Rook.value()
        );
    }

    #[test]
    fn exchange_chain_runs_to_completion() {
        let mut p = Position::empty();
        kings(&mut p);
        p.place(Color::Red, Piece::Pawn, sq(8, 4));
        p.place(Color::Red, Piece::Queen, sq(9, 5));
        p.place(Color::Blue, Piece::Knight, sq(7, 5));
        p.place(Color::Blue, Piece::Pawn, sq(6, 4));
        p.zobrist = p.compute_zobrist_full();
        p.refresh_derived();
        let mv = capture(sq(8, 4), sq(7, 5), Piece::Pawn);
        // PxN (+300), pxP (-100), QxP (+100): the last recapture is
        // free, so the whole chain is played out.
        assert_eq!(see(&p, &mv, red_allies()), 300);
    }

    #[test]
    fn defenders_from_different_colors_pool_together() {
        let mut p = Position::empty();
        kings(&mut p);
        p.place(Color::Red, Piece::Queen, sq(9, 4));
        p.place(Color::Yellow, Piece::Pawn, sq(5, 4));
        p.place(Color::Blue, Piece::Knight, sq(3, 3));
        p.zobrist = p.compute_zobrist_full();
        p.refresh_derived();
        // Blue's knight covers (5,4); QxP then NxQ is a disaster.
        let mv = capture(sq(9, 4), sq(5, 4), Piece::Queen);
        assert_eq!(
            see(&p, &mv, red_allies()),
            Piece::Pawn.value() - Piece::Queen.value()
        );
    }

    #[test]
    fn quiet_move_sees_zero() {
        let p = Position::initial();
        let mv = Move {
            from: sq(12, 7),
            to: sq(11, 7),
            piece: Piece::Pawn,
            promotion: None,
            flags: QUIET_MOVE,
        };
        assert_eq!(see(&p, &mv, red_allies()), 0);
    }
}
