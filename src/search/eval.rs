use crate::bitboard::Bitboard;
use crate::board::{Color, ColorSet, Piece, Position};
use crate::square::Square;

/// Keeps the bot attached to its king even though kings carry no
/// material value.
const LIVE_KING_BONUS: i32 = 400;

const IN_CHECK_PENALTY: i32 = 150;
const SHIELD_BONUS: i32 = 15;
const RING_ATTACK_PENALTY: i32 = 20;
const MOBILITY_WEIGHT: i32 = 2;

// Hanging pieces bleed a slice of their value; more when nobody covers
// the square.
const HANGING_DEFENDED_DIV: i32 = 10;
const HANGING_UNDEFENDED_DIV: i32 = 3;

/// Game phase from the live piece count (a fresh four-player game has
/// 64 pieces on the board).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

pub fn phase(pos: &Position) -> Phase {
    let total = pos.occupied().count();
    if total >= 48 {
        Phase::Opening
    } else if total >= 24 {
        Phase::Middlegame
    } else {
        Phase::Endgame
    }
}

/// Centrality on a 0..=100 scale from the doubled Manhattan distance to
/// the board center (2 at the four center squares, 26 in the corners).
#[inline(always)]
fn centrality(sq: Square) -> i32 {
    (26 - sq.center_distance2()) * 100 / 24
}

/// How far a pawn has advanced from its home line, in forward steps.
#[inline(always)]
fn pawn_advancement(color: Color, sq: Square) -> i32 {
    match color {
        Color::Red => 12 - sq.row() as i32,
        Color::Yellow => sq.row() as i32 - 1,
        Color::Blue => sq.col() as i32 - 1,
        Color::Green => 12 - sq.col() as i32,
    }
}

fn piece_square_bonus(piece: Piece, color: Color, sq: Square, phase: Phase) -> i32 {
    match piece {
        Piece::Knight => centrality(sq) / 4,
        Piece::Bishop => centrality(sq) / 5,
        Piece::Pawn => pawn_advancement(color, sq) * 4,
        Piece::Rook => 0,
        Piece::Queen => match phase {
            Phase::Opening => centrality(sq) / 10,
            Phase::Middlegame => centrality(sq) / 6,
            Phase::Endgame => centrality(sq) / 4,
        },
        Piece::King => match phase {
            // Tucked away early, active late.
            Phase::Opening | Phase::Middlegame => (100 - centrality(sq)) / 5,
            Phase::Endgame => centrality(sq) / 5,
        },
    }
}

/// Square ring of the given radius around a square, clipped to the
/// playable board.
fn ring(center: Square, radius: i8) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if dr == 0 && dc == 0 {
                continue;
            }
            if let Some(sq) = center.offset(dr, dc)
                && sq.is_playable()
            {
                bb.set(sq);
            }
        }
    }
    bb
}

fn king_safety(pos: &Position, color: Color, phase: Phase) -> i32 {
    let mut score = 0;
    if pos.in_check(color) {
        score -= IN_CHECK_PENALTY;
    }
    if phase == Phase::Endgame {
        return score;
    }
    let Some(king) = pos.king_square(color) else {
        return score;
    };
    let shield = ring(king, 2) & pos.pieces(color, Piece::Pawn);
    score += shield.count() as i32 * SHIELD_BONUS;
    let threatened = ring(king, 1) & pos.enemy_attacks(color);
    score -= threatened.count() as i32 * RING_ATTACK_PENALTY;
    score
}

fn hanging_penalty(pos: &Position, color: Color) -> i32 {
    let enemy_attacks = pos.enemy_attacks(color);
    let own_attacks = pos.attack_map(color);
    let mut penalty = 0;
    for piece in [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        for sq in pos.pieces(color, piece) {
            if !enemy_attacks.contains(sq) {
                continue;
            }
            penalty += if own_attacks.contains(sq) {
                piece.value() / HANGING_DEFENDED_DIV
            } else {
                piece.value() / HANGING_UNDEFENDED_DIV
            };
        }
    }
    -penalty
}

/// One color's standing: material, placement, king safety, loose pieces
/// and mobility. Symmetric across colors; the caller signs and sums.
pub fn color_score(pos: &Position, color: Color, phase: Phase) -> i32 {
    let mut score = LIVE_KING_BONUS;
    for piece in Piece::ALL {
        for sq in pos.pieces(color, piece) {
            score += piece.value();
            score += piece_square_bonus(piece, color, sq, phase);
        }
    }
    score += king_safety(pos, color, phase);
    score += hanging_penalty(pos, color);
    score += pos.attack_map(color).count() as i32 * MOBILITY_WEIGHT;
    score
}

/// Full evaluation from one side's point of view: the allied colors'
/// scores minus everyone else's. Eliminated colors contribute nothing.
pub fn evaluate(pos: &Position, allies: ColorSet) -> i32 {
    let phase = phase(pos);
    let mut total = 0;
    for color in Color::ALL {
        if !pos.is_active(color) {
            continue;
        }
        let s = color_score(pos, color, phase);
        if allies.contains(color) {
            total += s;
        } else {
            total -= s;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(r: u8, c: u8) -> Square {
        Square::from_coords(r, c)
    }

    fn allies(c: Color) -> ColorSet {
        let mut s = ColorSet::EMPTY;
        s.insert(c);
        s
    }

    #[test]
    fn initial_position_is_balanced_against_full_coalition() {
        let pos = Position::initial();
        // One against three: down two armies' worth of material.
        let v = evaluate(&pos, allies(Color::Red));
        let one_army: i32 = (0..8).map(|_| Piece::Pawn.value()).sum::<i32>()
            + 2 * Piece::Knight.value()
            + 2 * Piece::Bishop.value()
            + 2 * Piece::Rook.value()
            + Piece::Queen.value();
        assert!(v < -one_army, "got {v}");
    }

    #[test]
    fn team_evaluation_is_zero_sum_at_start() {
        let pos = Position::initial();
        let mut team_a = ColorSet::EMPTY;
        team_a.insert(Color::Red);
        team_a.insert(Color::Yellow);
        let mut team_b = ColorSet::EMPTY;
        team_b.insert(Color::Blue);
        team_b.insert(Color::Green);
        assert_eq!(evaluate(&pos, team_a), -evaluate(&pos, team_b));
    }

    #[test]
    fn eliminating_an_enemy_raises_the_score() {
        let mut pos = Position::initial();
        let before = evaluate(&pos, allies(Color::Red));
        crate::moves::execute::eliminate(&mut pos, Color::Blue);
        let after = evaluate(&pos, allies(Color::Red));
        assert!(after > before);
    }

    #[test]
    fn material_loss_shows_up() {
        let mut pos = Position::initial();
        let before = evaluate(&pos, allies(Color::Red));
        pos.remove(Color::Red, Piece::Queen, sq(13, 6));
        pos.refresh_derived();
        let after = evaluate(&pos, allies(Color::Red));
        assert!(after < before - Piece::Queen.value() / 2);
    }

    #[test]
    fn centrality_peaks_in_the_middle() {
        assert_eq!(centrality(sq(7, 7)), 100);
        assert!(centrality(sq(0, 3)) < 30);
        assert!(centrality(sq(6, 6)) == 100);
    }

    #[test]
    fn pawn_advancement_tracks_direction() {
        assert_eq!(pawn_advancement(Color::Red, sq(12, 5)), 0);
        assert_eq!(pawn_advancement(Color::Red, sq(6, 5)), 6);
        assert_eq!(pawn_advancement(Color::Blue, sq(5, 1)), 0);
        assert_eq!(pawn_advancement(Color::Blue, sq(5, 9)), 8);
    }

    #[test]
    fn phase_thresholds() {
        let pos = Position::initial();
        assert_eq!(phase(&pos), Phase::Opening);
        let mut small = Position::empty();
        small.place(Color::Red, Piece::King, sq(13, 7));
        small.place(Color::Blue, Piece::King, sq(7, 0));
        small.place(Color::Yellow, Piece::King, sq(0, 7));
        small.place(Color::Green, Piece::King, sq(7, 13));
        small.zobrist = small.compute_zobrist_full();
        small.refresh_derived();
        assert_eq!(phase(&small), Phase::Endgame);
    }

    #[test]
    fn pawn_shield_beats_a_bare_king() {
        let mut bare = Position::empty();
        bare.place(Color::Red, Piece::King, sq(13, 7));
        bare.place(Color::Blue, Piece::King, sq(7, 0));
        bare.place(Color::Yellow, Piece::King, sq(0, 7));
        bare.place(Color::Green, Piece::King, sq(7, 13));
        // Enough filler to stay out of the endgame phase.
        for c in 3..=10 {
            bare.place(Color::Yellow, Piece::Pawn, sq(1, c));
            bare.place(Color::Blue, Piece::Pawn, sq(c, 1));
            bare.place(Color::Green, Piece::Pawn, sq(c, 12));
        }
        let mut shielded = bare.clone();
        for c in 6..=8 {
            shielded.place(Color::Red, Piece::Pawn, sq(12, c));
        }
        bare.zobrist = bare.compute_zobrist_full();
        bare.refresh_derived();
        shielded.zobrist = shielded.compute_zobrist_full();
        shielded.refresh_derived();
        let phase_b = phase(&shielded);
        assert_ne!(phase_b, Phase::Endgame);
        assert!(
            color_score(&shielded, Color::Red, phase_b)
                > color_score(&bare, Color::Red, phase(&bare))
        );
    }
}
