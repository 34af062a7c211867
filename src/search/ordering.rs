use crate::board::{ColorSet, Piece, Position};
use crate::moves::square_control::attackers_to;
use crate::moves::tables::tables;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::see::see;

// Ordering tiers, descending. Good captures outrank the remembered
// moves; bad captures trail everything.
const GOOD_CAPTURE_BASE: i32 = 1_000_000;
const CHECK_DEFENSE_BASE: i32 = 700_000;
const KING_FLEE_BONUS: i32 = 50_000;
const TT_MOVE_SCORE: i32 = 600_000;
const PREV_BEST_SCORE: i32 = 595_000;
const KILLER1_SCORE: i32 = 590_000;
const KILLER2_SCORE: i32 = 580_000;
const BAD_CAPTURE_BASE: i32 = -1_000_000;

const DEVELOPMENT_BONUS: i32 = 500;
const EARLY_KING_PENALTY: i32 = 400;
const LOOSE_LANDING_PENALTY: i32 = 800;

/// Everything the scorer wants to know besides the move itself.
pub struct OrderingInputs<'a> {
    pub ctx: &'a SearchContext,
    pub allies: ColorSet,
    pub tt_move: Option<Move>,
    pub prev_best: Option<Move>,
    pub killers: [Option<Move>; 2],
    pub in_check: bool,
}

/// Victim-first capture score for quiescence ordering.
pub fn mvv_lva(pos: &Position, mv: &Move) -> i32 {
    if !mv.is_capture() {
        return 0;
    }
    let victim = if mv.is_en_passant() {
        Piece::Pawn.value()
    } else {
        pos.piece_at(mv.to).map(|(_, p)| p.value()).unwrap_or(0)
    };
    victim * 10 - mv.piece.attacker_value()
}

/// Sort moves best-first for the alpha-beta loop.
pub fn order_moves(pos: &Position, moves: &mut [Move], inputs: &OrderingInputs) {
    moves.sort_by_cached_key(|mv| {
        let mut score;

        if mv.is_capture() {
            let exchange = see(pos, mv, inputs.allies);
            score = if exchange >= 0 {
                GOOD_CAPTURE_BASE + exchange + mvv_lva(pos, mv)
            } else {
                BAD_CAPTURE_BASE + exchange
            };
        } else if inputs.in_check {
            // Every generated move already resolves the check; prefer
            // king steps onto quiet squares, then remembered moves.
            score = CHECK_DEFENSE_BASE;
            if mv.piece == Piece::King {
                score += KING_FLEE_BONUS;
            }
        } else {
            score = quiet_score(pos, mv, inputs);
        }

        if inputs.tt_move.is_some_and(|tm| tm.same_action(mv)) {
            score = score.max(TT_MOVE_SCORE);
        } else if inputs.prev_best.is_some_and(|pb| pb.same_action(mv)) {
            score = score.max(PREV_BEST_SCORE);
        } else if inputs.killers[0].is_some_and(|k| k.same_action(mv)) {
            score = score.max(KILLER1_SCORE);
        } else if inputs.killers[1].is_some_and(|k| k.same_action(mv)) {
            score = score.max(KILLER2_SCORE);
        }

        std::cmp::Reverse(score)
    });
}

/// Quiet moves ride the history table, shaped by board sense: pull
/// toward the center, develop minors, keep the king home early, avoid
/// dropping a piece on a loose square.
fn quiet_score(pos: &Position, mv: &Move, inputs: &OrderingInputs) -> i32 {
    let mover = pos.turn();
    let mut score = inputs.ctx.history_score(mover, mv.piece, mv.to);

    score -= mv.to.center_distance2();

    let home = tables().home_zone[mover as usize];
    if matches!(mv.piece, Piece::Knight | Piece::Bishop)
        && home.contains(mv.from)
        && !home.contains(mv.to)
    {
        score += DEVELOPMENT_BONUS;
    }

    if mv.piece == Piece::King && !mv.is_castling() {
        score -= EARLY_KING_PENALTY;
    }

    // Landing on a square the enemies hit and nobody covers.
    let occ_after = pos.occupied() ^ crate::bitboard::Bitboard::single(mv.from);
    let watchers = attackers_to(pos, mv.to, occ_after);
    let mut enemies = 0;
    let mut friends = 0;
    for sq in watchers {
        if let Some((c, _)) = pos.piece_at(sq) {
            if inputs.allies.contains(c) {
                friends += 1;
            } else {
                enemies += 1;
            }
        }
    }
    if enemies > 0 && friends == 0 {
        score -= LOOSE_LANDING_PENALTY;
    }

    score
}
