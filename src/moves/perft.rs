//! Move-generation validation by exhaustive tree walk. The counters
//! split nodes by move kind so a disagreement points at the guilty
//! generator quickly.

use crate::board::Position;
use crate::moves::execute::{make_move, undo_move};
use crate::moves::movegen::generate_legal;
use crate::moves::types::Move;
use tracing::{debug, instrument};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
}

impl PerftCounters {
    pub fn add(&mut self, other: &PerftCounters) {
        self.nodes += other.nodes;
        self.captures += other.captures;
        self.ep_captures += other.ep_captures;
        self.castles += other.castles;
        self.promotions += other.promotions;
        self.checks += other.checks;
    }
}

/// Leaf count only.
#[instrument(skip(pos), fields(depth))]
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut moves: Vec<Move> = Vec::with_capacity(64);
    generate_legal(pos, &mut moves);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut total = 0;
    for mv in moves {
        let undo = make_move(pos, mv);
        total += perft(pos, depth - 1);
        undo_move(pos, undo);
    }
    total
}

/// Full counter breakdown.
pub fn perft_detailed(pos: &mut Position, depth: u32) -> PerftCounters {
    let mut counters = PerftCounters::default();
    if depth == 0 {
        counters.nodes = 1;
        return counters;
    }
    let mut moves: Vec<Move> = Vec::with_capacity(64);
    generate_legal(pos, &mut moves);
    for mv in moves {
        let undo = make_move(pos, mv);
        if depth == 1 {
            counters.nodes += 1;
            if mv.is_capture() {
                counters.captures += 1;
            }
            if mv.is_en_passant() {
                counters.ep_captures += 1;
            }
            if mv.is_castling() {
                counters.castles += 1;
            }
            if mv.is_promotion() {
                counters.promotions += 1;
            }
            if pos.in_check(pos.turn()) {
                counters.checks += 1;
            }
        } else {
            let sub = perft_detailed(pos, depth - 1);
            counters.add(&sub);
        }
        undo_move(pos, undo);
    }
    counters
}

/// Per-root-move totals, the first thing to diff when two generators
/// disagree.
#[instrument(skip(pos), fields(depth))]
pub fn perft_divide(pos: &mut Position, depth: u32) -> Vec<(Move, u64)> {
    let mut moves: Vec<Move> = Vec::with_capacity(64);
    generate_legal(pos, &mut moves);
    debug!(depth, moves = moves.len(), "divide: root legal moves");
    let mut out = Vec::with_capacity(moves.len());
    for mv in moves {
        let undo = make_move(pos, mv);
        let count = if depth <= 1 { 1 } else { perft(pos, depth - 1) };
        undo_move(pos, undo);
        debug!(%mv, nodes = count, "divide: root child total");
        out.push((mv, count));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_one_matches_the_move_count() {
        let mut pos = Position::initial();
        assert_eq!(perft(&mut pos, 1), 20);
        // The walk leaves the position untouched.
        assert_eq!(pos, Position::initial());
    }

    #[test]
    fn depth_two_sums_all_replies() {
        let mut pos = Position::initial();
        let total = perft(&mut pos, 2);
        // Blue opens with 20 moves after 19 of Red's openings. Red's
        // c-pawn double push lands on (10,3) and blocks the double push
        // of Blue's pawn on (10,1), leaving Blue 19 there.
        assert_eq!(total, 399);
    }

    #[test]
    fn divide_totals_agree_with_perft() {
        let mut pos = Position::initial();
        let divided: u64 = perft_divide(&mut pos, 2).iter().map(|(_, n)| n).sum();
        assert_eq!(divided, perft(&mut pos, 2));
    }

    #[test]
    fn detailed_counts_are_consistent() {
        let mut pos = Position::initial();
        let counters = perft_detailed(&mut pos, 2);
        assert_eq!(counters.nodes, 399);
        assert_eq!(counters.captures, 0);
        assert_eq!(counters.castles, 0);
        assert_eq!(counters.promotions, 0);
    }
}
