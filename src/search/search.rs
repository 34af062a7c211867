use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::board::{Color, ColorSet, Position};
use crate::moves::square_control::attackers_to;
use crate::moves::types::Move;
use crate::moves::{execute, movegen};
use crate::search::context::{MAX_PLY, SearchContext};
use crate::search::eval::evaluate;
use crate::search::ordering::{OrderingInputs, mvv_lva, order_moves};
use crate::search::see::see;
use crate::search::tt::{Bound, TTEntry, TranspositionTable};

pub const INF: i32 = 2_000_000;
pub const MATE: i32 = 1_000_000;
const MATE_THRESHOLD: i32 = MATE - 10_000;

const NULL_MOVE_REDUCTION: i32 = 2;
const MAX_EXTENSIONS: i32 = 2;
const DELTA_MARGIN: i32 = 200;
const TT_CAPACITY: usize = 1 << 20;

// Local-play unpredictability knobs.
const RANDOM_GAP: i32 = 30;
const RANDOM_TOP_K: usize = 4;
const SECOND_BEST_PROB: f64 = 0.1;

/// Polled stop flag shared between the host and a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_depth: i32,
    /// Whole thinking budget; the search returns with a quarter still on
    /// the clock so the host has room to apply the move.
    pub budget: Duration,
    pub quiescence_depth: i32,
    /// Local play only: blur the choice among near-equal root moves.
    pub randomize: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: 6,
            budget: Duration::from_millis(2_000),
            quiescence_depth: 8,
            randomize: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
}

/// Pick the bot's move. Returns `None` when the position is not the
/// bot's to move, no legal move exists, or cancellation fired before
/// depth 1 completed.
pub fn compute_best_move(
    pos: &Position,
    bot: Color,
    allies: ColorSet,
    limits: &SearchLimits,
    cancel: &CancelToken,
) -> Option<Move> {
    search_with_report(pos, bot, allies, limits, cancel).best
}

// Mate scores are stored ply-independent and rebased on probe.
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

struct Searcher {
    pos: Position,
    bot: Color,
    allies: ColorSet,
    ctx: SearchContext,
    tt: TranspositionTable,
    cancel: CancelToken,
    deadline: Instant,
    stopped: bool,
    nodes: u64,
    qdepth_limit: i32,
}

impl Searcher {
    fn new(
        pos: Position,
        bot: Color,
        allies: ColorSet,
        limits: &SearchLimits,
        cancel: &CancelToken,
    ) -> Self {
        Searcher {
            pos,
            bot,
            allies,
            ctx: SearchContext::new(),
            tt: TranspositionTable::new(TT_CAPACITY),
            cancel: cancel.clone(),
            // Return with ~25% of the budget unspent.
            deadline: Instant::now() + limits.budget * 3 / 4,
            stopped: false,
            nodes: 0,
            qdepth_limit: limits.quiescence_depth,
        }
    }

    #[inline(always)]
    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.cancel.is_cancelled() {
            self.stopped = true;
            return true;
        }
        if self.nodes & 1023 == 0 && Instant::now() >= self.deadline {
            self.stopped = true;
            return true;
        }
        false
    }

    /// The mover's coalition for exchange purposes: the bot's own side,
    /// or everyone opposing it.
    #[inline(always)]
    fn coalition_of(&self, color: Color) -> ColorSet {
        if self.allies.contains(color) {
            self.allies
        } else {
            ColorSet(0b1111 & !self.allies.0)
        }
    }

    #[inline(always)]
    fn maximizing(&self, color: Color) -> bool {
        self.allies.contains(color)
    }

    fn eval_here(&self) -> i32 {
        evaluate(&self.pos, self.allies)
    }

    fn alpha_beta(
        &mut self,
        depth: i32,
        ply: i32,
        mut alpha: i32,
        mut beta: i32,
        ext_used: i32,
    ) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.nodes += 1;

        // Terminal coalition states.
        if !self.pos.is_active(self.bot) {
            return -MATE + ply;
        }
        if self.pos.active_colors().all(|c| self.allies.contains(c)) {
            return MATE - ply;
        }
        if ply as usize >= MAX_PLY {
            return self.eval_here();
        }

        let hash = self.pos.zobrist();
        let mut tt_move = None;
        if let Some(entry) = self.tt.probe(hash) {
            tt_move = entry.best_move;
            // Never cut off at the root: the move list there must stay
            // fresh after external check events.
            if ply > 0 && i32::from(entry.depth) >= depth {
                let score = score_from_tt(entry.score, ply);
                match entry.bound {
                    Bound::Exact => return score,
                    Bound::Lower if score >= beta => return score,
                    Bound::Upper if score <= alpha => return score,
                    _ => {}
                }
            }
        }

        let turn = self.pos.turn();
        let in_chk = self.pos.in_check(turn);
        if depth <= 0 && !in_chk {
            return self.quiescence(ply, alpha, beta, 0);
        }
        let maximizing = self.maximizing(turn);

        // Null move: let the bot pass and see whether the position still
        // clears beta. Skipped in check and on opposing turns.
        if depth >= 3 && !in_chk && maximizing && ply > 0 {
            let undo = execute::make_null(&mut self.pos);
            let score = self.alpha_beta(
                depth - 1 - NULL_MOVE_REDUCTION,
                ply + 1,
                alpha,
                beta,
                ext_used,
            );
            execute::undo_null(&mut self.pos, undo);
            if self.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        }

        let mut moves: Vec<Move> = Vec::with_capacity(48);
        movegen::generate_legal(&self.pos, &mut moves);

        if moves.is_empty() {
            // No reply: this player is eliminated on the spot. For the
            // bot that ends the search; for others the game rolls on.
            if turn == self.bot {
                return -MATE + ply;
            }
            let undo = execute::eliminate(&mut self.pos, turn);
            let score = self.alpha_beta(depth, ply, alpha, beta, ext_used);
            execute::undo_eliminate(&mut self.pos, undo);
            return score;
        }

        order_moves(
            &self.pos,
            &mut moves,
            &OrderingInputs {
                ctx: &self.ctx,
                allies: self.coalition_of(turn),
                tt_move,
                prev_best: None,
                killers: self.ctx.killers(ply as usize),
                in_check: in_chk,
            },
        );

        let original_alpha = alpha;
        let original_beta = beta;
        let mut best = if maximizing { -INF } else { INF };
        let mut best_move = None;
        let mut searched = 0usize;

        for mv in moves {
            if self.should_stop() {
                return 0;
            }
            // Losing captures go unsearched unless the side is in check
            // (or nothing has been searched yet).
            if searched > 0
                && mv.is_capture()
                && !in_chk
                && see(&self.pos, &mv, self.coalition_of(turn)) < 0
            {
                continue;
            }

            let undo = execute::make_move(&mut self.pos, mv);
            let gives_check = self.pos.in_check(self.pos.turn());
            let ext = if gives_check && ext_used < MAX_EXTENSIONS {
                1
            } else {
                0
            };
            let score = self.alpha_beta(depth - 1 + ext, ply + 1, alpha, beta, ext_used + ext);
            execute::undo_move(&mut self.pos, undo);
            searched += 1;

            if self.stopped {
                return 0;
            }

            if maximizing {
                if score > best {
                    best = score;
                    best_move = Some(mv);
                }
                if best > alpha {
                    alpha = best;
                }
                if alpha >= beta {
                    self.register_cutoff(turn, mv, depth, ply);
                    break;
                }
            } else {
                if score < best {
                    best = score;
                    best_move = Some(mv);
                }
                if best < beta {
                    beta = best;
                }
                if beta <= alpha {
                    self.register_cutoff(turn, mv, depth, ply);
                    break;
                }
            }
        }

        if self.stopped {
            return best;
        }

        let bound = if best >= original_beta {
            Bound::Lower
        } else if best <= original_alpha {
            Bound::Upper
        } else {
            Bound::Exact
        };
        self.tt.store(
            hash,
            TTEntry {
                best_move,
                score: score_to_tt(best, ply),
                depth: depth.clamp(0, u8::MAX as i32) as u8,
                bound,
            },
        );
        best
    }

    /// Quiet the horizon: stand pat, then captures only, MVV-LVA first,
    /// with delta and SEE pruning, to a bounded depth.
    fn quiescence(&mut self, ply: i32, mut alpha: i32, mut beta: i32, qdepth: i32) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.nodes += 1;

        if !self.pos.is_active(self.bot) {
            return -MATE + ply;
        }
        if self.pos.active_colors().all(|c| self.allies.contains(c)) {
            return MATE - ply;
        }

        let stand_pat = self.eval_here();
        if qdepth >= self.qdepth_limit || ply as usize >= MAX_PLY {
            return stand_pat;
        }

        let turn = self.pos.turn();
        let maximizing = self.maximizing(turn);
        if maximizing {
            if stand_pat >= beta {
                return beta;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        } else {
            if stand_pat <= alpha {
                return alpha;
            }
            if stand_pat < beta {
                beta = stand_pat;
            }
        }

        let mut captures: Vec<Move> = Vec::with_capacity(24);
        movegen::generate_legal_captures(&self.pos, &mut captures);
        captures.sort_by_cached_key(|mv| std::cmp::Reverse(mvv_lva(&self.pos, mv)));

        let coalition = self.coalition_of(turn);
        for mv in captures {
            if self.should_stop() {
                return 0;
            }
            let victim_value = if mv.is_en_passant() {
                crate::board::Piece::Pawn.value()
            } else {
                self.pos.piece_at(mv.to).map(|(_, p)| p.value()).unwrap_or(0)
            };
            // Delta pruning: even winning this victim cannot rescue the
            // score. Promotions are exempt, their upside is larger.
            if !mv.is_promotion() {
                if maximizing && stand_pat + victim_value + DELTA_MARGIN < alpha {
                    continue;
                }
                if !maximizing && stand_pat - victim_value - DELTA_MARGIN > beta {
                    continue;
                }
            }
            if see(&self.pos, &mv, coalition) < 0 {
                continue;
            }

            let undo = execute::make_move(&mut self.pos, mv);
            let score = self.quiescence(ply + 1, alpha, beta, qdepth + 1);
            execute::undo_move(&mut self.pos, undo);

            if self.stopped {
                return 0;
            }

            if maximizing {
                if score >= beta {
                    return beta;
                }
                if score > alpha {
                    alpha = score;
                }
            } else {
                if score <= alpha {
                    return alpha;
                }
                if score < beta {
                    beta = score;
                }
            }
        }

        if maximizing { alpha } else { beta }
    }

    fn register_cutoff(&mut self, turn: Color, mv: Move, depth: i32, ply: i32) {
        if !mv.is_capture() {
            self.ctx.update_killer(ply as usize, mv);
            self.ctx.update_history(turn, mv, depth);
        }
    }

    /// Root move that checkmates the next player outright.
    fn is_root_mate(&mut self, mv: Move) -> bool {
        let undo = execute::make_move(&mut self.pos, mv);
        let victim = self.pos.turn();
        let mut mate = false;
        if !self.allies.contains(victim) && self.pos.in_check(victim) {
            let mut replies: Vec<Move> = Vec::with_capacity(8);
            movegen::generate_legal(&self.pos, &mut replies);
            mate = replies.is_empty();
        }
        execute::undo_move(&mut self.pos, undo);
        mate
    }

    /// Destination square is hit by an enemy with no friendly cover.
    fn lands_loose(&self, mv: &Move) -> bool {
        let occ_after = self.pos.occupied() ^ crate::bitboard::Bitboard::single(mv.from);
        let watchers = attackers_to(&self.pos, mv.to, occ_after);
        let mut enemies = 0;
        let mut friends = 0;
        for sq in watchers {
            if let Some((c, _)) = self.pos.piece_at(sq) {
                if self.allies.contains(c) {
                    friends += 1;
                } else {
                    enemies += 1;
                }
            }
        }
        enemies > 0 && friends == 0
    }
}

/// Iterative deepening driver. The answer is always the deepest fully
/// completed iteration's choice, unless an interrupted iteration had
/// already proven a strictly better score.
pub fn search_with_report(
    pos: &Position,
    bot: Color,
    allies: ColorSet,
    limits: &SearchLimits,
    cancel: &CancelToken,
) -> SearchReport {
    let mut report = SearchReport {
        best: None,
        score: 0,
        depth: 0,
        nodes: 0,
    };
    if pos.turn() != bot || !pos.is_active(bot) {
        return report;
    }

    let mut s = Searcher::new(pos.clone(), bot, allies, limits, cancel);

    let mut root_moves: Vec<Move> = Vec::with_capacity(64);
    movegen::generate_legal(&s.pos, &mut root_moves);
    if root_moves.is_empty() {
        return report;
    }

    // Root safety filter: drop moves parking a piece on an attacked,
    // undefended square, unless that would empty the list.
    if !s.pos.in_check(bot) {
        let kept: Vec<Move> = root_moves
            .iter()
            .copied()
            .filter(|mv| !s.lands_loose(mv))
            .collect();
        if !kept.is_empty() {
            root_moves = kept;
        }
    }

    let mut completed: Option<(Move, i32)> = None;
    let mut scored_roots: Vec<(Move, i32)> = Vec::new();

    for depth in 1..=limits.max_depth.max(1) {
        if Instant::now() >= s.deadline || s.cancel.is_cancelled() {
            break;
        }

        let mate_moves: Vec<Move> = root_moves
            .iter()
            .copied()
            .filter(|&mv| s.is_root_mate(mv))
            .collect();

        order_moves(
            &s.pos,
            &mut root_moves,
            &OrderingInputs {
                ctx: &s.ctx,
                allies,
                tt_move: s.tt.probe(s.pos.zobrist()).and_then(|e| e.best_move),
                prev_best: completed.map(|(mv, _)| mv),
                killers: s.ctx.killers(0),
                in_check: s.pos.in_check(bot),
            },
        );
        // Outright mates jump the whole queue.
        if !mate_moves.is_empty() {
            root_moves.sort_by_key(|mv| !mate_moves.iter().any(|m| m.same_action(mv)));
        }

        let mut alpha = -INF;
        let beta = INF;
        let mut iteration: Vec<(Move, i32)> = Vec::with_capacity(root_moves.len());
        let mut iteration_best: Option<(Move, i32)> = None;

        for &mv in &root_moves {
            if s.should_stop() {
                break;
            }
            let undo = execute::make_move(&mut s.pos, mv);
            let gives_check = s.pos.in_check(s.pos.turn());
            let ext = if gives_check { 1 } else { 0 };
            let score = s.alpha_beta(depth - 1 + ext, 1, alpha, beta, ext);
            execute::undo_move(&mut s.pos, undo);
            if s.stopped {
                break;
            }
            iteration.push((mv, score));
            if iteration_best.is_none_or(|(_, b)| score > b) {
                iteration_best = Some((mv, score));
            }
            if score > alpha {
                alpha = score;
            }
        }

        if s.stopped {
            // Keep an interrupted iteration's answer only if it already
            // beat the last completed one.
            if let (Some((mv, score)), Some((_, done_score))) = (iteration_best, completed)
                && score > done_score
            {
                completed = Some((mv, score));
            }
            break;
        }

        completed = iteration_best;
        scored_roots = iteration;
        report.depth = depth;
        debug!(
            depth,
            score = completed.map(|(_, s)| s),
            nodes = s.nodes,
            "iteration complete"
        );

        if completed.is_some_and(|(_, score)| score.abs() >= MATE_THRESHOLD) {
            break;
        }
    }

    report.nodes = s.nodes;
    if let Some((best, score)) = completed {
        report.score = score;
        report.best = Some(if limits.randomize {
            randomize_choice(&scored_roots, best)
        } else {
            best
        });
    }
    report
}

/// Local-play unpredictability: near-ties pick weighted among the top
/// few; clear bests still occasionally yield to the runner-up.
fn randomize_choice(scored: &[(Move, i32)], best: Move) -> Move {
    if scored.len() < 2 {
        return best;
    }
    let mut sorted: Vec<(Move, i32)> = scored.to_vec();
    sorted.sort_by_key(|&(_, score)| std::cmp::Reverse(score));
    let mut rng = rand::rng();

    let gap = sorted[0].1 - sorted[1].1;
    if gap < RANDOM_GAP {
        let pool = &sorted[..sorted.len().min(RANDOM_TOP_K)];
        let floor = pool.iter().map(|&(_, s)| s).min().unwrap_or(0);
        let weights: Vec<i64> = pool
            .iter()
            .map(|&(_, s)| i64::from(s - floor) + 1)
            .collect();
        let total: i64 = weights.iter().sum();
        let mut ticket = rng.random_range(0..total);
        for (i, w) in weights.iter().enumerate() {
            if ticket < *w {
                return pool[i].0;
            }
            ticket -= w;
        }
        return sorted[0].0;
    }
    if rng.random_bool(SECOND_BEST_PROB) {
        return sorted[1].0;
    }
    best
}
