//! Search-based AI: iterative-deepening alpha-beta over the four-player
//! position, with the bot (or its team) maximizing against everyone
//! else. Each search task owns its transposition, killer and history
//! tables outright.

pub mod context;
pub mod eval;
pub mod ordering;
pub mod search;
pub mod see;
pub mod tt;

pub use search::{
    CancelToken, SearchLimits, SearchReport, compute_best_move, search_with_report,
};

use crate::game::GameState;
use crate::moves::movegen;
use crate::moves::types::Move;
use tracing::warn;

/// How many stale search results we tolerate before giving up on the
/// bot's turn entirely.
const MAX_BOT_RETRIES: usize = 3;

/// The bot's verdict for its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotDecision {
    Move(Move),
    /// No validated move could be produced; resigning keeps the game
    /// moving.
    Resign,
}

/// Search, then re-validate against the live position before committing:
/// in networked play the authoritative state may have advanced while the
/// search ran. A stale result throws the (per-call) tables away and
/// searches again; exhausted retries resign the bot.
pub fn bot_decision(
    game: &GameState,
    limits: &SearchLimits,
    cancel: &CancelToken,
) -> BotDecision {
    let pos = game.position();
    let bot = pos.turn();
    let allies = game.mode().allies_of(bot);

    for attempt in 0..MAX_BOT_RETRIES {
        let Some(mv) = compute_best_move(pos, bot, allies, limits, cancel) else {
            if cancel.is_cancelled() {
                return BotDecision::Resign;
            }
            continue;
        };
        let still_ours = pos
            .piece_at(mv.from)
            .is_some_and(|(c, p)| c == bot && p == mv.piece);
        if still_ours && movegen::is_legal(pos, &mv) {
            return BotDecision::Move(mv);
        }
        warn!(%mv, attempt, "bot move failed validation, retrying with fresh tables");
    }
    BotDecision::Resign
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameMode, PromotionMode, TimeControl};
    use std::time::Duration;

    #[test]
    fn bot_produces_a_committable_move() {
        let game = GameState::new(
            GameMode::FreeForAll,
            TimeControl::default(),
            PromotionMode::Synchronous,
            0,
        );
        let limits = SearchLimits {
            max_depth: 2,
            budget: Duration::from_secs(30),
            quiescence_depth: 4,
            randomize: false,
        };
        let cancel = CancelToken::new();
        match bot_decision(&game, &limits, &cancel) {
            BotDecision::Move(mv) => {
                let mut game = game;
                game.make_move(mv.from, mv.to, mv.promotion, 100).unwrap();
            }
            BotDecision::Resign => panic!("bot resigned from the initial position"),
        }
    }

    #[test]
    fn cancelled_bot_resigns_rather_than_stalls() {
        let game = GameState::new(
            GameMode::FreeForAll,
            TimeControl::default(),
            PromotionMode::Synchronous,
            0,
        );
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            bot_decision(&game, &SearchLimits::default(), &cancel),
            BotDecision::Resign
        );
    }
}
