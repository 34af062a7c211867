use thiserror::Error;

use crate::board::Color;
use crate::square::Square;

/// Everything the state machine can refuse. Failed operations never
/// change state (except `PromotionRequired` in deferred mode, which
/// parks the game in the awaiting-promotion substate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("move {from}->{to} is not legal")]
    IllegalMove { from: Square, to: Square },

    #[error("piece on {square} belongs to {owner:?}, not the player to move")]
    NotYourTurn { square: Square, owner: Color },

    #[error("no piece on {square}")]
    NoSuchPiece { square: Square },

    #[error("move to {square} reaches a promotion zone and needs a piece choice")]
    PromotionRequired { square: Square },

    #[error("no promotion is pending")]
    NoPendingPromotion,

    #[error("game is not accepting moves (status {status})")]
    GameOver { status: &'static str },
}
