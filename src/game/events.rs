use crate::board::{Color, Piece};
use crate::moves::types::Move;

/// Why a color left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliminationReason {
    Checkmate,
    Stalemate,
    Resignation,
    Timeout,
}

/// How a finished game was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Free-for-all: the last color standing.
    Winner(Color),
    /// Team mode: the team with a surviving member.
    WinningTeam(crate::game::Team),
}

/// Presentation-level notifications. The core never calls into UI,
/// sound, or network code; it hands these to an opaque sink the host
/// installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    MoveApplied { color: Color, mv: Move },
    CheckAnnounced { color: Color },
    Eliminated { color: Color, reason: EliminationReason },
    GameOver { outcome: Outcome },
    Betrayal { attacker: Color, victim: Color, piece: Piece },
}

pub type EventSink = Box<dyn FnMut(GameEvent) + Send>;
