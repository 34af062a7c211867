//! Shared helpers for the integration suite: positions are staged
//! through the wire format, the same path a networked peer uses.

#![allow(dead_code)]

use std::collections::BTreeMap;

use crosschess::bitboard::Bitboard;
use crosschess::game::{
    GameMode, GameState, PromotionMode, TeamConfig, TimeControl, WireGame,
};
use crosschess::square::Square;

pub fn sq(row: u8, col: u8) -> Square {
    Square::from_coords(row, col)
}

pub fn ffa_game() -> GameState {
    GameState::new(
        GameMode::FreeForAll,
        TimeControl::default(),
        PromotionMode::Synchronous,
        0,
    )
}

pub fn team_game() -> GameState {
    GameState::new(
        GameMode::Teams(TeamConfig::opposite_seats()),
        TimeControl::default(),
        PromotionMode::Synchronous,
        0,
    )
}

/// Build a game holding exactly the given pieces, rederived through the
/// wire payload. `pieces` pairs a two-character code ("rK", "yP", ...)
/// with its squares; `turn` is a color code letter.
pub fn custom_game(pieces: &[(&str, &[(u8, u8)])], turn: char) -> GameState {
    custom_game_with(pieces, turn, |_| {})
}

/// Same as [`custom_game`] with a hook to tweak the payload first.
pub fn custom_game_with(
    pieces: &[(&str, &[(u8, u8)])],
    turn: char,
    tweak: impl FnOnce(&mut WireGame),
) -> GameState {
    let base = ffa_game();
    let mut wire = WireGame::from_game(&base);
    wire.pieces.clear();

    let mut boards: BTreeMap<String, Bitboard> = BTreeMap::new();
    for (code, squares) in pieces {
        let board = boards.entry((*code).to_string()).or_default();
        for &(r, c) in *squares {
            board.set(sq(r, c));
        }
    }
    for (code, board) in boards {
        wire.pieces.insert(code, board.to_hex());
    }
    wire.current_player_turn = turn.to_string();
    tweak(&mut wire);
    wire.into_game(PromotionMode::Synchronous)
        .expect("custom position must reconstruct")
}

/// The four kings on their home squares, the usual scaffolding for a
/// sparse test position.
pub fn kings() -> Vec<(&'static str, &'static [(u8, u8)])> {
    vec![
        ("rK", &[(13, 7)][..]),
        ("bK", &[(7, 0)][..]),
        ("yK", &[(0, 7)][..]),
        ("gK", &[(7, 13)][..]),
    ]
}
