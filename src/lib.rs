//! Core engine for four-player chess on the 14x14 cross board:
//! bitboard move generation, the authoritative game state machine, and
//! the searching bot. Everything else (rendering, transport, accounts)
//! lives with the host and talks to this crate through [`game::GameState`],
//! [`search::bot_decision`] and the [`game::wire`] payloads.

pub mod bitboard;
pub mod board;
pub mod error;
pub mod game;
pub mod hash;
#[cfg(feature = "cli")]
pub mod logger;
pub mod moves;
pub mod search;
pub mod square;
