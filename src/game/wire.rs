//! Network serialization of a game: piece boards as hex big integers,
//! scalar state verbatim, derived caches omitted and rebuilt on
//! receipt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bitboard::{Bitboard, PLAYABLE};
use crate::board::{CastleBits, Color, EpTarget, Piece, Position, parse_piece_code, piece_code};
use crate::game::{
    Clocks, EliminationReason, GameMode, GameState, GameStatus, MoveRecord, PromotionMode, Team,
    TeamConfig, TimeControl,
};
use crate::moves::types::{CAPTURE, Move, QUIET_MOVE};
use crate::square::{NUM_SQUARES, Square};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unknown piece code {0:?}")]
    BadPieceCode(String),
    #[error("unknown color code {0:?}")]
    BadColor(String),
    #[error("bad bitboard payload: {0}")]
    BadBitboard(String),
    #[error("square index {0} out of range")]
    BadSquare(u8),
    #[error("inconsistent payload: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEpTarget {
    pub position: u8,
    pub creator: String,
    pub creator_turn: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLastMove {
    pub from: u8,
    pub to: u8,
    pub piece: String,
    pub captured: Option<String>,
    pub timestamp: u64,
    pub player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTimeControl {
    pub initial_ms: u64,
    pub increment_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireElimination {
    pub color: String,
    pub reason: String,
}

/// The transportable game state. Occupancy, aggregates, attack maps, pin
/// masks and check flags never travel; the receiver rederives them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGame {
    pub pieces: BTreeMap<String, String>,
    pub eliminated_piece_bitboards: BTreeMap<String, String>,
    pub en_passant_targets: Vec<WireEpTarget>,
    pub has_moved: BTreeMap<String, bool>,
    pub eliminated_players: Vec<WireElimination>,
    pub scores: BTreeMap<String, u32>,
    pub captured_pieces: BTreeMap<String, Vec<String>>,
    pub clocks: BTreeMap<String, i64>,
    pub turn_started_at: u64,
    pub time_control: WireTimeControl,
    pub team_mode: bool,
    pub team_assignments: Option<BTreeMap<String, String>>,
    pub current_player_turn: String,
    pub version: u64,
    pub ply: u32,
    pub last_move: Option<WireLastMove>,
}

fn moved_key(i: usize) -> String {
    let color = Color::from_u8((i / 3) as u8);
    let slot = match i % 3 {
        0 => "K",
        1 => "R1",
        _ => "R2",
    };
    format!("{}{}", color.code(), slot)
}

fn reason_str(reason: EliminationReason) -> &'static str {
    match reason {
        EliminationReason::Checkmate => "checkmate",
        EliminationReason::Stalemate => "stalemate",
        EliminationReason::Resignation => "resignation",
        EliminationReason::Timeout => "timeout",
    }
}

fn parse_reason(s: &str) -> Result<EliminationReason, WireError> {
    match s {
        "checkmate" => Ok(EliminationReason::Checkmate),
        "stalemate" => Ok(EliminationReason::Stalemate),
        "resignation" => Ok(EliminationReason::Resignation),
        "timeout" => Ok(EliminationReason::Timeout),
        other => Err(WireError::Inconsistent(format!(
            "unknown elimination reason {other:?}"
        ))),
    }
}

fn parse_color(code: &str) -> Result<Color, WireError> {
    code.chars()
        .next()
        .filter(|_| code.len() == 1)
        .and_then(Color::from_code)
        .ok_or_else(|| WireError::BadColor(code.to_string()))
}

impl WireGame {
    pub fn from_game(game: &GameState) -> WireGame {
        let pos = game.position();

        let mut pieces = BTreeMap::new();
        let mut eliminated_piece_bitboards = BTreeMap::new();
        for color in Color::ALL {
            for piece in Piece::ALL {
                let live = pos.pieces(color, piece);
                if live.any() {
                    pieces.insert(piece_code(color, piece), live.to_hex());
                }
                let frozen = pos.eliminated_pieces(color, piece);
                if frozen.any() {
                    eliminated_piece_bitboards.insert(piece_code(color, piece), frozen.to_hex());
                }
            }
        }

        let en_passant_targets = pos
            .ep_targets()
            .iter()
            .map(|t| WireEpTarget {
                position: t.square.index(),
                creator: t.creator.code().to_string(),
                creator_turn: t.creator_ply,
            })
            .collect();

        let mut has_moved = BTreeMap::new();
        for (i, flag) in pos.castle_bits().flags().into_iter().enumerate() {
            has_moved.insert(moved_key(i), flag);
        }

        let eliminated_players = game
            .eliminations()
            .iter()
            .map(|&(c, reason)| WireElimination {
                color: c.code().to_string(),
                reason: reason_str(reason).to_string(),
            })
            .collect();

        let mut scores = BTreeMap::new();
        let mut clocks = BTreeMap::new();
        let mut captured_pieces = BTreeMap::new();
        for color in Color::ALL {
            scores.insert(color.code().to_string(), game.score(color));
            clocks.insert(color.code().to_string(), game.clocks().remaining(color));
            captured_pieces.insert(
                color.code().to_string(),
                game.captured_pieces(color)
                    .iter()
                    .map(|&(c, p)| piece_code(c, p))
                    .collect(),
            );
        }

        let team_assignments = game.mode().team_config().map(|cfg| {
            Color::ALL
                .into_iter()
                .map(|c| {
                    let team = match cfg.team_of(c) {
                        Team::A => "A",
                        Team::B => "B",
                    };
                    (c.code().to_string(), team.to_string())
                })
                .collect()
        });

        let last_move = game.last_move().map(|rec| WireLastMove {
            from: rec.mv.from.index(),
            to: rec.mv.to.index(),
            piece: piece_code(rec.color, rec.mv.piece),
            captured: rec.captured.map(|(c, p)| piece_code(c, p)),
            timestamp: rec.timestamp_ms,
            player: rec.color.code().to_string(),
        });

        WireGame {
            pieces,
            eliminated_piece_bitboards,
            en_passant_targets,
            has_moved,
            eliminated_players,
            scores,
            captured_pieces,
            clocks,
            turn_started_at: game.turn_started_at(),
            time_control: WireTimeControl {
                initial_ms: game.clocks().control.initial_ms,
                increment_ms: game.clocks().control.increment_ms,
            },
            team_mode: game.mode().team_config().is_some(),
            team_assignments,
            current_player_turn: pos.turn().code().to_string(),
            version: pos.version(),
            ply: pos.ply(),
            last_move,
        }
    }

    /// Rebuild a full game, rederiving every cached field and checking
    /// the board-consistency invariants before handing the state over.
    pub fn into_game(self, promotion_mode: PromotionMode) -> Result<GameState, WireError> {
        let mut pos = Position::empty();

        for (code, hex) in &self.pieces {
            let (color, piece) = parse_piece_code(code)
                .ok_or_else(|| WireError::BadPieceCode(code.clone()))?;
            let bb = Bitboard::from_hex(hex).map_err(WireError::BadBitboard)?;
            if (bb & !PLAYABLE).any() {
                return Err(WireError::Inconsistent(format!(
                    "{code} has bits outside the playable mask"
                )));
            }
            for sq in bb {
                if pos.piece_at(sq).is_some() {
                    return Err(WireError::Inconsistent(format!(
                        "square {sq} is doubly occupied"
                    )));
                }
                pos.place(color, piece, sq);
            }
        }

        for (code, hex) in &self.eliminated_piece_bitboards {
            let (color, piece) = parse_piece_code(code)
                .ok_or_else(|| WireError::BadPieceCode(code.clone()))?;
            let bb = Bitboard::from_hex(hex).map_err(WireError::BadBitboard)?;
            pos.eliminated_bb[color as usize][piece as usize] = bb;
        }

        let mut eliminations = Vec::with_capacity(self.eliminated_players.len());
        for e in &self.eliminated_players {
            let color = parse_color(&e.color)?;
            pos.eliminated.insert(color);
            eliminations.push((color, parse_reason(&e.reason)?));
        }

        let mut flags = [false; 12];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = self.has_moved.get(&moved_key(i)).copied().unwrap_or(false);
        }
        pos.moved = CastleBits::from_flags(flags);

        for t in &self.en_passant_targets {
            if t.position as usize >= NUM_SQUARES {
                return Err(WireError::BadSquare(t.position));
            }
            let creator = parse_color(&t.creator)?;
            if pos.eliminated.contains(creator) {
                return Err(WireError::Inconsistent(
                    "en-passant window owned by eliminated player".to_string(),
                ));
            }
            pos.ep_targets.push(EpTarget {
                square: Square::from_index(t.position),
                creator,
                creator_ply: t.creator_turn,
            });
        }

        let turn = parse_color(&self.current_player_turn)?;
        if pos.eliminated.contains(turn) {
            return Err(WireError::Inconsistent(
                "turn belongs to an eliminated player".to_string(),
            ));
        }
        pos.turn = turn;
        pos.ply = self.ply;
        pos.version = self.version;
        pos.zobrist = pos.compute_zobrist_full();
        pos.refresh_derived();
        pos.validate().map_err(WireError::Inconsistent)?;

        let mode = if self.team_mode {
            let assignments = self.team_assignments.as_ref().ok_or_else(|| {
                WireError::Inconsistent("team mode without assignments".to_string())
            })?;
            let mut teams = [Team::A; 4];
            for color in Color::ALL {
                let label = assignments
                    .get(&color.code().to_string())
                    .ok_or_else(|| {
                        WireError::Inconsistent(format!("no team for {:?}", color))
                    })?;
                teams[color as usize] = match label.as_str() {
                    "A" => Team::A,
                    "B" => Team::B,
                    other => {
                        return Err(WireError::Inconsistent(format!(
                            "unknown team label {other:?}"
                        )));
                    }
                };
            }
            GameMode::Teams(TeamConfig::new(teams))
        } else {
            GameMode::FreeForAll
        };

        let control = TimeControl::new(self.time_control.initial_ms, self.time_control.increment_ms);
        let mut clocks = Clocks::new(control);
        for color in Color::ALL {
            if let Some(&ms) = self.clocks.get(&color.code().to_string()) {
                clocks.set_remaining(color, ms);
            }
        }

        let mut scores = [0u32; 4];
        let mut captured: [Vec<(Color, Piece)>; 4] = Default::default();
        for color in Color::ALL {
            let key = color.code().to_string();
            scores[color as usize] = self.scores.get(&key).copied().unwrap_or(0);
            if let Some(codes) = self.captured_pieces.get(&key) {
                for code in codes {
                    let pair = parse_piece_code(code)
                        .ok_or_else(|| WireError::BadPieceCode(code.clone()))?;
                    captured[color as usize].push(pair);
                }
            }
        }

        let last_move = match &self.last_move {
            None => None,
            Some(w) => {
                if w.from as usize >= NUM_SQUARES {
                    return Err(WireError::BadSquare(w.from));
                }
                if w.to as usize >= NUM_SQUARES {
                    return Err(WireError::BadSquare(w.to));
                }
                let (player, piece) = parse_piece_code(&w.piece)
                    .ok_or_else(|| WireError::BadPieceCode(w.piece.clone()))?;
                let captured = match &w.captured {
                    None => None,
                    Some(code) => Some(
                        parse_piece_code(code)
                            .ok_or_else(|| WireError::BadPieceCode(code.clone()))?,
                    ),
                };
                Some(MoveRecord {
                    mv: Move {
                        from: Square::from_index(w.from),
                        to: Square::from_index(w.to),
                        piece,
                        promotion: None,
                        flags: if captured.is_some() { CAPTURE } else { QUIET_MOVE },
                    },
                    color: player,
                    captured,
                    timestamp_ms: w.timestamp,
                })
            }
        };

        let mut game = GameState::new(mode, control, promotion_mode, self.turn_started_at);
        game.pos = pos;
        game.clocks = clocks;
        game.scores = scores;
        game.captured = captured;
        game.eliminations = eliminations;
        game.last_move = last_move;
        game.status = GameStatus::Active;
        game.outcome = None;
        game.maybe_finish();
        Ok(game)
    }
}
