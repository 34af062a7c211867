use crate::board::{CastleSide, Color, EpTarget, Piece, Position, castle_geometry, rook_home};
use crate::hash::zobrist::keys;
use crate::moves::types::{EliminationUndo, Move, NullUndo, Undo};

/// Commit one validated move at the position level: capture, relocation,
/// promotion, castling, rights upkeep, en-passant bookkeeping, turn
/// advance, and the derived-cache refresh. Every board-consistency
/// invariant holds again when this returns.
pub fn make_move(pos: &mut Position, mv: Move) -> Undo {
    let color = pos.turn();
    debug_assert!(pos.pieces(color, mv.piece).contains(mv.from));

    let mut undo = Undo {
        mv,
        color,
        capture: None,
        castling_rook: None,
        prev_moved: pos.moved,
        prev_ep: pos.ep_targets.clone(),
        prev_turn: color,
        prev_attack_maps: pos.attack_maps,
        prev_check: pos.check_status,
        prev_pinned: pos.pinned_mask,
        prev_zobrist: pos.zobrist,
    };

    // Capture first; the en-passant victim stands off the destination.
    if mv.is_en_passant() {
        let target = pos
            .ep_targets
            .iter()
            .find(|t| t.square == mv.to && t.creator != color)
            .copied()
            .expect("en-passant move without a matching window");
        let (fr, fc) = target.creator.forward();
        let victim_sq = mv
            .to
            .offset(fr, fc)
            .expect("en-passant victim square off board");
        pos.remove(target.creator, Piece::Pawn, victim_sq);
        undo.capture = Some((target.creator, Piece::Pawn, victim_sq));
    } else if let Some((cap_color, cap_piece)) = pos.piece_at(mv.to) {
        debug_assert!(cap_color != color);
        debug_assert!(cap_piece != Piece::King, "kings are never captured");
        pos.remove(cap_color, cap_piece, mv.to);
        undo.capture = Some((cap_color, cap_piece, mv.to));
        if cap_piece == Piece::Rook {
            retire_rook_rights(pos, cap_color, mv.to);
        }
    }

    // Relocate the mover, swapping in the promotion piece if any.
    pos.remove(color, mv.piece, mv.from);
    pos.place(color, mv.promotion.unwrap_or(mv.piece), mv.to);

    if let Some(side) = mv.castle_side() {
        let geom = castle_geometry(color, side);
        pos.remove(color, Piece::Rook, geom.rook_from);
        pos.place(color, Piece::Rook, geom.rook_to);
        undo.castling_rook = Some((geom.rook_from, geom.rook_to));
    }

    // Has-moved flags: the king's covers both wings, a rook only its own.
    if mv.piece == Piece::King && !pos.moved.king_moved(color) {
        pos.moved.mark_king(color);
        pos.zobrist ^= keys().moved_flag(color as usize * 3);
    }
    if mv.piece == Piece::Rook {
        retire_rook_rights(pos, color, mv.from);
    }

    // A double push opens an en-passant window on the skipped square,
    // stamped with the mover and the current move counter.
    if mv.is_double_pawn_push() {
        let (fr, fc) = color.forward();
        let skipped = mv
            .from
            .offset(fr, fc)
            .expect("double push from the board edge");
        pos.ep_targets.push(EpTarget {
            square: skipped,
            creator: color,
            creator_ply: pos.ply,
        });
        pos.zobrist ^= keys().ep(skipped);
    }

    advance_turn(pos, color);

    pos.ply += 1;
    pos.version += 1;
    pos.refresh_derived();
    pos.assert_hash();
    undo
}

/// Rewind `make_move`. Derived caches come back from the snapshot, so
/// undo never recomputes anything.
pub fn undo_move(pos: &mut Position, undo: Undo) {
    let mv = undo.mv;
    let color = undo.color;

    if let Some((rook_from, rook_to)) = undo.castling_rook {
        pos.remove(color, Piece::Rook, rook_to);
        pos.place(color, Piece::Rook, rook_from);
    }

    pos.remove(color, mv.promotion.unwrap_or(mv.piece), mv.to);
    pos.place(color, mv.piece, mv.from);

    if let Some((cap_color, cap_piece, cap_sq)) = undo.capture {
        pos.place(cap_color, cap_piece, cap_sq);
    }

    pos.turn = undo.prev_turn;
    pos.moved = undo.prev_moved;
    pos.ep_targets = undo.prev_ep;
    pos.attack_maps = undo.prev_attack_maps;
    pos.check_status = undo.prev_check;
    pos.pinned_mask = undo.prev_pinned;
    pos.zobrist = undo.prev_zobrist;
    pos.ply -= 1;
    pos.version -= 1;
    pos.assert_hash();
}

/// Pass move for the searcher: advance the turn (expiring windows the
/// new mover owns) without touching a piece.
pub fn make_null(pos: &mut Position) -> NullUndo {
    let undo = NullUndo {
        prev_turn: pos.turn,
        prev_ep: pos.ep_targets.clone(),
        prev_attack_maps: pos.attack_maps,
        prev_check: pos.check_status,
        prev_pinned: pos.pinned_mask,
        prev_zobrist: pos.zobrist,
    };
    let color = pos.turn;
    advance_turn(pos, color);
    pos.refresh_derived();
    pos.assert_hash();
    undo
}

pub fn undo_null(pos: &mut Position, undo: NullUndo) {
    pos.turn = undo.prev_turn;
    pos.ep_targets = undo.prev_ep;
    pos.attack_maps = undo.prev_attack_maps;
    pos.check_status = undo.prev_check;
    pos.pinned_mask = undo.prev_pinned;
    pos.zobrist = undo.prev_zobrist;
    pos.assert_hash();
}

/// Remove a color from play: its pieces leave the live boards for the
/// frozen display boards, its en-passant windows close, and the turn
/// passes on if it was theirs.
pub fn eliminate(pos: &mut Position, color: Color) -> EliminationUndo {
    debug_assert!(pos.is_active(color));
    let undo = EliminationUndo {
        color,
        boards: pos.piece_bb[color as usize],
        prev_ep: pos.ep_targets.clone(),
        prev_turn: pos.turn,
        prev_attack_maps: pos.attack_maps,
        prev_check: pos.check_status,
        prev_pinned: pos.pinned_mask,
        prev_zobrist: pos.zobrist,
    };

    for piece in Piece::ALL {
        for sq in pos.pieces(color, piece) {
            pos.remove(color, piece, sq);
            pos.eliminated_bb[color as usize][piece as usize].set(sq);
        }
    }

    pos.eliminated.insert(color);
    pos.zobrist ^= keys().eliminated(color);

    let mut i = 0;
    while i < pos.ep_targets.len() {
        if pos.ep_targets[i].creator == color {
            pos.zobrist ^= keys().ep(pos.ep_targets[i].square);
            pos.ep_targets.remove(i);
        } else {
            i += 1;
        }
    }

    if pos.turn == color
        && let Some(next) = pos.next_active_after(color)
    {
        pos.zobrist ^= keys().turn(pos.turn) ^ keys().turn(next);
        pos.turn = next;
    }

    pos.version += 1;
    pos.refresh_derived();
    pos.assert_hash();
    undo
}

pub fn undo_eliminate(pos: &mut Position, undo: EliminationUndo) {
    let color = undo.color;
    pos.eliminated.remove(color);
    for piece in Piece::ALL {
        pos.eliminated_bb[color as usize][piece as usize] = crate::bitboard::Bitboard::EMPTY;
        for sq in undo.boards[piece as usize] {
            pos.place(color, piece, sq);
        }
    }
    pos.turn = undo.prev_turn;
    pos.ep_targets = undo.prev_ep;
    pos.attack_maps = undo.prev_attack_maps;
    pos.check_status = undo.prev_check;
    pos.pinned_mask = undo.prev_pinned;
    pos.zobrist = undo.prev_zobrist;
    pos.version -= 1;
    pos.assert_hash();
}

fn retire_rook_rights(pos: &mut Position, color: Color, sq: crate::square::Square) {
    for side in CastleSide::BOTH {
        if rook_home(color, side) == sq && !pos.moved.rook_moved(color, side) {
            pos.moved.mark_rook(color, side);
            let slot = match side {
                CastleSide::Kingside => 2,
                CastleSide::Queenside => 1,
            };
            pos.zobrist ^= keys().moved_flag(color as usize * 3 + slot);
        }
    }
}

/// Hand the turn to the next active color and close the windows the new
/// mover opened on their previous turn.
fn advance_turn(pos: &mut Position, from: Color) {
    let next = pos.next_active_after(from).unwrap_or(from);
    if next != pos.turn {
        pos.zobrist ^= keys().turn(pos.turn) ^ keys().turn(next);
        pos.turn = next;
    }
    let mut i = 0;
    while i < pos.ep_targets.len() {
        if pos.ep_targets[i].creator == next {
            pos.zobrist ^= keys().ep(pos.ep_targets[i].square);
            pos.ep_targets.remove(i);
        } else {
            i += 1;
        }
    }
}
