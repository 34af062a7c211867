use crate::bitboard::Bitboard;
use crate::board::{CastleSide, Color, Piece, Position, castle_geometry};
use crate::moves::attacks::attacks_from;
use crate::moves::square_control::{
    CheckConstraint, check_constraint, danger_squares, in_check_now, pin_line,
};
use crate::moves::tables::tables;
use crate::moves::types::{
    CAPTURE, DOUBLE_PAWN_PUSH, EN_PASSANT, KINGSIDE_CASTLE, Move, MoveBuffer, PROMOTION,
    PROMOTION_CAPTURE, QUEENSIDE_CASTLE, QUIET_MOVE,
};
use crate::square::Square;

const PROMOS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Per-generation legality context: the danger mask for king steps, the
/// check constraint for everything else, and the pin mask.
struct GenContext {
    color: Color,
    king: Option<Square>,
    danger: Bitboard,
    check: CheckConstraint,
    pinned: Bitboard,
    kings: Bitboard,
    captures_only: bool,
}

impl GenContext {
    fn new(pos: &Position, captures_only: bool) -> Self {
        let color = pos.turn();
        let mut kings = Bitboard::EMPTY;
        for c in Color::ALL {
            kings |= pos.pieces(c, Piece::King);
        }
        GenContext {
            color,
            king: pos.king_square(color),
            danger: danger_squares(pos, color),
            check: check_constraint(pos, color),
            pinned: pos.pinned_mask(),
            kings,
            captures_only,
        }
    }

    /// Mask a non-king piece's targets by the pin line and the check
    /// constraint.
    fn constrain(&self, from: Square, targets: Bitboard) -> Bitboard {
        let mut t = targets;
        if self.check.checkers > 0 {
            t &= self.check.mask;
        }
        if self.pinned.contains(from)
            && let Some(king) = self.king
        {
            t &= pin_line(king, from);
        }
        t
    }
}

/// All legal moves for the side to move.
pub fn generate_legal(pos: &Position, moves: &mut impl MoveBuffer) {
    moves.clear();
    let ctx = GenContext::new(pos, false);
    generate_into(pos, &ctx, moves);
}

/// Legal captures (en passant and promotion-captures included), for
/// quiescence.
pub fn generate_legal_captures(pos: &Position, moves: &mut impl MoveBuffer) {
    moves.clear();
    let ctx = GenContext::new(pos, true);
    generate_into(pos, &ctx, moves);
}

/// Legal moves for the single piece on `sq`, which must belong to the
/// side to move. Ownership and turn checks are the state machine's job.
pub fn generate_legal_for_square(pos: &Position, sq: Square, moves: &mut impl MoveBuffer) {
    moves.clear();
    let Some((color, piece)) = pos.piece_at(sq) else {
        return;
    };
    if color != pos.turn() {
        return;
    }
    let ctx = GenContext::new(pos, false);
    generate_piece(pos, &ctx, sq, piece, moves);
}

/// Is this exact action (from, to, promotion) legal right now?
pub fn is_legal(pos: &Position, mv: &Move) -> bool {
    let mut buf: Vec<Move> = Vec::with_capacity(32);
    generate_legal_for_square(pos, mv.from, &mut buf);
    buf.iter().any(|m| m.same_action(mv))
}

fn generate_into(pos: &Position, ctx: &GenContext, moves: &mut impl MoveBuffer) {
    for piece in Piece::ALL {
        for from in pos.pieces(ctx.color, piece) {
            generate_piece(pos, ctx, from, piece, moves);
        }
    }
}

fn generate_piece(
    pos: &Position,
    ctx: &GenContext,
    from: Square,
    piece: Piece,
    moves: &mut impl MoveBuffer,
) {
    match piece {
        Piece::Pawn => generate_pawn(pos, ctx, from, moves),
        Piece::King => generate_king(pos, ctx, from, moves),
        _ => generate_piece_moves(pos, ctx, from, piece, moves),
    }
}

fn generate_piece_moves(
    pos: &Position,
    ctx: &GenContext,
    from: Square,
    piece: Piece,
    moves: &mut impl MoveBuffer,
) {
    let own = pos.occupancy(ctx.color);
    let enemy = pos.occupied() ^ own;
    let mut targets = attacks_from(piece, ctx.color, from, pos.occupied()) & !own & !ctx.kings;
    targets = ctx.constrain(from, targets);
    if ctx.captures_only {
        targets &= enemy;
    }
    for to in targets {
        let flags = if enemy.contains(to) { CAPTURE } else { QUIET_MOVE };
        moves.push(Move {
            from,
            to,
            piece,
            promotion: None,
            flags,
        });
    }
}

fn generate_king(pos: &Position, ctx: &GenContext, from: Square, moves: &mut impl MoveBuffer) {
    let own = pos.occupancy(ctx.color);
    let enemy = pos.occupied() ^ own;
    let t = tables();

    let mut targets =
        t.king[from.index() as usize] & !own & !ctx.kings & ctx.danger.complement();
    if ctx.captures_only {
        targets &= enemy;
    }
    for to in targets {
        let flags = if enemy.contains(to) { CAPTURE } else { QUIET_MOVE };
        moves.push(Move {
            from,
            to,
            piece: Piece::King,
            promotion: None,
            flags,
        });
    }

    if ctx.captures_only || ctx.check.checkers > 0 {
        return;
    }
    for side in CastleSide::BOTH {
        if !pos.castle_bits().can_castle(ctx.color, side) {
            continue;
        }
        let geom = castle_geometry(ctx.color, side);
        if geom.king_from != from {
            continue;
        }
        // The rook must actually still stand on its home square.
        if !pos.pieces(ctx.color, Piece::Rook).contains(geom.rook_from) {
            continue;
        }
        if geom.between().any(|sq| pos.occupied().contains(sq)) {
            continue;
        }
        if geom.king_path().any(|sq| ctx.danger.contains(sq)) {
            continue;
        }
        let flags = match side {
            CastleSide::Kingside => KINGSIDE_CASTLE,
            CastleSide::Queenside => QUEENSIDE_CASTLE,
        };
        moves.push(Move {
            from,
            to: geom.king_to,
            piece: Piece::King,
            promotion: None,
            flags,
        });
    }
}

fn push_pawn_move(
    ctx: &GenContext,
    from: Square,
    to: Square,
    base_flags: u8,
    moves: &mut impl MoveBuffer,
) {
    let promo_zone = tables().promotion[ctx.color as usize];
    if promo_zone.contains(to) {
        let flags = if base_flags == CAPTURE {
            PROMOTION_CAPTURE
        } else {
            PROMOTION
        };
        for promo in PROMOS {
            moves.push(Move {
                from,
                to,
                piece: Piece::Pawn,
                promotion: Some(promo),
                flags,
            });
        }
    } else {
        moves.push(Move {
            from,
            to,
            piece: Piece::Pawn,
            promotion: None,
            flags: base_flags,
        });
    }
}

fn generate_pawn(pos: &Position, ctx: &GenContext, from: Square, moves: &mut impl MoveBuffer) {
    let t = tables();
    let color = ctx.color;
    let (fr, fc) = color.forward();
    let own = pos.occupancy(color);
    let enemy = pos.occupied() ^ own;
    let empty = pos.occupied().complement();

    if !ctx.captures_only {
        // Single push, and the double push from the home line.
        if let Some(one) = from.offset(fr, fc)
            && one.is_playable()
            && empty.contains(one)
        {
            if ctx.constrain(from, Bitboard::single(one)).any() {
                push_pawn_move(ctx, from, one, QUIET_MOVE, moves);
            }
            if t.pawn_home[color as usize].contains(from)
                && let Some(two) = one.offset(fr, fc)
                && two.is_playable()
                && empty.contains(two)
                && ctx.constrain(from, Bitboard::single(two)).any()
            {
                moves.push(Move {
                    from,
                    to: two,
                    piece: Piece::Pawn,
                    promotion: None,
                    flags: DOUBLE_PAWN_PUSH,
                });
            }
        }
    }

    // Diagonal captures of any other color's pieces, kings excepted.
    let attack_set = t.pawn_attacks[color as usize][from.index() as usize];
    let captures = ctx.constrain(from, attack_set & enemy & !ctx.kings);
    for to in captures {
        push_pawn_move(ctx, from, to, CAPTURE, moves);
    }

    // En passant against windows other colors opened. The pin and check
    // masks cannot see the vacated pawn square, so each candidate is
    // verified against a hypothetical board instead.
    for ep in pos.ep_targets() {
        if ep.creator == color || !attack_set.contains(ep.square) {
            continue;
        }
        let (cfr, cfc) = ep.creator.forward();
        let Some(victim_sq) = ep.square.offset(cfr, cfc) else {
            continue;
        };
        if !pos.pieces(ep.creator, Piece::Pawn).contains(victim_sq) {
            continue;
        }
        if ep_capture_is_safe(pos, color, from, ep.square, ep.creator, victim_sq) {
            moves.push(Move {
                from,
                to: ep.square,
                piece: Piece::Pawn,
                promotion: None,
                flags: EN_PASSANT,
            });
        }
    }
}

/// Hypothetical-check test for en passant: remove both pawns, drop ours
/// on the skipped square, and ask whether our king is attacked.
fn ep_capture_is_safe(
    pos: &Position,
    color: Color,
    from: Square,
    to: Square,
    victim_color: Color,
    victim_sq: Square,
) -> bool {
    let mut sim = pos.clone();
    sim.remove(color, Piece::Pawn, from);
    sim.remove(victim_color, Piece::Pawn, victim_sq);
    sim.place(color, Piece::Pawn, to);
    !in_check_now(&sim, color)
}
