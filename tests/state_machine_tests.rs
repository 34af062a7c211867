mod common;

use common::{custom_game, ffa_game, sq};
use crosschess::board::{Color, Piece};
use crosschess::error::GameError;
use crosschess::game::{EliminationReason, GameEvent, GameStatus, Outcome};
use std::sync::{Arc, Mutex};

/// A queen raid lands a long-range check on Green; Green's answers are
/// confined to blocking the line, capturing the checker, or stepping
/// the king out of the attack.
#[test]
fn check_constrains_replies_to_block_capture_or_flee() {
    let pieces: Vec<(&str, &[(u8, u8)])> = vec![
        ("rK", &[(13, 7)][..]),
        ("bK", &[(7, 0)][..]),
        ("yK", &[(0, 7)][..]),
        ("gK", &[(7, 13)][..]),
        ("rQ", &[(7, 4)][..]),
        // Shields Blue from the same queen so only Green is in check.
        ("bP", &[(7, 2)][..]),
        ("gR", &[(3, 10)][..]),
        ("gN", &[(9, 5)][..]),
    ];
    let game = custom_game(&pieces, 'g');
    let pos = game.position();
    pos.validate().unwrap();
    assert!(pos.in_check(Color::Green));
    assert!(!pos.in_check(Color::Blue));

    let moves = game.legal_moves();
    assert!(!moves.is_empty());
    // Capture the queen with the knight, block with the rook, or move
    // the king; nothing else appears.
    assert!(moves.iter().any(|m| m.to == sq(7, 4) && m.is_capture()));
    assert!(moves.iter().any(|m| m.to == sq(7, 10) && m.piece == Piece::Rook));
    assert!(moves.iter().any(|m| m.piece == Piece::King));
    for mv in &moves {
        let resolves = mv.piece == Piece::King
            || mv.to == sq(7, 4)
            || (mv.to.row() == 7 && (5..=12).contains(&mv.to.col()));
        assert!(resolves, "{mv} does not address the check");
        // And indeed no reply leaves Green in check.
        let mut probe = pos.clone();
        crosschess::moves::execute::make_move(&mut probe, *mv);
        assert!(!probe.in_check(Color::Green));
    }
}

/// S4: a checkmate eliminates the victim, awards the +20 bounty, skips
/// the turn past the victim, and freezes the victim's pieces for
/// display.
#[test]
fn checkmate_eliminates_scores_and_freezes() {
    // Yellow sits boxed behind its own pawns; Red mates on the back
    // rank. Blue and Green are far away bystanders.
    let pieces: Vec<(&str, &[(u8, u8)])> = vec![
        ("rK", &[(13, 7)][..]),
        ("bK", &[(7, 0)][..]),
        ("gK", &[(7, 13)][..]),
        ("yK", &[(0, 7)][..]),
        ("yP", &[(1, 6), (1, 7), (1, 8)][..]),
        ("rR", &[(4, 3)][..]),
    ];
    let mut game = custom_game(&pieces, 'r');
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    game.set_sink(Box::new(move |ev| sink.lock().unwrap().push(ev)));

    // Rook to the back rank: check. Yellow cannot move (pawns push the
    // wrong way, king is boxed), but Yellow is only eliminated when its
    // turn arrives, after Blue.
    game.make_move(sq(4, 3), sq(0, 3), None, 100).unwrap();
    assert!(game.position().in_check(Color::Yellow));
    assert!(game.position().is_active(Color::Yellow));

    // Blue shuffles; Yellow's turn arrives with no reply: elimination.
    let mv = game.legal_moves()[0];
    game.make_move(mv.from, mv.to, mv.promotion, 200).unwrap();

    let pos = game.position();
    assert!(!pos.is_active(Color::Yellow));
    assert_eq!(
        game.eliminations(),
        &[(Color::Yellow, EliminationReason::Checkmate)]
    );
    // The bounty goes to Red, whose rook delivered the standing check,
    // not to Blue whose shuffle merely preceded the elimination.
    assert_eq!(game.score(Color::Red), 20);
    assert_eq!(game.score(Color::Blue), 0);
    // Yellow's pieces left the live boards but stay frozen for display.
    assert!(pos.pieces(Color::Yellow, Piece::King).is_empty());
    assert!(pos.eliminated_pieces(Color::Yellow, Piece::King).contains(sq(0, 7)));
    assert_eq!(pos.eliminated_pieces(Color::Yellow, Piece::Pawn).count(), 3);
    // Turn skipped past Yellow to Green.
    assert_eq!(pos.turn(), Color::Green);
    assert_eq!(game.status(), GameStatus::Active);
    pos.validate().unwrap();

    let seen = events.lock().unwrap();
    assert!(seen.iter().any(|e| matches!(
        e,
        GameEvent::Eliminated {
            color: Color::Yellow,
            reason: EliminationReason::Checkmate
        }
    )));
}

/// S5: a stalemated player is eliminated alone; the rest play on and no
/// winner is declared yet.
#[test]
fn stalemate_eliminates_only_the_stuck_player() {
    // Blue has just a king, wedged so that every step is covered, but
    // not in check. Red corks the position; Blue is removed, the other
    // three continue.
    let pieces: Vec<(&str, &[(u8, u8)])> = vec![
        ("rK", &[(13, 7)][..]),
        ("yK", &[(0, 7)][..]),
        ("gK", &[(7, 13)][..]),
        ("bK", &[(3, 0)][..]),
        // Red rooks cover Blue's row 4 and column 1 without checking.
        ("rR", &[(4, 10), (10, 1)][..]),
        // Red pawn gives Red a quiet move to trigger the sweep.
        ("rP", &[(12, 7)][..]),
    ];
    let mut game = custom_game(&pieces, 'r');
    {
        // Sanity: Blue currently has no legal move and is not in check.
        let pos = game.position();
        assert!(!pos.in_check(Color::Blue));
    }
    game.make_move(sq(12, 7), sq(11, 7), None, 50).unwrap();

    assert!(!game.position().is_active(Color::Blue));
    assert_eq!(
        game.eliminations(),
        &[(Color::Blue, EliminationReason::Stalemate)]
    );
    // No bounty for stalemate.
    assert_eq!(game.score(Color::Red), 0);
    assert_eq!(game.status(), GameStatus::Active);
    assert_eq!(game.outcome(), None);
    assert_eq!(game.position().turn(), Color::Yellow);
}

#[test]
fn version_and_history_advance_in_lockstep() {
    let mut game = ffa_game();
    let mut expected = 0;
    let script = [
        ((12, 7), (10, 7)),
        ((4, 1), (4, 3)),
        ((1, 6), (3, 6)),
        ((9, 12), (9, 10)),
    ];
    for &((fr, fc), (tr, tc)) in &script {
        expected += 1;
        game.make_move(sq(fr, fc), sq(tr, tc), None, expected * 10).unwrap();
        assert_eq!(game.position().version(), expected);
        assert_eq!(game.history().len(), expected as usize);
    }
    // History snapshots are frozen; the third entry still shows the
    // position as of move three.
    let snap = &game.history()[2];
    assert_eq!(snap.position.version(), 3);
    assert_eq!(snap.record.color, Color::Yellow);
    // The live position is unaffected by reading history.
    assert_eq!(game.position().version(), 4);
}

#[test]
fn finished_game_rejects_further_play() {
    let mut game = ffa_game();
    game.resign(Color::Blue, 1);
    game.resign(Color::Yellow, 2);
    game.resign(Color::Green, 3);
    assert_eq!(game.status(), GameStatus::Finished);
    assert_eq!(game.outcome(), Some(Outcome::Winner(Color::Red)));
    let err = game.make_move(sq(12, 7), sq(11, 7), None, 4);
    assert!(matches!(err, Err(GameError::GameOver { .. })));
    // Resigning a finished game stays a no-op.
    game.resign(Color::Red, 5);
    assert_eq!(game.eliminations().len(), 3);
}

#[test]
fn no_such_piece_and_not_your_turn_are_distinct() {
    let mut game = ffa_game();
    assert!(matches!(
        game.make_move(sq(7, 7), sq(7, 8), None, 0),
        Err(GameError::NoSuchPiece { .. })
    ));
    assert!(matches!(
        game.make_move(sq(4, 1), sq(4, 2), None, 0),
        Err(GameError::NotYourTurn { .. })
    ));
}

#[test]
fn self_check_is_never_reachable() {
    // Drive a few hundred random-ish games forward and confirm the
    // mover is never left in check after its own move.
    let mut game = ffa_game();
    for step in 0..200u64 {
        if game.status() != GameStatus::Active {
            break;
        }
        let moves = game.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[step as usize * 7 % moves.len()];
        let mover = game.position().turn();
        game.make_move(mv.from, mv.to, mv.promotion, step * 100).unwrap();
        assert!(!game.position().in_check(mover), "self-check after {mv}");
        game.position().validate().unwrap();
    }
}
