mod common;

use common::{custom_game, ffa_game, kings, sq};
use crosschess::board::{Color, Piece};

#[test]
fn window_opens_on_double_push_and_yellow_captures() {
    // Red double-pushes; Yellow holds a pawn that can take en passant
    // two turns later, inside the window.
    let mut pieces = kings();
    pieces.push(("rP", &[(12, 5)][..]));
    pieces.push(("yP", &[(10, 4)][..]));
    let mut game = custom_game(&pieces, 'r');

    game.make_move(sq(12, 5), sq(10, 5), None, 0).unwrap();
    let ep = game.position().ep_targets();
    assert_eq!(ep.len(), 1);
    assert_eq!(ep[0].square, sq(11, 5));
    assert_eq!(ep[0].creator, Color::Red);

    // Blue king shuffles; the window stays open for Yellow.
    let mv = game.legal_moves()[0];
    game.make_move(mv.from, mv.to, mv.promotion, 1).unwrap();
    assert_eq!(game.position().ep_targets().len(), 1);

    // Yellow captures on the skipped square; the victim pawn vanishes
    // from its own square.
    let moves = game.selectable_moves(sq(10, 4)).unwrap();
    let ep_mv = moves
        .iter()
        .find(|m| m.is_en_passant())
        .expect("en-passant capture must be offered");
    assert_eq!(ep_mv.to, sq(11, 5));
    game.make_move(ep_mv.from, ep_mv.to, None, 2).unwrap();
    assert!(game.position().pieces(Color::Red, Piece::Pawn).is_empty());
    assert!(game.position().pieces(Color::Yellow, Piece::Pawn).contains(sq(11, 5)));
    assert_eq!(game.captured_pieces(Color::Yellow), &[(Color::Red, Piece::Pawn)]);
    assert_eq!(game.score(Color::Yellow), 1);
    assert!(game.position().ep_targets().is_empty());
    game.position().validate().unwrap();
}

#[test]
fn window_closes_when_the_creators_turn_returns() {
    let mut pieces = kings();
    pieces.push(("rP", &[(12, 5)][..]));
    pieces.push(("yP", &[(10, 4)][..]));
    let mut game = custom_game(&pieces, 'r');
    game.make_move(sq(12, 5), sq(10, 5), None, 0).unwrap();

    // Blue, Yellow and Green all decline; Red's next turn closes it.
    for _ in 0..3 {
        let mv = game
            .legal_moves()
            .into_iter()
            .find(|m| !m.is_en_passant())
            .expect("a quiet reply");
        game.make_move(mv.from, mv.to, mv.promotion, 1).unwrap();
    }
    assert_eq!(game.position().turn(), Color::Red);
    assert!(game.position().ep_targets().is_empty());
    // The missed capture is gone from Yellow's options for good.
    game.position().validate().unwrap();
}

#[test]
fn multiple_windows_coexist() {
    let mut game = ffa_game();
    game.make_move(sq(12, 7), sq(10, 7), None, 0).unwrap();
    game.make_move(sq(4, 1), sq(4, 3), None, 1).unwrap();
    game.make_move(sq(1, 7), sq(3, 7), None, 2).unwrap();
    assert_eq!(game.position().ep_targets().len(), 3);
    game.make_move(sq(4, 12), sq(4, 10), None, 3).unwrap();
    // Red's turn begins: only Red's own window expired.
    assert_eq!(game.position().turn(), Color::Red);
    let creators: Vec<Color> = game
        .position()
        .ep_targets()
        .iter()
        .map(|t| t.creator)
        .collect();
    assert_eq!(creators, vec![Color::Blue, Color::Yellow, Color::Green]);
}

#[test]
fn en_passant_refused_when_it_exposes_the_king() {
    // Yellow's capturing pawn and the double-pushed Red pawn are the
    // only blockers between a Red rook and the Yellow king along row
    // 10; taking en passant clears both off the row at once.
    let pieces: Vec<(&str, &[(u8, u8)])> = vec![
        ("rK", &[(13, 7)][..]),
        ("bK", &[(7, 0)][..]),
        ("gK", &[(7, 13)][..]),
        ("yK", &[(10, 2)][..]),
        ("yP", &[(10, 4)][..]),
        ("rP", &[(12, 5)][..]),
        ("rR", &[(10, 11)][..]),
    ];
    let mut game = custom_game(&pieces, 'r');
    game.make_move(sq(12, 5), sq(10, 5), None, 0).unwrap();

    // Blue passes with a king step.
    let mv = game.legal_moves()[0];
    game.make_move(mv.from, mv.to, mv.promotion, 1).unwrap();

    // Now Yellow: the en-passant capture (10,4)x(11,5) would leave the
    // rook staring straight at the king once both pawns leave row 10.
    let moves = game.selectable_moves(sq(10, 4)).unwrap();
    assert!(
        moves.iter().all(|m| !m.is_en_passant()),
        "discovered check through en passant must be vetoed"
    );
}

#[test]
fn en_passant_allowed_when_the_row_stays_guarded() {
    // Same shape, but the rook's line is blocked by another piece, so
    // the capture is fine.
    let pieces: Vec<(&str, &[(u8, u8)])> = vec![
        ("rK", &[(13, 7)][..]),
        ("bK", &[(7, 0)][..]),
        ("gK", &[(7, 13)][..]),
        ("yK", &[(10, 2)][..]),
        ("yP", &[(10, 4)][..]),
        ("yN", &[(10, 8)][..]),
        ("rP", &[(12, 5)][..]),
        ("rR", &[(10, 11)][..]),
    ];
    let mut game = custom_game(&pieces, 'r');
    game.make_move(sq(12, 5), sq(10, 5), None, 0).unwrap();
    let mv = game.legal_moves()[0];
    game.make_move(mv.from, mv.to, mv.promotion, 1).unwrap();

    let moves = game.selectable_moves(sq(10, 4)).unwrap();
    assert!(moves.iter().any(|m| m.is_en_passant()));
}

#[test]
fn own_window_is_never_a_target() {
    // The creator cannot capture en passant against itself; only the
    // other three colors see the window.
    let mut game = ffa_game();
    game.make_move(sq(12, 7), sq(10, 7), None, 0).unwrap();
    // Force the turn back around to Red with quiet replies.
    for _ in 0..3 {
        let mv = game
            .legal_moves()
            .into_iter()
            .find(|m| !m.is_en_passant() && !m.is_double_pawn_push())
            .unwrap();
        game.make_move(mv.from, mv.to, mv.promotion, 1).unwrap();
    }
    // Window already expired at Red's turn; nothing to check beyond
    // the legal list never containing a Red en-passant on it.
    assert!(game.legal_moves().iter().all(|m| !m.is_en_passant()));
}
