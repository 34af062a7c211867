mod common;

use common::ffa_game;
use crosschess::board::{Color, Piece};
use crosschess::game::{GameStatus, PromotionMode, WireGame};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Invariant closure: every reachable position satisfies the full
    /// structural contract, the mover never ends its own turn in check,
    /// kings persist until elimination, and clocks only tick for the
    /// mover.
    #[test]
    fn random_playouts_preserve_all_invariants(
        picks in prop::collection::vec(any::<prop::sample::Index>(), 40)
    ) {
        let mut game = ffa_game();
        let mut now = 0u64;
        for pick in picks {
            if game.status() != GameStatus::Active {
                break;
            }
            let moves = game.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[pick.index(moves.len())];
            let mover = game.position().turn();
            let clocks_before: Vec<i64> =
                Color::ALL.iter().map(|&c| game.clocks().remaining(c)).collect();
            let version_before = game.position().version();
            now += 250;

            game.make_move(mv.from, mv.to, mv.promotion, now).unwrap();

            let pos = game.position();
            prop_assert!(pos.validate().is_ok(), "{:?}", pos.validate());
            prop_assert!(!pos.in_check(mover), "self-check after {mv}");
            prop_assert!(pos.version() > version_before);

            for color in Color::ALL {
                // Kings persist until elimination; afterwards they move
                // to the frozen boards.
                if pos.is_active(color) {
                    prop_assert_eq!(pos.pieces(color, Piece::King).count(), 1);
                } else {
                    prop_assert_eq!(pos.pieces(color, Piece::King).count(), 0);
                    prop_assert_eq!(pos.eliminated_pieces(color, Piece::King).count(), 1);
                }
                // Clock monotonicity: only the mover's clock changed,
                // and by no more than the increment minus time spent.
                let delta = game.clocks().remaining(color) - clocks_before[color as usize];
                if color == mover {
                    prop_assert!(
                        delta <= game.clocks().control.increment_ms as i64,
                        "mover gained {delta}ms"
                    );
                } else {
                    prop_assert_eq!(delta, 0, "off-turn clock moved");
                }
            }

            // En-passant windows always belong to live colors and never
            // outlive their creator's next turn.
            for t in pos.ep_targets() {
                prop_assert!(pos.is_active(t.creator));
                prop_assert!(t.creator != pos.turn());
            }
        }
    }

    /// The wire round trip is lossless for every reachable position.
    #[test]
    fn random_positions_survive_the_wire(
        picks in prop::collection::vec(any::<prop::sample::Index>(), 12)
    ) {
        let mut game = ffa_game();
        let mut now = 0u64;
        for pick in picks {
            if game.status() != GameStatus::Active {
                break;
            }
            let moves = game.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[pick.index(moves.len())];
            now += 100;
            game.make_move(mv.from, mv.to, mv.promotion, now).unwrap();
        }

        let wire = WireGame::from_game(&game);
        let rebuilt = wire.into_game(PromotionMode::Synchronous).unwrap();
        prop_assert_eq!(rebuilt.position(), game.position());
        prop_assert_eq!(rebuilt.scores(), game.scores());
        prop_assert_eq!(rebuilt.eliminations(), game.eliminations());
    }
}
