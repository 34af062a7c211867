use std::time::Duration;

use crosschess::board::{Color, Position};
use crosschess::game::{GameMode, GameState, GameStatus, PromotionMode, TimeControl};
use crosschess::logger::init_logging;
use crosschess::moves::perft::{perft_detailed, perft_divide};
use crosschess::search::{BotDecision, CancelToken, SearchLimits, bot_decision};
use indicatif::{ProgressBar, ProgressStyle};

fn main() {
    init_logging("logs/crosschess.log", None);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("perft") => {
            let depth: u32 = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(3);
            run_perft(depth);
        }
        Some("divide") => {
            let depth: u32 = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            run_divide(depth);
        }
        Some("selfplay") => {
            let moves: usize = args
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            run_selfplay(moves);
        }
        _ => {
            eprintln!("usage: crosschess <perft DEPTH | divide DEPTH | selfplay MOVES>");
            std::process::exit(2);
        }
    }
}

fn run_perft(depth: u32) {
    let mut pos = Position::initial();
    let spinner = ProgressBar::new_spinner().with_message(format!("perft depth {depth}"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let counters = perft_detailed(&mut pos, depth);
    spinner.finish_and_clear();
    println!(
        "depth {depth}: nodes {} captures {} ep {} castles {} promotions {} checks {}",
        counters.nodes,
        counters.captures,
        counters.ep_captures,
        counters.castles,
        counters.promotions,
        counters.checks
    );
}

fn run_divide(depth: u32) {
    let mut pos = Position::initial();
    let mut total = 0u64;
    for (mv, nodes) in perft_divide(&mut pos, depth) {
        println!("{mv}: {nodes}");
        total += nodes;
    }
    println!("total: {total}");
}

fn run_selfplay(max_moves: usize) {
    let mut game = GameState::new(
        GameMode::FreeForAll,
        TimeControl::untimed(),
        PromotionMode::Synchronous,
        0,
    );
    let limits = SearchLimits {
        max_depth: 4,
        budget: Duration::from_millis(800),
        quiescence_depth: 6,
        randomize: true,
    };
    let bar = ProgressBar::new(max_moves as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}").expect("progress template"),
    );

    let mut now_ms: u64 = 0;
    for _ in 0..max_moves {
        if game.status() == GameStatus::Finished {
            break;
        }
        now_ms += 1_000;
        let cancel = CancelToken::new();
        match bot_decision(&game, &limits, &cancel) {
            BotDecision::Move(mv) => {
                let color = game.position().turn();
                game.make_move(mv.from, mv.to, mv.promotion, now_ms)
                    .expect("searched move must commit");
                bar.set_message(format!("{:?} played {mv}", color));
            }
            BotDecision::Resign => {
                let color = game.position().turn();
                game.resign(color, now_ms);
                bar.set_message(format!("{:?} resigned", color));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("{}", game.position());
    println!("status: {:?}", game.status());
    for color in Color::ALL {
        println!(
            "{:?}: score {} captures {}",
            color,
            game.score(color),
            game.captured_pieces(color).len()
        );
    }
    if let Some(outcome) = game.outcome() {
        println!("outcome: {outcome:?}");
    }
}
