//! End-to-end scenarios: rules interacting with the search through the
//! public API, the way the protocol adapter drives it.

use jungle_engine::ai::search::{Score, SearchLimits, Searcher};
use jungle_engine::engine::board::Position;
use jungle_engine::engine::movegen::generate_all;
use jungle_engine::engine::types::{Color, GameStatus, Move, Piece, Rank, Square};

fn mv(text: &str) -> Move {
    Move::from_text(text).unwrap()
}

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

fn best_move(fen: &str, depth: u32) -> (Option<Move>, Score) {
    let mut pos = Position::from_fen(fen).unwrap();
    let mut searcher = Searcher::new(8);
    let mut last_score = Score::Cp(0);
    let limits = SearchLimits {
        depth,
        infinite: true,
        ..Default::default()
    };
    let best = searcher.think(&mut pos, &limits, &mut |info| last_score = info.score);
    (best, last_score)
}

// =====================================================================
// Elephant advance and hash round trip
// =====================================================================

#[test]
fn elephant_advance_round_trips() {
    let mut pos = Position::starting();
    let hash0 = pos.hash;
    pos.make(mv("a3a4"));
    assert_eq!(
        pos.piece_at(sq("a4")),
        Some(Piece::new(Color::Light, Rank::Elephant))
    );
    assert_ne!(pos.hash, hash0);
    pos.unmake();
    assert_eq!(pos.hash, hash0);
    assert_eq!(
        pos.piece_at(sq("a3")),
        Some(Piece::new(Color::Light, Rank::Elephant))
    );
}

// =====================================================================
// Rat / elephant / water interactions
// =====================================================================

#[test]
fn rat_in_water_cannot_take_elephant_ashore() {
    // Rat swimming at b5; dark elephant on land at a5.
    let pos = Position::from_fen("7/7/7/7/eR5/7/7/7/6t w").unwrap();
    let moves = generate_all(&pos);
    assert!(!moves.contains(&mv("b5a5")), "cross-terrain capture must be barred");
}

#[test]
fn rat_ashore_takes_elephant() {
    let pos = Position::from_fen("7/7/7/7/7/R6/e6/7/6t w").unwrap();
    assert!(generate_all(&pos).contains(&mv("a4a3")));
}

#[test]
fn search_lets_the_rat_eat_the_elephant() {
    let (best, _) = best_move("7/7/7/7/7/R6/e5d/7/6t w", 4);
    assert_eq!(best, Some(mv("a4a3")));
}

// =====================================================================
// Lion jumps and rat blockage
// =====================================================================

#[test]
fn lion_jump_blocked_by_rat() {
    let with_rat = Position::from_fen("7/7/7/7/7/Lr5/7/7/6t w").unwrap();
    assert!(!generate_all(&with_rat).contains(&mv("a4d4")));

    let clear = Position::from_fen("7/7/7/7/7/L6/7/7/6t w").unwrap();
    assert!(generate_all(&clear).contains(&mv("a4d4")));
}

// =====================================================================
// Trap neutralization
// =====================================================================

#[test]
fn rat_takes_lion_on_our_trap() {
    // Dark lion on the light trap d2, light rat on d3.
    let pos = Position::from_fen("6t/7/7/7/7/7/3R3/3l3/7 w").unwrap();
    assert!(generate_all(&pos).contains(&mv("d3d2")));
}

// =====================================================================
// Terminal by den entry
// =====================================================================

#[test]
fn den_entry_is_mate() {
    let (best, score) = best_move("7/3C3/7/7/7/7/7/7/t6 w", 3);
    assert_eq!(best, Some(mv("d8d9")));
    assert_eq!(score, Score::Mate(1));

    let mut pos = Position::from_fen("7/3C3/7/7/7/7/7/7/t6 w").unwrap();
    pos.make(mv("d8d9"));
    assert_eq!(pos.game_status(), GameStatus::SideToMoveLost);
}

#[test]
fn defender_blocks_or_loses() {
    // The light wolf stands beside the dark den and dark has nothing to
    // interpose; dark sees the loss coming.
    let (_, score) = best_move("7/3W3/7/7/7/7/7/7/c6 b", 4);
    match score {
        Score::Mate(n) => assert!(n < 0),
        Score::Cp(cp) => panic!("expected a mate score, got cp {cp}"),
    }
}

// =====================================================================
// Search respects material: winning a piece beats shuffling
// =====================================================================

#[test]
fn search_takes_a_free_piece() {
    // Light tiger on d4 beside an undefended dark cat on d5.
    let (best, _) = best_move("7/7/7/7/3c3/3T3/7/7/r6 w", 4);
    assert_eq!(best, Some(mv("d4d5")));
}

// =====================================================================
// Fifty-move-style clock
// =====================================================================

#[test]
fn halfmove_clock_counts_quiet_plies() {
    let mut pos = Position::starting();
    pos.make(mv("a3a4"));
    pos.make(mv("a7a6"));
    assert_eq!(pos.halfmove, 2);
}
