//! Perft — exhaustive move-generation correctness suite.
//!
//! Each test verifies that the number of leaf nodes at a given depth matches
//! a pinned value. If perft is wrong at any depth, there is a bug in move
//! generation, make/unmake, or terminal detection.

use jungle_engine::engine::board::Position;
use jungle_engine::engine::movegen::{generate_all, perft};
use jungle_engine::engine::types::Move;

// =====================================================================
// Starting position
// =====================================================================

#[test]
fn perft_start_depth_1() {
    // Each side opens with 24 moves: every piece has its orthogonal steps
    // minus blocked/water/den squares, and only the rat may face water.
    assert_eq!(perft(&mut Position::starting(), 1), 24);
}

#[test]
fn perft_start_depth_2() {
    // The armies cannot interact yet, so depth 2 is 24 * 24.
    assert_eq!(perft(&mut Position::starting(), 2), 576);
}

#[test]
fn perft_start_depth_3() {
    assert_eq!(perft(&mut Position::starting(), 3), 12_240);
}

#[test]
fn perft_depth_2_decomposes_over_first_moves() {
    // Sum of child perft(1) values must equal perft(2).
    let mut pos = Position::starting();
    let mut total = 0u64;
    for mv in generate_all(&pos) {
        pos.make(mv);
        total += perft(&mut pos, 1);
        pos.unmake();
    }
    assert_eq!(total, 576);
}

// =====================================================================
// Positions with tactics in range
// =====================================================================

fn from_fen(fen: &str) -> Position {
    Position::from_fen(fen).expect("test FEN is valid")
}

#[test]
fn perft_rat_elephant_standoff() {
    // Light rat a4 beside the dark elephant a3; dark dog g3, dark tiger g1.
    let mut pos = from_fen("7/7/7/7/7/R6/e5d/7/6t w");
    // Light rat: a5, b4 (water), and the elephant capture a3.
    assert_eq!(perft(&mut pos, 1), 3);
}

#[test]
fn perft_terminal_position_has_no_leaves() {
    // Dark cat already in the light den.
    let mut pos = from_fen("7/7/7/7/7/7/7/7/3c2T w");
    assert_eq!(perft(&mut pos, 1), 0);
    assert_eq!(perft(&mut pos, 4), 0);
}

#[test]
fn perft_den_entry_prunes_subtree() {
    // Light cat beside the dark den, lone dark tiger far away: after d8d9
    // the game is over, so that branch contributes nothing at depth 2.
    let mut pos = from_fen("7/3C3/7/7/7/7/7/7/t6 w");
    let d1 = perft(&mut pos, 1);
    let d2 = perft(&mut pos, 2);
    // All first moves are counted at depth 1...
    assert!(d1 > 0);
    // ...but at depth 2 the den-entry child is terminal and adds nothing.
    let mut non_terminal_replies = 0u64;
    for mv in generate_all(&Position::from_fen("7/3C3/7/7/7/7/7/7/t6 w").unwrap()) {
        let mut child = Position::from_fen("7/3C3/7/7/7/7/7/7/t6 w").unwrap();
        child.make(mv);
        non_terminal_replies += perft(&mut child, 1);
    }
    assert_eq!(d2, non_terminal_replies);
    let den_entry = Move::from_text("d8d9").unwrap();
    let mut after = from_fen("7/3C3/7/7/7/7/7/7/t6 w");
    after.make(den_entry);
    assert_eq!(perft(&mut after, 1), 0);
}

// =====================================================================
// Make/unmake stability under deep traversal
// =====================================================================

#[test]
fn perft_traversal_restores_position() {
    let mut pos = Position::starting();
    let fen = pos.to_fen();
    let hash = pos.hash;
    perft(&mut pos, 3);
    assert_eq!(pos.to_fen(), fen);
    assert_eq!(pos.hash, hash);
}
