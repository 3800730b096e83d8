//! Legal move generation.
//!
//! Jungle Chess has no "check" concept, so every rule is enforced at
//! generation time and the produced moves can be played directly:
//!
//!   1. One-step orthogonal moves for every piece; only the rat may enter
//!      water; no piece may enter its own den.
//!   2. Straight-line river jumps for the lion and tiger, blocked by any
//!      occupied water square on the line (only a rat can be there).
//!   3. The capture rule: no capture across the water/land boundary,
//!      rats capture each other in water, any piece captures a defender on
//!      an attacker-owned trap, the rat kills the elephant (never the other
//!      way around), and otherwise rank decides.

use crate::engine::board::Position;
use crate::engine::tables::{self, Terrain};
use crate::engine::types::{Color, Direction, GameStatus, Move, Rank, Square};

// =========================================================================
// Public API
// =========================================================================

/// Generate all legal moves for the side to move. The enumeration order is
/// deterministic: ranks weakest-first, steps N/S/E/W, then jumps.
pub fn generate_all(pos: &Position) -> Vec<Move> {
    let mut moves = Vec::with_capacity(32);
    let us = pos.side_to_move;
    for rank in Rank::ALL {
        let Some(sq) = pos.piece_square(us, rank) else {
            continue;
        };
        step_moves(pos, sq, rank, us, false, &mut moves);
        if matches!(rank, Rank::Lion | Rank::Tiger) {
            jump_moves(pos, sq, rank, us, false, &mut moves);
        }
    }
    moves
}

/// Generate only the capturing subset of [`generate_all`].
pub fn generate_captures(pos: &Position) -> Vec<Move> {
    let mut moves = Vec::with_capacity(8);
    let us = pos.side_to_move;
    for rank in Rank::ALL {
        let Some(sq) = pos.piece_square(us, rank) else {
            continue;
        };
        step_moves(pos, sq, rank, us, true, &mut moves);
        if matches!(rank, Rank::Lion | Rank::Tiger) {
            jump_moves(pos, sq, rank, us, true, &mut moves);
        }
    }
    moves
}

/// The capture rule for an attacker stepping (or jumping) onto a defender.
pub fn can_capture(
    attacker: Rank,
    defender: Rank,
    attacker_color: Color,
    from: Square,
    to: Square,
) -> bool {
    let t = tables::tables();
    let from_water = t.is_water(from);
    let to_water = t.is_water(to);

    // No captures across the water/land boundary, in either direction.
    if from_water != to_water {
        return false;
    }

    // Both in water: only rats can be there, and they take each other.
    if from_water {
        return true;
    }

    // Defender on a trap we own is reduced to rank 0.
    if t.terrain(to).trap_owner() == Some(attacker_color) {
        return true;
    }

    // The rat kills the elephant; the elephant cannot touch the rat.
    if attacker == Rank::Rat && defender == Rank::Elephant {
        return true;
    }
    if attacker == Rank::Elephant && defender == Rank::Rat {
        return false;
    }

    attacker.strength() >= defender.strength()
}

/// Count leaf nodes of the move tree at `depth`. Game-over positions have
/// no subtree.
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    if pos.game_status() != GameStatus::Ongoing {
        return 0;
    }
    let moves = generate_all(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for mv in moves {
        pos.make(mv);
        nodes += perft(pos, depth - 1);
        pos.unmake();
    }
    nodes
}

// =========================================================================
// Steps and jumps (internal)
// =========================================================================

fn step_moves(
    pos: &Position,
    from: Square,
    rank: Rank,
    us: Color,
    captures_only: bool,
    moves: &mut Vec<Move>,
) {
    let t = tables::tables();
    for dir in Direction::ALL {
        let Some(to) = from.step(dir) else { continue };
        let terrain = t.terrain(to);

        if terrain.den_owner() == Some(us) {
            continue;
        }
        if terrain == Terrain::Water && rank != Rank::Rat {
            continue;
        }

        match pos.piece_at(to) {
            None => {
                if !captures_only {
                    moves.push(Move::new(from, to));
                }
            }
            Some(target) => {
                if target.color != us {
                    if can_capture(rank, target.rank, us, from, to) {
                        moves.push(Move::new(from, to));
                    }
                }
            }
        }
    }
}

fn jump_moves(
    pos: &Position,
    from: Square,
    rank: Rank,
    us: Color,
    captures_only: bool,
    moves: &mut Vec<Move>,
) {
    let t = tables::tables();
    for edge in t.jumps_from(from) {
        if t.terrain(edge.to).den_owner() == Some(us) {
            continue;
        }
        // A rat of either color in the water line blocks the jump.
        if edge.over.iter().any(|&w| pos.piece_at(w).is_some()) {
            continue;
        }

        match pos.piece_at(edge.to) {
            None => {
                if !captures_only {
                    moves.push(Move::new(from, edge.to));
                }
            }
            Some(target) => {
                if target.color != us && can_capture(rank, target.rank, us, from, edge.to) {
                    moves.push(Move::new(from, edge.to));
                }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
