//! Static position evaluation.
//!
//! Returns a score in centipawns from the side-to-move's viewpoint.
//! Components, summed:
//!   1. Material (per-rank values from `Rank::value`)
//!   2. Piece-square tables (advancement, center files, water bonus for the
//!      rat, jump-launch bonus for lion/tiger, den-approach gradient)
//!   3. Den proximity via the BFS distance tables
//!   4. Trap presence
//!   5. Rat-elephant dynamics
//!   6. Den safety
//!   7. Piece count advantage
//!   8. Endgame den-proximity amplifier
//!
//! Terminal positions are scored by the search, not here.

use crate::engine::board::Position;
use crate::engine::tables::{self, BoardTables};
use crate::engine::types::{Color, Rank, Square};
use std::sync::OnceLock;

/// Infinity sentinel. Larger than any reachable score.
pub const INF: i32 = 30_000;

/// Mate score base. Actual mate scores are `MATE - ply` so nearer mates
/// score higher.
pub const MATE: i32 = 29_000;

/// Recursion bound for the search; mate scores are normalized within it.
pub const MAX_PLY: usize = 128;

/// Is this score a forced win/loss score?
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE - MAX_PLY as i32
}

// =========================================================================
// Piece-square tables
// =========================================================================

/// PST bonus per (rank, square), from Light's perspective; Dark looks the
/// board up through `Square::mirror`.
struct PstTables {
    pst: [[i32; Square::NUM]; Rank::COUNT],
}

fn pst() -> &'static PstTables {
    static PST: OnceLock<PstTables> = OnceLock::new();
    PST.get_or_init(PstTables::init)
}

impl PstTables {
    fn init() -> Self {
        let t = tables::tables();

        // Advancement plus center-file gradient.
        const ROW_BONUS: [i32; 9] = [-5, 0, 5, 15, 25, 35, 55, 85, 120];
        const COL_BONUS: [i32; 7] = [0, 5, 15, 30, 15, 5, 0];

        let mut base = [0i32; Square::NUM];
        for i in 0..Square::NUM as u8 {
            let sq = Square(i);
            if !t.is_water(sq) {
                base[sq.index()] = ROW_BONUS[sq.row() as usize] + COL_BONUS[sq.col() as usize];
            }
        }

        let mut pst = [[0i32; Square::NUM]; Rank::COUNT];
        for rank_tbl in &mut pst {
            *rank_tbl = base;
        }

        // The rat likes water, increasingly so as it advances.
        for i in 0..Square::NUM as u8 {
            let sq = Square(i);
            if t.is_water(sq) {
                pst[Rank::Rat.index()][sq.index()] = 20 + sq.row() as i32 * 5;
            }
        }

        // Lion and tiger like squares they can jump from.
        for edge in &t.jump_edges {
            pst[Rank::Lion.index()][edge.from.index()] += 15;
            pst[Rank::Tiger.index()][edge.from.index()] += 15;
        }

        // Den-approach gradient on top of the plain row bonus.
        for i in 0..Square::NUM as u8 {
            let sq = Square(i);
            if t.is_water(sq) {
                continue;
            }
            let d = t.dist_land(Color::Dark, sq) as i32;
            if d <= 8 {
                let bonus = (130 - d * 15).max(0);
                for rank_tbl in &mut pst {
                    rank_tbl[sq.index()] += bonus;
                }
            }
        }

        PstTables { pst }
    }

    #[inline]
    fn get(&self, rank: Rank, color: Color, sq: Square) -> i32 {
        let oriented = match color {
            Color::Light => sq,
            Color::Dark => sq.mirror(),
        };
        self.pst[rank.index()][oriented.index()]
    }
}

// =========================================================================
// Evaluation
// =========================================================================

/// Evaluate a position from the side-to-move's viewpoint.
pub fn evaluate(pos: &Position) -> i32 {
    let t = tables::tables();
    let p = pst();
    let stm = pos.side_to_move;
    let opp = !stm;

    let mut score = 0i32;

    // ---- Material + PST + den proximity + trap presence ----
    for color in [Color::Light, Color::Dark] {
        let sign = if color == stm { 1 } else { -1 };
        let target_den = !color;
        for rank in Rank::ALL {
            let Some(sq) = pos.piece_square(color, rank) else {
                continue;
            };

            score += sign * rank.value();
            score += sign * p.get(rank, color, sq);
            score += sign * den_proximity_bonus(t, rank, target_den, sq);

            // A piece caught on a trap the enemy owns can be captured by
            // anything; its holder pays a third of its value.
            if t.terrain(sq).trap_owner() == Some(!color) {
                score -= sign * rank.value() / 3;
            }
        }
    }

    // ---- Rat-elephant dynamics ----
    if let (Some(rat), Some(ele)) = (
        pos.piece_square(stm, Rank::Rat),
        pos.piece_square(opp, Rank::Elephant),
    ) {
        let d = rat.manhattan(ele);
        score += 40;
        if d <= 2 {
            score += 60;
        }
        if d == 1 {
            score += 80;
        }
    }
    if let (Some(rat), Some(ele)) = (
        pos.piece_square(opp, Rank::Rat),
        pos.piece_square(stm, Rank::Elephant),
    ) {
        let d = rat.manhattan(ele);
        score -= 30;
        if d <= 2 {
            score -= 40;
        }
        if d == 1 {
            score -= 60;
        }
    }

    // ---- Den safety ----
    let our_den = tables::den_of(stm);
    for rank in Rank::ALL {
        let Some(sq) = pos.piece_square(opp, rank) else {
            continue;
        };
        match sq.manhattan(our_den) {
            0..=1 => score -= 300,
            2 => score -= 100,
            3 => score -= 30,
            _ => {}
        }
    }

    // ---- Piece count advantage ----
    let diff = pos.piece_count(stm) as i32 - pos.piece_count(opp) as i32;
    score += diff * 30;

    // ---- Endgame amplifier: few pieces left, push toward the den ----
    let total = pos.piece_count(Color::Light) + pos.piece_count(Color::Dark);
    if total <= 6 {
        for rank in Rank::ALL {
            let Some(sq) = pos.piece_square(stm, rank) else {
                continue;
            };
            let d = t.dist_to_den(rank, opp, sq) as i32;
            if d <= 3 {
                score += (4 - d) * 80;
            }
        }
    }

    score
}

/// Stepwise bonus for shortest-path distance to the enemy den, using the
/// movement model matching the rank.
#[inline]
fn den_proximity_bonus(t: &BoardTables, rank: Rank, target_den: Color, sq: Square) -> i32 {
    match t.dist_to_den(rank, target_den, sq) {
        0..=1 => 250,
        2 => 120,
        3 => 60,
        4..=5 => 20,
        _ => 0,
    }
}

// =========================================================================
// Tests
// =========================================================================
