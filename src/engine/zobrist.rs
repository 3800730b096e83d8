//! Zobrist hashing for incremental position identification.
//!
//! Each (color, rank, square) placement gets a random 64-bit key, plus one
//! key XORed in when Dark is to move. The position hash is the XOR of all
//! applicable keys, which makes make/unmake updates O(1).

use crate::engine::types::{Color, Rank, Square};

// ---------------------------------------------------------------------------
// ZobristKeys — immutable singleton
// ---------------------------------------------------------------------------

/// Pre-computed Zobrist random keys (generated once via `OnceLock`).
pub struct ZobristKeys {
    /// piece\[color\]\[rank\]\[square\] — key for a piece on a square.
    pub piece: [[[u64; Square::NUM]; Rank::COUNT]; 2],
    /// XOR this when it is Dark's turn to move.
    pub side_to_move: u64,
}

/// Static singleton holding the Zobrist keys (initialised once).
static ZOBRIST: std::sync::OnceLock<ZobristKeys> = std::sync::OnceLock::new();

/// Get a reference to the global Zobrist keys.
pub fn keys() -> &'static ZobristKeys {
    ZOBRIST.get_or_init(ZobristKeys::init)
}

impl ZobristKeys {
    /// Generate all keys from a fixed-seed PRNG so hashes are reproducible
    /// across runs and in tests.
    fn init() -> Self {
        let mut rng = Xorshift64::new(0xDEAD_BEEF_42);

        let mut piece = [[[0u64; Square::NUM]; Rank::COUNT]; 2];
        for color in &mut piece {
            for rank in color {
                for sq in rank {
                    *sq = rng.next_u64();
                }
            }
        }

        let side_to_move = rng.next_u64();

        ZobristKeys {
            piece,
            side_to_move,
        }
    }

    /// Key for a specific piece on a specific square.
    #[inline]
    pub fn piece_key(&self, color: Color, rank: Rank, sq: Square) -> u64 {
        self.piece[color.index()][rank.index()][sq.index()]
    }
}

// ---------------------------------------------------------------------------
// Deterministic PRNG (xorshift64)
// ---------------------------------------------------------------------------

/// Minimal xorshift64 PRNG — deterministic, fast, good distribution.
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        // Xorshift from state zero stays zero.
        Xorshift64 {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
