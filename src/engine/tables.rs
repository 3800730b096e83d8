//! Pre-computed board geometry: terrain classification, river-jump edges for
//! the lion and tiger, and BFS shortest-path-to-den tables for three
//! movement models.
//!
//! All tables are initialised once (via `OnceLock`) and live for the lifetime
//! of the process. Initialisation is idempotent and thread-safe, so any core
//! call may simply go through [`tables()`].

use crate::engine::types::{BOARD_COLS, BOARD_ROWS, Color, Direction, Rank, Square};
use std::collections::VecDeque;
use std::sync::OnceLock;

// =========================================================================
// Public API
// =========================================================================

/// Get a reference to the global geometry tables.
pub fn tables() -> &'static BoardTables {
    static TABLES: OnceLock<BoardTables> = OnceLock::new();
    TABLES.get_or_init(BoardTables::init)
}

/// Light's den (d1).
pub const DEN_LIGHT: Square = Square(3);
/// Dark's den (d9).
pub const DEN_DARK: Square = Square(59);

/// The den square belonging to a color.
#[inline]
pub fn den_of(color: Color) -> Square {
    match color {
        Color::Light => DEN_LIGHT,
        Color::Dark => DEN_DARK,
    }
}

/// Sentinel distance for squares a movement model cannot reach.
pub const UNREACHABLE: u8 = 99;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Static terrain of a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terrain {
    Land,
    Water,
    TrapLight,
    TrapDark,
    DenLight,
    DenDark,
}

impl Terrain {
    /// The color that owns this trap, if it is one.
    #[inline]
    pub fn trap_owner(self) -> Option<Color> {
        match self {
            Terrain::TrapLight => Some(Color::Light),
            Terrain::TrapDark => Some(Color::Dark),
            _ => None,
        }
    }

    /// The color that owns this den, if it is one.
    #[inline]
    pub fn den_owner(self) -> Option<Color> {
        match self {
            Terrain::DenLight => Some(Color::Light),
            Terrain::DenDark => Some(Color::Dark),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Jump edges
// ---------------------------------------------------------------------------

/// One straight-line river jump for the lion or tiger: land square to land
/// square across a full water line. The jump is blocked when any `over`
/// square is occupied (only a rat can be there).
#[derive(Clone, Debug)]
pub struct JumpEdge {
    pub from: Square,
    pub to: Square,
    pub over: Vec<Square>,
}

// ---------------------------------------------------------------------------
// BoardTables
// ---------------------------------------------------------------------------

/// All pre-computed geometry tables.
pub struct BoardTables {
    terrain: [Terrain; Square::NUM],
    is_water: [bool; Square::NUM],
    /// All 20 jump edges.
    pub jump_edges: Vec<JumpEdge>,
    /// Per-square jump edges, owned copies for O(1) iteration.
    sq_jumps: Vec<Vec<JumpEdge>>,
    /// dist_land\[den_color\]\[sq\]: shortest half-moves to the den stepping
    /// on land only.
    dist_land: [[u8; Square::NUM]; 2],
    /// Land steps plus clear-water jumps (lion/tiger model).
    dist_jumper: [[u8; Square::NUM]; 2],
    /// Land plus water steps (rat model).
    dist_swimmer: [[u8; Square::NUM]; 2],
}

impl BoardTables {
    // -------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------

    #[inline]
    pub fn terrain(&self, sq: Square) -> Terrain {
        self.terrain[sq.index()]
    }

    #[inline]
    pub fn is_water(&self, sq: Square) -> bool {
        self.is_water[sq.index()]
    }

    /// Jump edges launching from a square (empty for non-launch squares).
    #[inline]
    pub fn jumps_from(&self, sq: Square) -> &[JumpEdge] {
        &self.sq_jumps[sq.index()]
    }

    /// Shortest distance from `sq` to `den_owner`'s den for a piece of the
    /// given rank (swimmer model for the rat, jumper for lion/tiger, land
    /// for everything else).
    #[inline]
    pub fn dist_to_den(&self, rank: Rank, den_owner: Color, sq: Square) -> u8 {
        let table = match rank {
            Rank::Rat => &self.dist_swimmer,
            Rank::Lion | Rank::Tiger => &self.dist_jumper,
            _ => &self.dist_land,
        };
        table[den_owner.index()][sq.index()]
    }

    /// Raw land-model distance (used by the piece-square table builder).
    #[inline]
    pub fn dist_land(&self, den_owner: Color, sq: Square) -> u8 {
        self.dist_land[den_owner.index()][sq.index()]
    }

    // -------------------------------------------------------------------
    // Initialisation
    // -------------------------------------------------------------------

    fn init() -> Self {
        // ---- Terrain ----
        let mut terrain = [Terrain::Land; Square::NUM];
        let mut is_water = [false; Square::NUM];

        // Two 2x3 water blocks: columns b-c and e-f, rows 4-6.
        for row in 3..=5u8 {
            for col in [1u8, 2, 4, 5] {
                let sq = Square::from_row_col(row, col);
                terrain[sq.index()] = Terrain::Water;
                is_water[sq.index()] = true;
            }
        }

        terrain[DEN_LIGHT.index()] = Terrain::DenLight;
        terrain[DEN_DARK.index()] = Terrain::DenDark;

        // Three traps around each den: c1, e1, d2 and c9, e9, d8.
        for (row, col) in [(0u8, 2u8), (0, 4), (1, 3)] {
            terrain[Square::from_row_col(row, col).index()] = Terrain::TrapLight;
        }
        for (row, col) in [(8u8, 2u8), (8, 4), (7, 3)] {
            terrain[Square::from_row_col(row, col).index()] = Terrain::TrapDark;
        }

        // ---- Jump edges ----
        let mut jump_edges = Vec::with_capacity(20);
        let mut add = |from: Square, to: Square, over: Vec<Square>| {
            jump_edges.push(JumpEdge { from, to, over });
        };

        // Horizontal jumps across each river row: a<->d over b,c and d<->g
        // over e,f.
        for row in 3..=5u8 {
            let a = Square::from_row_col(row, 0);
            let b = Square::from_row_col(row, 1);
            let c = Square::from_row_col(row, 2);
            let d = Square::from_row_col(row, 3);
            let e = Square::from_row_col(row, 4);
            let f = Square::from_row_col(row, 5);
            let g = Square::from_row_col(row, 6);
            add(a, d, vec![b, c]);
            add(d, a, vec![c, b]);
            add(d, g, vec![e, f]);
            add(g, d, vec![f, e]);
        }
        // Vertical jumps across each river column: rank 3 <-> rank 7.
        for col in [1u8, 2, 4, 5] {
            let bot = Square::from_row_col(2, col);
            let top = Square::from_row_col(6, col);
            let w: Vec<Square> = (3..=5).map(|r| Square::from_row_col(r, col)).collect();
            let mut w_rev = w.clone();
            w_rev.reverse();
            add(bot, top, w);
            add(top, bot, w_rev);
        }
        debug_assert_eq!(jump_edges.len(), 20);

        let mut sq_jumps: Vec<Vec<JumpEdge>> = vec![Vec::new(); Square::NUM];
        for edge in &jump_edges {
            sq_jumps[edge.from.index()].push(edge.clone());
        }

        // ---- BFS distance tables ----
        let mut dist_land = [[UNREACHABLE; Square::NUM]; 2];
        let mut dist_jumper = [[UNREACHABLE; Square::NUM]; 2];
        let mut dist_swimmer = [[UNREACHABLE; Square::NUM]; 2];
        for color in [Color::Light, Color::Dark] {
            let den = den_of(color);
            bfs(den, Model::Land, &is_water, &sq_jumps, &mut dist_land[color.index()]);
            bfs(den, Model::Jumper, &is_water, &sq_jumps, &mut dist_jumper[color.index()]);
            bfs(den, Model::Swimmer, &is_water, &sq_jumps, &mut dist_swimmer[color.index()]);
        }

        BoardTables {
            terrain,
            is_water,
            jump_edges,
            sq_jumps,
            dist_land,
            dist_jumper,
            dist_swimmer,
        }
    }
}

// ---------------------------------------------------------------------------
// BFS
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Model {
    /// Steps on land only.
    Land,
    /// Land steps plus jump edges (ignoring blockers).
    Jumper,
    /// Land and water steps.
    Swimmer,
}

/// Breadth-first expansion from the den; distances are in half-moves.
fn bfs(
    den: Square,
    model: Model,
    is_water: &[bool; Square::NUM],
    sq_jumps: &[Vec<JumpEdge>],
    dist: &mut [u8; Square::NUM],
) {
    let mut queue = VecDeque::new();
    dist[den.index()] = 0;
    queue.push_back(den);

    while let Some(sq) = queue.pop_front() {
        let next = dist[sq.index()] + 1;

        for dir in Direction::ALL {
            let Some(ns) = sq.step(dir) else { continue };
            if model != Model::Swimmer && is_water[ns.index()] {
                continue;
            }
            if next < dist[ns.index()] {
                dist[ns.index()] = next;
                queue.push_back(ns);
            }
        }

        if model == Model::Jumper {
            for edge in &sq_jumps[sq.index()] {
                if next < dist[edge.to.index()] {
                    dist[edge.to.index()] = next;
                    queue.push_back(edge.to);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    #[test]
    fn water_block_layout() {
        let t = tables();
        // 12 water squares in two 2x3 blocks.
        let count = (0..Square::NUM as u8).filter(|&i| t.is_water(Square(i))).count();
        assert_eq!(count, 12);
        for name in ["b4", "c4", "b5", "c5", "b6", "c6", "e4", "f4", "e5", "f5", "e6", "f6"] {
            assert!(t.is_water(sq(name)), "{name} should be water");
        }
        assert!(!t.is_water(sq("a4")));
        assert!(!t.is_water(sq("d5")));
        assert!(!t.is_water(sq("g6")));
    }

    #[test]
    fn dens_and_traps() {
        let t = tables();
        assert_eq!(t.terrain(sq("d1")), Terrain::DenLight);
        assert_eq!(t.terrain(sq("d9")), Terrain::DenDark);
        for name in ["c1", "e1", "d2"] {
            assert_eq!(t.terrain(sq(name)), Terrain::TrapLight, "{name}");
        }
        for name in ["c9", "e9", "d8"] {
            assert_eq!(t.terrain(sq(name)), Terrain::TrapDark, "{name}");
        }
        assert_eq!(t.terrain(sq("d5")), Terrain::Land);
    }

    #[test]
    fn terrain_owner_helpers() {
        let t = tables();
        assert_eq!(t.terrain(sq("c1")).trap_owner(), Some(Color::Light));
        assert_eq!(t.terrain(sq("d8")).trap_owner(), Some(Color::Dark));
        assert_eq!(t.terrain(sq("d1")).den_owner(), Some(Color::Light));
        assert_eq!(t.terrain(sq("d5")).trap_owner(), None);
        assert_eq!(t.terrain(sq("d5")).den_owner(), None);
    }

    #[test]
    fn twenty_jump_edges() {
        let t = tables();
        assert_eq!(t.jump_edges.len(), 20);
        // Every edge starts and ends on land and crosses only water.
        for edge in &t.jump_edges {
            assert!(!t.is_water(edge.from), "launch {} is water", edge.from);
            assert!(!t.is_water(edge.to), "landing {} is water", edge.to);
            for &w in &edge.over {
                assert!(t.is_water(w), "crossed square {w} is not water");
            }
        }
    }

    #[test]
    fn horizontal_jump_a4_d4() {
        let t = tables();
        let jumps = t.jumps_from(sq("a4"));
        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].to, sq("d4"));
        assert_eq!(jumps[0].over, vec![sq("b4"), sq("c4")]);
    }

    #[test]
    fn middle_column_launches_both_ways() {
        let t = tables();
        // d5 can jump west to a5 and east to g5.
        let targets: Vec<Square> = t.jumps_from(sq("d5")).iter().map(|e| e.to).collect();
        assert!(targets.contains(&sq("a5")));
        assert!(targets.contains(&sq("g5")));
    }

    #[test]
    fn vertical_jump_b3_b7() {
        let t = tables();
        let jumps = t.jumps_from(sq("b3"));
        assert_eq!(jumps.len(), 1);
        assert_eq!(jumps[0].to, sq("b7"));
        assert_eq!(jumps[0].over, vec![sq("b4"), sq("b5"), sq("b6")]);
    }

    #[test]
    fn non_launch_squares_have_no_jumps() {
        let t = tables();
        assert!(t.jumps_from(sq("a1")).is_empty());
        assert!(t.jumps_from(sq("d1")).is_empty());
        assert!(t.jumps_from(sq("b4")).is_empty()); // water itself
    }

    #[test]
    fn den_distance_zero_at_den() {
        let t = tables();
        for rank in Rank::ALL {
            assert_eq!(t.dist_to_den(rank, Color::Light, DEN_LIGHT), 0);
            assert_eq!(t.dist_to_den(rank, Color::Dark, DEN_DARK), 0);
        }
    }

    #[test]
    fn land_model_goes_around_the_river() {
        let t = tables();
        // From d4 (between the rivers) the dark den is a straight walk:
        // d4-d5-d6-d7-d8-d9 = 5.
        assert_eq!(t.dist_to_den(Rank::Wolf, Color::Dark, sq("d4")), 5);
        // From a4 a land piece must reach column d or walk up column a;
        // either way 8 steps to d9.
        assert_eq!(t.dist_to_den(Rank::Wolf, Color::Dark, sq("a4")), 8);
    }

    #[test]
    fn jumper_model_is_never_longer_than_land() {
        let t = tables();
        for i in 0..Square::NUM as u8 {
            let s = Square(i);
            for color in [Color::Light, Color::Dark] {
                assert!(
                    t.dist_to_den(Rank::Lion, color, s) <= t.dist_to_den(Rank::Wolf, color, s),
                    "jumper slower than land at {s}"
                );
            }
        }
    }

    #[test]
    fn jumper_shortcut_across_river() {
        let t = tables();
        // Lion on b3 jumps to b7, then b7-b8?-... b7 to d9: b7-c7-d7-d8-d9 = 4,
        // so 5 total; land model must walk around (b3-a3-a4..a7-b7.. = 9+).
        let lion = t.dist_to_den(Rank::Lion, Color::Dark, sq("b3"));
        let wolf = t.dist_to_den(Rank::Wolf, Color::Dark, sq("b3"));
        assert!(lion < wolf, "jump should shorten the path ({lion} vs {wolf})");
    }

    #[test]
    fn swimmer_cuts_through_water() {
        let t = tables();
        // Rat on b4 (water): b4-b5-b6-b7-c7-d7-d8-d9 = 7.
        assert_eq!(t.dist_to_den(Rank::Rat, Color::Dark, sq("b4")), 7);
        // The land model can never stand on water.
        assert_eq!(t.dist_land(Color::Dark, sq("b4")), UNREACHABLE);
    }

    #[test]
    fn distance_tables_are_mirror_symmetric() {
        let t = tables();
        for i in 0..Square::NUM as u8 {
            let s = Square(i);
            for rank in [Rank::Rat, Rank::Lion, Rank::Wolf] {
                assert_eq!(
                    t.dist_to_den(rank, Color::Dark, s),
                    t.dist_to_den(rank, Color::Light, s.mirror()),
                    "asymmetric distances at {s} for {rank:?}"
                );
            }
        }
    }

    #[test]
    fn den_of_each_color() {
        assert_eq!(den_of(Color::Light), DEN_LIGHT);
        assert_eq!(den_of(Color::Dark), DEN_DARK);
        assert_eq!(DEN_LIGHT.to_algebraic(), "d1");
        assert_eq!(DEN_DARK.to_algebraic(), "d9");
    }

    #[test]
    fn board_dimensions() {
        assert_eq!(Square::NUM, (BOARD_COLS * BOARD_ROWS) as usize);
    }
}
