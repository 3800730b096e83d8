//! Mailbox board representation with an incremental Zobrist hash.
//!
//! `Position` stores piece placement as a 63-cell array plus a reverse index
//! (`piece_square[color][rank]`, valid because each side owns at most one
//! piece of each rank), live piece counts, side to move, the half-move clock,
//! a position-hash history for repetition detection, and an undo stack so
//! moves can be taken back in place.

use crate::engine::tables::{self, Terrain};
use crate::engine::types::{
    BOARD_COLS, BOARD_ROWS, Color, GameStatus, JungleError, Move, Piece, Rank, Square,
};
use crate::engine::zobrist;

/// Upper bound on game length in plies; sizes the undo and history stacks.
pub const MAX_GAME_LEN: usize = 2048;

// ---------------------------------------------------------------------------
// Undo — saved state for reversing a move
// ---------------------------------------------------------------------------

/// State that must be saved before making a move so it can be restored.
#[derive(Clone, Copy, Debug)]
struct Undo {
    captured: Option<Piece>,
    hash: u64,
    halfmove: u16,
    mv: Option<Move>,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A complete Jungle Chess position.
#[derive(Clone, Debug)]
pub struct Position {
    /// One cell per square.
    board: [Option<Piece>; Square::NUM],

    /// Reverse index: the square a piece stands on, `None` when captured.
    piece_square: [[Option<Square>; Rank::COUNT]; 2],

    /// Live piece count per side, 0..=8.
    piece_count: [u8; 2],

    /// Whose turn it is.
    pub side_to_move: Color,

    /// Incremental Zobrist hash.
    pub hash: u64,

    /// Plies since the last capture.
    pub halfmove: u16,

    /// Hashes of every position reached, one entry per ply (null moves
    /// included), used for repetition detection.
    history: Vec<u64>,

    /// Undo records, one per make/make_null.
    undo: Vec<Undo>,
}

impl Position {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    fn empty() -> Self {
        Position {
            board: [None; Square::NUM],
            piece_square: [[None; Rank::COUNT]; 2],
            piece_count: [0; 2],
            side_to_move: Color::Light,
            hash: 0,
            halfmove: 0,
            history: Vec::with_capacity(MAX_GAME_LEN),
            undo: Vec::with_capacity(MAX_GAME_LEN),
        }
    }

    /// The standard starting position: Light on ranks 1-3, Dark mirrored on
    /// ranks 7-9, Light to move.
    pub fn starting() -> Self {
        let mut pos = Position::empty();

        let light = [
            (Rank::Tiger, "a1"),
            (Rank::Lion, "g1"),
            (Rank::Cat, "b2"),
            (Rank::Dog, "f2"),
            (Rank::Elephant, "a3"),
            (Rank::Wolf, "c3"),
            (Rank::Leopard, "e3"),
            (Rank::Rat, "g3"),
        ];
        for (rank, name) in light {
            let sq = Square::from_algebraic(name).expect("starting square is valid");
            pos.put_piece(sq, Piece::new(Color::Light, rank));
            pos.put_piece(sq.mirror(), Piece::new(Color::Dark, rank));
        }

        pos.hash = pos.compute_zobrist();
        pos.history.push(pos.hash);

        #[cfg(debug_assertions)]
        pos.assert_consistent();

        pos
    }

    /// Reset to the standard starting position in place.
    pub fn load_start(&mut self) {
        *self = Position::starting();
    }

    /// Replace this position with one parsed from FEN-like text. On error
    /// the position is left unchanged.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), JungleError> {
        *self = Position::from_fen(fen)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Piece manipulation (low-level; no hash updates)
    // -----------------------------------------------------------------------

    #[inline]
    fn put_piece(&mut self, sq: Square, piece: Piece) {
        debug_assert!(self.board[sq.index()].is_none());
        self.board[sq.index()] = Some(piece);
        self.piece_square[piece.color.index()][piece.rank.index()] = Some(sq);
        self.piece_count[piece.color.index()] += 1;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// What piece (if any) is on a given square?
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index()]
    }

    /// Where a piece stands, or `None` if it has been captured.
    #[inline]
    pub fn piece_square(&self, color: Color, rank: Rank) -> Option<Square> {
        self.piece_square[color.index()][rank.index()]
    }

    /// Number of live pieces for a side.
    #[inline]
    pub fn piece_count(&self, color: Color) -> u8 {
        self.piece_count[color.index()]
    }

    /// Number of plies played since the position was loaded.
    #[inline]
    pub fn ply(&self) -> usize {
        self.undo.len()
    }

    // -----------------------------------------------------------------------
    // Zobrist hash (full recompute)
    // -----------------------------------------------------------------------

    /// Compute the Zobrist hash from scratch (FEN loading, verification).
    pub fn compute_zobrist(&self) -> u64 {
        let zk = zobrist::keys();
        let mut hash = 0u64;
        for i in 0..Square::NUM as u8 {
            let sq = Square(i);
            if let Some(piece) = self.board[sq.index()] {
                hash ^= zk.piece_key(piece.color, piece.rank, sq);
            }
        }
        if self.side_to_move == Color::Dark {
            hash ^= zk.side_to_move;
        }
        hash
    }

    // -----------------------------------------------------------------------
    // Consistency check (debug and test builds)
    // -----------------------------------------------------------------------

    /// Verify the cross-referencing invariants between `board`,
    /// `piece_square`, `piece_count`, and `hash`.
    #[cfg(any(debug_assertions, test))]
    pub fn assert_consistent(&self) {
        let t = tables::tables();
        for color in [Color::Light, Color::Dark] {
            let mut count = 0u8;
            for rank in Rank::ALL {
                if let Some(sq) = self.piece_square[color.index()][rank.index()] {
                    count += 1;
                    assert_eq!(
                        self.board[sq.index()],
                        Some(Piece::new(color, rank)),
                        "reverse index points at wrong cell for {color:?} {rank:?}"
                    );
                }
            }
            assert_eq!(
                self.piece_count[color.index()],
                count,
                "piece count mismatch for {color:?}"
            );
        }
        for i in 0..Square::NUM as u8 {
            let sq = Square(i);
            if let Some(piece) = self.board[sq.index()] {
                assert_eq!(
                    self.piece_square[piece.color.index()][piece.rank.index()],
                    Some(sq),
                    "cell not covered by reverse index at {sq}"
                );
                if t.is_water(sq) {
                    assert_eq!(piece.rank, Rank::Rat, "non-rat in water at {sq}");
                }
                assert_ne!(
                    t.terrain(sq).den_owner(),
                    Some(piece.color),
                    "piece on its own den at {sq}"
                );
            }
        }
        assert_eq!(self.hash, self.compute_zobrist(), "incremental hash drifted");
    }

    // -----------------------------------------------------------------------
    // Make / unmake
    // -----------------------------------------------------------------------

    /// Apply a move. The caller must pass a move produced by the generator
    /// for this position.
    pub fn make(&mut self, mv: Move) {
        debug_assert!(self.undo.len() < MAX_GAME_LEN, "game length exceeded");
        let zk = zobrist::keys();
        let piece = self.board[mv.from.index()].expect("make: empty from-square");

        let mut undo = Undo {
            captured: None,
            hash: self.hash,
            halfmove: self.halfmove,
            mv: Some(mv),
        };

        // Capture.
        if let Some(victim) = self.board[mv.to.index()] {
            undo.captured = Some(victim);
            self.piece_square[victim.color.index()][victim.rank.index()] = None;
            self.piece_count[victim.color.index()] -= 1;
            self.hash ^= zk.piece_key(victim.color, victim.rank, mv.to);
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }

        // Move the piece.
        self.hash ^= zk.piece_key(piece.color, piece.rank, mv.from);
        self.hash ^= zk.piece_key(piece.color, piece.rank, mv.to);
        self.board[mv.from.index()] = None;
        self.board[mv.to.index()] = Some(piece);
        self.piece_square[piece.color.index()][piece.rank.index()] = Some(mv.to);

        // Flip side.
        self.side_to_move = !self.side_to_move;
        self.hash ^= zk.side_to_move;

        self.undo.push(undo);
        self.history.push(self.hash);
    }

    /// Reverse the most recent `make`.
    pub fn unmake(&mut self) {
        let undo = self.undo.pop().expect("unmake: empty undo stack");
        let mv = undo.mv.expect("unmake: last record was a null move");
        self.history.pop();

        self.side_to_move = !self.side_to_move;
        self.hash = undo.hash;
        self.halfmove = undo.halfmove;

        let piece = self.board[mv.to.index()].expect("unmake: empty to-square");
        self.board[mv.from.index()] = Some(piece);
        self.board[mv.to.index()] = undo.captured;
        self.piece_square[piece.color.index()][piece.rank.index()] = Some(mv.from);

        if let Some(victim) = undo.captured {
            self.piece_square[victim.color.index()][victim.rank.index()] = Some(mv.to);
            self.piece_count[victim.color.index()] += 1;
        }
    }

    /// Pass the turn without moving (null-move pruning).
    pub fn make_null(&mut self) {
        debug_assert!(self.undo.len() < MAX_GAME_LEN, "game length exceeded");
        self.undo.push(Undo {
            captured: None,
            hash: self.hash,
            halfmove: self.halfmove,
            mv: None,
        });
        self.side_to_move = !self.side_to_move;
        self.hash ^= zobrist::keys().side_to_move;
        self.history.push(self.hash);
    }

    /// Reverse the most recent `make_null`.
    pub fn unmake_null(&mut self) {
        let undo = self.undo.pop().expect("unmake_null: empty undo stack");
        debug_assert!(undo.mv.is_none(), "unmake_null after a real move");
        self.history.pop();
        self.side_to_move = !self.side_to_move;
        self.hash = undo.hash;
        self.halfmove = undo.halfmove;
    }

    // -----------------------------------------------------------------------
    // Repetition & game over
    // -----------------------------------------------------------------------

    /// Threefold repetition: the current hash has already occurred at least
    /// twice at earlier positions with the same side to move.
    pub fn is_repetition(&self) -> bool {
        let len = self.history.len();
        if len < 5 {
            return false;
        }
        let mut count = 0;
        // Same side to move appears every second entry going backwards.
        let mut i = len as isize - 3;
        while i >= 0 {
            if self.history[i as usize] == self.hash {
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
            i -= 2;
        }
        false
    }

    /// Terminal-state classification from the side-to-move's viewpoint.
    pub fn game_status(&self) -> GameStatus {
        let us = self.side_to_move;
        let opp = !us;

        // Opponent reached our den.
        if let Some(piece) = self.board[tables::den_of(us).index()]
            && piece.color == opp
        {
            return GameStatus::SideToMoveLost;
        }

        if self.piece_count[us.index()] == 0 {
            return GameStatus::SideToMoveLost;
        }
        if self.piece_count[opp.index()] == 0 {
            return GameStatus::SideToMoveWon;
        }

        GameStatus::Ongoing
    }

    // -----------------------------------------------------------------------
    // FEN parsing & generation
    // -----------------------------------------------------------------------

    /// Parse FEN-like text: ranks 9..1 separated by '/', piece letters
    /// R C D W P T L E (uppercase = Light), digits 1..7 for empty runs, a
    /// space, then 'w' (Light) or 'b' (Dark) to move.
    pub fn from_fen(fen: &str) -> Result<Self, JungleError> {
        let mut fields = fen.split_whitespace();
        let placement = fields
            .next()
            .ok_or_else(|| JungleError::InvalidFen("empty string".to_string()))?;
        let stm = fields
            .next()
            .ok_or_else(|| JungleError::InvalidFen("missing side to move".to_string()))?;
        if fields.next().is_some() {
            return Err(JungleError::InvalidFen("trailing fields".to_string()));
        }

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != BOARD_ROWS as usize {
            return Err(JungleError::InvalidFen(format!(
                "expected {BOARD_ROWS} ranks, got {}",
                ranks.len()
            )));
        }

        let t = tables::tables();
        let mut pos = Position::empty();

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let row = (BOARD_ROWS - 1) - rank_idx as u8; // FEN starts at rank 9
            let mut col: u8 = 0;
            for ch in rank_str.chars() {
                if col >= BOARD_COLS {
                    return Err(JungleError::InvalidFen(format!(
                        "too many squares in rank {}",
                        row + 1
                    )));
                }
                if let Some(digit) = ch.to_digit(10) {
                    if !(1..=BOARD_COLS as u32).contains(&digit) {
                        return Err(JungleError::InvalidFen(format!(
                            "invalid empty count '{ch}' in rank {}",
                            row + 1
                        )));
                    }
                    col += digit as u8;
                } else if let Some((color, rank)) = Rank::from_char(ch) {
                    let sq = Square::from_row_col(row, col);
                    if pos.piece_square[color.index()][rank.index()].is_some() {
                        return Err(JungleError::InvalidFen(format!(
                            "duplicate {color} {rank}"
                        )));
                    }
                    if t.is_water(sq) && rank != Rank::Rat {
                        return Err(JungleError::InvalidFen(format!(
                            "{rank} cannot stand in water at {sq}"
                        )));
                    }
                    if t.terrain(sq).den_owner() == Some(color) {
                        return Err(JungleError::InvalidFen(format!(
                            "{color} piece on its own den at {sq}"
                        )));
                    }
                    pos.put_piece(sq, Piece::new(color, rank));
                    col += 1;
                } else {
                    return Err(JungleError::InvalidFen(format!(
                        "invalid character '{ch}' in placement"
                    )));
                }
            }
            if col != BOARD_COLS {
                return Err(JungleError::InvalidFen(format!(
                    "rank {} has {col} squares instead of {BOARD_COLS}",
                    row + 1
                )));
            }
        }

        pos.side_to_move = match stm {
            "w" => Color::Light,
            "b" => Color::Dark,
            other => {
                return Err(JungleError::InvalidFen(format!(
                    "invalid side to move: '{other}'"
                )));
            }
        };

        pos.hash = pos.compute_zobrist();
        pos.history.push(pos.hash);

        #[cfg(debug_assertions)]
        pos.assert_consistent();

        Ok(pos)
    }

    /// Export the position as FEN-like text.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(40);
        for row in (0..BOARD_ROWS).rev() {
            let mut empty = 0u8;
            for col in 0..BOARD_COLS {
                match self.board[Square::from_row_col(row, col).index()] {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if row > 0 {
                fen.push('/');
            }
        }
        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::Light => 'w',
            Color::Dark => 'b',
        });
        fen
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    /// Render the board as a text grid (rank 9 at top). Empty squares show
    /// their terrain: `~` water, `^`/`v` Light/Dark traps, `*`/`#` dens.
    pub fn board_string(&self) -> String {
        let t = tables::tables();
        let mut s = String::with_capacity(256);
        for row in (0..BOARD_ROWS).rev() {
            s.push((b'1' + row) as char);
            s.push(' ');
            for col in 0..BOARD_COLS {
                let sq = Square::from_row_col(row, col);
                let ch = match self.board[sq.index()] {
                    Some(piece) => piece.to_char(),
                    None => match t.terrain(sq) {
                        Terrain::Land => '.',
                        Terrain::Water => '~',
                        Terrain::TrapLight => '^',
                        Terrain::TrapDark => 'v',
                        Terrain::DenLight => '*',
                        Terrain::DenDark => '#',
                    },
                };
                s.push(ch);
                if col < BOARD_COLS - 1 {
                    s.push(' ');
                }
            }
            s.push('\n');
        }
        s.push_str("  a b c d e f g\n");
        s.push_str(&format!("{} to move", self.side_to_move));
        s
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.board_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
