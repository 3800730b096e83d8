//! Iterative deepening alpha-beta search.
//!
//! The driver runs principal variation search with aspiration windows over a
//! transposition table, with null-move pruning, razoring, reverse futility
//! pruning, internal iterative deepening, late move reductions, futility
//! pruning, killer/history move ordering, and a capture-only quiescence
//! search with delta pruning.
//!
//! The searcher is single-threaded. Cancellation is cooperative: the adapter
//! may set the shared stop flag from another thread and the search returns
//! within a few thousand nodes.

use crate::ai::evaluation::{self, INF, MATE, MAX_PLY, is_mate_score};
use crate::ai::tt::{Bound, TranspositionTable, score_from_tt, score_to_tt};
use crate::engine::board::Position;
use crate::engine::movegen::{generate_all, generate_captures};
use crate::engine::tables;
use crate::engine::types::{GameStatus, Move, Rank, Square};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Aspiration half-window around the previous iteration's score.
const ASPIRATION_WINDOW: i32 = 40;
/// Razoring margin per remaining depth.
const RAZOR_MARGIN: i32 = 300;
/// Reverse futility margin per remaining depth.
const RFP_MARGIN: i32 = 120;
/// Futility margin per remaining depth for late quiet moves.
const FUTILITY_MARGIN: i32 = 150;
/// Delta pruning cushion in quiescence.
const DELTA_MARGIN: i32 = 200;
/// History counters are halved once any entry passes this.
const HISTORY_CAP: i32 = 100_000;

// ---------------------------------------------------------------------------
// Limits & progress events
// ---------------------------------------------------------------------------

/// What bounds a `think` call.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchLimits {
    /// Maximum iteration depth; 0 means "until time runs out".
    pub depth: u32,
    /// Time budget in milliseconds; 0 picks the default (5000 ms).
    pub movetime_ms: u64,
    /// Ignore the clock entirely (search until stopped or depth cap).
    pub infinite: bool,
}

/// A score as reported to the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    /// Centipawns from the side-to-move's viewpoint.
    Cp(i32),
    /// Forced win (positive) or loss (negative) in this many full moves.
    Mate(i32),
}

impl Score {
    fn from_internal(score: i32) -> Score {
        if is_mate_score(score) {
            // Ply of the terminal position; the mover's den entry at ply 0
            // is a mate in one full move.
            let mate_ply = MATE - score.abs();
            let mate_in = mate_ply / 2 + 1;
            Score::Mate(if score > 0 { mate_in } else { -mate_in })
        } else {
            Score::Cp(score)
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {cp}"),
            Score::Mate(n) => write!(f, "mate {n}"),
        }
    }
}

/// One progress event per finished iteration.
#[derive(Clone, Debug)]
pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub score: Score,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub pv: Vec<Move>,
}

impl fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "info depth {} seldepth {} score {} nodes {} nps {} time {}",
            self.depth, self.seldepth, self.score, self.nodes, self.nps, self.time_ms
        )?;
        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

/// Owns the transposition table and all search bookkeeping. Lives across
/// `think` calls within a game so the table keeps its entries.
pub struct Searcher {
    tt: TranspositionTable,
    stop: Arc<AtomicBool>,

    killers: [[Option<Move>; 2]; MAX_PLY],
    history: Box<[[[i32; Square::NUM]; Square::NUM]; 2]>,
    pv: Box<[[Option<Move>; MAX_PLY]; MAX_PLY]>,
    pv_len: [usize; MAX_PLY],
    lmr: [[i32; 64]; 64],

    nodes: u64,
    sel_depth: usize,
    start: Instant,
    allocated_ms: u64,
    max_ms: u64,
    infinite: bool,
    stopped: bool,
}

impl Searcher {
    pub fn new(hash_mb: usize) -> Self {
        // Reduction ~ 0.75 + ln(depth) * ln(move_number) / 2.5.
        let mut lmr = [[0i32; 64]; 64];
        for (d, row) in lmr.iter_mut().enumerate().skip(1) {
            for (m, r) in row.iter_mut().enumerate().skip(1) {
                *r = (0.75 + (d as f64).ln() * (m as f64).ln() / 2.5) as i32;
            }
        }

        Searcher {
            tt: TranspositionTable::new_with_mb(hash_mb),
            stop: Arc::new(AtomicBool::new(false)),
            killers: [[None; 2]; MAX_PLY],
            history: Box::new([[[0; Square::NUM]; Square::NUM]; 2]),
            pv: Box::new([[None; MAX_PLY]; MAX_PLY]),
            pv_len: [0; MAX_PLY],
            lmr,
            nodes: 0,
            sel_depth: 0,
            start: Instant::now(),
            allocated_ms: 0,
            max_ms: 0,
            infinite: false,
            stopped: false,
        }
    }

    /// Handle the adapter keeps to request cancellation from another thread.
    /// Clear it before starting a search.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Forget everything learned in the current game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.killers = [[None; 2]; MAX_PLY];
        *self.history = [[[0; Square::NUM]; Square::NUM]; 2];
    }

    /// Re-allocate the transposition table and clear all learned state.
    pub fn resize_tt(&mut self, size_mb: usize) {
        self.tt = TranspositionTable::new_with_mb(size_mb);
        self.killers = [[None; 2]; MAX_PLY];
        *self.history = [[[0; Square::NUM]; Square::NUM]; 2];
    }

    /// Nodes visited by the last `think` call.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    // -----------------------------------------------------------------------
    // Iterative deepening driver
    // -----------------------------------------------------------------------

    /// Search the position and return the best move found. Emits one
    /// [`SearchInfo`] per completed iteration through `on_info`.
    pub fn think(
        &mut self,
        pos: &mut Position,
        limits: &SearchLimits,
        on_info: &mut dyn FnMut(&SearchInfo),
    ) -> Option<Move> {
        self.start = Instant::now();
        self.stopped = false;
        self.nodes = 0;

        let max_depth = if limits.depth == 0 {
            100
        } else {
            limits.depth.min(MAX_PLY as u32 - 1)
        } as i32;
        let movetime = if limits.movetime_ms == 0 && !limits.infinite {
            5_000
        } else {
            limits.movetime_ms
        };
        self.infinite = limits.infinite;
        self.allocated_ms = movetime;
        self.max_ms = movetime + movetime / 2;

        // Killers are per-search; history survives between moves of a game.
        self.killers = [[None; 2]; MAX_PLY];

        let mut best: Option<Move> = None;
        let mut prev_score = 0i32;

        for depth in 1..=max_depth {
            self.sel_depth = 0;

            let (mut alpha, mut beta) = if depth >= 5 {
                (prev_score - ASPIRATION_WINDOW, prev_score + ASPIRATION_WINDOW)
            } else {
                (-INF, INF)
            };

            let mut score = self.alpha_beta(pos, depth, alpha, beta, 0, true, true);

            // Failed outside the aspiration window: widen once, then drop to
            // a full-width window.
            if !self.stopped && (score <= alpha || score >= beta) {
                alpha = (prev_score - 4 * ASPIRATION_WINDOW).max(-INF);
                beta = (prev_score + 4 * ASPIRATION_WINDOW).min(INF);
                score = self.alpha_beta(pos, depth, alpha, beta, 0, true, true);
            }
            if !self.stopped && (score <= alpha || score >= beta) {
                score = self.alpha_beta(pos, depth, -INF, INF, 0, true, true);
            }

            if self.stopped && depth > 1 {
                break;
            }

            if self.pv_len[0] > 0
                && let Some(mv) = self.pv[0][0]
            {
                best = Some(mv);
            }
            prev_score = score;

            let time_ms = self.start.elapsed().as_millis() as u64;
            let nps = if time_ms > 0 {
                self.nodes * 1000 / time_ms
            } else {
                self.nodes
            };
            on_info(&SearchInfo {
                depth: depth as u32,
                seldepth: self.sel_depth as u32,
                score: Score::from_internal(score),
                nodes: self.nodes,
                nps,
                time_ms,
                pv: (0..self.pv_len[0]).filter_map(|i| self.pv[0][i]).collect(),
            });

            // Soft bound: a new iteration rarely finishes once ~40% of the
            // budget is gone.
            if !self.infinite && time_ms * 5 >= self.allocated_ms * 2 {
                break;
            }
            // A forced mate within this horizon will not improve.
            if score.abs() >= MATE - depth {
                break;
            }
        }

        best.or_else(|| generate_all(pos).first().copied())
    }

    // -----------------------------------------------------------------------
    // Alpha-beta (negamax, PVS)
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        pos: &mut Position,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        is_pv: bool,
        allow_null: bool,
    ) -> i32 {
        self.pv_len[ply] = ply;

        // The player who just moved entered a den or took the last piece.
        match pos.game_status() {
            GameStatus::SideToMoveLost => return -(MATE - ply as i32),
            GameStatus::SideToMoveWon => return MATE - ply as i32,
            GameStatus::Ongoing => {}
        }

        if ply > 0 && pos.is_repetition() {
            return 0;
        }
        if pos.halfmove >= 200 {
            return 0;
        }
        if ply >= MAX_PLY - 1 {
            return evaluation::evaluate(pos);
        }
        if depth <= 0 {
            return self.quiescence(pos, alpha, beta, ply);
        }

        self.nodes += 1;
        if ply > self.sel_depth {
            self.sel_depth = ply;
        }
        if self.nodes & 4095 == 0 {
            self.check_time();
        }
        if self.is_stopped() {
            return 0;
        }

        // ---- Transposition table ----
        let mut hash_move: Option<Move> = None;
        if let Some(entry) = self.tt.probe(pos.hash) {
            hash_move = entry.best_move;
            if !is_pv && entry.depth as i32 >= depth {
                let tt_score = score_from_tt(entry.score as i32, ply);
                match entry.bound {
                    Bound::Exact => return tt_score,
                    Bound::Lower if tt_score >= beta => return tt_score,
                    Bound::Upper if tt_score <= alpha => return tt_score,
                    _ => {}
                }
            }
        }

        let static_eval = evaluation::evaluate(pos);
        let in_danger = den_in_danger(pos);

        // ---- Razoring ----
        if !is_pv && !in_danger && depth <= 2 && static_eval + RAZOR_MARGIN * depth <= alpha {
            let q = self.quiescence(pos, alpha, beta, ply);
            if q <= alpha {
                return q;
            }
        }

        // ---- Reverse futility pruning ----
        if !is_pv
            && !in_danger
            && depth <= 3
            && static_eval - RFP_MARGIN * depth >= beta
            && beta.abs() < MATE - MAX_PLY as i32
        {
            return static_eval - RFP_MARGIN * depth;
        }

        // ---- Null-move pruning ----
        if !is_pv
            && allow_null
            && depth >= 3
            && !in_danger
            && static_eval >= beta
            && pos.piece_count(pos.side_to_move) >= 2
            && beta.abs() < MATE - MAX_PLY as i32
        {
            let r = 3 + depth / 6;
            pos.make_null();
            let null_score =
                -self.alpha_beta(pos, depth - 1 - r, -beta, -beta + 1, ply + 1, false, false);
            pos.unmake_null();
            if self.is_stopped() {
                return 0;
            }
            if null_score >= beta {
                return null_score.min(MATE - MAX_PLY as i32);
            }
        }

        // ---- Internal iterative deepening ----
        if is_pv && hash_move.is_none() && depth >= 4 {
            self.alpha_beta(pos, depth - 2, alpha, beta, ply, true, false);
            if self.is_stopped() {
                return 0;
            }
            if let Some(entry) = self.tt.probe(pos.hash) {
                hash_move = entry.best_move;
            }
        }

        // ---- Move loop ----
        let mut moves = generate_all(pos);
        if moves.is_empty() {
            return -(MATE - ply as i32);
        }
        let mut scores: Vec<i32> = moves
            .iter()
            .map(|&m| self.score_move(pos, m, ply, hash_move))
            .collect();

        let enemy_den = tables::den_of(!pos.side_to_move);
        let original_alpha = alpha;
        let mut best_score = -INF;
        let mut best_move: Option<Move> = None;
        let mut searched = 0usize;

        for i in 0..moves.len() {
            pick_best(&mut moves, &mut scores, i);
            let mv = moves[i];
            let captured = pos.piece_at(mv.to);
            let is_capture = captured.is_some();

            // Entering the enemy den ends the game at this ply.
            if mv.to == enemy_den {
                self.pv[ply][ply] = Some(mv);
                self.pv_len[ply] = ply + 1;
                return MATE - ply as i32;
            }

            let extension =
                i32::from(in_danger || captured.is_some_and(|p| p.rank >= Rank::Tiger));

            // ---- Futility pruning ----
            if !is_pv
                && !in_danger
                && depth <= 3
                && searched > 0
                && !is_capture
                && static_eval + FUTILITY_MARGIN * depth <= alpha
            {
                continue;
            }

            let new_depth = depth - 1 + extension;
            pos.make(mv);

            let mut score;
            if searched == 0 {
                score = -self.alpha_beta(pos, new_depth, -beta, -alpha, ply + 1, is_pv, true);
            } else {
                // ---- Late move reductions ----
                let mut reduction = 0;
                if depth >= 3 && !is_capture && extension == 0 {
                    reduction = self.lmr[depth.min(63) as usize][searched.min(63)];
                    if is_pv {
                        reduction /= 2;
                    }
                    reduction = reduction.clamp(0, new_depth - 1);
                }

                score = -self.alpha_beta(
                    pos,
                    new_depth - reduction,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    false,
                    true,
                );
                if score > alpha && reduction > 0 {
                    score =
                        -self.alpha_beta(pos, new_depth, -alpha - 1, -alpha, ply + 1, false, true);
                }
                if is_pv && score > alpha && score < beta {
                    score = -self.alpha_beta(pos, new_depth, -beta, -alpha, ply + 1, true, true);
                }
            }

            pos.unmake();
            if self.is_stopped() {
                return 0;
            }
            searched += 1;

            if score > best_score {
                best_score = score;
                best_move = Some(mv);

                if score > alpha {
                    alpha = score;
                    self.update_pv(ply, mv);

                    if alpha >= beta {
                        if !is_capture {
                            self.record_cutoff(pos, mv, ply, depth);
                        }
                        break;
                    }
                }
            }
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt
            .store(pos.hash, score_to_tt(best_score, ply), best_move, depth, bound);

        best_score
    }

    // -----------------------------------------------------------------------
    // Quiescence
    // -----------------------------------------------------------------------

    fn quiescence(&mut self, pos: &mut Position, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        self.nodes += 1;
        if ply > self.sel_depth {
            self.sel_depth = ply;
        }
        if self.nodes & 4095 == 0 {
            self.check_time();
        }
        if self.is_stopped() {
            return 0;
        }

        match pos.game_status() {
            GameStatus::SideToMoveLost => return -(MATE - ply as i32),
            GameStatus::SideToMoveWon => return MATE - ply as i32,
            GameStatus::Ongoing => {}
        }

        let stand_pat = evaluation::evaluate(pos);
        if stand_pat >= beta {
            return stand_pat;
        }
        if ply >= MAX_PLY - 1 {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut moves = generate_captures(pos);
        let mut scores: Vec<i32> = moves
            .iter()
            .map(|&m| self.score_move(pos, m, ply, None))
            .collect();

        let mut best = stand_pat;
        for i in 0..moves.len() {
            pick_best(&mut moves, &mut scores, i);
            let mv = moves[i];

            // ---- Delta pruning ----
            if let Some(victim) = pos.piece_at(mv.to)
                && stand_pat + victim.rank.value() + DELTA_MARGIN < alpha
            {
                continue;
            }

            pos.make(mv);
            let score = -self.quiescence(pos, -beta, -alpha, ply + 1);
            pos.unmake();
            if self.is_stopped() {
                return 0;
            }

            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        return score;
                    }
                }
            }
        }

        best
    }

    // -----------------------------------------------------------------------
    // Move ordering
    // -----------------------------------------------------------------------

    fn score_move(&self, pos: &Position, mv: Move, ply: usize, hash_move: Option<Move>) -> i32 {
        if hash_move == Some(mv) {
            return 1_000_000;
        }

        // Captures: most valuable victim, least valuable attacker.
        if let Some(victim) = pos.piece_at(mv.to) {
            let attacker = pos.piece_at(mv.from).map_or(0, |p| p.rank.value());
            return 500_000 + victim.rank.value() * 10 - attacker;
        }

        // A den entry is a win; order it like one.
        if mv.to == tables::den_of(!pos.side_to_move) {
            return 900_000;
        }

        if self.killers[ply][0] == Some(mv) {
            return 400_000;
        }
        if self.killers[ply][1] == Some(mv) {
            return 399_000;
        }

        self.history[pos.side_to_move.index()][mv.from.index()][mv.to.index()]
    }

    /// Killer and history bookkeeping after a quiet beta cutoff.
    fn record_cutoff(&mut self, pos: &Position, mv: Move, ply: usize, depth: i32) {
        if self.killers[ply][0] != Some(mv) {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = Some(mv);
        }

        let side = pos.side_to_move.index();
        let entry = &mut self.history[side][mv.from.index()][mv.to.index()];
        *entry += depth * depth;
        if *entry > HISTORY_CAP {
            for side in self.history.iter_mut() {
                for from in side.iter_mut() {
                    for to in from.iter_mut() {
                        *to /= 2;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // PV bookkeeping
    // -----------------------------------------------------------------------

    fn update_pv(&mut self, ply: usize, mv: Move) {
        self.pv[ply][ply] = Some(mv);
        let child_len = self.pv_len[ply + 1];
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        for j in (ply + 1)..child_len {
            head[ply][j] = tail[0][j];
        }
        self.pv_len[ply] = child_len.max(ply + 1);
    }

    // -----------------------------------------------------------------------
    // Time & cancellation
    // -----------------------------------------------------------------------

    fn check_time(&mut self) {
        if self.infinite {
            return;
        }
        if self.start.elapsed().as_millis() as u64 >= self.max_ms {
            self.stopped = true;
        }
    }

    #[inline]
    fn is_stopped(&mut self) -> bool {
        if !self.stopped && self.stop.load(Ordering::Acquire) {
            self.stopped = true;
        }
        self.stopped
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Any enemy piece within Manhattan distance 2 of our den: disables the
/// speculative prunings and extends the search.
fn den_in_danger(pos: &Position) -> bool {
    let our_den = tables::den_of(pos.side_to_move);
    let opp = !pos.side_to_move;
    Rank::ALL
        .iter()
        .any(|&r| pos.piece_square(opp, r).is_some_and(|sq| sq.manhattan(our_den) <= 2))
}

/// Selection-sort step: move the best remaining entry to `start`.
fn pick_best(moves: &mut [Move], scores: &mut [i32], start: usize) {
    let mut best = start;
    for i in start + 1..scores.len() {
        if scores[i] > scores[best] {
            best = i;
        }
    }
    moves.swap(start, best);
    scores.swap(start, best);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
