//! Line-oriented protocol adapter.
//!
//! Reads one command per line from stdin and dispatches onto the position
//! and the searcher. Search runs on a background thread that owns the
//! searcher mutex for the duration of a `go`; the only state shared with
//! this thread is the atomic stop flag. Malformed input is ignored and the
//! position is never left half-mutated.

use crate::ai::evaluation;
use crate::ai::search::{SearchLimits, Searcher};
use crate::config::EngineConfig;
use crate::engine::board::Position;
use crate::engine::movegen::{self, generate_all};
use crate::engine::types::{Color, Move};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// The engine shell driven by the command loop.
pub struct Engine {
    position: Position,
    searcher: Arc<std::sync::Mutex<Searcher>>,
    stop: Arc<AtomicBool>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let searcher = Searcher::new(config.hash_mb);
        let stop = searcher.stop_flag();
        Engine {
            position: Position::starting(),
            searcher: Arc::new(std::sync::Mutex::new(searcher)),
            stop,
            config,
        }
    }

    /// Read commands from stdin until `quit` or end of input.
    pub fn run(&mut self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let mut out = Vec::new();
            let keep_going = self.handle_command(line.trim(), &mut out);
            for text in out {
                println!("{text}");
            }
            if !keep_going {
                break;
            }
        }
    }

    /// Dispatch a single command line. Synchronous responses are pushed to
    /// `out`; search output is printed by the search thread. Returns `false`
    /// when the loop should exit.
    pub fn handle_command(&mut self, line: &str, out: &mut Vec<String>) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = tokens.first() else {
            return true;
        };
        tracing::debug!(command = cmd, "dispatch");

        match cmd {
            "init" => {
                out.push(format!("id name jungle-engine {}", env!("CARGO_PKG_VERSION")));
                out.push("id author JungleChess".to_string());
                out.push(format!(
                    "option name Hash type spin default {} min 1 max 4096",
                    self.config.hash_mb
                ));
                out.push("initok".to_string());
            }
            "isready" => out.push("readyok".to_string()),
            "newgame" => self.cmd_newgame(),
            "position" => self.cmd_position(&tokens[1..]),
            "go" => self.cmd_go(&tokens[1..]),
            "stop" => self.stop.store(true, Ordering::Release),
            "setoption" => self.cmd_setoption(&tokens[1..]),
            "display" => out.push(self.position.board_string()),
            "perft" => self.cmd_perft(&tokens[1..], out),
            "eval" => {
                let score = evaluation::evaluate(&self.position);
                out.push(format!(
                    "eval = {score} cp (from {} perspective)",
                    self.position.side_to_move
                ));
            }
            "moves" => {
                let moves = generate_all(&self.position);
                let texts: Vec<String> = moves.iter().map(Move::to_string).collect();
                out.push(format!("Legal moves ({}): {}", moves.len(), texts.join(" ")));
            }
            "quit" => {
                self.stop.store(true, Ordering::Release);
                return false;
            }
            other => {
                tracing::debug!(command = other, "ignoring unknown command");
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    fn cmd_newgame(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Ok(mut searcher) = self.searcher.lock() {
            searcher.new_game();
        }
        self.position.load_start();
    }

    fn cmd_position(&mut self, args: &[&str]) {
        let mut rest = args;
        match rest.first() {
            Some(&"startpos") => {
                self.position.load_start();
                rest = &rest[1..];
            }
            Some(&"fen") => {
                let end = rest
                    .iter()
                    .position(|&t| t == "moves")
                    .unwrap_or(rest.len());
                let fen = rest[1..end].join(" ");
                if self.position.load_fen(&fen).is_err() {
                    tracing::debug!(%fen, "rejecting invalid FEN");
                    return;
                }
                rest = &rest[end..];
            }
            _ => return,
        }

        if rest.first() == Some(&"moves") {
            for text in &rest[1..] {
                let Some(mv) = Move::from_text(text) else {
                    tracing::debug!(%text, "stopping at unparsable move");
                    break;
                };
                if !generate_all(&self.position).contains(&mv) {
                    tracing::debug!(%mv, "stopping at illegal move");
                    break;
                }
                self.position.make(mv);
            }
        }
    }

    fn cmd_go(&mut self, args: &[&str]) {
        let limits = parse_go(args, self.config.default_movetime_ms, self.position.side_to_move);

        // A `go` while a search is still running is ignored.
        if self.searcher.try_lock().is_err() {
            tracing::warn!("search already running, ignoring go");
            return;
        }

        self.stop.store(false, Ordering::Release);
        let searcher = Arc::clone(&self.searcher);
        let mut pos = self.position.clone();

        std::thread::spawn(move || {
            let Ok(mut searcher) = searcher.lock() else {
                return;
            };
            let best = searcher.think(&mut pos, &limits, &mut |info| println!("{info}"));
            match best {
                Some(mv) => println!("bestmove {mv}"),
                None => println!("bestmove 0000"),
            }
        });
    }

    fn cmd_setoption(&mut self, args: &[&str]) {
        // setoption name Hash value N
        if args.len() >= 4
            && args[0] == "name"
            && args[1].eq_ignore_ascii_case("hash")
            && args[2] == "value"
            && let Ok(mb) = args[3].parse::<usize>()
        {
            let mb = mb.clamp(1, 4096);
            self.stop.store(true, Ordering::Release);
            if let Ok(mut searcher) = self.searcher.lock() {
                searcher.resize_tt(mb);
                self.config.hash_mb = mb;
                tracing::info!(mb, "transposition table resized");
            }
        }
    }

    fn cmd_perft(&mut self, args: &[&str], out: &mut Vec<String>) {
        let Some(depth) = args.first().and_then(|t| t.parse::<u32>().ok()) else {
            return;
        };
        let mut scratch = self.position.clone();
        let start = Instant::now();
        let nodes = movegen::perft(&mut scratch, depth);
        let ms = start.elapsed().as_millis();
        out.push(format!("perft({depth}) = {nodes} ({ms} ms)"));
    }
}

// ---------------------------------------------------------------------------
// go-argument parsing
// ---------------------------------------------------------------------------

/// Translate `go` arguments into search limits. With a clock, spend about a
/// thirtieth of our remaining time, clamped to [100 ms, 10 s].
fn parse_go(args: &[&str], default_movetime_ms: u64, side: Color) -> SearchLimits {
    let mut depth = 0u32;
    let mut movetime = 0u64;
    let mut infinite = false;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;

    let mut it = args.iter();
    while let Some(&tok) = it.next() {
        match tok {
            "depth" => depth = it.next().and_then(|v| v.parse().ok()).unwrap_or(depth),
            "movetime" => movetime = it.next().and_then(|v| v.parse().ok()).unwrap_or(movetime),
            "infinite" => infinite = true,
            "wtime" => wtime = it.next().and_then(|v| v.parse().ok()),
            "btime" => btime = it.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    let our_time = match side {
        Color::Light => wtime,
        Color::Dark => btime,
    };

    let mut limits = SearchLimits {
        depth,
        movetime_ms: movetime,
        infinite,
    };
    if !infinite && movetime == 0 {
        if let Some(t) = our_time {
            limits.movetime_ms = (t / 30).clamp(100, 10_000);
        } else if depth > 0 {
            // Depth alone terminates the search.
            limits.infinite = true;
        } else {
            limits.movetime_ms = default_movetime_ms;
        }
    }
    limits
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    fn run(engine: &mut Engine, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        assert!(engine.handle_command(line, &mut out), "unexpected quit");
        out
    }

    #[test]
    fn init_identifies_engine() {
        let out = run(&mut engine(), "init");
        assert!(out[0].starts_with("id name"));
        assert!(out[1].starts_with("id author"));
        assert!(out[2].starts_with("option name Hash type spin default 128"));
        assert_eq!(out.last().unwrap(), "initok");
    }

    #[test]
    fn isready_answers_readyok() {
        assert_eq!(run(&mut engine(), "isready"), vec!["readyok"]);
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut e = engine();
        let mut out = Vec::new();
        assert!(!e.handle_command("quit", &mut out));
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut e = engine();
        assert!(run(&mut e, "xyzzy 123").is_empty());
        assert!(run(&mut e, "").is_empty());
    }

    #[test]
    fn position_startpos_with_moves() {
        let mut e = engine();
        run(&mut e, "position startpos moves a3a4 a7a6");
        assert_eq!(e.position.ply(), 2);
        assert_eq!(e.position.side_to_move, Color::Light);
    }

    #[test]
    fn position_stops_at_illegal_move() {
        let mut e = engine();
        // c3c4 steps a wolf into water: illegal, and the move after it must
        // not be applied either.
        run(&mut e, "position startpos moves a3a4 a7a6 c3c4 g3g4");
        assert_eq!(e.position.ply(), 2, "legal prefix only");
    }

    #[test]
    fn position_fen_loads() {
        let mut e = engine();
        run(&mut e, "position fen 7/3C3/7/7/7/7/7/7/t6 w");
        assert_eq!(e.position.to_fen(), "7/3C3/7/7/7/7/7/7/t6 w");
    }

    #[test]
    fn position_fen_with_moves() {
        let mut e = engine();
        run(&mut e, "position fen 7/3C3/7/7/7/7/7/7/t6 w moves d8d9");
        assert_eq!(e.position.ply(), 1);
    }

    #[test]
    fn position_invalid_fen_keeps_state() {
        let mut e = engine();
        let before = e.position.to_fen();
        run(&mut e, "position fen not a fen");
        assert_eq!(e.position.to_fen(), before);
    }

    #[test]
    fn display_shows_the_board() {
        let mut e = engine();
        let out = run(&mut e, "display");
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("light to move"));
    }

    #[test]
    fn eval_reports_perspective() {
        let mut e = engine();
        let out = run(&mut e, "eval");
        assert!(out[0].starts_with("eval = "));
        assert!(out[0].ends_with("(from light perspective)"));
    }

    #[test]
    fn moves_lists_the_legal_set() {
        let mut e = engine();
        let out = run(&mut e, "moves");
        assert!(out[0].starts_with("Legal moves (24):"));
    }

    #[test]
    fn perft_counts_leaves() {
        let mut e = engine();
        let out = run(&mut e, "perft 2");
        assert!(out[0].starts_with("perft(2) = 576 ("));
    }

    #[test]
    fn perft_without_depth_is_ignored() {
        let mut e = engine();
        assert!(run(&mut e, "perft").is_empty());
        assert!(run(&mut e, "perft x").is_empty());
    }

    #[test]
    fn newgame_resets_position() {
        let mut e = engine();
        run(&mut e, "position startpos moves a3a4");
        run(&mut e, "newgame");
        assert_eq!(e.position.ply(), 0);
        assert_eq!(e.position.to_fen(), Position::starting().to_fen());
    }

    #[test]
    fn setoption_resizes_hash() {
        let mut e = engine();
        run(&mut e, "setoption name Hash value 8");
        assert_eq!(e.config.hash_mb, 8);
        let out = run(&mut e, "init");
        assert!(out[2].contains("default 8"));
    }

    #[test]
    fn setoption_clamps_to_bounds() {
        let mut e = engine();
        run(&mut e, "setoption name Hash value 99999");
        assert_eq!(e.config.hash_mb, 4096);
    }

    #[test]
    fn setoption_garbage_is_ignored() {
        let mut e = engine();
        run(&mut e, "setoption name Hash value lots");
        assert_eq!(e.config.hash_mb, 128);
    }

    // -------------------------------------------------------------------
    // go-argument parsing
    // -------------------------------------------------------------------

    #[test]
    fn parse_go_depth_only_is_untimed() {
        let limits = parse_go(&["depth", "6"], 5_000, Color::Light);
        assert_eq!(limits.depth, 6);
        assert!(limits.infinite);
    }

    #[test]
    fn parse_go_movetime() {
        let limits = parse_go(&["movetime", "250"], 5_000, Color::Light);
        assert_eq!(limits.movetime_ms, 250);
        assert!(!limits.infinite);
    }

    #[test]
    fn parse_go_infinite() {
        let limits = parse_go(&["infinite"], 5_000, Color::Light);
        assert!(limits.infinite);
    }

    #[test]
    fn parse_go_clock_allocates_a_thirtieth() {
        let limits = parse_go(&["wtime", "60000", "btime", "30000"], 5_000, Color::Light);
        assert_eq!(limits.movetime_ms, 2_000);
        let limits = parse_go(&["wtime", "60000", "btime", "30000"], 5_000, Color::Dark);
        assert_eq!(limits.movetime_ms, 1_000);
    }

    #[test]
    fn parse_go_clock_clamps() {
        let limits = parse_go(&["wtime", "900"], 5_000, Color::Light);
        assert_eq!(limits.movetime_ms, 100);
        let limits = parse_go(&["wtime", "100000000"], 5_000, Color::Light);
        assert_eq!(limits.movetime_ms, 10_000);
    }

    #[test]
    fn parse_go_bare_uses_default() {
        let limits = parse_go(&[], 5_000, Color::Light);
        assert_eq!(limits.movetime_ms, 5_000);
        assert!(!limits.infinite);
    }
}
