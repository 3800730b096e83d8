pub mod board;
pub mod movegen;
pub mod tables;
pub mod types;
pub mod zobrist;

pub use board::Position;
pub use movegen::{generate_all, generate_captures, perft};
pub use types::*;
