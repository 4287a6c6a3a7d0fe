//! PGN import: tag pairs, movetext, clocks, and the SAN codec.

pub mod parser;
pub mod san;

pub use parser::{parse_game, split_games, PgnError};
pub use san::{format_san, parse_san, SanError};
