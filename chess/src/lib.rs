//! Game record model and the chess primitives the analysis pipeline consumes:
//! FEN and UCI codecs, legality checks, and PGN import.

pub mod converters;
pub mod error;
pub mod fen;
pub mod legal;
pub mod pgn;
pub mod record;
pub mod types;
pub mod uci;

pub use error::ChessError;
pub use fen::{format_fen, parse_fen, validate_fen, START_FEN};
pub use legal::{is_checkmate, is_legal_uci, is_stalemate, legal_moves, parse_legal_move, play, validate_move};
pub use record::{GameHeaders, GameRecord, PlyRecord};
pub use types::{PieceKind, Side};
pub use uci::{format_uci_move, from_board_move, parse_uci_move, to_board_move};
