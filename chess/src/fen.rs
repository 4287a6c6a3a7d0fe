use cozy_chess::Board;

use crate::error::ChessError;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
///
/// cozy-chess validates the position while parsing (king counts, side not to
/// move not in check, consistent castling and en-passant data), so a board
/// returned here is one the move generator can work with.
pub fn parse_fen(fen: &str) -> Result<Board, ChessError> {
    let trimmed = fen.trim();
    if trimmed.split_whitespace().count() < 4 {
        return Err(ChessError::InvalidFen(fen.to_string()));
    }
    Board::from_fen(trimmed, false).map_err(|_| ChessError::InvalidFen(fen.to_string()))
}

/// Check that `fen` describes a position the move generator accepts.
pub fn validate_fen(fen: &str) -> Result<(), ChessError> {
    parse_fen(fen).map(|_| ())
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}
