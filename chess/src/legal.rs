//! Legality checks backed by full move generation.

use cozy_chess::{Board, Move};

use crate::error::ChessError;
use crate::fen::{format_fen, parse_fen};
use crate::uci::{format_uci_move, parse_uci_move, to_board_move};

/// Get all legal moves for a position, in the board's own encoding.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// True when the side to move has at least one legal move.
pub fn has_legal_moves(board: &Board) -> bool {
    let mut any = false;
    board.generate_moves(|mvs| {
        any = mvs.len() > 0;
        any
    });
    any
}

/// Side to move is in check and has no way out.
pub fn is_checkmate(board: &Board) -> bool {
    !board.checkers().is_empty() && !has_legal_moves(board)
}

/// Side to move is not in check and has no legal move.
pub fn is_stalemate(board: &Board) -> bool {
    board.checkers().is_empty() && !has_legal_moves(board)
}

/// Parse a standard UCI move and confirm it is legal in `board`.
/// Returns the move in the board's encoding, ready to play.
pub fn parse_legal_move(board: &Board, uci: &str) -> Result<Move, ChessError> {
    let mv = to_board_move(board, parse_uci_move(uci)?);
    if board.is_legal(mv) {
        Ok(mv)
    } else {
        Err(ChessError::IllegalMove {
            fen: format_fen(board),
            mv: uci.to_string(),
        })
    }
}

/// Validate a FEN plus a UCI move in one step.
pub fn validate_move(fen: &str, uci: &str) -> Result<(), ChessError> {
    let board = parse_fen(fen)?;
    parse_legal_move(&board, uci).map(|_| ())
}

pub fn is_legal_uci(fen: &str, uci: &str) -> bool {
    validate_move(fen, uci).is_ok()
}

/// Play a legal move on a copy of `board`.
pub fn play(board: &Board, mv: Move) -> Result<Board, ChessError> {
    let mut next = board.clone();
    next.try_play(mv).map_err(|_| ChessError::IllegalMove {
        fen: format_fen(board),
        mv: format_uci_move(mv),
    })?;
    Ok(next)
}
