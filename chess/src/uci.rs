//! UCI coordinate move codec.
//!
//! The outside world (engines, game records, puzzles) speaks standard UCI,
//! where castling is the king moving two squares (`e1g1`). cozy-chess encodes
//! castling as the king capturing its own rook (`e1h1`). Everything that
//! crosses a crate boundary is standard; conversion happens only when a move
//! meets a board.

use cozy_chess::{Board, File, Move, Piece, Square};

use crate::converters::{format_piece, format_square, parse_square};
use crate::error::ChessError;

/// Parse UCI move format (e2e4, e7e8q). Purely syntactic: no board involved.
pub fn parse_uci_move(s: &str) -> Result<Move, ChessError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(ChessError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2]).ok_or_else(|| ChessError::InvalidMove(s.to_string()))?;
    let to = parse_square(&s[2..4]).ok_or_else(|| ChessError::InvalidMove(s.to_string()))?;

    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return Err(ChessError::InvalidMove(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Convert a standard UCI move into the board's own encoding.
///
/// A king moving two files along its home rank becomes king-takes-rook when
/// that conversion is legal in `board`; every other move is returned as is.
pub fn to_board_move(board: &Board, mv: Move) -> Move {
    if mv.promotion.is_some() || board.piece_on(mv.from) != Some(Piece::King) {
        return mv;
    }
    if mv.from.rank() != mv.to.rank() {
        return mv;
    }

    let rook_file = match (mv.from.file(), mv.to.file()) {
        (File::E, File::G) => File::H,
        (File::E, File::C) => File::A,
        _ => return mv,
    };

    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

/// Convert a move in the board's encoding into standard UCI form.
pub fn from_board_move(board: &Board, mv: Move) -> Move {
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move());
    if !is_castle {
        return mv;
    }

    let king_file = if (mv.to.file() as usize) > (mv.from.file() as usize) {
        File::G
    } else {
        File::C
    };

    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}
