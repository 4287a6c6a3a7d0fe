use cozy_chess::{Board, Move, Piece, Square};

use crate::converters::{char_to_file, char_to_rank, file_to_char, format_square, parse_square};
use crate::legal::{is_checkmate, legal_moves};

/// Parse Standard Algebraic Notation (SAN) against the legal moves of `board`.
/// Returns the move in the board's own encoding.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let text = san.trim_end_matches(['+', '#', '!', '?']);
    if text.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    if let Some(kingside) = castle_side(text) {
        return legal
            .into_iter()
            .find(|mv| is_castle(board, *mv) && is_kingside(*mv) == kingside)
            .ok_or_else(|| SanError::NoLegalMove(san.to_string()));
    }

    let (piece, rest) = match text.chars().next() {
        Some(c @ ('N' | 'B' | 'R' | 'Q' | 'K')) => (piece_from_letter(c), &text[1..]),
        _ => (Piece::Pawn, text),
    };

    let (body, promotion) = split_promotion(rest, san)?;
    let body: String = body.chars().filter(|c| *c != 'x' && *c != '-').collect();
    if body.len() < 2 || !body.is_ascii() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let (disambiguation, dest) = body.split_at(body.len() - 2);
    let to = parse_square(dest).ok_or_else(|| SanError::InvalidSquare(dest.to_string()))?;

    let mut from_file = None;
    let mut from_rank = None;
    for c in disambiguation.chars() {
        if let Some(file) = char_to_file(c) {
            from_file = Some(file);
        } else if let Some(rank) = char_to_rank(c) {
            from_rank = Some(rank);
        } else {
            return Err(SanError::InvalidFormat(san.to_string()));
        }
    }

    let mut candidates = legal.into_iter().filter(|mv| {
        mv.to == to
            && board.piece_on(mv.from) == Some(piece)
            && !is_castle(board, *mv)
            && mv.promotion == promotion
            && from_file.map_or(true, |f| mv.from.file() == f)
            && from_rank.map_or(true, |r| mv.from.rank() == r)
    });

    match (candidates.next(), candidates.next()) {
        (Some(mv), None) => Ok(mv),
        (None, _) => Err(SanError::NoLegalMove(san.to_string())),
        (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format a legal move (board encoding) as SAN, with check and mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = String::new();

    if is_castle(board, mv) {
        san.push_str(if is_kingside(mv) { "O-O" } else { "O-O-O" });
    } else {
        let Some(piece) = board.piece_on(mv.from) else {
            return crate::uci::format_uci_move(mv);
        };
        let is_capture = board.color_on(mv.to) == Some(!board.side_to_move())
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            if is_capture {
                san.push(file_to_char(mv.from.file()));
            }
        } else {
            san.push(piece_letter(piece));
            san.push_str(&disambiguation(board, mv, piece));
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
    }

    let mut after = board.clone();
    if after.try_play(mv).is_ok() && !after.checkers().is_empty() {
        san.push(if is_checkmate(&after) { '#' } else { '+' });
    }

    san
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to && other.from != mv.from && board.piece_on(other.from) == Some(piece)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let from = format_square(mv.from);
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        from[..1].to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        from[1..].to_string()
    } else {
        from
    }
}

fn split_promotion<'a>(rest: &'a str, san: &str) -> Result<(&'a str, Option<Piece>), SanError> {
    if let Some((body, promo)) = rest.split_once('=') {
        let piece = promo
            .chars()
            .next()
            .filter(|c| matches!(c, 'Q' | 'R' | 'B' | 'N'))
            .map(piece_from_letter)
            .ok_or_else(|| SanError::InvalidPromotion(san.to_string()))?;
        return Ok((body, Some(piece)));
    }

    // Some exporters omit the '=' ("e8Q").
    match rest.chars().last() {
        Some(c @ ('Q' | 'R' | 'B' | 'N')) => Ok((&rest[..rest.len() - 1], Some(piece_from_letter(c)))),
        _ => Ok((rest, None)),
    }
}

fn castle_side(text: &str) -> Option<bool> {
    match text {
        "O-O" | "0-0" => Some(true),
        "O-O-O" | "0-0-0" => Some(false),
        _ => None,
    }
}

fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King) && board.color_on(mv.to) == Some(board.side_to_move())
}

fn is_kingside(mv: Move) -> bool {
    (mv.to.file() as usize) > (mv.from.file() as usize)
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn piece_from_letter(c: char) -> Piece {
    match c {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        _ => Piece::Pawn,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
