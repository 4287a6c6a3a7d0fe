use cozy_chess::{BitBoard, Board, Color, Piece, Square};

/// Returns the attack bitboard for a specific piece on a square.
pub fn piece_attacks(board: &Board, sq: Square, piece: Piece, color: Color) -> BitBoard {
    let occupied = board.occupied();
    match piece {
        Piece::Pawn => cozy_chess::get_pawn_attacks(sq, color),
        Piece::Knight => cozy_chess::get_knight_moves(sq),
        Piece::Bishop => cozy_chess::get_bishop_moves(sq, occupied),
        Piece::Rook => cozy_chess::get_rook_moves(sq, occupied),
        Piece::Queen => {
            cozy_chess::get_bishop_moves(sq, occupied) | cozy_chess::get_rook_moves(sq, occupied)
        }
        Piece::King => cozy_chess::get_king_moves(sq),
    }
}

/// Enemy pieces attacked by the piece standing on `sq`, in square order.
pub fn attacked_enemies(board: &Board, sq: Square) -> Vec<(Square, Piece)> {
    let (Some(piece), Some(color)) = (board.piece_on(sq), board.color_on(sq)) else {
        return Vec::new();
    };
    let targets = piece_attacks(board, sq, piece, color) & board.colors(!color);
    targets
        .into_iter()
        .filter_map(|target| board.piece_on(target).map(|p| (target, p)))
        .collect()
}

/// True when the side to move has a legal move landing on `sq`.
///
/// Run on the position right after a capture, this answers whether the
/// captured piece was protected. Legal-move generation accounts for pins
/// and checks, so a pinned "defender" does not count.
pub fn can_recapture(board: &Board, sq: Square) -> bool {
    let mut found = false;
    board.generate_moves(|mvs| {
        found = mvs.into_iter().any(|mv| mv.to == sq);
        found
    });
    found
}
