use chess::pgn::format_san;
use chess::{
    converters::format_square, from_board_move, is_checkmate, parse_fen, parse_legal_move, play,
    ChessError, PieceKind, Side,
};
use cozy_chess::{Board, Color, Move, Piece, Square};
use smallvec::SmallVec;

use super::helpers::{attacked_enemies, can_recapture};
use super::tactical_types::{TacticalAnalysis, TacticalTheme};

/// Scores at or beyond this magnitude are reported as mate, not as pawns.
const MATE_LABEL_THRESHOLD: f64 = 90.0;

/// Targets worth at least a minor piece count for forks and check-and-win.
const MINOR_PIECE_VALUE: u8 = 3;

/// Everything the motif checks need about one move.
struct MoveContext<'a> {
    before: &'a Board,
    after: Board,
    mv: Move,
    mover: Color,
    piece: Piece,
    /// Destination in standard form; for castling, the king's square.
    to: Square,
}

impl MoveContext<'_> {
    fn is_castle(&self) -> bool {
        self.before.color_on(self.mv.to) == Some(self.mover)
    }

    fn captured(&self) -> Option<Piece> {
        if self.is_castle() {
            return None;
        }
        match self.before.color_on(self.mv.to) {
            Some(_) => self.before.piece_on(self.mv.to),
            // En passant: a pawn changing file onto an empty square.
            None if self.piece == Piece::Pawn && self.mv.from.file() != self.mv.to.file() => {
                Some(Piece::Pawn)
            }
            None => None,
        }
    }

    /// Piece standing on the destination after the move.
    fn landed(&self) -> Piece {
        self.mv.promotion.unwrap_or(self.piece)
    }

    fn valuable_targets(&self) -> Vec<(Square, Piece)> {
        attacked_enemies(&self.after, self.to)
            .into_iter()
            .filter(|(_, p)| *p == Piece::King || value(*p) >= MINOR_PIECE_VALUE)
            .collect()
    }
}

#[derive(Default)]
struct Findings {
    theme: Option<TacticalTheme>,
    clauses: Vec<String>,
    pieces: SmallVec<[PieceKind; 6]>,
}

impl Findings {
    fn involve(&mut self, piece: Piece) {
        let kind = PieceKind::from(piece);
        if !self.pieces.contains(&kind) {
            self.pieces.push(kind);
        }
    }

    fn finish(self) -> TacticalAnalysis {
        TacticalAnalysis {
            theme: self.theme.unwrap_or(TacticalTheme::Positional),
            explanation: self.clauses,
            pieces_involved: self.pieces.iter().map(|k| k.name().to_string()).collect(),
        }
    }
}

/// Work out what the engine's `best_move` achieves in `fen`.
///
/// Scores are White's point of view; the eval clause is rewritten for the side
/// to move. The motifs are checked in priority order: mate ends the search,
/// a fork overrides any capture theme, promotion stacks on top of the rest.
pub fn detect_tactics(
    fen: &str,
    best_move: &str,
    player_move: Option<&str>,
    eval_before: Option<f64>,
    eval_after: Option<f64>,
) -> Result<TacticalAnalysis, ChessError> {
    let before = parse_fen(fen)?;
    let mv = parse_legal_move(&before, best_move)?;
    let piece = before
        .piece_on(mv.from)
        .ok_or_else(|| ChessError::InvalidMove(best_move.to_string()))?;
    let ctx = MoveContext {
        after: play(&before, mv)?,
        before: &before,
        mv,
        mover: before.side_to_move(),
        piece,
        to: from_board_move(&before, mv).to,
    };

    let mut found = Findings::default();

    if is_checkmate(&ctx.after) {
        found.theme = Some(TacticalTheme::Checkmate);
        found.involve(ctx.landed());
        found.clauses.push(format!(
            "The {} on {} delivers checkmate.",
            name(ctx.landed()),
            format_square(ctx.to)
        ));
        return Ok(found.finish());
    }

    capture_motif(&ctx, &mut found);
    fork_motif(&ctx, &mut found);
    check_motif(&ctx, &mut found);
    promotion_motif(&ctx, &mut found);

    if found.clauses.is_empty() {
        found.theme = Some(TacticalTheme::Positional);
        found.involve(ctx.piece);
        found.clauses.push(format!(
            "The {} moves to {}, improving its position.",
            name(ctx.piece),
            format_square(ctx.to)
        ));
    }

    if let Some(played) = player_move.filter(|played| *played != best_move) {
        let played = parse_legal_move(&before, played)?;
        found
            .clauses
            .push(format!("The game continued {} instead.", format_san(&before, played)));
    }

    if let (Some(b), Some(a)) = (eval_before, eval_after) {
        let sign = Side::from(ctx.mover).sign();
        found.clauses.push(format!(
            "(evaluation {} -> {})",
            format_eval(b * sign),
            format_eval(a * sign)
        ));
    }

    Ok(found.finish())
}

fn capture_motif(ctx: &MoveContext<'_>, found: &mut Findings) {
    let Some(victim) = ctx.captured() else {
        return;
    };
    found.involve(ctx.piece);
    found.involve(victim);
    let sq = format_square(ctx.to);

    // A king never trades itself, so it always wins the exchange it survives.
    let attacker_value = if ctx.piece == Piece::King {
        u8::MAX
    } else {
        value(ctx.piece)
    };

    if value(victim) > attacker_value {
        found.theme = Some(TacticalTheme::WinningCapture);
        found.clauses.push(format!(
            "The {} captures the {} on {}, winning material.",
            name(ctx.piece),
            name(victim),
            sq
        ));
    } else if !can_recapture(&ctx.after, ctx.to) {
        found.theme = Some(TacticalTheme::HangingPiece);
        found.clauses.push(format!(
            "The {} on {} is undefended and can be taken for free.",
            name(victim),
            sq
        ));
    } else {
        found.theme = Some(TacticalTheme::Capture);
        found.clauses.push(format!(
            "The {} takes the {} on {}.",
            name(ctx.piece),
            name(victim),
            sq
        ));
    }
}

fn fork_motif(ctx: &MoveContext<'_>, found: &mut Findings) {
    let targets = ctx.valuable_targets();
    if targets.len() < 2 {
        return;
    }

    found.theme = Some(TacticalTheme::Fork);
    found.involve(ctx.landed());
    for (_, target) in &targets {
        found.involve(*target);
    }
    let names: Vec<String> = targets
        .iter()
        .map(|(sq, p)| format!("the {} on {}", name(*p), format_square(*sq)))
        .collect();
    found.clauses.push(format!(
        "The {} on {} forks {}.",
        name(ctx.landed()),
        format_square(ctx.to),
        join_list(&names)
    ));
}

fn check_motif(ctx: &MoveContext<'_>, found: &mut Findings) {
    let checkers = ctx.after.checkers();
    if checkers.is_empty() {
        return;
    }
    found.involve(Piece::King);

    let direct = checkers.has(ctx.to);
    if !direct && !ctx.is_castle() {
        found
            .clauses
            .push(format!("Moving the {} uncovers a discovered check.", name(ctx.piece)));
    }

    if found.theme == Some(TacticalTheme::Fork) {
        return;
    }

    let won = ctx
        .valuable_targets()
        .into_iter()
        .filter(|(_, p)| *p != Piece::King)
        .max_by_key(|(_, p)| value(*p));

    match won {
        Some((sq, target)) => {
            found.theme = Some(TacticalTheme::CheckAndWin);
            found.involve(ctx.landed());
            found.involve(target);
            found.clauses.push(format!(
                "The {} gives check and attacks the {} on {}.",
                name(ctx.landed()),
                name(target),
                format_square(sq)
            ));
        }
        None => {
            if found.theme.map_or(true, TacticalTheme::is_generic) {
                found.theme = Some(TacticalTheme::Check);
            }
            if direct {
                found.involve(ctx.landed());
                found.clauses.push(format!(
                    "The {} on {} gives check.",
                    name(ctx.landed()),
                    format_square(ctx.to)
                ));
            }
        }
    }
}

fn promotion_motif(ctx: &MoveContext<'_>, found: &mut Findings) {
    let Some(promoted) = ctx.mv.promotion else {
        return;
    };
    found.involve(Piece::Pawn);
    found.involve(promoted);
    if found.theme.is_none() {
        found.theme = Some(TacticalTheme::Promotion);
    }
    found.clauses.push(format!(
        "The pawn promotes to a {} on {}.",
        name(promoted),
        format_square(ctx.to)
    ));
}

fn value(piece: Piece) -> u8 {
    PieceKind::from(piece).value()
}

fn name(piece: Piece) -> &'static str {
    PieceKind::from(piece).name()
}

fn format_eval(score: f64) -> String {
    if score >= MATE_LABEL_THRESHOLD {
        "Mate".to_string()
    } else if score <= -MATE_LABEL_THRESHOLD {
        "-Mate".to_string()
    } else {
        format!("{:+.1}", score)
    }
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
