use std::collections::BTreeMap;

use cozy_chess::Board;

use super::san::{parse_san, SanError};
use crate::error::ChessError;
use crate::fen::{format_fen, parse_fen, START_FEN};
use crate::record::{GameHeaders, GameRecord, PlyRecord};
use crate::types::Side;
use crate::uci::{format_uci_move, from_board_move};

/// Split a multi-game PGN export into one text per game.
///
/// A new game starts at the first tag line that follows movetext.
pub fn split_games(input: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut seen_movetext = false;

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && seen_movetext {
            if !current.trim().is_empty() {
                games.push(std::mem::take(&mut current));
            }
            seen_movetext = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            seen_movetext = true;
        }
        current.push_str(line);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        games.push(current);
    }

    games
}

/// Parse one game of PGN text into a [`GameRecord`].
pub fn parse_game(input: &str) -> Result<GameRecord, PgnError> {
    if input.trim().is_empty() {
        return Err(PgnError::Empty);
    }

    let (tags, movetext) = split_tags(input)?;
    let headers = headers_from_tags(tags);

    let start_fen = match headers.tags.get("FEN") {
        Some(fen) => {
            let board = parse_fen(fen)?;
            format_fen(&board)
        }
        None => START_FEN.to_string(),
    };
    let mut board: Board = parse_fen(&start_fen)?;

    let mut plies: Vec<PlyRecord> = Vec::new();
    for token in tokenize_movetext(movetext) {
        match token {
            Token::San(san) => {
                let mv = parse_san(&board, &san).map_err(|source| PgnError::IllegalMove {
                    ply: plies.len() + 1,
                    san: san.clone(),
                    source,
                })?;
                let fen_before = format_fen(&board);
                let side = Side::from(board.side_to_move());
                let move_number = board.fullmove_number() as u32;
                let uci = format_uci_move(from_board_move(&board, mv));

                board.play_unchecked(mv);

                plies.push(PlyRecord {
                    san,
                    uci,
                    fen_before,
                    fen_after: format_fen(&board),
                    move_number,
                    side,
                    clock_seconds: None,
                    seconds_spent: None,
                });
            }
            Token::Comment(text) => {
                if let (Some(last), Some(clock)) = (plies.last_mut(), parse_clock(&text)) {
                    last.clock_seconds = Some(clock);
                }
            }
        }
    }

    fill_seconds_spent(&mut plies, headers.increment_seconds().unwrap_or(0.0));

    tracing::trace!(plies = plies.len(), white = %headers.white, black = %headers.black, "Parsed game");

    Ok(GameRecord {
        headers,
        start_fen,
        plies,
    })
}

fn split_tags(input: &str) -> Result<(BTreeMap<String, String>, &str), PgnError> {
    let mut tags = BTreeMap::new();
    let mut rest = input.trim_start();

    while rest.starts_with('[') {
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let close = rest[..line_end]
            .rfind(']')
            .ok_or_else(|| PgnError::InvalidTag(rest[..line_end].trim().to_string()))?;

        let (name, value) = parse_tag(&rest[1..close])?;
        tags.insert(name, value);
        rest = rest[close + 1..].trim_start();
    }

    Ok((tags, rest))
}

fn parse_tag(body: &str) -> Result<(String, String), PgnError> {
    let body = body.trim();
    let (name, value) = body
        .split_once(char::is_whitespace)
        .ok_or_else(|| PgnError::InvalidTag(body.to_string()))?;
    let value = value.trim();
    if name.is_empty() || value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return Err(PgnError::InvalidTag(body.to_string()));
    }
    let unescaped = value[1..value.len() - 1]
        .replace("\\\"", "\"")
        .replace("\\\\", "\\");
    Ok((name.to_string(), unescaped))
}

fn headers_from_tags(tags: BTreeMap<String, String>) -> GameHeaders {
    let known = |name: &str| {
        tags.get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "?" && v != "-" && !v.starts_with("????"))
    };
    let rating = |name: &str| known(name).and_then(|v| v.parse().ok());

    GameHeaders {
        white: known("White").unwrap_or_default(),
        black: known("Black").unwrap_or_default(),
        white_elo: rating("WhiteElo"),
        black_elo: rating("BlackElo"),
        date: known("Date").or_else(|| known("UTCDate")),
        time_control: known("TimeControl"),
        opening: known("Opening").or_else(|| known("ECO")),
        result: known("Result"),
        site: known("Site"),
        tags,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    San(String),
    Comment(String),
}

/// Break movetext into moves and comments. Variations, NAGs, move numbers and
/// result markers are dropped.
fn tokenize_movetext(movetext: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = movetext.chars();
    let mut variation_depth = 0usize;
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>, depth: usize| {
        if depth == 0 {
            if let Some(san) = san_from_word(word) {
                tokens.push(Token::San(san));
            }
        }
        word.clear();
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut word, &mut tokens, variation_depth);
                let comment: String = chars.by_ref().take_while(|c| *c != '}').collect();
                if variation_depth == 0 {
                    tokens.push(Token::Comment(comment));
                }
            }
            ';' => {
                flush(&mut word, &mut tokens, variation_depth);
                let comment: String = chars.by_ref().take_while(|c| *c != '\n').collect();
                if variation_depth == 0 {
                    tokens.push(Token::Comment(comment));
                }
            }
            '(' => {
                flush(&mut word, &mut tokens, variation_depth);
                variation_depth += 1;
            }
            ')' => {
                flush(&mut word, &mut tokens, variation_depth);
                variation_depth = variation_depth.saturating_sub(1);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens, variation_depth),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens, variation_depth);

    tokens
}

fn san_from_word(word: &str) -> Option<String> {
    if word.is_empty() || word.starts_with('$') {
        return None;
    }
    if matches!(word, "1-0" | "0-1" | "1/2-1/2" | "*") {
        return None;
    }
    // "12." / "12..." / "12.e4"
    let stripped = word.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
    let stripped = if stripped.len() < word.len() && word[..word.len() - stripped.len()].contains('.') {
        stripped
    } else {
        word
    };
    let san = stripped.trim_end_matches(['!', '?']);
    if san.is_empty() {
        None
    } else {
        Some(san.to_string())
    }
}

/// Extract `[%clk h:mm:ss]` from a comment, in seconds.
fn parse_clock(comment: &str) -> Option<f64> {
    let start = comment.find("%clk")? + "%clk".len();
    let value = comment[start..]
        .trim_start()
        .split(|c: char| c == ']' || c.is_whitespace())
        .next()?;

    let mut seconds = 0.0;
    for part in value.split(':') {
        let n: f64 = part.parse().ok()?;
        seconds = seconds * 60.0 + n;
    }
    Some(seconds)
}

/// Time spent on a move = previous clock of the same side - this clock + increment.
fn fill_seconds_spent(plies: &mut [PlyRecord], increment: f64) {
    let mut last_clock: [Option<f64>; 2] = [None, None];
    for ply in plies.iter_mut() {
        let idx = match ply.side {
            Side::White => 0,
            Side::Black => 1,
        };
        if let (Some(prev), Some(now)) = (last_clock[idx], ply.clock_seconds) {
            ply.seconds_spent = Some((prev - now + increment).max(0.0));
        }
        last_clock[idx] = ply.clock_seconds;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Empty PGN input")]
    Empty,
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Invalid starting position: {0}")]
    InvalidFen(#[from] ChessError),
    #[error("Illegal or unreadable move {san} at ply {ply}: {source}")]
    IllegalMove {
        ply: usize,
        san: String,
        #[source]
        source: SanError,
    },
}
