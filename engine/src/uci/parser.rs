use chess::parse_uci_move;

use crate::{EngineCommand, EngineInfo, Score, ScoreBound, UciError};

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent when the side to move has no moves.
    BestMove { mv: Option<String>, ponder: Option<String> },
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&mv) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let mv = match mv {
                "(none)" | "0000" => None,
                other => Some(validate_move(other)?),
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(p)) => validate_move(p).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse the fields of an `info` line (without the leading `info`).
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut rest = tokens.iter().copied().peekable();

    while let Some(key) = rest.next() {
        match key {
            "depth" => info.depth = rest.next().and_then(|s| s.parse().ok()),
            "score" => {
                info.score = parse_score(&mut rest);
                info.bound = match rest.next_if(|t| matches!(*t, "lowerbound" | "upperbound")) {
                    Some("lowerbound") => Some(ScoreBound::Lower),
                    Some(_) => Some(ScoreBound::Upper),
                    None => None,
                };
            }
            "pv" => {
                while let Some(token) = rest.next_if(|t| !is_keyword(t)) {
                    if let Ok(mv) = validate_move(token) {
                        info.pv.push(mv);
                    }
                }
            }
            // Free text to end of line
            "string" => break,
            // Single-valued fields the evaluator has no use for
            "seldepth" | "time" | "nodes" | "nps" | "multipv" | "currmove" | "currmovenumber"
            | "hashfull" | "tbhits" | "cpuload" | "sbhits" => {
                rest.next();
            }
            _ => {}
        }
    }

    info
}

fn parse_score<'a>(rest: &mut impl Iterator<Item = &'a str>) -> Option<Score> {
    let kind = rest.next()?;
    let value = rest.next()?;
    match kind {
        "cp" => value.parse().ok().map(Score::Centipawns),
        "mate" => value.parse().ok().map(Score::Mate),
        _ => None,
    }
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
            | "bmc"
            | "sbhits"
    )
}

fn validate_move(s: &str) -> Result<String, UciError> {
    parse_uci_move(s)
        .map(|_| s.to_string())
        .map_err(|_| UciError::InvalidMove(s.to_string()))
}

/// Render a command as the line sent to the engine (without newline).
pub fn format_command(cmd: &EngineCommand) -> String {
    match cmd {
        EngineCommand::Uci => "uci".to_string(),
        EngineCommand::IsReady => "isready".to_string(),
        EngineCommand::NewGame => "ucinewgame".to_string(),
        EngineCommand::SetOption { name, value: Some(value) } => {
            format!("setoption name {name} value {value}")
        }
        EngineCommand::SetOption { name, value: None } => format!("setoption name {name}"),
        EngineCommand::SetPosition { fen } => format!("position fen {fen}"),
        EngineCommand::Go { depth } => format!("go depth {depth}"),
        EngineCommand::Stop => "stop".to_string(),
        EngineCommand::Quit => "quit".to_string(),
    }
}
