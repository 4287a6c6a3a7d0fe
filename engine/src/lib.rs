pub mod error;
pub mod evaluator;
pub mod stockfish;
pub mod transport;
pub mod uci;

pub use error::EngineError;
pub use evaluator::{EvaluatorConfig, PositionEvaluator, UciEvaluator};
pub use stockfish::{find_stockfish_path, StockfishProcess};
pub use transport::EngineTransport;
pub use uci::{format_command, parse_uci_message, UciError, UciMessage};

use serde::{Deserialize, Serialize};

/// Saturated magnitude, in pawns, used for any forced-mate score.
pub const MATE_SCORE: f64 = 99.0;

/// Commands sent to the engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Uci,
    IsReady,
    NewGame,
    SetPosition { fen: String },
    SetOption { name: String, value: Option<String> },
    Go { depth: u8 },
    Stop,
    Quit,
}

/// The parts of an `info` line the evaluator acts on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub score: Option<Score>,
    /// Set when `score` is only a fail-high/fail-low bound.
    pub bound: Option<ScoreBound>,
    pub pv: Vec<String>, // Principal variation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Lower,
    Upper,
}

/// Score as reported by the engine, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}

impl Score {
    /// Pawns from the side to move's point of view. Mate saturates at `MATE_SCORE`.
    pub fn to_pawns(self) -> f64 {
        match self {
            Score::Centipawns(cp) => f64::from(cp) / 100.0,
            Score::Mate(n) if n > 0 => MATE_SCORE,
            Score::Mate(n) if n < 0 => -MATE_SCORE,
            // "mate 0": the side to move is already mated
            Score::Mate(_) => -MATE_SCORE,
        }
    }
}

/// Result of searching one position. `score` is always from White's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEvaluation {
    pub fen: String,
    pub score: f64,
    /// Standard UCI form; `None` when the side to move has no legal moves.
    pub best_move: Option<String>,
    pub depth: u32,
    /// Signed mate distance from White's point of view, when the score was a forced mate.
    pub mate: Option<i32>,
    pub pv: Vec<String>,
}

impl PositionEvaluation {
    pub fn is_mate(&self) -> bool {
        self.mate.is_some()
    }

    /// Score seen from `side`.
    pub fn score_for(&self, side: chess::Side) -> f64 {
        self.score * side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores_saturate() {
        assert_eq!(Score::Mate(3).to_pawns(), MATE_SCORE);
        assert_eq!(Score::Mate(-1).to_pawns(), -MATE_SCORE);
        assert_eq!(Score::Mate(0).to_pawns(), -MATE_SCORE);
        assert_eq!(Score::Centipawns(-250).to_pawns(), -2.5);
    }

    #[test]
    fn score_for_flips_for_black() {
        let eval = PositionEvaluation {
            fen: chess::START_FEN.into(),
            score: 1.5,
            best_move: Some("e2e4".into()),
            depth: 10,
            mate: None,
            pv: vec![],
        };
        assert_eq!(eval.score_for(chess::Side::White), 1.5);
        assert_eq!(eval.score_for(chess::Side::Black), -1.5);
        assert!(!eval.is_mate());
    }
}
