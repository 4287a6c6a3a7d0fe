//! Eval-loss classification of a single ply: is it a mistake worth a puzzle,
//! a reinforcement moment, or neither.

use chess::Side;
use serde::{Deserialize, Serialize};

use crate::board_analysis::TacticalTheme;

pub const DEFAULT_EVAL_THRESHOLD: f64 = 1.0;
pub const DEFAULT_DECIDED_THRESHOLD: f64 = 7.0;

/// Losses at or above this are counted as blunders rather than mistakes.
pub const BLUNDER_DELTA: f64 = 2.0;
const OUTRIGHT_BLUNDER_DELTA: f64 = 3.0;

const REINFORCEMENT_MAX_DELTA: f64 = -0.3;
const REINFORCEMENT_MIN_EVAL: f64 = 0.5;

const LOW_CLOCK_SECONDS: f64 = 10.0;
const TIME_PRESSURE_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Big blunders are easy to spot; small losses and calm clocks make hard puzzles.
    pub fn from_delta(delta: f64, clock_seconds: Option<f64>) -> Self {
        if delta >= OUTRIGHT_BLUNDER_DELTA {
            Difficulty::Easy
        } else if delta >= BLUNDER_DELTA || clock_seconds.is_some_and(|c| c < LOW_CLOCK_SECONDS) {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Mistake,
    Reinforcement,
}

/// Eval loss for the side that moved. Positive means the mover made things worse.
pub fn eval_delta(eval_before: f64, eval_after: f64, side: Side) -> f64 {
    match side {
        Side::White => eval_before - eval_after,
        Side::Black => eval_after - eval_before,
    }
}

pub fn is_blunder(delta: f64) -> bool {
    delta >= BLUNDER_DELTA
}

/// Descriptive category for plies the motif detector could not name.
pub fn fallback_pattern(delta: f64, clock_seconds: Option<f64>) -> &'static str {
    if clock_seconds.is_some_and(|c| c < TIME_PRESSURE_SECONDS) {
        "Time Pressure Blunder"
    } else if delta >= OUTRIGHT_BLUNDER_DELTA {
        "Hanging Piece"
    } else if delta >= BLUNDER_DELTA {
        "Missed Tactic"
    } else {
        "Positional Error"
    }
}

/// Puzzle pattern: the detected theme unless it is missing or too generic.
pub fn pattern_label(theme: Option<TacticalTheme>, delta: f64, clock_seconds: Option<f64>) -> String {
    match theme {
        Some(theme) if !theme.is_generic() => theme.pattern_name().to_string(),
        _ => fallback_pattern(delta, clock_seconds).to_string(),
    }
}

/// Number of leading half-moves never classified.
pub fn opening_skip_plies(skip_opening_moves: u32) -> usize {
    skip_opening_moves as usize * 2
}

/// Gates applied to every evaluated ply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Minimum eval loss, in pawns, for a mistake.
    pub mistake: f64,
    /// Positions beyond this magnitude are considered already decided.
    pub decided: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mistake: DEFAULT_EVAL_THRESHOLD,
            decided: DEFAULT_DECIDED_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn is_decided(&self, eval: f64) -> bool {
        eval.abs() > self.decided
    }

    /// Mistake is checked first; a ply is never both.
    ///
    /// `played` and `best` are standard UCI moves; reinforcement requires an
    /// exact match with the engine's choice.
    pub fn classify(
        &self,
        delta: f64,
        eval_before: f64,
        played: &str,
        best: Option<&str>,
    ) -> Option<CandidateKind> {
        if delta >= self.mistake {
            return Some(CandidateKind::Mistake);
        }
        let matched_engine = best.is_some_and(|best| best == played);
        if delta <= REINFORCEMENT_MAX_DELTA
            && matched_engine
            && eval_before.abs() > REINFORCEMENT_MIN_EVAL
        {
            return Some(CandidateKind::Reinforcement);
        }
        None
    }
}
