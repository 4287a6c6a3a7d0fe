use std::time::{SystemTime, UNIX_EPOCH};

use analysis::{CandidateKind, Difficulty};
use chess::Side;
use serde::{Deserialize, Serialize};

use crate::types::CriticalPosition;

/// Training position handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    /// Unique within one run.
    pub id: String,
    pub kind: CandidateKind,
    pub fen: String,
    pub best_move: String,
    pub best_move_san: String,
    pub played_move: String,
    pub played_move_san: String,
    pub pattern: String,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub eval_before: f64,
    pub eval_after: f64,
    pub eval_delta: f64,
    pub move_number: u32,
    pub side: Side,
    pub clock_seconds: Option<f64>,
    pub game_index: usize,
    pub opponent: String,
    pub opponent_rating: Option<u32>,
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub opening: Option<String>,
    pub played_as: Side,
}

impl Puzzle {
    /// Materialize with an id built from the current time and `index`.
    pub fn materialize(position: &CriticalPosition, index: usize) -> Self {
        Self::from_critical(position, index, now_millis())
    }

    /// Copy `position` verbatim under the id `{created_at_ms}-{index}`.
    pub fn from_critical(position: &CriticalPosition, index: usize, created_at_ms: u128) -> Self {
        let game = &position.game;
        Self {
            id: format!("{created_at_ms}-{index}"),
            kind: position.kind,
            fen: position.fen.clone(),
            best_move: position.best_move.clone(),
            best_move_san: position.best_move_san.clone(),
            played_move: position.player_move.clone(),
            played_move_san: position.player_move_san.clone(),
            pattern: position.pattern.clone(),
            difficulty: position.difficulty,
            explanation: position.explanation.clone(),
            eval_before: position.eval_before,
            eval_after: position.eval_after,
            eval_delta: position.eval_delta,
            move_number: position.move_number,
            side: position.side,
            clock_seconds: position.clock_seconds,
            game_index: game.game_index,
            opponent: game.opponent.clone(),
            opponent_rating: game.opponent_rating,
            date: game.date.clone(),
            time_control: game.time_control.clone(),
            opening: game.opening.clone(),
            played_as: game.played_as,
        }
    }
}

pub(crate) fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
