use analysis::{CandidateKind, Difficulty, TacticalAnalysis};
use chess::Side;
use serde::{Deserialize, Serialize};

use crate::puzzle::Puzzle;

/// Header facts about the game a position came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameContext {
    /// Position of the game in the run's input.
    pub game_index: usize,
    pub opponent: String,
    pub opponent_rating: Option<u32>,
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub opening: Option<String>,
    pub played_as: Side,
}

/// A ply that passed the mistake or reinforcement gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPosition {
    pub kind: CandidateKind,
    /// Position before the player's move.
    pub fen: String,
    pub best_move: String,
    pub best_move_san: String,
    pub player_move: String,
    pub player_move_san: String,
    /// White's point of view.
    pub eval_before: f64,
    pub eval_after: f64,
    /// Loss for the mover; positive is bad.
    pub eval_delta: f64,
    /// Zero-based half-move index in the game.
    pub ply: usize,
    pub move_number: u32,
    pub side: Side,
    pub clock_seconds: Option<f64>,
    pub difficulty: Difficulty,
    pub pattern: String,
    pub explanation: String,
    pub tactics: Option<TacticalAnalysis>,
    pub game: GameContext,
}

/// Where the run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Initializing,
    AnalyzingGame { index: usize },
    Completed,
    Failed,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub game_index: usize,
    pub total_games: usize,
    pub ply_index: usize,
    pub total_plies: usize,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedGame {
    pub game_index: usize,
    pub reason: String,
}

/// Final summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub total_games_analyzed: usize,
    /// Mistakes losing at least two pawns.
    pub blunders: usize,
    pub mistakes: usize,
    pub mistake_puzzles: Vec<Puzzle>,
    pub reinforcements: Vec<Puzzle>,
    pub skipped_games: Vec<SkippedGame>,
    /// The consumer went away before the run finished; the lists hold what was found until then.
    pub cancelled: bool,
}

/// Ordered output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnalysisEvent {
    #[serde(rename_all = "camelCase")]
    Started { total_games: usize },
    Progress(ProgressUpdate),
    GameSkipped(SkippedGame),
    /// The worst mistake of a finished game.
    Puzzle(Puzzle),
    Completed(AnalysisReport),
    Failed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged_camel_case() {
        let json = serde_json::to_value(AnalysisEvent::Started { total_games: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "started", "totalGames": 3}));

        let json = serde_json::to_value(AnalysisEvent::GameSkipped(SkippedGame {
            game_index: 1,
            reason: "unparseable".into(),
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "gameSkipped", "gameIndex": 1, "reason": "unparseable"})
        );
    }

    #[test]
    fn test_report_field_names() {
        let json = serde_json::to_value(AnalysisReport::default()).unwrap();
        for key in [
            "totalGamesAnalyzed",
            "blunders",
            "mistakes",
            "mistakePuzzles",
            "reinforcements",
            "skippedGames",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_run_state_serialization() {
        let json = serde_json::to_value(RunState::AnalyzingGame { index: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "analyzingGame", "index": 2}));
        assert!(RunState::Failed.is_finished());
        assert!(!RunState::Initializing.is_finished());
    }
}
