//! Critical-position extraction: runs an engine over a player's games and
//! turns the moves that mattered into training puzzles.

pub mod cache;
pub mod config;
pub mod error;
pub mod explain;
pub mod orchestrator;
pub mod puzzle;
pub mod types;

pub use cache::EvalCache;
pub use config::{EngineConfig, TrainerConfig};
pub use error::TrainerError;
pub use explain::{ExplanationGenerator, ExplanationRequest};
pub use orchestrator::Orchestrator;
pub use puzzle::Puzzle;
pub use types::{
    AnalysisEvent, AnalysisReport, CriticalPosition, GameContext, ProgressUpdate, RunState,
    SkippedGame,
};
