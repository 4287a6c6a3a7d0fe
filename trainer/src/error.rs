use engine::EngineError;

/// Failures that end an analysis run.
///
/// Per-game parse problems and per-ply legality problems never reach this
/// type; the orchestrator skips the game or ply and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TrainerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Engine(e) if e.is_timeout())
    }
}
