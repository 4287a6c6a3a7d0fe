use std::time::Duration;

use chess::ChessError;

/// Engine-session failures. `InitTimeout` and `AnalysisTimeout` are terminal
/// for a run: a session that stopped answering cannot be trusted afterwards.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine closed its output")]
    Closed,
    #[error("Engine did not report ready within {0:?}")]
    InitTimeout(Duration),
    #[error("Engine analysis of {fen} timed out after {timeout:?}")]
    AnalysisTimeout { fen: String, timeout: Duration },
    #[error("Engine session not initialized")]
    NotInitialized,
    #[error("Engine protocol error: {0}")]
    Protocol(String),
    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] ChessError),
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::InitTimeout(_) | Self::AnalysisTimeout { .. })
    }
}
