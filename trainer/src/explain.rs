use async_trait::async_trait;
use chess::Side;
use serde::{Deserialize, Serialize};

/// Everything an external writer gets to describe one critical position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub fen: String,
    pub best_move: String,
    pub played_move: String,
    pub eval_before: f64,
    pub eval_after: f64,
    pub side: Side,
    pub move_number: u32,
    pub opponent: String,
    pub pattern: String,
}

/// Pluggable natural-language explanation source.
///
/// Optional: without one, or when it fails, puzzles keep the explanation
/// assembled from the detected tactics.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn explain(&self, request: &ExplanationRequest) -> anyhow::Result<String>;
}
