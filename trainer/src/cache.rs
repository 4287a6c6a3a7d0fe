use std::collections::HashMap;

use engine::{EngineError, PositionEvaluation, PositionEvaluator};

/// Per-run memo of engine evaluations keyed by exact FEN.
///
/// Lives for one analysis run and is dropped with it; nothing is persisted.
#[derive(Debug, Default)]
pub struct EvalCache {
    entries: HashMap<String, PositionEvaluation>,
    engine_calls: usize,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a position without touching the engine.
    pub fn get(&self, fen: &str) -> Option<&PositionEvaluation> {
        self.entries.get(fen)
    }

    /// Return the cached evaluation of `fen`, asking `evaluator` only on a miss.
    ///
    /// Failures are not cached.
    pub async fn get_or_compute<E>(
        &mut self,
        evaluator: &mut E,
        fen: &str,
        depth: u32,
    ) -> Result<PositionEvaluation, EngineError>
    where
        E: PositionEvaluator + ?Sized,
    {
        if let Some(hit) = self.entries.get(fen) {
            tracing::trace!(fen, "Evaluation cache hit");
            return Ok(hit.clone());
        }

        self.engine_calls += 1;
        let evaluation = evaluator.analyze_position(fen, depth).await?;
        self.entries.insert(fen.to_string(), evaluation.clone());
        Ok(evaluation)
    }

    /// Number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Engine calls issued through this cache, including failed ones.
    pub fn engine_calls(&self) -> usize {
        self.engine_calls
    }
}
