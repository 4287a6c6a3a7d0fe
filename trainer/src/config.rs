//! Run configuration.
//!
//! Values come from, in increasing priority:
//! 1. Built-in defaults
//! 2. Environment variables (`STOCKFISH_PATH`, `TRAINER_*`)
//! 3. Command-line flags (applied by the binary)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use analysis::{Thresholds, DEFAULT_DECIDED_THRESHOLD, DEFAULT_EVAL_THRESHOLD};
use engine::EvaluatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::TrainerError;

const DEFAULT_DEPTH: u32 = 15;
const DEFAULT_SKIP_OPENING_MOVES: u32 = 8;
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXPLAIN_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrainerConfig {
    /// Engine search depth per position.
    pub depth: u32,
    /// Minimum eval loss, in pawns, for a mistake.
    pub eval_threshold: f64,
    /// Full moves at the start of each game that are never classified.
    pub skip_opening_moves: u32,
    /// Eval magnitude beyond which a position counts as already decided.
    pub decided_threshold: f64,
    /// Longest wait for the optional explanation generator before falling back to the template.
    pub explain_timeout_ms: u64,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Engine binary; probed from common install locations when unset.
    pub path: Option<PathBuf>,
    pub threads: u32,
    pub hash_mb: u32,
    pub init_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            eval_threshold: DEFAULT_EVAL_THRESHOLD,
            skip_opening_moves: DEFAULT_SKIP_OPENING_MOVES,
            decided_threshold: DEFAULT_DECIDED_THRESHOLD,
            explain_timeout_ms: DEFAULT_EXPLAIN_TIMEOUT_MS,
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            threads: 1,
            hash_mb: 64,
            init_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            analysis_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            threads: self.threads,
            hash_mb: self.hash_mb,
            init_timeout: Duration::from_secs(self.init_timeout_secs),
            analysis_timeout: Duration::from_secs(self.analysis_timeout_secs),
        }
    }
}

impl TrainerConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, TrainerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrainerError> {
        let mut config = Self::default();

        if let Some(path) = lookup("STOCKFISH_PATH").filter(|p| !p.trim().is_empty()) {
            config.engine.path = Some(PathBuf::from(path));
        }
        if let Some(depth) = parse_var(&lookup, "TRAINER_DEPTH")? {
            config.depth = depth;
        }
        if let Some(threshold) = parse_var(&lookup, "TRAINER_EVAL_THRESHOLD")? {
            config.eval_threshold = threshold;
        }
        if let Some(skip) = parse_var(&lookup, "TRAINER_SKIP_OPENING_MOVES")? {
            config.skip_opening_moves = skip;
        }
        if let Some(secs) = parse_var(&lookup, "TRAINER_ENGINE_TIMEOUT_SECS")? {
            config.engine.init_timeout_secs = secs;
            config.engine.analysis_timeout_secs = secs;
        }
        if let Some(ms) = parse_var(&lookup, "TRAINER_EXPLAIN_TIMEOUT_MS")? {
            config.explain_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.depth == 0 {
            return Err(TrainerError::Config("depth must be at least 1".into()));
        }
        if self.eval_threshold.is_nan() || self.eval_threshold <= 0.0 {
            return Err(TrainerError::Config(format!(
                "eval threshold must be positive, got {}",
                self.eval_threshold
            )));
        }
        if self.decided_threshold.is_nan() || self.decided_threshold <= 0.0 {
            return Err(TrainerError::Config(format!(
                "decided threshold must be positive, got {}",
                self.decided_threshold
            )));
        }
        if self.engine.init_timeout_secs == 0 || self.engine.analysis_timeout_secs == 0 {
            return Err(TrainerError::Config("engine timeouts must be at least 1 second".into()));
        }
        if self.explain_timeout_ms == 0 {
            return Err(TrainerError::Config("explain timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn explain_timeout(&self) -> Duration {
        Duration::from_millis(self.explain_timeout_ms)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            mistake: self.eval_threshold,
            decided: self.decided_threshold,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, TrainerError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| TrainerError::Config(format!("{name} has an invalid value: {raw:?}")))
}
