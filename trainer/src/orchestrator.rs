//! Drives one analysis run: games in input order, plies in game order, one
//! engine call at a time.

use std::future::Future;
use std::sync::Arc;

use analysis::{
    detect_tactics, eval_delta, is_blunder, opening_skip_plies, pattern_label, CandidateKind,
    Difficulty, TacticalAnalysis, Thresholds,
};
use chess::pgn::{format_san, parse_game};
use chess::{parse_fen, parse_legal_move, validate_move, GameRecord, PlyRecord, Side};
use engine::{PositionEvaluation, PositionEvaluator};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::cache::EvalCache;
use crate::config::TrainerConfig;
use crate::error::TrainerError;
use crate::explain::{ExplanationGenerator, ExplanationRequest};
use crate::puzzle::{now_millis, Puzzle};
use crate::types::{
    AnalysisEvent, AnalysisReport, CriticalPosition, GameContext, ProgressUpdate, RunState,
    SkippedGame,
};

const EVENT_BUFFER: usize = 64;

/// Owns the engine session for exactly one run.
pub struct Orchestrator<E> {
    evaluator: E,
    config: TrainerConfig,
    explainer: Option<Arc<dyn ExplanationGenerator>>,
    state: watch::Sender<RunState>,
}

impl<E: PositionEvaluator> Orchestrator<E> {
    pub fn new(evaluator: E, config: TrainerConfig) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            evaluator,
            config,
            explainer: None,
            state,
        }
    }

    /// Use `explainer` for puzzle explanations, falling back to the tactic summary.
    pub fn with_explainer(mut self, explainer: Arc<dyn ExplanationGenerator>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state changes, including after the orchestrator moved into a task.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Run in a background task. Dropping the stream cancels the run.
    pub fn spawn(
        self,
        username: String,
        games: Vec<String>,
    ) -> (
        ReceiverStream<AnalysisEvent>,
        JoinHandle<Result<AnalysisReport, TrainerError>>,
    )
    where
        E: 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(async move { self.run(&username, &games, tx).await });
        (ReceiverStream::new(rx), handle)
    }

    /// Analyze `games` (raw PGN, one game per entry) for the player `username`.
    ///
    /// The engine session is initialized here and terminated before returning,
    /// whatever the outcome. Engine failures end the run with an error and a
    /// `Failed` event. When `events` is closed the run stops early and returns
    /// what it found so far with `cancelled` set.
    #[tracing::instrument(level = "info", skip(self, games, events), fields(games = games.len()))]
    pub async fn run(
        mut self,
        username: &str,
        games: &[String],
        events: mpsc::Sender<AnalysisEvent>,
    ) -> Result<AnalysisReport, TrainerError> {
        let mut run = Run {
            evaluator: &mut self.evaluator,
            config: &self.config,
            thresholds: self.config.thresholds(),
            explainer: self.explainer.as_deref(),
            state: &self.state,
            cache: EvalCache::new(),
            events: &events,
            report: AnalysisReport::default(),
            started_at_ms: now_millis(),
            puzzle_count: 0,
        };

        let outcome = run.drive(username, games).await;
        let calls = run.cache.engine_calls();
        let mut report = std::mem::take(&mut run.report);
        drop(run);

        self.evaluator.terminate().await;

        match outcome {
            Ok(()) => {
                self.state.send_replace(RunState::Completed);
                tracing::info!(
                    games = report.total_games_analyzed,
                    blunders = report.blunders,
                    mistakes = report.mistakes,
                    reinforcements = report.reinforcements.len(),
                    engine_calls = calls,
                    "Analysis complete"
                );
                let _ = events.send(AnalysisEvent::Completed(report.clone())).await;
                Ok(report)
            }
            Err(TrainerError::Cancelled) => {
                tracing::info!(engine_calls = calls, "Analysis cancelled by consumer");
                self.state.send_replace(RunState::Completed);
                report.cancelled = true;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Analysis failed: {}", e);
                self.state.send_replace(RunState::Failed);
                let _ = events
                    .send(AnalysisEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }
}

/// Borrowed state of one run in progress.
struct Run<'a, E: ?Sized> {
    evaluator: &'a mut E,
    config: &'a TrainerConfig,
    thresholds: Thresholds,
    explainer: Option<&'a dyn ExplanationGenerator>,
    state: &'a watch::Sender<RunState>,
    cache: EvalCache,
    events: &'a mpsc::Sender<AnalysisEvent>,
    report: AnalysisReport,
    started_at_ms: u128,
    puzzle_count: usize,
}

enum PlyOutcome {
    Decided,
    Illegal,
    Quiet,
    Found(CandidateKind, f64),
}

impl<E: PositionEvaluator + ?Sized> Run<'_, E> {
    async fn drive(&mut self, username: &str, games: &[String]) -> Result<(), TrainerError> {
        let total_games = games.len();
        self.emit(AnalysisEvent::Started { total_games }).await?;

        self.state.send_replace(RunState::Initializing);
        cancellable(self.events, self.evaluator.initialize()).await??;

        for (game_index, text) in games.iter().enumerate() {
            self.ensure_open()?;
            self.state.send_replace(RunState::AnalyzingGame { index: game_index });

            let game = match parse_game(text) {
                Ok(game) => game,
                Err(e) => {
                    tracing::warn!(game_index, "Skipping unparseable game: {}", e);
                    self.skip(game_index, format!("could not parse game: {e}")).await?;
                    continue;
                }
            };
            let Some(played_as) = game.side_of(username) else {
                tracing::warn!(
                    game_index,
                    white = %game.headers.white,
                    black = %game.headers.black,
                    "Skipping game not played by {}",
                    username
                );
                self.skip(game_index, format!("{username} did not play this game"))
                    .await?;
                continue;
            };

            self.analyze_game(game_index, total_games, &game, played_as).await?;
            self.report.total_games_analyzed += 1;
            self.stream_best_mistake(game_index).await?;
        }

        Ok(())
    }

    async fn analyze_game(
        &mut self,
        game_index: usize,
        total_games: usize,
        game: &GameRecord,
        played_as: Side,
    ) -> Result<(), TrainerError> {
        let total_plies = game.plies.len();
        let start = opening_skip_plies(self.config.skip_opening_moves);
        tracing::info!(game_index, total_plies, played_as = %played_as, "Analyzing game");

        for (ply_index, ply) in game.plies.iter().enumerate().skip(start) {
            if ply.side != played_as {
                continue;
            }
            self.ensure_open()?;

            let outcome = self.consider_ply(game_index, game, ply_index, ply).await?;
            let note = match outcome {
                PlyOutcome::Decided => "already decided".to_string(),
                PlyOutcome::Illegal => "skipped, illegal move".to_string(),
                PlyOutcome::Quiet => "ok".to_string(),
                PlyOutcome::Found(CandidateKind::Mistake, delta) => format!("mistake ({delta:.1})"),
                PlyOutcome::Found(CandidateKind::Reinforcement, _) => "good find".to_string(),
            };
            self.emit(AnalysisEvent::Progress(ProgressUpdate {
                game_index,
                total_games,
                ply_index,
                total_plies,
                status: format!(
                    "Game {}/{}: move {} {}: {}",
                    game_index + 1,
                    total_games,
                    ply.move_number,
                    ply.san,
                    note
                ),
            }))
            .await?;
        }
        Ok(())
    }

    async fn consider_ply(
        &mut self,
        game_index: usize,
        game: &GameRecord,
        ply_index: usize,
        ply: &PlyRecord,
    ) -> Result<PlyOutcome, TrainerError> {
        if let Some(cached) = self.cache.get(&ply.fen_before) {
            if self.thresholds.is_decided(cached.score) {
                tracing::debug!(game_index, ply = ply_index, score = cached.score, "Decided position, no engine call");
                return Ok(PlyOutcome::Decided);
            }
        }

        let before = self.evaluate(&ply.fen_before).await?;
        let after = self.evaluate(&ply.fen_after).await?;

        let Some(best_move) = before.best_move.clone() else {
            return Ok(PlyOutcome::Quiet);
        };
        for mv in [best_move.as_str(), ply.uci.as_str()] {
            if let Err(e) = validate_move(&ply.fen_before, mv) {
                tracing::warn!(game_index, ply = ply_index, fen = %ply.fen_before, "Skipping ply: {}", e);
                return Ok(PlyOutcome::Illegal);
            }
        }

        let delta = eval_delta(before.score, after.score, ply.side);
        let Some(kind) = self
            .thresholds
            .classify(delta, before.score, &ply.uci, Some(&best_move))
        else {
            tracing::debug!(game_index, ply = ply_index, eval_delta = delta, "Ply analyzed");
            return Ok(PlyOutcome::Quiet);
        };
        tracing::debug!(game_index, ply = ply_index, eval_delta = delta, kind = ?kind, "Critical position");

        let position = self
            .critical_position(kind, game_index, game, ply_index, ply, &before, &after, delta)
            .await?;
        let puzzle = Puzzle::from_critical(&position, self.puzzle_count, self.started_at_ms);
        self.puzzle_count += 1;

        match kind {
            CandidateKind::Mistake => {
                if is_blunder(delta) {
                    self.report.blunders += 1;
                } else {
                    self.report.mistakes += 1;
                }
                self.report.mistake_puzzles.push(puzzle);
            }
            CandidateKind::Reinforcement => self.report.reinforcements.push(puzzle),
        }
        Ok(PlyOutcome::Found(kind, delta))
    }

    #[allow(clippy::too_many_arguments)]
    async fn critical_position(
        &mut self,
        kind: CandidateKind,
        game_index: usize,
        game: &GameRecord,
        ply_index: usize,
        ply: &PlyRecord,
        before: &PositionEvaluation,
        after: &PositionEvaluation,
        delta: f64,
    ) -> Result<CriticalPosition, TrainerError> {
        let best_move = before.best_move.clone().unwrap_or_default();

        // Legality was checked by the caller; a failure here only loses the extras.
        let tactics = match detect_tactics(
            &ply.fen_before,
            &best_move,
            Some(&ply.uci),
            Some(before.score),
            Some(after.score),
        ) {
            Ok(tactics) => Some(tactics),
            Err(e) => {
                tracing::warn!(game_index, ply = ply_index, "Motif detection failed: {}", e);
                None
            }
        };

        let pattern = pattern_label(tactics.as_ref().map(|t| t.theme), delta, ply.clock_seconds);
        let opponent_side = ply.side.opponent();
        let context = GameContext {
            game_index,
            opponent: game.headers.player(opponent_side).to_string(),
            opponent_rating: game.headers.rating(opponent_side),
            date: game.headers.date.clone(),
            time_control: game.headers.time_control.clone(),
            opening: game.headers.opening.clone(),
            played_as: ply.side,
        };

        let template = template_explanation(kind, tactics.as_ref(), &pattern);
        let explanation = match self.explainer {
            Some(explainer) => {
                let request = ExplanationRequest {
                    fen: ply.fen_before.clone(),
                    best_move: best_move.clone(),
                    played_move: ply.uci.clone(),
                    eval_before: before.score,
                    eval_after: after.score,
                    side: ply.side,
                    move_number: ply.move_number,
                    opponent: context.opponent.clone(),
                    pattern: pattern.clone(),
                };
                let limit = self.config.explain_timeout();
                let reply = tokio::time::timeout(limit, explainer.explain(&request));
                match cancellable(self.events, reply).await? {
                    Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
                    Ok(Ok(_)) => template,
                    Ok(Err(e)) => {
                        tracing::warn!(game_index, ply = ply_index, "Explanation generator failed: {:#}", e);
                        template
                    }
                    Err(_) => {
                        tracing::warn!(game_index, ply = ply_index, ?limit, "Explanation generator timed out");
                        template
                    }
                }
            }
            None => template,
        };

        Ok(CriticalPosition {
            kind,
            fen: ply.fen_before.clone(),
            best_move_san: san_of(&ply.fen_before, &best_move),
            best_move,
            player_move: ply.uci.clone(),
            player_move_san: ply.san.clone(),
            eval_before: before.score,
            eval_after: after.score,
            eval_delta: delta,
            ply: ply_index,
            move_number: ply.move_number,
            side: ply.side,
            clock_seconds: ply.clock_seconds,
            difficulty: Difficulty::from_delta(delta, ply.clock_seconds),
            pattern,
            explanation,
            tactics,
            game: context,
        })
    }

    /// Emit the largest-loss mistake recorded for `game_index`, if any.
    async fn stream_best_mistake(&mut self, game_index: usize) -> Result<(), TrainerError> {
        let best = self
            .report
            .mistake_puzzles
            .iter()
            .filter(|p| p.game_index == game_index)
            .fold(None::<&Puzzle>, |best, p| match best {
                Some(b) if b.eval_delta >= p.eval_delta => Some(b),
                _ => Some(p),
            })
            .cloned();

        if let Some(puzzle) = best {
            tracing::info!(game_index, eval_delta = puzzle.eval_delta, pattern = %puzzle.pattern, "Streaming puzzle");
            self.emit(AnalysisEvent::Puzzle(puzzle)).await?;
        }
        Ok(())
    }

    async fn evaluate(&mut self, fen: &str) -> Result<PositionEvaluation, TrainerError> {
        let depth = self.config.depth;
        let lookup = self.cache.get_or_compute(&mut *self.evaluator, fen, depth);
        Ok(cancellable(self.events, lookup).await??)
    }

    async fn skip(&mut self, game_index: usize, reason: String) -> Result<(), TrainerError> {
        let skipped = SkippedGame { game_index, reason };
        self.report.skipped_games.push(skipped.clone());
        self.emit(AnalysisEvent::GameSkipped(skipped)).await
    }

    async fn emit(&mut self, event: AnalysisEvent) -> Result<(), TrainerError> {
        self.events
            .send(event)
            .await
            .map_err(|_| TrainerError::Cancelled)
    }

    fn ensure_open(&self) -> Result<(), TrainerError> {
        if self.events.is_closed() {
            Err(TrainerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Race `fut` against the consumer going away. Dropping `fut` aborts whatever
/// engine exchange it was in the middle of.
async fn cancellable<T>(
    events: &mpsc::Sender<AnalysisEvent>,
    fut: impl Future<Output = T>,
) -> Result<T, TrainerError> {
    tokio::select! {
        biased;
        _ = events.closed() => Err(TrainerError::Cancelled),
        value = fut => Ok(value),
    }
}

fn template_explanation(
    kind: CandidateKind,
    tactics: Option<&TacticalAnalysis>,
    pattern: &str,
) -> String {
    match (kind, tactics) {
        (_, Some(tactics)) if !tactics.explanation.is_empty() => tactics.summary(),
        (CandidateKind::Mistake, _) => format!("{pattern}: the engine found a stronger move."),
        (CandidateKind::Reinforcement, _) => "You found the engine's move.".to_string(),
    }
}

fn san_of(fen: &str, uci: &str) -> String {
    parse_fen(fen)
        .and_then(|board| parse_legal_move(&board, uci).map(|mv| format_san(&board, mv)))
        .unwrap_or_else(|_| uci.to_string())
}
