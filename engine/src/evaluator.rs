use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chess::{is_checkmate, is_stalemate, parse_fen, Side};

use crate::uci::{format_command, parse_uci_message, UciMessage};
use crate::{
    EngineCommand, EngineError, EngineTransport, PositionEvaluation, Score,
    StockfishProcess, MATE_SCORE,
};

/// A single-flight engine session that scores positions.
///
/// Callers must not overlap `analyze_position` calls; `&mut self` enforces it.
#[async_trait]
pub trait PositionEvaluator: Send {
    /// Start the session and wait until the engine reports ready.
    async fn initialize(&mut self) -> Result<(), EngineError>;

    /// Search `fen` to `depth` plies. The score is from White's point of view.
    async fn analyze_position(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> Result<PositionEvaluation, EngineError>;

    /// Release the session. Safe to call before `initialize` and more than once.
    async fn terminate(&mut self);
}

/// Configuration for engine performance tuning.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub threads: u32,
    pub hash_mb: u32,
    pub init_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 64,
            init_timeout: Duration::from_secs(30),
            analysis_timeout: Duration::from_secs(30),
        }
    }
}

/// `PositionEvaluator` speaking UCI over any line transport.
pub struct UciEvaluator<T> {
    transport: T,
    config: EvaluatorConfig,
    ready: bool,
    terminated: bool,
}

impl UciEvaluator<StockfishProcess> {
    /// Spawn a local engine process. The session still needs `initialize`.
    pub fn spawn(path: Option<&Path>, config: EvaluatorConfig) -> Result<Self, EngineError> {
        Ok(Self::new(StockfishProcess::spawn(path)?, config))
    }
}

impl<T: EngineTransport> UciEvaluator<T> {
    pub fn new(transport: T, config: EvaluatorConfig) -> Self {
        Self {
            transport,
            config,
            ready: false,
            terminated: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    async fn send(&mut self, cmd: EngineCommand) -> Result<(), EngineError> {
        let line = format_command(&cmd);
        self.transport.send_line(&line).await
    }

    async fn recv(&mut self) -> Result<UciMessage, EngineError> {
        loop {
            let line = self.transport.recv_line().await?.ok_or(EngineError::Closed)?;
            match parse_uci_message(&line) {
                Ok(msg) => return Ok(msg),
                // Banners and unknown chatter are allowed by the protocol.
                Err(e) => tracing::trace!("Ignoring engine output: {}", e),
            }
        }
    }

    /// Read until `matches` accepts a message, discarding everything before it.
    async fn wait_for(&mut self, matches: fn(&UciMessage) -> bool) -> Result<(), EngineError> {
        loop {
            let msg = self.recv().await?;
            if matches(&msg) {
                return Ok(());
            }
            tracing::trace!("Discarding {:?}", msg);
        }
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(EngineCommand::Uci).await?;
        self.wait_for(|m| matches!(m, UciMessage::UciOk)).await?;

        let threads = self.config.threads.clamp(1, 512);
        let hash_mb = self.config.hash_mb.clamp(1, 33_554_432);
        tracing::info!(threads, hash_mb, "Configuring engine");
        self.send(EngineCommand::SetOption {
            name: "Threads".into(),
            value: Some(threads.to_string()),
        })
        .await?;
        self.send(EngineCommand::SetOption {
            name: "Hash".into(),
            value: Some(hash_mb.to_string()),
        })
        .await?;
        self.send(EngineCommand::NewGame).await?;

        self.send(EngineCommand::IsReady).await?;
        self.wait_for(|m| matches!(m, UciMessage::ReadyOk)).await
    }

    /// Stop whatever is running, resynchronize, then submit one search.
    async fn search(&mut self, fen: &str, depth: u32) -> Result<SearchOutcome, EngineError> {
        self.send(EngineCommand::Stop).await?;
        self.send(EngineCommand::IsReady).await?;
        self.wait_for(|m| matches!(m, UciMessage::ReadyOk)).await?;

        self.send(EngineCommand::SetPosition {
            fen: fen.to_string(),
        })
        .await?;
        self.send(EngineCommand::Go {
            depth: u8::try_from(depth).unwrap_or(u8::MAX),
        })
        .await?;

        let mut outcome = SearchOutcome::default();
        loop {
            match self.recv().await? {
                UciMessage::Info(info) => {
                    // Only scored lines count; currmove/string lines carry no verdict.
                    // A bound never replaces an exact score.
                    let exact = info.bound.is_none();
                    if let Some(score) = info.score.filter(|_| exact || !outcome.exact) {
                        outcome.score = Some(score);
                        outcome.exact = exact;
                        outcome.depth = info.depth.map(u32::from);
                        if !info.pv.is_empty() {
                            outcome.pv = info.pv;
                        }
                    }
                }
                UciMessage::BestMove { mv, .. } => {
                    outcome.best_move = mv;
                    return Ok(outcome);
                }
                other => tracing::trace!("Ignoring {:?} during search", other),
            }
        }
    }
}

#[derive(Debug, Default)]
struct SearchOutcome {
    score: Option<Score>,
    exact: bool,
    depth: Option<u32>,
    pv: Vec<String>,
    best_move: Option<String>,
}

#[async_trait]
impl<T: EngineTransport> PositionEvaluator for UciEvaluator<T> {
    #[tracing::instrument(level = "info", skip(self))]
    async fn initialize(&mut self) -> Result<(), EngineError> {
        if self.terminated {
            return Err(EngineError::Closed);
        }
        let limit = self.config.init_timeout;
        tokio::time::timeout(limit, self.handshake())
            .await
            .map_err(|_| {
                tracing::error!(?limit, "Timeout waiting for engine to respond");
                EngineError::InitTimeout(limit)
            })??;
        self.ready = true;
        tracing::info!("Engine ready");
        Ok(())
    }

    async fn analyze_position(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> Result<PositionEvaluation, EngineError> {
        if !self.ready {
            return Err(EngineError::NotInitialized);
        }

        let board = parse_fen(fen)?;
        let side = Side::from(board.side_to_move());

        // The engine answers `bestmove (none)` here, so score terminal positions directly.
        if is_checkmate(&board) {
            return Ok(PositionEvaluation {
                fen: fen.to_string(),
                score: -MATE_SCORE * side.sign(),
                best_move: None,
                depth: 0,
                mate: Some(0),
                pv: Vec::new(),
            });
        }
        if is_stalemate(&board) {
            return Ok(PositionEvaluation {
                fen: fen.to_string(),
                score: 0.0,
                best_move: None,
                depth: 0,
                mate: None,
                pv: Vec::new(),
            });
        }

        let limit = self.config.analysis_timeout;
        let outcome = tokio::time::timeout(limit, self.search(fen, depth))
            .await
            .map_err(|_| {
                tracing::error!(fen, ?limit, "Engine analysis timed out");
                EngineError::AnalysisTimeout {
                    fen: fen.to_string(),
                    timeout: limit,
                }
            })??;

        let score = outcome.score.ok_or_else(|| {
            EngineError::Protocol(format!("no score reported before bestmove for {fen}"))
        })?;
        let sign = side.sign();
        let mate = match score {
            Score::Mate(n) => Some(i32::from(n) * sign as i32),
            Score::Centipawns(_) => None,
        };
        let evaluation = PositionEvaluation {
            fen: fen.to_string(),
            score: score.to_pawns() * sign,
            best_move: outcome.best_move,
            depth: outcome.depth.unwrap_or(depth),
            mate,
            pv: outcome.pv,
        };
        tracing::debug!(
            fen,
            score = evaluation.score,
            best_move = ?evaluation.best_move,
            "Position analyzed"
        );
        Ok(evaluation)
    }

    async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.ready = false;
        if let Err(e) = self.transport.close().await {
            tracing::warn!("Error while closing engine session: {}", e);
        }
        tracing::info!("Engine session terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

    /// Replays canned engine output in response to each command line.
    struct ScriptedTransport {
        respond: Responder,
        pending: VecDeque<String>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        fn new(respond: impl FnMut(&str) -> Vec<String> + Send + 'static) -> Self {
            Self {
                respond: Box::new(respond),
                pending: VecDeque::new(),
                sent: Arc::default(),
                closed: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl EngineTransport for ScriptedTransport {
        async fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
            self.sent.lock().unwrap().push(line.to_string());
            let replies = (self.respond)(line);
            self.pending.extend(replies);
            Ok(())
        }

        async fn recv_line(&mut self) -> Result<Option<String>, EngineError> {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            // A silent engine: never answers.
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<(), EngineError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// An engine that answers the handshake and replies to `go` with `search`.
    fn engine(search: &'static [&'static str]) -> ScriptedTransport {
        ScriptedTransport::new(move |cmd| match cmd {
            "uci" => lines(&["id name Scripted", "id author Tests", "uciok"]),
            "isready" => lines(&["readyok"]),
            c if c.starts_with("go") => lines(search),
            _ => Vec::new(),
        })
    }

    fn fast_config() -> EvaluatorConfig {
        EvaluatorConfig {
            init_timeout: Duration::from_millis(50),
            analysis_timeout: Duration::from_millis(50),
            ..Default::default()
        }
    }

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[tokio::test]
    async fn initialize_performs_handshake() {
        let transport = engine(&[]);
        let sent = transport.sent.clone();
        let mut evaluator = UciEvaluator::new(transport, fast_config());
        evaluator.initialize().await.unwrap();
        assert!(evaluator.is_ready());
        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                "uci",
                "setoption name Threads value 1",
                "setoption name Hash value 64",
                "ucinewgame",
                "isready"
            ]
        );
    }

    #[tokio::test]
    async fn initialize_times_out_without_uciok() {
        let transport = ScriptedTransport::new(|_| lines(&["Stockfish by the developers"]));
        let mut evaluator = UciEvaluator::new(transport, fast_config());
        let err = evaluator.initialize().await.unwrap_err();
        assert!(matches!(err, EngineError::InitTimeout(_)));
        assert!(err.is_timeout());
        assert!(!evaluator.is_ready());
    }

    #[tokio::test]
    async fn analyze_requires_initialize() {
        let mut evaluator = UciEvaluator::new(engine(&[]), fast_config());
        let err = evaluator.analyze_position(chess::START_FEN, 10).await.unwrap_err();
        assert!(matches!(err, EngineError::NotInitialized));
    }

    #[tokio::test]
    async fn takes_last_score_before_bestmove() {
        let transport = engine(&[
            "info depth 1 score cp 10 pv e2e4",
            "info depth 12 seldepth 18 score cp 35 nodes 1000 pv d2d4 d7d5",
            "info depth 12 currmove g1f3 currmovenumber 3",
            "bestmove d2d4 ponder d7d5",
        ]);
        let sent = transport.sent.clone();
        let mut evaluator = UciEvaluator::new(transport, fast_config());
        evaluator.initialize().await.unwrap();

        let eval = evaluator.analyze_position(chess::START_FEN, 12).await.unwrap();
        assert_eq!(eval.score, 0.35);
        assert_eq!(eval.best_move.as_deref(), Some("d2d4"));
        assert_eq!(eval.depth, 12);
        assert_eq!(eval.pv, vec!["d2d4", "d7d5"]);
        assert_eq!(eval.mate, None);

        let sent = sent.lock().unwrap();
        let tail: Vec<&str> = sent[sent.len() - 4..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "stop",
                "isready",
                &format!("position fen {}", chess::START_FEN),
                "go depth 12"
            ]
        );
    }

    #[tokio::test]
    async fn scores_are_normalized_to_white() {
        let mut evaluator =
            UciEvaluator::new(engine(&["info depth 8 score cp 50 pv e7e5", "bestmove e7e5"]), fast_config());
        evaluator.initialize().await.unwrap();
        let eval = evaluator.analyze_position(AFTER_E4, 8).await.unwrap();
        assert_eq!(eval.score, -0.5);
    }

    #[tokio::test]
    async fn bound_scores_do_not_replace_exact_ones() {
        let mut evaluator = UciEvaluator::new(
            engine(&[
                "info depth 14 score cp 30 pv e2e4 e7e5",
                "info depth 15 score cp 80 lowerbound pv d2d4",
                "bestmove e2e4",
            ]),
            fast_config(),
        );
        evaluator.initialize().await.unwrap();
        let eval = evaluator.analyze_position(chess::START_FEN, 15).await.unwrap();
        assert_eq!(eval.score, 0.3);
        assert_eq!(eval.depth, 14);
        assert_eq!(eval.pv, vec!["e2e4", "e7e5"]);
    }

    #[tokio::test]
    async fn bound_score_is_used_when_nothing_exact_arrived() {
        let mut evaluator = UciEvaluator::new(
            engine(&[
                "info depth 1 score cp 15 upperbound pv g1f3",
                "info depth 2 score cp -20 upperbound pv e2e4",
                "bestmove e2e4",
            ]),
            fast_config(),
        );
        evaluator.initialize().await.unwrap();
        let eval = evaluator.analyze_position(chess::START_FEN, 2).await.unwrap();
        assert_eq!(eval.score, -0.2);
    }

    #[tokio::test]
    async fn mate_scores_saturate_and_flip() {
        let mut evaluator =
            UciEvaluator::new(engine(&["info depth 5 score mate 3 pv e7e5", "bestmove e7e5"]), fast_config());
        evaluator.initialize().await.unwrap();

        let eval = evaluator.analyze_position(AFTER_E4, 5).await.unwrap();
        assert_eq!(eval.score, -MATE_SCORE);
        assert_eq!(eval.mate, Some(-3));
        assert!(eval.is_mate());

        let eval = evaluator.analyze_position(chess::START_FEN, 5).await.unwrap();
        assert_eq!(eval.score, MATE_SCORE);
        assert_eq!(eval.mate, Some(3));
    }

    #[tokio::test]
    async fn stale_output_is_discarded_before_submitting() {
        let mut evaluator = UciEvaluator::new(
            ScriptedTransport::new(|cmd| match cmd {
                "uci" => lines(&["uciok"]),
                "isready" => lines(&["readyok"]),
                // Leftover result of an earlier search arrives after `stop`.
                "stop" => lines(&["info depth 30 score cp -900", "bestmove a2a3"]),
                c if c.starts_with("go") => {
                    lines(&["info depth 10 score cp 20 pv e2e4", "bestmove e2e4"])
                }
                _ => Vec::new(),
            }),
            fast_config(),
        );
        evaluator.initialize().await.unwrap();
        let eval = evaluator.analyze_position(chess::START_FEN, 10).await.unwrap();
        assert_eq!(eval.best_move.as_deref(), Some("e2e4"));
        assert_eq!(eval.score, 0.2);
    }

    #[tokio::test]
    async fn analysis_times_out_without_bestmove() {
        let mut evaluator =
            UciEvaluator::new(engine(&["info depth 3 score cp 12 pv e2e4"]), fast_config());
        evaluator.initialize().await.unwrap();
        let err = evaluator.analyze_position(chess::START_FEN, 20).await.unwrap_err();
        match err {
            EngineError::AnalysisTimeout { fen, .. } => assert_eq!(fen, chess::START_FEN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bestmove_without_score_is_a_protocol_error() {
        let mut evaluator = UciEvaluator::new(engine(&["bestmove e2e4"]), fast_config());
        evaluator.initialize().await.unwrap();
        let err = evaluator.analyze_position(chess::START_FEN, 4).await.unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[tokio::test]
    async fn terminal_positions_skip_the_engine() {
        let transport = engine(&[]);
        let sent = transport.sent.clone();
        let mut evaluator = UciEvaluator::new(transport, fast_config());
        evaluator.initialize().await.unwrap();

        // White has been mated (Fool's mate).
        let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        let eval = evaluator.analyze_position(mated, 15).await.unwrap();
        assert_eq!(eval.score, -MATE_SCORE);
        assert_eq!(eval.best_move, None);

        let stalemate = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";
        let eval = evaluator.analyze_position(stalemate, 15).await.unwrap();
        assert_eq!(eval.score, 0.0);

        assert!(!sent.lock().unwrap().iter().any(|l| l.starts_with("go")));
    }

    #[tokio::test]
    async fn invalid_fen_is_rejected() {
        let mut evaluator = UciEvaluator::new(engine(&[]), fast_config());
        evaluator.initialize().await.unwrap();
        let err = evaluator.analyze_position("not a fen", 10).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidPosition(_)));
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_safe_before_initialize() {
        let transport = engine(&[]);
        let closed = transport.closed.clone();
        let mut evaluator = UciEvaluator::new(transport, fast_config());
        evaluator.terminate().await;
        evaluator.terminate().await;
        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(evaluator.initialize().await, Err(EngineError::Closed)));
    }
}
