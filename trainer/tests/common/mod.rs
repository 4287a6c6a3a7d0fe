//! Shared fixtures for trainer integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chess::{format_uci_move, from_board_move, legal_moves, parse_fen};
use engine::{EngineError, EngineTransport, EvaluatorConfig};
use trainer::TrainerConfig;

/// Hero plays White and never drops material.
pub const HERO_WHITE: &str = r#"[Event "Rated Blitz game"]
[Date "2024.03.01"]
[White "hero"]
[Black "villain"]
[WhiteElo "1500"]
[BlackElo "1620"]
[TimeControl "300+0"]
[Opening "Scholar's Mate"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0
"#;

/// Same moves with hero on the losing side: 3...Nf6 walks into mate.
pub const HERO_BLACK: &str = r#"[Event "Rated Blitz game"]
[Date "2024.03.02"]
[White "Villain"]
[Black "Hero"]
[WhiteElo "1710"]
[BlackElo "1490"]
[TimeControl "180+2"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0
"#;

pub const STRANGERS: &str = r#"[White "alice"]
[Black "bob"]
[Result "1/2-1/2"]

1. d4 d5 2. c4 e6 1/2-1/2
"#;

pub const BROKEN: &str = r#"[White "hero"]
[Black "carol"]
[Result "*"]

1. e4 e5 2. Ke3 *
"#;

/// The four games above as one PGN export.
pub fn export() -> String {
    [HERO_WHITE, HERO_BLACK, STRANGERS, BROKEN].join("\n")
}

pub fn config() -> TrainerConfig {
    TrainerConfig {
        skip_opening_moves: 0,
        ..Default::default()
    }
}

pub fn fast_engine_config() -> EvaluatorConfig {
    EvaluatorConfig {
        init_timeout: Duration::from_millis(200),
        analysis_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

/// In-process UCI engine. Scores come from a table keyed by FEN, written the
/// way a real engine reports them (`cp 35`, `mate 1`, side to move); unknown
/// positions score `cp 0` and play their first legal move.
#[derive(Default)]
pub struct MockEngine {
    scores: HashMap<String, String>,
    best: HashMap<String, String>,
    silent_on: Option<String>,
    position: Option<String>,
    pending: VecDeque<String>,
    pub searches: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockEngine {
    pub fn score(mut self, fen: &str, score: &str) -> Self {
        self.scores.insert(fen.to_string(), score.to_string());
        self
    }

    pub fn best(mut self, fen: &str, mv: &str) -> Self {
        self.best.insert(fen.to_string(), mv.to_string());
        self
    }

    /// Never answer a search of `fen`.
    pub fn silent_on(mut self, fen: &str) -> Self {
        self.silent_on = Some(fen.to_string());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn search(&self, fen: &str) -> Vec<String> {
        if self.silent_on.as_deref() == Some(fen) {
            return Vec::new();
        }
        let best = self.best.get(fen).cloned().or_else(|| {
            let board = parse_fen(fen).ok()?;
            legal_moves(&board)
                .first()
                .map(|mv| format_uci_move(from_board_move(&board, *mv)))
        });
        let best = best.unwrap_or_else(|| "(none)".to_string());
        let score = self.scores.get(fen).map(String::as_str).unwrap_or("cp 0");
        vec![
            "info depth 1 score cp 5 pv a2a3".to_string(),
            format!("info depth 12 seldepth 18 score {score} nodes 40210 pv {best}"),
            format!("bestmove {best}"),
        ]
    }
}

#[async_trait]
impl EngineTransport for MockEngine {
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        match line {
            "uci" => self
                .pending
                .extend(["id name Mock 1.0", "uciok"].map(String::from)),
            "isready" => self.pending.push_back("readyok".to_string()),
            l if l.starts_with("position fen ") => {
                self.position = Some(l["position fen ".len()..].to_string());
            }
            l if l.starts_with("go") => {
                let fen = self.position.clone().unwrap_or_default();
                self.searches.lock().unwrap().push(fen.clone());
                let replies = self.search(&fen);
                self.pending.extend(replies);
            }
            _ => {}
        }
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<Option<String>, EngineError> {
        match self.pending.pop_front() {
            Some(line) => Ok(Some(line)),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
