use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::uci::format_command;
use crate::{EngineCommand, EngineError, EngineTransport};

/// A Stockfish (or any UCI engine) subprocess speaking over stdin/stdout.
pub struct StockfishProcess {
    process: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl StockfishProcess {
    /// Spawn the engine at `path`, or the first engine found on this machine.
    #[tracing::instrument(level = "info")]
    pub fn spawn(path: Option<&Path>) -> Result<Self, EngineError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!(path = %path.display(), "Spawning engine process");

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::NotFound
                } else {
                    EngineError::Spawn(e)
                }
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdout unavailable".into()))?;

        Ok(Self {
            process,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl EngineTransport for StockfishProcess {
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Closed)?;
        tracing::trace!("UCI >> {}", line);
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<Option<String>, EngineError> {
        // `Lines::next_line` is cancel safe.
        let line = self.stdout.next_line().await?;
        match &line {
            Some(line) => tracing::trace!("UCI << {}", line),
            None => tracing::warn!("Engine stdout EOF - engine closed"),
        }
        Ok(line)
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        let Some(mut stdin) = self.stdin.take() else {
            return Ok(());
        };
        tracing::info!("Sending quit command to engine");
        let quit = format!("{}\n", format_command(&EngineCommand::Quit));
        let _ = stdin.write_all(quit.as_bytes()).await;
        let _ = stdin.flush().await;
        drop(stdin);

        if tokio::time::timeout(Duration::from_secs(1), self.process.wait())
            .await
            .is_err()
        {
            tracing::warn!("Engine did not exit after quit, killing it");
            self.process.kill().await?;
        }
        Ok(())
    }
}

impl Drop for StockfishProcess {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            let _ = self.process.start_kill();
        }
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    const PATHS: [&str; 5] = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    PATHS.iter().find_map(|path_str| {
        let path = Path::new(path_str);
        if path.exists() {
            return Some(path.to_path_buf());
        }
        if *path_str == "stockfish" {
            // Look up PATH without starting a search.
            return std::process::Command::new(path_str)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .arg("quit")
                .status()
                .ok()
                .map(|_| PathBuf::from(path_str));
        }
        None
    })
}
