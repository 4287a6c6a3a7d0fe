use async_trait::async_trait;

use crate::EngineError;

/// Bidirectional line channel to a UCI engine.
///
/// Implementations must make `recv_line` cancel safe: the evaluator races it
/// against a timeout and drops the future when the deadline passes.
#[async_trait]
pub trait EngineTransport: Send {
    /// Write one command line. The newline is appended by the transport.
    async fn send_line(&mut self, line: &str) -> Result<(), EngineError>;

    /// Next output line, or `None` once the engine closed its output.
    async fn recv_line(&mut self) -> Result<Option<String>, EngineError>;

    /// Release the underlying session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), EngineError>;
}
