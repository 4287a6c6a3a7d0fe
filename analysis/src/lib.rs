pub mod board_analysis;
pub mod critical;

pub use board_analysis::{detect_tactics, TacticalAnalysis, TacticalTheme};
pub use critical::*;
