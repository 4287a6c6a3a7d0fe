//! Board inspection of a single engine move: what it captures, attacks and threatens.

pub mod helpers;
pub mod tactical_types;
pub mod tactics;

pub use tactical_types::{TacticalAnalysis, TacticalTheme};
pub use tactics::detect_tactics;
