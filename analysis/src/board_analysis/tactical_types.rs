use serde::{Deserialize, Serialize};

/// Theme assigned by the motif detector to an engine move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TacticalTheme {
    #[serde(rename = "checkmate")]
    Checkmate,
    #[serde(rename = "winning capture")]
    WinningCapture,
    #[serde(rename = "hanging piece")]
    HangingPiece,
    #[serde(rename = "capture")]
    Capture,
    #[serde(rename = "fork")]
    Fork,
    #[serde(rename = "check and win")]
    CheckAndWin,
    #[serde(rename = "check")]
    Check,
    #[serde(rename = "promotion")]
    Promotion,
    #[serde(rename = "positional")]
    Positional,
}

impl TacticalTheme {
    pub fn label(self) -> &'static str {
        match self {
            Self::Checkmate => "checkmate",
            Self::WinningCapture => "winning capture",
            Self::HangingPiece => "hanging piece",
            Self::Capture => "capture",
            Self::Fork => "fork",
            Self::CheckAndWin => "check and win",
            Self::Check => "check",
            Self::Promotion => "promotion",
            Self::Positional => "positional",
        }
    }

    /// Display name used as a puzzle pattern ("Check and Win").
    pub fn pattern_name(self) -> &'static str {
        match self {
            Self::Checkmate => "Checkmate",
            Self::WinningCapture => "Winning Capture",
            Self::HangingPiece => "Hanging Piece",
            Self::Capture => "Capture",
            Self::Fork => "Fork",
            Self::CheckAndWin => "Check and Win",
            Self::Check => "Check",
            Self::Promotion => "Promotion",
            Self::Positional => "Positional",
        }
    }

    /// Themes too vague to label a puzzle on their own.
    pub fn is_generic(self) -> bool {
        matches!(self, Self::Positional | Self::Capture)
    }
}

impl std::fmt::Display for TacticalTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What the engine's move does on the board, in words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticalAnalysis {
    pub theme: TacticalTheme,
    /// Clauses in detection order.
    pub explanation: Vec<String>,
    /// Distinct piece names ("knight", "king"), first mention first.
    pub pieces_involved: Vec<String>,
}

impl TacticalAnalysis {
    /// All clauses as one paragraph.
    pub fn summary(&self) -> String {
        self.explanation.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_serializes_as_label() {
        let json = serde_json::to_string(&TacticalTheme::CheckAndWin).unwrap();
        assert_eq!(json, "\"check and win\"");
        let theme: TacticalTheme = serde_json::from_str("\"hanging piece\"").unwrap();
        assert_eq!(theme, TacticalTheme::HangingPiece);
    }

    #[test]
    fn generic_themes() {
        assert!(TacticalTheme::Positional.is_generic());
        assert!(TacticalTheme::Capture.is_generic());
        assert!(!TacticalTheme::Fork.is_generic());
        assert!(!TacticalTheme::HangingPiece.is_generic());
    }

    #[test]
    fn summary_joins_clauses() {
        let analysis = TacticalAnalysis {
            theme: TacticalTheme::Check,
            explanation: vec!["Queen to h5 gives check.".into(), "(eval +0.3 -> +1.2)".into()],
            pieces_involved: vec!["queen".into()],
        };
        assert_eq!(analysis.summary(), "Queen to h5 gives check. (eval +0.3 -> +1.2)");
    }
}
