//! Normalized, read-only game records produced by the PGN parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Side;

/// One half-move of a recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlyRecord {
    /// Move as written in the source, display only.
    pub san: String,
    /// Standard UCI coordinate form.
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    /// 1-based full-move number.
    pub move_number: u32,
    pub side: Side,
    /// Mover's clock after the move, when the source recorded it.
    pub clock_seconds: Option<f64>,
    pub seconds_spent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHeaders {
    pub white: String,
    pub black: String,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub opening: Option<String>,
    pub result: Option<String>,
    pub site: Option<String>,
    /// Every tag pair as read, including the ones promoted to fields above.
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub headers: GameHeaders,
    pub start_fen: String,
    pub plies: Vec<PlyRecord>,
}

impl GameHeaders {
    /// Increment in seconds from a `base+inc` time control, if any.
    pub fn increment_seconds(&self) -> Option<f64> {
        let tc = self.time_control.as_deref()?;
        let (_, inc) = tc.split_once('+')?;
        inc.trim().parse().ok()
    }

    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    pub fn rating(&self, side: Side) -> Option<u32> {
        match side {
            Side::White => self.white_elo,
            Side::Black => self.black_elo,
        }
    }
}

impl GameRecord {
    /// Which side `username` played, matched case-insensitively.
    pub fn side_of(&self, username: &str) -> Option<Side> {
        let name = username.trim();
        if self.headers.white.eq_ignore_ascii_case(name) {
            Some(Side::White)
        } else if self.headers.black.eq_ignore_ascii_case(name) {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// Check the structural invariants: plies chain FEN to FEN and sides alternate.
    pub fn is_consistent(&self) -> bool {
        let mut expected_fen = self.start_fen.as_str();
        let mut expected_side = None;
        for ply in &self.plies {
            if ply.fen_before != expected_fen {
                return false;
            }
            if let Some(side) = expected_side {
                if ply.side != side {
                    return false;
                }
            }
            expected_fen = &ply.fen_after;
            expected_side = Some(ply.side.opponent());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ply(before: &str, after: &str, side: Side) -> PlyRecord {
        PlyRecord {
            san: "x".into(),
            uci: "a1a2".into(),
            fen_before: before.into(),
            fen_after: after.into(),
            move_number: 1,
            side,
            clock_seconds: None,
            seconds_spent: None,
        }
    }

    #[test]
    fn increment_from_time_control() {
        let mut headers = GameHeaders {
            time_control: Some("180+2".into()),
            ..Default::default()
        };
        assert_eq!(headers.increment_seconds(), Some(2.0));
        headers.time_control = Some("600".into());
        assert_eq!(headers.increment_seconds(), None);
        headers.time_control = Some("-".into());
        assert_eq!(headers.increment_seconds(), None);
    }

    #[test]
    fn side_lookup_ignores_case() {
        let game = GameRecord {
            headers: GameHeaders {
                white: "MagnusFan".into(),
                black: "Opponent".into(),
                ..Default::default()
            },
            start_fen: "s".into(),
            plies: vec![],
        };
        assert_eq!(game.side_of("magnusfan"), Some(Side::White));
        assert_eq!(game.side_of("OPPONENT"), Some(Side::Black));
        assert_eq!(game.side_of("someone"), None);
    }

    #[test]
    fn consistency_checks_chain_and_alternation() {
        let good = GameRecord {
            headers: GameHeaders::default(),
            start_fen: "a".into(),
            plies: vec![ply("a", "b", Side::White), ply("b", "c", Side::Black)],
        };
        assert!(good.is_consistent());

        let broken_chain = GameRecord {
            plies: vec![ply("a", "b", Side::White), ply("x", "c", Side::Black)],
            ..good.clone()
        };
        assert!(!broken_chain.is_consistent());

        let same_side_twice = GameRecord {
            plies: vec![ply("a", "b", Side::White), ply("b", "c", Side::White)],
            ..good
        };
        assert!(!same_side_twice.is_consistent());
    }
}
