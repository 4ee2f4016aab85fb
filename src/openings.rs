use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::STARTPOS_FEN;

/// A starting position plus a forced prefix of moves. Defines the initial
/// state for one or many games; never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opening {
    pub start_fen: String,
    pub uci_moves: Vec<String>,
}

impl Opening {
    pub fn new(start_fen: &str, uci_moves: &[&str]) -> Self {
        Self {
            start_fen: start_fen.to_string(),
            uci_moves: uci_moves.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn startpos() -> Self {
        Self { start_fen: STARTPOS_FEN.to_string(), uci_moves: Vec::new() }
    }
}

/// Load openings from a FEN/EPD list, one per line. EPD lines (4 fields) are
/// padded with halfmove/fullmove counters; blanks and `#` comments skipped.
pub fn load_openings<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<Opening>> {
    let mut s = String::new();
    File::open(path)?.read_to_string(&mut s)?;
    let mut out = Vec::new();
    for line in s.lines() {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let fen = if parts.len() >= 6 {
            parts[0..6].join(" ")
        } else if parts.len() >= 4 {
            let mut v = parts[0..4].to_vec();
            v.push("0");
            v.push("1");
            v.join(" ")
        } else {
            raw.to_string()
        };
        if cozy_chess::Board::from_fen(&fen, false).is_ok() {
            out.push(Opening { start_fen: fen, uci_moves: Vec::new() });
        }
    }
    Ok(out)
}

/// Built-in book used when no opening file is supplied.
pub fn builtin_openings() -> Vec<Opening> {
    vec![
        Opening::new(STARTPOS_FEN, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"]),
        Opening::new(STARTPOS_FEN, &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6"]),
        Opening::new(STARTPOS_FEN, &["d2d4", "d7d5", "c2c4", "e7e6", "b1c3", "g8f6"]),
        Opening::new(STARTPOS_FEN, &["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4"]),
        Opening::new(STARTPOS_FEN, &["e2e4", "e7e6", "d2d4", "d7d5", "b1c3", "f8b4"]),
        Opening::new(STARTPOS_FEN, &["d2d4", "g8f6", "c2c4", "g7g6", "b1c3", "f8g7"]),
        Opening::new(STARTPOS_FEN, &["c2c4", "e7e5", "b1c3", "g8f6", "g2g3", "d7d5"]),
        Opening::new(STARTPOS_FEN, &["e2e4", "c7c6", "d2d4", "d7d5", "b1c3", "d5e4"]),
        Opening::new(STARTPOS_FEN, &["d2d4", "d7d5", "g1f3", "g8f6", "c1f4", "c7c5"]),
        Opening::new(STARTPOS_FEN, &["d2d4", "g8f6", "c2c4", "e7e6", "g2g3", "d7d5"]),
    ]
}

/// Opening by index, cycling through the built-in book.
pub fn builtin_opening(index: usize) -> Opening {
    let openings = builtin_openings();
    openings[index % openings.len()].clone()
}
