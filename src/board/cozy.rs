use cozy_chess::{Board, Color, File, Move, Piece, Square};
use thiserror::Error;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("invalid FEN: {0}")]
    BadFen(String),
    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },
}

#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: Board::default() }
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        Board::from_fen(fen, false)
            .map(|b| Self { board: b })
            .map_err(|_| PositionError::BadFen(fen.to_string()))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn make_move_uci(&mut self, mv_uci: &str) -> Result<(), PositionError> {
        match find_move(&self.board, mv_uci) {
            Some(m) => {
                self.board.play(m);
                Ok(())
            }
            None => Err(PositionError::IllegalMove {
                mv: mv_uci.to_string(),
                fen: format!("{}", self.board),
            }),
        }
    }

    pub fn set_from_start_and_moves(moves: &[String]) -> Result<Self, PositionError> {
        let mut pos = Self::startpos();
        for m in moves {
            pos.make_move_uci(m)?;
        }
        Ok(pos)
    }
}

/// Total men on the board, both sides.
pub fn piece_count(board: &Board) -> usize {
    board.occupied().into_iter().count()
}

pub fn has_castling_rights(board: &Board) -> bool {
    for color in [Color::White, Color::Black] {
        let rights = board.castle_rights(color);
        if rights.short.is_some() || rights.long.is_some() {
            return true;
        }
    }
    false
}

/// The move generator encodes castling as king-takes-own-rook.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == board.color_on(mv.from)
        && board.piece_on(mv.to) == Some(Piece::Rook)
}

/// UCI text for a move, downgrading king-takes-rook castling to the legacy
/// king-destination form (e1g1/e1c1) used by engines without chess960 support.
pub fn legacy_move_uci(board: &Board, mv: Move) -> String {
    if is_castling(board, mv) {
        let file = if mv.to.file() > mv.from.file() { File::G } else { File::C };
        let legacy = Move { from: mv.from, to: Square::new(file, mv.from.rank()), promotion: None };
        return format!("{}", legacy);
    }
    format!("{}", mv)
}

/// UCI text for a move in either notation.
pub fn move_uci(board: &Board, mv: Move, chess960: bool) -> String {
    if chess960 {
        format!("{}", mv)
    } else {
        legacy_move_uci(board, mv)
    }
}

/// Resolve a UCI string against the legal moves of `board`, accepting both the
/// king-takes-rook and legacy castling spellings.
pub fn find_move(board: &Board, uci: &str) -> Option<Move> {
    let mut found = None;
    board.generate_moves(|moves| {
        for m in moves {
            if format!("{}", m) == uci || legacy_move_uci(board, m) == uci {
                found = Some(m);
                break;
            }
        }
        found.is_some()
    });
    found
}
