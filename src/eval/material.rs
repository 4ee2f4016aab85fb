use cozy_chess::{Board, Color, Piece};
use rayon::prelude::*;

use crate::eval::{Computation, InputFormat, Network, NetworkOutput};

const PAWN: i32 = 100;
const KNIGHT: i32 = 320;
const BISHOP: i32 = 330;
const ROOK: i32 = 500;
const QUEEN: i32 = 900;

fn count_piece(board: &Board, color: Color, piece: Piece) -> i32 {
    let bb = board.colors(color) & board.pieces(piece);
    bb.into_iter().count() as i32
}

// Side-agnostic material in centipawns: positive means White has more material.
pub fn material_eval_cp_side_agnostic(board: &Board) -> i32 {
    let w = Color::White;
    let b = Color::Black;
    (count_piece(board, w, Piece::Pawn) - count_piece(board, b, Piece::Pawn)) * PAWN
        + (count_piece(board, w, Piece::Knight) - count_piece(board, b, Piece::Knight)) * KNIGHT
        + (count_piece(board, w, Piece::Bishop) - count_piece(board, b, Piece::Bishop)) * BISHOP
        + (count_piece(board, w, Piece::Rook) - count_piece(board, b, Piece::Rook)) * ROOK
        + (count_piece(board, w, Piece::Queen) - count_piece(board, b, Piece::Queen)) * QUEEN
}

// Material from side-to-move perspective.
pub fn material_eval_cp(board: &Board) -> i32 {
    let base = material_eval_cp_side_agnostic(board);
    if board.side_to_move() == Color::White {
        base
    } else {
        -base
    }
}

/// Reference evaluation backend: material count squashed into [-1, 1].
/// Stands in for a trained model in the binary and in tests; makes no
/// pretense of positional understanding.
pub struct MaterialNetwork {
    scale_cp: f32,
    format: InputFormat,
}

impl MaterialNetwork {
    pub fn new(scale_cp: f32, format: InputFormat) -> Self {
        Self { scale_cp, format }
    }
}

impl Default for MaterialNetwork {
    fn default() -> Self {
        Self { scale_cp: 600.0, format: InputFormat::Classic }
    }
}

impl Network for MaterialNetwork {
    fn input_format(&self) -> InputFormat {
        self.format
    }

    fn new_computation(&self) -> Box<dyn Computation> {
        Box::new(MaterialComputation { scale_cp: self.scale_cp, inputs: Vec::new(), outputs: Vec::new() })
    }
}

struct MaterialComputation {
    scale_cp: f32,
    inputs: Vec<Board>,
    outputs: Vec<NetworkOutput>,
}

impl Computation for MaterialComputation {
    fn add_input(&mut self, board: &Board) {
        self.inputs.push(board.clone());
    }

    fn compute_blocking(&mut self) {
        let scale = self.scale_cp;
        self.outputs = self
            .inputs
            .par_iter()
            .map(|board| {
                let q = (material_eval_cp(board) as f32 / scale).tanh();
                let men = board.occupied().into_iter().count() as f32;
                NetworkOutput { q, d: 0.5 * (1.0 - q.abs()), ml: men * 2.0 }
            })
            .collect();
    }

    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn q_val(&self, idx: usize) -> f32 {
        self.outputs[idx].q
    }

    fn d_val(&self, idx: usize) -> f32 {
        self.outputs[idx].d
    }

    fn ml_val(&self, idx: usize) -> f32 {
        self.outputs[idx].ml
    }
}
