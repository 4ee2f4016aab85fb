use std::sync::Arc;

use cozy_chess::Move;
use log::debug;

use crate::board::{has_castling_rights, legacy_move_uci, piece_count, PositionError};
use crate::eval::Network;
use crate::openings::Opening;
use crate::search::CancelToken;
use crate::tablebase::{ProbeState, Tablebase, Wdl};
use crate::tree::{GameResult, NodeTree, SharedTree};

/// Throughput-oriented self-play over many independent games: one-ply
/// lookahead scored by a single batched model evaluation per wave instead of
/// full tree search, with tablebase short-circuiting. Within a wave, every
/// still-undecided game whose side to move matches the wave's color advances
/// together off one model invocation.
pub struct ValueSelfPlayGames {
    networks: [Arc<dyn Network>; 2],
    trees: Vec<SharedTree>,
    results: Vec<GameResult>,
    tablebase: Option<Arc<dyn Tablebase>>,
    cancel: CancelToken,
}

impl ValueSelfPlayGames {
    pub fn new(
        white_network: Arc<dyn Network>,
        black_network: Arc<dyn Network>,
        openings: &[Opening],
        tablebase: Option<Arc<dyn Tablebase>>,
    ) -> Result<Self, PositionError> {
        let mut trees = Vec::with_capacity(openings.len());
        let mut results = Vec::with_capacity(openings.len());
        for opening in openings {
            trees.push(SharedTree::new(NodeTree::from_opening(opening)?));
            results.push(GameResult::Undecided);
        }
        Ok(Self {
            networks: [white_network, black_network],
            trees,
            results,
            tablebase,
            cancel: CancelToken::new(),
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn results(&self) -> &[GameResult] {
        &self.results
    }

    pub fn games(&self) -> usize {
        self.trees.len()
    }

    /// Moves of game `index` in UCI, castling in legacy notation.
    pub fn game_moves(&self, index: usize) -> Vec<String> {
        let tree = self.trees[index].lock();
        let moves = tree.moves_from_begin();
        let mut board = tree.start_board().clone();
        let mut out = Vec::with_capacity(moves.len());
        for mv in moves {
            out.push(legacy_move_uci(&board, mv));
            board.play(mv);
        }
        out
    }

    /// Advance all games in synchronized waves until every game has a
    /// terminal outcome or an abort is observed (checked once per wave).
    pub fn play(&mut self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let mut all_done = true;
            let mut blacks_move = false;
            for i in 0..self.trees.len() {
                if self.results[i] != GameResult::Undecided {
                    continue;
                }
                let tree = self.trees[i].lock();
                let result = tree.compute_result();
                if result != GameResult::Undecided {
                    self.results[i] = result;
                    continue;
                }
                if let Some(result) = self.probe_tablebase(&tree) {
                    debug!("game {} decided by tablebase: {}", i, result.as_pgn());
                    self.results[i] = result;
                    continue;
                }
                if all_done {
                    all_done = false;
                    blacks_move = tree.is_black_to_move();
                    // Don't break: result state must be refreshed for every game.
                }
            }
            if all_done {
                break;
            }

            let idx = usize::from(blacks_move);
            let mut comp = self.networks[idx].new_computation();

            // One-ply expansion: submit every non-terminal child position.
            for i in 0..self.trees.len() {
                if self.results[i] != GameResult::Undecided {
                    continue;
                }
                let mut tree = self.trees[i].lock();
                if tree.is_black_to_move() != blacks_move {
                    continue;
                }
                tree.create_edges();
                let moves: Vec<Move> = tree.edges().iter().map(|e| e.mv).collect();
                for mv in moves {
                    if tree.result_after(mv) == GameResult::Undecided {
                        let mut board = tree.head_board().clone();
                        board.play(mv);
                        comp.add_input(&board);
                    }
                }
            }

            comp.compute_blocking();

            // Selection: model value for continuations, analytic value for
            // terminal children; ties go to the last move examined.
            let mut comp_idx = 0usize;
            for i in 0..self.trees.len() {
                if self.results[i] != GameResult::Undecided {
                    continue;
                }
                let mut tree = self.trees[i].lock();
                if tree.is_black_to_move() != blacks_move {
                    continue;
                }
                let moves: Vec<Move> = tree.edges().iter().map(|e| e.mv).collect();
                let mut best: Option<Move> = None;
                let mut max_q = f32::MIN;
                for mv in moves {
                    let q = match tree.result_after(mv) {
                        GameResult::Undecided => {
                            // The evaluation is from the child's side to move,
                            // so a good value there is bad for us.
                            let q = -comp.q_val(comp_idx);
                            comp_idx += 1;
                            q
                        }
                        GameResult::Draw => 0.0,
                        // A legal move to a non-drawn terminal without
                        // tablebases at this depth must be a win for the mover.
                        _ => 1.0,
                    };
                    if q >= max_q {
                        max_q = q;
                        best = Some(mv);
                    }
                }
                if let Some(mv) = best {
                    tree.make_move(mv);
                }
            }
        }
    }

    /// Probe the tablebase when the head position qualifies. A probe only
    /// fails to inform on `Fail`; cursed wins and blessed losses count as
    /// draws.
    fn probe_tablebase(&self, tree: &NodeTree) -> Option<GameResult> {
        let tablebase = self.tablebase.as_ref()?;
        let board = tree.head_board();
        if has_castling_rights(board) || piece_count(board) > tablebase.max_cardinality() {
            return None;
        }
        let probe_side_black = tree.is_black_to_move();
        let (wdl, state) = tablebase.probe_wdl(board);
        if state == ProbeState::Fail {
            return None;
        }
        Some(match wdl {
            Wdl::Win => {
                if probe_side_black {
                    GameResult::BlackWon
                } else {
                    GameResult::WhiteWon
                }
            }
            Wdl::Loss => {
                if probe_side_black {
                    GameResult::WhiteWon
                } else {
                    GameResult::BlackWon
                }
            }
            _ => GameResult::Draw,
        })
    }
}
