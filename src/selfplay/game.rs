use std::sync::{Arc, Mutex};

use cozy_chess::Move;
use log::{debug, info};

use crate::board::{move_uci, PositionError};
use crate::openings::Opening;
use crate::search::responder::{CallbackResponder, CastlingDowngrade, UciResponder};
use crate::search::{CancelToken, Search, SearchContext};
use crate::selfplay::training::{backfill_records, TrainingRecord, TrainingWriter};
use crate::selfplay::{DiscardedGame, PlayerOptions};
use crate::tree::{GameResult, SharedTree, TreePair};

/// Running maxima of the evaluation signal by outcome bucket, used after the
/// game to score how close the eventual winner (or drawer) came to resigning.
#[derive(Clone, Copy, Debug)]
struct EvalMaxima {
    white_win: f32,
    draw: f32,
    black_win: f32,
}

impl EvalMaxima {
    fn new() -> Self {
        Self { white_win: 0.0, draw: 0.0, black_win: 0.0 }
    }

    fn update(self, best_w: f32, best_d: f32, best_l: f32, blacks_move: bool) -> Self {
        Self {
            white_win: self.white_win.max(if blacks_move { best_l } else { best_w }),
            draw: self.draw.max(best_d),
            black_win: self.black_win.max(if blacks_move { best_w } else { best_l }),
        }
    }
}

/// Plays one game between two configured players, alternating searches until
/// a terminal result, applying resignation and move-acceptance policy, and
/// optionally recording training samples.
pub struct SelfPlayGame {
    players: [PlayerOptions; 2],
    trees: TreePair,
    start_fen: String,
    chess960: bool,
    result: GameResult,
    move_count: usize,
    total_playouts: u64,
    training_data: Vec<TrainingRecord>,
    min_eval: [f32; 2],
    max_eval: EvalMaxima,
    cancel: CancelToken,
    // Guards the none->some transition of the active search so abort()
    // cannot race construction.
    active_search: Mutex<Option<Arc<dyn Search>>>,
}

impl SelfPlayGame {
    pub fn new(
        white: PlayerOptions,
        black: PlayerOptions,
        shared_tree: bool,
        opening: &Opening,
    ) -> Result<Self, PositionError> {
        let chess960 = white.options.chess960 || black.options.chess960;
        let trees = TreePair::from_opening(opening, shared_tree)?;
        Ok(Self {
            players: [white, black],
            trees,
            start_fen: opening.start_fen.clone(),
            chess960,
            result: GameResult::Undecided,
            move_count: 0,
            total_playouts: 0,
            training_data: Vec::new(),
            min_eval: [1.0, 1.0],
            max_eval: EvalMaxima::new(),
            cancel: CancelToken::new(),
            active_search: Mutex::new(None),
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request a cooperative abort and forward it to any in-flight search so
    /// it unwinds promptly.
    pub fn abort(&self) {
        self.cancel.cancel();
        let slot = self.active_search.lock().unwrap();
        if let Some(search) = slot.as_ref() {
            search.abort();
        }
    }

    /// Run the game to completion (or until aborted). One iteration per
    /// accepted move; a move is either fully applied to every tracked tree
    /// or not applied at all.
    pub fn play(
        &mut self,
        white_threads: usize,
        black_threads: usize,
        training: bool,
        enable_resign: bool,
    ) {
        let mut blacks_move = self.trees.primary().lock().is_black_to_move();

        while !self.cancel.is_cancelled() {
            self.result = self.trees.primary().lock().compute_result();
            if self.result != GameResult::Undecided {
                break;
            }

            let idx = usize::from(blacks_move);
            let player = self.players[idx].clone();
            let tree = self.trees.for_player(blacks_move).clone();

            if !player.options.reuse_tree {
                tree.lock().trim_below_current_head();
            }

            let search = {
                let mut slot = self.active_search.lock().unwrap();
                if self.cancel.is_cancelled() {
                    break;
                }
                tree.lock().create_edges();
                let stopper = player.limits.make_search_stopper();
                let mut responder: Box<dyn UciResponder> = Box::new(CallbackResponder::new(
                    player.best_move_callback.clone(),
                    player.info_callback.clone(),
                ));
                if !self.chess960 {
                    // Remap king-takes-rook castling to legacy notation.
                    let head = tree.lock().head_board().clone();
                    responder = Box::new(CastlingDowngrade::new(responder, head));
                }
                let search = player.search_factory.create(SearchContext {
                    tree: tree.clone(),
                    network: player.network.clone(),
                    cache: player.cache.clone(),
                    stopper,
                    responder,
                    cancel: self.cancel.clone(),
                });
                *slot = Some(search.clone());
                search
            };

            search.run_blocking(if blacks_move { black_threads } else { white_threads });
            self.move_count += 1;
            self.total_playouts += search.total_playouts();
            if self.cancel.is_cancelled() {
                break;
            }

            let best_eval = search.best_eval();
            if training {
                // The result and plies-left labels are backfilled at game end.
                let record = {
                    let t = tree.lock();
                    TrainingRecord::capture(&t, player.network.input_format(), best_eval)
                };
                self.training_data.push(record);
            }

            let eval = (best_eval.wl + 1.0) / 2.0;
            if eval < self.min_eval[idx] {
                self.min_eval[idx] = eval;
            }
            let move_number =
                (self.trees.primary().lock().history().len() / 2 + 1) as u32;
            let best_w = (best_eval.wl + 1.0 - best_eval.d) / 2.0;
            let best_d = best_eval.d;
            let best_l = best_w - best_eval.wl;
            self.max_eval = self.max_eval.update(best_w, best_d, best_l, blacks_move);

            if enable_resign && move_number >= player.options.resign_earliest_move {
                let resignpct = player.options.resign_percentage / 100.0;
                if player.options.resign_wdl_style {
                    // Judge the position, not the mover: any probability past
                    // the margin decides the game outright.
                    let threshold = 1.0 - resignpct;
                    if best_w > threshold {
                        self.result = if blacks_move {
                            GameResult::BlackWon
                        } else {
                            GameResult::WhiteWon
                        };
                        info!("game resigned (wdl margin, win) at move {}", move_number);
                        break;
                    }
                    if best_l > threshold {
                        self.result = if blacks_move {
                            GameResult::WhiteWon
                        } else {
                            GameResult::BlackWon
                        };
                        info!("game resigned (wdl margin, loss) at move {}", move_number);
                        break;
                    }
                    if best_d > threshold {
                        self.result = GameResult::Draw;
                        info!("game resigned (wdl margin, draw) at move {}", move_number);
                        break;
                    }
                } else if eval < resignpct {
                    // Always false when the percentage is zero.
                    self.result =
                        if blacks_move { GameResult::WhiteWon } else { GameResult::BlackWon };
                    info!("game resigned at move {} (eval {:.3})", move_number, eval);
                    break;
                }
            }

            let Some(mv) = self.accept_move(&search, &player, &tree) else {
                break;
            };
            self.trees.apply_to_both(mv);
            blacks_move = !blacks_move;
        }

        *self.active_search.lock().unwrap() = None;
        debug!(
            "game finished: {} after {} moves, {} playouts",
            self.result.as_pgn(),
            self.move_count,
            self.total_playouts
        );
    }

    /// Move-acceptance policy: take the search's best move if it is the
    /// most-visited one or clears the minimum-visits threshold; otherwise
    /// report the discard and make the search recompute. Bounded by the
    /// number of legal moves so a search that runs out of alternatives has
    /// its final answer accepted.
    fn accept_move(
        &self,
        search: &Arc<dyn Search>,
        player: &PlayerOptions,
        tree: &SharedTree,
    ) -> Option<Move> {
        let edge_count = tree.lock().edges().len();
        let mut rejections = 0usize;
        while let Some(mv) = search.best_move() {
            let (max_n, cur_n) = {
                let t = tree.lock();
                let mut max_n = 0u32;
                let mut cur_n = 0u32;
                for edge in t.edges() {
                    if edge.visits > max_n {
                        max_n = edge.visits;
                    }
                    if edge.mv == mv {
                        cur_n = edge.visits;
                    }
                }
                (max_n, cur_n)
            };
            if cur_n == max_n
                || cur_n >= player.options.minimum_allowed_visits
                || rejections >= edge_count
            {
                return Some(mv);
            }
            // Games already decided by this move are not worth excluding
            // from future openings.
            if tree.lock().result_after(mv) == GameResult::Undecided {
                if let Some(cb) = &player.discarded_callback {
                    let mut uci_moves = self.moves();
                    let head = tree.lock().head_board().clone();
                    uci_moves.push(move_uci(&head, mv, self.chess960));
                    debug!("discarding candidate {} ({} visits, max {})", mv, cur_n, max_n);
                    cb(&DiscardedGame { start_fen: self.start_fen.clone(), uci_moves });
                }
            }
            search.exclude_and_recompute();
            rejections += 1;
        }
        None
    }

    /// The externally visible move list: walk the tree back to the
    /// game-begin node, then replay forward from the starting position,
    /// spelling each move in the encoding of the side that played it.
    pub fn moves(&self) -> Vec<String> {
        let tree = self.trees.primary().lock();
        let moves = tree.moves_from_begin();
        let mut board = tree.start_board().clone();
        let mut result = Vec::with_capacity(moves.len());
        for mv in moves {
            result.push(move_uci(&board, mv, self.chess960));
            board.play(mv);
        }
        result
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    /// The position at the current head of the primary tree.
    pub fn final_position(&self) -> cozy_chess::Board {
        self.trees.primary().lock().head_board().clone()
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn total_playouts(&self) -> u64 {
        self.total_playouts
    }

    pub fn training_records(&self) -> &[TrainingRecord] {
        &self.training_data
    }

    /// Backfill outcome and moves-remaining labels and hand every record to
    /// the writer in capture order.
    pub fn write_training_data(&self, writer: &mut dyn TrainingWriter) -> std::io::Result<()> {
        backfill_records(&self.training_data, self.result, writer)
    }

    /// The lowest (most pessimistic) evaluation the eventual winner reported,
    /// or the margin-mode equivalent: how confidently a wrong resignation
    /// threshold would have ended this game the other way.
    pub fn worst_eval_for_winner_or_draw(&self) -> f32 {
        if self.players[0].options.resign_wdl_style {
            return match self.result {
                GameResult::WhiteWon => self.max_eval.draw.max(self.max_eval.black_win),
                GameResult::BlackWon => self.max_eval.draw.max(self.max_eval.white_win),
                _ => self.max_eval.white_win.max(self.max_eval.black_win),
            };
        }
        match self.result {
            GameResult::WhiteWon => self.min_eval[0],
            GameResult::BlackWon => self.min_eval[1],
            _ => self.min_eval[0].min(self.min_eval[1]),
        }
    }
}
