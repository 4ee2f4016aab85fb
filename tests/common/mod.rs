//! Test doubles for the search, evaluation, and tablebase collaborators.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cozy_chess::{Board, Move};

use playforge::eval::material::material_eval_cp;
use playforge::eval::{Computation, EvalCache, InputFormat, Network, NetworkOutput};
use playforge::search::responder::{BestMoveInfo, UciResponder};
use playforge::search::{BestEval, CancelToken, Search, SearchContext, SearchFactory};
use playforge::selfplay::{TrainingRecord, TrainingWriter};
use playforge::tablebase::{ProbeState, Tablebase, Wdl};
use playforge::tree::{GameResult, SharedTree};

/// Search double driven by one-ply material greed. Deterministic, so games
/// end by repetition or the 50-move rule if nothing decisive happens.
pub struct MaterialSearchFactory {
    pub eval_ml: f32,
    /// Reported instead of the computed evaluation when set.
    pub eval_override: Option<BestEval>,
}

impl Default for MaterialSearchFactory {
    fn default() -> Self {
        Self { eval_ml: 20.0, eval_override: None }
    }
}

impl SearchFactory for MaterialSearchFactory {
    fn create(&self, ctx: SearchContext) -> Arc<dyn Search> {
        Arc::new(MaterialSearch {
            tree: ctx.tree,
            cancel: ctx.cancel,
            cache: ctx.cache,
            eval_ml: self.eval_ml,
            eval_override: self.eval_override,
            state: Mutex::new(MaterialState { ranked: Vec::new(), excluded: 0, best_q: 0.0 }),
            responder: Mutex::new(ctx.responder),
        })
    }
}

struct MaterialState {
    // Moves best-first; `excluded` counts discarded answers.
    ranked: Vec<Move>,
    excluded: usize,
    best_q: f32,
}

pub struct MaterialSearch {
    tree: SharedTree,
    cancel: CancelToken,
    cache: Option<Arc<EvalCache>>,
    eval_ml: f32,
    eval_override: Option<BestEval>,
    state: Mutex<MaterialState>,
    responder: Mutex<Box<dyn UciResponder>>,
}

impl Search for MaterialSearch {
    fn run_blocking(&self, _threads: usize) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut tree = self.tree.lock();
        tree.create_edges();
        let moves: Vec<Move> = tree.edges().iter().map(|e| e.mv).collect();
        let mut scored: Vec<(Move, f32)> = Vec::with_capacity(moves.len());
        for mv in moves {
            let q = match tree.result_after(mv) {
                GameResult::Undecided => {
                    let mut board = tree.head_board().clone();
                    board.play(mv);
                    -self.child_q(&board)
                }
                GameResult::Draw => 0.0,
                _ => 1.0,
            };
            scored.push((mv, q));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        for (rank, (mv, _)) in scored.iter().enumerate() {
            let visits = if rank == 0 { 800 } else { 1 };
            tree.set_edge_visits(*mv, visits);
        }
        let mut state = self.state.lock().unwrap();
        state.best_q = scored.first().map_or(0.0, |s| s.1);
        state.ranked = scored.into_iter().map(|s| s.0).collect();
        state.excluded = 0;
        if let Some(&best) = state.ranked.first() {
            self.responder.lock().unwrap().outgoing_best_move(&BestMoveInfo::new(best));
        }
    }

    fn best_move(&self) -> Option<Move> {
        let state = self.state.lock().unwrap();
        if state.ranked.is_empty() {
            return None;
        }
        let idx = state.excluded.min(state.ranked.len() - 1);
        Some(state.ranked[idx])
    }

    fn best_eval(&self) -> BestEval {
        if let Some(eval) = self.eval_override {
            return eval;
        }
        let state = self.state.lock().unwrap();
        BestEval { wl: state.best_q, d: 0.1, ml: self.eval_ml }
    }

    fn total_playouts(&self) -> u64 {
        800
    }

    fn exclude_and_recompute(&self) {
        let mut state = self.state.lock().unwrap();
        if state.excluded + 1 < state.ranked.len() {
            state.excluded += 1;
        }
    }

    fn abort(&self) {
        self.cancel.cancel();
    }
}

impl MaterialSearch {
    /// Child evaluation from the child's side to move, through the shared
    /// cache when one is configured.
    fn child_q(&self, board: &Board) -> f32 {
        if let Some(cache) = &self.cache {
            if let Some(out) = cache.probe(board.hash()) {
                return out.q;
            }
        }
        let q = ((material_eval_cp(board) as f32) / 600.0).tanh();
        if let Some(cache) = &self.cache {
            cache.store(board.hash(), NetworkOutput { q, d: 0.0, ml: 0.0 });
        }
        q
    }
}

/// Fully scripted search: fixed visit counts, a fixed answer sequence, and a
/// fixed evaluation.
pub struct ScriptedFactory {
    /// Per-move visit counts as (uci, visits).
    pub visits: Vec<(&'static str, u32)>,
    /// Answers reported in order; `exclude_and_recompute` advances, the last
    /// answer repeats once exhausted.
    pub answers: Vec<&'static str>,
    pub eval: BestEval,
}

impl SearchFactory for ScriptedFactory {
    fn create(&self, ctx: SearchContext) -> Arc<dyn Search> {
        Arc::new(ScriptedSearch {
            tree: ctx.tree,
            visits: self.visits.clone(),
            answers: self.answers.clone(),
            eval: self.eval,
            cursor: AtomicUsize::new(0),
        })
    }
}

pub struct ScriptedSearch {
    tree: SharedTree,
    visits: Vec<(&'static str, u32)>,
    answers: Vec<&'static str>,
    eval: BestEval,
    cursor: AtomicUsize,
}

impl Search for ScriptedSearch {
    fn run_blocking(&self, _threads: usize) {
        let mut tree = self.tree.lock();
        tree.create_edges();
        let board = tree.head_board().clone();
        for (uci, visits) in &self.visits {
            if let Some(mv) = playforge::board::find_move(&board, uci) {
                tree.set_edge_visits(mv, *visits);
            }
        }
        self.cursor.store(0, Ordering::SeqCst);
    }

    fn best_move(&self) -> Option<Move> {
        let idx = self.cursor.load(Ordering::SeqCst).min(self.answers.len().saturating_sub(1));
        let uci = self.answers.get(idx)?;
        let board = self.tree.lock().head_board().clone();
        playforge::board::find_move(&board, uci)
    }

    fn best_eval(&self) -> BestEval {
        self.eval
    }

    fn total_playouts(&self) -> u64 {
        self.visits.iter().map(|(_, n)| u64::from(*n)).sum()
    }

    fn exclude_and_recompute(&self) {
        self.cursor.fetch_add(1, Ordering::SeqCst);
    }

    fn abort(&self) {}
}

/// Search double that follows a predetermined game line, one ply per search,
/// reporting a fixed evaluation. Share one instance between both players so
/// the cursor advances across the whole game.
pub struct SequenceFactory {
    line: Vec<&'static str>,
    cursor: Arc<AtomicUsize>,
    eval: BestEval,
}

impl SequenceFactory {
    pub fn new(line: &[&'static str], eval: BestEval) -> Self {
        Self { line: line.to_vec(), cursor: Arc::new(AtomicUsize::new(0)), eval }
    }
}

impl SearchFactory for SequenceFactory {
    fn create(&self, ctx: SearchContext) -> Arc<dyn Search> {
        Arc::new(SequenceSearch {
            tree: ctx.tree,
            line: self.line.clone(),
            cursor: self.cursor.clone(),
            eval: self.eval,
            chosen: Mutex::new(None),
        })
    }
}

pub struct SequenceSearch {
    tree: SharedTree,
    line: Vec<&'static str>,
    cursor: Arc<AtomicUsize>,
    eval: BestEval,
    chosen: Mutex<Option<Move>>,
}

impl Search for SequenceSearch {
    fn run_blocking(&self, _threads: usize) {
        let ply = self.cursor.fetch_add(1, Ordering::SeqCst);
        let mut tree = self.tree.lock();
        tree.create_edges();
        let board = tree.head_board().clone();
        let mv = self.line.get(ply).and_then(|uci| playforge::board::find_move(&board, uci));
        if let Some(m) = mv {
            tree.set_edge_visits(m, 800);
        }
        *self.chosen.lock().unwrap() = mv;
    }

    fn best_move(&self) -> Option<Move> {
        *self.chosen.lock().unwrap()
    }

    fn best_eval(&self) -> BestEval {
        self.eval
    }

    fn total_playouts(&self) -> u64 {
        800
    }

    fn exclude_and_recompute(&self) {}

    fn abort(&self) {}
}

/// Material search that cancels the game's token after a fixed number of
/// completed searches, emulating an external abort landing mid-game.
pub struct AbortingFactory {
    pub inner: MaterialSearchFactory,
    pub after_moves: usize,
    pub started: Arc<AtomicUsize>,
}

impl SearchFactory for AbortingFactory {
    fn create(&self, ctx: SearchContext) -> Arc<dyn Search> {
        let cancel = ctx.cancel.clone();
        let count = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let search = self.inner.create(ctx);
        if count > self.after_moves {
            cancel.cancel();
        }
        search
    }
}

/// Network double with a constant output; counts evaluated positions.
pub struct ConstNetwork {
    pub output: NetworkOutput,
    pub format: InputFormat,
    pub evaluated: Arc<AtomicUsize>,
    /// Cancelled right after each batched computation when filled in; lets a
    /// test stop the batch driver after exactly one wave.
    pub cancel_after_compute: Arc<Mutex<Option<CancelToken>>>,
}

impl ConstNetwork {
    pub fn new(q: f32) -> Self {
        Self {
            output: NetworkOutput { q, d: 0.0, ml: 10.0 },
            format: InputFormat::Classic,
            evaluated: Arc::new(AtomicUsize::new(0)),
            cancel_after_compute: Arc::new(Mutex::new(None)),
        }
    }
}

impl Network for ConstNetwork {
    fn input_format(&self) -> InputFormat {
        self.format
    }

    fn new_computation(&self) -> Box<dyn Computation> {
        Box::new(ConstComputation {
            output: self.output,
            count: 0,
            evaluated: self.evaluated.clone(),
            cancel_after_compute: self.cancel_after_compute.clone(),
        })
    }
}

struct ConstComputation {
    output: NetworkOutput,
    count: usize,
    evaluated: Arc<AtomicUsize>,
    cancel_after_compute: Arc<Mutex<Option<CancelToken>>>,
}

impl Computation for ConstComputation {
    fn add_input(&mut self, _board: &Board) {
        self.count += 1;
    }

    fn compute_blocking(&mut self) {
        self.evaluated.fetch_add(self.count, Ordering::SeqCst);
        if let Some(token) = self.cancel_after_compute.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    fn len(&self) -> usize {
        self.count
    }

    fn q_val(&self, _idx: usize) -> f32 {
        self.output.q
    }

    fn d_val(&self, _idx: usize) -> f32 {
        self.output.d
    }

    fn ml_val(&self, _idx: usize) -> f32 {
        self.output.ml
    }
}

/// Tablebase double with a fixed verdict.
pub struct FixedTablebase {
    pub max_cardinality: usize,
    pub wdl: Wdl,
    pub state: ProbeState,
    pub probes: Arc<AtomicUsize>,
}

impl FixedTablebase {
    pub fn new(max_cardinality: usize, wdl: Wdl, state: ProbeState) -> Self {
        Self { max_cardinality, wdl, state, probes: Arc::new(AtomicUsize::new(0)) }
    }
}

impl Tablebase for FixedTablebase {
    fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    fn probe_wdl(&self, _board: &Board) -> (Wdl, ProbeState) {
        self.probes.fetch_add(1, Ordering::SeqCst);
        (self.wdl, self.state)
    }
}

/// Writer double collecting records in memory.
#[derive(Default)]
pub struct VecWriter {
    pub records: Vec<TrainingRecord>,
}

impl TrainingWriter for VecWriter {
    fn write(&mut self, record: &TrainingRecord) -> std::io::Result<()> {
        self.records.push(*record);
        Ok(())
    }
}

pub fn shared_cache() -> Arc<EvalCache> {
    Arc::new(EvalCache::new(1024))
}
