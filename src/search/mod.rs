pub mod responder;
pub mod stoppers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cozy_chess::Move;

use crate::eval::{EvalCache, Network};
use crate::search::responder::UciResponder;
use crate::search::stoppers::ChainedStopper;
use crate::tree::SharedTree;

/// Cooperative cancellation token. Cloned into every long-running call;
/// polled at the top of turns/waves and before search construction.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Best-move evaluation components reported by a finished search:
/// win-minus-loss in [-1, 1] for the side to move, draw probability, and a
/// moves-left estimate in plies.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestEval {
    pub wl: f32,
    pub d: f32,
    pub ml: f32,
}

/// Blocking "run search, then report best move and evaluation" contract.
///
/// The engine behind this trait owns the hard part (expansion, selection,
/// backpropagation); the driver only schedules it. A conforming search
/// populates visit counts on the head edges of the tree it was bound to.
/// `exclude_and_recompute` discards the current best answer and recomputes;
/// once every move has been excluded, repeated calls keep reporting the last
/// remaining answer rather than failing.
pub trait Search: Send + Sync {
    fn run_blocking(&self, threads: usize);
    fn best_move(&self) -> Option<Move>;
    fn best_eval(&self) -> BestEval;
    fn total_playouts(&self) -> u64;
    fn exclude_and_recompute(&self);
    fn abort(&self);
}

/// Everything a search needs: the tree to search, the evaluation backend, an
/// optional shared cache, the composed stop condition, the responder for
/// best-move/info traffic, and the abort token.
pub struct SearchContext {
    pub tree: SharedTree,
    pub network: Arc<dyn Network>,
    pub cache: Option<Arc<EvalCache>>,
    pub stopper: ChainedStopper,
    pub responder: Box<dyn UciResponder>,
    pub cancel: CancelToken,
}

/// Constructs a search bound to one decision point. The driver holds the
/// per-game lock while calling this so an abort can never race construction.
pub trait SearchFactory: Send + Sync {
    fn create(&self, ctx: SearchContext) -> Arc<dyn Search>;
}
