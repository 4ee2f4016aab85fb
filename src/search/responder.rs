use std::sync::Arc;

use cozy_chess::{Board, Move};

use crate::board::legacy_move_uci;

/// Best move reported by a search: the raw move plus its UCI spelling in the
/// notation the game is being played under.
#[derive(Clone, Debug)]
pub struct BestMoveInfo {
    pub best: Move,
    pub uci: String,
}

impl BestMoveInfo {
    pub fn new(best: Move) -> Self {
        Self { best, uci: format!("{}", best) }
    }
}

/// Progress snapshot forwarded while a search runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchInfo {
    pub depth: u32,
    pub nodes: u64,
    pub score_cp: i32,
}

pub type BestMoveCallback = Arc<dyn Fn(&BestMoveInfo) + Send + Sync>;
pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

pub trait UciResponder: Send {
    fn outgoing_best_move(&self, info: &BestMoveInfo);
    fn outgoing_info(&self, info: &SearchInfo);
}

/// Adapts the per-player callbacks into a responder; absent callbacks drop
/// the traffic.
pub struct CallbackResponder {
    best_move: Option<BestMoveCallback>,
    info: Option<InfoCallback>,
}

impl CallbackResponder {
    pub fn new(best_move: Option<BestMoveCallback>, info: Option<InfoCallback>) -> Self {
        Self { best_move, info }
    }
}

impl UciResponder for CallbackResponder {
    fn outgoing_best_move(&self, info: &BestMoveInfo) {
        if let Some(cb) = &self.best_move {
            cb(info);
        }
    }

    fn outgoing_info(&self, info: &SearchInfo) {
        if let Some(cb) = &self.info {
            cb(info);
        }
    }
}

/// Rewrites king-takes-rook castling best moves into legacy notation before
/// forwarding. Interposed when the match is not using extended castling
/// notation, so the other side's move encoding stays compatible.
pub struct CastlingDowngrade {
    inner: Box<dyn UciResponder>,
    head: Board,
}

impl CastlingDowngrade {
    pub fn new(inner: Box<dyn UciResponder>, head: Board) -> Self {
        Self { inner, head }
    }
}

impl UciResponder for CastlingDowngrade {
    fn outgoing_best_move(&self, info: &BestMoveInfo) {
        let rewritten =
            BestMoveInfo { best: info.best, uci: legacy_move_uci(&self.head, info.best) };
        self.inner.outgoing_best_move(&rewritten);
    }

    fn outgoing_info(&self, info: &SearchInfo) {
        self.inner.outgoing_info(info);
    }
}
