pub mod batch;
pub mod game;
pub mod training;

pub use batch::ValueSelfPlayGames;
pub use game::SelfPlayGame;
pub use training::{
    backfill_records, read_shard, ShardWriter, TrainingRecord, TrainingWriter, RECORD_SIZE,
    SHARD_MAGIC,
};

use std::sync::Arc;
use thiserror::Error;

use crate::eval::{EvalCache, Network};
use crate::search::responder::{BestMoveCallback, InfoCallback};
use crate::search::stoppers::SelfPlayLimits;
use crate::search::SearchFactory;

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("resign percentage {0} out of range 0..=100")]
    ResignPercentage(f32),
}

/// Per-player knobs, validated once at game construction so the per-move
/// path never does option lookups.
#[derive(Clone, Copy, Debug)]
pub struct SelfPlayOptions {
    /// Reuse the search tree between moves instead of trimming it.
    pub reuse_tree: bool,
    /// Resign when win percentage drops below this value (0 disables).
    pub resign_percentage: f32,
    /// If set, the percentage applies to any outcome probability being above
    /// 100% minus the percentage, instead of winrate being below it.
    pub resign_wdl_style: bool,
    /// Earliest move number at which resigning is allowed.
    pub resign_earliest_move: u32,
    /// Unless the selected move is the most-visited one, it is discarded and
    /// the search retried until its visits reach this threshold.
    pub minimum_allowed_visits: u32,
    /// Castling moves are encoded as "king takes rook".
    pub chess960: bool,
}

impl Default for SelfPlayOptions {
    fn default() -> Self {
        Self {
            reuse_tree: false,
            resign_percentage: 0.0,
            resign_wdl_style: false,
            resign_earliest_move: 0,
            minimum_allowed_visits: 0,
            chess960: false,
        }
    }
}

impl SelfPlayOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(0.0..=100.0).contains(&self.resign_percentage) {
            return Err(OptionsError::ResignPercentage(self.resign_percentage));
        }
        Ok(())
    }
}

/// A game that was cut short by the visit-threshold policy: the opening
/// position and every move played, the discarded candidate last.
#[derive(Clone, Debug)]
pub struct DiscardedGame {
    pub start_fen: String,
    pub uci_moves: Vec<String>,
}

pub type DiscardedCallback = Arc<dyn Fn(&DiscardedGame) + Send + Sync>;

/// Everything one side brings to a game. Immutable for the game's duration.
#[derive(Clone)]
pub struct PlayerOptions {
    pub network: Arc<dyn Network>,
    pub search_factory: Arc<dyn SearchFactory>,
    pub limits: SelfPlayLimits,
    pub options: SelfPlayOptions,
    pub cache: Option<Arc<EvalCache>>,
    pub best_move_callback: Option<BestMoveCallback>,
    pub info_callback: Option<InfoCallback>,
    pub discarded_callback: Option<DiscardedCallback>,
}

impl PlayerOptions {
    pub fn new(network: Arc<dyn Network>, search_factory: Arc<dyn SearchFactory>) -> Self {
        Self {
            network,
            search_factory,
            limits: SelfPlayLimits::default(),
            options: SelfPlayOptions::default(),
            cache: None,
            best_move_callback: None,
            info_callback: None,
            discarded_callback: None,
        }
    }
}
