// Self-play orchestration: drivers, policies, and the training-record
// pipeline. Search engines, evaluation backends, and tablebases plug in
// through the traits in `search`, `eval`, and `tablebase`.
pub mod board;
pub mod eval;
pub mod openings;
pub mod search;
pub mod selfplay;
pub mod tablebase;
pub mod tree;
