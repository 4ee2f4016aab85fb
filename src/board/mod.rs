pub mod cozy;

pub use cozy::{
    find_move, has_castling_rights, is_castling, legacy_move_uci, move_uci, piece_count,
    Position, PositionError, STARTPOS_FEN,
};
