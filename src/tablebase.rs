use cozy_chess::Board;

/// Win/draw/loss classification from the probed side's (side to move's)
/// perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

/// Probe status. Only `Fail` invalidates the result; a probe may report a
/// correct WDL alongside any other status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeState {
    Fail,
    Ok,
    ChangeStm,
    ZeroingBestMove,
}

/// Endgame tablebase collaborator. Probed only for positions within the
/// supported piece count and with no remaining castling rights.
pub trait Tablebase: Send + Sync {
    fn max_cardinality(&self) -> usize;
    fn probe_wdl(&self, board: &Board) -> (Wdl, ProbeState);
}
