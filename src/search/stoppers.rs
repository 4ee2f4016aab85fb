use std::time::Duration;

/// Running totals a search exposes to its stop condition.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchStatistics {
    pub visits: u64,
    pub playouts: u64,
    pub elapsed: Duration,
}

pub trait SearchStopper: Send + Sync {
    fn should_stop(&self, stats: &SearchStatistics) -> bool;
}

pub struct VisitsStopper {
    limit: u64,
}

impl VisitsStopper {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl SearchStopper for VisitsStopper {
    fn should_stop(&self, stats: &SearchStatistics) -> bool {
        stats.visits >= self.limit
    }
}

pub struct PlayoutsStopper {
    limit: u64,
}

impl PlayoutsStopper {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl SearchStopper for PlayoutsStopper {
    fn should_stop(&self, stats: &SearchStatistics) -> bool {
        stats.playouts >= self.limit
    }
}

pub struct TimeLimitStopper {
    limit: Duration,
}

impl TimeLimitStopper {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl SearchStopper for TimeLimitStopper {
    fn should_stop(&self, stats: &SearchStatistics) -> bool {
        stats.elapsed >= self.limit
    }
}

/// Logical OR across stoppers; an empty chain never fires.
#[derive(Default)]
pub struct ChainedStopper {
    stoppers: Vec<Box<dyn SearchStopper>>,
}

impl ChainedStopper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stopper: Box<dyn SearchStopper>) {
        self.stoppers.push(stopper);
    }

    pub fn len(&self) -> usize {
        self.stoppers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stoppers.is_empty()
    }
}

impl SearchStopper for ChainedStopper {
    fn should_stop(&self, stats: &SearchStatistics) -> bool {
        self.stoppers.iter().any(|s| s.should_stop(stats))
    }
}

/// Per-search caps. Negative means "no cap"; ranges beyond that are the
/// option layer's problem, not checked here.
#[derive(Clone, Copy, Debug)]
pub struct SelfPlayLimits {
    pub visits: i64,
    pub playouts: i64,
    pub movetime_ms: i64,
}

impl Default for SelfPlayLimits {
    fn default() -> Self {
        Self { visits: -1, playouts: -1, movetime_ms: -1 }
    }
}

impl SelfPlayLimits {
    /// Compose the stop condition for one search invocation: any configured
    /// cap halts the search; absent caps contribute nothing.
    pub fn make_search_stopper(&self) -> ChainedStopper {
        let mut chain = ChainedStopper::new();
        if self.visits >= 0 {
            chain.add(Box::new(VisitsStopper::new(self.visits as u64)));
        }
        if self.playouts >= 0 {
            chain.add(Box::new(PlayoutsStopper::new(self.playouts as u64)));
        }
        if self.movetime_ms >= 0 {
            chain.add(Box::new(TimeLimitStopper::new(Duration::from_millis(
                self.movetime_ms as u64,
            ))));
        }
        chain
    }
}
