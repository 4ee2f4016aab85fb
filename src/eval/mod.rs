pub mod material;

use std::collections::HashMap;
use std::sync::Mutex;

use cozy_chess::Board;

/// One evaluated position: value in [-1, 1] for the side to move, draw
/// probability, moves-left estimate in plies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkOutput {
    pub q: f32,
    pub d: f32,
    pub ml: f32,
}

/// How the backend encodes positions for training records. `Canonical`
/// stores side-to-move in bit 7 of the record's invariance field and uses
/// the side/en-passant byte for the en-passant file mask instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Classic,
    Canonical,
}

/// "Submit positions, get value outputs synchronously" contract. One
/// computation collects a batch, evaluates it in a single blocking call, and
/// serves the outputs by input index.
pub trait Computation {
    fn add_input(&mut self, board: &Board);
    fn compute_blocking(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn q_val(&self, idx: usize) -> f32;
    fn d_val(&self, idx: usize) -> f32;
    fn ml_val(&self, idx: usize) -> f32;
}

/// Evaluation backend handle. May be shared by many concurrent games; it is
/// the backend's contract to serialize internally if required.
pub trait Network: Send + Sync {
    fn input_format(&self) -> InputFormat;
    fn new_computation(&self) -> Box<dyn Computation>;
}

/// Shared per-position output cache keyed by board hash. Advisory: probing
/// and storing race benignly across games.
pub struct EvalCache {
    map: Mutex<HashMap<u64, NetworkOutput>>,
    capacity: usize,
}

impl EvalCache {
    pub fn new(capacity: usize) -> Self {
        Self { map: Mutex::new(HashMap::new()), capacity: capacity.max(1) }
    }

    pub fn probe(&self, key: u64) -> Option<NetworkOutput> {
        self.map.lock().unwrap().get(&key).copied()
    }

    pub fn store(&self, key: u64, output: NetworkOutput) {
        let mut map = self.map.lock().unwrap();
        if map.len() >= self.capacity && !map.contains_key(&key) {
            // Full: drop an arbitrary resident entry rather than grow.
            if let Some(&evict) = map.keys().next() {
                map.remove(&evict);
            }
        }
        map.insert(key, output);
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
