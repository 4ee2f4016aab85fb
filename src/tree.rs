use std::sync::{Arc, Mutex, MutexGuard};

use cozy_chess::{Board, Color, Move};

use crate::board::PositionError;
use crate::openings::Opening;

/// Outcome of one game. Monotonic: once a game leaves `Undecided` no further
/// moves are applied to its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Undecided,
    WhiteWon,
    BlackWon,
    Draw,
}

impl GameResult {
    pub fn as_pgn(&self) -> &'static str {
        match self {
            GameResult::Undecided => "*",
            GameResult::WhiteWon => "1-0",
            GameResult::BlackWon => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }
}

/// One legal move out of a node, with the visit count the search assigned it.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub mv: Move,
    pub visits: u32,
    child: Option<usize>,
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<usize>,
    // Move on the edge from the parent to this node.
    from: Option<Move>,
    edges: Vec<Edge>,
}

/// Mutable per-game position history plus a move/edge graph. Nodes live in an
/// arena indexed by position in `nodes`; index 0 is the game-begin node (the
/// opening's start position, before the forced prefix).
#[derive(Clone, Debug)]
pub struct NodeTree {
    nodes: Vec<Node>,
    head: usize,
    start_board: Board,
    start_fen: String,
    history: Vec<Board>,
}

impl NodeTree {
    pub fn from_opening(opening: &Opening) -> Result<Self, PositionError> {
        let start = Board::from_fen(&opening.start_fen, false)
            .map_err(|_| PositionError::BadFen(opening.start_fen.clone()))?;
        let mut tree = Self {
            nodes: vec![Node { parent: None, from: None, edges: Vec::new() }],
            head: 0,
            start_board: start.clone(),
            start_fen: opening.start_fen.clone(),
            history: vec![start],
        };
        for uci in &opening.uci_moves {
            let board = tree.head_board();
            let mv = crate::board::find_move(board, uci).ok_or_else(|| {
                PositionError::IllegalMove { mv: uci.clone(), fen: format!("{}", board) }
            })?;
            tree.make_move(mv);
        }
        Ok(tree)
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    pub fn start_board(&self) -> &Board {
        &self.start_board
    }

    pub fn head_board(&self) -> &Board {
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[Board] {
        &self.history
    }

    /// Plies played since the opening's start position, forced prefix included.
    pub fn ply_count(&self) -> usize {
        self.history.len() - 1
    }

    pub fn is_black_to_move(&self) -> bool {
        self.head_board().side_to_move() == Color::Black
    }

    /// Materialize edges for every legal move at the head. Idempotent.
    pub fn create_edges(&mut self) {
        if !self.nodes[self.head].edges.is_empty() {
            return;
        }
        let board = self.head_board().clone();
        let mut edges = Vec::new();
        board.generate_moves(|moves| {
            for m in moves {
                edges.push(Edge { mv: m, visits: 0, child: None });
            }
            false
        });
        self.nodes[self.head].edges = edges;
    }

    /// Edges out of the current head (empty until `create_edges` or a search
    /// has run on this node).
    pub fn edges(&self) -> &[Edge] {
        &self.nodes[self.head].edges
    }

    /// Record the visit count the search assigned to `mv` at the head.
    pub fn set_edge_visits(&mut self, mv: Move, visits: u32) {
        let head = self.head;
        if let Some(edge) = self.nodes[head].edges.iter_mut().find(|e| e.mv == mv) {
            edge.visits = visits;
        }
    }

    /// Apply a move at the head, extending the history and advancing the head
    /// to the (created if absent) child node.
    pub fn make_move(&mut self, mv: Move) {
        self.create_edges();
        let head = self.head;
        let edge_idx = self.nodes[head]
            .edges
            .iter()
            .position(|e| e.mv == mv)
            .unwrap_or_else(|| panic!("move {} is not legal at the tree head", mv));
        let child = match self.nodes[head].edges[edge_idx].child {
            Some(id) => id,
            None => {
                let id = self.nodes.len();
                self.nodes.push(Node { parent: Some(head), from: Some(mv), edges: Vec::new() });
                self.nodes[head].edges[edge_idx].child = Some(id);
                id
            }
        };
        let mut board = self.head_board().clone();
        board.play(mv);
        self.history.push(board);
        self.head = child;
    }

    /// Discard all search state below the current head and compact the arena
    /// down to the begin→head chain. Bounds memory growth when tree reuse is
    /// disabled.
    pub fn trim_below_current_head(&mut self) {
        let mut chain = Vec::new();
        let mut cur = Some(self.head);
        while let Some(id) = cur {
            chain.push(id);
            cur = self.nodes[id].parent;
        }
        chain.reverse();

        let mut nodes = Vec::with_capacity(chain.len());
        for (new_id, &old_id) in chain.iter().enumerate() {
            let old = &self.nodes[old_id];
            let mut node = Node {
                parent: if new_id == 0 { None } else { Some(new_id - 1) },
                from: old.from,
                edges: Vec::new(),
            };
            if new_id + 1 < chain.len() {
                let next = chain[new_id + 1];
                if let Some(e) = old.edges.iter().find(|e| e.child == Some(next)) {
                    node.edges.push(Edge { mv: e.mv, visits: e.visits, child: Some(new_id + 1) });
                }
            }
            nodes.push(node);
        }
        self.nodes = nodes;
        self.head = self.nodes.len() - 1;
    }

    /// Moves from the game-begin node to the current head, in play order.
    pub fn moves_from_begin(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut cur = self.head;
        while let Some(parent) = self.nodes[cur].parent {
            if let Some(mv) = self.nodes[cur].from {
                moves.push(mv);
            }
            cur = parent;
        }
        moves.reverse();
        moves
    }

    /// Game result of the current head position.
    pub fn compute_result(&self) -> GameResult {
        let last = self.history.len() - 1;
        result_of(&self.history[last], &self.history[..last])
    }

    /// Game result of the position reached by playing `mv` at the head,
    /// without mutating the tree.
    pub fn result_after(&self, mv: Move) -> GameResult {
        let mut board = self.head_board().clone();
        board.play(mv);
        result_of(&board, &self.history)
    }
}

fn result_of(board: &Board, prior: &[Board]) -> GameResult {
    let mut any_move = false;
    board.generate_moves(|_| {
        any_move = true;
        true
    });
    if !any_move {
        if board.checkers().is_empty() {
            return GameResult::Draw;
        }
        return match board.side_to_move() {
            Color::White => GameResult::BlackWon,
            Color::Black => GameResult::WhiteWon,
        };
    }
    if board.halfmove_clock() >= 100 {
        return GameResult::Draw;
    }
    let hash = board.hash();
    let repetitions = 1 + prior.iter().filter(|b| b.hash() == hash).count();
    if repetitions >= 3 {
        return GameResult::Draw;
    }
    // Bare kings cannot force mate.
    if board.occupied().into_iter().count() == 2 {
        return GameResult::Draw;
    }
    GameResult::Undecided
}

/// Handle to a tree mutated by one game at a time. The lock is the "no
/// concurrent writers to one tree" contract; searches update edge visit
/// counts through it while the driver thread blocks.
#[derive(Clone)]
pub struct SharedTree(Arc<Mutex<NodeTree>>);

impl SharedTree {
    pub fn new(tree: NodeTree) -> Self {
        Self(Arc::new(Mutex::new(tree)))
    }

    pub fn lock(&self) -> MutexGuard<'_, NodeTree> {
        self.0.lock().unwrap()
    }
}

/// Tree ownership for one game: both players on one tree (symmetric
/// self-play) or a private tree per side kept synchronized move-for-move.
pub enum TreePair {
    Shared(SharedTree),
    Paired { white: SharedTree, black: SharedTree },
}

impl TreePair {
    pub fn from_opening(opening: &Opening, shared: bool) -> Result<Self, PositionError> {
        let white = SharedTree::new(NodeTree::from_opening(opening)?);
        if shared {
            Ok(TreePair::Shared(white))
        } else {
            let black = SharedTree::new(NodeTree::from_opening(opening)?);
            Ok(TreePair::Paired { white, black })
        }
    }

    /// The tree used for result computation and move reconstruction.
    pub fn primary(&self) -> &SharedTree {
        match self {
            TreePair::Shared(tree) => tree,
            TreePair::Paired { white, .. } => white,
        }
    }

    pub fn for_player(&self, black: bool) -> &SharedTree {
        match self {
            TreePair::Shared(tree) => tree,
            TreePair::Paired { white, black: b } => {
                if black {
                    b
                } else {
                    white
                }
            }
        }
    }

    /// Apply an accepted move to every tracked tree in lockstep. On `Paired`
    /// the histories must agree before the move; diverging them is a caller
    /// bug, not a recoverable condition.
    pub fn apply_to_both(&self, mv: Move) {
        match self {
            TreePair::Shared(tree) => tree.lock().make_move(mv),
            TreePair::Paired { white, black } => {
                let mut w = white.lock();
                let mut b = black.lock();
                assert_eq!(
                    w.head_board().hash(),
                    b.head_board().hash(),
                    "paired trees diverged before move {}",
                    mv
                );
                w.make_move(mv);
                b.make_move(mv);
            }
        }
    }
}
