use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::board::Board;
use crate::moves::types::Move;

pub struct SearchContext {
    pub killer_moves: Vec<[Option<Move>; 2]>,
    pub history: [[i32; 64]; 64],
    /// Root-move restriction (`go searchmoves ...`). Empty means unrestricted;
    /// only consulted at `ply == 0`.
    pub root_filter: Vec<Move>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchContext {
    pub fn new() -> Self {
        Self {
            killer_moves: vec![[None; 2]; 64],
            history: [[0; 64]; 64],
            root_filter: Vec::new(),
        }
    }

    pub fn update_killer(&mut self, ply: usize, mv: Move) {
        if self.killer_moves[ply][0] != Some(mv) {
            self.killer_moves[ply][1] = self.killer_moves[ply][0];
            self.killer_moves[ply][0] = Some(mv);
        }
    }

    pub fn update_history(&mut self, mv: Move, depth: i32) {
        let bonus = (depth * depth).min(400);
        self.history[mv.from.index() as usize][mv.to.index() as usize] += bonus;
    }
}

/// Root position plus the knobs a front-end can set for one `start()` call.
pub struct SearchOptions {
    pub position: Board,
    /// Maximum plies; `None` means search until the time/node budget runs out.
    pub depth: Option<u8>,
    pub search_time: Option<Duration>,
    pub max_nodes: Option<u64>,
    /// Empty means all legal root moves are considered.
    pub moves_to_search: Vec<Move>,
}

impl SearchOptions {
    pub fn new(position: Board) -> Self {
        Self {
            position,
            depth: None,
            search_time: None,
            max_nodes: None,
            moves_to_search: Vec::new(),
        }
    }
}

/// Snapshot handed to callbacks after each completed iteration and at the end
/// of a search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub duration: Duration,
    pub depth: u8,
    pub score: i32,
    pub best_move: Option<Move>,
    pub nodes_searched: u64,
}

/// Observer hooks for a running search. Default no-op methods let a caller
/// implement only the ones it cares about.
pub trait Callbacks: Send {
    fn on_iteration(&mut self, _result: &SearchResult) {}
    fn on_search_complete(&mut self, _result: &SearchResult) {}
}

pub struct NullCallbacks;

impl Callbacks for NullCallbacks {}

/// Captures a start time and an exit flag; `should_exit` folds manual abort
/// and wall-clock timeout into a single check so the search loop polls one
/// thing instead of two.
#[derive(Clone)]
pub struct Interrupter {
    start: Instant,
    search_time: Option<Duration>,
    exit: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn new(exit: Arc<AtomicBool>, search_time: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            search_time,
            exit,
        }
    }

    pub fn should_exit(&self) -> bool {
        if self.exit.load(Ordering::Relaxed) {
            return true;
        }
        match self.search_time {
            Some(limit) => self.start.elapsed() >= limit,
            None => false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Owns the killer/history tables plus the two atomics the thread wrapper and
/// the searcher cooperate through. `exit` is set by the caller to request an
/// abort; `active` is set by the searcher for the duration of a `start()`.
pub struct Context {
    pub tables: SearchContext,
    pub exit: Arc<AtomicBool>,
    pub active: Arc<AtomicBool>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            tables: SearchContext::new(),
            exit: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interrupter(&self, search_time: Option<Duration>) -> Interrupter {
        Interrupter::new(self.exit.clone(), search_time)
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
    }

    pub fn clear_exit(&self) {
        self.exit.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupter_honors_manual_exit() {
        let exit = Arc::new(AtomicBool::new(false));
        let interrupter = Interrupter::new(exit.clone(), None);
        assert!(!interrupter.should_exit());
        exit.store(true, Ordering::Relaxed);
        assert!(interrupter.should_exit());
    }

    #[test]
    fn interrupter_honors_search_time() {
        let exit = Arc::new(AtomicBool::new(false));
        let interrupter = Interrupter::new(exit, Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(1));
        assert!(interrupter.should_exit());
    }

    #[test]
    fn killer_moves_slide_on_update() {
        use crate::board::Piece;
        use crate::moves::types::QUIET_MOVE;
        use crate::square::Square;

        let mut ctx = SearchContext::new();
        let a = Move {
            from: Square::from_index(0),
            to: Square::from_index(1),
            piece: Piece::Pawn,
            promotion: None,
            flags: QUIET_MOVE,
        };
        let b = Move {
            from: Square::from_index(2),
            to: Square::from_index(3),
            piece: Piece::Pawn,
            promotion: None,
            flags: QUIET_MOVE,
        };
        ctx.update_killer(0, a);
        ctx.update_killer(0, b);
        assert_eq!(ctx.killer_moves[0][0], Some(b));
        assert_eq!(ctx.killer_moves[0][1], Some(a));
    }
}
