// src/search/thread.rs
// Background search worker: hands a `SearchOptions` to a long-lived thread
// and lets the caller poll/abort/wait without blocking the UCI loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::moves::magic::MagicTables;
use crate::search::context::{Callbacks, Context, NullCallbacks, SearchOptions};
use crate::search::search::run;
use crate::search::tt::TranspositionTable;
use tracing::instrument;

struct Job {
    options: SearchOptions,
    callbacks: Box<dyn Callbacks>,
}

struct Shared {
    job: Mutex<Option<Job>>,
    cv: Condvar,
}

/// Owns one worker thread that runs `search::run` in a loop. `start` hands
/// off a fresh position and returns immediately; `abort` requests an early
/// stop; `wait` blocks until the worker goes idle again, which establishes a
/// happens-before edge on the TT and killer/history tables the worker just
/// touched (the `active` flag uses Acquire/Release for exactly this).
pub struct SearchThread {
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    exit: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    tt: Arc<Mutex<TranspositionTable>>,
}

impl SearchThread {
    pub fn new(tables: Arc<MagicTables>, tt_size_mb: usize) -> Self {
        let shared = Arc::new(Shared {
            job: Mutex::new(None),
            cv: Condvar::new(),
        });
        let mut context = Context::new();
        let exit = context.exit.clone();
        let active = context.active.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let tt = Arc::new(Mutex::new(TranspositionTable::new(tt_size_mb)));

        let worker_shared = shared.clone();
        let worker_shutdown = shutdown.clone();
        let worker_tt = tt.clone();

        let handle = thread::Builder::new()
            .name("vantage-search".into())
            .spawn(move || {
                loop {
                    let job = {
                        let mut job = worker_shared.job.lock().unwrap();
                        while job.is_none() && !worker_shutdown.load(Ordering::Acquire) {
                            job = worker_shared.cv.wait(job).unwrap();
                        }
                        if worker_shutdown.load(Ordering::Acquire) && job.is_none() {
                            break;
                        }
                        job.take()
                    };

                    let Some(mut job) = job else {
                        continue;
                    };

                    context.clear_exit();
                    let mut tt_guard = worker_tt.lock().unwrap();
                    let _ = run(
                        &mut context,
                        &tables,
                        &mut tt_guard,
                        job.options,
                        job.callbacks.as_mut(),
                    );
                }
            })
            .expect("failed to spawn search thread");

        Self {
            handle: Some(handle),
            shared,
            exit,
            active,
            shutdown,
            tt,
        }
    }

    /// Hands a position off to the worker. Any in-flight search must be
    /// stopped first (`abort` + `wait`), or the new options simply overwrite
    /// the pending hand-off slot before the worker gets to it.
    #[instrument(skip(self, options), fields(depth = options.depth.unwrap_or(0)))]
    pub fn start(&self, options: SearchOptions) {
        self.start_with_callbacks(options, Box::new(NullCallbacks));
    }

    /// Like `start`, but drives `callbacks` on each completed iteration and
    /// on final completion instead of discarding progress reports. The UCI
    /// front-end uses this to emit `info`/`bestmove` lines.
    #[instrument(skip(self, options, callbacks), fields(depth = options.depth.unwrap_or(0)))]
    pub fn start_with_callbacks(&self, options: SearchOptions, callbacks: Box<dyn Callbacks>) {
        let mut job = self.shared.job.lock().unwrap();
        *job = Some(Job { options, callbacks });
        self.shared.cv.notify_one();
    }

    /// Requests the running search stop at its next poll point.
    pub fn abort(&self) {
        self.exit.store(true, Ordering::Release);
    }

    /// Blocks until the worker is idle (no search in progress).
    pub fn wait(&self) {
        while self.active.load(Ordering::Acquire) {
            thread::yield_now();
        }
    }

    /// Aborts any in-flight search, waits for the worker to go idle, then
    /// clears the transposition table and the exit flag so the next `start`
    /// isn't aborted before it begins. Matches the `ucinewgame` contract
    /// (spec.md §4.8, §6): the TT must never be cleared while a search is
    /// still touching it.
    pub fn reset(&self) {
        self.abort();
        self.wait();
        self.tt.lock().unwrap().clear();
        self.exit.store(false, Ordering::Release);
    }

    /// Clears the transposition table without touching the exit flag. Only
    /// safe to call while the worker is idle (the UCI `Clear Hash` option).
    pub fn clear_tt(&self) {
        self.wait();
        self.tt.lock().unwrap().clear();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for SearchThread {
    fn drop(&mut self) {
        self.abort();
        self.shutdown.store(true, Ordering::Release);
        self.shared.cv.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::moves::magic::loader::load_magic_tables;
    use std::time::Duration;

    #[test]
    fn start_wait_reports_idle_afterwards() {
        let tables = Arc::new(load_magic_tables());
        let search_thread = SearchThread::new(tables, 4);

        let mut options = SearchOptions::new(Board::new());
        options.depth = Some(3);

        search_thread.start(options);
        search_thread.wait();

        assert!(!search_thread.is_active());
    }

    #[test]
    fn abort_stops_a_time_unbounded_search() {
        let tables = Arc::new(load_magic_tables());
        let search_thread = SearchThread::new(tables, 4);

        let mut options = SearchOptions::new(Board::new());
        options.search_time = Some(Duration::from_secs(30));

        search_thread.start(options);
        thread::sleep(Duration::from_millis(20));
        search_thread.abort();
        search_thread.wait();

        assert!(!search_thread.is_active());
    }
}
