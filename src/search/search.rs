use crate::board::Board;
use crate::moves::execute::{make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::{Callbacks, Context, Interrupter, SearchOptions, SearchResult};
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{MATE_THRESHOLD, NodeType, TranspositionTable, score_to_tt};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const INF: i32 = 32000;
pub const MATE_SCORE: i32 = 31000;
const MAX_Q_SEARCH_DEPTH: usize = 100;
const DRAW_SCORE: i32 = 0;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP)
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Futility Pruning (FP)
const FP_DEPTH_LIMIT: i32 = 7;
const FP_MARGIN_BASE: i32 = 100;
const FP_MARGIN_MULT: i32 = 100;
const FP_HISTORY_THRESHOLD: i32 = 512;

// Late Move Pruning (LMP)
const LMP_DEPTH_LIMIT: i32 = 14;
const LMP_BASE_MOVES: i32 = 3;
const LMP_MOVE_MULTIPLIER: i32 = 6;

// Late Move Reduction (LMR)
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
    interrupter: Option<Interrupter>,
    max_nodes: Option<u64>,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
            interrupter: None,
            max_nodes: None,
        }
    }

    /// A `TimeManager` governed entirely by a shared [`Interrupter`] —
    /// folds manual abort and wall-clock timeout into the same masked
    /// node-count poll used everywhere else, instead of tracking a second
    /// independent deadline.
    pub fn from_interrupter(interrupter: Interrupter) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: None,
            stop_signal: false,
            interrupter: Some(interrupter),
            max_nodes: None,
        }
    }

    /// Attaches a node budget, checked in the same masked poll as the
    /// wall-clock limit (`SearchOptions::max_nodes`).
    pub fn with_node_budget(mut self, max_nodes: Option<u64>) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    #[inline(always)]
    pub fn check_time(&mut self, nodes: u64) {
        if self.stop_signal {
            return;
        }

        if let Some(max_nodes) = self.max_nodes
            && nodes >= max_nodes
        {
            self.stop_signal = true;
            return;
        }

        if let Some(interrupter) = &self.interrupter {
            if interrupter.should_exit() {
                self.stop_signal = true;
                return;
            }
        }

        if let Some(limit) = self.allotted {
            let elapsed = self.start_time.elapsed();

            // Hard Stop: Abort immediately if we hit the limit
            if elapsed >= limit {
                self.stop_signal = true;
            }
        }
    }

    /// Returns the allocated time limit
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.allotted
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    if board.is_repetition() {
        return DRAW_SCORE;
    }

    let hash = board.zobrist;
    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        // Depth sentinel of 1 so any normal search at depth >= 2 overwrites this.
        let tt_score = score_to_tt(beta, ply as i32);
        tt.save(hash, None, tt_score, 1, NodeType::LowerBound as u8, ply as i32);
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, true);

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time(*nodes);
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        // Delta pruning only applies to plain captures: promotions can gain
        // far more than captured_value reflects, and en passant's captured
        // pawn isn't on the destination square so captured_value reads 0.
        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // MovePicker already screens out bad captures via SEE; this catches
        // promotions and en passant, which bypass that classification.
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> (i32, Option<Move>) {
    // Check every 1024 nodes instead of 2047 for tighter control
    if *nodes & 63 == 0 {
        time.check_time(*nodes);
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    // 2. Repetition & TT Probing (Standard)
    if ply > 0 && board.is_repetition() {
        return (DRAW_SCORE, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let hash = board.zobrist;
    let mut hash_move = None;

    // TT PROBE: the stored move is used for ordering regardless of depth;
    // `probe_eval` is the spec's bound-aware probe and is the only path
    // allowed to short-circuit the search with a cutoff value.
    if let Some((tt_move, ..)) = tt.probe(hash, depth as u8, alpha, beta, ply as i32) {
        hash_move = tt_move;
    }

    if ply > 0
        && let Some(tt_score) = tt.probe_eval(hash, depth as u8, alpha, beta, ply as i32)
    {
        return (tt_score, hash_move);
    }

    // MATE DISTANCE PRUNING
    // A mate found closer to the root always beats one found further away,
    // so scores outside what's reachable from this ply can never matter.
    if ply > 0 {
        let mate_alpha = -MATE_SCORE + ply as i32;
        if mate_alpha > alpha {
            alpha = mate_alpha;
        }
        let mate_beta = MATE_SCORE - ply as i32;
        if mate_beta < beta {
            beta = mate_beta;
        }
        if alpha >= beta {
            return (alpha, None);
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // Extend one ply when in check: resolves forced mates, avoids the horizon effect.
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    // Shared by RFP and the null-move margin below.
    let static_eval_val = if !in_check_now {
        static_eval(board, tables, alpha, beta)
    } else {
        0
    };

    // Reverse futility pruning: if we're already far above beta, trust the
    // static eval and cut without searching further.
    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }

    // Null move pruning. Applied at PV nodes too, not just zero-window ones.
    if depth >= 4
        && !in_check_now
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    {
        // Reduce harder the deeper we are.
        let r = if depth > 6 { 3 } else { 2 };

        let undo = make_null_move(board);

        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal {
            // Don't trust a null-move mate score; re-search normally instead.
            if score < MATE_THRESHOLD {
                return (beta, None);
            }
        }
    }

    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        // `go searchmoves ...` restriction: only consulted at the root.
        if ply == 0 && !ctx.root_filter.is_empty() && !ctx.root_filter.contains(&mv) {
            continue;
        }

        // Futility pruning: skip quiet moves that can't plausibly reach
        // alpha, unless history marks this move as historically strong.
        if depth < FP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && move_count > 0
        {
            let margin = FP_MARGIN_BASE + FP_MARGIN_MULT * depth;
            let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];

            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue;
            }
        }

        // Late move pruning: past a threshold of searched quiet moves with
        // no improvement on alpha, the remaining unsorted moves are unlikely
        // to matter.
        if depth < LMP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && alpha == original_alpha
        {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
            );
            score = -val;
        } else {
            // Late move reduction, searched with a null window first.
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && !mv.is_capture()
                && !mv.is_promotion()
                && !in_check_now
            {
                r = 1 + (depth / 8) + (move_count as i32 / 20);

                let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1;
                }

                // Reduce less at PV nodes (open window).
                if beta - alpha > 1 {
                    r -= 1;
                }

                r = r.clamp(0, depth - 2);
            }

            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
            );
            score = -val;

            // Re-search if the reduced search found a surprisingly good move
            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                // TT SAVE WITH MATE SCORE ADJUSTMENT (LowerBound/Beta Cutoff)
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if !mv.is_capture() {
                    ctx.update_killer(ply, mv);

                    let bonus = depth * depth;
                    ctx.update_history(mv, bonus);
                }

                return (beta, Some(mv));
            }
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    // TT SAVE WITH MATE SCORE ADJUSTMENT (Best Score)
    // We save 'best_score' (which is alpha if exact, or the best failed low score if UpperBound)
    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(
        hash,
        best_move,
        tt_score,
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    (best_score, best_move)
}

pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(time_limit);
    let mut last_iter_duration = Duration::from_millis(0);

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        // Predict whether the next depth is affordable before starting it;
        // branching factor can spike in tactical positions, so use 3x rather
        // than the usual 2x estimate.
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;
            if total_elapsed + predicted_next > limit {
                break;
            }
        }

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        let mut alpha = -INF;
        let mut beta = INF;
        let window = 50;

        // Aspiration windows only pay off once the score has stabilized.
        if depth > 4 {
            alpha = last_completed_best_score - window;
            beta = last_completed_best_score + window;
        }

        let mut score;
        let mut mv;

        loop {
            let result = alpha_beta(
                board, tables, &mut ctx, tt, depth, 0, alpha, beta, &mut nodes, &mut time,
            );

            score = result.0;
            mv = result.1;

            if time.stop_signal {
                break;
            }

            // Fail low: widen alpha only, beta stays fixed.
            if score <= alpha {
                alpha = -INF;
                continue;
            }

            // Fail high: widen beta only, alpha stays fixed.
            if score >= beta {
                beta = INF;
                continue;
            }

            break;
        }

        last_iter_duration = iter_start.elapsed();

        // An interrupted iteration is incomplete and may favor a blunder;
        // discard it rather than updating the reported best move.
        if time.stop_signal {
            break;
        }

        last_completed_best_score = score;
        last_completed_best_move = mv;

        if let Some(valid_mv) = last_completed_best_move {
            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", last_completed_best_score)
            };

            println!(
                "info depth {} score {} nodes {} time {} pv {}",
                depth,
                score_str,
                nodes,
                time.start_time.elapsed().as_millis(),
                valid_mv.to_uci()
            );
        }

        // Optimization: If we found a mate, stop searching deeper
        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}

/// Iterative-deepening driver over the `Context`/`SearchOptions`/`Callbacks`
/// surface, for front-ends that want cooperative cancellation and a
/// `SearchResult` snapshot per completed iteration rather than the plain
/// `(score, Option<Move>)` pair `search` returns. Shares the same search
/// core (`alpha_beta`/`quiescence`); this is just a differently-shaped
/// driver loop around it, grounded in `search`'s own iterative deepening.
#[instrument(skip(context, tables, tt, options, callbacks), fields(depth, search_time_ms))]
pub fn run(
    context: &mut Context,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    mut options: SearchOptions,
    callbacks: &mut dyn Callbacks,
) -> SearchResult {
    tracing::Span::current().record("depth", options.depth.unwrap_or(0));
    tracing::Span::current().record(
        "search_time_ms",
        options.search_time.map(|d| d.as_millis() as u64).unwrap_or(0),
    );
    debug!(moves_to_search = options.moves_to_search.len(), "starting search::run");
    let max_depth = options.depth.map(|d| d as i32).unwrap_or(64);
    let interrupter = context.interrupter(options.search_time);
    let mut time = TimeManager::from_interrupter(interrupter.clone()).with_node_budget(options.max_nodes);

    let mut last_result = SearchResult {
        duration: Duration::from_millis(0),
        depth: 0,
        score: 0,
        best_move: None,
        nodes_searched: 0,
    };
    let mut nodes: u64 = 0;
    let mut last_iter_duration = Duration::from_millis(0);

    context.active.store(true, std::sync::atomic::Ordering::Release);
    context.tables.root_filter = options.moves_to_search.clone();

    for depth in 1..=max_depth {
        if interrupter.should_exit() {
            break;
        }

        let iter_start = Instant::now();

        if depth > 1
            && let Some(limit) = options.search_time
        {
            let total_elapsed = interrupter.elapsed();
            let predicted_next = last_iter_duration * 3;
            if total_elapsed + predicted_next > limit {
                break;
            }
        }

        for from in 0..64 {
            for to in 0..64 {
                context.tables.history[from][to] /= 8;
            }
        }

        let mut alpha = -INF;
        let mut beta = INF;
        let window = 50;
        if depth > 4 {
            alpha = last_result.score - window;
            beta = last_result.score + window;
        }

        let mut score;
        let mut mv;

        loop {
            let result = alpha_beta(
                &mut options.position,
                tables,
                &mut context.tables,
                tt,
                depth,
                0,
                alpha,
                beta,
                &mut nodes,
                &mut time,
            );
            score = result.0;
            mv = result.1;

            if time.stop_signal {
                break;
            }
            if score <= alpha {
                alpha = -INF;
                continue;
            }
            if score >= beta {
                beta = INF;
                continue;
            }
            break;
        }

        last_iter_duration = iter_start.elapsed();

        if time.stop_signal {
            break;
        }

        last_result = SearchResult {
            duration: interrupter.elapsed(),
            depth: depth as u8,
            score,
            best_move: mv,
            nodes_searched: nodes,
        };
        callbacks.on_iteration(&last_result);

        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    last_result.duration = interrupter.elapsed();
    last_result.nodes_searched = nodes;
    callbacks.on_search_complete(&last_result);

    context.active.store(false, std::sync::atomic::Ordering::Release);
    last_result
}
