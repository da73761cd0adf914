use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use vantage::board::{Board, Color};
use vantage::book::PolyglotBook;
use vantage::error::EngineError;
use vantage::moves::magic::MagicTables;
use vantage::moves::magic::loader::load_magic_tables;
use vantage::moves::types::Move;
use vantage::search::context::{Callbacks, SearchOptions, SearchResult};
use vantage::search::search::MATE_SCORE;
use vantage::search::thread::SearchThread;
use vantage::search::tt::MATE_THRESHOLD;
use vantage::utils::san;

/// Front-end configuration, parsed from CLI args. Generalizes the teacher's
/// ad hoc `go` sub-option parsing to the process's own startup options
/// (there is no `clap` dependency; none is added — see DESIGN.md).
struct EngineConfig {
    tt_size_mb: usize,
    book_path: String,
    log_path: Option<String>,
    log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tt_size_mb: 512,
            book_path: "book.bin".to_string(),
            log_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    fn from_args(args: impl Iterator<Item = String>) -> Self {
        let mut config = Self::default();
        let args: Vec<String> = args.collect();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--hash" if i + 1 < args.len() => {
                    if let Ok(mb) = args[i + 1].parse() {
                        config.tt_size_mb = mb;
                    }
                    i += 2;
                }
                "--book" if i + 1 < args.len() => {
                    config.book_path = args[i + 1].clone();
                    i += 2;
                }
                "--log" if i + 1 < args.len() => {
                    config.log_path = Some(args[i + 1].clone());
                    i += 2;
                }
                "--log-filter" if i + 1 < args.len() => {
                    config.log_filter = args[i + 1].clone();
                    i += 2;
                }
                _ => i += 1,
            }
        }
        config
    }
}

/// Prints UCI `info depth ...` lines per iteration and `bestmove ...` once
/// the search finishes. The only consumer of `search::context::Callbacks`
/// outside of tests — the production wiring the teacher's inline
/// `search::search` call lacked.
struct UciCallbacks;

fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let moves_to_mate = (MATE_SCORE - score.abs() + 1) / 2;
        if score > 0 {
            format!("mate {moves_to_mate}")
        } else {
            format!("mate -{moves_to_mate}")
        }
    } else {
        format!("cp {score}")
    }
}

impl Callbacks for UciCallbacks {
    fn on_iteration(&mut self, result: &SearchResult) {
        let pv = result
            .best_move
            .map(|m| m.to_uci())
            .unwrap_or_else(|| "0000".to_string());
        println!(
            "info depth {} score {} nodes {} time {} pv {}",
            result.depth,
            format_score(result.score),
            result.nodes_searched,
            result.duration.as_millis(),
            pv
        );
    }

    fn on_search_complete(&mut self, result: &SearchResult) {
        match result.best_move {
            Some(m) => println!("bestmove {}", m.to_uci()),
            None => println!("bestmove 0000"),
        }
    }
}

fn main() {
    let config = EngineConfig::from_args(std::env::args().skip(1));

    #[cfg(feature = "cli")]
    if let Some(path) = &config.log_path {
        vantage::logger::init_logging(path, &config.log_filter);
    }

    let tables = Arc::new(load_magic_tables());
    let mut board = Board::new();
    let search_thread = SearchThread::new(tables.clone(), config.tt_size_mb);

    let book = PolyglotBook::load(&config.book_path).ok();
    if book.is_some() {
        println!("info string Opening Book loaded successfully");
    } else {
        println!("info string No opening book found ({}), running engine only", config.book_path);
    }
    let mut use_book = book.is_some();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = parts[0];

        match command {
            "uci" => handle_uci(),
            "isready" => {
                search_thread.wait();
                println!("readyok");
            }
            "ucinewgame" => {
                board = Board::new();
                search_thread.reset();
            }
            "setoption" => handle_setoption(&parts, &search_thread, &mut use_book),
            "position" => match handle_position(&parts, &tables) {
                Ok(new_board) => board = new_board,
                Err(e) => eprintln!("info string {e}"),
            },
            "go" => handle_go(&parts, &board, &tables, book.as_ref(), use_book, &search_thread),
            "stop" => search_thread.abort(),
            "fen" => println!("{}", board.to_fen()),
            "quit" => break,
            "d" | "display" => println!("{board}"),
            "test" | "bench" => run_epd_tests("../bench_arena/bk.epd", &tables),
            _ => eprintln!("info string unrecognized command: {command}"),
        }
    }
}

fn handle_uci() {
    println!("id name Vantage 1.0");
    println!("id author Vaishak Menon");
    println!("option name OwnBook type check default true");
    println!("option name Clear Hash type button");
    println!("uciok");
}

fn handle_setoption(parts: &[&str], search_thread: &SearchThread, use_book: &mut bool) {
    // setoption name <Name> [value <Value>]
    let Some(name_idx) = parts.iter().position(|&p| p == "name") else {
        return;
    };
    let value_idx = parts.iter().position(|&p| p == "value");
    let name_end = value_idx.unwrap_or(parts.len());
    let name = parts[name_idx + 1..name_end].join(" ");

    match name.as_str() {
        "OwnBook" => {
            if let Some(vi) = value_idx {
                *use_book = parts.get(vi + 1).map(|v| *v == "true").unwrap_or(*use_book);
            }
        }
        "Clear Hash" => search_thread.clear_tt(),
        _ => {}
    }
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Result<Board, EngineError> {
    let mut board = if parts.len() > 1 && parts[1] == "startpos" {
        Board::new()
    } else if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }
        let fen_string = parts[fen_start..fen_end].join(" ");
        Board::from_str(&fen_string).map_err(|_| EngineError::fen(fen_string))?
    } else {
        Board::new()
    };

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            let mv = parse_uci_move(&board, move_str, tables)?;
            vantage::moves::execute::make_move_basic(&mut board, mv);
        }
    }

    Ok(board)
}

fn parse_uci_move(board: &Board, move_str: &str, tables: &MagicTables) -> Result<Move, EngineError> {
    use arrayvec::ArrayVec;
    use vantage::moves::execute::generate_legal;

    if move_str.len() < 4 {
        return Err(EngineError::uci_move(move_str));
    }
    let chars: Vec<char> = move_str.chars().collect();

    let from_file = (chars[0] as u8).wrapping_sub(b'a');
    let from_rank = (chars[1] as u8).wrapping_sub(b'1');
    let to_file = (chars[2] as u8).wrapping_sub(b'a');
    let to_rank = (chars[3] as u8).wrapping_sub(b'1');
    if from_file > 7 || from_rank > 7 || to_file > 7 || to_rank > 7 {
        return Err(EngineError::uci_move(move_str));
    }

    let from_square = (from_rank * 8 + from_file) as usize;
    let to_square = (to_rank * 8 + to_file) as usize;

    let promo_piece = if move_str.len() >= 5 {
        match chars[4] {
            'q' => Some(vantage::board::Piece::Queen),
            'r' => Some(vantage::board::Piece::Rook),
            'b' => Some(vantage::board::Piece::Bishop),
            'n' => Some(vantage::board::Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    let mut board_copy = board.clone();
    generate_legal(&mut board_copy, tables, &mut moves, &mut scratch);

    for mv in moves {
        if mv.from.index() as usize == from_square && mv.to.index() as usize == to_square {
            if promo_piece.is_some() {
                if mv.promotion == promo_piece {
                    return Ok(mv);
                }
            } else if mv.promotion.is_none() {
                return Ok(mv);
            }
        }
    }
    Err(EngineError::InvalidMove {
        uci: move_str.to_string(),
    })
}

fn handle_go(
    parts: &[&str],
    board: &Board,
    tables: &Arc<MagicTables>,
    book: Option<&PolyglotBook>,
    use_book: bool,
    search_thread: &SearchThread,
) {
    if use_book {
        if let Some(b) = book {
            if let Some(book_move) = b.probe(board) {
                println!("info string Book move found");
                println!("bestmove {}", book_move.to_uci());
                return;
            }
        }
    }

    let mut depth: Option<u8> = None;
    let mut time_limit = None;

    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: u64 = 0;
    let mut binc: u64 = 0;
    let mut movestogo: Option<u64> = None;
    let mut movetime: Option<u64> = None;
    let mut max_nodes: Option<u64> = None;
    let mut search_moves: Vec<Move> = Vec::new();

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if i + 1 < parts.len() {
                    depth = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "movetime" => {
                if i + 1 < parts.len() {
                    movetime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "nodes" => {
                if i + 1 < parts.len() {
                    max_nodes = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "searchmoves" => {
                i += 1;
                while i < parts.len() {
                    match parse_uci_move(board, parts[i], tables) {
                        Ok(mv) => {
                            search_moves.push(mv);
                            i += 1;
                        }
                        Err(_) => break,
                    }
                }
            }
            "wtime" => {
                if i + 1 < parts.len() {
                    wtime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "btime" => {
                if i + 1 < parts.len() {
                    btime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "winc" => {
                if i + 1 < parts.len() {
                    winc = parts[i + 1].parse().unwrap_or(0);
                }
                i += 2;
            }
            "binc" => {
                if i + 1 < parts.len() {
                    binc = parts[i + 1].parse().unwrap_or(0);
                }
                i += 2;
            }
            "movestogo" => {
                if i + 1 < parts.len() {
                    movestogo = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "infinite" => {
                depth = None;
                time_limit = None;
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some(ms) = movetime {
        time_limit = Some(Duration::from_millis(ms));
    } else {
        let (my_time, my_inc) = if board.side_to_move == Color::White {
            (wtime, winc)
        } else {
            (btime, binc)
        };

        if let Some(t) = my_time {
            // Reserve 15% of time (capped at 500ms) for lag/OS overhead.
            let safety_buffer = (t * 15 / 100).min(500);
            let usable_time = t.saturating_sub(safety_buffer);

            let mut alloc: u64;
            if let Some(mtg) = movestogo {
                let moves_to_plan = mtg.max(2);
                alloc = usable_time / moves_to_plan;
                alloc += (my_inc * 3) / 4;
            } else if usable_time > 5000 {
                alloc = usable_time / 40 + (my_inc * 9) / 10;
            } else if usable_time > 2000 {
                alloc = usable_time / 30 + (my_inc * 3) / 4;
            } else if usable_time > 500 {
                alloc = usable_time / 20 + my_inc / 2;
            } else {
                alloc = my_inc / 2 + 20;
            }

            let hard_cap = usable_time / 5;
            alloc = alloc.min(hard_cap).min(usable_time);
            if alloc < 10 && usable_time >= 10 {
                alloc = 10;
            }
            time_limit = Some(Duration::from_millis(alloc));
        }
    }

    if let Some(limit) = time_limit {
        println!("info string Target time: {}ms", limit.as_millis());
    }

    let mut options = SearchOptions::new(board.clone());
    options.depth = depth;
    options.search_time = time_limit;
    options.max_nodes = max_nodes;
    options.moves_to_search = search_moves;

    search_thread.wait();
    search_thread.start_with_callbacks(options, Box::new(UciCallbacks));
    search_thread.wait();
}

// --- EPD Test Runner ---
fn run_epd_tests(path: &str, tables: &Arc<MagicTables>) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => match File::open(format!("bench_arena/{}", path.split('/').next_back().unwrap())) {
            Ok(f) => f,
            Err(_) => {
                println!("Error: Could not find EPD file at '{}' or local.", path);
                return;
            }
        },
    };

    println!("Running Tactical Tests from {} (1s per position)...", path);
    println!("----------------------------------------------------");

    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().map_while(Result::ok).collect();
    let mut solved = 0;
    let mut total = 0;
    let search_thread = SearchThread::new(tables.clone(), 64);

    let bar = ProgressBar::new(lines.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for (line_idx, line) in lines.iter().enumerate() {
        bar.inc(1);
        if line.trim().is_empty() {
            continue;
        }

        let Some(bm_idx) = line.find(" bm ") else {
            continue;
        };
        let fen = line[..bm_idx].trim();
        let rest = &line[bm_idx + 4..];
        let move_end = rest.find(';').unwrap_or(rest.len());
        let san_move = rest[..move_end].trim();

        let mut board = match Board::from_str(fen) {
            Ok(b) => b,
            Err(_) => {
                println!("Error parsing FEN on line {}", line_idx + 1);
                continue;
            }
        };

        let expected_uci = san::move_from_san(&mut board, tables, san_move)
            .ok()
            .map(|m| m.to_uci());

        let mut options = SearchOptions::new(board.clone());
        options.search_time = Some(Duration::from_millis(1000));

        let found = Arc::new(std::sync::Mutex::new(None));
        search_thread.reset();
        search_thread.start_with_callbacks(options, Box::new(BestMoveCapture(found.clone())));
        search_thread.wait();

        total += 1;
        let actual_uci = found.lock().unwrap().clone();
        match (&expected_uci, &actual_uci) {
            (Some(expected), Some(actual)) if expected == actual => {
                solved += 1;
                bar.println(format!("Line {}: solved ({actual})", line_idx + 1));
            }
            _ => {
                bar.println(format!(
                    "Line {}: missed (expected {:?}, got {:?})",
                    line_idx + 1,
                    expected_uci,
                    actual_uci
                ));
            }
        }
    }

    bar.finish_and_clear();
    println!("----------------------------------------------------");
    println!("Result: {}/{} Solved", solved, total);
}

/// Stashes the final best move of a search for `run_epd_tests` to compare
/// against the EPD's `bm` field, in place of parsing `UciCallbacks`' printed
/// `bestmove` line.
struct BestMoveCapture(Arc<std::sync::Mutex<Option<String>>>);

impl Callbacks for BestMoveCapture {
    fn on_search_complete(&mut self, result: &SearchResult) {
        *self.0.lock().unwrap() = result.best_move.map(|m| m.to_uci());
    }
}
