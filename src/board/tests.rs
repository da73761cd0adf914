// src/board/tests.rs
use super::*;

#[test]
fn new_has_all_32_pieces_in_starting_squares() {
    let board = Board::new();
    assert_eq!(board.occupied().count_ones(), 32);
    assert_eq!(board.pieces(Piece::Pawn, Color::White), WHITE_PAWN_MASK);
    assert_eq!(board.pieces(Piece::Pawn, Color::Black), BLACK_PAWN_MASK);
    assert_eq!(board.pieces(Piece::King, Color::White).count_ones(), 1);
    assert_eq!(board.pieces(Piece::King, Color::Black).count_ones(), 1);
    assert_eq!(board.side_to_move, Color::White);
    assert_eq!(
        board.castling_rights,
        CASTLE_WK | CASTLE_WQ | CASTLE_BK | CASTLE_BQ
    );
    assert!(board.en_passant.is_none());
    assert!(board.history.is_empty());
}

#[test]
fn new_empty_has_no_pieces_and_zero_zobrist_components() {
    let board = Board::new_empty();
    assert_eq!(board.occupied(), 0);
    assert_eq!(board.castling_rights, 0);
    for &sq_idx in &[0u8, 27, 63] {
        assert!(board.piece_at(Square::from_index(sq_idx)).is_none());
    }
}

#[test]
fn set_bb_keeps_occupancy_and_piece_on_sq_in_sync() {
    let mut board = Board::new_empty();
    let e4 = Square::from_file_rank(4, 3);
    board.set_bb(Color::White, Piece::Knight, e4.bitboard());

    assert_eq!(board.piece_at(e4), Some((Color::White, Piece::Knight)));
    assert_eq!(board.occupancy(Color::White), e4.bitboard());
    assert_eq!(board.occupied(), e4.bitboard());

    board.set_bb(Color::White, Piece::Knight, 0);
    assert!(board.piece_at(e4).is_none());
    assert_eq!(board.occupied(), 0);
}

#[test]
fn king_square_finds_the_single_set_bit() {
    let board = Board::new();
    assert_eq!(board.king_square(Color::White).index(), 4); // e1
    assert_eq!(board.king_square(Color::Black).index(), 60); // e8
}

#[test]
fn has_major_pieces_is_false_for_bare_kings() {
    let board = "4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse::<Board>().unwrap();
    assert!(!board.has_major_pieces(Color::White));
    assert!(!board.has_major_pieces(Color::Black));
}

#[test]
fn compute_zobrist_full_matches_incremental_zobrist_after_new() {
    let board = Board::new();
    assert_eq!(board.zobrist, board.compute_zobrist_full());
}

#[test]
fn repetition_count_starts_at_one_and_counts_history_matches() {
    let mut board = Board::new();
    assert_eq!(board.repetition_count(), 1);
    assert!(!board.is_repetition());

    board.history.push(board.zobrist);
    board.history.push(board.zobrist);
    assert_eq!(board.repetition_count(), 3);
    assert!(board.is_threefold());
    assert!(board.is_repetition());
}

#[test]
fn castling_rights_queries_respect_individual_bits() {
    let mut board = Board::new();
    assert!(board.has_kingside_castle(Color::White));
    assert!(board.has_queenside_castle(Color::White));

    board.castling_rights &= !CASTLE_WQ;
    assert!(board.has_kingside_castle(Color::White));
    assert!(!board.has_queenside_castle(Color::White));
    assert!(board.has_castling(CASTLE_WK));
    assert!(!board.has_castling(CASTLE_WQ));
}

#[test]
fn validate_rejects_overlapping_bitboards() {
    let mut board = Board::new();
    assert!(board.validate().is_ok());

    // Force an illegal overlap: put a white knight on e1, which already holds the white king.
    let e1 = Square::from_file_rank(4, 0);
    let bad = board.pieces(Piece::Knight, Color::White) | e1.bitboard();
    board.piece_bb[Color::White as usize][Piece::Knight as usize] = bad;
    assert!(board.validate().is_err());
}

#[test]
fn display_and_from_str_agree_on_starting_position() {
    let board = Board::new();
    let printed = board.to_string();
    let reparsed: Board = printed.parse().unwrap();
    assert_eq!(board, reparsed);
}
