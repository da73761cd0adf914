// src/utils.rs

/// Combines a 0-indexed `(rank, file)` pair into a single 0..63 square
/// index, rank-major (`rank * 8 + file`). Used by `scan_ray` to walk
/// sliding-piece rays a step at a time.
#[inline(always)]
pub fn square_index(rank: usize, file: usize) -> usize {
    rank * 8 + file
}

/// Pops and returns the index of the lowest set bit in `bb`. Panics (in
/// debug builds) on an empty bitboard, same contract as `square_index` —
/// every call site already guards with `while bb != 0`.
#[inline(always)]
pub fn pop_lsb(bb: &mut u64) -> u8 {
    debug_assert!(*bb != 0, "pop_lsb called on empty bitboard");
    let idx = bb.trailing_zeros() as u8;
    *bb &= *bb - 1;
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_lsb_returns_indices_in_order() {
        let mut bb = (1u64 << 2) | (1u64 << 9) | (1u64 << 40);
        assert_eq!(pop_lsb(&mut bb), 2);
        assert_eq!(pop_lsb(&mut bb), 9);
        assert_eq!(pop_lsb(&mut bb), 40);
        assert_eq!(bb, 0);
    }
}

/// SAN (algebraic notation) encode/decode. A thin boundary layer — used only
/// by the EPD bench runner in `bin/cli.rs` — kept separate from the UCI move
/// codec (`Move::to_uci`/`moves::types`) since SAN needs disambiguation
/// against the full legal-move list rather than just `from`/`to` squares.
pub mod san {
    use crate::board::{Board, Piece};
    use crate::error::EngineError;
    use crate::moves::execute::generate_legal;
    use crate::moves::magic::MagicTables;
    use crate::moves::types::Move;
    use arrayvec::ArrayVec;

    /// Parses a SAN token (`Nf3`, `exd5`, `e4`, `a8=Q`, `O-O`, …) against the
    /// legal moves available in `board`, returning the matching [`Move`].
    /// Check/checkmate suffixes (`+`, `#`) are stripped before matching.
    pub fn move_from_san(
        board: &mut Board,
        tables: &MagicTables,
        san: &str,
    ) -> Result<Move, EngineError> {
        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(board, tables, &mut moves, &mut scratch);

        let clean: String = san
            .trim()
            .trim_end_matches(['+', '#'])
            .replace('x', "")
            .to_string();

        if clean == "O-O" {
            return moves
                .iter()
                .find(|m| m.is_kingside_castle())
                .copied()
                .ok_or_else(|| EngineError::san(san));
        }
        if clean == "O-O-O" {
            return moves
                .iter()
                .find(|m| m.is_queenside_castle())
                .copied()
                .ok_or_else(|| EngineError::san(san));
        }

        if clean.len() < 2 {
            return Err(EngineError::san(san));
        }

        // Strip a trailing "=Q"/"=N"/... promotion suffix, if present.
        let (body, promotion) = if let Some(eq_idx) = clean.find('=') {
            let promo = match clean[eq_idx + 1..].chars().next() {
                Some('Q') => Some(Piece::Queen),
                Some('R') => Some(Piece::Rook),
                Some('B') => Some(Piece::Bishop),
                Some('N') => Some(Piece::Knight),
                _ => return Err(EngineError::san(san)),
            };
            (&clean[..eq_idx], promo)
        } else {
            (clean.as_str(), None)
        };

        if body.len() < 2 {
            return Err(EngineError::san(san));
        }
        let target_str = &body[body.len() - 2..];
        let mut target_chars = target_str.chars();
        let file = (target_chars.next().ok_or_else(|| EngineError::san(san))? as u8)
            .wrapping_sub(b'a');
        let rank = (target_chars.next().ok_or_else(|| EngineError::san(san))? as u8)
            .wrapping_sub(b'1');
        if file > 7 || rank > 7 {
            return Err(EngineError::san(san));
        }
        let target_sq = (rank * 8 + file) as usize;

        let first_char = body.chars().next().ok_or_else(|| EngineError::san(san))?;
        let piece_type = match first_char {
            'N' => Piece::Knight,
            'B' => Piece::Bishop,
            'R' => Piece::Rook,
            'Q' => Piece::Queen,
            'K' => Piece::King,
            _ => Piece::Pawn,
        };

        // Disambiguation: file first, then rank, then both (spec.md §8).
        let disambig = if piece_type == Piece::Pawn {
            if body.len() > 2 && first_char.is_ascii_lowercase() {
                Some(first_char)
            } else {
                None
            }
        } else {
            let content = &body[1..body.len() - 2];
            if content.is_empty() {
                None
            } else {
                content.chars().next()
            }
        };

        moves
            .iter()
            .find(|m| {
                if m.to.index() as usize != target_sq || m.promotion != promotion {
                    return false;
                }
                let Some((_, p)) = board.piece_at(m.from) else {
                    return false;
                };
                if p != piece_type {
                    return false;
                }
                match disambig {
                    Some(d) if d.is_ascii_lowercase() && ('a'..='h').contains(&d) => {
                        m.from.index() % 8 == d as u8 - b'a'
                    }
                    Some(d) if ('1'..='8').contains(&d) => {
                        m.from.index() / 8 == d as u8 - b'1'
                    }
                    _ => true,
                }
            })
            .copied()
            .ok_or_else(|| EngineError::san(san))
    }

    /// Renders `mv` (already known to be legal in `board`) as SAN, using
    /// file-then-rank-then-both disambiguation against the other legal moves
    /// sharing the same piece type and destination square.
    pub fn san_of(board: &mut Board, tables: &MagicTables, mv: Move) -> String {
        if mv.is_kingside_castle() {
            return "O-O".to_string();
        }
        if mv.is_queenside_castle() {
            return "O-O-O".to_string();
        }

        let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(board, tables, &mut moves, &mut scratch);

        let piece = mv.piece;
        let mut out = String::new();

        if piece == Piece::Pawn {
            if mv.is_capture() {
                out.push(file_char(mv.from.index()));
                out.push('x');
            }
            out.push_str(&mv.to.to_string());
            if let Some(promo) = mv.promotion {
                out.push('=');
                out.push(promo_char(promo));
            }
            return out;
        }

        out.push(piece_char(piece));

        // Disambiguate against other legal moves of the same piece type that
        // also land on `mv.to`.
        let sharers: Vec<&Move> = moves
            .iter()
            .filter(|m| {
                m.piece == piece && m.to == mv.to && m.from != mv.from
            })
            .collect();

        if !sharers.is_empty() {
            let same_file = sharers.iter().any(|m| m.from.index() % 8 == mv.from.index() % 8);
            let same_rank = sharers.iter().any(|m| m.from.index() / 8 == mv.from.index() / 8);

            if !same_file {
                out.push(file_char(mv.from.index()));
            } else if !same_rank {
                out.push(rank_char(mv.from.index()));
            } else {
                out.push(file_char(mv.from.index()));
                out.push(rank_char(mv.from.index()));
            }
        }

        if mv.is_capture() {
            out.push('x');
        }
        out.push_str(&mv.to.to_string());
        out
    }

    fn file_char(index: u8) -> char {
        (b'a' + (index % 8)) as char
    }

    fn rank_char(index: u8) -> char {
        (b'1' + (index / 8)) as char
    }

    fn piece_char(piece: Piece) -> char {
        match piece {
            Piece::Knight => 'N',
            Piece::Bishop => 'B',
            Piece::Rook => 'R',
            Piece::Queen => 'Q',
            Piece::King => 'K',
            Piece::Pawn => unreachable!("pawn moves are handled separately"),
        }
    }

    fn promo_char(piece: Piece) -> char {
        match piece {
            Piece::Queen => 'Q',
            Piece::Rook => 'R',
            Piece::Bishop => 'B',
            Piece::Knight => 'N',
            _ => '?',
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::moves::magic::loader::load_magic_tables;
        use std::str::FromStr;

        #[test]
        fn parses_simple_pawn_push() {
            let tables = load_magic_tables();
            let mut board = Board::new();
            let mv = move_from_san(&mut board, &tables, "e4").unwrap();
            assert_eq!(mv.to_uci(), "e2e4");
        }

        #[test]
        fn parses_knight_development() {
            let tables = load_magic_tables();
            let mut board = Board::new();
            let mv = move_from_san(&mut board, &tables, "Nf3").unwrap();
            assert_eq!(mv.to_uci(), "g1f3");
        }

        #[test]
        fn parses_castling() {
            let tables = load_magic_tables();
            let mut board =
                Board::from_str("r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQK2R w KQkq - 4 5")
                    .unwrap();
            let mv = move_from_san(&mut board, &tables, "O-O").unwrap();
            assert!(mv.is_kingside_castle());
        }

        #[test]
        fn san_of_round_trips_through_move_from_san() {
            let tables = load_magic_tables();
            let mut board = Board::new();
            let mv = move_from_san(&mut board, &tables, "Nf3").unwrap();
            assert_eq!(san_of(&mut board, &tables, mv), "Nf3");
        }

        #[test]
        fn unknown_token_is_a_parse_error() {
            let tables = load_magic_tables();
            let mut board = Board::new();
            assert!(move_from_san(&mut board, &tables, "Zz9").is_err());
        }
    }
}
