// src/board/fen.rs
// FEN parsing/serialization, kept separate from the core bitboard logic in mod.rs.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR, pc_index};
use super::{CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Board, Color};
use crate::square::Square;

impl Board {
    /// Loads a position from Extended Position Description / FEN text into
    /// `self`, replacing whatever was there before. Resets `history` since a
    /// freshly-loaded position has no ancestors.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let mut fields = fen.split_whitespace();

        let placement = fields
            .next()
            .ok_or_else(|| "FEN missing piece placement field".to_string())?;
        let stm = fields.next().unwrap_or("w");
        let castling = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Board::new_empty();

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(format!(
                "FEN piece placement must have 8 ranks, got {}",
                ranks.len()
            ));
        }

        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file = 0u8;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as u8;
                    if file > 8 {
                        return Err(format!("FEN rank overflows 8 files: {}", rank_str));
                    }
                    continue;
                }

                if file >= 8 {
                    return Err(format!("FEN rank overflows 8 files: {}", rank_str));
                }
                if !ch.is_ascii() {
                    return Err(format!("invalid FEN piece glyph: {}", ch));
                }
                let (piece, color) = CHAR_TO_PC[ch as usize]
                    .ok_or_else(|| format!("invalid FEN piece glyph: {}", ch))?;

                let sq = Square::from_file_rank(file, rank);
                let bb = board.bb(color, piece) | sq.bitboard();
                board.set_bb(color, piece, bb);
                file += 1;
            }
            if file != 8 {
                return Err(format!("FEN rank does not cover 8 files: {}", rank_str));
            }
        }

        board.side_to_move = match stm {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid side-to-move field: {}", other)),
        };

        let mut rights = 0u8;
        if castling != "-" {
            for ch in castling.chars() {
                rights |= match ch {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    other => return Err(format!("invalid castling field glyph: {}", other)),
                };
            }
        }
        board.castling_rights = rights;

        board.en_passant = if ep == "-" {
            None
        } else {
            Some(
                ep.parse::<Square>()
                    .map_err(|_| format!("invalid en passant field: {}", ep))?,
            )
        };

        board.halfmove_clock = halfmove
            .parse()
            .map_err(|_| format!("invalid halfmove clock field: {}", halfmove))?;
        board.fullmove_number = fullmove
            .parse()
            .map_err(|_| format!("invalid fullmove number field: {}", fullmove))?;

        board.history.clear();
        board.refresh_zobrist();

        *self = board;
        Ok(())
    }

    /// Serializes the current position to FEN text.
    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(64);

        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            out.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        out.push(PC_TO_CHAR[pc_index(piece, color)]);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if rank_from_top != 7 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling_rights == 0 {
            out.push('-');
        } else {
            if self.castling_rights & CASTLE_WK != 0 {
                out.push('K');
            }
            if self.castling_rights & CASTLE_WQ != 0 {
                out.push('Q');
            }
            if self.castling_rights & CASTLE_BK != 0 {
                out.push('k');
            }
            if self.castling_rights & CASTLE_BQ != 0 {
                out.push('q');
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push(' ');
        out.push_str(&self.halfmove_clock.to_string());
        out.push(' ');
        out.push_str(&self.fullmove_number.to_string());

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn startpos_round_trips() {
        let board = STARTPOS.parse::<Board>().unwrap();
        assert_eq!(board, Board::new());
        assert_eq!(board.to_fen(), STARTPOS);
    }

    #[test]
    fn kiwipete_round_trips() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board = fen.parse::<Board>().unwrap();
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn en_passant_square_round_trips() {
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        let board = fen.parse::<Board>().unwrap();
        assert_eq!(board.en_passant, Some("d6".parse::<Square>().unwrap()));
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn no_castling_rights_emits_dash() {
        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 5 10";
        let board = fen.parse::<Board>().unwrap();
        assert_eq!(board.castling_rights, 0);
        assert_eq!(board.to_fen(), fen);
    }

    #[test]
    fn rejects_wrong_rank_count() {
        assert!("8/8/8/8/8/8/8 w - - 0 1".parse::<Board>().is_err());
    }

    #[test]
    fn rejects_bad_glyph() {
        assert!("rnbqkbnx/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
            .parse::<Board>()
            .is_err());
    }

    #[test]
    fn set_fen_clears_history() {
        let mut board = Board::new();
        board.history.push(board.zobrist);
        board.set_fen(STARTPOS).unwrap();
        assert!(board.history.is_empty());
    }
}
