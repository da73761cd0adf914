// src/moves/magic/loader.rs
use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;

#[cfg(feature = "load_magic")]
const MAGIC_BLOB_PATH: &str = "magic_tables.bin";

/// Returns the engine's magic bitboard tables, ready for move generation.
///
/// Under the `load_magic` feature, deserializes a previously computed blob
/// from disk (written by a one-off precompute tool) to skip the magic-number
/// search at every process start. Otherwise tables are computed in-process,
/// deterministically under `deterministic_magic`.
pub fn load_magic_tables() -> MagicTables {
    #[cfg(feature = "load_magic")]
    {
        if let Ok(bytes) = std::fs::read(MAGIC_BLOB_PATH) {
            if let Ok(tables) = bincode::deserialize::<MagicTables>(&bytes) {
                return tables;
            }
        }
    }

    let seed = seed_for_startup();
    generate_magic_tables(seed).expect("magic table generation must not fail at startup")
}

#[cfg(feature = "deterministic_magic")]
fn seed_for_startup() -> MagicTableSeed {
    MagicTableSeed::Fixed(0xC0FF_EE00_D15E_A5E5)
}

#[cfg(not(feature = "deterministic_magic"))]
fn seed_for_startup() -> MagicTableSeed {
    MagicTableSeed::Random
}

/// Serializes `tables` to `path` using the same format `load_magic` reads.
pub fn save_magic_tables(tables: &MagicTables, path: &str) -> std::io::Result<()> {
    let bytes = bincode::serialize(tables).expect("magic tables must serialize");
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_magic_tables_produces_usable_rook_attacks() {
        let tables = load_magic_tables();
        // a1 rook on an empty board sees the whole rank/file minus itself.
        let attacks = tables.rook.get_attacks(0, 0);
        assert!(attacks != 0);
    }
}
