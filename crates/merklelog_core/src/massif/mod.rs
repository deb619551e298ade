//! Massifs: fixed-capacity, independently verifiable log segments.

pub mod addressing;
mod format;

pub use addressing::{
    leaves_per_massif, massif_first_index, massif_first_leaf, massif_index_of,
    massif_last_index, massif_peak_stack_indices, peak_stack_indices, validate_height,
    MAX_MASSIF_HEIGHT,
};
pub use format::{
    log_data_start, Massif, MassifHeader, TrieEntry, EXTRA_BYTES_SIZE, HEADER_SIZE,
    MASSIF_MAGIC, MASSIF_VERSION, PEAK_STACK_SLOTS, TRIE_ENTRY_SIZE, VALUE_SIZE,
};
