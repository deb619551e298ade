//! Massif blob layout.
//!
//! ```text
//! +--------------------+ 0
//! | header (32)        |
//! +--------------------+ 32
//! | trie table         |  leaves_per_massif * 72
//! +--------------------+
//! | peak stack         |  64 * 32
//! +--------------------+ log data start
//! | log data           |  n * 32, node values from first_index
//! +--------------------+
//! ```
//!
//! Header fields, big-endian: magic `MSIF`, version u16, commitment epoch
//! u32, height u8, reserved u8, massif index u32, first MMR index u64, last
//! idtimestamp u64.

use super::addressing::{
    leaves_per_massif, massif_first_index, massif_first_leaf, massif_last_index,
    massif_peak_stack_indices, validate_height,
};
use crate::error::{CoreError, CoreResult};
use crate::mmr::{is_valid_size, leaf_count, peak_hashes, Hash, NodeAppender, NodeSource};

/// Magic bytes at the start of every massif.
pub const MASSIF_MAGIC: [u8; 4] = *b"MSIF";
/// Current layout version.
pub const MASSIF_VERSION: u16 = 1;
/// Header size in bytes.
pub const HEADER_SIZE: usize = 32;
/// Size of one trie table slot.
pub const TRIE_ENTRY_SIZE: usize = 72;
/// Number of slots reserved for the peak stack.
pub const PEAK_STACK_SLOTS: usize = 64;
/// Size of a node value.
pub const VALUE_SIZE: usize = 32;
/// Length of the extra bytes field of a trie entry.
pub const EXTRA_BYTES_SIZE: usize = 24;

/// Decoded massif header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MassifHeader {
    /// Layout version.
    pub version: u16,
    /// Commitment epoch of the idtimestamps in this massif.
    pub commitment_epoch: u32,
    /// Massif height.
    pub height: u8,
    /// Massif index.
    pub massif_index: u32,
    /// First MMR index held in log data.
    pub first_index: u64,
    /// Idtimestamp of the most recently added leaf.
    pub last_idtimestamp: u64,
}

impl MassifHeader {
    fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&MASSIF_MAGIC);
        out[4..6].copy_from_slice(&self.version.to_be_bytes());
        out[6..10].copy_from_slice(&self.commitment_epoch.to_be_bytes());
        out[10] = self.height;
        out[12..16].copy_from_slice(&self.massif_index.to_be_bytes());
        out[16..24].copy_from_slice(&self.first_index.to_be_bytes());
        out[24..32].copy_from_slice(&self.last_idtimestamp.to_be_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::invalid_format("massif shorter than header"));
        }
        if bytes[0..4] != MASSIF_MAGIC {
            return Err(CoreError::invalid_format("bad massif magic"));
        }
        Ok(Self {
            version: u16::from_be_bytes([bytes[4], bytes[5]]),
            commitment_epoch: be_u32(&bytes[6..10]),
            height: bytes[10],
            massif_index: be_u32(&bytes[12..16]),
            first_index: be_u64(&bytes[16..24]),
            last_idtimestamp: be_u64(&bytes[24..32]),
        })
    }
}

fn be_u32(b: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(b);
    u32::from_be_bytes(buf)
}

fn be_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    u64::from_be_bytes(buf)
}

/// One slot of the trie table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrieEntry {
    /// Content-addressed key of the entry.
    pub trie_key: Hash,
    /// Application extra bytes, zero padded.
    pub extra_bytes: [u8; EXTRA_BYTES_SIZE],
    /// Idtimestamp assigned when the entry was added.
    pub idtimestamp: u64,
    /// Hashing domain of the leaf.
    pub domain: u8,
}

impl TrieEntry {
    fn encode(&self) -> [u8; TRIE_ENTRY_SIZE] {
        let mut out = [0u8; TRIE_ENTRY_SIZE];
        out[0..32].copy_from_slice(&self.trie_key);
        out[32..56].copy_from_slice(&self.extra_bytes);
        out[56..64].copy_from_slice(&self.idtimestamp.to_be_bytes());
        out[64] = self.domain;
        out
    }

    fn decode(b: &[u8]) -> Self {
        let mut trie_key = [0u8; 32];
        trie_key.copy_from_slice(&b[0..32]);
        let mut extra_bytes = [0u8; EXTRA_BYTES_SIZE];
        extra_bytes.copy_from_slice(&b[32..56]);
        Self {
            trie_key,
            extra_bytes,
            idtimestamp: be_u64(&b[56..64]),
            domain: b[64],
        }
    }
}

/// Byte offset where log data starts for a massif of `height`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidHeight`] if the layout does not fit in
/// memory on this platform.
pub fn log_data_start(height: u8) -> CoreResult<usize> {
    usize::try_from(leaves_per_massif(height))
        .ok()
        .and_then(|leaves| leaves.checked_mul(TRIE_ENTRY_SIZE))
        .and_then(|table| table.checked_add(HEADER_SIZE + PEAK_STACK_SLOTS * VALUE_SIZE))
        .ok_or(CoreError::InvalidHeight(height))
}

/// A massif blob: one fixed-capacity segment of the log.
///
/// Holds the raw bytes plus derived addressing. Nodes before `first_index`
/// are served from the peak stack; later nodes from log data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Massif {
    header: MassifHeader,
    bytes: Vec<u8>,
    data_start: usize,
    stack_indices: Vec<u64>,
}

impl Massif {
    /// Creates an empty massif ready for appending.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid heights.
    pub fn new(height: u8, massif_index: u32, commitment_epoch: u32) -> CoreResult<Self> {
        validate_height(height)?;
        let data_start = log_data_start(height)?;
        let header = MassifHeader {
            version: MASSIF_VERSION,
            commitment_epoch,
            height,
            massif_index,
            first_index: massif_first_index(height, massif_index),
            last_idtimestamp: 0,
        };
        let mut bytes = vec![0u8; data_start];
        bytes[..HEADER_SIZE].copy_from_slice(&header.encode());
        Ok(Self {
            header,
            bytes,
            data_start,
            stack_indices: massif_peak_stack_indices(height, massif_index),
        })
    }

    /// Parses and validates a massif blob.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the blob is truncated, has a
    /// bad magic or version, disagrees with its own addressing, or holds a
    /// node count that no MMR passes through.
    pub fn from_bytes(bytes: Vec<u8>) -> CoreResult<Self> {
        let header = MassifHeader::decode(&bytes)?;
        if header.version != MASSIF_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported massif version {}",
                header.version
            )));
        }
        validate_height(header.height)?;
        let data_start = log_data_start(header.height)?;
        if bytes.len() < data_start {
            return Err(CoreError::invalid_format("massif shorter than fixed region"));
        }
        if (bytes.len() - data_start) % VALUE_SIZE != 0 {
            return Err(CoreError::invalid_format("log data not a multiple of 32 bytes"));
        }
        if header.first_index != massif_first_index(header.height, header.massif_index) {
            return Err(CoreError::invalid_format(format!(
                "first index {} wrong for massif {}",
                header.first_index, header.massif_index
            )));
        }
        let massif = Self {
            header,
            bytes,
            data_start,
            stack_indices: massif_peak_stack_indices(header.height, header.massif_index),
        };
        let last = massif_last_index(header.height, header.massif_index);
        if massif.mmr_size() > last + 1 {
            return Err(CoreError::invalid_format("massif overflows its capacity"));
        }
        if !is_valid_size(massif.mmr_size()) {
            return Err(CoreError::invalid_format(format!(
                "massif data implies invalid MMR size {}",
                massif.mmr_size()
            )));
        }
        Ok(massif)
    }

    /// Checks the header against the height and index the caller expects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] on disagreement.
    pub fn expect(&self, height: u8, massif_index: u32) -> CoreResult<()> {
        if self.header.height != height || self.header.massif_index != massif_index {
            return Err(CoreError::invalid_format(format!(
                "expected massif {massif_index} of height {height}, found massif {} of height {}",
                self.header.massif_index, self.header.height
            )));
        }
        Ok(())
    }

    /// Decoded header.
    #[must_use]
    pub fn header(&self) -> &MassifHeader {
        &self.header
    }

    /// Massif height.
    #[must_use]
    pub fn height(&self) -> u8 {
        self.header.height
    }

    /// Massif index.
    #[must_use]
    pub fn massif_index(&self) -> u32 {
        self.header.massif_index
    }

    /// First MMR index stored in log data.
    #[must_use]
    pub fn first_index(&self) -> u64 {
        self.header.first_index
    }

    /// First leaf index of this massif.
    #[must_use]
    pub fn first_leaf(&self) -> u64 {
        massif_first_leaf(self.header.height, self.header.massif_index)
    }

    /// Number of node values in log data.
    #[must_use]
    pub fn node_count(&self) -> u64 {
        ((self.bytes.len() - self.data_start) / VALUE_SIZE) as u64
    }

    /// Size of the MMR covered by this massif.
    #[must_use]
    pub fn mmr_size(&self) -> u64 {
        self.header.first_index + self.node_count()
    }

    /// Number of leaves added to this massif.
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        leaf_count(self.mmr_size()).saturating_sub(self.first_leaf())
    }

    /// Returns true once every leaf slot and spur node is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.mmr_size() == massif_last_index(self.header.height, self.header.massif_index) + 1
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the massif, returning its raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// MMR indices of the peak stack entries, left to right.
    #[must_use]
    pub fn peak_stack_indices(&self) -> &[u64] {
        &self.stack_indices
    }

    /// Peak stack values, left to right.
    #[must_use]
    pub fn peak_stack(&self) -> Vec<Hash> {
        (0..self.stack_indices.len())
            .map(|slot| self.stack_value(slot))
            .collect()
    }

    fn stack_value(&self, slot: usize) -> Hash {
        let start = self.data_start - PEAK_STACK_SLOTS * VALUE_SIZE + slot * VALUE_SIZE;
        let mut out = [0u8; VALUE_SIZE];
        out.copy_from_slice(&self.bytes[start..start + VALUE_SIZE]);
        out
    }

    /// Writes the peak stack.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` does not have one entry per peak stack
    /// index.
    pub fn set_peak_stack(&mut self, values: &[Hash]) -> CoreResult<()> {
        if values.len() != self.stack_indices.len() {
            return Err(CoreError::invalid_format(format!(
                "massif {} needs {} peak stack entries, got {}",
                self.header.massif_index,
                self.stack_indices.len(),
                values.len()
            )));
        }
        let base = self.data_start - PEAK_STACK_SLOTS * VALUE_SIZE;
        for (slot, value) in values.iter().enumerate() {
            let start = base + slot * VALUE_SIZE;
            self.bytes[start..start + VALUE_SIZE].copy_from_slice(value);
        }
        Ok(())
    }

    fn slot_offset(&self, slot: u64) -> CoreResult<usize> {
        if slot >= leaves_per_massif(self.header.height) {
            return Err(CoreError::IndexOutOfRange {
                index: slot,
                size: leaves_per_massif(self.header.height),
            });
        }
        Ok(HEADER_SIZE + slot as usize * TRIE_ENTRY_SIZE)
    }

    /// Trie table entry for the leaf at `slot` (relative to the first leaf).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] beyond the massif capacity.
    pub fn trie_entry(&self, slot: u64) -> CoreResult<TrieEntry> {
        let offset = self.slot_offset(slot)?;
        Ok(TrieEntry::decode(&self.bytes[offset..offset + TRIE_ENTRY_SIZE]))
    }

    /// Writes the trie table entry at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexOutOfRange`] beyond the massif capacity.
    pub fn set_trie_entry(&mut self, slot: u64, entry: &TrieEntry) -> CoreResult<()> {
        let offset = self.slot_offset(slot)?;
        self.bytes[offset..offset + TRIE_ENTRY_SIZE].copy_from_slice(&entry.encode());
        Ok(())
    }

    /// Records the idtimestamp of the latest leaf in the header.
    pub fn set_last_idtimestamp(&mut self, idtimestamp: u64) {
        self.header.last_idtimestamp = idtimestamp;
        self.bytes[24..32].copy_from_slice(&idtimestamp.to_be_bytes());
    }

    /// Peak values of the MMR at `mmr_size`, read from this massif.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is invalid or a peak is unavailable.
    pub fn peaks_at(&self, mmr_size: u64) -> CoreResult<Vec<Hash>> {
        peak_hashes(self, mmr_size)
    }
}

impl NodeSource for Massif {
    fn node(&self, index: u64) -> CoreResult<Hash> {
        if index >= self.header.first_index {
            let rel = index - self.header.first_index;
            if rel >= self.node_count() {
                return Err(CoreError::NodeUnavailable { index });
            }
            let start = self.data_start + rel as usize * VALUE_SIZE;
            let mut out = [0u8; VALUE_SIZE];
            out.copy_from_slice(&self.bytes[start..start + VALUE_SIZE]);
            return Ok(out);
        }
        self.stack_indices
            .iter()
            .position(|&i| i == index)
            .map(|slot| self.stack_value(slot))
            .ok_or(CoreError::NodeUnavailable { index })
    }
}

impl NodeAppender for Massif {
    fn append(&mut self, value: Hash) -> CoreResult<u64> {
        let index = self.mmr_size();
        let last = massif_last_index(self.header.height, self.header.massif_index);
        if index > last {
            return Err(CoreError::IndexOutOfRange {
                index,
                size: last + 1,
            });
        }
        self.bytes.extend_from_slice(&value);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmr::{add_hashed_leaf, VecMmr};

    #[test]
    fn header_round_trip_through_bytes() {
        let mut massif = Massif::new(3, 0, 7).unwrap();
        massif.set_last_idtimestamp(0x0102_0304_0506_0708);
        let parsed = Massif::from_bytes(massif.clone().into_bytes()).unwrap();
        assert_eq!(parsed.header().commitment_epoch, 7);
        assert_eq!(parsed.header().last_idtimestamp, 0x0102_0304_0506_0708);
        assert_eq!(parsed.mmr_size(), 0);
        assert_eq!(parsed, massif);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = Massif::new(2, 0, 0).unwrap().into_bytes();
        bytes[0] = b'X';
        assert!(matches!(Massif::from_bytes(bytes), Err(CoreError::InvalidFormat { .. })));

        let mut bytes = Massif::new(2, 0, 0).unwrap().into_bytes();
        bytes[5] = 9;
        assert!(Massif::from_bytes(bytes).is_err());
    }

    #[test]
    fn rejects_partial_values_and_invalid_sizes() {
        let mut bytes = Massif::new(2, 0, 0).unwrap().into_bytes();
        bytes.extend_from_slice(&[0u8; 31]);
        assert!(Massif::from_bytes(bytes).is_err());

        // two nodes: MMR size 2 is impossible
        let mut bytes = Massif::new(2, 0, 0).unwrap().into_bytes();
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(Massif::from_bytes(bytes).is_err());
    }

    #[test]
    fn rejects_wrong_first_index() {
        let mut bytes = Massif::new(2, 1, 0).unwrap().into_bytes();
        bytes[23] = 0;
        assert!(Massif::from_bytes(bytes).is_err());
    }

    #[test]
    fn expect_checks_identity() {
        let massif = Massif::new(4, 2, 0).unwrap();
        assert!(massif.expect(4, 2).is_ok());
        assert!(massif.expect(4, 3).is_err());
        assert!(massif.expect(5, 2).is_err());
    }

    #[test]
    fn trie_entries() {
        let mut massif = Massif::new(2, 0, 0).unwrap();
        let entry = TrieEntry {
            trie_key: [3u8; 32],
            extra_bytes: [4u8; 24],
            idtimestamp: 99,
            domain: 1,
        };
        massif.set_trie_entry(1, &entry).unwrap();
        assert_eq!(massif.trie_entry(1).unwrap(), entry);
        assert_eq!(massif.trie_entry(0).unwrap(), TrieEntry::default());
        assert!(massif.trie_entry(2).is_err());
    }

    #[test]
    fn second_massif_reads_peak_stack() {
        // Build the reference MMR and two height-2 massifs alongside it.
        let mut full = VecMmr::new();
        let mut m0 = Massif::new(2, 0, 0).unwrap();
        for n in 0..2u8 {
            add_hashed_leaf(&mut full, [n; 32]).unwrap();
            add_hashed_leaf(&mut m0, [n; 32]).unwrap();
        }
        assert!(m0.is_complete());

        let mut m1 = Massif::new(2, 1, 0).unwrap();
        assert_eq!(m1.peak_stack_indices(), &[2]);
        m1.set_peak_stack(&[m0.node(2).unwrap()]).unwrap();
        for n in 2..4u8 {
            add_hashed_leaf(&mut full, [n; 32]).unwrap();
            add_hashed_leaf(&mut m1, [n; 32]).unwrap();
        }
        assert!(m1.is_complete());
        assert_eq!(m1.mmr_size(), 7);
        assert_eq!(m1.leaf_count(), 2);
        for i in [2u64, 3, 4, 5, 6] {
            assert_eq!(m1.node(i).unwrap(), full.node(i).unwrap());
        }
        assert!(matches!(m1.node(0), Err(CoreError::NodeUnavailable { index: 0 })));
        assert_eq!(m1.peaks_at(7).unwrap(), vec![full.node(6).unwrap()]);

        let reparsed = Massif::from_bytes(m1.clone().into_bytes()).unwrap();
        assert_eq!(reparsed.peak_stack(), m1.peak_stack());
    }

    #[test]
    fn append_beyond_capacity_fails() {
        let mut massif = Massif::new(1, 0, 0).unwrap();
        add_hashed_leaf(&mut massif, [1u8; 32]).unwrap();
        assert!(massif.is_complete());
        assert!(massif.append([2u8; 32]).is_err());
    }
}
