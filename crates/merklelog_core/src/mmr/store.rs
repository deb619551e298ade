//! Node access traits and leaf addition.

use super::hash::{hash_pospair, Hash};
use super::index::index_height;
use crate::error::{CoreError, CoreResult};

/// Random access to MMR node values.
pub trait NodeSource {
    /// Returns the value stored at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NodeUnavailable`] if this source does not hold
    /// the node.
    fn node(&self, index: u64) -> CoreResult<Hash>;
}

/// A node source that can be appended to.
pub trait NodeAppender: NodeSource {
    /// Appends a node value, returning its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be stored.
    fn append(&mut self, value: Hash) -> CoreResult<u64>;
}

/// Adds a leaf and every interior node it completes.
///
/// Returns the new MMR size.
///
/// # Errors
///
/// Returns an error if a left sibling cannot be read or a node cannot be
/// appended.
pub fn add_hashed_leaf<S: NodeAppender + ?Sized>(store: &mut S, leaf: Hash) -> CoreResult<u64> {
    let mut next = store.append(leaf)? + 1;
    let mut height = 0u32;
    while index_height(next) > height {
        let left = store.node(next - (2u64 << height))?;
        let right = store.node(next - 1)?;
        next = store.append(hash_pospair(next + 1, &left, &right))? + 1;
        height += 1;
    }
    Ok(next)
}

/// A whole MMR held in a vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecMmr {
    nodes: Vec<Hash>,
}

impl VecMmr {
    /// Creates an empty MMR.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in nodes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// All node values in index order.
    #[must_use]
    pub fn nodes(&self) -> &[Hash] {
        &self.nodes
    }
}

impl NodeSource for VecMmr {
    fn node(&self, index: u64) -> CoreResult<Hash> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.nodes.get(i))
            .copied()
            .ok_or(CoreError::NodeUnavailable { index })
    }
}

impl NodeAppender for VecMmr {
    fn append(&mut self, value: Hash) -> CoreResult<u64> {
        self.nodes.push(value);
        Ok(self.nodes.len() as u64 - 1)
    }
}
