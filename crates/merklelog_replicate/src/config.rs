//! Configuration for the replicator.

use merklelog_core::search::DEFAULT_MASSIF_HEIGHT;

/// Configuration for replication runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatorConfig {
    /// Massif height of the log.
    pub massif_height: u8,
    /// Number of massifs before the requested end to keep verified.
    /// `None` replicates from massif 0.
    pub ancestors: Option<u32>,
    /// Capacity of the result channel used by tenant fan-out.
    pub channel_capacity: usize,
    /// Maximum number of tenant workers running at once.
    pub concurrency: usize,
    /// Ed25519 public key seals must be signed with, if any.
    pub sealer_key: Option<[u8; 32]>,
}

impl ReplicatorConfig {
    /// Creates a configuration for massifs of `massif_height`.
    pub fn new(massif_height: u8) -> Self {
        Self {
            massif_height,
            ancestors: None,
            channel_capacity: 64,
            concurrency: 8,
            sealer_key: None,
        }
    }

    /// Sets the ancestor retention.
    pub fn with_ancestors(mut self, ancestors: u32) -> Self {
        self.ancestors = Some(ancestors);
        self
    }

    /// Sets the result channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the worker limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the trusted sealer key.
    pub fn with_sealer_key(mut self, key: [u8; 32]) -> Self {
        self.sealer_key = Some(key);
        self
    }

    /// First massif index to verify when replicating up to `end`.
    pub fn requested_start(&self, end: u32) -> u32 {
        self.ancestors.map_or(0, |a| end.saturating_sub(a))
    }
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MASSIF_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = ReplicatorConfig::new(9)
            .with_ancestors(2)
            .with_channel_capacity(4)
            .with_concurrency(2)
            .with_sealer_key([1u8; 32]);

        assert_eq!(config.massif_height, 9);
        assert_eq!(config.ancestors, Some(2));
        assert_eq!(config.channel_capacity, 4);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.sealer_key, Some([1u8; 32]));
    }

    #[test]
    fn defaults() {
        let config = ReplicatorConfig::default();
        assert_eq!(config.massif_height, 14);
        assert_eq!(config.ancestors, None);
        assert!(config.sealer_key.is_none());
    }

    #[test]
    fn requested_start_saturates() {
        assert_eq!(ReplicatorConfig::new(3).requested_start(5), 0);
        let config = ReplicatorConfig::new(3).with_ancestors(2);
        assert_eq!(config.requested_start(5), 3);
        assert_eq!(config.requested_start(1), 0);
    }
}
