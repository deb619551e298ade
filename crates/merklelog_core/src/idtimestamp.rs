//! Time-ordered 64-bit entry identifiers.
//!
//! Layout: `(ms_since_epoch_start << 24) | (sequence << 8) | generator_id`.
//! The commitment epoch is `unix_ms >> 40`; the low 40 bits of the unix
//! millisecond clock go in the top of the id.

use std::time::{SystemTime, UNIX_EPOCH};

const EPOCH_SHIFT: u32 = 40;
const TIME_SHIFT: u32 = 24;
const SEQUENCE_SHIFT: u32 = 8;
const TIME_MASK: u64 = (1 << EPOCH_SHIFT) - 1;

/// Commitment epoch of a unix millisecond timestamp.
#[must_use]
pub fn epoch_of(unix_ms: u64) -> u32 {
    (unix_ms >> EPOCH_SHIFT) as u32
}

/// Splits an id into `(ms_since_epoch_start, sequence, generator_id)`.
#[must_use]
pub fn split_id(id: u64) -> (u64, u16, u8) {
    (
        id >> TIME_SHIFT,
        ((id >> SEQUENCE_SHIFT) & 0xffff) as u16,
        (id & 0xff) as u8,
    )
}

/// Unix milliseconds at which `id` was issued within `epoch`.
#[must_use]
pub fn id_unix_ms(id: u64, epoch: u32) -> u64 {
    (u64::from(epoch) << EPOCH_SHIFT) | (id >> TIME_SHIFT)
}

/// Issues strictly increasing idtimestamps for one writer.
///
/// Not shared: each owner keeps its own generator and calls it from a
/// single logical sequence.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    generator_id: u8,
    last_ms: u64,
    sequence: u16,
}

impl IdGenerator {
    /// Creates a generator tagging ids with `generator_id`.
    #[must_use]
    pub fn new(generator_id: u8) -> Self {
        Self {
            generator_id,
            last_ms: 0,
            sequence: 0,
        }
    }

    /// Next id from the system clock, with its commitment epoch.
    pub fn next_id(&mut self) -> (u32, u64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self.next_id_at(now)
    }

    /// Next id as if the clock read `unix_ms`.
    ///
    /// A clock that stands still or steps back reuses the last millisecond
    /// and bumps the sequence; sequence overflow advances the millisecond.
    pub fn next_id_at(&mut self, unix_ms: u64) -> (u32, u64) {
        if unix_ms > self.last_ms {
            self.last_ms = unix_ms;
            self.sequence = 0;
        } else if self.sequence == u16::MAX {
            self.last_ms += 1;
            self.sequence = 0;
        } else {
            self.sequence += 1;
        }
        let id = ((self.last_ms & TIME_MASK) << TIME_SHIFT)
            | (u64::from(self.sequence) << SEQUENCE_SHIFT)
            | u64::from(self.generator_id);
        (epoch_of(self.last_ms), id)
    }
}
