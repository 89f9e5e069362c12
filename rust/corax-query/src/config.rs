use corax_common::{Result, error::Error};

use crate::merge::LANES;

/// How many rejected ids a filtering match tolerates in its output buffer before it
/// returns a partial batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedSlotPolicy {
    /// Keep pulling from the inner match until at most `len / divisor` slots stay
    /// free (one slot for buffers shorter than `min_len`).
    Proportional { divisor: usize, min_len: usize },
    /// Keep pulling until the buffer is full or the inner match is exhausted.
    Fill,
}

impl UnusedSlotPolicy {
    /// Number of free slots allowed in a buffer of `len` ids.
    pub fn max_unused(&self, len: usize) -> usize {
        match *self {
            UnusedSlotPolicy::Proportional { divisor, min_len } if len >= min_len => len / divisor,
            UnusedSlotPolicy::Proportional { .. } => 1,
            UnusedSlotPolicy::Fill => 0,
        }
    }
}

impl Default for UnusedSlotPolicy {
    fn default() -> Self {
        UnusedSlotPolicy::Proportional {
            divisor: 8,
            min_len: 64,
        }
    }
}

/// Execution knobs shared by the matches of one query.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Ids pulled from a posting list per block of a vectorized intersection.
    pub and_block_size: usize,
    /// Ids compared per step of the galloping intersection. Fixed by the kernel.
    pub lane_width: usize,
    /// Enables the block-galloping intersection for posting lists.
    pub vectorized: bool,
    /// Both sides of an intersection must hold more ids than this for the
    /// galloping kernel to be used.
    pub min_vectorized_len: usize,
    pub unused_slots: UnusedSlotPolicy,
    /// Requested size in bytes of a memoization buffer.
    pub memoization_size_hint: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            and_block_size: 4096,
            lane_width: LANES,
            vectorized: true,
            min_vectorized_len: LANES,
            unused_slots: UnusedSlotPolicy::default(),
            memoization_size_hint: 16 * 1024,
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.and_block_size < self.lane_width {
            return Err(Error::invalid_arg(
                "and_block_size",
                format!(
                    "block of {} ids is shorter than a lane group",
                    self.and_block_size
                ),
            ));
        }
        if self.lane_width != LANES {
            return Err(Error::invalid_arg(
                "lane_width",
                format!("only {LANES} lanes are supported, got {}", self.lane_width),
            ));
        }
        if let UnusedSlotPolicy::Proportional { divisor, .. } = self.unused_slots {
            if divisor == 0 {
                return Err(Error::invalid_arg("unused_slots", "divisor must be positive"));
            }
        }
        Ok(())
    }

    /// `true` if an intersection of `left` and `right` ids should use the
    /// galloping kernel.
    pub fn use_vectorized(&self, left: usize, right: usize) -> bool {
        self.vectorized && left > self.min_vectorized_len && right > self.min_vectorized_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = QueryConfig::default();
        config.validate().unwrap();
        assert_eq!(config.and_block_size, 4096);
        assert!(config.use_vectorized(100, 100));
        assert!(!config.use_vectorized(100, 2));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = QueryConfig {
            and_block_size: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QueryConfig {
            lane_width: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = QueryConfig {
            unused_slots: UnusedSlotPolicy::Proportional {
                divisor: 0,
                min_len: 64,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unused_slots() {
        let policy = UnusedSlotPolicy::default();
        assert_eq!(policy.max_unused(16), 1);
        assert_eq!(policy.max_unused(4096), 512);
        assert_eq!(UnusedSlotPolicy::Fill.max_unused(4096), 0);
    }
}
