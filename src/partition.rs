use crate::errors::{CoordinationError, Result};

/// Rank-ordered segment sizes produced by a size exchange.
///
/// `table[w]` is the element count reported by worker `w`. Every worker in a
/// group holds a byte-identical copy, so offsets derived from it agree
/// everywhere without further communication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTable {
    sizes: Vec<u64>,
}

/// One worker's resolved window into the shared dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// First element index owned by this worker.
    pub offset: u64,
    /// Number of elements owned by this worker.
    pub len: u64,
    /// Agreed extent of the whole dataset.
    pub total: u64,
}

/// Half-open element interval `[offset, offset + len)` inside a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: u64,
    pub len: u64,
}

impl SizeTable {
    pub fn new(sizes: Vec<u64>) -> Self {
        Self { sizes }
    }

    /// Number of workers in the table.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    pub fn size_of(&self, rank: usize) -> u64 {
        self.sizes[rank]
    }

    /// Combined extent of all segments.
    pub fn total(&self) -> Result<u64> {
        let mut total: u64 = 0;
        for (rank, &len) in self.sizes.iter().enumerate() {
            total = total
                .checked_add(len)
                .ok_or_else(|| CoordinationError::SizeOverflow {
                    context: format!("summing segment sizes through rank {}", rank),
                })?;
        }
        Ok(total)
    }

    /// Resolves one worker's window by prefix sum over the table.
    ///
    /// Pure and deterministic: every worker running this over the same table
    /// computes the same offsets, and the resulting regions tile
    /// `[0, total)` with no gaps or overlaps. A zero-size worker yields a
    /// zero-width region that moves no other worker's offset.
    pub fn placement(&self, rank: usize) -> Result<Placement> {
        assert!(
            rank < self.sizes.len(),
            "rank {} out of range for a table of {} workers",
            rank,
            self.sizes.len()
        );
        let mut offset: u64 = 0;
        let mut total: u64 = 0;
        for (w, &len) in self.sizes.iter().enumerate() {
            if w == rank {
                offset = total;
            }
            total = total
                .checked_add(len)
                .ok_or_else(|| CoordinationError::SizeOverflow {
                    context: format!("summing segment sizes through rank {}", w),
                })?;
        }
        Ok(Placement {
            offset,
            len: self.sizes[rank],
            total,
        })
    }
}

impl Placement {
    pub fn region(&self) -> Region {
        Region {
            offset: self.offset,
            len: self.len,
        }
    }
}

impl Region {
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
