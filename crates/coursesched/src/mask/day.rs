use fixedbitset::FixedBitSet;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use crate::time::TimeGrid;

/// Occupied time blocks for a single weekday.
///
/// The narrow variant keeps the whole day in one `u64` and is used whenever
/// the grid has at most 64 blocks per day. The wide variant handles any
/// granularity. Both honor the same contract; combining masks of different
/// variants or widths is a programming error and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayMask {
    Narrow { bits: u64, blocks: u8 },
    Wide(FixedBitSet),
}

impl DayMask {
    /// Creates an empty mask of the variant the grid calls for.
    pub fn for_grid(grid: &TimeGrid) -> Self {
        let blocks = grid.blocks_per_day();
        if grid.is_narrow() {
            DayMask::Narrow {
                bits: 0,
                blocks: blocks as u8,
            }
        } else {
            DayMask::Wide(FixedBitSet::with_capacity(blocks))
        }
    }

    /// Number of blocks in the day.
    pub fn blocks(&self) -> usize {
        match self {
            DayMask::Narrow { blocks, .. } => usize::from(*blocks),
            DayMask::Wide(set) => set.len(),
        }
    }

    pub fn is_narrow(&self) -> bool {
        matches!(self, DayMask::Narrow { .. })
    }

    /// Returns true if `block` is occupied. Blocks past the end of the day are never occupied.
    pub fn test(&self, block: usize) -> bool {
        match self {
            DayMask::Narrow { bits, blocks } => {
                block < usize::from(*blocks) && bits & (1u64 << block) != 0
            }
            DayMask::Wide(set) => set.contains(block),
        }
    }

    /// Marks a block occupied.
    ///
    /// # Panics
    ///
    /// Panics if `block` is past the end of the day.
    pub fn set(&mut self, block: usize) {
        self.check_block(block);
        match self {
            DayMask::Narrow { bits, .. } => *bits |= 1u64 << block,
            DayMask::Wide(set) => set.insert(block),
        }
    }

    /// Marks a block free.
    pub fn clear(&mut self, block: usize) {
        self.check_block(block);
        match self {
            DayMask::Narrow { bits, .. } => *bits &= !(1u64 << block),
            DayMask::Wide(set) => set.set(block, false),
        }
    }

    /// Marks every block in `range` occupied.
    pub fn set_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.check_block(range.end - 1);
        match self {
            DayMask::Narrow { bits, .. } => *bits |= span(range.end) & !span(range.start),
            DayMask::Wide(set) => set.insert_range(range),
        }
    }

    /// Marks the whole day occupied.
    pub fn fill(&mut self) {
        match self {
            DayMask::Narrow { bits, blocks } => *bits = span(usize::from(*blocks)),
            DayMask::Wide(set) => set.insert_range(..),
        }
    }

    /// Marks the whole day free.
    pub fn clear_all(&mut self) {
        match self {
            DayMask::Narrow { bits, .. } => *bits = 0,
            DayMask::Wide(set) => set.clear(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DayMask::Narrow { bits, .. } => *bits == 0,
            DayMask::Wide(set) => set.ones().next().is_none(),
        }
    }

    /// Number of occupied blocks.
    pub fn count_ones(&self) -> usize {
        match self {
            DayMask::Narrow { bits, .. } => bits.count_ones() as usize,
            DayMask::Wide(set) => set.count_ones(..),
        }
    }

    /// Occupied block indexes in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.blocks()).filter(move |block| self.test(*block))
    }

    /// Adds every block occupied in `other`.
    pub fn union_with(&mut self, other: &DayMask) {
        self.check_compatible(other);
        match (self, other) {
            (DayMask::Narrow { bits, .. }, DayMask::Narrow { bits: theirs, .. }) => *bits |= theirs,
            (DayMask::Wide(set), DayMask::Wide(theirs)) => set.union_with(theirs),
            _ => unreachable!(),
        }
    }

    /// Returns true if no block is occupied in both masks.
    ///
    /// This is an overlap test, not containment: a mask is never a "subset"
    /// check against the other.
    pub fn is_disjoint(&self, other: &DayMask) -> bool {
        self.check_compatible(other);
        match (self, other) {
            (DayMask::Narrow { bits, .. }, DayMask::Narrow { bits: theirs, .. }) => {
                bits & theirs == 0
            }
            (DayMask::Wide(set), DayMask::Wide(theirs)) => set.is_disjoint(theirs),
            _ => unreachable!(),
        }
    }

    /// True when both masks have the same variant and width.
    pub fn is_compatible(&self, other: &DayMask) -> bool {
        self.is_narrow() == other.is_narrow() && self.blocks() == other.blocks()
    }

    fn check_block(&self, block: usize) {
        assert!(
            block < self.blocks(),
            "block {} out of range for a {}-block day",
            block,
            self.blocks()
        );
    }

    fn check_compatible(&self, other: &DayMask) {
        assert!(
            self.is_compatible(other),
            "day mask variant mismatch: {} vs {}",
            self.describe(),
            other.describe()
        );
    }

    fn describe(&self) -> String {
        match self {
            DayMask::Narrow { blocks, .. } => format!("narrow({})", blocks),
            DayMask::Wide(set) => format!("wide({})", set.len()),
        }
    }
}

impl Hash for DayMask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_narrow().hash(state);
        self.blocks().hash(state);
        match self {
            DayMask::Narrow { bits, .. } => bits.hash(state),
            DayMask::Wide(set) => {
                for block in set.ones() {
                    block.hash(state);
                }
            }
        }
    }
}

/// Low `n` bits set.
fn span(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}
