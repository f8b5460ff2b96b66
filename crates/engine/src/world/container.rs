use std::sync::atomic::{AtomicU16, Ordering};

use crate::modifier::{ChunkModifier, NeighborSnapshot};

use super::block::BlockId;
use super::position::BlockPos;

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total cell count in one section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Raw cell data for one 16x16x16 section, as copied out of authoritative
/// storage. Stored in YZX order (y outermost, x innermost), the same order
/// the container uses internally.
pub type SectionCells = [BlockId; SECTION_VOLUME];

/// A 16x16x16 cube of *visible* block identifiers -- what clients are shown,
/// not necessarily what storage holds.
///
/// Cells are 16-bit atomics: the obfuscation sweep, the tick thread and the
/// network serializer all touch the same container without locks, and a
/// reader can only ever observe a whole prior or whole new identifier.
/// Cell ordering is Relaxed; cross-thread publication of a freshly masked
/// section is ordered by the owning chunk's state flag, not by the cells.
pub struct BlockContainer {
    cells: Box<[AtomicU16; SECTION_VOLUME]>,
}

impl BlockContainer {
    pub fn new_filled(block: BlockId) -> Self {
        Self {
            cells: Box::new(std::array::from_fn(|_| AtomicU16::new(block.0))),
        }
    }

    /// Build a container holding a copy of raw storage data.
    pub fn from_cells(cells: &SectionCells) -> Self {
        Self {
            cells: Box::new(std::array::from_fn(|i| AtomicU16::new(cells[i].0))),
        }
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u8, y: u8, z: u8) -> BlockId {
        BlockId(self.cells[Self::index(x, y, z)].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, x: u8, y: u8, z: u8, block: BlockId) {
        self.cells[Self::index(x, y, z)].store(block.0, Ordering::Relaxed);
    }

    /// Write the authoritative value into a cell, reporting whether the
    /// visible value actually changed. The atomic swap makes the answer
    /// exact even when two reveals race on the same cell: only one of them
    /// observes the old value.
    pub fn reveal(&self, x: u8, y: u8, z: u8, real: BlockId) -> bool {
        self.cells[Self::index(x, y, z)].swap(real.0, Ordering::AcqRel) != real.0
    }

    /// Run the masking decision for one cell and write the result back.
    /// Returns the value now visible; callers compare against the original
    /// to count masked cells. `pos` is the cell's absolute position, passed
    /// through to the policy.
    pub fn obfuscate_cell(
        &self,
        x: u8,
        y: u8,
        z: u8,
        policy: &dyn ChunkModifier,
        pos: BlockPos,
        neighbors: &NeighborSnapshot,
    ) -> BlockId {
        let original = self.get(x, y, z);
        let visible = policy.decide(original, pos, neighbors);
        if visible != original {
            self.set(x, y, z, visible);
        }
        visible
    }

    /// Overwrite every cell from raw storage data. Used when a failed
    /// obfuscation pass is retried on a container that was already filled.
    pub fn copy_from(&self, cells: &SectionCells) {
        for (slot, block) in self.cells.iter().zip(cells.iter()) {
            slot.store(block.0, Ordering::Relaxed);
        }
    }
}
