//! In-memory authoritative storage.
//!
//! Production hosts implement [`BlockSource`] over their real world store;
//! this adapter backs the demo binary and the test suites. Unset positions
//! read as air, like an untouched void world.

use std::collections::HashMap;
use std::sync::RwLock;

use shroud_engine::storage::{BlockSource, StorageError};
use shroud_engine::world::block::BlockId;
use shroud_engine::world::chunk::{SECTIONS_PER_CHUNK, WORLD_HEIGHT};
use shroud_engine::world::container::{SECTION_SIZE, SECTION_VOLUME, SectionCells};
use shroud_engine::world::position::{BlockPos, ChunkPos};

type StoredChunk = [Option<Box<SectionCells>>; SECTIONS_PER_CHUNK];

/// A plain block map guarded by one lock. Writers are test/demo setup;
/// after that the view only reads.
pub struct MemoryStore {
    chunks: RwLock<HashMap<ChunkPos, StoredChunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn cell_index(pos: BlockPos) -> usize {
        let local = pos.local();
        (local.section_local_y() as usize) * SECTION_SIZE * SECTION_SIZE
            + (local.z as usize) * SECTION_SIZE
            + (local.x as usize)
    }

    /// Write one real block. Out-of-extent y is ignored.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) {
        if pos.y < 0 || pos.y >= WORLD_HEIGHT {
            return;
        }
        let mut chunks = self.chunks.write().expect("memory store poisoned");
        let chunk = chunks
            .entry(pos.chunk())
            .or_insert_with(|| std::array::from_fn(|_| None));
        let section = chunk[pos.local().section_index() as usize]
            .get_or_insert_with(|| Box::new([BlockId::AIR; SECTION_VOLUME]));
        section[Self::cell_index(pos)] = block;
    }

    /// Fill an axis-aligned box (inclusive corners) with one block type.
    pub fn fill_box(&self, min: BlockPos, max: BlockPos, block: BlockId) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(BlockPos::new(x, y, z), block);
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSource for MemoryStore {
    fn block_at(&self, pos: BlockPos) -> Result<BlockId, StorageError> {
        if pos.y < 0 || pos.y >= WORLD_HEIGHT {
            return Ok(BlockId::AIR);
        }
        let chunks = self.chunks.read().expect("memory store poisoned");
        let block = chunks
            .get(&pos.chunk())
            .and_then(|chunk| chunk[pos.local().section_index() as usize].as_ref())
            .map(|section| section[Self::cell_index(pos)])
            .unwrap_or(BlockId::AIR);
        Ok(block)
    }

    fn chunk_sections(
        &self,
        pos: ChunkPos,
    ) -> Result<Vec<(u8, Box<SectionCells>)>, StorageError> {
        let chunks = self.chunks.read().expect("memory store poisoned");
        let Some(chunk) = chunks.get(&pos) else {
            return Ok(Vec::new());
        };
        Ok(chunk
            .iter()
            .enumerate()
            .filter_map(|(idx, section)| {
                section.as_ref().map(|cells| (idx as u8, cells.clone()))
            })
            .collect())
    }
}
