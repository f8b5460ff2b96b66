pub mod block;
pub mod chunk;
pub mod container;
pub mod dynamic;
pub mod position;

use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::modifier::{ChunkModifier, NeighborSnapshot};
use crate::storage::{BlockSource, StorageError};
use block::BlockId;
use chunk::{ChunkView, ObfuscationState, SECTIONS_PER_CHUNK, WORLD_HEIGHT};
use container::SECTION_SIZE;
use position::{BlockPos, ChunkPos};

/// Per-world view configuration. The candidate block set lives inside the
/// active modifier; this is what the reactor side needs at runtime.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Distance around a revealing gameplay event within which cells are
    /// restored to their true values. Zero disables radius reveals.
    pub deobfuscation_radius: i32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            deobfuscation_radius: 2,
        }
    }
}

/// The network view of one world. Thread-safe, lock-sharded by chunk.
///
/// Holds the synthetic copy of every loaded chunk, the active masking
/// policy, and the handle to authoritative storage. The tick thread
/// (deobfuscation), the background sweep (obfuscation) and the network
/// serializer (reads) all operate on this concurrently.
pub struct WorldView {
    chunks: DashMap<ChunkPos, Arc<ChunkView>>,
    modifier: Arc<dyn ChunkModifier>,
    storage: Arc<dyn BlockSource>,
    config: ViewConfig,
}

impl WorldView {
    pub fn new(
        modifier: Arc<dyn ChunkModifier>,
        storage: Arc<dyn BlockSource>,
        config: ViewConfig,
    ) -> Self {
        Self {
            chunks: DashMap::new(),
            modifier,
            storage,
            config,
        }
    }

    pub fn modifier(&self) -> &Arc<dyn ChunkModifier> {
        &self.modifier
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Register a freshly loaded chunk in `Preobfuscated` state. The
    /// background sweep fills and masks it; until then the chunk serves
    /// nothing. Re-registering a loaded chunk returns the existing view.
    pub fn add_chunk(&self, pos: ChunkPos) -> Arc<ChunkView> {
        let entry = self
            .chunks
            .entry(pos)
            .or_insert_with(|| Arc::new(ChunkView::new(pos)));
        Arc::clone(entry.value())
    }

    pub fn remove_chunk(&self, pos: ChunkPos) {
        self.chunks.remove(&pos);
    }

    /// Point lookup. Clones the `Arc` out so the shard lock is released
    /// immediately; the view itself is safe to use lock-free.
    pub fn chunk_view(&self, pos: ChunkPos) -> Option<Arc<ChunkView>> {
        self.chunks.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of every chunk still awaiting its obfuscation pass.
    pub fn pending_chunks(&self) -> Vec<ChunkPos> {
        self.chunks
            .iter()
            .filter(|entry| entry.state() == ObfuscationState::Preobfuscated)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Visible block at an absolute position. Absent for unloaded chunks,
    /// unmaterialized sections and out-of-extent y.
    pub fn get(&self, pos: BlockPos) -> Option<BlockId> {
        self.chunk_view(pos.chunk())?.get(pos.local())
    }

    /// Overwrite the visible block at an absolute position. No-op when the
    /// chunk or section is absent.
    pub fn set(&self, pos: BlockPos, block: BlockId) {
        if let Some(chunk) = self.chunk_view(pos.chunk()) {
            chunk.set(pos.local(), block);
        }
    }

    /// Restore the authoritative value at one position into the view.
    ///
    /// Returns `Ok(false)` -- never an error -- for unloaded chunks, absent
    /// sections, and chunks that have not finished obfuscating, so radius
    /// sweeps near chunk borders can call this speculatively. A second call
    /// for an already-revealed cell also returns `Ok(false)`.
    pub fn deobfuscate(&self, pos: BlockPos) -> Result<bool, StorageError> {
        let Some(chunk) = self.chunk_view(pos.chunk()) else {
            return Ok(false);
        };
        // A chunk that is not yet Obfuscated serves nothing, and its pass
        // will re-read fresh storage anyway; writing into it would race the
        // sweep and could be overwritten by a mask.
        if chunk.state() != ObfuscationState::Obfuscated {
            return Ok(false);
        }
        let real = self.storage.block_at(pos)?;
        Ok(chunk.reveal(pos.local(), real))
    }

    /// Run the obfuscation pass for one chunk: claim it, copy its sections
    /// out of storage, mask every candidate cell, publish `Obfuscated`.
    ///
    /// Returns `Ok(false)` when there is nothing to do (chunk unloaded,
    /// already claimed or already done). A storage failure reverts the claim
    /// so a later sweep retries, and no data is ever served meanwhile.
    pub fn obfuscate_chunk(&self, pos: ChunkPos) -> Result<bool, StorageError> {
        let Some(chunk) = self.chunk_view(pos) else {
            return Ok(false);
        };
        if !chunk.try_begin_obfuscation() {
            return Ok(false);
        }

        let sections = match self.storage.chunk_sections(pos) {
            Ok(sections) => sections,
            Err(e) => {
                chunk.abort_obfuscation();
                return Err(e);
            }
        };

        for (idx, cells) in &sections {
            let idx = *idx as usize;
            if idx >= SECTIONS_PER_CHUNK || cells.iter().all(|b| b.is_air()) {
                continue;
            }
            chunk.install_section(idx, cells);
        }

        // Sections are independent: each cell's decision reads only its own
        // value and a 6-neighbor snapshot, so the pass fans out across
        // sections. Up to 65k cells per chunk makes this worth it.
        let masked: usize = (0..SECTIONS_PER_CHUNK)
            .into_par_iter()
            .map(|section_idx| self.mask_section(&chunk, section_idx))
            .sum();

        chunk.finish_obfuscation();
        tracing::debug!(
            chunk.x = pos.x,
            chunk.z = pos.z,
            masked,
            "chunk obfuscated"
        );
        Ok(true)
    }

    /// Mask every candidate cell of one section. Returns the masked count.
    fn mask_section(&self, chunk: &ChunkView, section_idx: usize) -> usize {
        let Some(container) = chunk.section(section_idx) else {
            return 0;
        };
        let base = chunk.pos();
        let base_x = (base.x as i64) << 4;
        let base_y = (section_idx as i64) << 4;
        let base_z = (base.z as i64) << 4;

        let mut masked = 0;
        for y in 0..SECTION_SIZE as u8 {
            for z in 0..SECTION_SIZE as u8 {
                for x in 0..SECTION_SIZE as u8 {
                    let original = container.get(x, y, z);
                    if !self.modifier.is_candidate(original) {
                        continue;
                    }
                    let pos = BlockPos::new(
                        base_x + x as i64,
                        base_y + y as i64,
                        base_z + z as i64,
                    );
                    let snapshot = self.neighbor_snapshot(chunk, pos);
                    let visible =
                        container.obfuscate_cell(x, y, z, self.modifier.as_ref(), pos, &snapshot);
                    if visible != original {
                        masked += 1;
                    }
                }
            }
        }
        masked
    }

    /// Snapshot the six neighbors of a cell for the masking decision.
    ///
    /// Reads within the chunk being masked come from its own containers
    /// (absent section = air). Reads crossing the chunk border only consult
    /// neighbors that already finished obfuscating -- a `Preobfuscated`
    /// neighbor holds no data yet and must count as opaque, otherwise a
    /// border ore would leak through a cavity we cannot see yet.
    fn neighbor_snapshot(&self, home: &ChunkView, pos: BlockPos) -> NeighborSnapshot {
        pos.neighbors().map(|n| {
            if n.y < 0 || n.y >= WORLD_HEIGHT {
                return None;
            }
            let chunk_pos = n.chunk();
            if chunk_pos == home.pos() {
                return Some(home.get(n.local()).unwrap_or(BlockId::AIR));
            }
            let neighbor = self.chunk_view(chunk_pos)?;
            if neighbor.state() != ObfuscationState::Obfuscated {
                return None;
            }
            Some(neighbor.get(n.local()).unwrap_or(BlockId::AIR))
        })
    }
}
