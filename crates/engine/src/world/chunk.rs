use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use super::block::BlockId;
use super::container::{BlockContainer, SectionCells};
use super::position::{ChunkPos, LocalBlockPos};

/// Vertical sections per chunk column.
pub const SECTIONS_PER_CHUNK: usize = 16;
/// World height covered by the view (y in `0..WORLD_HEIGHT`).
pub const WORLD_HEIGHT: i64 = (SECTIONS_PER_CHUNK * super::container::SECTION_SIZE) as i64;

/// Lifecycle of a chunk's network view.
///
/// `Preobfuscated` chunks hold no servable data. The background sweep claims
/// a chunk (`Obfuscating`), fills and masks it, then publishes `Obfuscated`.
/// There is no backward transition; unload simply drops the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObfuscationState {
    Preobfuscated = 0,
    Obfuscating = 1,
    Obfuscated = 2,
}

/// The network view of one chunk column: up to 16 sections of visible block
/// data plus the obfuscation state.
///
/// Sections are write-once (`OnceLock`) so readers never take a lock;
/// air-only sections are simply never materialized. All mutation goes
/// through the atomic cells of the containers.
pub struct ChunkView {
    pos: ChunkPos,
    sections: [OnceLock<BlockContainer>; SECTIONS_PER_CHUNK],
    state: AtomicU8,
}

impl ChunkView {
    pub fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            sections: std::array::from_fn(|_| OnceLock::new()),
            state: AtomicU8::new(ObfuscationState::Preobfuscated as u8),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn state(&self) -> ObfuscationState {
        match self.state.load(Ordering::Acquire) {
            0 => ObfuscationState::Preobfuscated,
            1 => ObfuscationState::Obfuscating,
            _ => ObfuscationState::Obfuscated,
        }
    }

    /// Claim this chunk for the obfuscation pass. Returns `false` if another
    /// pass already claimed or finished it.
    pub(crate) fn try_begin_obfuscation(&self) -> bool {
        self.state
            .compare_exchange(
                ObfuscationState::Preobfuscated as u8,
                ObfuscationState::Obfuscating as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Publish the masked data. The Release store is what makes the sweep's
    /// cell writes visible to readers that observed `Obfuscated`.
    pub(crate) fn finish_obfuscation(&self) {
        self.state
            .store(ObfuscationState::Obfuscated as u8, Ordering::Release);
    }

    /// Revert a failed claim so a later sweep retries the chunk.
    pub(crate) fn abort_obfuscation(&self) {
        self.state
            .store(ObfuscationState::Preobfuscated as u8, Ordering::Release);
    }

    pub(crate) fn section(&self, idx: usize) -> Option<&BlockContainer> {
        self.sections.get(idx)?.get()
    }

    /// Install or refresh one section's raw cells.
    pub(crate) fn install_section(&self, idx: usize, cells: &SectionCells) {
        let slot = &self.sections[idx];
        match slot.get() {
            Some(container) => container.copy_from(cells),
            None => {
                // A concurrent set can only come from another pass claiming
                // the same chunk, which the state machine rules out; if it
                // happens anyway, overwriting keeps the data authoritative.
                if slot.set(BlockContainer::from_cells(cells)).is_err() {
                    slot.get().expect("section just set").copy_from(cells);
                }
            }
        }
    }

    fn container_for(&self, pos: LocalBlockPos) -> Option<&BlockContainer> {
        if pos.y < 0 || pos.y >= WORLD_HEIGHT {
            return None;
        }
        self.section(pos.section_index() as usize)
    }

    /// Visible block at a local position. Absent if the section was never
    /// materialized or `y` is outside the world's vertical extent.
    pub fn get(&self, pos: LocalBlockPos) -> Option<BlockId> {
        self.container_for(pos)
            .map(|c| c.get(pos.x, pos.section_local_y(), pos.z))
    }

    /// Overwrite the visible block at a local position. No-op when the
    /// section is absent.
    pub fn set(&self, pos: LocalBlockPos, block: BlockId) {
        if let Some(container) = self.container_for(pos) {
            container.set(pos.x, pos.section_local_y(), pos.z, block);
        }
    }

    /// Write the authoritative value into the visible cell; `true` if the
    /// visible value changed, which makes repeated reveals of the same cell
    /// report `false`. Absent sections are a no-op (`false`). This is the
    /// write half of deobfuscation; [`WorldView::deobfuscate`] pairs it
    /// with the authoritative storage read.
    ///
    /// [`WorldView::deobfuscate`]: super::WorldView::deobfuscate
    pub fn reveal(&self, pos: LocalBlockPos, real: BlockId) -> bool {
        match self.container_for(pos) {
            Some(container) => container.reveal(pos.x, pos.section_local_y(), pos.z, real),
            None => false,
        }
    }
}
