//! Read-only access to authoritative world storage.
//!
//! The view never owns real data: the obfuscation sweep copies sections out
//! of storage, and `deobfuscate` reads single cells back. Both paths go
//! through this trait so the host can plug in whatever its world store is
//! (region files, a generation pipeline, a test fixture).

use crate::world::block::BlockId;
use crate::world::container::SectionCells;
use crate::world::position::{BlockPos, ChunkPos};

/// Failure while reading authoritative storage. These are expected to be
/// transient (I/O hiccups, a chunk mid-save); callers log and retry rather
/// than crash, and a chunk whose pass fails stays unservable.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The chunk is not present in storage at all.
    #[error("chunk ({}, {}) not present in storage", pos.x, pos.z)]
    MissingChunk { pos: ChunkPos },

    /// The backend failed to produce the data.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Authoritative block storage, as seen by the view.
pub trait BlockSource: Send + Sync {
    /// Read one real block.
    fn block_at(&self, pos: BlockPos) -> Result<BlockId, StorageError>;

    /// Copy the non-empty sections of a chunk, keyed by section index
    /// (`y >> 4`, 0..16). Air-only sections may be omitted.
    fn chunk_sections(&self, pos: ChunkPos)
    -> Result<Vec<(u8, Box<SectionCells>)>, StorageError>;
}
