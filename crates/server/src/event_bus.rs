//! View-change event bus for the network layer.
//!
//! The engine mutates the network view in place; something still has to
//! tell the connection handlers to resend what changed. Every reveal batch
//! and every chunk that finishes obfuscating is published to a shared
//! `tokio::sync::broadcast` channel that per-connection tasks subscribe to.

use std::sync::Arc;

use shroud_engine::world::block::BlockId;
use shroud_engine::world::position::{BlockPos, ChunkPos};
use uuid::Uuid;

/// Recommended capacity for the broadcast channel. Reveal batches are
/// bursty (one explosion can produce hundreds of cells in one batch, but
/// still one message); 256 in flight is generous.
pub const BUS_CAPACITY: usize = 256;

/// What kind of gameplay signal triggered a reveal batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealCause {
    BlockBreak,
    Interaction,
    Explosion,
}

/// A batch of revealed cells from a single gameplay event.
///
/// Uses `Arc<[...]>` so cloning per broadcast subscriber is just a refcount
/// bump.
#[derive(Clone, Debug)]
pub struct RevealBatch {
    pub world: Uuid,
    pub cause: RevealCause,
    pub changes: Arc<[(BlockPos, BlockId)]>,
}

/// Messages published on a world's view bus.
#[derive(Clone, Debug)]
pub enum ViewEvent {
    /// A chunk finished its obfuscation pass and is now safe to serialize.
    ChunkReady { world: Uuid, pos: ChunkPos },

    /// Cells restored to their true values; resend them.
    CellsRevealed(RevealBatch),
}
